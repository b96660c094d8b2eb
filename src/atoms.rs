use crate::errors::TranscodeError;
use crate::utils;

/// Lattice - structure for containing information on the cell
///
/// > matrix: [[f64; 3]; 3] - the lattice vectors as rows, in Angstrom
/// > to_fractional: [[f64; 3]; 3] - transformation matrix for converting to
/// >                                fractional coordinates
/// > volume: f64 - the volume of the cell
#[derive(Clone, Debug, PartialEq)]
pub struct Lattice {
    pub matrix: [[f64; 3]; 3],
    pub to_fractional: [[f64; 3]; 3],
    pub volume: f64,
}

impl Lattice {
    /// initialises the structure, failing for a cell with no volume
    pub fn new(matrix: [[f64; 3]; 3]) -> Result<Self, TranscodeError> {
        let to_fractional = utils::invert_lattice(&matrix)
            .ok_or(TranscodeError::SingularLattice)?;
        let volume = utils::triple_product(&matrix).abs();
        Ok(Self { matrix,
                  to_fractional,
                  volume })
    }

    /// converts a cartesian position to fractional coordinates
    pub fn fractional(&self, cartesian: [f64; 3]) -> [f64; 3] {
        utils::dot(cartesian, self.to_fractional)
    }
}

/// struct for containing the information about the atoms
///
/// > comment: String - the first line of the raw file
/// > lattice: Lattice - the lattice of the structure
/// > species: Vec<String> - the element of each site, in site order
/// > positions: Vec<[f64; 3]> - the positions of the sites in fractional coordinates
#[derive(Clone, Debug, PartialEq)]
pub struct Atoms {
    pub comment: String,
    pub lattice: Lattice,
    pub species: Vec<String>,
    pub positions: Vec<[f64; 3]>,
}

impl Atoms {
    /// initialises the structure with a formula-like comment
    pub fn new(lattice: Lattice,
               species: Vec<String>,
               positions: Vec<[f64; 3]>)
               -> Self {
        let mut atoms = Self { comment: String::new(),
                               lattice,
                               species,
                               positions };
        atoms.comment = atoms.species_runs()
                             .iter()
                             .map(|(s, n)| format!("{}{}", s, n))
                             .collect::<Vec<String>>()
                             .join(" ");
        atoms
    }

    /// Groups consecutive sites of the same element, the layout of the
    /// species and counts lines of a POSCAR header.
    pub fn species_runs(&self) -> Vec<(String, usize)> {
        let mut runs: Vec<(String, usize)> = Vec::new();
        for s in self.species.iter() {
            if let Some((last, count)) = runs.last_mut() {
                if last == s {
                    *count += 1;
                    continue;
                }
            }
            runs.push((s.clone(), 1));
        }
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic(a: f64) -> Lattice {
        Lattice::new([[a, 0., 0.], [0., a, 0.], [0., 0., a]]).unwrap()
    }

    #[test]
    fn lattice_volume() {
        assert_eq!(cubic(2.).volume, 8.)
    }

    #[test]
    fn lattice_singular() {
        let l = Lattice::new([[1., 0., 0.], [1., 0., 0.], [0., 0., 1.]]);
        assert!(matches!(l, Err(TranscodeError::SingularLattice)))
    }

    #[test]
    fn lattice_fractional() {
        assert_eq!(cubic(4.).fractional([1., 2., 3.]), [0.25, 0.5, 0.75])
    }

    #[test]
    fn atoms_species_runs() {
        let species = ["Na", "Na", "Cl", "Na"].iter()
                                              .map(|s| s.to_string())
                                              .collect();
        let atoms = Atoms::new(cubic(1.), species, vec![[0.; 3]; 4]);
        assert_eq!(atoms.species_runs(),
                   vec![(String::from("Na"), 2),
                        (String::from("Cl"), 1),
                        (String::from("Na"), 1)]);
        assert_eq!(atoms.comment, "Na2 Cl1 Na1")
    }
}
