use crate::atoms::Atoms;
use crate::errors::TranscodeError;

/// The names of the density components in the order they are stored.
/// A collinear spin calculation carries `total` and `diff`, a non-collinear
/// one `total` and the three magnetisation components.
pub const COLLINEAR: [&str; 2] = ["total", "diff"];
pub const NON_COLLINEAR: [&str; 4] = ["total", "diff_x", "diff_y", "diff_z"];

/// One scalar field on the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityComponent {
    /// Name of the component, see [`COLLINEAR`] and [`NON_COLLINEAR`].
    pub name: String,
    /// Values in file order, x runs fastest.
    pub values: Vec<f64>,
    /// Augmentation occupancy lines that follow this component, kept verbatim.
    pub augmentation: Vec<String>,
}

/// Structure for holding a charge density and the cell it is stored in.
///
/// The values are as VASP stores them, density multiplied by cell volume,
/// and no unit conversion happens anywhere in this crate.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumetricData {
    pub atoms: Atoms,
    /// Number of grid points along each lattice vector.
    pub grid: [usize; 3],
    pub components: Vec<DensityComponent>,
}

impl VolumetricData {
    /// Checks the components against the grid and orders them into the
    /// layout of a raw density file.
    pub fn new(atoms: Atoms,
               grid: [usize; 3],
               mut components: Vec<DensityComponent>)
               -> Result<Self, TranscodeError> {
        let total = grid.iter().product::<usize>();
        if total == 0 {
            return Err(TranscodeError::Shape(format!("empty grid {:?}",
                                                     grid)));
        }
        let layout: &[&str] = match components.len() {
            1 | 2 => &COLLINEAR[..components.len()],
            4 => &NON_COLLINEAR,
            n => {
                return Err(TranscodeError::Shape(format!("{} density components",
                                                         n)))
            }
        };
        for c in components.iter() {
            if !layout.contains(&c.name.as_str()) {
                return Err(TranscodeError::UnknownComponent(c.name.clone()));
            }
            if c.values.len() != total {
                return Err(TranscodeError::Shape(format!(
                    "component {} has {} values, grid {:?} needs {}",
                    c.name,
                    c.values.len(),
                    grid,
                    total
                )));
            }
        }
        if let Some(missing) =
            layout.iter()
                  .find(|name| !components.iter().any(|c| c.name == **name))
        {
            return Err(TranscodeError::Shape(format!("missing component {}",
                                                     missing)));
        }
        components.sort_by_key(|c| {
                      layout.iter()
                            .position(|name| *name == c.name)
                            .unwrap_or(layout.len())
                  });
        Ok(Self { atoms,
                  grid,
                  components })
    }

    /// The total charge density.
    pub fn total(&self) -> &DensityComponent {
        // new() guarantees at least one component and that it sorts first
        &self.components[0]
    }

    /// Flattened index of grid point (i, j, k) in file order.
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.grid[0] * (j + self.grid[1] * k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::Lattice;

    fn atoms() -> Atoms {
        let lattice =
            Lattice::new([[2., 0., 0.], [0., 2., 0.], [0., 0., 2.]]).unwrap();
        Atoms::new(lattice, vec![String::from("Si")], vec![[0.; 3]])
    }

    fn component(name: &str, len: usize) -> DensityComponent {
        DensityComponent { name: String::from(name),
                           values: (0..len).map(|x| x as f64).collect(),
                           augmentation: vec![] }
    }

    #[test]
    fn density_orders_components() {
        let data = VolumetricData::new(atoms(),
                                       [2, 2, 2],
                                       vec![component("diff", 8),
                                            component("total", 8)]).unwrap();
        assert_eq!(data.total().name, "total");
        assert_eq!(data.components[1].name, "diff");
    }

    #[test]
    fn density_wrong_length() {
        let data =
            VolumetricData::new(atoms(), [2, 2, 2], vec![component("total", 7)]);
        assert!(matches!(data, Err(TranscodeError::Shape(_))))
    }

    #[test]
    fn density_empty_grid() {
        let data =
            VolumetricData::new(atoms(), [0, 2, 2], vec![component("total", 0)]);
        assert!(matches!(data, Err(TranscodeError::Shape(_))))
    }

    #[test]
    fn density_unknown_component() {
        let data = VolumetricData::new(atoms(),
                                       [1, 1, 1],
                                       vec![component("total", 1),
                                            component("diff_x", 1)]);
        assert!(matches!(data, Err(TranscodeError::UnknownComponent(_))))
    }

    #[test]
    fn density_index() {
        let data =
            VolumetricData::new(atoms(), [2, 3, 4], vec![component("total", 24)])
                .unwrap();
        assert_eq!(data.index(1, 0, 0), 1);
        assert_eq!(data.index(0, 1, 0), 2);
        assert_eq!(data.index(0, 0, 1), 6);
        assert_eq!(data.index(1, 2, 3), 23);
    }
}
