use crate::atoms::{Atoms, Lattice};
use crate::density::{DensityComponent, VolumetricData, COLLINEAR,
                     NON_COLLINEAR};
use crate::errors::TranscodeError;
use crate::io::{Exact, FortranFormat};
use crate::utils;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// The coordinate system.
enum Coord {
    /// Fractional coordinates.
    Fractional,
    /// Cartesian coordinates.
    Cartesian,
}

/// Write a CHGCAR. Every float is written so that it reads back to the
/// same f64.
pub fn write(data: &VolumetricData, path: &Path) -> io::Result<()> {
    let mut buffer = BufWriter::new(File::create(path)?);
    let atoms = &data.atoms;
    writeln!(buffer, "{}", atoms.comment)?;
    writeln!(buffer, "   1.0")?;
    for v in atoms.lattice.matrix.iter() {
        writeln!(buffer, " {:>22} {:>22} {:>22}", Exact(v[0]), Exact(v[1]), Exact(v[2]))?;
    }
    let runs = atoms.species_runs();
    runs.iter().try_for_each(|(s, _)| write!(buffer, " {:>4}", s))?;
    writeln!(buffer)?;
    runs.iter().try_for_each(|(_, n)| write!(buffer, " {:>4}", n))?;
    writeln!(buffer)?;
    writeln!(buffer, "Direct")?;
    for p in atoms.positions.iter() {
        writeln!(buffer, " {:>22} {:>22} {:>22}", Exact(p[0]), Exact(p[1]), Exact(p[2]))?;
    }
    for component in data.components.iter() {
        // one blank line after the positions and between each density
        writeln!(buffer)?;
        writeln!(buffer,
                 " {:>4} {:>4} {:>4}",
                 data.grid[0], data.grid[1], data.grid[2])?;
        for line in component.values.chunks(5) {
            line.iter()
                .try_for_each(|f| write!(buffer, " {}", FortranFormat { float: *f }))?;
            writeln!(buffer)?;
        }
        for aug in component.augmentation.iter() {
            buffer.write_all(aug.as_bytes())?;
            if !aug.ends_with('\n') {
                writeln!(buffer)?;
            }
        }
    }
    buffer.flush()
}

/// Walks the lines of a file keeping track of the line number for errors.
struct Cursor<'a> {
    lines: std::iter::Peekable<std::str::Lines<'a>>,
    line: usize,
    path: &'a Path,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, path: &'a Path) -> Self {
        Self { lines: text.lines().peekable(),
               line: 0,
               path }
    }

    fn error(&self, details: impl Into<String>) -> TranscodeError {
        TranscodeError::parse(self.path, self.line, details)
    }

    /// The next line, running out of file is an error.
    fn next(&mut self) -> Result<&'a str, TranscodeError> {
        self.line += 1;
        self.lines
            .next()
            .ok_or_else(|| self.error("unexpected end of file"))
    }

    fn peek(&mut self) -> Option<&'a str> {
        self.lines.peek().copied()
    }

    fn floats(&self, text: &str) -> Result<Vec<f64>, TranscodeError> {
        text.split_whitespace()
            .map(|x| {
                x.parse::<f64>()
                 .map_err(|_| self.error(format!("\"{}\" is not a number", x)))
            })
            .collect()
    }

    fn vector(&mut self) -> Result<[f64; 3], TranscodeError> {
        let text = self.next()?;
        let floats = self.floats(text)?;
        match floats.as_slice() {
            [a, b, c, ..] => Ok([*a, *b, *c]),
            _ => Err(self.error("expected three coordinates")),
        }
    }
}

/// Parses a line of three positive integers.
fn grid_line(text: &str) -> Option<[usize; 3]> {
    let values = text.split_whitespace()
                     .map(|x| x.parse::<usize>().ok())
                     .collect::<Option<Vec<usize>>>()?;
    match values.as_slice() {
        [x, y, z] => Some([*x, *y, *z]),
        _ => None,
    }
}

/// Read a VASP CHGCAR/CHG/AECCAR file without any change of units.
pub fn read(path: &Path) -> Result<VolumetricData, TranscodeError> {
    let text = fs::read_to_string(path).map_err(|source| {
                                           TranscodeError::Io {
                                               path: path.to_path_buf(),
                                               source,
                                           }
                                       })?;
    let mut cursor = Cursor::new(&text, path);
    let atoms = read_atoms(&mut cursor)?;
    // lets find the start of the first density
    let grid = loop {
        let text = cursor.next()?;
        if text.trim().is_empty() {
            continue;
        }
        break grid_line(text).ok_or_else(|| cursor.error("expected grid size"))?;
    };
    let total = grid.iter().product::<usize>();
    let mut densities: Vec<(Vec<f64>, Vec<String>)> = Vec::with_capacity(4);
    loop {
        let mut values = Vec::with_capacity(total);
        while values.len() < total {
            let line = cursor.next()?;
            values.extend(cursor.floats(line)?);
        }
        if values.len() != total {
            return Err(cursor.error("too many values on the last grid line"));
        }
        // everything up to the next grid line belongs to this density
        let mut augmentation = Vec::new();
        let mut next_grid = false;
        while let Some(line) = cursor.peek() {
            cursor.next()?;
            if grid_line(line) == Some(grid) {
                next_grid = true;
                break;
            }
            if !line.trim().is_empty() {
                augmentation.push(format!("{}\n", line));
            }
        }
        densities.push((values, augmentation));
        if !next_grid {
            break;
        }
    }
    let names: &[&str] = match densities.len() {
        1 | 2 => &COLLINEAR[..densities.len()],
        4 => &NON_COLLINEAR,
        n => return Err(cursor.error(format!("found {} densities", n))),
    };
    let components = densities.into_iter()
                              .zip(names)
                              .map(|((values, augmentation), name)| {
                                  DensityComponent { name: name.to_string(),
                                                     values,
                                                     augmentation }
                              })
                              .collect();
    VolumetricData::new(atoms, grid, components)
}

/// Read the POSCAR header.
fn read_atoms(cursor: &mut Cursor) -> Result<Atoms, TranscodeError> {
    let comment = cursor.next()?.trim().to_string();
    let text = cursor.next()?;
    let mut scale = cursor.floats(text)?;
    let mut matrix = [cursor.vector()?, cursor.vector()?, cursor.vector()?];
    // the scale can be negative and this means that it is the volume of the cell
    // it can also be 3 values which is a multiplier for each lattice
    match scale.len() {
        1 => {
            if scale[0] < 0f64 {
                let volume = utils::triple_product(&matrix).abs();
                scale[0] = (-scale[0] / volume).cbrt();
            }
            scale = vec![scale[0]; 3];
        }
        3 => (),
        _ => return Err(cursor.error("expected 1 or 3 scaling factors")),
    }
    for row in matrix.iter_mut() {
        for (x, s) in row.iter_mut().zip(scale.iter()) {
            *x *= s;
        }
    }
    let lattice = Lattice::new(matrix)?;
    // VASP 4 files have no species line
    let text = cursor.next()?;
    let (symbols, counts) = match text.split_whitespace()
                                      .map(|x| x.parse::<usize>().ok())
                                      .collect::<Option<Vec<usize>>>()
    {
        Some(counts) => (vec![String::from("X"); counts.len()], counts),
        None => {
            let symbols = text.split_whitespace()
                              .map(String::from)
                              .collect::<Vec<String>>();
            let text = cursor.next()?;
            let counts = text.split_whitespace()
                             .map(|x| x.parse::<usize>().ok())
                             .collect::<Option<Vec<usize>>>()
                             .ok_or_else(|| cursor.error("expected atom counts"))?;
            (symbols, counts)
        }
    };
    if symbols.len() != counts.len() {
        return Err(cursor.error("species and counts differ in length"));
    }
    let mut dubious = cursor.next()?.trim_start().to_lowercase();
    if dubious.starts_with('s') {
        dubious = cursor.next()?.trim_start().to_lowercase();
    }
    let coord = if dubious.starts_with('d') {
        Coord::Fractional
    } else {
        Coord::Cartesian
    };
    let mut species = Vec::with_capacity(counts.iter().sum());
    let mut positions = Vec::with_capacity(counts.iter().sum());
    for (symbol, count) in symbols.iter().zip(counts.iter()) {
        for _ in 0..*count {
            let p = cursor.vector()?;
            let p = match coord {
                Coord::Fractional => p,
                Coord::Cartesian => {
                    lattice.fractional([p[0] * scale[0],
                                        p[1] * scale[1],
                                        p[2] * scale[2]])
                }
            };
            species.push(symbol.clone());
            positions.push(p);
        }
    }
    let mut atoms = Atoms::new(lattice, species, positions);
    atoms.comment = comment;
    Ok(atoms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silicon() -> VolumetricData {
        let lattice = Lattice::new([[0.0, 2.734364, 2.734364],
                                    [2.734364, 0.0, 2.734364],
                                    [2.734364, 2.734364, 0.0]]).unwrap();
        let atoms = Atoms::new(lattice,
                               vec![String::from("Si"), String::from("Si")],
                               vec![[0.0; 3], [0.25, 0.25, 0.1 + 0.15]]);
        let values = (0..60).map(|x| (x as f64).sqrt() * 1e-3 / 7.0)
                            .collect::<Vec<f64>>();
        let total = DensityComponent { name: String::from("total"),
                                       values,
                                       augmentation: vec![] };
        VolumetricData::new(atoms, [3, 4, 5], vec![total]).unwrap()
    }

    #[test]
    fn vasp_round_trip_no_spin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CHGCAR");
        let data = silicon();
        write(&data, &path).unwrap();
        let read = read(&path).unwrap();
        assert_eq!(read.grid, [3, 4, 5]);
        assert_eq!(read.atoms.lattice, data.atoms.lattice);
        assert_eq!(read.atoms.positions, data.atoms.positions);
        assert_eq!(read.atoms.species, data.atoms.species);
        assert_eq!(read.components, data.components);
    }

    #[test]
    fn vasp_round_trip_spin_augmentation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CHGCAR");
        let mut data = silicon();
        data.components[0].augmentation =
            vec![String::from("augmentation occupancies   1  18\n"),
                 String::from("  0.1234567E+00 -0.7654321E-01\n")];
        data.components.push(DensityComponent { name: String::from("diff"),
                                                values: vec![-1e-9; 60],
                                                augmentation: vec![] });
        write(&data, &path).unwrap();
        assert_eq!(read(&path).unwrap(), data);
    }

    #[test]
    fn vasp_read_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CHGCAR");
        write(&silicon(), &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines = text.lines().collect::<Vec<&str>>();
        assert_eq!(lines[0], "Si2");
        assert_eq!(lines[5].trim(), "Si");
        assert_eq!(lines[6].trim(), "2");
        assert_eq!(lines[7], "Direct");
        assert!(lines[10].trim().is_empty());
        assert_eq!(grid_line(lines[11]), Some([3, 4, 5]));
        // 60 values at 5 per line
        assert_eq!(lines.len(), 12 + 12);
    }

    #[test]
    fn vasp_read_cartesian_scaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("POSCAR_like");
        fs::write(&path,
                  "cubic\n2.0\n1 0 0\n0 1 0\n0 0 1\nNa Cl\n1 1\nCartesian\n0 0 0\n0.5 0.5 0.5\n\n 1 1 2\n 0.5 0.25\n")
            .unwrap();
        let data = read(&path).unwrap();
        assert_eq!(data.atoms.lattice.volume, 8.0);
        assert_eq!(data.atoms.positions[1], [0.5, 0.5, 0.5]);
        assert_eq!(data.atoms.comment, "cubic");
        assert_eq!(data.total().values, vec![0.5, 0.25]);
    }

    #[test]
    fn vasp_read_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CHGCAR");
        fs::write(&path,
                  "cubic\n1.0\n1 0 0\n0 1 0\n0 0 1\nNa\n1\nDirect\n0 0 0\n\n 2 2 2\n 1 2 3\n")
            .unwrap();
        assert!(matches!(read(&path), Err(TranscodeError::Parse { .. })))
    }
}
