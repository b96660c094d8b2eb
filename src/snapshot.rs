use crate::atoms::{Atoms, Lattice};
use crate::density::{DensityComponent, VolumetricData};
use crate::errors::TranscodeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A values grid as stored in the document, indexed `[x][y][z]`.
pub type NestedGrid = Vec<Vec<Vec<f64>>>;

/// The stored document. Only `data` is read, anything else the database
/// attached to the record is ignored.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SnapshotDocument {
    pub data: ChargeDensityDocument,
}

/// A serialized charge density: the structure and one grid per component.
///
/// The structure is either stored directly or wrapped in a `poscar` object
/// together with the comment line. A component mapped to `null` in
/// `data_aug` has no augmentation lines.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChargeDensityDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<StructureDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poscar: Option<PoscarDocument>,
    pub data: BTreeMap<String, NestedGrid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_aug: Option<BTreeMap<String, Option<Vec<String>>>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PoscarDocument {
    pub structure: StructureDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StructureDocument {
    pub lattice: LatticeDocument,
    pub sites: Vec<SiteDocument>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LatticeDocument {
    pub matrix: [[f64; 3]; 3],
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SiteDocument {
    pub species: Vec<SpeciesDocument>,
    /// Fractional coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abc: Option<[f64; 3]>,
    /// Cartesian coordinates, used when `abc` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xyz: Option<[f64; 3]>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SpeciesDocument {
    pub element: String,
    #[serde(default = "full_occupancy")]
    pub occu: f64,
}

fn full_occupancy() -> f64 {
    1.0
}

/// Reads a snapshot document from disk and converts it.
pub fn load(path: &Path) -> Result<VolumetricData, TranscodeError> {
    let text = fs::read(path).map_err(|source| TranscodeError::Io {
                                 path: path.to_path_buf(),
                                 source,
                             })?;
    let document: SnapshotDocument =
        serde_json::from_slice(&text).map_err(|source| {
                                         TranscodeError::Json {
                                             path: path.to_path_buf(),
                                             source,
                                         }
                                     })?;
    document.data.into_volumetric()
}

impl ChargeDensityDocument {
    /// Converts the document into [`VolumetricData`], flattening every grid
    /// so that x runs fastest.
    pub fn into_volumetric(self) -> Result<VolumetricData, TranscodeError> {
        let (structure, comment) = match (self.structure, self.poscar) {
            (Some(structure), _) => (structure, None),
            (None, Some(poscar)) => (poscar.structure, poscar.comment),
            (None, None) => {
                return Err(TranscodeError::Shape(String::from("no structure")))
            }
        };
        let lattice = Lattice::new(structure.lattice.matrix)?;
        let mut species = Vec::with_capacity(structure.sites.len());
        let mut positions = Vec::with_capacity(structure.sites.len());
        for (index, site) in structure.sites.into_iter().enumerate() {
            let element = match site.species.as_slice() {
                [only] => only.element.clone(),
                other => {
                    return Err(TranscodeError::DisorderedSite { index,
                                                                count: other.len() })
                }
            };
            let position = match (site.abc, site.xyz) {
                (Some(abc), _) => abc,
                (None, Some(xyz)) => lattice.fractional(xyz),
                (None, None) => {
                    return Err(TranscodeError::Shape(format!("site {} has no coordinates",
                                                             index)))
                }
            };
            species.push(element);
            positions.push(position);
        }
        let mut atoms = Atoms::new(lattice, species, positions);
        // the comment is a single line of the raw file
        if let Some(line) = comment.as_deref()
                                   .and_then(|c| c.lines().next())
                                   .map(str::trim)
                                   .filter(|l| !l.is_empty())
        {
            atoms.comment = line.to_string();
        }
        let mut augmentation = self.data_aug.unwrap_or_default();
        let mut grid = None;
        let mut components = Vec::with_capacity(self.data.len());
        for (name, nested) in self.data.into_iter() {
            let (shape, values) = flatten(&name, &nested)?;
            match grid {
                None => grid = Some(shape),
                Some(g) if g != shape => {
                    return Err(TranscodeError::Shape(format!(
                        "component {} has shape {:?}, expected {:?}",
                        name, shape, g
                    )))
                }
                _ => (),
            }
            let augmentation = augmentation.remove(&name)
                                            .flatten()
                                            .unwrap_or_default();
            components.push(DensityComponent { name,
                                               values,
                                               augmentation });
        }
        let grid = grid.ok_or_else(|| {
                           TranscodeError::Shape(String::from("no density components"))
                       })?;
        VolumetricData::new(atoms, grid, components)
    }
}

/// Flattens a `[x][y][z]` grid into file order, rejecting ragged input.
fn flatten(name: &str,
           nested: &[Vec<Vec<f64>>])
           -> Result<([usize; 3], Vec<f64>), TranscodeError> {
    let nx = nested.len();
    let ny = nested.first().map_or(0, |plane| plane.len());
    let nz = nested.first()
                   .and_then(|plane| plane.first())
                   .map_or(0, |line| line.len());
    let ragged = nested.iter().any(|plane| {
                                  plane.len() != ny
                                  || plane.iter().any(|line| line.len() != nz)
                              });
    if ragged {
        return Err(TranscodeError::Shape(format!("component {} is ragged",
                                                 name)));
    }
    let mut values = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for plane in nested.iter() {
                values.push(plane[j][k]);
            }
        }
    }
    Ok(([nx, ny, nz], values))
}
