use crate::config::InputDirs;
use crate::errors::{TranscodeError, UnitError};
use crate::io::vasp;
use crate::record;
use crate::snapshot;
use crate::tools::ExternalTools;
use crate::workspace::WorkArea;
use std::fs;
use std::path::PathBuf;

/// Processes single units: snapshots in, one result record out.
///
/// A pipeline holds no mutable state so one instance is shared by every
/// worker of a batch.
pub struct Pipeline<T: ExternalTools> {
    pub inputs: InputDirs,
    pub result_dir: PathBuf,
    /// Root below which each unit gets its working area.
    pub scratch_dir: PathBuf,
    pub tools: T,
}

impl<T: ExternalTools> Pipeline<T> {
    /// Runs one unit to completion and returns the path of its record.
    ///
    /// The working area is removed on every path out of this function. On
    /// error no record is written for `identifier`; a record from an earlier
    /// run is left alone.
    pub fn process_unit(&self, identifier: &str) -> Result<PathBuf, UnitError> {
        log::debug!("Starting unit {}", identifier);
        let area = WorkArea::acquire(&self.scratch_dir, identifier)?;
        let named = self.inputs.named();
        for (name, dir) in named.iter() {
            let source = dir.join(identifier);
            fs::copy(&source, area.join(&format!("{}.json", name))).map_err(|e| {
                UnitError::Copy { path: source.clone(),
                                  source: e }
            })?;
        }
        let mut grids = Vec::with_capacity(named.len());
        for (name, _) in named.iter() {
            grids.push((*name, transcode(&area, name)?));
        }
        check_grids(&grids)?;
        let reference = self.tools.run_summation(area.path(),
                                                 &area.join("AECCAR0"),
                                                 &area.join("AECCAR2"))?;
        let summary = self.tools.run_partitioning(area.path(),
                                                  &area.join("CHGCAR"),
                                                  &reference)?;
        let path = record::persist(&self.result_dir, identifier, &summary)?;
        let scratch = area.path().to_path_buf();
        if let Err(e) = area.close() {
            log::warn!("Unable to remove working area {}: {}", scratch.display(), e);
        }
        log::debug!("Finished unit {}", identifier);
        Ok(path)
    }
}

/// Converts `<name>.json` in the working area into the raw file `<name>`
/// and returns its grid.
fn transcode(area: &WorkArea, name: &str) -> Result<[usize; 3], TranscodeError> {
    let data = snapshot::load(&area.join(&format!("{}.json", name)))?;
    let raw = area.join(name);
    vasp::write(&data, &raw).map_err(|source| TranscodeError::Io { path: raw.clone(),
                                                                   source })?;
    Ok(data.grid)
}

/// The three densities of a unit must share one grid.
fn check_grids(grids: &[(&str, [usize; 3])]) -> Result<(), TranscodeError> {
    let (first, first_grid) = match grids.first() {
        Some(g) => *g,
        None => return Ok(()),
    };
    match grids.iter().find(|(_, grid)| *grid != first_grid) {
        Some((second, second_grid)) => {
            Err(TranscodeError::GridMismatch { first: first.to_string(),
                                               first_grid,
                                               second: second.to_string(),
                                               second_grid: *second_grid })
        }
        None => Ok(()),
    }
}
