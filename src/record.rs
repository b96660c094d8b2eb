use crate::errors::{AggregateError, UnitError};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Suffix that turns an identifier into the name of its result record.
pub const RECORD_SUFFIX: &str = "_result.json";

/// The summary of one partitioning run. The field order is the order in
/// which they are serialized, which keeps records byte-for-byte reproducible.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaderSummary {
    /// Charge assigned to each atom.
    pub charge: Vec<f64>,
    /// Minimum distance from each atom to the surface of its volume.
    pub min_dist: Vec<f64>,
    /// Volume assigned to each atom.
    pub atomic_volume: Vec<f64>,
    pub vacuum_charge: f64,
    pub vacuum_volume: f64,
    /// Whether a reference density was used to find the partitions.
    pub reference_used: bool,
    /// Version of the partitioning executable, -1 if it could not be found.
    pub bader_version: f64,
}

/// Path of the result record for `identifier`.
pub fn record_path(result_dir: &Path, identifier: &str) -> PathBuf {
    result_dir.join(format!("{}{}", identifier, RECORD_SUFFIX))
}

/// The identifier a record file belongs to, None if it is not a record.
pub fn identifier_from_path(path: &Path) -> Option<String> {
    path.file_name()?
        .to_str()?
        .strip_suffix(RECORD_SUFFIX)
        .filter(|id| !id.is_empty())
        .map(String::from)
}

/// Serializes a summary into the exact bytes stored on disk.
pub fn to_bytes(summary: &BaderSummary) -> serde_json::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(summary)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes the record through a temporary file in the result directory and
/// renames it into place, so a reader only ever sees a complete record.
pub fn persist(result_dir: &Path,
               identifier: &str,
               summary: &BaderSummary)
               -> Result<PathBuf, UnitError> {
    let path = record_path(result_dir, identifier);
    let error = |source: std::io::Error| UnitError::Persist { path: path.clone(),
                                                              source };
    // JSON has no NaN or infinity, they would be read back as null
    let finite = summary.charge
                        .iter()
                        .chain(summary.min_dist.iter())
                        .chain(summary.atomic_volume.iter())
                        .chain([summary.vacuum_charge,
                                summary.vacuum_volume,
                                summary.bader_version].iter())
                        .all(|v| v.is_finite());
    if !finite {
        return Err(error(std::io::Error::new(std::io::ErrorKind::InvalidData,
                                             "summary holds a value that is not finite")));
    }
    let bytes = to_bytes(summary).map_err(|e| error(e.into()))?;
    let mut file = NamedTempFile::new_in(result_dir).map_err(error)?;
    file.write_all(&bytes).map_err(error)?;
    file.as_file().sync_all().map_err(error)?;
    file.persist(&path).map_err(|e| error(e.error))?;
    Ok(path)
}

/// Reads a record back, any difference from the summary fields is a schema
/// error.
pub fn load(path: &Path) -> Result<BaderSummary, AggregateError> {
    let bytes = std::fs::read(path).map_err(|source| AggregateError::Io {
                                       path: path.to_path_buf(),
                                       source,
                                   })?;
    serde_json::from_slice(&bytes).map_err(|source| AggregateError::Schema {
                                      path: path.to_path_buf(),
                                      source,
                                  })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> BaderSummary {
        BaderSummary { charge: vec![7.1, 0.9],
                       min_dist: vec![1.2, 0.8],
                       atomic_volume: vec![10.5, 3.25],
                       vacuum_charge: 0.0,
                       vacuum_volume: 0.0,
                       reference_used: true,
                       bader_version: 1.04 }
    }

    #[test]
    fn record_path_and_identifier() {
        let path = record_path(Path::new("results"), "mp-149.json");
        assert_eq!(path, Path::new("results/mp-149.json_result.json"));
        assert_eq!(identifier_from_path(&path), Some(String::from("mp-149.json")));
        assert_eq!(identifier_from_path(Path::new("results/summary.csv")), None);
        assert_eq!(identifier_from_path(Path::new("_result.json")), None);
    }

    #[test]
    fn record_field_order() {
        let text = String::from_utf8(to_bytes(&summary()).unwrap()).unwrap();
        assert_eq!(text,
                   "{\"charge\":[7.1,0.9],\"min_dist\":[1.2,0.8],\"atomic_volume\":[10.5,3.25],\"vacuum_charge\":0.0,\"vacuum_volume\":0.0,\"reference_used\":true,\"bader_version\":1.04}\n");
    }

    #[test]
    fn record_persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = persist(dir.path(), "mp-1", &summary()).unwrap();
        assert_eq!(load(&path).unwrap(), summary());
        // only the record is left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn record_persist_not_finite() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = summary();
        bad.charge[1] = f64::NAN;
        assert!(matches!(persist(dir.path(), "mp-1", &bad),
                         Err(UnitError::Persist { .. })));
        bad.charge[1] = 0.9;
        bad.vacuum_volume = f64::INFINITY;
        assert!(persist(dir.path(), "mp-1", &bad).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn record_persist_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(persist(&missing, "mp-1", &summary()),
                         Err(UnitError::Persist { .. })))
    }

    #[test]
    fn record_rejects_unknown_field() {
        let text = "{\"charge\":[],\"min_dist\":[],\"atomic_volume\":[],\"vacuum_charge\":0.0,\"vacuum_volume\":0.0,\"reference_used\":true,\"bader_version\":1.0,\"extra\":1}";
        assert!(serde_json::from_str::<BaderSummary>(text).is_err())
    }
}
