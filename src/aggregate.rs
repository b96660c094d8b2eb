use crate::errors::AggregateError;
use crate::record::{self, BaderSummary};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Name of the table written into the result directory.
pub const SUMMARY_FILE: &str = "summary.csv";
/// The columns of the table, in order.
pub const HEADER: [&str; 8] = ["task_id",
                               "charge",
                               "min_dist",
                               "atomic_volume",
                               "vacuum_charge",
                               "vacuum_volume",
                               "reference_used",
                               "bader_version"];

/// One record flattened into a row.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryRow {
    pub task_id: String,
    pub summary: BaderSummary,
}

impl SummaryRow {
    /// The cells of the row in [`HEADER`] order. Lists are written as JSON
    /// arrays and numbers as JSON numbers.
    pub fn cells(&self) -> serde_json::Result<[String; 8]> {
        let s = &self.summary;
        Ok([self.task_id.clone(),
            serde_json::to_string(&s.charge)?,
            serde_json::to_string(&s.min_dist)?,
            serde_json::to_string(&s.atomic_volume)?,
            serde_json::to_string(&s.vacuum_charge)?,
            serde_json::to_string(&s.vacuum_volume)?,
            serde_json::to_string(&s.reference_used)?,
            serde_json::to_string(&s.bader_version)?])
    }
}

/// Every result record of a directory, one row each, sorted by identifier.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SummaryTable {
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// Reads every record in `result_dir`. Files that are not records, and
    /// temporary files of records still being written, are ignored.
    pub fn collect(result_dir: &Path) -> Result<Self, AggregateError> {
        let io_error = |source| AggregateError::Io { path: result_dir.to_path_buf(),
                                                     source };
        let mut records = Vec::new();
        for entry in fs::read_dir(result_dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if let Some(task_id) = record::identifier_from_path(&path) {
                if path.is_file() {
                    records.push((task_id, path));
                }
            }
        }
        records.sort();
        let rows = records.into_iter()
                          .map(|(task_id, path)| -> Result<SummaryRow, AggregateError> {
                              Ok(SummaryRow { task_id,
                                              summary: record::load(&path)? })
                          })
                          .collect::<Result<Vec<_>, AggregateError>>()?;
        Ok(Self { rows })
    }

    /// Writes the table as CSV through a temporary file that replaces `path`
    /// once complete.
    pub fn write(&self, path: &Path) -> Result<(), AggregateError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let io_error = |source| AggregateError::Io { path: path.to_path_buf(),
                                                     source };
        let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
        {
            let mut writer = csv::Writer::from_writer(&mut file);
            writer.write_record(&HEADER)?;
            for row in self.rows.iter() {
                let cells = row.cells().map_err(|source| AggregateError::Schema {
                                           path: record::record_path(dir, &row.task_id),
                                           source,
                                       })?;
                writer.write_record(&cells)?;
            }
            writer.flush().map_err(io_error)?;
        }
        file.as_file().sync_all().map_err(io_error)?;
        file.persist(path).map_err(|e| io_error(e.error))?;
        Ok(())
    }
}

/// Rebuilds `summary.csv` in `result_dir` from the records there and returns
/// the path of the table. The previous table is replaced completely.
pub fn aggregate(result_dir: &Path) -> Result<(PathBuf, SummaryTable), AggregateError> {
    let table = SummaryTable::collect(result_dir)?;
    let path = result_dir.join(SUMMARY_FILE);
    table.write(&path)?;
    log::info!("Wrote {} rows to {}", table.rows.len(), path.display());
    Ok((path, table))
}
