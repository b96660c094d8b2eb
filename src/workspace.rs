use crate::errors::UnitError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A private scratch directory for one unit of work.
///
/// The directory is created fresh under a scratch root and is removed when
/// the area is dropped, which covers early returns through `?` and panics
/// that unwind. [`WorkArea::close`] removes it explicitly and reports
/// failures to do so.
pub struct WorkArea {
    dir: TempDir,
}

impl WorkArea {
    /// Creates a new working area below `root`, named after the identifier
    /// so a stalled unit can be found on disk.
    pub fn acquire(root: &Path, identifier: &str) -> Result<Self, UnitError> {
        let prefix = format!("{}-", sanitise(identifier));
        let dir = tempfile::Builder::new().prefix(&prefix)
                                          .tempdir_in(root)
                                          .map_err(|source| {
                                              UnitError::Workspace { path: root.to_path_buf(),
                                                                     source }
                                          })?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the working area.
    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Removes the working area.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

/// Keeps only characters that are safe in a file name.
fn sanitise(identifier: &str) -> String {
    identifier.chars()
              .map(|c| {
                  if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                      c
                  } else {
                      '_'
                  }
              })
              .collect()
}
