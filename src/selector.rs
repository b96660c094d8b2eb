use crate::config::InputDirs;
use crate::errors::ConfigError;
use crate::record;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// The identifiers in one directory: names of regular files (symlinks are
/// followed) that match `pattern`. Names that are not valid UTF-8 are skipped.
pub fn identifiers(dir: &Path,
                   pattern: &Regex)
                   -> Result<FxHashSet<String>, ConfigError> {
    let unreadable = |source| ConfigError::UnreadableDirectory { path: dir.to_path_buf(),
                                                                 source };
    let mut found = FxHashSet::default();
    for entry in fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(name) => {
                log::debug!("Skipping non UTF-8 file name {:?}", name);
                continue;
            }
        };
        if !pattern.is_match(&name) {
            continue;
        }
        match fs::metadata(entry.path()) {
            Ok(m) if m.is_file() => {
                found.insert(name);
            }
            _ => log::debug!("Skipping {}, not a regular file", entry.path().display()),
        }
    }
    Ok(found)
}

/// The work set: identifiers present in all three input directories, in
/// sorted order. Any directory that cannot be listed fails the selection.
pub fn select_units(inputs: &InputDirs,
                    pattern: &Regex)
                    -> Result<BTreeSet<String>, ConfigError> {
    let [first, second, third] = inputs.named();
    let first = identifiers(first.1, pattern)?;
    let second = identifiers(second.1, pattern)?;
    let third = identifiers(third.1, pattern)?;
    let units = first.into_iter()
                     .filter(|id| second.contains(id) && third.contains(id))
                     .collect::<BTreeSet<String>>();
    log::info!("Selected {} units", units.len());
    Ok(units)
}

/// The members of the work set that have no result record yet, the set to
/// hand back for a re-run.
pub fn pending_units(work_set: &BTreeSet<String>, result_dir: &Path) -> Vec<String> {
    work_set.iter()
            .filter(|id| !record::record_path(result_dir, id).is_file())
            .cloned()
            .collect()
}
