use crate::errors::ConfigError;
use crate::tools::{Executables, PARTITIONING, SUMMATION};
use crate::unit::Pipeline;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Filename pattern of the snapshots when none is given.
pub const DEFAULT_PATTERN: &str = r"^mp-.+\.json$";
/// Seconds an external tool may run for when no timeout is given.
pub const DEFAULT_TIMEOUT: u64 = 3600;

/// The three directories a unit draws its snapshots from. A file named after
/// the identifier must be present in each.
#[derive(Clone, Debug)]
pub struct InputDirs {
    /// Primary charge density.
    pub chgcar: PathBuf,
    /// Core density, first half of the reference.
    pub aeccar0: PathBuf,
    /// Valence density, second half of the reference.
    pub aeccar2: PathBuf,
}

impl InputDirs {
    /// The raw file name each directory's snapshot becomes inside a working
    /// area, with the directory.
    pub fn named(&self) -> [(&'static str, &Path); 3] {
        [("CHGCAR", &self.chgcar),
         ("AECCAR0", &self.aeccar0),
         ("AECCAR2", &self.aeccar2)]
    }
}

/// Everything a batch needs, built once at startup and passed down.
#[derive(Clone, Debug)]
pub struct Config {
    pub inputs: InputDirs,
    /// The summation utility, usually chgsum.pl.
    pub summation: PathBuf,
    /// The partitioning executable, usually bader.
    pub partitioning: PathBuf,
    pub result_dir: PathBuf,
    /// Root below which each unit gets its working area.
    pub scratch_dir: PathBuf,
    /// Which filenames in the input directories are identifiers.
    pub pattern: Regex,
    /// Number of workers, 0 uses every core.
    pub threads: usize,
    /// Limit on each external tool, None waits forever.
    pub timeout: Option<Duration>,
    /// Leave out units that already have a result record.
    pub skip_existing: bool,
}

impl Config {
    /// A configuration with the defaults for everything but the paths.
    pub fn new(inputs: InputDirs,
               summation: PathBuf,
               partitioning: PathBuf,
               result_dir: PathBuf)
               -> Result<Self, regex::Error> {
        Ok(Self { inputs,
                  summation,
                  partitioning,
                  result_dir,
                  scratch_dir: std::env::temp_dir(),
                  pattern: Regex::new(DEFAULT_PATTERN)?,
                  threads: 0,
                  timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT)),
                  skip_existing: false })
    }

    /// Checks the configuration before any unit runs. The result directory
    /// is created if it is missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (_, dir) in self.inputs.named().iter() {
            readable_directory(dir)?;
        }
        executable(SUMMATION, &self.summation)?;
        executable(PARTITIONING, &self.partitioning)?;
        fs::create_dir_all(&self.result_dir).map_err(|source| {
                                                ConfigError::ResultDirectory {
                                                    path: self.result_dir.clone(),
                                                    source,
                                                }
                                            })?;
        readable_directory(&self.result_dir)?;
        readable_directory(&self.scratch_dir)
    }

    /// The worker count with 0 resolved to the number of cores.
    pub fn workers(&self) -> usize {
        match self.threads {
            0 => num_cpus::get(),
            n => n,
        }
    }

    /// The unit pipeline backed by the configured executables.
    pub fn pipeline(&self) -> Pipeline<Executables> {
        Pipeline { inputs: self.inputs.clone(),
                   result_dir: self.result_dir.clone(),
                   scratch_dir: self.scratch_dir.clone(),
                   tools: Executables { summation: self.summation.clone(),
                                        partitioning: self.partitioning.clone(),
                                        timeout: self.timeout } }
    }
}

/// A directory that exists and can be listed.
pub fn readable_directory(path: &Path) -> Result<(), ConfigError> {
    let unreadable = |source| ConfigError::UnreadableDirectory { path: path.to_path_buf(),
                                                                 source };
    let metadata = fs::metadata(path).map_err(unreadable)?;
    if !metadata.is_dir() {
        return Err(ConfigError::NotADirectory { path: path.to_path_buf() });
    }
    fs::read_dir(path).map_err(unreadable)?;
    Ok(())
}

/// A regular file that the current user may run.
fn executable(tool: &'static str, path: &Path) -> Result<(), ConfigError> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(_) => {
            return Err(ConfigError::MissingExecutable { tool,
                                                        path: path.to_path_buf() })
        }
    };
    if !metadata.is_file() {
        return Err(ConfigError::NotExecutable { tool,
                                                path: path.to_path_buf() });
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ConfigError::NotExecutable { tool,
                                                    path: path.to_path_buf() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        root: TempDir,
        config: Config,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let path = root.path();
        for dir in ["chgcar", "aeccar0", "aeccar2", "bin", "scratch"].iter() {
            fs::create_dir(path.join(dir)).unwrap();
        }
        for tool in ["chgsum.pl", "bader"].iter() {
            let exe = path.join("bin").join(tool);
            fs::write(&exe, "#!/bin/sh\n").unwrap();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
            }
        }
        let inputs = InputDirs { chgcar: path.join("chgcar"),
                                 aeccar0: path.join("aeccar0"),
                                 aeccar2: path.join("aeccar2") };
        let mut config = Config::new(inputs,
                                     path.join("bin/chgsum.pl"),
                                     path.join("bin/bader"),
                                     path.join("results")).unwrap();
        config.scratch_dir = path.join("scratch");
        Fixture { root, config }
    }

    #[test]
    fn config_defaults() {
        let f = fixture();
        assert!(f.config.pattern.is_match("mp-149.json"));
        assert!(!f.config.pattern.is_match("mp-149.json.gz"));
        assert_eq!(f.config.timeout, Some(Duration::from_secs(3600)));
        assert!(f.config.workers() >= 1);
        assert!(!f.config.skip_existing);
    }

    #[test]
    fn config_validate_creates_results() {
        let f = fixture();
        assert!(!f.config.result_dir.exists());
        f.config.validate().unwrap();
        assert!(f.config.result_dir.is_dir());
    }

    #[test]
    fn config_validate_missing_input() {
        let mut f = fixture();
        f.config.inputs.aeccar2 = f.root.path().join("missing");
        assert!(matches!(f.config.validate(),
                         Err(ConfigError::UnreadableDirectory { .. })))
    }

    #[test]
    fn config_validate_input_is_file() {
        let mut f = fixture();
        f.config.inputs.chgcar = f.config.summation.clone();
        assert!(matches!(f.config.validate(),
                         Err(ConfigError::NotADirectory { .. })))
    }

    #[test]
    fn config_validate_missing_executable() {
        let mut f = fixture();
        f.config.partitioning = f.root.path().join("bin/missing");
        match f.config.validate() {
            Err(ConfigError::MissingExecutable { tool, .. }) => {
                assert_eq!(tool, PARTITIONING)
            }
            other => panic!("expected missing executable, got {:?}", other),
        }
    }

    #[test]
    fn config_validate_directory_as_executable() {
        let mut f = fixture();
        f.config.summation = f.root.path().join("bin");
        assert!(matches!(f.config.validate(),
                         Err(ConfigError::NotExecutable { .. })))
    }

    #[cfg(unix)]
    #[test]
    fn config_validate_not_executable() {
        use std::os::unix::fs::PermissionsExt;
        let f = fixture();
        fs::set_permissions(&f.config.summation,
                            fs::Permissions::from_mode(0o644)).unwrap();
        assert!(matches!(f.config.validate(),
                         Err(ConfigError::NotExecutable { .. })))
    }

    #[test]
    fn config_validate_missing_scratch() {
        let mut f = fixture();
        f.config.scratch_dir = f.root.path().join("missing");
        assert!(matches!(f.config.validate(),
                         Err(ConfigError::UnreadableDirectory { .. })))
    }

    #[test]
    fn config_pipeline() {
        let mut f = fixture();
        f.config.timeout = None;
        let pipeline = f.config.pipeline();
        assert_eq!(pipeline.tools.partitioning, f.config.partitioning);
        assert_eq!(pipeline.tools.timeout, None);
        assert_eq!(pipeline.scratch_dir, f.config.scratch_dir);
    }
}
