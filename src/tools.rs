use crate::errors::ToolError;
use crate::io::acf;
use crate::record::BaderSummary;
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Name of the reference density written by the summation utility.
pub const SUMMED_REFERENCE: &str = "CHGCAR_sum";
/// Name of the atomic charge file written by the partitioning executable.
pub const ATOMIC_CHARGE_FILE: &str = "ACF.dat";

pub const SUMMATION: &str = "summation utility";
pub const PARTITIONING: &str = "partitioning executable";
/// How often a running process is checked for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How much of stderr is kept in an error.
const STDERR_TAIL: usize = 2048;

/// The two external programs a unit depends on.
///
/// Both run inside the unit's working area and block until they finish.
pub trait ExternalTools: Sync {
    /// Sums the two reference densities into a new raw density inside
    /// `work_dir` and returns its path.
    fn run_summation(&self,
                     work_dir: &Path,
                     first: &Path,
                     second: &Path)
                     -> Result<PathBuf, ToolError>;

    /// Partitions `density` using `reference` and returns the summary.
    fn run_partitioning(&self,
                        work_dir: &Path,
                        density: &Path,
                        reference: &Path)
                        -> Result<BaderSummary, ToolError>;
}

/// The real executables, the summation script (chgsum.pl) and the bader binary.
#[derive(Clone, Debug)]
pub struct Executables {
    pub summation: PathBuf,
    pub partitioning: PathBuf,
    /// Limit on each run, None waits forever.
    pub timeout: Option<Duration>,
}

/// What a finished process left behind.
#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs `program` in `work_dir`, writing its stdout and stderr to
/// `<stem>.stdout` and `<stem>.stderr` in the same directory. A non-zero
/// exit or an expired timeout is an error.
pub fn run_tool(tool: &'static str,
                program: &Path,
                args: &[OsString],
                work_dir: &Path,
                stem: &str,
                timeout: Option<Duration>)
                -> Result<ToolOutput, ToolError> {
    let io_error = |source| ToolError::Io { tool, source };
    let stdout_path = work_dir.join(format!("{}.stdout", stem));
    let stderr_path = work_dir.join(format!("{}.stderr", stem));
    let stdout = File::create(&stdout_path).map_err(io_error)?;
    let stderr = File::create(&stderr_path).map_err(io_error)?;
    // relative to where the batch was started, not to the working area
    let program = absolute(program).map_err(io_error)?;
    log::debug!("Running {} {} in {}",
                program.display(),
                args.iter()
                    .map(|a| a.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" "),
                work_dir.display());
    let mut command = Command::new(&program);
    command.args(args)
           .current_dir(work_dir)
           .stdin(Stdio::null())
           .stdout(stdout)
           .stderr(stderr);
    let mut child = spawn(&mut command).map_err(|source| ToolError::Spawn { tool,
                                                                            source })?;
    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().map_err(io_error)? {
            break status;
        }
        if let Some(limit) = timeout {
            if start.elapsed() >= limit {
                // the process may have exited in the meantime, only the wait matters
                let _ = child.kill();
                child.wait().map_err(io_error)?;
                return Err(ToolError::Timeout { tool, after: limit });
            }
        }
        thread::sleep(POLL_INTERVAL);
    };
    let stdout = fs::read_to_string(&stdout_path).map_err(io_error)?;
    let stderr = fs::read_to_string(&stderr_path).map_err(io_error)?;
    if !status.success() {
        return Err(ToolError::Exit { tool,
                                     code: status.code(),
                                     stderr: tail(&stderr) });
    }
    log::debug!("{} finished in {:?}", tool, start.elapsed());
    Ok(ToolOutput { stdout, stderr })
}

/// Starts the command, retrying briefly while the executable is still held
/// open for writing by a process that is about to exec (ETXTBSY).
fn spawn(command: &mut Command) -> std::io::Result<Child> {
    const TEXT_FILE_BUSY: i32 = 26;
    let mut attempts = 0;
    loop {
        match command.spawn() {
            Err(e) if cfg!(unix) && e.raw_os_error() == Some(TEXT_FILE_BUSY) && attempts < 10 => {
                attempts += 1;
                thread::sleep(POLL_INTERVAL);
            }
            result => return result,
        }
    }
}

/// The last few lines of a process's error output.
fn tail(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().rev().nth(STDERR_TAIL) {
        Some((i, c)) => format!("...{}", &text[i + c.len_utf8()..]),
        None => text.to_string(),
    }
}

/// Makes a path absolute so it survives a change of working directory.
fn absolute(path: &Path) -> Result<PathBuf, std::io::Error> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

impl ExternalTools for Executables {
    fn run_summation(&self,
                     work_dir: &Path,
                     first: &Path,
                     second: &Path)
                     -> Result<PathBuf, ToolError> {
        let io_error = |source| ToolError::Io { tool: SUMMATION,
                                                source };
        let output = work_dir.join(SUMMED_REFERENCE);
        let args = [absolute(first).map_err(io_error)?.into_os_string(),
                    absolute(second).map_err(io_error)?.into_os_string()];
        let result = run_tool(SUMMATION,
                              &self.summation,
                              &args,
                              work_dir,
                              "chgsum",
                              self.timeout);
        if let Err(e) = result {
            // never leave a partial reference behind for the partitioning step
            if output.exists() {
                fs::remove_file(&output).map_err(io_error)?;
            }
            return Err(e);
        }
        if !output.is_file() {
            return Err(ToolError::MissingOutput { tool: SUMMATION,
                                                  path: output });
        }
        Ok(output)
    }

    fn run_partitioning(&self,
                        work_dir: &Path,
                        density: &Path,
                        reference: &Path)
                        -> Result<BaderSummary, ToolError> {
        let io_error = |source| ToolError::Io { tool: PARTITIONING,
                                                source };
        let args = [absolute(density).map_err(io_error)?.into_os_string(),
                    OsString::from("-ref"),
                    absolute(reference).map_err(io_error)?.into_os_string()];
        let output = run_tool(PARTITIONING,
                              &self.partitioning,
                              &args,
                              work_dir,
                              "bader",
                              self.timeout)?;
        let acf_path = work_dir.join(ATOMIC_CHARGE_FILE);
        if !acf_path.is_file() {
            return Err(ToolError::MissingOutput { tool: PARTITIONING,
                                                  path: acf_path });
        }
        let text = fs::read_to_string(&acf_path).map_err(io_error)?;
        let acf = acf::parse(&text).map_err(|details| ToolError::Output {
                                        tool: PARTITIONING,
                                        details,
                                    })?;
        let bader_version = acf::version(&output.stdout).unwrap_or_else(|| {
                                log::warn!("No version found in the output of {}",
                                           self.partitioning.display());
                                -1.0
                            });
        Ok(BaderSummary { charge: acf.charge,
                          min_dist: acf.min_dist,
                          atomic_volume: acf.atomic_volume,
                          vacuum_charge: acf.vacuum_charge,
                          vacuum_volume: acf.vacuum_volume,
                          reference_used: true,
                          bader_version })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_tail_short() {
        assert_eq!(tail("  error: bad file\n"), "error: bad file")
    }

    #[test]
    fn tools_tail_long() {
        let text = "x".repeat(STDERR_TAIL * 2);
        let t = tail(&text);
        assert!(t.starts_with("..."));
        assert_eq!(t.len(), STDERR_TAIL + 3);
    }

    #[test]
    fn tools_spawn_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_tool("test",
                              &dir.path().join("does-not-exist"),
                              &[],
                              dir.path(),
                              "missing",
                              None);
        assert!(matches!(result, Err(ToolError::Spawn { .. })))
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Writes an executable shell script into `dir`.
        fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        const ACF: &str = "    #         X           Y           Z       CHARGE      MIN DIST   ATOMIC VOL
 --------------------------------------------------------------------------------
    1      0.0000      0.0000      0.0000      1.5000      0.9000      8.0000
 --------------------------------------------------------------------------------
    VACUUM CHARGE:               0.0000
    VACUUM VOLUME:               0.0000
    NUMBER OF ELECTRONS:         1.5000";

        fn executables(bin: &Path, chgsum: &str, bader: &str) -> Executables {
            Executables { summation: script(bin, "chgsum.pl", chgsum),
                          partitioning: script(bin, "bader", bader),
                          timeout: Some(Duration::from_secs(10)) }
        }

        #[test]
        fn tools_summation_success() {
            let bin = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            // the script sees absolute paths and runs in the working area
            let tools = executables(bin.path(),
                                    "cat \"$1\" \"$2\" > CHGCAR_sum",
                                    "exit 0");
            fs::write(work.path().join("AECCAR0"), "a\n").unwrap();
            fs::write(work.path().join("AECCAR2"), "b\n").unwrap();
            let reference = tools.run_summation(work.path(),
                                                &work.path().join("AECCAR0"),
                                                &work.path().join("AECCAR2"))
                                 .unwrap();
            assert_eq!(reference, work.path().join(SUMMED_REFERENCE));
            assert_eq!(fs::read_to_string(reference).unwrap(), "a\nb\n");
        }

        #[test]
        fn tools_relative_program_path() {
            // relative to the current directory, which the tools leave
            let bin = tempfile::tempdir_in(".").unwrap();
            let work = tempfile::tempdir().unwrap();
            let mut tools = executables(bin.path(), "cat \"$1\" > CHGCAR_sum", "exit 0");
            let current = std::env::current_dir().unwrap();
            let relative = tools.summation.strip_prefix(&current).unwrap().to_path_buf();
            tools.summation = relative;
            assert!(tools.summation.is_relative());
            fs::write(work.path().join("AECCAR0"), "a\n").unwrap();
            let reference = tools.run_summation(work.path(),
                                                &work.path().join("AECCAR0"),
                                                &work.path().join("AECCAR2"))
                                 .unwrap();
            assert_eq!(fs::read_to_string(reference).unwrap(), "a\n");
        }

        #[test]
        fn tools_summation_failure_removes_partial_output() {
            let bin = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let tools = executables(bin.path(),
                                    "echo partial > CHGCAR_sum; echo 'cannot open' >&2; exit 3",
                                    "exit 0");
            let result = tools.run_summation(work.path(),
                                             &work.path().join("AECCAR0"),
                                             &work.path().join("AECCAR2"));
            match result {
                Err(ToolError::Exit { code, stderr, .. }) => {
                    assert_eq!(code, Some(3));
                    assert_eq!(stderr, "cannot open");
                }
                other => panic!("expected exit error, got {:?}", other),
            }
            assert!(!work.path().join(SUMMED_REFERENCE).exists());
        }

        #[test]
        fn tools_summation_missing_output() {
            let bin = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let tools = executables(bin.path(), "exit 0", "exit 0");
            let result = tools.run_summation(work.path(),
                                             &work.path().join("AECCAR0"),
                                             &work.path().join("AECCAR2"));
            assert!(matches!(result, Err(ToolError::MissingOutput { .. })))
        }

        #[test]
        fn tools_timeout() {
            let bin = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let mut tools = executables(bin.path(), "sleep 5", "exit 0");
            tools.timeout = Some(Duration::from_millis(100));
            let start = Instant::now();
            let result = tools.run_summation(work.path(),
                                             &work.path().join("AECCAR0"),
                                             &work.path().join("AECCAR2"));
            assert!(matches!(result, Err(ToolError::Timeout { .. })));
            assert!(start.elapsed() < Duration::from_secs(5));
        }

        #[test]
        fn tools_partitioning_success() {
            let bin = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let bader = format!("[ \"$2\" = \"-ref\" ] || exit 1\necho '  GRID BASED BADER ANALYSIS  (Version 1.04 11/12/19)'\ncat > ACF.dat <<'EOF'\n{}\nEOF",
                                ACF);
            let tools = executables(bin.path(), "exit 0", &bader);
            let summary = tools.run_partitioning(work.path(),
                                                 &work.path().join("CHGCAR"),
                                                 &work.path().join("CHGCAR_sum"))
                               .unwrap();
            assert_eq!(summary.charge, vec![1.5]);
            assert_eq!(summary.min_dist, vec![0.9]);
            assert_eq!(summary.atomic_volume, vec![8.0]);
            assert!(summary.reference_used);
            assert_eq!(summary.bader_version, 1.04);
            // output of the tool is kept next to its results
            assert!(work.path().join("bader.stdout").is_file());
        }

        #[test]
        fn tools_partitioning_unknown_version() {
            let bin = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let bader = format!("cat > ACF.dat <<'EOF'\n{}\nEOF", ACF);
            let tools = executables(bin.path(), "exit 0", &bader);
            let summary = tools.run_partitioning(work.path(),
                                                 &work.path().join("CHGCAR"),
                                                 &work.path().join("CHGCAR_sum"))
                               .unwrap();
            assert_eq!(summary.bader_version, -1.0);
        }

        #[test]
        fn tools_partitioning_bad_table() {
            let bin = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let tools = executables(bin.path(), "exit 0", "echo nonsense > ACF.dat");
            let result = tools.run_partitioning(work.path(),
                                                &work.path().join("CHGCAR"),
                                                &work.path().join("CHGCAR_sum"));
            assert!(matches!(result, Err(ToolError::Output { .. })))
        }
    }
}
