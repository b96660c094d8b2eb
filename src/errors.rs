use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Problems with the supplied configuration. These are fatal before any unit
/// of work is started.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read directory {path}: {source}")]
    UnreadableDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("the {tool} executable {path} does not exist")]
    MissingExecutable { tool: &'static str, path: PathBuf },

    #[error("the {tool} executable {path} is not executable")]
    NotExecutable { tool: &'static str, path: PathBuf },

    #[error("unable to create result directory {path}: {source}")]
    ResultDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failure to turn a stored snapshot into a raw density file.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed snapshot document {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid density data: {0}")]
    Shape(String),

    #[error("site {index} is disordered ({count} species), cannot be written")]
    DisorderedSite { index: usize, count: usize },

    #[error("unsupported density component \"{0}\"")]
    UnknownComponent(String),

    #[error("lattice doesn't span 3D space")]
    SingularLattice,

    #[error("failed to parse raw density {path}: {details} (at line ~{line})")]
    Parse {
        path: PathBuf,
        line: usize,
        details: String,
    },

    #[error("grid mismatch: {first} has {first_grid:?} but {second} has {second_grid:?}")]
    GridMismatch {
        first: String,
        first_grid: [usize; 3],
        second: String,
        second_grid: [usize; 3],
    },
}

impl TranscodeError {
    pub fn parse(path: impl Into<PathBuf>,
                 line: usize,
                 details: impl Into<String>)
                 -> Self {
        Self::Parse { path: path.into(),
                      line,
                      details: details.into() }
    }
}

/// Failure of one of the external executables.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: &'static str,
        source: std::io::Error,
    },

    #[error("{tool} exited with {}: {stderr}", exit_code(.code))]
    Exit {
        tool: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} did not finish within {after:?} and was killed")]
    Timeout { tool: &'static str, after: Duration },

    #[error("{tool} did not produce {path}")]
    MissingOutput { tool: &'static str, path: PathBuf },

    #[error("unable to understand the output of {tool}: {details}")]
    Output {
        tool: &'static str,
        details: String,
    },

    #[error("I/O error while running {tool}: {source}")]
    Io {
        tool: &'static str,
        source: std::io::Error,
    },
}

/// Describes how a process ended for the error message.
fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => String::from("a signal"),
    }
}

/// Everything that can stop a single unit. None of these escape the unit.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("unable to create a working area in {path}: {source}")]
    Workspace {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to copy {path} into the working area: {source}")]
    Copy {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("unable to persist result record {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unit panicked: {0}")]
    Panicked(String),
}

/// Failure to rebuild the summary table.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("result record {path} does not match the summary schema: {source}")]
    Schema {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unable to write the summary table: {0}")]
    Csv(#[from] csv::Error),
}

/// Error for reading of Arguments.
#[derive(Debug, Error)]
pub enum ArgumentError {
    /// Didn't pass a value.
    #[error("The option \"{0}\" requires a value to be supplied.")]
    NoValue(&'static str),
    /// Passed a value that isn't usable.
    #[error("The value \"{1}\" is not valid input for the option \"{0}\": {2}")]
    NotValidValue(&'static str, String, String),
    /// No subcommand given.
    #[error("No subcommand supplied, see --help.")]
    NoSubcommand,
}
