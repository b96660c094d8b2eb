use crate::config::{Config, InputDirs, DEFAULT_PATTERN, DEFAULT_TIMEOUT};
use crate::errors::ArgumentError;
use clap::{value_parser, Arg, ArgMatches, Command};
use log::LevelFilter;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;

/// What the command-line asked for.
#[derive(Debug)]
pub enum Action {
    /// Process every pending unit then rebuild the summary table.
    Run(Config),
    /// Process one unit.
    Unit(Config, String),
    /// List the units without a result record.
    Pending(Config),
    /// Rebuild the summary table of a result directory.
    Aggregate(PathBuf),
}

/// Create a container for dealing with clap and being able to test arg parsing
pub enum ClapApp {
    App,
}

impl ClapApp {
    /// Create and return the clap::Command
    pub fn get(&self) -> Command<'static> {
        Command::new("bader-batch")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Batch Bader charge analysis of stored charge densities.")
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(Arg::new("verbose")
                .short('v')
                .long("verbose")
                .multiple_occurrences(true)
                .help("Log more, repeat for more detail."))
            .arg(Arg::new("quiet")
                .short('q')
                .long("quiet")
                .conflicts_with("verbose")
                .help("Only log errors."))
            .subcommand(Command::new("run")
                .about("Process every unit of the work set, then aggregate.")
                .args(config_args())
                .arg(Arg::new("skip existing")
                    .long("skip-existing")
                    .help("Leave out units that already have a result record.")
                    .long_help(
"Units whose {id}_result.json is already in the result directory are not
processed again. Without this flag every unit of the work set is processed and
existing records are replaced.")))
            .subcommand(Command::new("unit")
                .about("Process a single unit.")
                .long_about(
"Process the unit named by ID, for use with an external batch scheduler. The
exit status is non-zero when the unit fails.")
                .args(config_args())
                .arg(Arg::new("id")
                    .required(true)
                    .index(1)
                    .value_parser(value_parser!(String))
                    .help("The identifier, the file name shared by the three inputs.")))
            .subcommand(Command::new("pending")
                .about("Print the units of the work set that have no result record.")
                .args(config_args()))
            .subcommand(Command::new("aggregate")
                .about("Rebuild summary.csv from the records in a result directory.")
                .arg(Arg::new("results")
                    .required(true)
                    .index(1)
                    .value_parser(value_parser!(PathBuf))
                    .help("The result directory.")))
    }
}

/// The options every subcommand that touches units shares.
fn config_args() -> Vec<Arg<'static>> {
    vec![
        Arg::new("chgcar")
            .long("chgcar")
            .required(true)
            .takes_value(true)
            .value_parser(value_parser!(PathBuf))
            .help("Directory of the charge density snapshots."),
        Arg::new("aeccar0")
            .long("aeccar0")
            .required(true)
            .takes_value(true)
            .value_parser(value_parser!(PathBuf))
            .help("Directory of the core density snapshots."),
        Arg::new("aeccar2")
            .long("aeccar2")
            .required(true)
            .takes_value(true)
            .value_parser(value_parser!(PathBuf))
            .help("Directory of the valence density snapshots."),
        Arg::new("chgsum")
            .long("chgsum")
            .required(true)
            .takes_value(true)
            .value_parser(value_parser!(PathBuf))
            .help("Path to the summation utility (chgsum.pl)."),
        Arg::new("bader")
            .long("bader")
            .required(true)
            .takes_value(true)
            .value_parser(value_parser!(PathBuf))
            .help("Path to the bader executable."),
        Arg::new("results")
            .short('o')
            .long("results")
            .required(true)
            .takes_value(true)
            .value_parser(value_parser!(PathBuf))
            .help("Directory the result records and summary.csv are written to."),
        Arg::new("scratch")
            .long("scratch")
            .takes_value(true)
            .value_parser(value_parser!(PathBuf))
            .help("Directory the working areas are created in.")
            .long_help(
"Each unit gets a fresh working area below this directory which is removed when
the unit finishes. Defaults to the system temporary directory."),
        Arg::new("pattern")
            .short('p')
            .long("pattern")
            .takes_value(true)
            .default_value(DEFAULT_PATTERN)
            .value_parser(value_parser!(String))
            .help("Regular expression that file names of snapshots match."),
        Arg::new("threads")
            .short('J')
            .long("threads")
            .takes_value(true)
            .default_value("0")
            .value_parser(value_parser!(usize))
            .help("Number of units to process at once.")
            .long_help(
"The number of threads to be used by the program. A default value of 0 is used
to allow the program to best decide how to use the available hardware."),
        Arg::new("timeout")
            .short('t')
            .long("timeout")
            .takes_value(true)
            .default_value("3600")
            .value_parser(value_parser!(u64))
            .help("Seconds each external tool may run for, 0 for no limit."),
    ]
}

/// Holds the arguments passed to the program from the command-line
#[derive(Debug)]
pub struct Args {
    pub action: Action,
    pub verbosity: LevelFilter,
}

impl Args {
    /// Initialises the structure from the command-line arguments.
    pub fn new(arguments: ArgMatches) -> Result<Self, ArgumentError> {
        let verbosity = if arguments.is_present("quiet") {
            LevelFilter::Error
        } else {
            match arguments.occurrences_of("verbose") {
                0 => LevelFilter::Info,
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        };
        let action = match arguments.subcommand() {
            Some(("run", m)) => {
                let mut config = config(m)?;
                config.skip_existing = m.is_present("skip existing");
                Action::Run(config)
            }
            Some(("unit", m)) => {
                let id = m.get_one::<String>("id")
                          .ok_or(ArgumentError::NoValue("id"))?;
                Action::Unit(config(m)?, id.clone())
            }
            Some(("pending", m)) => Action::Pending(config(m)?),
            Some(("aggregate", m)) => Action::Aggregate(path(m, "results")?),
            _ => return Err(ArgumentError::NoSubcommand),
        };
        Ok(Self { action, verbosity })
    }
}

fn path(arguments: &ArgMatches, name: &'static str) -> Result<PathBuf, ArgumentError> {
    arguments.get_one::<PathBuf>(name)
             .cloned()
             .ok_or(ArgumentError::NoValue(name))
}

/// Builds the configuration from the shared options of a subcommand.
fn config(arguments: &ArgMatches) -> Result<Config, ArgumentError> {
    let inputs = InputDirs { chgcar: path(arguments, "chgcar")?,
                             aeccar0: path(arguments, "aeccar0")?,
                             aeccar2: path(arguments, "aeccar2")? };
    let pattern = arguments.get_one::<String>("pattern")
                           .ok_or(ArgumentError::NoValue("pattern"))?;
    let pattern = Regex::new(pattern).map_err(|e| {
                                         ArgumentError::NotValidValue("pattern",
                                                                      pattern.clone(),
                                                                      e.to_string())
                                     })?;
    let scratch_dir = match arguments.get_one::<PathBuf>("scratch") {
        Some(p) => p.clone(),
        None => std::env::temp_dir(),
    };
    let threads = *arguments.get_one::<usize>("threads").unwrap_or(&0);
    let timeout = match arguments.get_one::<u64>("timeout")
                                 .copied()
                                 .unwrap_or(DEFAULT_TIMEOUT)
    {
        0 => None,
        t => Some(Duration::from_secs(t)),
    };
    Ok(Config { inputs,
                summation: path(arguments, "chgsum")?,
                partitioning: path(arguments, "bader")?,
                result_dir: path(arguments, "results")?,
                scratch_dir,
                pattern,
                threads,
                timeout,
                skip_existing: false })
}
