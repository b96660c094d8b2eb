//! Batch Bader charge analysis for a database of stored charge densities.
//! Every structure in the database has three charge density snapshots, the
//! valence density (CHGCAR) and the two all-electron parts (AECCAR0 and
//! AECCAR2), stored as JSON documents in three directories. For each
//! structure the snapshots are turned back into VASP files, the all-electron
//! parts are summed into a reference with the [chgsum.pl] script and the
//! [bader] executable partitions the valence density against that reference.
//! The result of every structure is kept as a small JSON record and all of the
//! records are rolled up into a single `summary.csv`.
//!
//! ### Supported Platforms
//! - Linux
//! - Os X
//!
//! ## Installing the binary
//! ### From Source
//! ```sh
//! $ cargo build --verbose --release
//! $ mv ./target/release/bader-batch ~/bin
//! ```
//! The [chgsum.pl] script and the [bader] executable are not part of this
//! crate and need to be installed separately.
//!
//! ## Usage
//! The three input directories hold one file per structure, named after its
//! identifier (`mp-149.json` for example). Only identifiers present in all
//! three directories are processed.
//! ```sh
//! $ bader-batch run --chgcar chgcar/ --aeccar0 aeccar0/ --aeccar2 aeccar2/ \
//!       --chgsum ~/bin/chgsum.pl --bader ~/bin/bader -o results/
//! ```
//! Units are processed in parallel, `-J` sets the number of threads. A unit
//! that fails is logged and leaves no record behind, the rest of the batch
//! carries on. The units still missing a record can be listed with
//! `bader-batch pending` and re-run with `bader-batch run --skip-existing` or
//! one at a time with `bader-batch unit <ID>`.
//! ```sh
//! $ bader-batch aggregate results/
//! ```
//! rebuilds `summary.csv` from whatever records are in the directory.
//! For a detailed list of usage options run
//! ```sh
//! $ bader-batch --help
//! ```
//! ## Output
//! `{id}_result.json` holds the charge, minimum distance and volume of every
//! atom, the vacuum charge and volume, whether a reference was used and the
//! version of bader that produced it. `summary.csv` has one row per record with
//! the columns `task_id, charge, min_dist, atomic_volume, vacuum_charge,
//! vacuum_volume, reference_used, bader_version`, per-atom columns hold JSON
//! arrays.
//! ## License
//! MIT
//!
//! [chgsum.pl]: <https://theory.cm.utexas.edu/vtsttools/scripts.html>
//! [bader]: <https://theory.cm.utexas.edu/henkelman/code/bader/>

/// Rebuilds the [SummaryTable](aggregate::SummaryTable) from the result records.
pub mod aggregate;
/// For parsing command-line arguments.
pub mod arguments;
/// Contains [Atoms](atoms::Atoms) for storing the relevant data on the atoms
/// in the calculation. Also contains [Lattice](atoms::Lattice) for storing
/// information about the cell in which the density is stored.
pub mod atoms;
/// Runs many units on a bounded pool of worker threads.
pub mod batch;
/// The [Config](config::Config) a batch is run with and its validation.
pub mod config;
/// Contains [VolumetricData](density::VolumetricData), a charge density and
/// the structure it belongs to.
pub mod density;
/// Provides custom errors types.
pub mod errors;
/// Handles the File I/O of the raw density files and the output of bader.
pub mod io;
/// Provides a [Bar](progress::Bar) counting finished and failed units.
pub mod progress;
/// The [BaderSummary](record::BaderSummary) of a unit and its on-disk record.
pub mod record;
/// Finds the units present in all three input directories.
pub mod selector;
/// Reading of the stored JSON charge density documents.
pub mod snapshot;
/// The [ExternalTools](tools::ExternalTools) a unit calls and the real
/// [Executables](tools::Executables).
pub mod tools;
/// The [Pipeline](unit::Pipeline) that takes one unit from snapshots to record.
pub mod unit;
/// Misc functions mainly for vector and matrix manipulation.
pub mod utils;
/// A [WorkArea](workspace::WorkArea) that is removed whatever happens to the unit.
pub mod workspace;
