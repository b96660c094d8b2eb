use crate::errors::UnitError;
use crate::progress::Bar;
use crate::tools::ExternalTools;
use crate::unit::Pipeline;
use atomic_counter::{AtomicCounter, RelaxedCounter};
use crossbeam_utils::thread;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

/// What happened to each unit of a batch, sorted by identifier.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Identifiers with the path of the record they produced.
    pub processed: Vec<(String, PathBuf)>,
    pub failed: Vec<(String, UnitError)>,
}

impl BatchReport {
    fn push(&mut self, identifier: String, result: Result<PathBuf, UnitError>) {
        match result {
            Ok(path) => self.processed.push((identifier, path)),
            Err(e) => self.failed.push((identifier, e)),
        }
    }
}

/// Runs every unit in `units` on at most `workers` threads.
///
/// Workers claim the next unclaimed unit until none are left, so a slow unit
/// never holds up the others. A failing or panicking unit is logged and
/// reported, it does not stop its worker or the batch.
pub fn run_batch<T: ExternalTools>(pipeline: &Pipeline<T>,
                                   units: &[String],
                                   workers: usize,
                                   bar: &Bar)
                                   -> BatchReport {
    let counter = RelaxedCounter::new(0);
    let next = &counter;
    let workers = workers.max(1).min(units.len().max(1));
    log::info!("Processing {} units on {} threads", units.len(), workers);
    let scoped = thread::scope(|s| {
        let spawned_threads =
            (0..workers).map(|_| s.spawn(move |_| worker(pipeline, units, next, bar)))
                        .collect::<Vec<_>>();
        let mut report = BatchReport::default();
        for thread in spawned_threads {
            match thread.join() {
                Ok(outcomes) => {
                    for (identifier, result) in outcomes {
                        report.push(identifier, result)
                    }
                }
                Err(e) => log::error!("Worker thread died: {}", panic_message(&e)),
            }
        }
        report
    });
    let mut report = match scoped {
        Ok(report) => report,
        Err(e) => {
            log::error!("Worker pool died: {}", panic_message(&e));
            BatchReport::default()
        }
    };
    report.processed.sort_by(|a, b| a.0.cmp(&b.0));
    report.failed.sort_by(|a, b| a.0.cmp(&b.0));
    log::info!("{} units processed, {} failed",
               report.processed.len(),
               report.failed.len());
    report
}

/// Claims and processes units until the work set is exhausted.
fn worker<T: ExternalTools>(pipeline: &Pipeline<T>,
                            units: &[String],
                            next: &RelaxedCounter,
                            bar: &Bar)
                            -> Vec<(String, Result<PathBuf, UnitError>)> {
    let mut outcomes = Vec::new();
    // inc returns the value before the increment
    while let Some(identifier) = units.get(next.inc()) {
        let result =
            panic::catch_unwind(AssertUnwindSafe(|| pipeline.process_unit(identifier)))
                .unwrap_or_else(|e| Err(UnitError::Panicked(panic_message(&e))));
        match &result {
            Ok(_) => bar.success(),
            Err(e) => {
                log::error!("Unit {} failed: {}", identifier, e);
                bar.failure()
            }
        }
        outcomes.push((identifier.clone(), result));
    }
    outcomes
}

/// The message a panic was raised with, when it carries one.
fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        String::from(*s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("unknown panic")
    }
}
