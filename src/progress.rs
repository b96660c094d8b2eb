use atomic_counter::{AtomicCounter, RelaxedCounter};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Contains the indicatif progress bar and two atomic_counter RelaxedCounters,
/// one for units that produced a record and one for units that failed.
/// Workers only touch the counters, a background thread moves the bar.
pub struct Bar {
    succeeded: Arc<RelaxedCounter>,
    failed: Arc<RelaxedCounter>,
    /// An Arc wrapped ProgressBar from indicatif.
    pub pbar: Arc<ProgressBar>,
}

impl Bar {
    /// Creates the Bar struct with a size, refresh_rate and prefix for the bar.
    /// The returned Bar is hidden.
    pub fn new(len: u64, refresh_rate: u64, prefix: String) -> Self {
        let progress_bar = ProgressBar::hidden();
        progress_bar.set_length(len);
        progress_bar.set_prefix(prefix);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{prefix}[{bar:40}] {pos}/{len} [{elapsed_precise}] {msg}",
                )
                .progress_chars("=>-"),
        );
        let pb = Arc::new(progress_bar);
        let pb2 = pb.clone();
        let succeeded = Arc::new(RelaxedCounter::new(0));
        let failed = Arc::new(RelaxedCounter::new(0));
        let succeeded2 = succeeded.clone();
        let failed2 = failed.clone();
        thread::spawn(move || {
            while Arc::strong_count(&succeeded2) > 1 && !pb2.is_finished() {
                update(&pb2, succeeded2.get(), failed2.get());
                thread::sleep(Duration::from_millis(refresh_rate));
            }
        });
        Self { succeeded,
               failed,
               pbar: pb }
    }

    /// Displays a hidden Bar.
    pub fn display(&self) {
        self.pbar.set_draw_target(ProgressDrawTarget::stderr())
    }

    /// a unit produced its record
    pub fn success(&self) {
        self.succeeded.inc();
    }

    /// a unit failed
    pub fn failure(&self) {
        self.failed.inc();
    }

    /// The number of units that succeeded and failed so far.
    pub fn counts(&self) -> (usize, usize) {
        (self.succeeded.get(), self.failed.get())
    }
}

fn update(pbar: &ProgressBar, succeeded: usize, failed: usize) {
    pbar.set_position((succeeded + failed) as u64);
    pbar.set_message(format!("{} ok, {} failed", succeeded, failed));
}

impl Drop for Bar {
    /// make sure we clear bars when the object is dropped
    fn drop(&mut self) {
        if !self.pbar.is_finished() {
            let (succeeded, failed) = self.counts();
            update(&self.pbar, succeeded, failed);
            self.pbar.finish_and_clear();
        }
    }
}
