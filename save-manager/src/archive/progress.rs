//! File-count progress tracking for archive jobs.
//!
//! The writer bumps a shared [`ProgressCounter`] once per archived file while
//! a [`ProgressTracker`] task samples it on a fixed interval. Reads are
//! relaxed: a report may lag the writer by a file or two, which is fine for
//! a progress display since the counter only ever grows.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Shared count of files archived so far within one job.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter(Arc<AtomicUsize>);

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

/// One progress sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    pub label: String,

    /// `floor(done / total * 100)`
    pub percent: u32,
    pub done: usize,
    pub total: usize,
}

impl ProgressReport {
    pub fn new(label: &str, done: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100
        } else {
            ((done as u64 * 100) / total as u64).min(100) as u32
        };
        Self {
            label: label.to_string(),
            percent,
            done,
            total,
        }
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Backing up '{}': {}% complete ({}/{})",
            self.label, self.percent, self.done, self.total
        )
    }
}

/// Periodic reporter for one archive job.
pub struct ProgressTracker {
    label: String,
    counter: ProgressCounter,
    total: usize,
    interval: Duration,
    done: CancellationToken,
}

impl ProgressTracker {
    /// `done` is cancelled by the job when the writer stops, on success or failure.
    pub fn new(
        label: &str,
        counter: ProgressCounter,
        total: usize,
        interval: Duration,
        done: CancellationToken,
    ) -> Self {
        Self {
            label: label.to_string(),
            counter,
            total,
            interval,
            done,
        }
    }

    /// Run the sampling loop on the runtime. The handle yields the number of
    /// reports emitted.
    pub fn spawn<F>(self, on_report: F) -> JoinHandle<usize>
    where
        F: FnMut(ProgressReport) + Send + 'static,
    {
        tokio::spawn(self.run(on_report))
    }

    /// Sample until the counter reaches the total or the job signals done.
    pub async fn run<F>(self, mut on_report: F) -> usize
    where
        F: FnMut(ProgressReport),
    {
        let mut reports = 0;

        while self.counter.get() < self.total {
            tokio::select! {
                _ = self.done.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            on_report(ProgressReport::new(&self.label, self.counter.get(), self.total));
            reports += 1;
        }

        reports
    }
}

/// Default report sink: one info line per sample.
pub fn log_report(report: ProgressReport) {
    tracing::info!("{}", report);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format duration as human-readable string
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
