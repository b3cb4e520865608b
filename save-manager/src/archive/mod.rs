//! Zip archive construction and progress tracking.

pub mod progress;
pub mod writer;

pub use progress::{ProgressCounter, ProgressReport, ProgressTracker};
pub use writer::{write_archive, ArchiveOptions, WriteStats};
