//! Custom error types for the save manager.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaveManagerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("World not found: {0}")]
    WorldNotFound(String),

    #[error("Save action failed: {0}")]
    Save(String),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}

pub type Result<T> = std::result::Result<T, SaveManagerError>;
