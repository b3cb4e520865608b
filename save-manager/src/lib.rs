//! Save Manager Library
//!
//! Scheduled world saves and timestamped zip backups for a live game server.

pub mod api;
pub mod archive;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod executor;
pub mod fs;
pub mod host;
pub mod scheduler;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use executor::{BackupOutcome, BackupService};
pub use utils::errors::SaveManagerError;
pub type Result<T> = std::result::Result<T, SaveManagerError>;
