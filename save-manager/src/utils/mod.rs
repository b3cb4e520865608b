//! Utility modules for the save manager.

pub mod color;
pub mod errors;
pub mod logger;

pub use errors::{Result, SaveManagerError};
