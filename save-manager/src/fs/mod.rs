//! File system traversal.

pub mod walker;
