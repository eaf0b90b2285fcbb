//! CSV input and output.

/// Daily and period settlement export.
pub mod export;
pub mod records;
