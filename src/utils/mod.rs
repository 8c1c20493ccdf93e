//! Utility modules.

pub mod file;

pub use file::{calculate_bytes_checksum, calculate_checksum, matches_file_pattern};
