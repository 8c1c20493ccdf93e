//! File utilities for loading operations.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Calculate SHA-256 checksum of text content.
pub fn calculate_checksum(content: &str) -> String {
    calculate_bytes_checksum(content.as_bytes())
}

/// Calculate SHA-256 checksum of raw bytes.
pub fn calculate_bytes_checksum(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    hex::encode(hash)
}

/// Check whether the file name matches a glob such as `*.pdf`.
///
/// Matching is case-insensitive so `REPORT.PDF` is picked up by `*.pdf`.
pub fn matches_file_pattern(path: &Path, pattern: &glob::Pattern) -> bool {
    let options = glob::MatchOptions {
        case_sensitive: false,
        ..Default::default()
    };
    path.file_name()
        .map(|name| pattern.matches_with(&name.to_string_lossy(), options))
        .unwrap_or(false)
}
