//! Checksum calculation for migration artifacts

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::error::MigrationError;

/// Calculate the SHA-256 checksum of a migration artifact.
///
/// Recorded on every descriptor parsed from disk so the external runner can
/// detect artifacts that were edited after being applied.
///
/// # Errors
///
/// Returns `MigrationError::Io` if the file cannot be read.
pub fn calculate_checksum(path: &Path) -> Result<String, MigrationError> {
    let content = fs::read(path).map_err(|e| MigrationError::Io {
        path: path.to_path_buf(),
        message: format!("failed to read artifact for checksum: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&content);
    let hash = hasher.finalize();

    Ok(format!("{:x}", hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_checksum_is_stable_across_reads() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("artifact.json");
        fs::write(&path, r#"{"identifier":"x"}"#).expect("write");

        let first = calculate_checksum(&path).expect("checksum");
        let second = calculate_checksum(&path).expect("checksum");

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_checksum_changes_with_content() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("artifact.json");

        fs::write(&path, "a").expect("write");
        let before = calculate_checksum(&path).expect("checksum");

        fs::write(&path, "b").expect("write");
        let after = calculate_checksum(&path).expect("checksum");

        assert_ne!(before, after);
    }
}
