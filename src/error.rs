//! Migration-specific error types

use std::path::PathBuf;

use crate::descriptor::Origin;

/// Errors reported by the migration core.
///
/// All failures are surfaced synchronously to the caller; nothing is retried
/// internally and no partial catalog is ever returned.
#[derive(Debug)]
pub enum MigrationError {
    /// A migrations source directory is missing or is not a directory;
    /// raised for a missing application root and for any configured root
    /// that exists as a plain file
    DirectoryUnavailable(PathBuf),
    /// Two sources resolved to the same migration identifier
    DuplicateMigration {
        identifier: String,
        first: Origin,
        second: Origin,
    },
    /// Artifact could not be decoded into a valid migration
    MalformedMigration { path: PathBuf, reason: String },
    /// A down change set was required but could not be derived
    IrreversibleOperation { identifier: String, index: usize },
    /// An artifact with this identifier is already materialized
    WriteConflict { identifier: String, path: PathBuf },
    /// Vendor directory registration attempted after the first catalog read
    ConfigurationSealed,
    /// Configured naming-policy tag is not recognized
    UnknownNamingPolicy(String),
    /// Configured layout-strategy tag is not recognized
    UnknownLayoutStrategy(String),
    /// Filesystem error outside the taxonomy above
    Io { path: PathBuf, message: String },
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::DirectoryUnavailable(path) => {
                write!(
                    f,
                    "Migrations directory unavailable: {}",
                    path.display()
                )
            }
            MigrationError::DuplicateMigration {
                identifier,
                first,
                second,
            } => {
                write!(
                    f,
                    "Duplicate migration identifier '{}': produced by both {} and {}.\n\
                     Two migration sources must never share an identifier; rename one of the\n\
                     colliding migrations before rebuilding the catalog.",
                    identifier, first, second
                )
            }
            MigrationError::MalformedMigration { path, reason } => {
                write!(
                    f,
                    "Malformed migration artifact {}: {}",
                    path.display(),
                    reason
                )
            }
            MigrationError::IrreversibleOperation { identifier, index } => {
                write!(
                    f,
                    "Migration '{}' contains an irreversible operation at position {}.\n\
                     Supply an explicit down change set for this migration.",
                    identifier, index
                )
            }
            MigrationError::WriteConflict { identifier, path } => {
                write!(
                    f,
                    "Migration '{}' is already materialized at {}",
                    identifier,
                    path.display()
                )
            }
            MigrationError::ConfigurationSealed => {
                write!(
                    f,
                    "Registry is sealed: vendor directories must be registered before the\n\
                     catalog is first read"
                )
            }
            MigrationError::UnknownNamingPolicy(tag) => {
                write!(f, "Unknown naming-policy tag: '{}'", tag)
            }
            MigrationError::UnknownLayoutStrategy(tag) => {
                write!(f, "Unknown layout-strategy tag: '{}'", tag)
            }
            MigrationError::Io { path, message } => {
                write!(f, "I/O error at {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for MigrationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_unavailable_fits_any_source() {
        // vendor roots raise this too; the message must not claim the
        // application directory
        let err = MigrationError::DirectoryUnavailable(PathBuf::from("vendor/acme/migrations"));
        assert_eq!(
            err.to_string(),
            "Migrations directory unavailable: vendor/acme/migrations"
        );
    }
}
