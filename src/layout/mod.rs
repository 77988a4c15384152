//! Migration file layout strategies
//!
//! A layout strategy is the encoder/decoder between an in-memory
//! [`MigrationDescriptor`] and its on-disk artifact(s). Two strategies are
//! built in: [`SingleFileLayout`] co-locates the up and down change sets in
//! one `{identifier}.json` artifact, [`SplitFileLayout`] writes separate
//! `{identifier}.up.json` / `{identifier}.down.json` artifacts.
//!
//! Artifact bodies are JSON. Filenames carry the identifier; a mismatch
//! between filename and body is malformed, as is any unknown operation tag.

mod single_file;
mod split_file;

pub use single_file::SingleFileLayout;
pub use split_file::SplitFileLayout;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::descriptor::{MigrationDescriptor, Origin};
use crate::error::MigrationError;
use crate::operation::SchemaOperation;
use crate::source::SourceDirectory;

/// Tag of the co-located up/down layout (the default)
pub const SINGLE_FILE: &str = "single-file";

/// Tag of the separate up/down artifact layout
pub const SPLIT_FILE: &str = "split-file";

/// Encodes and decodes migrations to and from their on-disk representation.
///
/// Strategies are stateless; one shared instance serves the whole registry.
pub trait LayoutStrategy {
    /// The primary artifact per migration under `source`.
    ///
    /// Files that are not artifacts of this layout at all (wrong extension)
    /// are ignored; files that look like artifacts but violate the layout's
    /// grammar fail with `MalformedMigration` so a catalog is never silently
    /// shortened.
    fn scan(&self, source: &SourceDirectory) -> Result<Vec<PathBuf>, MigrationError>;

    /// Decode one primary artifact into a descriptor tagged with `origin`.
    fn parse(&self, path: &Path, origin: &Origin)
        -> Result<MigrationDescriptor, MigrationError>;

    /// Write the descriptor's artifact(s) under `destination`, which must be
    /// the application source. Fails with `WriteConflict` if any artifact
    /// for this identifier already exists, and with `IrreversibleOperation`
    /// if a down change set must be derived but cannot be.
    fn materialize(
        &self,
        descriptor: &MigrationDescriptor,
        destination: &SourceDirectory,
    ) -> Result<Vec<PathBuf>, MigrationError>;
}

/// Resolve a configured layout-strategy tag to its implementation.
///
/// Unknown tags fail here, at registry construction, rather than at first
/// use.
pub fn strategy_for_tag(tag: &str) -> Result<Box<dyn LayoutStrategy>, MigrationError> {
    match tag {
        SINGLE_FILE => Ok(Box::new(SingleFileLayout)),
        SPLIT_FILE => Ok(Box::new(SplitFileLayout)),
        other => Err(MigrationError::UnknownLayoutStrategy(other.to_string())),
    }
}

/// Body of a `{identifier}.json` artifact
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SingleFileBody {
    pub identifier: String,
    pub created_at: DateTime<Utc>,
    pub up: Vec<SchemaOperation>,
    pub down: Vec<SchemaOperation>,
}

/// Body of a `{identifier}.up.json` artifact
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UpFileBody {
    pub identifier: String,
    pub created_at: DateTime<Utc>,
    pub up: Vec<SchemaOperation>,
}

/// Body of a `{identifier}.down.json` artifact
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DownFileBody {
    pub identifier: String,
    pub down: Vec<SchemaOperation>,
}

/// Extract the identifier from a filename matching `{identifier}{suffix}`.
///
/// Identifiers are `[A-Za-z0-9][A-Za-z0-9_-]*` (no dots, so the suffix
/// grammar stays unambiguous). Returns `Ok(None)` when the filename does
/// not match.
pub(crate) fn identifier_from_filename(
    path: &Path,
    suffix: &str,
) -> Result<Option<String>, MigrationError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| MigrationError::MalformedMigration {
            path: path.to_path_buf(),
            reason: "file name is not valid UTF-8".to_string(),
        })?;

    let pattern = format!(r"^([A-Za-z0-9][A-Za-z0-9_-]*){}$", regex::escape(suffix));
    let re = Regex::new(&pattern).map_err(|e| MigrationError::MalformedMigration {
        path: path.to_path_buf(),
        reason: format!("invalid filename pattern: {}", e),
    })?;

    Ok(re
        .captures(filename)
        .map(|captures| captures[1].to_string()))
}

/// First already-materialized artifact for `identifier` under `root`, across
/// both layouts' filename shapes, so switching strategies can never silently
/// overwrite history
pub(crate) fn existing_artifact(root: &Path, identifier: &str) -> Option<PathBuf> {
    [
        format!("{}.json", identifier),
        format!("{}.up.json", identifier),
        format!("{}.down.json", identifier),
    ]
    .into_iter()
    .map(|name| root.join(name))
    .find(|candidate| candidate.exists())
}

/// The down change set for a descriptor: the explicit one if supplied,
/// otherwise `change_set` inverted in reverse order.
pub(crate) fn down_change_set(
    descriptor: &MigrationDescriptor,
) -> Result<Vec<SchemaOperation>, MigrationError> {
    if let Some(down) = &descriptor.down {
        return Ok(down.clone());
    }

    if let Some(index) = descriptor
        .change_set
        .iter()
        .rposition(|op| !op.is_invertible())
    {
        return Err(MigrationError::IrreversibleOperation {
            identifier: descriptor.identifier.clone(),
            index,
        });
    }

    // every operation passed the invertibility check above
    Ok(descriptor
        .change_set
        .iter()
        .rev()
        .filter_map(SchemaOperation::invert)
        .collect())
}

/// Guard + prepare a materialization destination: application source only,
/// root created on demand
pub(crate) fn prepare_destination(destination: &SourceDirectory) -> Result<(), MigrationError> {
    if !destination.is_application() {
        return Err(MigrationError::Io {
            path: destination.root().to_path_buf(),
            message: "refusing to materialize into a vendor source".to_string(),
        });
    }

    fs::create_dir_all(destination.root()).map_err(|e| MigrationError::Io {
        path: destination.root().to_path_buf(),
        message: format!("failed to create migrations directory: {}", e),
    })
}

pub(crate) fn write_artifact<T: Serialize>(path: &Path, body: &T) -> Result<(), MigrationError> {
    let json = serde_json::to_string_pretty(body).map_err(|e| MigrationError::Io {
        path: path.to_path_buf(),
        message: format!("failed to encode artifact body: {}", e),
    })?;

    fs::write(path, json).map_err(|e| MigrationError::Io {
        path: path.to_path_buf(),
        message: format!("failed to write artifact: {}", e),
    })
}

pub(crate) fn read_artifact(path: &Path) -> Result<String, MigrationError> {
    fs::read_to_string(path).map_err(|e| MigrationError::MalformedMigration {
        path: path.to_path_buf(),
        reason: format!("unreadable artifact: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::ColumnDef;

    #[test]
    fn test_identifier_from_filename_matches_grammar() {
        let id = identifier_from_filename(Path::new("20240101120000_create_users.json"), ".json")
            .expect("parse");
        assert_eq!(id.as_deref(), Some("20240101120000_create_users"));

        // a split artifact does not match the single-file suffix
        let none = identifier_from_filename(Path::new("x.up.json"), ".json").expect("parse");
        assert!(none.is_none());
    }

    #[test]
    fn test_down_change_set_inverts_in_reverse_order() {
        let descriptor = MigrationDescriptor::pending(
            "20240101120000_create_users",
            vec![
                SchemaOperation::CreateTable {
                    table: "users".to_string(),
                    columns: vec![],
                },
                SchemaOperation::AddColumn {
                    table: "users".to_string(),
                    column: ColumnDef::new("email", "varchar(255)"),
                },
            ],
            Utc::now(),
        );

        let down = down_change_set(&descriptor).expect("derivable");
        assert_eq!(
            down,
            vec![
                SchemaOperation::DropColumn {
                    table: "users".to_string(),
                    column: ColumnDef::new("email", "varchar(255)"),
                },
                SchemaOperation::DropTable {
                    table: "users".to_string(),
                    columns: vec![],
                },
            ]
        );
    }

    #[test]
    fn test_down_change_set_reports_irreversible_index() {
        let descriptor = MigrationDescriptor::pending(
            "20240101120000_change_schema",
            vec![
                SchemaOperation::CreateTable {
                    table: "users".to_string(),
                    columns: vec![],
                },
                SchemaOperation::Raw {
                    sql: "UPDATE users SET email = lower(email)".to_string(),
                },
            ],
            Utc::now(),
        );

        match down_change_set(&descriptor) {
            Err(MigrationError::IrreversibleOperation { identifier, index }) => {
                assert_eq!(identifier, "20240101120000_change_schema");
                assert_eq!(index, 1);
            }
            other => panic!("Expected IrreversibleOperation, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_down_wins_over_derivation() {
        let descriptor = MigrationDescriptor::pending(
            "20240101120000_change_schema",
            vec![SchemaOperation::Raw {
                sql: "UPDATE users SET email = lower(email)".to_string(),
            }],
            Utc::now(),
        )
        .with_down(vec![SchemaOperation::Raw {
            sql: "UPDATE users SET email = original_email".to_string(),
        }]);

        let down = down_change_set(&descriptor).expect("explicit down supplied");
        assert_eq!(down.len(), 1);
    }

    #[test]
    fn test_unknown_strategy_tag_fails_fast() {
        match strategy_for_tag("directory-per-migration") {
            Err(MigrationError::UnknownLayoutStrategy(tag)) => {
                assert_eq!(tag, "directory-per-migration");
            }
            Err(other) => panic!("Expected UnknownLayoutStrategy, got {other:?}"),
            Ok(_) => panic!("Expected UnknownLayoutStrategy, got a strategy"),
        }
    }

    #[test]
    fn test_known_tags_resolve() {
        assert!(strategy_for_tag(SINGLE_FILE).is_ok());
        assert!(strategy_for_tag(SPLIT_FILE).is_ok());
    }
}
