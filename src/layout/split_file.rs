//! Split-file layout: separate up and down artifacts

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::checksum::calculate_checksum;
use crate::descriptor::{DescriptorState, MigrationDescriptor, Origin};
use crate::error::MigrationError;
use crate::source::SourceDirectory;

use super::{
    down_change_set, existing_artifact, identifier_from_filename, prepare_destination,
    read_artifact, write_artifact, DownFileBody, LayoutStrategy, UpFileBody,
};

/// Writes a `{identifier}.up.json` / `{identifier}.down.json` pair per
/// migration. The up artifact is the primary one; a missing down sibling is
/// malformed, never tolerated, since it would leave the migration
/// irreversible on disk without anyone noticing.
pub struct SplitFileLayout;

impl SplitFileLayout {
    fn up_path(&self, root: &Path, identifier: &str) -> PathBuf {
        root.join(format!("{}.up.json", identifier))
    }

    fn down_path(&self, root: &Path, identifier: &str) -> PathBuf {
        root.join(format!("{}.down.json", identifier))
    }
}

impl LayoutStrategy for SplitFileLayout {
    fn scan(&self, source: &SourceDirectory) -> Result<Vec<PathBuf>, MigrationError> {
        let mut ups = Vec::new();
        let mut up_identifiers = BTreeSet::new();
        let mut downs = Vec::new();

        for path in source.list()? {
            let is_json = path.extension().and_then(|ext| ext.to_str()) == Some("json");
            if !is_json {
                continue;
            }

            if let Some(identifier) = identifier_from_filename(&path, ".up.json")? {
                up_identifiers.insert(identifier);
                ups.push(path);
            } else if let Some(identifier) = identifier_from_filename(&path, ".down.json")? {
                downs.push((path, identifier));
            } else {
                return Err(MigrationError::MalformedMigration {
                    path,
                    reason: "file name matches neither '{identifier}.up.json' nor \
                             '{identifier}.down.json'"
                        .to_string(),
                });
            }
        }

        // A down artifact with no up sibling is half a migration
        for (path, identifier) in downs {
            if !up_identifiers.contains(&identifier) {
                return Err(MigrationError::MalformedMigration {
                    path,
                    reason: "down artifact without a matching up artifact".to_string(),
                });
            }
        }

        Ok(ups)
    }

    fn parse(
        &self,
        path: &Path,
        origin: &Origin,
    ) -> Result<MigrationDescriptor, MigrationError> {
        let identifier = identifier_from_filename(path, ".up.json")?.ok_or_else(|| {
            MigrationError::MalformedMigration {
                path: path.to_path_buf(),
                reason: "file name does not match '{identifier}.up.json'".to_string(),
            }
        })?;

        let up_content = read_artifact(path)?;
        let up_body: UpFileBody =
            serde_json::from_str(&up_content).map_err(|e| MigrationError::MalformedMigration {
                path: path.to_path_buf(),
                reason: format!("invalid up artifact body: {}", e),
            })?;

        if up_body.identifier != identifier {
            return Err(MigrationError::MalformedMigration {
                path: path.to_path_buf(),
                reason: format!(
                    "identifier mismatch: file name says '{}', body says '{}'",
                    identifier, up_body.identifier
                ),
            });
        }

        let root = path.parent().unwrap_or_else(|| Path::new(""));
        let down_path = self.down_path(root, &identifier);
        if !down_path.exists() {
            return Err(MigrationError::MalformedMigration {
                path: down_path,
                reason: "missing down artifact".to_string(),
            });
        }

        let down_content = read_artifact(&down_path)?;
        let down_body: DownFileBody = serde_json::from_str(&down_content).map_err(|e| {
            MigrationError::MalformedMigration {
                path: down_path.clone(),
                reason: format!("invalid down artifact body: {}", e),
            }
        })?;

        if down_body.identifier != identifier {
            return Err(MigrationError::MalformedMigration {
                path: down_path,
                reason: format!(
                    "identifier mismatch: file name says '{}', body says '{}'",
                    identifier, down_body.identifier
                ),
            });
        }

        let checksum = calculate_checksum(path)?;

        Ok(MigrationDescriptor {
            identifier,
            origin: origin.clone(),
            change_set: up_body.up,
            down: Some(down_body.down),
            created_at: up_body.created_at,
            state: DescriptorState::Materialized,
            checksum: Some(checksum),
        })
    }

    fn materialize(
        &self,
        descriptor: &MigrationDescriptor,
        destination: &SourceDirectory,
    ) -> Result<Vec<PathBuf>, MigrationError> {
        prepare_destination(destination)?;

        if let Some(path) = existing_artifact(destination.root(), &descriptor.identifier) {
            return Err(MigrationError::WriteConflict {
                identifier: descriptor.identifier.clone(),
                path,
            });
        }

        let down = down_change_set(descriptor)?;

        let up_body = UpFileBody {
            identifier: descriptor.identifier.clone(),
            created_at: descriptor.created_at,
            up: descriptor.change_set.clone(),
        };
        let down_body = DownFileBody {
            identifier: descriptor.identifier.clone(),
            down,
        };

        let up_path = self.up_path(destination.root(), &descriptor.identifier);
        let down_path = self.down_path(destination.root(), &descriptor.identifier);

        // Down first: if the write pair is interrupted, an orphan down file
        // is caught by scan, while an orphan up file would parse as a
        // missing-down migration only at read time
        write_artifact(&down_path, &down_body)?;
        write_artifact(&up_path, &up_body)?;

        Ok(vec![up_path, down_path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{ColumnDef, SchemaOperation};
    use chrono::Utc;
    use tempfile::TempDir;

    fn add_email_descriptor(identifier: &str) -> MigrationDescriptor {
        MigrationDescriptor::pending(
            identifier,
            vec![SchemaOperation::AddColumn {
                table: "users".to_string(),
                column: ColumnDef::new("email", "varchar(255)"),
            }],
            Utc::now(),
        )
    }

    #[test]
    fn test_materialize_writes_pair_and_parse_round_trips() {
        let dir = TempDir::new().expect("tempdir");
        let destination = SourceDirectory::application(dir.path());
        let layout = SplitFileLayout;

        let descriptor = add_email_descriptor("20240120120000_add_email_to_users");
        let written = layout
            .materialize(&descriptor, &destination)
            .expect("materialize");
        assert_eq!(written.len(), 2);

        let artifacts = layout.scan(&destination).expect("scan");
        assert_eq!(artifacts.len(), 1, "only the up artifact is primary");

        let parsed = layout
            .parse(&artifacts[0], &Origin::Application)
            .expect("parse");
        assert_eq!(parsed.identifier, descriptor.identifier);
        assert_eq!(parsed.change_set, descriptor.change_set);
        assert_eq!(
            parsed.down,
            Some(vec![SchemaOperation::DropColumn {
                table: "users".to_string(),
                column: ColumnDef::new("email", "varchar(255)"),
            }])
        );
    }

    #[test]
    fn test_missing_down_artifact_is_malformed() {
        let dir = TempDir::new().expect("tempdir");
        let destination = SourceDirectory::application(dir.path());
        let layout = SplitFileLayout;

        let descriptor = add_email_descriptor("20240120120000_add_email_to_users");
        layout
            .materialize(&descriptor, &destination)
            .expect("materialize");

        std::fs::remove_file(dir.path().join("20240120120000_add_email_to_users.down.json"))
            .expect("remove down");

        let up_path = dir.path().join("20240120120000_add_email_to_users.up.json");
        match layout.parse(&up_path, &Origin::Application) {
            Err(MigrationError::MalformedMigration { reason, .. }) => {
                assert!(reason.contains("missing down artifact"));
            }
            other => panic!("Expected MalformedMigration, got {other:?}"),
        }
    }

    #[test]
    fn test_orphan_down_artifact_fails_scan() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("20240120120000_x.down.json"), "{}").expect("write");

        let layout = SplitFileLayout;
        let source = SourceDirectory::application(dir.path());

        match layout.scan(&source) {
            Err(MigrationError::MalformedMigration { reason, .. }) => {
                assert!(reason.contains("without a matching up artifact"));
            }
            other => panic!("Expected MalformedMigration, got {other:?}"),
        }
    }

    #[test]
    fn test_write_conflict_detected_across_layout_shapes() {
        let dir = TempDir::new().expect("tempdir");
        let destination = SourceDirectory::application(dir.path());

        // materialized earlier under the single-file layout
        std::fs::write(
            dir.path().join("20240120120000_add_email_to_users.json"),
            "{}",
        )
        .expect("write");

        let layout = SplitFileLayout;
        let descriptor = add_email_descriptor("20240120120000_add_email_to_users");

        match layout.materialize(&descriptor, &destination) {
            Err(MigrationError::WriteConflict { identifier, .. }) => {
                assert_eq!(identifier, "20240120120000_add_email_to_users");
            }
            other => panic!("Expected WriteConflict, got {other:?}"),
        }
    }

    #[test]
    fn test_single_file_artifact_fails_split_scan() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("20240120120000_x.json"), "{}").expect("write");

        let layout = SplitFileLayout;
        let source = SourceDirectory::application(dir.path());

        match layout.scan(&source) {
            Err(MigrationError::MalformedMigration { .. }) => {}
            other => panic!("Expected MalformedMigration, got {other:?}"),
        }
    }
}
