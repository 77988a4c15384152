//! Single-file layout: up and down change sets in one artifact

use std::path::{Path, PathBuf};

use crate::checksum::calculate_checksum;
use crate::descriptor::{DescriptorState, MigrationDescriptor, Origin};
use crate::error::MigrationError;
use crate::source::SourceDirectory;

use super::{
    down_change_set, existing_artifact, identifier_from_filename, prepare_destination,
    read_artifact, write_artifact, LayoutStrategy, SingleFileBody,
};

/// Writes one `{identifier}.json` artifact per migration, holding both
/// change sets. When no explicit down is supplied it is derived by
/// structurally inverting the up operations in reverse order.
pub struct SingleFileLayout;

impl SingleFileLayout {
    fn artifact_path(&self, root: &Path, identifier: &str) -> PathBuf {
        root.join(format!("{}.json", identifier))
    }
}

impl LayoutStrategy for SingleFileLayout {
    fn scan(&self, source: &SourceDirectory) -> Result<Vec<PathBuf>, MigrationError> {
        let mut artifacts = Vec::new();

        for path in source.list()? {
            let is_json = path.extension().and_then(|ext| ext.to_str()) == Some("json");
            if !is_json {
                continue;
            }

            // Every .json file must match the single-file grammar; a split
            // artifact here means the configured strategy and the directory
            // contents disagree, which must surface rather than be skipped
            if identifier_from_filename(&path, ".json")?.is_none() {
                return Err(MigrationError::MalformedMigration {
                    path,
                    reason: "file name does not match '{identifier}.json'".to_string(),
                });
            }

            artifacts.push(path);
        }

        Ok(artifacts)
    }

    fn parse(
        &self,
        path: &Path,
        origin: &Origin,
    ) -> Result<MigrationDescriptor, MigrationError> {
        let identifier = identifier_from_filename(path, ".json")?.ok_or_else(|| {
            MigrationError::MalformedMigration {
                path: path.to_path_buf(),
                reason: "file name does not match '{identifier}.json'".to_string(),
            }
        })?;

        let content = read_artifact(path)?;
        let body: SingleFileBody =
            serde_json::from_str(&content).map_err(|e| MigrationError::MalformedMigration {
                path: path.to_path_buf(),
                reason: format!("invalid artifact body: {}", e),
            })?;

        if body.identifier != identifier {
            return Err(MigrationError::MalformedMigration {
                path: path.to_path_buf(),
                reason: format!(
                    "identifier mismatch: file name says '{}', body says '{}'",
                    identifier, body.identifier
                ),
            });
        }

        let checksum = calculate_checksum(path)?;

        Ok(MigrationDescriptor {
            identifier,
            origin: origin.clone(),
            change_set: body.up,
            down: Some(body.down),
            created_at: body.created_at,
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
        let body = SingleFileBody {
            identifier: descriptor.identifier.clone(),
            created_at: descriptor.created_at,
            up: descriptor.change_set.clone(),
            down,
        };

        let path = self.artifact_path(destination.root(), &descriptor.identifier);
        write_artifact(&path, &body)?;

        Ok(vec![path])
    }
}
