//! Migration source directories

use std::fs;
use std::path::{Path, PathBuf};

use crate::descriptor::Origin;
use crate::error::MigrationError;

/// One migration root plus the origin tag of everything found under it.
///
/// A source never caches: [`list`](Self::list) re-scans the filesystem on
/// every call so the registry alone decides when results are reused. Only
/// the application root is writable; the layout strategy refuses to
/// materialize into a vendor source.
#[derive(Debug, Clone)]
pub struct SourceDirectory {
    root: PathBuf,
    origin: Origin,
}

impl SourceDirectory {
    /// The single writable application root
    pub fn application(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            origin: Origin::Application,
        }
    }

    /// A read-only vendor root. When no tag is given, the directory's final
    /// path component is used so collision errors can name the vendor.
    pub fn vendor(root: impl Into<PathBuf>, tag: Option<String>) -> Self {
        let root = root.into();
        let tag = tag.or_else(|| {
            root.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.to_string())
        });
        Self {
            root,
            origin: Origin::Vendor { tag },
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn is_application(&self) -> bool {
        self.origin.is_application()
    }

    /// Enumerate the artifact files in this root, sorted by filename.
    ///
    /// Non-recursive; grouping files into migrations is the layout
    /// strategy's job. A missing vendor root lists as empty since vendor
    /// packages are optional; a missing application root is
    /// [`MigrationError::DirectoryUnavailable`].
    ///
    /// # Errors
    ///
    /// Returns `DirectoryUnavailable` if the application root does not
    /// exist, and `Io` if a directory entry cannot be read.
    pub fn list(&self) -> Result<Vec<PathBuf>, MigrationError> {
        if !self.root.exists() {
            if self.is_application() {
                return Err(MigrationError::DirectoryUnavailable(self.root.clone()));
            }
            log::debug!(
                "vendor migration directory {} does not exist, treating as empty",
                self.root.display()
            );
            return Ok(Vec::new());
        }

        if !self.root.is_dir() {
            return Err(MigrationError::DirectoryUnavailable(self.root.clone()));
        }

        let entries = fs::read_dir(&self.root).map_err(|e| MigrationError::Io {
            path: self.root.clone(),
            message: format!("failed to read migrations directory: {}", e),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MigrationError::Io {
                path: self.root.clone(),
                message: format!("failed to read directory entry: {}", e),
            })?;

            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }

        // Deterministic scan order regardless of filesystem iteration order
        files.sort();

        log::debug!(
            "scanned {} ({}): {} file(s)",
            self.root.display(),
            self.origin,
            files.len()
        );

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_application_root_is_unavailable() {
        let source = SourceDirectory::application("/nonexistent/migrations");

        match source.list() {
            Err(MigrationError::DirectoryUnavailable(path)) => {
                assert_eq!(path, PathBuf::from("/nonexistent/migrations"));
            }
            other => panic!("Expected DirectoryUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_vendor_root_lists_empty() {
        let source = SourceDirectory::vendor("/nonexistent/vendor/migrations", None);
        let files = source.list().expect("missing vendor root should be empty");
        assert!(files.is_empty());
    }

    #[test]
    fn test_vendor_root_that_is_a_file_is_unavailable() {
        let dir = TempDir::new().expect("tempdir");
        let file = dir.path().join("migrations");
        std::fs::write(&file, "").expect("write");

        let source = SourceDirectory::vendor(&file, Some("acme".to_string()));
        match source.list() {
            Err(MigrationError::DirectoryUnavailable(path)) => {
                assert_eq!(path, file);
            }
            other => panic!("Expected DirectoryUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_list_is_sorted_and_restartable() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("b.json"), "{}").expect("write");
        std::fs::write(dir.path().join("a.json"), "{}").expect("write");

        let source = SourceDirectory::application(dir.path());
        let first = source.list().expect("list");
        let second = source.list().expect("list");

        let names: Vec<_> = first
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_vendor_tag_defaults_to_directory_name() {
        let source = SourceDirectory::vendor("vendor/acme/migrations", None);
        assert_eq!(
            source.origin(),
            &Origin::Vendor {
                tag: Some("migrations".to_string())
            }
        );

        let tagged = SourceDirectory::vendor("vendor/acme/migrations", Some("acme".to_string()));
        assert_eq!(
            tagged.origin(),
            &Origin::Vendor {
                tag: Some("acme".to_string())
            }
        );
    }
}
