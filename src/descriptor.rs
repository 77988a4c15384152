//! Migration descriptor and origin tagging

use chrono::{DateTime, Utc};

use crate::operation::SchemaOperation;

/// Which source root produced a migration.
///
/// Vendor-origin migrations are logically read-only to the application; only
/// the single application root is ever written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Application,
    Vendor { tag: Option<String> },
}

impl Origin {
    pub fn is_application(&self) -> bool {
        matches!(self, Origin::Application)
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Application => write!(f, "the application directory"),
            Origin::Vendor { tag: Some(tag) } => write!(f, "vendor '{}'", tag),
            Origin::Vendor { tag: None } => write!(f, "a vendor directory"),
        }
    }
}

/// Whether a descriptor has a backing file yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorState {
    /// Exists only in memory, not yet written
    Pending,
    /// Backed by one or more on-disk artifacts
    Materialized,
}

/// One migration, whether already on disk or pending creation
///
/// The identifier is unique across the whole catalog regardless of origin
/// and establishes the total order (lexically sortable, timestamp-prefixed
/// for migrations created through the registry).
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationDescriptor {
    /// Catalog-wide unique, sortable identifier
    pub identifier: String,

    /// Source root that produced this migration
    pub origin: Origin,

    /// Up-direction operations, in application order
    pub change_set: Vec<SchemaOperation>,

    /// Explicit down-direction operations; when `None` the layout strategy
    /// derives them by inverting `change_set` in reverse order
    pub down: Option<Vec<SchemaOperation>>,

    /// When the migration was authored
    pub created_at: DateTime<Utc>,

    pub state: DescriptorState,

    /// SHA-256 of the primary artifact, set once parsed from disk
    pub checksum: Option<String>,
}

impl MigrationDescriptor {
    /// Create a pending, application-origin descriptor with no backing file
    pub fn pending(
        identifier: impl Into<String>,
        change_set: Vec<SchemaOperation>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            origin: Origin::Application,
            change_set,
            down: None,
            created_at,
            state: DescriptorState::Pending,
            checksum: None,
        }
    }

    /// Attach an explicit down change set
    pub fn with_down(mut self, down: Vec<SchemaOperation>) -> Self {
        self.down = Some(down);
        self
    }
}
