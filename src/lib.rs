//! # Watershed
//!
//! Migration source aggregation, naming, and file-layout core for schema
//! migration runners.
//!
//! Watershed merges migration files from an application directory and any
//! number of vendor package directories into one ordered, collision-checked
//! catalog, derives canonical identifiers for newly authored migrations, and
//! encodes migrations to disk through pluggable layout strategies. Applying
//! migrations against a live database is the consuming runner's job; this
//! crate owns everything up to that point.
//!
//! # Example
//!
//! ```rust,no_run
//! use watershed::{ColumnDef, MigrationConfig, MigrationRegistry, SchemaOperation};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MigrationConfig::new("app/migrations")
//!         .with_vendor_directory("vendor/acme/migrations");
//!
//!     let mut registry = MigrationRegistry::new(config)?;
//!
//!     // Author a new migration; the identifier is derived from the changes
//!     let descriptor = registry.create(vec![SchemaOperation::CreateTable {
//!         table: "users".to_string(),
//!         columns: vec![ColumnDef::new("id", "bigint")],
//!     }])?;
//!     println!("created {}", descriptor.identifier);
//!
//!     // The runner iterates the ordered catalog
//!     for migration in registry.catalog()? {
//!         println!("{} ({:?})", migration.identifier, migration.origin);
//!     }
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod layout;
pub mod naming;
pub mod operation;
pub mod registry;
pub mod source;

pub use config::MigrationConfig;
pub use descriptor::{DescriptorState, MigrationDescriptor, Origin};
pub use error::MigrationError;
pub use layout::{LayoutStrategy, SingleFileLayout, SplitFileLayout};
pub use naming::{DeriveFromChanges, NamingPolicy};
pub use operation::{ColumnDef, SchemaOperation};
pub use registry::MigrationRegistry;
pub use source::SourceDirectory;
