//! Migration registry: aggregates sources into one ordered catalog
//!
//! [`MigrationRegistry`] merges the application migrations directory and any
//! number of vendor directories into a single deduplicated, totally ordered
//! catalog, and is the only component that materializes new migrations.
//!
//! The registry is a state machine: it starts Open, accepting vendor-source
//! registrations, and seals permanently on the first `catalog()` or
//! `create()` call. Configuration is front-loaded; a consumer that has begun
//! iterating the catalog never sees its sources change underneath it.

use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use crate::config::MigrationConfig;
use crate::descriptor::{DescriptorState, MigrationDescriptor, Origin};
use crate::error::MigrationError;
use crate::layout::{self, LayoutStrategy};
use crate::naming::{self, NamingPolicy};
use crate::operation::SchemaOperation;
use crate::source::SourceDirectory;

pub struct MigrationRegistry {
    naming: Box<dyn NamingPolicy>,
    layout: Box<dyn LayoutStrategy>,
    application: SourceDirectory,
    vendors: Vec<SourceDirectory>,
    sealed: bool,
    catalog: Option<Vec<MigrationDescriptor>>,
}

impl MigrationRegistry {
    /// Build a registry from a validated configuration.
    ///
    /// The naming-policy and layout-strategy tags are resolved here, once;
    /// unknown tags fail construction rather than the first read.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNamingPolicy` or `UnknownLayoutStrategy` if a
    /// configured tag has no registered implementation.
    pub fn new(config: MigrationConfig) -> Result<Self, MigrationError> {
        let naming = naming::policy_for_tag(&config.name_policy)?;
        let layout = layout::strategy_for_tag(&config.strategy)?;

        let application = SourceDirectory::application(&config.directory);
        let vendors = config
            .vendor_directories
            .iter()
            .map(|root| SourceDirectory::vendor(root, None))
            .collect();

        Ok(Self {
            naming,
            layout,
            application,
            vendors,
            sealed: false,
            catalog: None,
        })
    }

    /// Whether the registry has been sealed by a first read or create
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Register an additional vendor migration directory, tagged with its
    /// final path component.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationSealed` once `catalog()` or `create()` has been
    /// called; sources are fixed from the first read onward.
    pub fn add_vendor_source(&mut self, root: impl Into<PathBuf>) -> Result<(), MigrationError> {
        self.add_vendor(SourceDirectory::vendor(root, None))
    }

    /// Register an additional vendor migration directory under an explicit
    /// tag (typically the vendor package name).
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationSealed` once `catalog()` or `create()` has been
    /// called.
    pub fn add_vendor_source_tagged(
        &mut self,
        root: impl Into<PathBuf>,
        tag: impl Into<String>,
    ) -> Result<(), MigrationError> {
        self.add_vendor(SourceDirectory::vendor(root, Some(tag.into())))
    }

    fn add_vendor(&mut self, source: SourceDirectory) -> Result<(), MigrationError> {
        if self.sealed {
            return Err(MigrationError::ConfigurationSealed);
        }
        log::debug!(
            "registered vendor migration source {} ({})",
            source.root().display(),
            source.origin()
        );
        self.vendors.push(source);
        Ok(())
    }

    /// The full ordered migration catalog, sorted ascending by identifier.
    ///
    /// Seals the registry on first call. The catalog is built by scanning
    /// the application source first, then every vendor source in configured
    /// order, parsing each artifact with the configured layout strategy. The
    /// result is cached until the next `create()`.
    ///
    /// All-or-nothing: a single malformed artifact or cross-source
    /// identifier collision fails the whole build, because a partial
    /// migration history is worse than an explicit halt.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryUnavailable` if the application root is missing,
    /// `MalformedMigration` for any undecodable artifact, and
    /// `DuplicateMigration` when two sources resolve to the same identifier.
    pub fn catalog(&mut self) -> Result<&[MigrationDescriptor], MigrationError> {
        self.sealed = true;

        if self.catalog.is_none() {
            let built = self.build_catalog()?;
            self.catalog = Some(built);
        }

        Ok(self.catalog.get_or_insert_with(Vec::new).as_slice())
    }

    /// Author a new migration from the given up change set.
    ///
    /// Seals the registry, derives a name from the naming policy against the
    /// current identifier set, materializes the artifact(s) into the
    /// application directory, and rebuilds the cached catalog. The down
    /// change set is derived by inverting the operations; use
    /// [`create_with_down`](Self::create_with_down) when the change set
    /// contains an operation with no structural inverse.
    ///
    /// Creation both reads the catalog and mutates the filesystem, so it
    /// needs exclusive access: `&mut self` enforces that within a process,
    /// but two uncoordinated processes creating simultaneously can still
    /// derive colliding identifiers that slip past the in-memory check.
    /// Serializing creation is the embedding application's responsibility.
    ///
    /// # Errors
    ///
    /// Any catalog build failure, plus `IrreversibleOperation` and
    /// `WriteConflict` from materialization.
    pub fn create(
        &mut self,
        change_set: Vec<SchemaOperation>,
    ) -> Result<MigrationDescriptor, MigrationError> {
        self.create_inner(change_set, None)
    }

    /// [`create`](Self::create) with an explicit down change set, for
    /// migrations containing irreversible (raw) operations.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create), minus `IrreversibleOperation`.
    pub fn create_with_down(
        &mut self,
        change_set: Vec<SchemaOperation>,
        down: Vec<SchemaOperation>,
    ) -> Result<MigrationDescriptor, MigrationError> {
        self.create_inner(change_set, Some(down))
    }

    fn create_inner(
        &mut self,
        change_set: Vec<SchemaOperation>,
        down: Option<Vec<SchemaOperation>>,
    ) -> Result<MigrationDescriptor, MigrationError> {
        self.sealed = true;

        if self.catalog.is_none() {
            let built = self.build_catalog()?;
            self.catalog = Some(built);
        }

        let existing: BTreeSet<String> = self
            .catalog
            .iter()
            .flatten()
            .map(|descriptor| descriptor.identifier.clone())
            .collect();

        let created_at = Utc::now();
        let identifier = self.naming.generate(&change_set, &existing, created_at);

        let mut descriptor =
            MigrationDescriptor::pending(identifier.as_str(), change_set, created_at);
        if let Some(down) = down {
            descriptor = descriptor.with_down(down);
        }

        let written = self.layout.materialize(&descriptor, &self.application)?;
        log::info!(
            "materialized migration '{}' ({} artifact(s))",
            identifier,
            written.len()
        );

        // The filesystem changed under the cache; rebuild before anyone reads
        self.catalog = None;
        let built = self.build_catalog()?;
        self.catalog = Some(built);

        let materialized = self
            .catalog
            .iter()
            .flatten()
            .find(|entry| entry.identifier == identifier)
            .cloned();

        match materialized {
            Some(entry) => Ok(entry),
            None => {
                // Unreachable in practice: we just wrote it
                descriptor.state = DescriptorState::Materialized;
                Ok(descriptor)
            }
        }
    }

    fn build_catalog(&self) -> Result<Vec<MigrationDescriptor>, MigrationError> {
        let mut seen: HashMap<String, Origin> = HashMap::new();
        let mut descriptors = Vec::new();

        let sources = std::iter::once(&self.application).chain(self.vendors.iter());
        for source in sources {
            for path in self.layout.scan(source)? {
                let descriptor = self.layout.parse(&path, source.origin())?;

                if let Some(first) = seen.get(&descriptor.identifier) {
                    return Err(MigrationError::DuplicateMigration {
                        identifier: descriptor.identifier,
                        first: first.clone(),
                        second: descriptor.origin,
                    });
                }

                seen.insert(descriptor.identifier.clone(), descriptor.origin.clone());
                descriptors.push(descriptor);
            }
        }

        descriptors.sort_by(|a, b| a.identifier.cmp(&b.identifier));

        log::debug!(
            "catalog built: {} migration(s) from {} source(s)",
            descriptors.len(),
            1 + self.vendors.len()
        );

        Ok(descriptors)
    }
}
