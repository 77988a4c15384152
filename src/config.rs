//! Migration configuration
//!
//! [`MigrationConfig`] is the immutable snapshot of options that
//! parameterizes the registry at construction time. It can be built
//! programmatically or loaded from `config/config.toml` (section
//! `migrations`) with `WATERSHED`-prefixed environment variable overrides
//! using `MigrationConfig::load()`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct MigrationConfig {
    /// Application migrations directory (the only writable root)
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Vendor migration directories, in priority order. Later entries are
    /// lower priority but never silently shadow identical identifiers; a
    /// collision is an error, not a resolution.
    #[serde(default)]
    pub vendor_directories: Vec<PathBuf>,

    /// Layout-strategy tag (see `layout::strategy_for_tag`)
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Naming-policy tag (see `naming::policy_for_tag`)
    #[serde(default = "default_name_policy")]
    pub name_policy: String,

    /// Tracking-table name, threaded through to the external runner
    #[serde(default = "default_table")]
    pub table: String,

    /// Safe-mode hint for the external runner (extra caution before
    /// destructive operations); the core enforces nothing itself
    #[serde(default = "default_safe")]
    pub safe: bool,
}

fn default_directory() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_strategy() -> String {
    crate::layout::SINGLE_FILE.to_string()
}

fn default_name_policy() -> String {
    crate::naming::DERIVE_FROM_CHANGES.to_string()
}

fn default_table() -> String {
    "migrations".to_string()
}

fn default_safe() -> bool {
    std::env::var("SAFE_MIGRATIONS")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            vendor_directories: Vec::new(),
            strategy: default_strategy(),
            name_policy: default_name_policy(),
            table: default_table(),
            safe: default_safe(),
        }
    }
}

impl MigrationConfig {
    /// Configuration rooted at the given application directory, defaults
    /// everywhere else
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    /// Append a vendor directory. Insertion order is priority order.
    pub fn with_vendor_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.vendor_directories.push(directory.into());
        self
    }

    /// Select the layout-strategy tag
    pub fn with_strategy(mut self, tag: impl Into<String>) -> Self {
        self.strategy = tag.into();
        self
    }

    /// Select the naming-policy tag
    pub fn with_name_policy(mut self, tag: impl Into<String>) -> Self {
        self.name_policy = tag.into();
        self
    }

    /// Load the migration configuration from `config/config.toml`, falling
    /// back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        // Build configuration by reading the TOML file (optional) and environment variables
        let builder = Config::builder()
            .add_source(File::with_name("config/config.toml").required(false))
            .add_source(Environment::with_prefix("WATERSHED").separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // If the file existed but was unreadable (parse error, permission issue, etc.), warn and retry with env only
                if std::path::Path::new("config/config.toml").exists() {
                    log::warn!("failed to load config file, falling back to env: {}", err);
                }
                Config::builder()
                    .add_source(Environment::with_prefix("WATERSHED").separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        // The migrations section is optional; every option has a default
        match settings.get::<MigrationConfig>("migrations") {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Migration configuration could not be loaded from file or environment: {}",
                e
            ))),
        }
    }
}
