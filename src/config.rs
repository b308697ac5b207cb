//! Configuration.
//!
//! Read from `avant.toml`:
//!
//! ```toml
//! prefix = "BLACK_"
//! schema = "avant/schema.avant"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AvantError, AvantResult};

/// Name of the project-level config file.
pub const CONFIG_FILE: &str = "avant.toml";

/// Table prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "BLACK_";

/// Project configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Prepended to every upper-cased model name.
    pub prefix: String,
    /// Path of the schema file.
    pub schema: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            schema: PathBuf::from("avant").join("schema.avant"),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// Lookup order: `explicit`, then `./avant.toml`, then
    /// `<config dir>/avant/config.toml`, then defaults. A missing explicit
    /// file is an error; the fallbacks are optional.
    pub fn load(explicit: Option<&Path>) -> AvantResult<Self> {
        Self::load_in(Path::new("."), explicit)
    }

    /// [`Config::load`] with `root` standing in for the working directory.
    pub fn load_in(root: &Path, explicit: Option<&Path>) -> AvantResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let candidates = [
            Some(root.join(CONFIG_FILE)),
            dirs::config_dir().map(|d| d.join("avant").join("config.toml")),
        ];
        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                return Self::from_file(&path);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> AvantResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AvantError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)
            .map_err(|e| AvantError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text.
    pub fn from_toml(content: &str) -> AvantResult<Self> {
        toml::from_str(content).map_err(|e| AvantError::Config(e.to_string()))
    }

    /// Override the table prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Override the schema path.
    pub fn with_schema(mut self, schema: impl Into<PathBuf>) -> Self {
        self.schema = schema.into();
        self
    }
}
