//! Configuration management

use crate::domain::alignment::AlignPolicy;
use crate::domain::schema::TagSchema;
use crate::error::{Result, TagmergeError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub align_option: AlignPolicy,
    pub created: DateTime<Utc>,
    pub tags: TagSchema,
}

impl Config {
    /// Create a new config with the default TimeML-flavored tag schema
    pub fn new(align_option: AlignPolicy) -> Self {
        Config {
            align_option,
            created: Utc::now(),
            tags: TagSchema::timeml_default(),
        }
    }

    /// Load config from .tagmerge/config.toml in the given directory
    pub fn load_from_dir(path: &Path) -> Result<Self> {
        let config_path = path.join(".tagmerge").join("config.toml");

        let contents = fs::read_to_string(&config_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TagmergeError::NotProjectDirectory(path.to_path_buf())
            } else {
                TagmergeError::Io(e)
            }
        })?;

        toml::from_str(&contents)
            .map_err(|e| TagmergeError::Config(format!("Failed to parse config.toml: {}", e)))
    }

    /// Save config to .tagmerge/config.toml in the given directory
    pub fn save_to_dir(&self, path: &Path) -> Result<()> {
        let tagmerge_dir = path.join(".tagmerge");
        let config_path = tagmerge_dir.join("config.toml");

        // Ensure .tagmerge directory exists
        if !tagmerge_dir.exists() {
            fs::create_dir(&tagmerge_dir)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| TagmergeError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, contents)?;

        Ok(())
    }
}
