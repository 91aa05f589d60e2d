//! YAML configuration for the masker.
//!
//! The file is a mapping of table name to a mapping of column name to
//! template:
//!
//! ```yaml
//! users:
//!   email: "{{ .First 3 }}***"
//!   password: "{{ .Hashed }}"
//! payments:
//!   card_number: "************{{ .Last 4 }}"
//! ```

use super::rules::RuleSet;
use crate::error::{MaskError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Raw configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaskYamlConfig {
    pub tables: BTreeMap<String, BTreeMap<String, String>>,
}

impl MaskYamlConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| MaskError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|source| MaskError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse YAML text. An empty document configures no tables.
    pub fn parse(content: &str) -> std::result::Result<Self, serde_yaml_ng::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(content)
    }

    pub fn compile(&self) -> Result<RuleSet> {
        RuleSet::compile(&self.tables)
    }
}

/// Load and compile a configuration file into a rule set
pub fn load_rules(path: &Path) -> Result<RuleSet> {
    MaskYamlConfig::load(path)?.compile()
}
