//! Parser configuration loaded from TOML

use std::collections::BTreeMap;
use std::path::Path;

use plinth_core::NodeMatch;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Base marker every plugin must derive from unless configured otherwise.
pub const AGENT_PLUGIN: &str = "cloudify.tosca.artifacts.agent_plugin";

/// Knobs of a blueprint parse.
///
/// ```toml
/// agent_plugin = "cloudify.tosca.artifacts.agent_plugin"
/// node_match = "exact"
///
/// [ref_aliases]
/// install = "workflows/install.radial"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub agent_plugin: String,
    pub node_match: NodeMatch,
    /// Short names usable in `ref:` entries, mapped to fetchable identifiers.
    pub ref_aliases: BTreeMap<String, String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            agent_plugin: AGENT_PLUGIN.to_string(),
            node_match: NodeMatch::default(),
            ref_aliases: BTreeMap::new(),
        }
    }
}

impl ParserConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Identifier a `ref:` value points at after alias substitution.
    pub fn resolve_ref<'a>(&'a self, reference: &'a str) -> &'a str {
        self.ref_aliases
            .get(reference)
            .map(String::as_str)
            .unwrap_or(reference)
    }
}
