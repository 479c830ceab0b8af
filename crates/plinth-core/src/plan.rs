//! The resolved deployment plan
//!
//! A [`Plan`] is the single artifact every phase after resolution reads. It is
//! plain data: once built it is never mutated, so it can be shared freely
//! between concurrent output evaluations.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Mapping;

/// How a node reference inside an intrinsic function is matched against
/// node template ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeMatch {
    /// The reference must occur somewhere within the id.
    ///
    /// Ids are generated as `<application>.<node>`, so a bare node name
    /// matches its template.
    #[default]
    Contains,
    /// The reference must equal the id.
    Exact,
}

impl NodeMatch {
    pub fn matches(self, reference: &str, id: &str) -> bool {
        match self {
            NodeMatch::Contains => id.contains(reference),
            NodeMatch::Exact => id == reference,
        }
    }
}

/// A declared interface: a named set of operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDefinition {
    pub name: String,
    #[serde(default)]
    pub operations: Vec<String>,
}

/// A plugin implementing one interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDefinition {
    pub name: String,
    pub derived_from: Option<String>,
    /// Name of the interface this plugin implements.
    pub interface: Option<String>,
    pub url: Option<String>,
}

/// One entry of a type's `interfaces` list.
///
/// `plugin` is set for the explicit `interface: plugin` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDeclaration {
    pub interface: String,
    pub plugin: Option<String>,
}

impl InterfaceDeclaration {
    pub fn implicit(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            plugin: None,
        }
    }

    pub fn explicit(interface: impl Into<String>, plugin: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            plugin: Some(plugin.into()),
        }
    }
}

/// A type after its derivation chain has been flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    pub derived_from: Option<String>,
    #[serde(default)]
    pub properties: Mapping,
    #[serde(default)]
    pub interfaces: Vec<InterfaceDeclaration>,
    #[serde(default)]
    pub policies: Mapping,
}

/// An interface of a type bound to the plugin that implements it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceBinding {
    pub interface: String,
    pub plugin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub kind: String,
    /// Target node name as written in the blueprint.
    pub target: String,
    /// Target node id. Not checked at plan time; readers resolve it lazily.
    pub target_id: String,
    #[serde(default)]
    pub properties: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplate {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub properties: Mapping,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub policies: Mapping,
    #[serde(default)]
    pub interfaces: Vec<InterfaceBinding>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    /// Input name to its literal value.
    #[serde(default)]
    pub inputs: Mapping,
    #[serde(default)]
    pub node_templates: Vec<NodeTemplate>,
    /// Output name to `{description, value}`.
    #[serde(default)]
    pub outputs: Mapping,
    #[serde(default)]
    pub types: IndexMap<String, TypeDefinition>,
    #[serde(default)]
    pub interfaces: IndexMap<String, InterfaceDefinition>,
    #[serde(default)]
    pub plugins: IndexMap<String, PluginDefinition>,
    #[serde(default)]
    pub policies: Mapping,
    #[serde(default)]
    pub workflows: Mapping,
    #[serde(default)]
    pub node_match: NodeMatch,
}

impl Plan {
    /// Node template with exactly this id.
    pub fn node(&self, id: &str) -> Option<&NodeTemplate> {
        self.node_templates.iter().find(|n| n.id == id)
    }

    /// Node templates whose id matches `reference` under the plan's match mode.
    pub fn find_nodes(&self, reference: &str) -> Vec<&NodeTemplate> {
        self.node_templates
            .iter()
            .filter(|n| self.node_match.matches(reference, &n.id))
            .collect()
    }

    /// First node template, in plan order, whose id matches `reference`.
    pub fn find_node(&self, reference: &str) -> Option<&NodeTemplate> {
        self.node_templates
            .iter()
            .find(|n| self.node_match.matches(reference, &n.id))
    }

    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }
}
