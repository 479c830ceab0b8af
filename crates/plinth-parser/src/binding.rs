//! Interface to plugin binding
//!
//! Every interface a type declares must end up bound to exactly one plugin
//! that implements exactly that interface and derives from the agent plugin
//! marker.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use plinth_core::document::{expect_mapping, kind_of, mapping_field, optional_str, sections};
use plinth_core::error::Result;
use plinth_core::plan::{
    InterfaceBinding, InterfaceDeclaration, InterfaceDefinition, PluginDefinition, TypeDefinition,
};
use plinth_core::{BlueprintError, Document, Mapping, NodeTemplate};
use serde_json::Value;
use tracing::{debug, trace};

/// Parse the `interfaces` section.
pub fn parse_interfaces(document: &Document) -> Result<IndexMap<String, InterfaceDefinition>> {
    let mut interfaces = IndexMap::new();
    let Some(section) = document.mapping_section(sections::INTERFACES)? else {
        return Ok(interfaces);
    };
    for (name, value) in section {
        let path = format!("{}.{}", sections::INTERFACES, name);
        let body = match value {
            Value::Null => Mapping::new(),
            other => expect_mapping(other, document.display_id(), &path)?.clone(),
        };
        let operations = match body.get("operations") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|op| match op {
                    Value::String(op) => Ok(op.clone()),
                    other => Err(BlueprintError::invalid_document(
                        document.display_id(),
                        format!("'{}.operations' entries must be names, found {}", path, kind_of(other)),
                    )),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(BlueprintError::invalid_document(
                    document.display_id(),
                    format!("'{}.operations' must be a sequence, found {}", path, kind_of(other)),
                ))
            }
        };
        interfaces.insert(
            name.clone(),
            InterfaceDefinition {
                name: name.clone(),
                operations,
            },
        );
    }
    Ok(interfaces)
}

/// Parse the `plugins` section.
pub fn parse_plugins(document: &Document) -> Result<IndexMap<String, PluginDefinition>> {
    let mut plugins = IndexMap::new();
    let Some(section) = document.mapping_section(sections::PLUGINS)? else {
        return Ok(plugins);
    };
    let id = document.display_id();
    for (name, value) in section {
        let path = format!("{}.{}", sections::PLUGINS, name);
        let body = match value {
            Value::Null => Mapping::new(),
            other => expect_mapping(other, id, &path)?.clone(),
        };
        let properties = mapping_field(&body, "properties", id, &path)?;
        let properties_path = format!("{}.properties", path);
        plugins.insert(
            name.clone(),
            PluginDefinition {
                name: name.clone(),
                derived_from: optional_str(&body, "derived_from", id, &path)?.map(str::to_string),
                interface: optional_str(&properties, "interface", id, &properties_path)?
                    .map(str::to_string),
                url: optional_str(&properties, "url", id, &properties_path)?.map(str::to_string),
            },
        );
    }
    Ok(plugins)
}

pub struct PluginBinder<'a> {
    interfaces: &'a IndexMap<String, InterfaceDefinition>,
    plugins: &'a IndexMap<String, PluginDefinition>,
    agent_plugin: &'a str,
}

impl<'a> PluginBinder<'a> {
    pub fn new(
        interfaces: &'a IndexMap<String, InterfaceDefinition>,
        plugins: &'a IndexMap<String, PluginDefinition>,
        agent_plugin: &'a str,
    ) -> Self {
        Self {
            interfaces,
            plugins,
            agent_plugin,
        }
    }

    /// Bind the interfaces of every node's type, then of every type no node uses.
    ///
    /// Each type is bound once. Failures name the first node that uses the
    /// type, or the type itself when no node does.
    pub fn bind_all(
        &self,
        nodes: &mut [NodeTemplate],
        types: &IndexMap<String, TypeDefinition>,
    ) -> Result<()> {
        let mut bound: HashMap<&str, Vec<InterfaceBinding>> = HashMap::new();
        for node in nodes.iter_mut() {
            let type_def = types.get(&node.type_name).ok_or_else(|| BlueprintError::UndefinedType {
                node: node.name.clone(),
                type_name: node.type_name.clone(),
            })?;
            let bindings = match bound.get(type_def.name.as_str()) {
                Some(bindings) => bindings.clone(),
                None => {
                    let bindings = self.bind(&node.name, &type_def.interfaces)?;
                    bound.insert(type_def.name.as_str(), bindings.clone());
                    bindings
                }
            };
            node.interfaces = bindings;
        }
        for type_def in types.values() {
            if !bound.contains_key(type_def.name.as_str()) {
                let bindings = self.bind(&type_def.name, &type_def.interfaces)?;
                bound.insert(type_def.name.as_str(), bindings);
            }
        }
        debug!(types = bound.len(), "interfaces bound");
        Ok(())
    }

    /// Bind one type's interface declarations on behalf of `owner`.
    pub fn bind(&self, owner: &str, declarations: &[InterfaceDeclaration]) -> Result<Vec<InterfaceBinding>> {
        let mut seen = HashSet::new();
        for declaration in declarations {
            if !seen.insert(declaration.interface.as_str()) {
                return Err(BlueprintError::DuplicateInterface {
                    node_name: owner.to_string(),
                    duplicate_interface_name: declaration.interface.clone(),
                });
            }
        }
        for declaration in declarations {
            if !self.interfaces.contains_key(&declaration.interface) {
                return Err(BlueprintError::UndefinedInterface {
                    owner: owner.to_string(),
                    interface: declaration.interface.clone(),
                });
            }
        }
        if !declarations.is_empty() && self.plugins.is_empty() {
            return Err(BlueprintError::MissingPlugins {
                owner: owner.to_string(),
            });
        }
        declarations
            .iter()
            .map(|declaration| self.bind_one(owner, declaration))
            .collect()
    }

    fn bind_one(&self, owner: &str, declaration: &InterfaceDeclaration) -> Result<InterfaceBinding> {
        let interface = declaration.interface.as_str();
        let plugin = match &declaration.plugin {
            Some(name) => {
                let plugin = self.plugins.get(name).ok_or_else(|| BlueprintError::MissingExplicitPlugin {
                    owner: owner.to_string(),
                    interface: interface.to_string(),
                    plugin: name.clone(),
                })?;
                if plugin.interface.as_deref() != Some(interface) {
                    return Err(BlueprintError::IllegalExplicitPlugin {
                        owner: owner.to_string(),
                        interface: interface.to_string(),
                        plugin: name.clone(),
                        implemented: plugin.interface.clone().unwrap_or_default(),
                    });
                }
                plugin
            }
            None => {
                let candidates: Vec<&PluginDefinition> = self
                    .plugins
                    .values()
                    .filter(|plugin| plugin.interface.as_deref() == Some(interface))
                    .collect();
                match candidates.as_slice() {
                    [] => {
                        return Err(BlueprintError::NoMatchingPlugin {
                            owner: owner.to_string(),
                            interface: interface.to_string(),
                        })
                    }
                    [plugin] => *plugin,
                    many => {
                        return Err(BlueprintError::AmbiguousPlugin {
                            owner: owner.to_string(),
                            interface: interface.to_string(),
                            candidates: many.iter().map(|p| p.name.clone()).collect(),
                        })
                    }
                }
            }
        };
        if plugin.derived_from.as_deref() != Some(self.agent_plugin) {
            return Err(BlueprintError::IllegalPluginDerivation {
                plugin: plugin.name.clone(),
                derived_from: plugin.derived_from.clone().unwrap_or_default(),
                expected: self.agent_plugin.to_string(),
            });
        }
        trace!(owner, interface, plugin = %plugin.name, "bound interface");
        Ok(InterfaceBinding {
            interface: interface.to_string(),
            plugin: plugin.name.clone(),
        })
    }
}
