//! Type derivation resolution
//!
//! Every declared type is flattened onto its `derived_from` chain. The walk
//! keeps the current derivation path so a cycle is reported as the ring of
//! type names that closes it.

use indexmap::IndexMap;
use plinth_core::document::{expect_mapping, kind_of, mapping_field, optional_str, sections};
use plinth_core::error::Result;
use plinth_core::plan::{InterfaceDeclaration, TypeDefinition};
use plinth_core::{BlueprintError, Document, Mapping};
use serde_json::Value;
use tracing::{debug, trace};

use crate::merge::Overlay;

/// A type as declared, before its parent is folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredType {
    pub name: String,
    pub derived_from: Option<String>,
    pub properties: Mapping,
    pub interfaces: Vec<InterfaceDeclaration>,
    pub policies: Mapping,
}

impl DeclaredType {
    fn parse(name: &str, value: &Value, document: &str) -> Result<Self> {
        let path = format!("{}.{}", sections::TYPES, name);
        let body = match value {
            Value::Null => Mapping::new(),
            other => expect_mapping(other, document, &path)?.clone(),
        };
        Ok(Self {
            name: name.to_string(),
            derived_from: optional_str(&body, "derived_from", document, &path)?.map(str::to_string),
            properties: mapping_field(&body, "properties", document, &path)?,
            interfaces: parse_interface_declarations(&body, document, &path)?,
            policies: mapping_field(&body, "policies", document, &path)?,
        })
    }

    fn into_definition(self) -> TypeDefinition {
        TypeDefinition {
            name: self.name,
            derived_from: self.derived_from,
            properties: self.properties,
            interfaces: self.interfaces,
            policies: self.policies,
        }
    }
}

/// Parse a type's `interfaces` list: bare names or single-key `interface: plugin`.
fn parse_interface_declarations(
    body: &Mapping,
    document: &str,
    path: &str,
) -> Result<Vec<InterfaceDeclaration>> {
    let items = match body.get("interfaces") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(BlueprintError::invalid_document(
                document,
                format!("'{}.interfaces' must be a sequence, found {}", path, kind_of(other)),
            ))
        }
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(name) => Ok(InterfaceDeclaration::implicit(name.as_str())),
            Value::Object(entry) if entry.len() == 1 => {
                let (interface, plugin) = entry.iter().next().ok_or_else(|| {
                    BlueprintError::invalid_document(document, format!("{}.interfaces[{}] is empty", path, i))
                })?;
                match plugin.as_str() {
                    Some(plugin) => Ok(InterfaceDeclaration::explicit(interface.as_str(), plugin)),
                    None => Err(BlueprintError::invalid_document(
                        document,
                        format!(
                            "'{}.interfaces[{}].{}' must name a plugin, found {}",
                            path,
                            i,
                            interface,
                            kind_of(plugin)
                        ),
                    )),
                }
            }
            other => Err(BlueprintError::invalid_document(
                document,
                format!(
                    "'{}.interfaces[{}]' must be an interface name or a single-key mapping, found {}",
                    path,
                    i,
                    kind_of(other)
                ),
            )),
        })
        .collect()
}

/// Declared types of a merged document, flattened on demand.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    declared: IndexMap<String, DeclaredType>,
}

impl TypeHierarchy {
    pub fn from_document(document: &Document) -> Result<Self> {
        let mut declared = IndexMap::new();
        if let Some(types) = document.mapping_section(sections::TYPES)? {
            for (name, value) in types {
                declared.insert(name.clone(), DeclaredType::parse(name, value, document.display_id())?);
            }
        }
        Ok(Self { declared })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.declared.contains_key(name)
    }

    /// Flatten every declared type, keeping declaration order.
    pub fn resolve_all(&self) -> Result<IndexMap<String, TypeDefinition>> {
        let mut resolved = IndexMap::new();
        for name in self.declared.keys() {
            let mut path = Vec::new();
            self.resolve(name, &mut resolved, &mut path)?;
        }
        debug!(types = resolved.len(), "type hierarchy resolved");
        Ok(self
            .declared
            .keys()
            .filter_map(|name| resolved.get(name).map(|t| (name.clone(), t.clone())))
            .collect())
    }

    fn resolve(
        &self,
        name: &str,
        resolved: &mut IndexMap<String, TypeDefinition>,
        path: &mut Vec<String>,
    ) -> Result<TypeDefinition> {
        if let Some(done) = resolved.get(name) {
            return Ok(done.clone());
        }
        if let Some(start) = path.iter().position(|entry| entry == name) {
            let mut circular_dependency = path[start..].to_vec();
            circular_dependency.push(name.to_string());
            return Err(BlueprintError::CircularTypeDependency {
                circular_dependency,
            });
        }
        let declared = self.declared.get(name).cloned().ok_or_else(|| {
            BlueprintError::invalid_document(
                sections::TYPES,
                format!("type '{}' is not declared", name),
            )
        })?;
        trace!(type_name = name, parent = ?declared.derived_from, "resolving type");

        path.push(name.to_string());
        let definition = match declared.derived_from.clone() {
            None => declared.into_definition(),
            Some(parent) => {
                if !self.declared.contains_key(&parent) {
                    return Err(BlueprintError::UndefinedParentType {
                        type_name: name.to_string(),
                        parent,
                    });
                }
                let base = self.resolve(&parent, resolved, path)?;
                derive(base, declared)
            }
        };
        path.pop();

        resolved.insert(name.to_string(), definition.clone());
        Ok(definition)
    }
}

/// Fold a declared child onto its resolved parent.
fn derive(parent: TypeDefinition, child: DeclaredType) -> TypeDefinition {
    let mut interfaces: Vec<InterfaceDeclaration> = parent
        .interfaces
        .into_iter()
        .filter(|inherited| !child.interfaces.iter().any(|own| own.interface == inherited.interface))
        .collect();
    interfaces.extend(child.interfaces);

    TypeDefinition {
        name: child.name,
        derived_from: child.derived_from,
        properties: parent.properties.overlay(child.properties),
        interfaces,
        policies: parent.policies.overlay(child.policies),
    }
}
