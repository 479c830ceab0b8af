//! Node templates of the application template

use std::collections::HashSet;

use indexmap::IndexMap;
use plinth_core::document::{expect_mapping, kind_of, mapping_field, optional_str, sections};
use plinth_core::error::Result;
use plinth_core::plan::{Relationship, TypeDefinition};
use plinth_core::{BlueprintError, Document, Mapping, NodeTemplate};
use serde_json::Value;
use tracing::{debug, trace};

use crate::merge::Overlay;

/// The `application_template` section once its nodes are built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplicationTemplate {
    pub name: String,
    pub node_templates: Vec<NodeTemplate>,
}

/// Id of node `name` within application `application`.
pub fn node_id(application: &str, name: &str) -> String {
    format!("{}.{}", application, name)
}

/// Build and validate the node templates declared by `document`.
///
/// A document without an application template yields an empty one.
pub fn build_topology(
    document: &Document,
    types: &IndexMap<String, TypeDefinition>,
) -> Result<ApplicationTemplate> {
    let id = document.display_id();
    let Some(section) = document.mapping_section(sections::APPLICATION_TEMPLATE)? else {
        return Ok(ApplicationTemplate::default());
    };
    let name = required_str(section, "name", id, sections::APPLICATION_TEMPLATE)?.to_string();
    let entries: &[Value] = match section.get("topology") {
        None | Some(Value::Null) => &[],
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(BlueprintError::invalid_document(
                id,
                format!("'application_template.topology' must be a sequence, found {}", kind_of(other)),
            ))
        }
    };

    let mut seen = HashSet::new();
    let mut node_templates = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let path = format!("application_template.topology[{}]", i);
        let entry = expect_mapping(entry, id, &path)?;
        let node_name = required_str(entry, "name", id, &path)?;
        let type_name = required_str(entry, "type", id, &path)?;

        if !seen.insert(node_name.to_string()) {
            return Err(BlueprintError::DuplicateNodeName {
                duplicate_node_name: node_name.to_string(),
            });
        }
        let type_def = types.get(type_name).ok_or_else(|| BlueprintError::UndefinedType {
            node: node_name.to_string(),
            type_name: type_name.to_string(),
        })?;

        let properties = type_def
            .properties
            .clone()
            .overlay(mapping_field(entry, "properties", id, &path)?);
        let relationships = parse_relationships(&name, entry, id, &path)?;
        trace!(node = node_name, type_name, relationships = relationships.len(), "built node template");

        node_templates.push(NodeTemplate {
            id: node_id(&name, node_name),
            name: node_name.to_string(),
            type_name: type_name.to_string(),
            properties,
            relationships,
            policies: mapping_field(entry, "policies", id, &path)?,
            interfaces: Vec::new(),
        });
    }
    debug!(application = %name, nodes = node_templates.len(), "topology built");
    Ok(ApplicationTemplate {
        name,
        node_templates,
    })
}

fn parse_relationships(
    application: &str,
    entry: &Mapping,
    document: &str,
    path: &str,
) -> Result<Vec<Relationship>> {
    let items = match entry.get("relationships") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(BlueprintError::invalid_document(
                document,
                format!("'{}.relationships' must be a sequence, found {}", path, kind_of(other)),
            ))
        }
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let path = format!("{}.relationships[{}]", path, i);
            let item = expect_mapping(item, document, &path)?;
            let target = required_str(item, "target", document, &path)?;
            Ok(Relationship {
                kind: required_str(item, "type", document, &path)?.to_string(),
                target: target.to_string(),
                target_id: node_id(application, target),
                properties: mapping_field(item, "properties", document, &path)?,
            })
        })
        .collect()
}

fn required_str<'a>(mapping: &'a Mapping, field: &str, document: &str, path: &str) -> Result<&'a str> {
    optional_str(mapping, field, document, path)?.ok_or_else(|| {
        BlueprintError::invalid_document(document, format!("'{}.{}' is required", path, field))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::TypeHierarchy;
    use crate::yaml::parse_document;
    use plinth_core::ErrorCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn build(text: &str) -> Result<ApplicationTemplate> {
        let doc = parse_document(None, text).unwrap();
        let types = TypeHierarchy::from_document(&doc)?.resolve_all()?;
        build_topology(&doc, &types)
    }

    #[test]
    fn test_nodes_merge_type_defaults() {
        let app = build(
            r#"
application_template:
    name: test_app
    topology:
        -   name: test_node
            type: test_type
            properties:
                key: "val"
            relationships:
                -   type: contained_in
                    target: host
types:
    test_type:
        properties:
            key: "default"
            port: 8080
"#,
        )
        .unwrap();
        assert_eq!(app.name, "test_app");
        let node = &app.node_templates[0];
        assert_eq!(node.id, "test_app.test_node");
        assert_eq!(Value::Object(node.properties.clone()), json!({"key": "val", "port": 8080}));
        assert_eq!(node.relationships[0].target_id, "test_app.host");
        assert_eq!(node.relationships[0].kind, "contained_in");
    }

    #[test]
    fn test_undefined_type() {
        let err = build(
            r#"
application_template:
    name: test_app
    topology:
        -   name: test_node
            type: test_type
"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UndefinedType);
    }

    #[test]
    fn test_duplicate_node_name() {
        let err = build(
            r#"
application_template:
    name: test_app
    topology:
        -   name: test_node
            type: test_type
        -   name: test_node
            type: test_type
types:
    test_type: {}
"#,
        )
        .unwrap_err();
        assert_eq!(err.duplicate_node_name(), Some("test_node"));
    }

    #[test]
    fn test_missing_application_template() {
        let app = build("types: {}").unwrap();
        assert!(app.node_templates.is_empty());
    }

    #[test]
    fn test_node_without_type_is_invalid() {
        let err = build("application_template: {name: app, topology: [{name: n}]}").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidDocument);
    }
}
