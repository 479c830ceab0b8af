//! Loaded blueprint documents and typed access to their sections

use serde_json::Value;

use crate::error::{BlueprintError, Result};

/// Generic mapping node of a blueprint document.
pub type Mapping = serde_json::Map<String, Value>;

/// Top-level section names of a blueprint document.
pub mod sections {
    pub const TYPES: &str = "types";
    pub const INTERFACES: &str = "interfaces";
    pub const PLUGINS: &str = "plugins";
    pub const POLICIES: &str = "policies";
    pub const APPLICATION_TEMPLATE: &str = "application_template";
    pub const IMPORTS: &str = "imports";
    pub const INPUTS: &str = "inputs";
    pub const OUTPUTS: &str = "outputs";
    pub const WORKFLOWS: &str = "workflows";

    /// `policies` sub-sections.
    pub const POLICY_TYPES: &str = "types";
    pub const POLICY_RULES: &str = "rules";
}

/// Display name used for documents that were not loaded from an identifier.
pub const ROOT_DOCUMENT: &str = "<root>";

/// One parsed blueprint document.
///
/// `id` is the canonical identifier the document was fetched from; an
/// in-memory root document has none.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub id: Option<String>,
    pub body: Mapping,
}

impl Document {
    pub fn new(id: Option<String>, body: Mapping) -> Self {
        Self { id, body }
    }

    /// Wrap a parsed value, rejecting anything that is not a mapping.
    ///
    /// An empty document (`null`) is treated as an empty mapping.
    pub fn from_value(id: Option<String>, value: Value) -> Result<Self> {
        match value {
            Value::Object(body) => Ok(Self { id, body }),
            Value::Null => Ok(Self {
                id,
                body: Mapping::new(),
            }),
            other => Err(BlueprintError::invalid_document(
                id.as_deref().unwrap_or(ROOT_DOCUMENT),
                format!("expected a mapping at the top level, found {}", kind_of(&other)),
            )),
        }
    }

    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or(ROOT_DOCUMENT)
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    /// Section that must be a mapping when present.
    pub fn mapping_section(&self, name: &str) -> Result<Option<&Mapping>> {
        match self.body.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => expect_mapping(value, self.display_id(), name).map(Some),
        }
    }

    /// Import references in declaration order.
    pub fn imports(&self) -> Result<Vec<String>> {
        let Some(value) = self.body.get(sections::IMPORTS) else {
            return Ok(Vec::new());
        };
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        BlueprintError::invalid_document(
                            self.display_id(),
                            format!("imports[{}] must be a string, found {}", i, kind_of(item)),
                        )
                    })
                })
                .collect(),
            other => Err(BlueprintError::invalid_document(
                self.display_id(),
                format!("imports must be a sequence, found {}", kind_of(other)),
            )),
        }
    }
}

/// Borrow `value` as a mapping or report where the shape was wrong.
pub fn expect_mapping<'a>(value: &'a Value, document: &str, path: &str) -> Result<&'a Mapping> {
    value.as_object().ok_or_else(|| {
        BlueprintError::invalid_document(
            document,
            format!("'{}' must be a mapping, found {}", path, kind_of(value)),
        )
    })
}

/// Optional string field of a mapping.
pub fn optional_str<'a>(
    mapping: &'a Mapping,
    field: &str,
    document: &str,
    path: &str,
) -> Result<Option<&'a str>> {
    match mapping.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(BlueprintError::invalid_document(
            document,
            format!("'{}.{}' must be a string, found {}", path, field, kind_of(other)),
        )),
    }
}

/// Optional mapping field of a mapping; absent fields read as empty.
pub fn mapping_field(mapping: &Mapping, field: &str, document: &str, path: &str) -> Result<Mapping> {
    match mapping.get(field) {
        None | Some(Value::Null) => Ok(Mapping::new()),
        Some(value) => expect_mapping(value, document, &format!("{}.{}", path, field)).cloned(),
    }
}

/// Human-readable name of a value's shape for diagnostics.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_document_is_empty() {
        let doc = Document::from_value(Some("empty.yaml".into()), Value::Null).unwrap();
        assert!(doc.body.is_empty());
        assert_eq!(doc.display_id(), "empty.yaml");
    }

    #[test]
    fn test_scalar_document_is_rejected() {
        let err = Document::from_value(None, json!("just text")).unwrap_err();
        assert_eq!(err.code().code(), 1);
        assert!(err.to_string().contains(ROOT_DOCUMENT));
    }

    #[test]
    fn test_imports_in_declaration_order() {
        let doc = Document::from_value(
            None,
            json!({"imports": ["b.yaml", "a.yaml", "../c.yaml"]}),
        )
        .unwrap();
        assert_eq!(doc.imports().unwrap(), vec!["b.yaml", "a.yaml", "../c.yaml"]);
    }

    #[test]
    fn test_non_string_import_is_rejected() {
        let doc = Document::from_value(None, json!({"imports": ["a.yaml", 3]})).unwrap();
        let err = doc.imports().unwrap_err();
        assert!(err.to_string().contains("imports[1]"));
    }

    #[test]
    fn test_mapping_section_shape() {
        let doc = Document::from_value(None, json!({"types": [], "plugins": null})).unwrap();
        assert!(doc.mapping_section("types").is_err());
        assert!(doc.mapping_section("plugins").unwrap().is_none());
        assert!(doc.mapping_section("interfaces").unwrap().is_none());
    }
}
