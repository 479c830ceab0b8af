//! Structured-text parsing of blueprint documents

use plinth_core::document::ROOT_DOCUMENT;
use plinth_core::error::Result;
use plinth_core::{BlueprintError, Document};
use serde_json::Value;

/// Parse YAML text into a [`Document`].
///
/// Syntax errors and non-mapping documents fail with `InvalidDocument`.
pub fn parse_document(id: Option<String>, text: &str) -> Result<Document> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| {
        BlueprintError::invalid_document(id.as_deref().unwrap_or(ROOT_DOCUMENT), e.to_string())
    })?;
    Document::from_value(id, value)
}
