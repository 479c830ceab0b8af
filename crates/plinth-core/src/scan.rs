//! Recursive visitor over property values
//!
//! The same walk serves function validation, compile-time evaluation and
//! output evaluation: the caller supplies a handler and decides whether the
//! handler's results replace the visited values.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structural position in which an intrinsic function is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    NodeTemplate,
    Relationship,
    Outputs,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::NodeTemplate => write!(f, "node_template"),
            Scope::Relationship => write!(f, "relationship"),
            Scope::Outputs => write!(f, "outputs"),
        }
    }
}

/// The object that declares a scanned value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    NodeTemplate { node_id: String },
    Relationship { source_id: String, target_id: String },
    Outputs,
}

impl Context {
    pub fn scope(&self) -> Scope {
        match self {
            Context::NodeTemplate { .. } => Scope::NodeTemplate,
            Context::Relationship { .. } => Scope::Relationship,
            Context::Outputs => Scope::Outputs,
        }
    }
}

/// Where a value was found: declaring context plus textual path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub context: Context,
    pub path: String,
}

impl Provenance {
    pub fn new(context: Context, path: impl Into<String>) -> Self {
        Self {
            context,
            path: path.into(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.context.scope()
    }
}

/// Visit every value nested in `root` (not `root` itself).
///
/// Each mapping entry and sequence element is handed to `handler` together
/// with its provenance (`path.key`, `path[i]`). When `replace` is set and the
/// handler returns `Some`, the value is substituted and not descended into;
/// otherwise the walk continues inside it.
pub fn scan_properties<F, E>(
    root: &mut Value,
    handler: &mut F,
    context: &Context,
    path: &str,
    replace: bool,
) -> Result<(), E>
where
    F: FnMut(&Value, &Provenance) -> Result<Option<Value>, E>,
{
    match root {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                visit(child, handler, context, format!("{}.{}", path, key), replace)?;
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter_mut().enumerate() {
                visit(child, handler, context, format!("{}[{}]", path, i), replace)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn visit<F, E>(
    value: &mut Value,
    handler: &mut F,
    context: &Context,
    path: String,
    replace: bool,
) -> Result<(), E>
where
    F: FnMut(&Value, &Provenance) -> Result<Option<Value>, E>,
{
    let provenance = Provenance::new(context.clone(), path);
    match handler(value, &provenance)? {
        Some(replacement) if replace => {
            *value = replacement;
            Ok(())
        }
        _ => scan_properties(value, handler, context, &provenance.path, replace),
    }
}
