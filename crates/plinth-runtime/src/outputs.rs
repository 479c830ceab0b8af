//! Output evaluation against live node instances
//!
//! `get_attribute` is the only intrinsic function that survives into the
//! plan. It is resolved here, once a deployment reports its node instances.

use std::fmt;

use plinth_core::document::sections;
use plinth_core::functions::{Function, GetAttribute, GET_ATTRIBUTE_FUNCTION};
use plinth_core::{scan_properties, Context, Mapping, NodeMatch, Plan, Provenance};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::errors::RuntimeError;

/// A deployed instance of a node template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeInstance {
    pub node_id: String,
    /// Properties reported at runtime; absent until the instance reports any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_properties: Option<Mapping>,
}

impl NodeInstance {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            runtime_properties: None,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.runtime_properties
            .get_or_insert_with(Mapping::new)
            .insert(name.into(), value.into());
        self
    }

    /// Reported value of `attribute`, `null` when never reported.
    pub fn attribute(&self, attribute: &str) -> Value {
        self.runtime_properties
            .as_ref()
            .and_then(|properties| properties.get(attribute))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// Source of the current node instances of a deployment.
pub trait NodeInstanceProvider {
    fn node_instances(&self) -> Result<Vec<NodeInstance>, RuntimeError>;
}

impl<F, E> NodeInstanceProvider for F
where
    F: Fn() -> Result<Vec<NodeInstance>, E>,
    E: fmt::Display,
{
    fn node_instances(&self) -> Result<Vec<NodeInstance>, RuntimeError> {
        self().map_err(|e| RuntimeError::Provider(e.to_string()))
    }
}

/// Node instances fetched at most once, on first use.
///
/// Scoped to one evaluation; a new evaluation sees a fresh snapshot. A node
/// reference selects the instances whose id equals it; when none does, the
/// node match mode applies (containment unless configured otherwise).
pub struct InstanceCache<'p, P: NodeInstanceProvider + ?Sized> {
    provider: &'p P,
    node_match: NodeMatch,
    instances: Option<Vec<NodeInstance>>,
}

impl<'p, P: NodeInstanceProvider + ?Sized> InstanceCache<'p, P> {
    pub fn new(provider: &'p P) -> Self {
        Self {
            provider,
            node_match: NodeMatch::default(),
            instances: None,
        }
    }

    pub fn with_node_match(mut self, node_match: NodeMatch) -> Self {
        self.node_match = node_match;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.instances.is_some()
    }

    pub fn instances(&mut self) -> Result<&[NodeInstance], RuntimeError> {
        if self.instances.is_none() {
            let loaded = self.provider.node_instances()?;
            debug!(instances = loaded.len(), "node instances loaded");
            self.instances = Some(loaded);
        }
        Ok(self.instances.as_deref().unwrap_or_default())
    }

    /// Runtime value of one `get_attribute` call.
    pub fn attribute(&mut self, function: &GetAttribute) -> Result<Value, RuntimeError> {
        let node_match = self.node_match;
        let reference = function.node_name.as_str();
        let instances = self.instances()?;
        let exact: Vec<&NodeInstance> = instances.iter().filter(|i| i.node_id == reference).collect();
        let selected = if exact.is_empty() {
            instances
                .iter()
                .filter(|i| node_match.matches(reference, &i.node_id))
                .collect()
        } else {
            exact
        };
        let mut matching = selected.into_iter();
        match (matching.next(), matching.next()) {
            (Some(instance), None) => {
                trace!(node = %instance.node_id, attribute = %function.attribute_name, "resolved attribute");
                Ok(instance.attribute(&function.attribute_name))
            }
            (None, _) => Err(RuntimeError::function_evaluation(
                GET_ATTRIBUTE_FUNCTION,
                format!("Node specified in function does not exist: {}.", function.node_name),
            )),
            (Some(_), Some(_)) => Err(RuntimeError::function_evaluation(
                GET_ATTRIBUTE_FUNCTION,
                format!(
                    "Multi instances of node \"{}\" are not supported by function.",
                    function.node_name
                ),
            )),
        }
    }
}

/// Evaluate an outputs section (`name -> {description, value}`).
///
/// Returns `name -> value` with every `get_attribute` replaced by the
/// attribute's runtime value. Other values pass through unchanged. The
/// provider is called at most once, and only if some output needs it.
pub fn evaluate_outputs<P>(outputs: &Mapping, provider: &P) -> Result<Mapping, RuntimeError>
where
    P: NodeInstanceProvider + ?Sized,
{
    evaluate_outputs_with(outputs, provider, NodeMatch::default())
}

/// [`evaluate_outputs`] with an explicit node match mode.
pub fn evaluate_outputs_with<P>(
    outputs: &Mapping,
    provider: &P,
    node_match: NodeMatch,
) -> Result<Mapping, RuntimeError>
where
    P: NodeInstanceProvider + ?Sized,
{
    let mut cache = InstanceCache::new(provider).with_node_match(node_match);
    let mut evaluated = Mapping::new();
    for (name, output) in outputs {
        let value = output.get("value").cloned().unwrap_or(Value::Null);
        let mut holder = Value::Object(Mapping::from_iter([("value".to_string(), value)]));
        scan_properties(
            &mut holder,
            &mut |value: &Value, provenance: &Provenance| -> Result<Option<Value>, RuntimeError> {
                match Function::parse(value, provenance)? {
                    Some(Function::GetAttribute(function)) => cache.attribute(&function).map(Some),
                    _ => Ok(None),
                }
            },
            &Context::Outputs,
            &format!("{}.{}", sections::OUTPUTS, name),
            true,
        )?;
        let value = match holder {
            Value::Object(mut holder) => holder.remove("value").unwrap_or(Value::Null),
            _ => Value::Null,
        };
        evaluated.insert(name.clone(), value);
    }
    debug!(outputs = evaluated.len(), fetched = cache.is_loaded(), "outputs evaluated");
    Ok(evaluated)
}

/// [`evaluate_outputs`] over a plan's outputs, matching nodes the way the
/// plan was resolved.
pub fn evaluate_plan_outputs<P>(plan: &Plan, provider: &P) -> Result<Mapping, RuntimeError>
where
    P: NodeInstanceProvider + ?Sized,
{
    evaluate_outputs_with(&plan.outputs, provider, plan.node_match)
}
