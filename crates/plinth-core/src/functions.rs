//! Intrinsic functions embedded in blueprint values
//!
//! A value of the form `{get_input: name}`, `{get_property: [node, prop]}` or
//! `{get_attribute: [node, attr]}` is an intrinsic function. Parsing turns it
//! into a [`Function`] that remembers where it was declared, so validation
//! can enforce the scope rules of each variant:
//!
//! | function | node-template | relationship | outputs |
//! |---|---|---|---|
//! | `get_input` | yes | yes | yes |
//! | `get_property` | `SELF` or named node | `SOURCE`/`TARGET` or named node | named node |
//! | `get_attribute` | no | no | named node, never `SELF` |
//!
//! `get_attribute` is only resolvable against live node instances and is
//! left for the output evaluator.

use serde_json::Value;
use tracing::trace;

use crate::document::kind_of;
use crate::error::{BlueprintError, Result};
use crate::plan::{NodeTemplate, Plan};
use crate::scan::{Context, Provenance, Scope};

pub const GET_INPUT_FUNCTION: &str = "get_input";
pub const GET_PROPERTY_FUNCTION: &str = "get_property";
pub const GET_ATTRIBUTE_FUNCTION: &str = "get_attribute";

pub const SELF: &str = "SELF";
pub const SOURCE: &str = "SOURCE";
pub const TARGET: &str = "TARGET";

#[derive(Debug, Clone, PartialEq)]
pub struct GetInput {
    pub input_name: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetProperty {
    pub node_name: String,
    pub property_name: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetAttribute {
    pub node_name: String,
    pub attribute_name: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    GetInput(GetInput),
    GetProperty(GetProperty),
    GetAttribute(GetAttribute),
}

impl Function {
    /// Recognise an intrinsic function.
    ///
    /// Returns `Ok(None)` for every value that is not a single-key mapping
    /// keyed by a function name; such values are ordinary data.
    pub fn parse(raw: &Value, provenance: &Provenance) -> Result<Option<Function>> {
        let Some(map) = raw.as_object() else {
            return Ok(None);
        };
        if map.len() != 1 {
            return Ok(None);
        }
        let Some((name, args)) = map.iter().next() else {
            return Ok(None);
        };
        let function = match name.as_str() {
            GET_INPUT_FUNCTION => Function::GetInput(GetInput {
                input_name: string_arg(GET_INPUT_FUNCTION, args, provenance)?,
                provenance: provenance.clone(),
            }),
            GET_PROPERTY_FUNCTION => {
                let (node_name, property_name) = pair_args(GET_PROPERTY_FUNCTION, args, provenance)?;
                Function::GetProperty(GetProperty {
                    node_name,
                    property_name,
                    provenance: provenance.clone(),
                })
            }
            GET_ATTRIBUTE_FUNCTION => {
                let (node_name, attribute_name) = pair_args(GET_ATTRIBUTE_FUNCTION, args, provenance)?;
                Function::GetAttribute(GetAttribute {
                    node_name,
                    attribute_name,
                    provenance: provenance.clone(),
                })
            }
            _ => return Ok(None),
        };
        trace!(function = function.name(), path = %provenance.path, "parsed intrinsic function");
        Ok(Some(function))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::GetInput(_) => GET_INPUT_FUNCTION,
            Function::GetProperty(_) => GET_PROPERTY_FUNCTION,
            Function::GetAttribute(_) => GET_ATTRIBUTE_FUNCTION,
        }
    }

    pub fn provenance(&self) -> &Provenance {
        match self {
            Function::GetInput(f) => &f.provenance,
            Function::GetProperty(f) => &f.provenance,
            Function::GetAttribute(f) => &f.provenance,
        }
    }

    pub fn validate(&self, plan: &Plan) -> Result<()> {
        match self {
            Function::GetInput(f) => f.validate(plan),
            Function::GetProperty(f) => f.validate(plan),
            Function::GetAttribute(f) => f.validate(plan),
        }
    }

    pub fn evaluate(&self, plan: &Plan) -> Result<Value> {
        match self {
            Function::GetInput(f) => f.evaluate(plan),
            Function::GetProperty(f) => f.evaluate(plan),
            Function::GetAttribute(f) => f.evaluate(plan),
        }
    }
}

impl GetInput {
    pub fn validate(&self, plan: &Plan) -> Result<()> {
        if plan.input(&self.input_name).is_none() {
            return Err(BlueprintError::UnknownInput {
                path: self.provenance.path.clone(),
                input: self.input_name.clone(),
            });
        }
        Ok(())
    }

    pub fn evaluate(&self, plan: &Plan) -> Result<Value> {
        plan.input(&self.input_name)
            .cloned()
            .ok_or_else(|| BlueprintError::UnknownInput {
                path: self.provenance.path.clone(),
                input: self.input_name.clone(),
            })
    }
}

impl GetProperty {
    /// Validation is a full evaluation with the result discarded.
    pub fn validate(&self, plan: &Plan) -> Result<()> {
        self.evaluate(plan).map(|_| ())
    }

    pub fn evaluate(&self, plan: &Plan) -> Result<Value> {
        self.lookup(plan).map(|(_, value)| value.clone())
    }

    /// Resolve the node reference and check the property exists on it.
    pub fn node_template<'a>(&self, plan: &'a Plan) -> Result<&'a NodeTemplate> {
        self.lookup(plan).map(|(node, _)| node)
    }

    fn lookup<'a>(&self, plan: &'a Plan) -> Result<(&'a NodeTemplate, &'a Value)> {
        let node = self.referenced_node(plan)?;
        let value = node
            .properties
            .get(&self.property_name)
            .ok_or_else(|| BlueprintError::UnknownProperty {
                node: node.name.clone(),
                property: self.property_name.clone(),
                path: self.provenance.path.clone(),
            })?;
        Ok((node, value))
    }

    fn referenced_node<'a>(&self, plan: &'a Plan) -> Result<&'a NodeTemplate> {
        let scope = self.provenance.scope();
        let node = match self.node_name.as_str() {
            SELF => match &self.provenance.context {
                Context::NodeTemplate { node_id } => self.lookup_id(plan, node_id)?,
                _ => {
                    return Err(self.scope_error(format!(
                        "{} can only be used in a context of node template but appears in {}.",
                        SELF, scope
                    )))
                }
            },
            SOURCE | TARGET => match &self.provenance.context {
                Context::Relationship {
                    source_id,
                    target_id,
                } => {
                    let id = if self.node_name == SOURCE {
                        source_id
                    } else {
                        target_id
                    };
                    self.lookup_id(plan, id)?
                }
                _ => {
                    return Err(self.scope_error(format!(
                        "{} can only be used within a relationship but is used in {}",
                        self.node_name, self.provenance.path
                    )))
                }
            },
            reference => plan
                .find_node(reference)
                .ok_or_else(|| BlueprintError::UnknownNode {
                    function: GET_PROPERTY_FUNCTION.to_string(),
                    node: reference.to_string(),
                })?,
        };
        Ok(node)
    }

    fn lookup_id<'a>(&self, plan: &'a Plan, id: &str) -> Result<&'a NodeTemplate> {
        plan.node(id).ok_or_else(|| BlueprintError::UnknownNode {
            function: GET_PROPERTY_FUNCTION.to_string(),
            node: id.to_string(),
        })
    }

    fn scope_error(&self, message: String) -> BlueprintError {
        BlueprintError::IllegalFunctionScope {
            function: GET_PROPERTY_FUNCTION.to_string(),
            path: self.provenance.path.clone(),
            message,
        }
    }
}

impl GetAttribute {
    pub fn validate(&self, plan: &Plan) -> Result<()> {
        if self.provenance.scope() != Scope::Outputs {
            return Err(BlueprintError::IllegalFunctionScope {
                function: GET_ATTRIBUTE_FUNCTION.to_string(),
                path: self.provenance.path.clone(),
                message: format!(
                    "{} function can only be used in outputs but is used in {}.",
                    GET_ATTRIBUTE_FUNCTION, self.provenance.path
                ),
            });
        }
        if self.node_name == SELF {
            return Err(BlueprintError::IllegalFunctionScope {
                function: GET_ATTRIBUTE_FUNCTION.to_string(),
                path: self.provenance.path.clone(),
                message: format!(
                    "{} cannot be used with {} function in {}.",
                    SELF, GET_ATTRIBUTE_FUNCTION, self.provenance.path
                ),
            });
        }
        if plan.find_node(&self.node_name).is_none() {
            return Err(BlueprintError::UnknownNode {
                function: GET_ATTRIBUTE_FUNCTION.to_string(),
                node: self.node_name.clone(),
            });
        }
        Ok(())
    }

    pub fn evaluate(&self, _plan: &Plan) -> Result<Value> {
        Err(BlueprintError::EvaluationUnsupported {
            function: GET_ATTRIBUTE_FUNCTION.to_string(),
        })
    }
}

fn string_arg(function: &str, args: &Value, provenance: &Provenance) -> Result<String> {
    args.as_str().map(str::to_string).ok_or_else(|| {
        BlueprintError::InvalidFunctionArguments {
            function: function.to_string(),
            path: provenance.path.clone(),
            message: format!("expected a string but got {}", kind_of(args)),
        }
    })
}

fn pair_args(function: &str, args: &Value, provenance: &Provenance) -> Result<(String, String)> {
    let invalid = || BlueprintError::InvalidFunctionArguments {
        function: function.to_string(),
        path: provenance.path.clone(),
        message: format!("expected [ node_name, property_name ] but got: {}", args),
    };
    match args.as_array().map(Vec::as_slice) {
        Some([Value::String(node), Value::String(name)]) => Ok((node.clone(), name.clone())),
        _ => Err(invalid()),
    }
}
