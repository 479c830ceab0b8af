//! Compile-time handling of intrinsic functions
//!
//! Functions are found in three places of a plan: node template properties,
//! relationship properties and outputs. Each place fixes the scope the
//! function is checked against.

use plinth_core::error::Result;
use plinth_core::functions::Function;
use plinth_core::{scan_properties, Context, Mapping, Plan, Provenance};
use serde_json::Value;
use tracing::debug;

/// Walk every function-bearing value of `plan` with its scan context.
pub fn scan_plan<F>(plan: &mut Plan, handler: &mut F, replace: bool) -> Result<()>
where
    F: FnMut(&Value, &Provenance) -> Result<Option<Value>>,
{
    for node in &mut plan.node_templates {
        let context = Context::NodeTemplate {
            node_id: node.id.clone(),
        };
        let path = format!("{}.properties", node.name);
        scan_mapping(&mut node.properties, handler, &context, &path, replace)?;

        for (i, relationship) in node.relationships.iter_mut().enumerate() {
            let context = Context::Relationship {
                source_id: node.id.clone(),
                target_id: relationship.target_id.clone(),
            };
            let path = format!("{}.relationships[{}].properties", node.name, i);
            scan_mapping(&mut relationship.properties, handler, &context, &path, replace)?;
        }
    }
    scan_mapping(&mut plan.outputs, handler, &Context::Outputs, "outputs", replace)
}

fn scan_mapping<F>(
    mapping: &mut Mapping,
    handler: &mut F,
    context: &Context,
    path: &str,
    replace: bool,
) -> Result<()>
where
    F: FnMut(&Value, &Provenance) -> Result<Option<Value>>,
{
    let mut value = Value::Object(std::mem::take(mapping));
    let outcome = scan_properties(&mut value, handler, context, path, replace);
    if let Value::Object(scanned) = value {
        *mapping = scanned;
    }
    outcome
}

/// Check every function of `plan` against its scope and the plan contents.
///
/// Returns the number of functions found.
pub fn validate_functions(plan: &Plan) -> Result<usize> {
    let mut scratch = plan.clone();
    let mut found = 0;
    scan_plan(
        &mut scratch,
        &mut |value: &Value, provenance: &Provenance| -> Result<Option<Value>> {
            if let Some(function) = Function::parse(value, provenance)? {
                function.validate(plan)?;
                found += 1;
            }
            Ok(None)
        },
        false,
    )?;
    debug!(functions = found, "intrinsic functions validated");
    Ok(found)
}

/// Replace `get_input` everywhere, then `get_property` everywhere.
///
/// `get_attribute` is left in place for runtime evaluation.
pub fn evaluate_functions(plan: Plan) -> Result<Plan> {
    let plan = evaluate_pass(plan, |f| matches!(f, Function::GetInput(_)))?;
    evaluate_pass(plan, |f| matches!(f, Function::GetProperty(_)))
}

fn evaluate_pass(plan: Plan, wanted: fn(&Function) -> bool) -> Result<Plan> {
    let mut next = plan.clone();
    let mut replaced = 0;
    scan_plan(
        &mut next,
        &mut |value: &Value, provenance: &Provenance| -> Result<Option<Value>> {
            match Function::parse(value, provenance)? {
                Some(function) if wanted(&function) => {
                    replaced += 1;
                    function.evaluate(&plan).map(Some)
                }
                _ => Ok(None),
            }
        },
        true,
    )?;
    debug!(replaced, "compile-time evaluation pass");
    Ok(next)
}
