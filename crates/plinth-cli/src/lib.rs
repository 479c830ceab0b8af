//! Library interface for plinth CLI components

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use plinth_core::{BlueprintError, Mapping, Plan};
use plinth_parser::{BlueprintParser, Fetcher, ParserConfig};
use plinth_runtime::{evaluate_plan_outputs, NodeInstance, RuntimeError};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

/// Rendering of plans and outputs on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

pub fn render<T: Serialize>(value: &T, format: Format) -> Result<String> {
    match format {
        Format::Json => serde_json::to_string_pretty(value).context("Failed to render JSON"),
        Format::Yaml => serde_yaml::to_string(value).context("Failed to render YAML"),
    }
}

pub fn load_config(path: Option<&Path>) -> Result<ParserConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading parser configuration");
            ParserConfig::from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => Ok(ParserConfig::default()),
    }
}

/// Input values from an optional YAML/JSON file, then `name=value` pairs.
///
/// Assigned values are read as YAML scalars, so `--set replicas=3` yields a
/// number and `--set region=eu` a string.
pub fn load_input_values(file: Option<&Path>, assignments: &[String]) -> Result<Mapping> {
    let mut values = match file {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read inputs from {}", path.display()))?;
            match serde_yaml::from_str::<Value>(&text)
                .with_context(|| format!("Failed to parse inputs in {}", path.display()))?
            {
                Value::Object(values) => values,
                Value::Null => Mapping::new(),
                _ => bail!("Inputs file {} must contain a mapping", path.display()),
            }
        }
        None => Mapping::new(),
    };

    for assignment in assignments {
        let Some((name, raw)) = assignment.split_once('=') else {
            bail!("Invalid input assignment '{}', expected NAME=VALUE", assignment);
        };
        let value = serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        values.insert(name.trim().to_string(), value);
    }
    Ok(values)
}

fn fetcher() -> Box<dyn Fetcher> {
    #[cfg(feature = "remote")]
    {
        Box::new(plinth_parser::HttpFetcher::new())
    }
    #[cfg(not(feature = "remote"))]
    {
        Box::new(plinth_parser::FileFetcher)
    }
}

/// Resolve the blueprint at `location` into a plan.
pub fn build_plan(location: &str, config: ParserConfig, inputs: Mapping) -> Result<Plan> {
    info!("Resolving blueprint {}", location);
    let plan = BlueprintParser::new(fetcher())
        .with_config(config)
        .with_input_values(inputs)
        .parse_location(location)
        .with_context(|| format!("Failed to resolve blueprint {}", location))?;
    info!(
        "Resolved '{}': {} node templates, {} types",
        plan.name,
        plan.node_templates.len(),
        plan.types.len()
    );
    Ok(plan)
}

/// One-line summary printed by `plinth validate`.
pub fn summary(plan: &Plan) -> String {
    format!(
        "Blueprint '{}' is valid: {} node templates, {} types, {} plugins, {} outputs",
        plan.name,
        plan.node_templates.len(),
        plan.types.len(),
        plan.plugins.len(),
        plan.outputs.len()
    )
}

/// Node instances from a YAML or JSON sequence.
pub fn load_instances(path: &Path) -> Result<Vec<NodeInstance>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read node instances from {}", path.display()))?;
    serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse node instances in {}", path.display()))
}

/// Evaluate the plan's outputs against the instances stored at `instances`.
///
/// The file is only read when an output uses `get_attribute`.
pub fn evaluate_outputs(plan: &Plan, instances: Option<&Path>) -> Result<Mapping> {
    let provider = || -> Result<Vec<NodeInstance>> {
        match instances {
            Some(path) => load_instances(path),
            None => bail!("outputs reference node attributes; pass --instances"),
        }
    };
    evaluate_plan_outputs(plan, &provider).context("Failed to evaluate outputs")
}

/// Numeric code of the blueprint violation behind `error`, if any.
pub fn error_code(error: &anyhow::Error) -> Option<u16> {
    error.chain().find_map(|cause| {
        let violation = match cause.downcast_ref::<RuntimeError>() {
            Some(RuntimeError::Blueprint(inner)) => Some(inner),
            _ => cause.downcast_ref::<BlueprintError>(),
        };
        violation.map(|e| e.code().code())
    })
}
