//! From blueprint text to a resolved [`Plan`]
//!
//! Phases run in a fixed order and the first violation aborts the parse:
//! imports, merge, type hierarchy, node templates, plugin binding, policy
//! references, refs, then intrinsic functions.

use plinth_core::document::{expect_mapping, sections, ROOT_DOCUMENT};
use plinth_core::error::Result;
use plinth_core::{BlueprintError, Document, Mapping, Plan};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::binding::{parse_interfaces, parse_plugins, PluginBinder};
use crate::config::ParserConfig;
use crate::fetch::{FileFetcher, Fetcher};
use crate::hierarchy::TypeHierarchy;
use crate::imports::{parent_dir, ImportResolver};
use crate::intrinsics::{evaluate_functions, validate_functions};
use crate::merge::merge;
use crate::policies::{PolicyCatalog, RefResolver};
use crate::topology::{build_topology, ApplicationTemplate};
use crate::yaml::parse_document;

/// Resolves blueprints into plans.
///
/// The parser holds no state between calls; one instance can parse any
/// number of blueprints.
pub struct BlueprintParser<F: Fetcher = FileFetcher> {
    fetcher: F,
    config: ParserConfig,
    base_dir: Option<String>,
    input_values: Mapping,
}

impl Default for BlueprintParser<FileFetcher> {
    fn default() -> Self {
        Self::new(FileFetcher)
    }
}

impl<F: Fetcher> BlueprintParser<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            config: ParserConfig::default(),
            base_dir: None,
            input_values: Mapping::new(),
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Directory relative imports and refs of an in-memory blueprint resolve against.
    pub fn with_base_dir(mut self, base_dir: impl Into<String>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Values overriding the declared defaults of inputs.
    pub fn with_input_values(mut self, values: Mapping) -> Self {
        self.input_values = values;
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse blueprint text that has no identifier of its own.
    pub fn parse_str(&self, text: &str) -> Result<Plan> {
        self.parse_document(parse_document(None, text)?)
    }

    /// Fetch and parse the blueprint at `location`.
    pub fn parse_location(&self, location: &str) -> Result<Plan> {
        self.build(self.resolver().resolve_location(location)?)
    }

    pub fn parse_document(&self, root: Document) -> Result<Plan> {
        self.build(self.resolver().resolve(root)?)
    }

    fn resolver(&self) -> ImportResolver<'_, F> {
        let resolver = ImportResolver::new(&self.fetcher);
        match &self.base_dir {
            Some(base) => resolver.with_base_dir(base.clone()),
            None => resolver,
        }
    }

    fn build(&self, mut documents: Vec<Document>) -> Result<Plan> {
        let root = documents
            .pop()
            .ok_or_else(|| BlueprintError::invalid_document(ROOT_DOCUMENT, "no documents to merge"))?;
        let merged = merge(root, documents)?;
        let base_dir = merged
            .id
            .as_deref()
            .and_then(parent_dir)
            .or(self.base_dir.as_deref())
            .map(str::to_string);

        let types = TypeHierarchy::from_document(&merged)?.resolve_all()?;
        let interfaces = parse_interfaces(&merged)?;
        let plugins = parse_plugins(&merged)?;

        let ApplicationTemplate {
            name,
            mut node_templates,
        } = build_topology(&merged, &types)?;
        PluginBinder::new(&interfaces, &plugins, &self.config.agent_plugin)
            .bind_all(&mut node_templates, &types)?;

        let mut catalog = PolicyCatalog::from_document(&merged)?;
        for node in &node_templates {
            catalog.validate(&node.name, &node.policies)?;
        }
        for type_def in types.values() {
            catalog.validate(&type_def.name, &type_def.policies)?;
        }

        let refs = RefResolver::new(&self.fetcher, &self.config, base_dir.as_deref());
        refs.resolve_section("policies.types", &mut catalog.types)?;
        let mut workflows = merged
            .mapping_section(sections::WORKFLOWS)?
            .cloned()
            .unwrap_or_default();
        refs.resolve_section(sections::WORKFLOWS, &mut workflows)?;

        let plan = Plan {
            name,
            inputs: self.inputs(&merged)?,
            node_templates,
            outputs: outputs(&merged)?,
            types,
            interfaces,
            plugins,
            policies: catalog.into_section(),
            workflows,
            node_match: self.config.node_match,
        };
        debug!(plan = %plan.name, "plan assembled");

        validate_functions(&plan)?;
        let plan = evaluate_functions(plan)?;
        info!(plan = %plan.name, nodes = plan.node_templates.len(), "blueprint resolved");
        Ok(plan)
    }

    /// Declared inputs with their defaults, overridden by supplied values.
    fn inputs(&self, document: &Document) -> Result<Mapping> {
        let declared = document.mapping_section(sections::INPUTS)?.cloned().unwrap_or_default();
        for name in self.input_values.keys() {
            if !declared.contains_key(name) {
                warn!(input = %name, "ignoring value for undeclared input");
            }
        }
        Ok(declared
            .into_iter()
            .map(|(name, declaration)| {
                let value = match self.input_values.get(&name) {
                    Some(value) => value.clone(),
                    None => match declaration {
                        Value::Object(mut body) => body.remove("default").unwrap_or(Value::Null),
                        literal => literal,
                    },
                };
                (name, value)
            })
            .collect())
    }
}

/// The `outputs` section; every output must be a mapping with a `value`.
fn outputs(document: &Document) -> Result<Mapping> {
    let Some(section) = document.mapping_section(sections::OUTPUTS)? else {
        return Ok(Mapping::new());
    };
    for (name, output) in section {
        let path = format!("{}.{}", sections::OUTPUTS, name);
        if !expect_mapping(output, document.display_id(), &path)?.contains_key("value") {
            return Err(BlueprintError::invalid_document(
                document.display_id(),
                format!("'{}' has no 'value'", path),
            ));
        }
    }
    Ok(section.clone())
}

/// Parse blueprint text with the filesystem fetcher and default configuration.
pub fn parse_from_str(text: &str) -> Result<Plan> {
    BlueprintParser::default().parse_str(text)
}

/// Parse the blueprint file at `path` with default configuration.
pub fn parse_from_path(path: &str) -> Result<Plan> {
    BlueprintParser::default().parse_location(path)
}
