//! Policy and rule references, and `ref:` content resolution
//!
//! Types and node templates attach policies as
//! `policy_name: {rules: [{type: rule_name, properties: ...}]}`. Both names
//! must be declared under the top-level `policies` section.

use plinth_core::document::{kind_of, mapping_field, sections};
use plinth_core::error::Result;
use plinth_core::{BlueprintError, Document, Mapping};
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::ParserConfig;
use crate::fetch::Fetcher;
use crate::imports::canonicalize;

/// Field of a `policies.types` or `workflows` entry naming external content.
pub const REF: &str = "ref";
/// Field the fetched text of a `ref` is stored under.
pub const CONTENT: &str = "content";

/// Declared policy types and rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyCatalog {
    pub types: Mapping,
    pub rules: Mapping,
}

impl PolicyCatalog {
    pub fn from_document(document: &Document) -> Result<Self> {
        let Some(section) = document.mapping_section(sections::POLICIES)? else {
            return Ok(Self::default());
        };
        let id = document.display_id();
        Ok(Self {
            types: mapping_field(section, sections::POLICY_TYPES, id, sections::POLICIES)?,
            rules: mapping_field(section, sections::POLICY_RULES, id, sections::POLICIES)?,
        })
    }

    /// Check every policy and rule `owner` refers to.
    pub fn validate(&self, owner: &str, policies: &Mapping) -> Result<()> {
        for (policy, body) in policies {
            if !self.types.contains_key(policy) {
                return Err(BlueprintError::UndefinedPolicy {
                    owner: owner.to_string(),
                    policy: policy.clone(),
                });
            }
            for rule in rule_types(owner, policy, body)? {
                if !self.rules.contains_key(rule) {
                    return Err(BlueprintError::UndefinedRule {
                        owner: owner.to_string(),
                        policy: policy.clone(),
                        rule: rule.to_string(),
                    });
                }
            }
            trace!(owner, policy = %policy, "policy references checked");
        }
        Ok(())
    }

    /// Reassemble the `policies` section for the plan.
    pub fn into_section(self) -> Mapping {
        let mut section = Mapping::new();
        if !self.types.is_empty() {
            section.insert(sections::POLICY_TYPES.to_string(), Value::Object(self.types));
        }
        if !self.rules.is_empty() {
            section.insert(sections::POLICY_RULES.to_string(), Value::Object(self.rules));
        }
        section
    }
}

/// Rule names listed by one attached policy.
fn rule_types<'v>(owner: &str, policy: &str, body: &'v Value) -> Result<Vec<&'v str>> {
    let rules = match body.get("rules") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(rules)) => rules,
        Some(other) => {
            return Err(BlueprintError::invalid_document(
                owner,
                format!("'policies.{}.rules' must be a sequence, found {}", policy, kind_of(other)),
            ))
        }
    };
    rules
        .iter()
        .enumerate()
        .map(|(i, rule)| {
            rule.get("type").and_then(Value::as_str).ok_or_else(|| {
                BlueprintError::invalid_document(
                    owner,
                    format!("'policies.{}.rules[{}]' must name its rule with 'type'", policy, i),
                )
            })
        })
        .collect()
}

/// Replaces `ref:` entries with the text they point at.
pub struct RefResolver<'a, F: Fetcher + ?Sized> {
    fetcher: &'a F,
    config: &'a ParserConfig,
    base_dir: Option<&'a str>,
}

impl<'a, F: Fetcher + ?Sized> RefResolver<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a ParserConfig, base_dir: Option<&'a str>) -> Self {
        Self {
            fetcher,
            config,
            base_dir,
        }
    }

    /// Resolve the refs of every entry in `entries`, a section named `section`.
    pub fn resolve_section(&self, section: &str, entries: &mut Mapping) -> Result<()> {
        let mut resolved = 0;
        for (name, entry) in entries.iter_mut() {
            let Some(body) = entry.as_object_mut() else {
                continue;
            };
            let Some(reference) = body.get(REF).and_then(Value::as_str).map(str::to_string) else {
                continue;
            };
            let location = canonicalize(self.config.resolve_ref(&reference), self.base_dir);
            trace!(entry = %name, location = %location, "resolving ref");
            let content = self
                .fetcher
                .fetch(&location)
                .map_err(|e| BlueprintError::UndefinedRef {
                    owner: format!("{}.{}", section, name),
                    reference: reference.clone(),
                    reason: e.to_string(),
                })?;
            body.insert(CONTENT.to_string(), Value::String(content));
            resolved += 1;
        }
        if resolved > 0 {
            debug!(section, resolved, "refs resolved");
        }
        Ok(())
    }
}
