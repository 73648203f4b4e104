use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::identifiers::DomainName;
use crate::types::Gate;

/// One trigger rule as authored in config: an ordered list of these is the
/// registry's on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRuleConfig {
    pub pattern: String,
    pub domains: Vec<DomainName>,
    #[serde(default)]
    pub gate: Gate,
    #[serde(default)]
    pub priority: i32,
}

/// A compiled trigger rule. Patterns match case-insensitively against the
/// full request text.
#[derive(Debug, Clone)]
pub struct TriggerRule {
    pub pattern: Regex,
    pub domains: Vec<DomainName>,
    pub gate: Gate,
    pub priority: i32,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid trigger pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("Trigger pattern `{pattern}` names no domains")]
    EmptyDomains { pattern: String },
    #[error("Registry parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The ordered set of trigger rules. Immutable once constructed; the
/// evaluation order (priority descending, declaration order ascending) is
/// precomputed here so routing stays O(rules) per request.
#[derive(Debug, Clone, Default)]
pub struct TriggerRegistry {
    rules: Vec<TriggerRule>,
    evaluation_order: Vec<usize>,
}

impl TriggerRegistry {
    pub fn from_configs(configs: Vec<TriggerRuleConfig>) -> Result<Self, RegistryError> {
        let mut rules = Vec::with_capacity(configs.len());
        for config in configs {
            if config.domains.is_empty() {
                return Err(RegistryError::EmptyDomains {
                    pattern: config.pattern,
                });
            }
            let pattern = RegexBuilder::new(&config.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| RegistryError::InvalidPattern {
                    pattern: config.pattern.clone(),
                    source,
                })?;
            rules.push(TriggerRule {
                pattern,
                domains: config.domains,
                gate: config.gate,
                priority: config.priority,
            });
        }

        // Stable sort keeps declaration order within equal priorities.
        let mut evaluation_order: Vec<usize> = (0..rules.len()).collect();
        evaluation_order.sort_by_key(|&i| std::cmp::Reverse(rules[i].priority));

        Ok(Self {
            rules,
            evaluation_order,
        })
    }

    /// Parse a registry from its JSON config form: an ordered list of
    /// `{pattern, domains, gate, priority}` objects.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let configs: Vec<TriggerRuleConfig> = serde_json::from_str(json)?;
        Self::from_configs(configs)
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    /// Rules in evaluation order: priority descending, then declaration
    /// order ascending.
    pub fn evaluation_order(&self) -> impl Iterator<Item = &TriggerRule> {
        self.evaluation_order.iter().map(|&i| &self.rules[i])
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
