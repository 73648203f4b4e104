use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::compile::index::{
    render_detail, render_full, render_summary, CompiledIndex, Domain, StageContent,
};
use crate::compile::tokens::{ApproxTokenCounter, TokenCounter};
use crate::rule::record::{standard_ref_is_valid, weakness_ref_is_valid};
use crate::rule::RuleRecord;
use crate::types::identifiers::{ContentHash, DomainName, RuleId};
use crate::types::Stage;

// Key point:
// Serializable
// Comparable
// Explicit defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileConfig {
    pub version: String,
    pub hash_algorithm: String,
    /// Upper bound on the rendered summary stage, in approximate tokens.
    pub summary_token_budget: usize,
    /// Display priority per domain; unlisted domains default to 0.
    #[serde(default)]
    pub domain_priorities: BTreeMap<DomainName, i32>,
}

impl CompileConfig {
    pub fn v0() -> Self {
        Self {
            version: "1".into(),
            hash_algorithm: "sha256".into(),
            summary_token_budget: 120,
            domain_priorities: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Duplicate rule ID: {0}")]
    DuplicateRuleId(RuleId),
    #[error("Rule `{id}`: required field `{field}` is empty")]
    EmptyField { id: RuleId, field: &'static str },
    #[error("Rule `{id}`: malformed standard reference `{value}`")]
    MalformedStandardRef { id: RuleId, value: String },
    #[error("Rule `{id}`: malformed weakness reference `{value}`")]
    MalformedWeaknessRef { id: RuleId, value: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One complete compiled generation: every domain index plus the version
/// hash identifying the generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledGeneration {
    pub generation: String,
    pub indices: BTreeMap<DomainName, CompiledIndex>,
}

/// Compiles rule records into per-domain indices.
///
/// Pure over its inputs: identical records (in any order) produce
/// byte-for-byte identical output, so content hashes are safe cache keys.
/// Validation is all-or-nothing — one bad record fails the whole batch and
/// no partial index is emitted.
pub struct Compiler<T = ApproxTokenCounter> {
    config: CompileConfig,
    tokens: T,
}

impl Compiler<ApproxTokenCounter> {
    pub fn new(config: CompileConfig) -> Self {
        Self {
            config,
            tokens: ApproxTokenCounter,
        }
    }
}

impl<T> Compiler<T>
where
    T: TokenCounter,
{
    pub fn with_token_counter(config: CompileConfig, tokens: T) -> Self {
        Self { config, tokens }
    }

    pub fn compile(&self, records: Vec<RuleRecord>) -> Result<CompiledGeneration, CompileError> {
        // 1. Sort by ID so grouping and hashing are order-independent.
        let mut sorted = records;
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        // 1b. Duplicate IDs are adjacent after the sort.
        for pair in sorted.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(CompileError::DuplicateRuleId(pair[0].id.clone()));
            }
        }

        // 2. Validate every record before emitting anything.
        for rule in &sorted {
            validate(rule)?;
        }

        // 3. Generation version: hash of the config plus every
        // "id:content-hash" line, in sorted ID order.
        let mut version_hasher = Sha256::new();
        let config_json = serde_json::to_vec(&self.config)?;
        version_hasher.update(&config_json);
        for rule in &sorted {
            let rule_hash = ContentHash::from_content(&serde_json::to_vec(rule)?);
            let line = format!("{}:{}", rule.id, rule_hash);
            version_hasher.update(line.as_bytes());
        }
        let generation = format!("sha256:{}", hex::encode(version_hasher.finalize()));

        // 4. Group by domain, preserving ID order within each group.
        let mut grouped: BTreeMap<DomainName, Vec<RuleRecord>> = BTreeMap::new();
        for rule in sorted {
            grouped.entry(rule.domain.clone()).or_default().push(rule);
        }

        // 5. Render and hash every stage per domain.
        let mut indices = BTreeMap::new();
        for (name, rules) in grouped {
            let display_priority = self
                .config
                .domain_priorities
                .get(&name)
                .copied()
                .unwrap_or(0);

            let summary = render_summary(
                &name,
                &rules,
                &self.tokens,
                self.config.summary_token_budget,
            );
            let detail = render_detail(&name, &rules);
            let full = render_full(&name, &rules);

            let mut stages = BTreeMap::new();
            for (stage, body) in [
                (Stage::Summary, summary.clone()),
                (Stage::Detail, detail),
                (Stage::Full, full),
            ] {
                let tokens = self.tokens.count_tokens(&body);
                let hash = ContentHash::from_content(body.as_bytes());
                stages.insert(stage, StageContent { body, tokens, hash });
            }

            let domain = Domain {
                name: name.clone(),
                display_priority,
                rule_ids: rules.iter().map(|r| r.id.clone()).collect(),
            };
            let rule_count = rules.len();

            indices.insert(
                name,
                CompiledIndex {
                    domain,
                    summary,
                    rule_count,
                    rules,
                    stages,
                },
            );
        }

        Ok(CompiledGeneration {
            generation,
            indices,
        })
    }
}

fn validate(rule: &RuleRecord) -> Result<(), CompileError> {
    let empty = |field| CompileError::EmptyField {
        id: rule.id.clone(),
        field,
    };
    if rule.id.is_empty() {
        return Err(empty("id"));
    }
    if rule.domain.is_empty() {
        return Err(empty("domain"));
    }
    if rule.title.is_empty() {
        return Err(empty("title"));
    }
    if rule.body.is_empty() {
        return Err(empty("body"));
    }
    for value in &rule.standard_refs {
        if !standard_ref_is_valid(value) {
            return Err(CompileError::MalformedStandardRef {
                id: rule.id.clone(),
                value: value.clone(),
            });
        }
    }
    for value in &rule.weakness_refs {
        if !weakness_ref_is_valid(value) {
            return Err(CompileError::MalformedWeaknessRef {
                id: rule.id.clone(),
                value: value.clone(),
            });
        }
    }
    Ok(())
}
