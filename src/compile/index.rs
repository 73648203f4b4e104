use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::compile::tokens::TokenCounter;
use crate::rule::RuleRecord;
use crate::types::identifiers::{ContentHash, DomainName, RuleId};
use crate::types::Stage;

/// A named grouping of rules, derived at compile time. Immutable after
/// compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: DomainName,
    pub display_priority: i32,
    pub rule_ids: Vec<RuleId>,
}

/// One precomputed disclosure stage: body, declared approximate size, and a
/// content hash callers may cache by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageContent {
    pub body: String,
    pub tokens: usize,
    pub hash: ContentHash,
}

/// Per-domain compiled artifact. Read-only to every component except the
/// compiler that built it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledIndex {
    pub domain: Domain,
    pub summary: String,
    pub rule_count: usize,
    pub rules: Vec<RuleRecord>,
    pub stages: BTreeMap<Stage, StageContent>,
}

impl CompiledIndex {
    pub fn stage(&self, stage: Stage) -> Option<&StageContent> {
        self.stages.get(&stage)
    }

    /// Stage names in ascending disclosure order.
    pub fn stages_available(&self) -> Vec<Stage> {
        self.stages.keys().copied().collect()
    }
}

fn heading(domain: &DomainName, rules: &[RuleRecord]) -> String {
    format!("# {}\n{} rules.\n", domain, rules.len())
}

/// Summary stage: severity-tagged titles under the domain heading, clipped
/// so the rendered body stays within `budget` tokens. The heading itself is
/// never clipped.
pub(crate) fn render_summary<T: TokenCounter>(
    domain: &DomainName,
    rules: &[RuleRecord],
    counter: &T,
    budget: usize,
) -> String {
    let mut body = heading(domain, rules);
    for rule in rules {
        let line = format!("- [{}] {}\n", rule.severity.as_str(), rule.title);
        if counter.count_tokens(&body) + counter.count_tokens(&line) > budget {
            break;
        }
        body.push_str(&line);
    }
    body
}

/// Detail stage: per-rule header, references, and the first body line.
pub(crate) fn render_detail(domain: &DomainName, rules: &[RuleRecord]) -> String {
    let mut body = heading(domain, rules);
    for rule in rules {
        push_rule_header(&mut body, rule);
        let excerpt = rule.body.lines().next().unwrap_or("");
        if !excerpt.is_empty() {
            body.push_str(excerpt);
            body.push('\n');
        }
    }
    body
}

/// Full stage: the complete rule set, bodies included.
pub(crate) fn render_full(domain: &DomainName, rules: &[RuleRecord]) -> String {
    let mut body = heading(domain, rules);
    for rule in rules {
        push_rule_header(&mut body, rule);
        if !rule.body.is_empty() {
            body.push_str(&rule.body);
            if !rule.body.ends_with('\n') {
                body.push('\n');
            }
        }
    }
    body
}

fn push_rule_header(body: &mut String, rule: &RuleRecord) {
    let _ = write!(
        body,
        "\n## {} [{}] ({})\n",
        rule.title,
        rule.severity.as_str(),
        rule.id
    );
    let refs: Vec<&str> = rule
        .standard_refs
        .iter()
        .map(String::as_str)
        .chain(rule.weakness_refs.iter().map(String::as_str))
        .collect();
    if !refs.is_empty() {
        let _ = writeln!(body, "refs: {}", refs.join("; "));
    }
}
