use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::identifiers::DomainName;

/// Rule severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Disclosure stage, strictly ordered: each stage is conceptually a superset
/// of the previous one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Summary,
    Detail,
    Full,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Summary, Stage::Detail, Stage::Full];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Summary => "summary",
            Stage::Detail => "detail",
            Stage::Full => "full",
        }
    }

    /// Stages at or below `self`, most detailed first.
    pub fn at_or_below(self) -> impl Iterator<Item = Stage> {
        [Stage::Full, Stage::Detail, Stage::Summary]
            .into_iter()
            .filter(move |stage| *stage <= self)
    }
}

/// Gate directive attached to trigger rules. `BlockUntilResearch` dominates
/// `None` when multiple rules match.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Gate {
    #[default]
    None,
    BlockUntilResearch,
}

/// One incoming request. Constructed per call, stateless, discarded after
/// processing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub text: String,
    /// Path the caller is about to touch, if any. An empty hint is treated
    /// the same as no hint: pure questions are never gated.
    pub file_path_hint: Option<String>,
    /// Deterministic escape hatch: bypasses pattern matching entirely when
    /// it names a known domain.
    pub explicit_domain: Option<DomainName>,
}

impl ActivationRequest {
    pub fn from_text(text: impl Into<String>) -> Self {
        ActivationRequest {
            text: text.into(),
            file_path_hint: None,
            explicit_domain: None,
        }
    }
}

/// Outcome of routing one request. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationResult {
    /// Matched domains, deduplicated, in deterministic priority order.
    pub matched_domains: Vec<DomainName>,
    pub gate: Gate,
    pub stages_available: BTreeMap<DomainName, Vec<Stage>>,
}

impl ActivationResult {
    pub fn miss() -> Self {
        ActivationResult {
            matched_domains: Vec::new(),
            gate: Gate::None,
            stages_available: BTreeMap::new(),
        }
    }

    /// Zero matched domains: the documented silent miss, not an error.
    pub fn is_miss(&self) -> bool {
        self.matched_domains.is_empty()
    }
}
