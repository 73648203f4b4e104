use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::debug;

use crate::snapshot::Snapshot;
use crate::trigger::TriggerRule;
use crate::types::identifiers::DomainName;
use crate::types::{ActivationRequest, ActivationResult, Gate};

/// File extensions treated as evidence that the caller is about to mutate an
/// implementation surface. The block gate only fires when the request text
/// matches a blocking trigger AND the path hint lands in this set.
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    extensions: BTreeSet<String>,
}

impl SurfaceConfig {
    pub fn new(extensions: impl IntoIterator<Item = String>) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
        }
    }

    pub fn matches(&self, path_hint: &str) -> bool {
        Path::new(path_hint)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        const SOURCE_EXTENSIONS: &[&str] = &[
            "c", "cc", "cpp", "cs", "go", "h", "hpp", "java", "js", "jsx", "kt", "php", "py",
            "rb", "rs", "scala", "sh", "sql", "swift", "ts", "tsx",
        ];
        Self::new(SOURCE_EXTENSIONS.iter().map(|s| s.to_string()))
    }
}

/// Deterministic request router.
///
/// Consults no mutable state: routing the same request against the same
/// snapshot generation always yields the same result, regardless of call
/// order or concurrency.
#[derive(Debug, Clone, Default)]
pub struct Router {
    surfaces: SurfaceConfig,
}

impl Router {
    pub fn new(surfaces: SurfaceConfig) -> Self {
        Self { surfaces }
    }

    pub fn route(&self, snapshot: &Snapshot, request: &ActivationRequest) -> ActivationResult {
        // Explicit override: the deterministic escape hatch. Bypasses
        // pattern evaluation and gating entirely for known domains; unknown
        // names fall through to matching.
        if let Some(domain) = &request.explicit_domain {
            if snapshot.indices.contains_key(domain) {
                debug!(domain = %domain, "explicit domain override");
                return self.result_for(snapshot, vec![domain.clone()], Gate::None);
            }
            debug!(domain = %domain, "explicit domain unknown, falling back to matching");
        }

        let matched: Vec<&TriggerRule> = snapshot
            .registry
            .evaluation_order()
            .filter(|rule| rule.pattern.is_match(&request.text))
            .collect();

        if matched.is_empty() {
            // Silent miss: valid output, not an error.
            return ActivationResult::miss();
        }

        // Union of domain sets. Each domain keeps the highest priority among
        // the rules naming it, then one global sort orders the union by
        // (rule priority desc, display priority asc, name asc). The keyed
        // map deduplicates before sorting.
        let mut best_priority: BTreeMap<DomainName, i32> = BTreeMap::new();
        for rule in &matched {
            for domain in &rule.domains {
                best_priority
                    .entry(domain.clone())
                    .and_modify(|p| *p = (*p).max(rule.priority))
                    .or_insert(rule.priority);
            }
        }
        let mut ranked: Vec<(DomainName, i32)> = best_priority.into_iter().collect();
        ranked.sort_by_key(|(domain, priority)| {
            let display = snapshot
                .indices
                .get(domain)
                .map(|index| index.domain.display_priority)
                .unwrap_or(0);
            (std::cmp::Reverse(*priority), display, domain.clone())
        });
        let domains: Vec<DomainName> = ranked.into_iter().map(|(domain, _)| domain).collect();

        // The gate is the strongest directive among matches, but only with
        // evidence that an implementation surface is about to change.
        let strongest = matched
            .iter()
            .map(|rule| rule.gate)
            .max()
            .unwrap_or(Gate::None);
        let surface_hint = request
            .file_path_hint
            .as_deref()
            .is_some_and(|hint| !hint.is_empty() && self.surfaces.matches(hint));
        let gate = if strongest == Gate::BlockUntilResearch && surface_hint {
            Gate::BlockUntilResearch
        } else {
            Gate::None
        };

        debug!(
            matched = domains.len(),
            gate = ?gate,
            "routed request"
        );
        self.result_for(snapshot, domains, gate)
    }

    fn result_for(
        &self,
        snapshot: &Snapshot,
        domains: Vec<DomainName>,
        gate: Gate,
    ) -> ActivationResult {
        let stages_available: BTreeMap<_, _> = domains
            .iter()
            .filter_map(|d| {
                snapshot
                    .indices
                    .get(d)
                    .map(|index| (d.clone(), index.stages_available()))
            })
            .collect();
        ActivationResult {
            matched_domains: domains,
            gate,
            stages_available,
        }
    }
}
