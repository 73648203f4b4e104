// This is intentionally thin:
// no mutation
// no derivation at request time
// runtime reads only

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::snapshot::Snapshot;
use crate::types::identifiers::{ContentHash, DomainName};
use crate::types::Stage;

/// Abstract size unit for budgets (approximate token count).
pub type TokenBudget = usize;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Unknown domain: {0}")]
    UnknownDomain(DomainName),
    #[error("Budget {budget} too small for domain `{domain}` (summary is {summary_tokens} tokens)")]
    BudgetTooSmall {
        domain: DomainName,
        budget: TokenBudget,
        summary_tokens: usize,
    },
}

/// Content served for one `(domain, stage)` pair. Immutable for the lifetime
/// of the generation it came from; safe to cache by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub domain: DomainName,
    pub stage: Stage,
    pub body: String,
    pub tokens: usize,
    pub hash: ContentHash,
    /// True when the requested stage did not fit the budget and a lower
    /// stage was served instead.
    pub truncated: bool,
}

/// Serve the highest stage at or below `stage` whose precomputed size fits
/// `budget`. Never exceeds the budget; never derives content at request
/// time; never mutates the snapshot.
pub fn fetch(
    snapshot: &Snapshot,
    domain: &DomainName,
    budget: TokenBudget,
    stage: Stage,
) -> Result<Content, FetchError> {
    let index = snapshot
        .indices
        .get(domain)
        .ok_or_else(|| FetchError::UnknownDomain(domain.clone()))?;

    for candidate in stage.at_or_below() {
        let Some(content) = index.stage(candidate) else {
            continue;
        };
        if content.tokens <= budget {
            return Ok(Content {
                domain: domain.clone(),
                stage: candidate,
                body: content.body.clone(),
                tokens: content.tokens,
                hash: content.hash.clone(),
                truncated: candidate != stage,
            });
        }
    }

    let summary_tokens = index
        .stage(Stage::Summary)
        .map(|content| content.tokens)
        .unwrap_or(0);
    Err(FetchError::BudgetTooSmall {
        domain: domain.clone(),
        budget,
        summary_tokens,
    })
}
