use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::route::Router;
use crate::serve::{self, Content, FetchError, TokenBudget};
use crate::snapshot::Snapshot;
use crate::types::identifiers::DomainName;
use crate::types::{ActivationRequest, Gate, Stage};

/// One ranked snippet of external corpus evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub source: String,
    pub snippet: String,
}

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("search backend unavailable: {0}")]
    Unavailable(String),
}

/// Black-box semantic search over the document corpus. Queried with a
/// bounded timeout during Gathering; failures never fail the request.
#[async_trait]
pub trait SearchCollaborator: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Evidence>, CollaboratorError>;
}

#[derive(Debug, Error)]
pub enum OrchestrateError {
    /// Missing domains and undersized default budgets are configuration
    /// errors: the orchestrator's budgets ship with the compiled content.
    #[error("Content fetch failed: {0}")]
    Content(#[from] FetchError),
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub summary_budget: TokenBudget,
    pub detail_budget: TokenBudget,
    pub full_budget: TokenBudget,
    pub collaborator_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            summary_budget: 256,
            detail_budget: 2048,
            full_budget: 8192,
            collaborator_timeout: Duration::from_secs(3),
        }
    }
}

/// Per-call options. A blocked request is released by re-invoking with
/// `acknowledged = true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandleOptions {
    pub acknowledged: bool,
    /// Also fetch the full stage when escalating.
    pub deepen: bool,
    pub deadline: Option<Instant>,
}

/// Terminal state of one handled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    /// No domain matched; the caller proceeds without domain content.
    Unhandled,
    /// Summaries gathered, no gate in effect.
    Gathering,
    /// Blocked pending acknowledgment; implementation is not permitted.
    Blocked,
    /// Acknowledged block escalated to detail (and optionally full) content.
    Escalating,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub state: RequestState,
    pub matched_domains: Vec<DomainName>,
    pub gate: Gate,
    /// Explicit implementation-permitted signal. False only while blocked,
    /// so inaction is never confusable with permission.
    pub permit: bool,
    pub content: Vec<Content>,
    pub evidence: Vec<Evidence>,
    pub timed_out: bool,
    pub truncated: bool,
}

/// Sequences Router → Content Server → caller and enforces the gate.
///
/// Holds no per-request state; requests are embarrassingly parallel over one
/// loaded snapshot generation. Content is assembled in router order, never
/// completion order.
pub struct Orchestrator {
    router: Router,
    config: OrchestratorConfig,
    collaborator: Option<Arc<dyn SearchCollaborator>>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            router: Router::default(),
            config,
            collaborator: None,
        }
    }

    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    pub fn with_collaborator(mut self, collaborator: Arc<dyn SearchCollaborator>) -> Self {
        self.collaborator = Some(collaborator);
        self
    }

    pub async fn handle(
        &self,
        snapshot: &Snapshot,
        request: &ActivationRequest,
        opts: HandleOptions,
    ) -> Result<OrchestrationResult, OrchestrateError> {
        let routed = self.router.route(snapshot, request);

        if routed.is_miss() {
            debug!("no matched domains, request unhandled");
            return Ok(OrchestrationResult {
                state: RequestState::Unhandled,
                matched_domains: Vec::new(),
                gate: Gate::None,
                permit: true,
                content: Vec::new(),
                evidence: Vec::new(),
                timed_out: false,
                truncated: false,
            });
        }

        // Gathering: summaries in router order, all-or-nothing per domain
        // under the caller's deadline.
        let mut content = Vec::new();
        let mut truncated = false;
        let mut timed_out = false;
        for domain in &routed.matched_domains {
            if deadline_expired(opts.deadline) {
                timed_out = true;
                break;
            }
            let fetched = serve::fetch(snapshot, domain, self.config.summary_budget, Stage::Summary)?;
            truncated |= fetched.truncated;
            content.push(fetched);
        }

        // The collaborator is consulted only when the text itself asks for
        // authoritative backing, and never once the deadline has passed.
        // Its outcome never alters routing results.
        let evidence = if !timed_out
            && !deadline_expired(opts.deadline)
            && research_worthy(&request.text)
        {
            self.query_collaborator(&request.text, opts.deadline).await
        } else {
            Vec::new()
        };

        if routed.gate == Gate::BlockUntilResearch && !opts.acknowledged {
            return Ok(OrchestrationResult {
                state: RequestState::Blocked,
                matched_domains: routed.matched_domains,
                gate: routed.gate,
                permit: false,
                content,
                evidence,
                timed_out,
                truncated,
            });
        }

        let state = if routed.gate == Gate::BlockUntilResearch {
            RequestState::Escalating
        } else {
            RequestState::Gathering
        };

        if state == RequestState::Escalating && !timed_out {
            for domain in &routed.matched_domains {
                if deadline_expired(opts.deadline) {
                    timed_out = true;
                    break;
                }
                // Fetch the whole domain batch before appending, so a
                // deadline never splits one domain's content.
                let detail =
                    serve::fetch(snapshot, domain, self.config.detail_budget, Stage::Detail)?;
                let full = if opts.deepen {
                    Some(serve::fetch(snapshot, domain, self.config.full_budget, Stage::Full)?)
                } else {
                    None
                };
                truncated |= detail.truncated;
                content.push(detail);
                if let Some(full) = full {
                    truncated |= full.truncated;
                    content.push(full);
                }
            }
        }

        Ok(OrchestrationResult {
            state,
            matched_domains: routed.matched_domains,
            gate: routed.gate,
            permit: true,
            content,
            evidence,
            timed_out,
            truncated,
        })
    }

    /// Bounded-timeout collaborator query: at most one retry, then degrade
    /// to "no evidence available".
    async fn query_collaborator(&self, query: &str, deadline: Option<Instant>) -> Vec<Evidence> {
        let Some(collaborator) = &self.collaborator else {
            return Vec::new();
        };

        for attempt in 0..2u8 {
            if deadline_expired(deadline) {
                break;
            }
            let mut limit = self.config.collaborator_timeout;
            if let Some(deadline) = deadline {
                limit = limit.min(deadline.saturating_duration_since(Instant::now()));
            }
            match timeout(limit, collaborator.search(query)).await {
                Ok(Ok(evidence)) => return evidence,
                Ok(Err(err)) => {
                    warn!(attempt, error = %err, "search collaborator failed");
                }
                Err(_) => {
                    warn!(attempt, "search collaborator timed out");
                }
            }
        }

        warn!("proceeding without collaborator evidence");
        Vec::new()
    }
}

fn deadline_expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

const RESEARCH_HINTS: &[&str] = &[
    "according to",
    "asvs",
    "citation",
    "cite",
    "cwe",
    "evidence",
    "justification",
    "justify",
    "owasp",
    "reference",
    "research",
    "standard",
    "why",
];

/// Independent of the trigger registry: any mention of needing authoritative
/// justification makes the request research-worthy.
fn research_worthy(text: &str) -> bool {
    let lowered = text.to_lowercase();
    RESEARCH_HINTS.iter().any(|hint| lowered.contains(hint))
}
