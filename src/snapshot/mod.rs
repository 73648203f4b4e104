use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::compile::{CompileError, CompiledGeneration, CompiledIndex, Compiler, TokenCounter};
use crate::rule::RuleRecord;
use crate::trigger::TriggerRegistry;
use crate::types::identifiers::DomainName;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Compilation failed: {0}")]
    Compile(#[from] CompileError),
    #[error("Trigger pattern `{pattern}` references unknown domain `{domain}`")]
    UnknownTriggerDomain { pattern: String, domain: DomainName },
}

/// One immutable, atomically-published generation of compiled state: every
/// domain index plus the trigger registry validated against them.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Version hash identifying this generation; callers may cache fetched
    /// content by `(generation, domain, stage)`.
    pub generation: String,
    pub built_at: DateTime<Utc>, // informational only
    pub indices: BTreeMap<DomainName, CompiledIndex>,
    pub registry: TriggerRegistry,
}

impl Snapshot {
    /// Assemble a snapshot from compiler output and a registry, verifying
    /// every trigger domain exists in the compiled indices.
    pub fn assemble(
        compiled: CompiledGeneration,
        registry: TriggerRegistry,
    ) -> Result<Self, PublishError> {
        for rule in registry.rules() {
            for domain in &rule.domains {
                if !compiled.indices.contains_key(domain) {
                    return Err(PublishError::UnknownTriggerDomain {
                        pattern: rule.pattern.as_str().to_string(),
                        domain: domain.clone(),
                    });
                }
            }
        }
        Ok(Snapshot {
            generation: compiled.generation,
            built_at: Utc::now(),
            indices: compiled.indices,
            registry,
        })
    }

    /// A generation with no rules and no triggers: every route is a miss.
    pub fn empty() -> Self {
        Snapshot {
            generation: String::new(),
            built_at: Utc::now(),
            indices: BTreeMap::new(),
            registry: TriggerRegistry::default(),
        }
    }
}

/// Process-wide holder of the current generation.
///
/// Readers call `load` and keep the returned `Arc` for the whole request, so
/// they always see one fully consistent generation. Publication is a pointer
/// swap; a failed publish leaves the previous generation live and untouched.
/// Only one compilation runs at a time.
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
    publish_lock: Mutex<()>,
}

impl SnapshotStore {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            publish_lock: Mutex::new(()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Snapshot::empty())
    }

    /// The last fully-published generation. Never blocks, not even during a
    /// concurrent publish.
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Recompile and swap in a new generation. All-or-nothing: on any error
    /// the previously published generation remains live.
    pub fn publish<T>(
        &self,
        compiler: &Compiler<T>,
        records: Vec<RuleRecord>,
        registry: TriggerRegistry,
    ) -> Result<Arc<Snapshot>, PublishError>
    where
        T: TokenCounter,
    {
        let _guard = self
            .publish_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let compiled = compiler.compile(records)?;
        let snapshot = Arc::new(Snapshot::assemble(compiled, registry)?);

        info!(
            generation = %snapshot.generation,
            domains = snapshot.indices.len(),
            triggers = snapshot.registry.len(),
            "published snapshot generation"
        );
        self.current.store(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}
