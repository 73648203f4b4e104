use std::collections::BTreeSet;

use rulegate::compile::{CompileConfig, Compiler};
use rulegate::route::Router;
use rulegate::rule::RuleRecord;
use rulegate::snapshot::{PublishError, SnapshotStore};
use rulegate::trigger::TriggerRegistry;
use rulegate::types::{ActivationRequest, DomainName, RuleId, Severity};

fn rule(id: &str, domain: &str, title: &str) -> RuleRecord {
    RuleRecord {
        id: RuleId::new(id),
        domain: DomainName::new(domain),
        severity: Severity::Low,
        title: title.to_string(),
        body: "Body.".to_string(),
        standard_refs: Vec::new(),
        weakness_refs: BTreeSet::new(),
    }
}

fn registry(json: &str) -> TriggerRegistry {
    TriggerRegistry::from_json(json).unwrap()
}

const TRIGGERS: &str =
    r#"[{"pattern": "password", "domains": ["authentication"], "gate": "none", "priority": 1}]"#;

#[test]
fn publish_swaps_in_the_new_generation() {
    let store = SnapshotStore::empty();
    assert!(store.load().indices.is_empty());

    let compiler = Compiler::new(CompileConfig::v0());
    let published = store
        .publish(
            &compiler,
            vec![rule("auth-001", "authentication", "Hash passwords")],
            registry(TRIGGERS),
        )
        .unwrap();

    let loaded = store.load();
    assert_eq!(loaded.generation, published.generation);
    assert!(loaded.indices.contains_key(&DomainName::new("authentication")));
}

#[test]
fn failed_compile_leaves_previous_generation_live() {
    let store = SnapshotStore::empty();
    let compiler = Compiler::new(CompileConfig::v0());

    store
        .publish(
            &compiler,
            vec![rule("auth-001", "authentication", "Hash passwords")],
            registry(TRIGGERS),
        )
        .unwrap();
    let before = store.load();

    // One invalid record in an otherwise valid batch.
    let bad_batch = vec![
        rule("auth-001", "authentication", "Hash passwords"),
        rule("auth-001", "authentication", "Duplicate ID"),
    ];
    let err = store
        .publish(&compiler, bad_batch, registry(TRIGGERS))
        .unwrap_err();
    assert!(matches!(err, PublishError::Compile(_)));

    let after = store.load();
    assert_eq!(before.generation, after.generation);
    assert_eq!(before.indices.len(), after.indices.len());
}

#[test]
fn trigger_referencing_unknown_domain_is_rejected() {
    let store = SnapshotStore::empty();
    let compiler = Compiler::new(CompileConfig::v0());

    let bad_triggers =
        r#"[{"pattern": "token", "domains": ["sessions"], "gate": "none", "priority": 1}]"#;
    let err = store
        .publish(
            &compiler,
            vec![rule("auth-001", "authentication", "Hash passwords")],
            registry(bad_triggers),
        )
        .unwrap_err();

    assert!(
        matches!(err, PublishError::UnknownTriggerDomain { domain, .. } if domain == DomainName::new("sessions"))
    );
    assert!(store.load().indices.is_empty(), "failed publish must not swap");
}

#[test]
fn empty_store_routes_everything_to_a_miss() {
    let store = SnapshotStore::empty();
    let router = Router::default();

    let result = router.route(
        &store.load(),
        &ActivationRequest::from_text("add password reset"),
    );
    assert!(result.is_miss());
}

#[test]
fn in_flight_snapshot_survives_republish() {
    let store = SnapshotStore::empty();
    let compiler = Compiler::new(CompileConfig::v0());

    store
        .publish(
            &compiler,
            vec![rule("auth-001", "authentication", "Hash passwords")],
            registry(TRIGGERS),
        )
        .unwrap();

    // A reader holding the old generation keeps a consistent view across a
    // publish that replaces it.
    let held = store.load();
    store
        .publish(
            &compiler,
            vec![
                rule("auth-001", "authentication", "Hash passwords"),
                rule("sec-001", "secrets", "Vault your keys"),
            ],
            registry(TRIGGERS),
        )
        .unwrap();

    assert_eq!(held.indices.len(), 1);
    assert_eq!(store.load().indices.len(), 2);
    assert_ne!(held.generation, store.load().generation);
}
