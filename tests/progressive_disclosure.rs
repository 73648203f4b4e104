use std::collections::BTreeSet;

use rulegate::compile::{CompileConfig, Compiler};
use rulegate::rule::RuleRecord;
use rulegate::serve::{self, FetchError};
use rulegate::snapshot::Snapshot;
use rulegate::trigger::TriggerRegistry;
use rulegate::types::{ContentHash, DomainName, RuleId, Severity, Stage};

fn snapshot() -> Snapshot {
    let records = vec![
        RuleRecord {
            id: RuleId::new("auth-001"),
            domain: DomainName::new("authentication"),
            severity: Severity::Critical,
            title: "Hash passwords with a slow KDF".to_string(),
            body: "Use bcrypt, scrypt, or argon2id with tuned cost factors.\n\
                   Plaintext or fast-hash storage is never acceptable.\n\
                   Rotate cost parameters as hardware improves over time."
                .to_string(),
            standard_refs: vec!["ASVS 2.4.1".to_string()],
            weakness_refs: BTreeSet::from(["CWE-916".to_string()]),
        },
        RuleRecord {
            id: RuleId::new("auth-002"),
            domain: DomainName::new("authentication"),
            severity: Severity::High,
            title: "Rate-limit authentication attempts".to_string(),
            body: "Apply exponential backoff and account lockout thresholds.\n\
                   Log lockout events for monitoring."
                .to_string(),
            standard_refs: vec!["ASVS 2.2.1".to_string()],
            weakness_refs: BTreeSet::from(["CWE-307".to_string()]),
        },
    ];
    let compiled = Compiler::new(CompileConfig::v0()).compile(records).unwrap();
    Snapshot::assemble(compiled, TriggerRegistry::default()).unwrap()
}

fn auth() -> DomainName {
    DomainName::new("authentication")
}

#[test]
fn requested_stage_is_served_when_it_fits() {
    let snapshot = snapshot();

    for stage in Stage::ALL {
        let content = serve::fetch(&snapshot, &auth(), 100_000, stage).unwrap();
        assert_eq!(content.stage, stage);
        assert!(!content.truncated);
        assert!(content.tokens <= 100_000);
    }
}

#[test]
fn oversized_stage_downgrades_with_truncated_flag() {
    let snapshot = snapshot();
    let index = &snapshot.indices[&auth()];

    let summary_tokens = index.stage(Stage::Summary).unwrap().tokens;
    let full_tokens = index.stage(Stage::Full).unwrap().tokens;
    assert!(
        full_tokens > summary_tokens,
        "fixture must have a full stage larger than its summary"
    );

    let content = serve::fetch(&snapshot, &auth(), summary_tokens, Stage::Full).unwrap();
    assert!(content.truncated);
    assert!(content.stage < Stage::Full);
    assert!(content.tokens <= summary_tokens);
}

#[test]
fn budget_smaller_than_summary_is_not_found() {
    let snapshot = snapshot();

    let err = serve::fetch(&snapshot, &auth(), 0, Stage::Summary).unwrap_err();
    assert!(matches!(err, FetchError::BudgetTooSmall { .. }));
}

#[test]
fn unknown_domain_is_not_found() {
    let snapshot = snapshot();

    let err = serve::fetch(&snapshot, &DomainName::new("networking"), 1_000, Stage::Summary)
        .unwrap_err();
    assert!(matches!(err, FetchError::UnknownDomain(d) if d == DomainName::new("networking")));
}

#[test]
fn budget_monotonicity() {
    let snapshot = snapshot();
    let index = &snapshot.indices[&auth()];
    let max_tokens = index.stage(Stage::Full).unwrap().tokens;

    let mut last_stage: Option<Stage> = None;
    for budget in 0..=max_tokens + 8 {
        match serve::fetch(&snapshot, &auth(), budget, Stage::Full) {
            Ok(content) => {
                assert!(content.tokens <= budget, "served content exceeds budget");
                if let Some(prev) = last_stage {
                    assert!(
                        content.stage >= prev,
                        "larger budget served a less detailed stage"
                    );
                }
                last_stage = Some(content.stage);
            }
            Err(FetchError::BudgetTooSmall { .. }) => {
                assert!(last_stage.is_none(), "fit regressed as budget grew");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(last_stage, Some(Stage::Full));
}

#[test]
fn staging_is_idempotent_and_hash_stable() {
    let snapshot = snapshot();

    let first = serve::fetch(&snapshot, &auth(), 100_000, Stage::Detail).unwrap();
    let second = serve::fetch(&snapshot, &auth(), 100_000, Stage::Detail).unwrap();

    assert_eq!(first, second, "repeated fetches must be byte-identical");
    assert_eq!(first.hash, ContentHash::from_content(first.body.as_bytes()));
}

#[test]
fn stages_are_strictly_ordered_by_detail() {
    let snapshot = snapshot();
    let index = &snapshot.indices[&auth()];

    let detail = &index.stage(Stage::Detail).unwrap().body;
    let full = &index.stage(Stage::Full).unwrap().body;

    // Detail carries excerpts only; full carries every body line.
    assert!(detail.contains("Use bcrypt, scrypt, or argon2id"));
    assert!(!detail.contains("Rotate cost parameters"));
    assert!(full.contains("Rotate cost parameters"));
}
