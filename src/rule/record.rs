use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::identifiers::{DomainName, RuleId};
use crate::types::Severity;

/// The atomic unit of guidance: one rule extracted from a standards document.
///
/// Field order is load-bearing: serialized artifacts and per-rule content
/// hashes derive from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: RuleId,
    pub domain: DomainName,
    pub severity: Severity,
    pub title: String,
    pub body: String,
    /// Ordered references into standards documents, e.g. "ASVS 2.4.1".
    #[serde(default)]
    pub standard_refs: Vec<String>,
    /// Weakness references, e.g. "CWE-327".
    #[serde(default)]
    pub weakness_refs: BTreeSet<String>,
}

/// A standard reference is `<name> <section>` where the section is dotted
/// decimal, e.g. "ASVS 2.4.1" or "NIST-800-63B 5.1.1".
pub(crate) fn standard_ref_is_valid(value: &str) -> bool {
    let Some((name, section)) = value.split_once(' ') else {
        return false;
    };
    let name_ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    let section_ok = !section.is_empty()
        && section
            .split('.')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()));
    name_ok && section_ok
}

/// A weakness reference is `CWE-<digits>`.
pub(crate) fn weakness_ref_is_valid(value: &str) -> bool {
    value
        .strip_prefix("CWE-")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}
