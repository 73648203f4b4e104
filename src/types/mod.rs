pub mod activation;
pub mod identifiers;

pub use activation::{ActivationRequest, ActivationResult, Gate, Severity, Stage};
pub use identifiers::{ContentHash, DomainName, RuleId};
