pub mod record;
pub mod store;

pub use record::RuleRecord;
pub use store::{load_rules_dir, StoreError};
