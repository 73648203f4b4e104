//! Deterministic rule compilation and retrieval routing for AI assistants.
//!
//! `rulegate` ingests atomic security-rule records, compiles them into
//! per-domain indices with precomputed disclosure stages, matches free-text
//! requests against a prioritized trigger registry, and serves content in
//! token-budgeted stages. Routing and serving are deterministic — identical
//! inputs against one published generation always produce identical outputs,
//! byte-for-byte.
//!
//! Compiled generations are immutable and swapped atomically; in-flight
//! requests never observe a partially rebuilt index.

pub mod compile;
pub mod orchestrate;
pub mod route;
pub mod rule;
pub mod serve;
pub mod snapshot;
pub mod trigger;
pub mod types;
