//! Staged DDL generators.
//!
//! Each generator reads the source catalog, resolves names through the
//! identifier policy and emits target statements through the dispatcher. The
//! orchestrator sequences them; the ordering between generators is
//! load-bearing (sequences before tables, tables before foreign keys,
//! triggers last).

pub(crate) mod data;
pub(crate) mod foreign_keys;
pub(crate) mod indexes;
pub(crate) mod sequences;
pub(crate) mod tables;
pub(crate) mod triggers;
