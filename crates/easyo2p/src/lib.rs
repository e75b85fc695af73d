//! # easyo2p
//!
//! Easy, quick and simple Oracle to PostgreSQL schema migration.
//!
//! Migrates a schema's tables, data, constraints, indexes, comments,
//! sequences and (some) triggers. Connect to both Oracle and PostgreSQL
//! simultaneously to migrate in realtime, create SQL script files from the
//! Oracle schema to run repeatedly on PostgreSQL, or both.
//!
//! ## Example
//!
//! ```rust,no_run
//! use easyo2p::{Config, Orchestrator};
//!
//! fn main() -> easyo2p::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let mut orchestrator = Orchestrator::new(config)?;
//!     orchestrator.run()?;
//!     orchestrator.create_run_script()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
mod generators;
pub mod orchestrator;
pub mod plsql;
pub mod policy;
pub mod source;
pub mod target;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, Selection, Substitution};
pub use dispatch::{Stage, LOG_FILE, SCHEMA_PLACEHOLDER};
pub use error::{MigrateError, Result};
pub use orchestrator::{Orchestrator, Plan, TriggerDescriptor, RUN_SCRIPT};
pub use policy::{IdentifierPolicy, ObjectKind};
pub use source::{Catalog, OracleCatalog, Record, Rows, SqlValue};
pub use target::{PgSessions, TargetExec};
