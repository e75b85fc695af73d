//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, reused target path, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pipeline stage violation (e.g. assembling the run script before the ETL ran).
    #[error("Stage error: {0}")]
    Stage(String),

    /// Malformed or unexpected catalog result.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Oracle connection or query error
    #[error("Source database error: {0}")]
    Source(#[from] oracle::Error),

    /// PostgreSQL connection or statement error
    #[error("Target database error: {0}")]
    Target(#[from] postgres::Error),

    /// IO error (script files, run log)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MigrateError {
    /// Create a Config error.
    pub fn config(message: impl Into<String>) -> Self {
        MigrateError::Config(message.into())
    }

    /// Create a Catalog error.
    pub fn catalog(message: impl Into<String>) -> Self {
        MigrateError::Catalog(message.into())
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
