//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
///
/// These checks run before any catalog access; a failure here is fatal and
/// nothing has been written or executed yet.
pub fn validate(config: &Config) -> Result<()> {
    if config.source.username.is_empty() {
        return Err(MigrateError::config("source.username is required"));
    }
    if config.source.connect.is_empty() {
        return Err(MigrateError::config("source.connect is required"));
    }

    if config.target.schema.trim().is_empty() {
        return Err(MigrateError::config("target.schema must not be empty"));
    }
    if config.migration.migrate && config.target.conn.is_empty() {
        return Err(MigrateError::config(
            "target.conn is required when migration.migrate is enabled",
        ));
    }

    if config.output.files && config.output.path.is_none() {
        return Err(MigrateError::config(
            "output.path is required when output.files is enabled",
        ));
    }
    if encoding_rs::Encoding::for_label(config.output.encoding.as_bytes()).is_none() {
        return Err(MigrateError::config(format!(
            "unknown output encoding '{}'",
            config.output.encoding
        )));
    }

    if config.migration.insert_rows == 0 {
        return Err(MigrateError::config(
            "migration.insert_rows must be at least 1",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Selection;
    use std::path::PathBuf;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.source.username = "scott".to_string();
        config.source.password = "tiger".to_string();
        config.source.connect = "//localhost:1521/XEPDB1".to_string();
        config.target.conn = vec!["host=localhost user=postgres".to_string()];
        config.output.path = Some(PathBuf::from("/tmp/o2p-out"));
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_source_connect() {
        let mut config = valid_config();
        config.source.connect = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_schema_rejected() {
        let mut config = valid_config();
        config.target.schema = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_live_migration_requires_targets() {
        let mut config = valid_config();
        config.target.conn.clear();
        assert!(validate(&config).is_err());
        config.migration.migrate = false;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_files_require_path() {
        let mut config = valid_config();
        config.output.path = None;
        assert!(validate(&config).is_err());
        config.output.files = false;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let mut config = valid_config();
        config.output.encoding = "klingon-8".to_string();
        assert!(validate(&config).is_err());
        config.output.encoding = "windows-1252".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_selection_from_yaml() {
        let yaml = r#"
source: {username: scott, password: tiger, connect: "//h:1521/x"}
target: {conn: ["host=h"], schema: HR}
output: {path: /tmp/x}
migration:
  sequences: ["EMP_SEQ EMP.ID", "DEPT_SEQ"]
  triggers: true
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(
            config.migration.sequences,
            Selection::Explicit(vec!["EMP_SEQ EMP.ID".to_string(), "DEPT_SEQ".to_string()])
        );
        assert_eq!(config.migration.triggers, Selection::All);
        assert!(config.migration.triggers.is_enabled());
    }

    #[test]
    fn test_selection_defaults() {
        let yaml = r#"
source: {username: scott, password: tiger, connect: "//h:1521/x"}
target: {conn: ["host=h"]}
output: {path: /tmp/x}
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.migration.sequences, Selection::All);
        assert!(!config.migration.triggers.is_enabled());
        assert_eq!(config.target.schema, "O2P");
        assert_eq!(config.migration.insert_rows, 10_000);
    }
}
