//! Configuration type definitions.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// Built once before the pipeline runs and immutable thereafter; run-time
/// state (current stage, open script file, live sessions) lives in the
/// orchestrator, never in here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (Oracle).
    #[serde(default)]
    pub source: SourceConfig,

    /// Target database configuration (PostgreSQL).
    #[serde(default)]
    pub target: TargetConfig,

    /// Script output configuration.
    #[serde(default)]
    pub output: OutputConfig,

    /// Migration behaviour configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Source database (Oracle) configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Username.
    #[serde(default)]
    pub username: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// EZConnect descriptor, e.g. "//db.example.com:1521/ORCLPDB1".
    #[serde(default)]
    pub connect: String,
}

/// Target database (PostgreSQL) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Connection strings, one per target replica. Statements are executed
    /// against every connection, in order.
    #[serde(default)]
    pub conn: Vec<String>,

    /// Target schema (default: "O2P").
    #[serde(default = "default_schema")]
    pub schema: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            conn: Vec::new(),
            schema: default_schema(),
        }
    }
}

/// Script output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory for this run. Must not already exist; required when
    /// `files` is enabled.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Emit replayable script files (default: true).
    #[serde(default = "default_true")]
    pub files: bool,

    /// Character encoding of emitted files (default: "utf-8").
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            files: true,
            encoding: default_encoding(),
        }
    }
}

/// Migration behaviour configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Execute statements live against the target connections (default: true).
    #[serde(default = "default_true")]
    pub migrate: bool,

    /// Drop the target schema before recreating it (default: true).
    #[serde(default = "default_true")]
    pub drop_schema: bool,

    /// Migrate table data (default: true).
    #[serde(default = "default_true")]
    pub data: bool,

    /// Migrate key constraints, foreign keys and indexes (default: true).
    #[serde(default = "default_true")]
    pub constraints: bool,

    /// Migrate table and column comments (default: true).
    #[serde(default = "default_true")]
    pub comments: bool,

    /// Trigger selection (default: none).
    #[serde(default)]
    pub triggers: Selection,

    /// Rows per INSERT statement when migrating data (default: 10000).
    #[serde(default = "default_insert_rows")]
    pub insert_rows: usize,

    /// Column-name suffix that marks surrogate identifiers (default: "_ID").
    #[serde(default = "default_id_suffix")]
    pub id_suffix: String,

    /// Tables to migrate; absent means every valid table in the schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,

    /// Sequence selection (default: all). Explicit entries are either a
    /// sequence name or `"SEQUENCE table.column"` to bind the sequence as a
    /// column default.
    #[serde(default = "Selection::all")]
    pub sequences: Selection,

    /// Objects to exclude, as `"TYPE qualified.name"` entries.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Rename rules, as `"TYPE qualified.name new_name"` entries.
    #[serde(default)]
    pub rename: Vec<String>,

    /// Tablespace mapping, as `"match_key target_tablespace"` entries,
    /// first match wins.
    #[serde(default)]
    pub tablespace_map: Vec<String>,

    /// Per-column datatype overrides, as `"table.column TYPE"` entries.
    #[serde(default)]
    pub column_datatypes: Vec<String>,

    /// Per-table column reordering: listed columns come first in list order,
    /// unlisted ones after in catalog order.
    #[serde(default)]
    pub column_reorder: HashMap<String, Vec<String>>,

    /// Extra trigger-body token substitutions, applied after the built-in
    /// table (matching `from` tokens replace the built-in rule).
    #[serde(default)]
    pub plsql_substitutions: Vec<Substitution>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrate: true,
            drop_schema: true,
            data: true,
            constraints: true,
            comments: true,
            triggers: Selection::None,
            insert_rows: default_insert_rows(),
            id_suffix: default_id_suffix(),
            tables: None,
            sequences: Selection::All,
            exclude: Vec::new(),
            rename: Vec::new(),
            tablespace_map: Vec::new(),
            column_datatypes: Vec::new(),
            column_reorder: HashMap::new(),
            plsql_substitutions: Vec::new(),
        }
    }
}

/// Object selection: everything the catalog knows, nothing, or an explicit
/// list. Deserializes from either a boolean or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SelectionRepr", into = "SelectionRepr")]
pub enum Selection {
    All,
    None,
    Explicit(Vec<String>),
}

impl Selection {
    pub fn all() -> Self {
        Selection::All
    }

    /// Does this selection enable the feature at all?
    pub fn is_enabled(&self) -> bool {
        match self {
            Selection::All => true,
            Selection::None => false,
            Selection::Explicit(entries) => !entries.is_empty(),
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Selection::None
    }
}

/// Wire representation of [`Selection`]: `true`/`false` or a list.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SelectionRepr {
    Toggle(bool),
    Explicit(Vec<String>),
}

impl From<SelectionRepr> for Selection {
    fn from(repr: SelectionRepr) -> Self {
        match repr {
            SelectionRepr::Toggle(true) => Selection::All,
            SelectionRepr::Toggle(false) => Selection::None,
            SelectionRepr::Explicit(entries) => Selection::Explicit(entries),
        }
    }
}

impl From<Selection> for SelectionRepr {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::All => SelectionRepr::Toggle(true),
            Selection::None => SelectionRepr::Toggle(false),
            Selection::Explicit(entries) => SelectionRepr::Explicit(entries),
        }
    }
}

/// One trigger-body token replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

// Default value functions for serde

fn default_schema() -> String {
    "O2P".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_insert_rows() -> usize {
    10_000
}

fn default_id_suffix() -> String {
    "_ID".to_string()
}

fn default_true() -> bool {
    true
}
