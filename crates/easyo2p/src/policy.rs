//! Identifier policy: rename, exclusion and tablespace remapping rules.
//!
//! Every generator consults the policy before emitting a name. The policy is
//! built once from the configuration and is immutable for the lifetime of a
//! run; all lookups are side-effect-free.

use std::collections::{HashMap, HashSet};

use crate::config::Config;
use crate::error::{MigrateError, Result};

/// Closed enumeration of migratable object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Column,
    Constraint,
    Index,
    Sequence,
    Table,
    Trigger,
}

impl ObjectKind {
    /// The tag used in configuration entries ("TYPE qualified.name ...").
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Column => "COLUMN",
            ObjectKind::Constraint => "CONSTRAINT",
            ObjectKind::Index => "INDEX",
            ObjectKind::Sequence => "SEQUENCE",
            ObjectKind::Table => "TABLE",
            ObjectKind::Trigger => "TRIGGER",
        }
    }

    fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "COLUMN" => Ok(ObjectKind::Column),
            "CONSTRAINT" => Ok(ObjectKind::Constraint),
            "INDEX" => Ok(ObjectKind::Index),
            "SEQUENCE" => Ok(ObjectKind::Sequence),
            "TABLE" => Ok(ObjectKind::Table),
            "TRIGGER" => Ok(ObjectKind::Trigger),
            other => Err(MigrateError::config(format!(
                "unknown object type '{}'",
                other
            ))),
        }
    }
}

/// Immutable rename/exclusion/tablespace rules.
#[derive(Debug, Clone, Default)]
pub struct IdentifierPolicy {
    rename: HashMap<(ObjectKind, String), String>,
    exclude: HashSet<(ObjectKind, String)>,
    /// Ordered `(match_key, target_tablespace)` pairs; `None` when no mapping
    /// is configured at all (which disables tablespace clauses entirely).
    tablespace: Option<Vec<(String, String)>>,
}

impl IdentifierPolicy {
    /// Parse the policy out of the configuration lists.
    ///
    /// Rename entries are `"TYPE qualified.name new_name"`, exclusion entries
    /// `"TYPE qualified.name"`, tablespace entries
    /// `"match_key target_tablespace"`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut rename = HashMap::new();
        for entry in &config.migration.rename {
            let (key, target) = entry.rsplit_once(' ').ok_or_else(|| {
                MigrateError::config(format!("malformed rename entry '{}'", entry))
            })?;
            let (tag, name) = key.split_once(' ').ok_or_else(|| {
                MigrateError::config(format!("malformed rename entry '{}'", entry))
            })?;
            rename.insert(
                (ObjectKind::from_tag(tag)?, name.to_string()),
                target.to_string(),
            );
        }

        let mut exclude = HashSet::new();
        for entry in &config.migration.exclude {
            let (tag, name) = entry.split_once(' ').ok_or_else(|| {
                MigrateError::config(format!("malformed exclude entry '{}'", entry))
            })?;
            exclude.insert((ObjectKind::from_tag(tag)?, name.to_string()));
        }

        let tablespace = if config.migration.tablespace_map.is_empty() {
            None
        } else {
            let mut pairs = Vec::new();
            for entry in &config.migration.tablespace_map {
                let (key, target) = entry.split_once(' ').ok_or_else(|| {
                    MigrateError::config(format!("malformed tablespace_map entry '{}'", entry))
                })?;
                pairs.push((key.to_string(), target.to_string()));
            }
            Some(pairs)
        };

        Ok(Self {
            rename,
            exclude,
            tablespace,
        })
    }

    /// Resolve an object name through the rename map, or return it unchanged.
    pub fn resolve(&self, kind: ObjectKind, name: &str) -> String {
        self.rename
            .get(&(kind, name.to_string()))
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Resolve a column name.
    ///
    /// Columns are renamed through the pseudo-object `COLUMN table.column`;
    /// the table prefix is stripped from the result so a rule may change the
    /// prefix while plain column renames stay simple.
    pub fn resolve_column(&self, table: &str, column: &str) -> String {
        let resolved = self.resolve(ObjectKind::Column, &format!("{}.{}", table, column));
        match resolved.split_once('.') {
            Some((_, col)) => col.to_string(),
            None => resolved,
        }
    }

    /// Is the object in the exclusion set?
    pub fn is_excluded(&self, kind: ObjectKind, name: &str) -> bool {
        self.exclude.contains(&(kind, name.to_string()))
    }

    /// Is the column, addressed as `table.column`, excluded?
    pub fn is_column_excluded(&self, table: &str, column: &str) -> bool {
        self.is_excluded(ObjectKind::Column, &format!("{}.{}", table, column))
    }

    /// Map a source tablespace onto a target tablespace clause.
    ///
    /// Returns the empty string when no mapping is configured. Otherwise the
    /// match keys are tried in priority order (object kind, object name,
    /// `KIND.name`, source tablespace name), scanning the configured pairs in
    /// order within each priority level; the first hit wins. With no hit the
    /// source tablespace is carried over behind `preamble`.
    pub fn resolve_tablespace(
        &self,
        kind: ObjectKind,
        object_name: &str,
        source_tablespace: &str,
        preamble: &str,
    ) -> String {
        let Some(pairs) = &self.tablespace else {
            return String::new();
        };

        let qualified = format!("{}.{}", kind.as_str(), object_name);
        let search = [
            kind.as_str(),
            object_name,
            qualified.as_str(),
            source_tablespace,
        ];

        for key in search {
            if key.is_empty() {
                continue;
            }
            for (pattern, target) in pairs {
                if pattern == key {
                    return target.clone();
                }
            }
        }

        if source_tablespace.is_empty() {
            String::new()
        } else {
            format!("{}{}", preamble, source_tablespace)
        }
    }
}
