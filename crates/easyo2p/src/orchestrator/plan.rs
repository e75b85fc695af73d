//! Migration plan: the frozen, catalog-resolved view of what to migrate.

use std::collections::HashMap;

use tracing::debug;

use crate::config::{Config, Selection};
use crate::error::{MigrateError, Result};
use crate::policy::{IdentifierPolicy, ObjectKind};
use crate::source::Catalog;

/// One trigger captured from the catalog, reused for both the function and
/// the binding statement.
#[derive(Debug, Clone)]
pub struct TriggerDescriptor {
    pub table_name: String,
    pub trigger_name: String,
    pub trigger_type: String,
    pub triggering_event: String,
    pub when_clause: Option<String>,
}

/// Everything the ETL phase needs to know up front, resolved once when the
/// pipeline enters ETL and immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// In-scope source table names, in migration order.
    pub tables: Vec<String>,

    /// Resolved tablespace clause per source table.
    pub tablespace_clause: HashMap<String, String>,

    /// In-scope source sequence names.
    pub sequences: Vec<String>,

    /// `table.column` to sequence-name bindings used for column defaults.
    /// Explicit configuration entries win; catalog-discovered identity
    /// bindings are additive only.
    pub sequence_bindings: HashMap<String, String>,

    /// Operator-supplied datatype overrides keyed by `table.column`.
    pub column_types: HashMap<String, String>,

    /// Trigger descriptors for every in-scope trigger.
    pub triggers: Vec<TriggerDescriptor>,

    /// Whether trigger migration is enabled at all.
    pub triggers_enabled: bool,
}

/// Resolve the plan from configuration and catalog state.
pub fn build(
    catalog: &mut dyn Catalog,
    config: &Config,
    policy: &IdentifierPolicy,
) -> Result<Plan> {
    let mut plan = Plan::default();

    resolve_tables(catalog, config, policy, &mut plan)?;
    resolve_sequences(catalog, config, policy, &mut plan)?;
    resolve_identity_bindings(catalog, policy, &mut plan)?;
    resolve_column_types(config, &mut plan)?;
    resolve_triggers(catalog, config, policy, &mut plan)?;

    // An excluded sequence must not resurface through a column default.
    plan.sequence_bindings
        .retain(|_, sequence| !policy.is_excluded(ObjectKind::Sequence, sequence));

    Ok(plan)
}

fn resolve_tables(
    catalog: &mut dyn Catalog,
    config: &Config,
    policy: &IdentifierPolicy,
    plan: &mut Plan,
) -> Result<()> {
    let sql = "SELECT ut.table_name, ut.tablespace_name \
                 FROM user_tables ut \
                WHERE ut.status = 'VALID' \
                  AND tablespace_name IS NOT NULL \
                  AND SUBSTR(table_name,1,4) != 'SYS_' \
                ORDER BY 1";

    let mut discovered = Vec::new();
    let rows = catalog.query(sql)?;
    for rec in rows.records() {
        discovered.push((
            rec.text("table_name")?.to_string(),
            rec.opt_text("tablespace_name")?.unwrap_or("").to_string(),
        ));
    }

    plan.tables = match &config.migration.tables {
        Some(explicit) => explicit.clone(),
        None => discovered.iter().map(|(name, _)| name.clone()).collect(),
    };

    for name in &plan.tables {
        let source_tablespace = discovered
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ts)| ts.as_str())
            .unwrap_or("");
        plan.tablespace_clause.insert(
            name.clone(),
            policy.resolve_tablespace(ObjectKind::Table, name, source_tablespace, "TABLESPACE "),
        );
    }

    plan.tables
        .retain(|name| !policy.is_excluded(ObjectKind::Table, name));

    Ok(())
}

fn resolve_sequences(
    catalog: &mut dyn Catalog,
    config: &Config,
    policy: &IdentifierPolicy,
    plan: &mut Plan,
) -> Result<()> {
    match &config.migration.sequences {
        Selection::All => {
            let rows = catalog.query("SELECT sequence_name FROM user_sequences")?;
            for rec in rows.records() {
                plan.sequences.push(rec.text("sequence_name")?.to_string());
            }
        }
        Selection::None => {}
        Selection::Explicit(entries) => {
            for entry in entries {
                let (sequence, binding) = match entry.split_once(' ') {
                    Some((sequence, rest)) => (sequence, Some(rest.trim())),
                    None => (entry.as_str(), None),
                };
                plan.sequences.push(sequence.to_string());
                if let Some(tab_col) = binding.filter(|b| b.contains('.')) {
                    plan.sequence_bindings
                        .insert(tab_col.to_string(), sequence.to_string());
                }
            }
        }
    }

    plan.sequences
        .retain(|name| !policy.is_excluded(ObjectKind::Sequence, name));

    Ok(())
}

/// Discover identity columns and bind their backing sequences.
///
/// The identity-column view does not exist on older catalog versions; that
/// absence is expected and treated as "no identity sequences".
fn resolve_identity_bindings(
    catalog: &mut dyn Catalog,
    policy: &IdentifierPolicy,
    plan: &mut Plan,
) -> Result<()> {
    let sql = "SELECT table_name, column_name, sequence_name \
                 FROM user_tab_identity_cols";

    let rows = match catalog.query(sql) {
        Ok(rows) => rows,
        Err(err) => {
            debug!("identity column introspection unavailable: {}", err);
            return Ok(());
        }
    };

    for rec in rows.records() {
        let table = rec.text("table_name")?;
        let column = rec.text("column_name")?;
        let sequence = rec.text("sequence_name")?;

        if policy.is_excluded(ObjectKind::Sequence, sequence)
            || policy.is_column_excluded(table, column)
            || !plan.tables.iter().any(|t| t == table)
        {
            continue;
        }

        if !plan.sequences.iter().any(|s| s == sequence) {
            plan.sequences.push(sequence.to_string());
        }
        plan.sequence_bindings
            .entry(format!("{}.{}", table, column))
            .or_insert_with(|| sequence.to_string());
    }

    Ok(())
}

fn resolve_column_types(config: &Config, plan: &mut Plan) -> Result<()> {
    for entry in &config.migration.column_datatypes {
        let (key, datatype) = entry.split_once(' ').ok_or_else(|| {
            MigrateError::config(format!("malformed column_datatypes entry '{}'", entry))
        })?;
        plan.column_types
            .insert(key.to_string(), datatype.to_string());
    }
    Ok(())
}

fn resolve_triggers(
    catalog: &mut dyn Catalog,
    config: &Config,
    policy: &IdentifierPolicy,
    plan: &mut Plan,
) -> Result<()> {
    plan.triggers_enabled = config.migration.triggers.is_enabled();
    if !plan.triggers_enabled {
        return Ok(());
    }

    let filter = match &config.migration.triggers {
        Selection::Explicit(names) if !names.is_empty() => names
            .iter()
            .map(|name| format!("trigger_name = '{}'", name))
            .collect::<Vec<_>>()
            .join(" OR "),
        _ => " 1=1 ".to_string(),
    };

    let sql = format!(
        "SELECT ut.table_name, \
                ut.trigger_name, \
                ut.trigger_type, \
                ut.triggering_event, \
                ut.when_clause \
           FROM user_triggers ut \
          WHERE ut.status = 'ENABLED' \
            AND ut.base_object_type = 'TABLE' \
            AND ({})",
        filter
    );

    let rows = catalog.query(&sql)?;
    for rec in rows.records() {
        let trigger_name = rec.text("trigger_name")?;
        if policy.is_excluded(ObjectKind::Trigger, trigger_name) {
            continue;
        }
        plan.triggers.push(TriggerDescriptor {
            table_name: rec.text("table_name")?.to_string(),
            trigger_name: trigger_name.to_string(),
            trigger_type: rec.text("trigger_type")?.to_string(),
            triggering_event: rec.text("triggering_event")?.to_string(),
            when_clause: rec.opt_text("when_clause")?.map(str::to_string),
        });
    }

    Ok(())
}
