//! Trigger generation: the transpiled trigger function, then the trigger
//! binding that wires it to its table.

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::orchestrator::{Plan, TriggerDescriptor};
use crate::plsql::{self, SubstitutionTable};
use crate::policy::{IdentifierPolicy, ObjectKind};
use crate::source::Catalog;

/// Emit function and binding statements for every trigger bound to
/// `table_name`.
pub(crate) fn generate(
    catalog: &mut dyn Catalog,
    policy: &IdentifierPolicy,
    substitutions: &SubstitutionTable,
    plan: &Plan,
    out: &mut Dispatcher,
    table_name: &str,
) -> Result<()> {
    for trigger in plan.triggers.iter().filter(|t| t.table_name == table_name) {
        create_function(catalog, policy, substitutions, out, &trigger.trigger_name)?;
        create_trigger(policy, out, trigger)?;
    }
    Ok(())
}

/// Rewrite the stored trigger source into a PL/pgSQL function.
fn create_function(
    catalog: &mut dyn Catalog,
    policy: &IdentifierPolicy,
    substitutions: &SubstitutionTable,
    out: &mut Dispatcher,
    trigger_name: &str,
) -> Result<()> {
    let sql = format!(
        "SELECT us.text \
           FROM user_source us \
          WHERE us.name = '{}' \
          ORDER BY us.line",
        trigger_name
    );

    let rows = catalog.query(&sql)?;
    let mut lines = Vec::with_capacity(rows.len());
    for rec in rows.records() {
        lines.push(rec.opt_text("text")?.unwrap_or(""));
    }

    let body = plsql::rewrite(&lines, substitutions);
    let target_trigger = policy.resolve(ObjectKind::Trigger, trigger_name);

    out.dispatch(&plsql::function_ddl(
        &format!("{}_TF", target_trigger),
        &body,
    ))
}

/// Bind the generated function with CREATE TRIGGER.
fn create_trigger(
    policy: &IdentifierPolicy,
    out: &mut Dispatcher,
    trigger: &TriggerDescriptor,
) -> Result<()> {
    let before_after = trigger
        .trigger_type
        .split(' ')
        .next()
        .unwrap_or("")
        .to_string();
    let each_row = if trigger.trigger_type.ends_with("EACH ROW") {
        "FOR EACH ROW"
    } else {
        ""
    };
    let when = trigger
        .when_clause
        .as_deref()
        .map(|clause| format!("WHEN ({})", clause))
        .unwrap_or_default();

    let target_table = policy.resolve(ObjectKind::Table, &trigger.table_name);
    let target_trigger = policy.resolve(ObjectKind::Trigger, &trigger.trigger_name);

    out.dispatch(&format!(
        "CREATE TRIGGER {}\n{} {} \nON %%schema%%.{} {} {}\nEXECUTE PROCEDURE %%schema%%.{}_TF(); \n\n",
        target_trigger,
        before_after,
        trigger.triggering_event,
        target_table,
        each_row,
        when,
        target_trigger
    ))
}
