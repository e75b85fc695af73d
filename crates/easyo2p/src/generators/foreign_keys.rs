//! Foreign key constraint generation.

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::orchestrator::Plan;
use crate::policy::{IdentifierPolicy, ObjectKind};
use crate::source::Catalog;

struct FkGroup {
    name: String,
    r_table: String,
    columns: Vec<String>,
    r_columns: Vec<String>,
    delete_rule: String,
}

/// Emit one ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY per constraint on
/// `table_name` whose referenced table is itself in scope for migration.
///
/// The catalog orders rows by constraint name and position, so a group is
/// complete exactly when the name changes; the trailing group is flushed
/// after the result set ends.
pub(crate) fn generate(
    catalog: &mut dyn Catalog,
    policy: &IdentifierPolicy,
    plan: &Plan,
    out: &mut Dispatcher,
    table_name: &str,
) -> Result<()> {
    let sql = format!(
        "SELECT uc.constraint_name, ruc.table_name r_table_name, \
                ucc.column_name, rucc.column_name r_column_name, uc.delete_rule \
           FROM user_constraints uc, \
                user_cons_columns ucc, \
                user_constraints ruc, \
                user_cons_columns rucc \
          WHERE uc.constraint_name = ucc.constraint_name \
            AND uc.r_constraint_name = ruc.constraint_name \
            AND ruc.constraint_name = rucc.constraint_name \
            AND ucc.position = rucc.position \
            AND uc.table_name = '{}' \
          ORDER BY uc.constraint_name, ucc.position",
        table_name
    );

    let rows = catalog.query(&sql)?;
    let mut group: Option<FkGroup> = None;

    for rec in rows.records() {
        let r_table = rec.text("r_table_name")?;
        if !plan.tables.iter().any(|t| t == r_table) {
            continue;
        }

        let name = rec.text("constraint_name")?;
        if group.as_ref().map(|g| g.name != name).unwrap_or(true) {
            if let Some(done) = group.take() {
                emit_foreign_key(policy, out, table_name, &done)?;
            }
            group = Some(FkGroup {
                name: name.to_string(),
                r_table: r_table.to_string(),
                columns: Vec::new(),
                r_columns: Vec::new(),
                delete_rule: rec.text("delete_rule")?.to_string(),
            });
        }

        let open = group.as_mut().expect("open foreign key group");
        open.columns.push(rec.text("column_name")?.to_string());
        open.r_columns.push(rec.text("r_column_name")?.to_string());
    }

    if let Some(done) = group.take() {
        emit_foreign_key(policy, out, table_name, &done)?;
    }

    Ok(())
}

fn emit_foreign_key(
    policy: &IdentifierPolicy,
    out: &mut Dispatcher,
    table_name: &str,
    group: &FkGroup,
) -> Result<()> {
    if policy.is_excluded(ObjectKind::Constraint, &group.name) {
        return Ok(());
    }
    // Either side touching an excluded column kills the whole constraint.
    if group
        .columns
        .iter()
        .any(|c| policy.is_column_excluded(table_name, c))
        || group
            .r_columns
            .iter()
            .any(|c| policy.is_column_excluded(&group.r_table, c))
    {
        return Ok(());
    }

    let target_name = policy.resolve(ObjectKind::Constraint, &group.name);
    let target_table = policy.resolve(ObjectKind::Table, table_name);
    let target_r_table = policy.resolve(ObjectKind::Table, &group.r_table);

    let columns = group
        .columns
        .iter()
        .map(|c| policy.resolve_column(table_name, c))
        .collect::<Vec<_>>()
        .join(",");
    let r_columns = group
        .r_columns
        .iter()
        .map(|c| policy.resolve_column(&group.r_table, c))
        .collect::<Vec<_>>()
        .join(",");

    out.dispatch(&format!(
        "ALTER TABLE %%schema%%.{} ADD CONSTRAINT {} FOREIGN KEY \
         ({}) REFERENCES %%schema%%.{} \
         ({}) \
         ON DELETE {};",
        target_table, target_name, columns, target_r_table, r_columns, group.delete_rule
    ))
}
