//! Plain index generation.
//!
//! Only non-unique NORMAL indexes are generated here; unique indexes travel
//! as primary/unique key constraints with the table, which would otherwise
//! duplicate them.

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::policy::{IdentifierPolicy, ObjectKind};
use crate::source::Catalog;

struct IndexGroup {
    name: String,
    tablespace: String,
    columns: Vec<String>,
}

/// Emit one CREATE INDEX per plain index on `table_name`, grouping the
/// ordered per-column rows by index name and flushing the trailing group.
pub(crate) fn generate(
    catalog: &mut dyn Catalog,
    policy: &IdentifierPolicy,
    out: &mut Dispatcher,
    table_name: &str,
) -> Result<()> {
    let sql = format!(
        "SELECT ui.index_name, uic.column_name, ui.tablespace_name \
           FROM user_indexes ui, user_ind_columns uic \
          WHERE ui.uniqueness = 'NONUNIQUE' \
            AND ui.index_type = 'NORMAL' \
            AND ui.table_name = '{}' \
            AND ui.index_name = uic.index_name \
          ORDER BY ui.index_name, uic.column_position",
        table_name
    );

    let rows = catalog.query(&sql)?;
    let mut group: Option<IndexGroup> = None;

    for rec in rows.records() {
        let name = rec.text("index_name")?;
        if group.as_ref().map(|g| g.name != name).unwrap_or(true) {
            if let Some(done) = group.take() {
                emit_index(policy, out, table_name, &done)?;
            }
            group = Some(IndexGroup {
                name: name.to_string(),
                tablespace: rec.opt_text("tablespace_name")?.unwrap_or("").to_string(),
                columns: Vec::new(),
            });
        }
        group
            .as_mut()
            .expect("open index group")
            .columns
            .push(rec.text("column_name")?.to_string());
    }

    if let Some(done) = group.take() {
        emit_index(policy, out, table_name, &done)?;
    }

    Ok(())
}

fn emit_index(
    policy: &IdentifierPolicy,
    out: &mut Dispatcher,
    table_name: &str,
    group: &IndexGroup,
) -> Result<()> {
    if policy.is_excluded(ObjectKind::Index, &group.name) {
        return Ok(());
    }
    if group
        .columns
        .iter()
        .any(|c| policy.is_column_excluded(table_name, c))
    {
        return Ok(());
    }

    let tablespace =
        policy.resolve_tablespace(ObjectKind::Index, &group.name, &group.tablespace, "TABLESPACE ");
    let target_index = policy.resolve(ObjectKind::Index, &group.name);
    let target_table = policy.resolve(ObjectKind::Table, table_name);
    let columns = group
        .columns
        .iter()
        .map(|c| policy.resolve_column(table_name, c))
        .collect::<Vec<_>>()
        .join(",");

    out.dispatch(&format!(
        "CREATE INDEX {} ON %%schema%%.{}({}) {};",
        target_index, target_table, columns, tablespace
    ))
}
