//! Table DDL generation: column definitions, primary/unique key constraints
//! and table/column comments.

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::orchestrator::Plan;
use crate::policy::{IdentifierPolicy, ObjectKind};
use crate::source::Catalog;
use crate::typemap::{self, ColumnMeta};

/// Emit the CREATE TABLE statement for `table_name`, followed by its key
/// constraints and comments as configured.
///
/// Returns the included source column names in emission order; the data
/// generator selects exactly these columns.
pub(crate) fn generate(
    catalog: &mut dyn Catalog,
    config: &Config,
    policy: &IdentifierPolicy,
    plan: &Plan,
    out: &mut Dispatcher,
    table_name: &str,
) -> Result<Vec<String>> {
    let columns = create_table(catalog, config, policy, plan, out, table_name)?;

    if config.migration.constraints {
        create_key_constraints(catalog, policy, out, table_name)?;
    }
    if config.migration.comments {
        create_table_comment(catalog, policy, out, table_name)?;
        create_column_comments(catalog, policy, out, table_name)?;
    }

    Ok(columns)
}

/// ORDER BY clause honouring a per-table column reorder list: listed columns
/// first in list order, unlisted ones after in catalog order.
fn column_order(config: &Config, table_name: &str) -> String {
    match config.migration.column_reorder.get(table_name) {
        Some(order) if !order.is_empty() => {
            let whens: String = order
                .iter()
                .enumerate()
                .map(|(i, column)| format!("WHEN '{}' THEN {} ", column, i))
                .collect();
            format!(
                "(CASE column_name {}ELSE {} END), column_id",
                whens,
                order.len()
            )
        }
        _ => "column_id".to_string(),
    }
}

fn create_table(
    catalog: &mut dyn Catalog,
    config: &Config,
    policy: &IdentifierPolicy,
    plan: &Plan,
    out: &mut Dispatcher,
    table_name: &str,
) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT column_name, data_type, data_length, data_precision, data_scale, nullable \
           FROM user_tab_columns \
          WHERE table_name = '{}' \
          ORDER BY {}",
        table_name,
        column_order(config, table_name)
    );

    let rows = catalog.query(&sql)?;
    let mut columns = Vec::new();
    let mut lines = Vec::new();

    for rec in rows.records() {
        let column_name = rec.text("column_name")?;
        if policy.is_column_excluded(table_name, column_name) {
            continue;
        }

        let target_column = policy.resolve_column(table_name, column_name);
        let tab_col = format!("{}.{}", table_name, column_name);

        let meta = ColumnMeta {
            name: column_name.to_string(),
            data_type: rec.text("data_type")?.to_string(),
            length: rec.opt_int("data_length")?,
            precision: rec.opt_int("data_precision")?,
            scale: rec.opt_int("data_scale")?,
            nullable: rec.opt_text("nullable")?.unwrap_or("Y") != "N",
        };

        let mapped = typemap::map_column(
            &meta,
            &target_column,
            plan.column_types.get(&tab_col).map(String::as_str),
            &config.migration.id_suffix,
        );
        if !mapped.known {
            out.log(&format!("Unknown column: {}, {}", tab_col, meta.data_type));
        }

        columns.push(column_name.to_string());

        let mut line = format!("{:<35}", format!(", {}", target_column));
        line.push_str(&mapped.sql);
        if !meta.nullable {
            line.push_str(" NOT NULL");
        }
        if let Some(sequence) = plan.sequence_bindings.get(&tab_col) {
            line.push_str(&format!(
                " DEFAULT NEXTVAL('%%schema%%.{}')",
                policy.resolve(ObjectKind::Sequence, sequence)
            ));
        }
        lines.push(line);
    }

    let joined = lines.join("\n");
    let body = joined.strip_prefix(',').unwrap_or(&joined);

    out.dispatch(&format!(
        "CREATE TABLE %%schema%%.{} \n({}\n) {}\n;\n",
        policy.resolve(ObjectKind::Table, table_name),
        body,
        plan.tablespace_clause
            .get(table_name)
            .map(String::as_str)
            .unwrap_or("")
    ))?;

    Ok(columns)
}

struct KeyGroup {
    name: String,
    constraint_type: String,
    tablespace: String,
    columns: Vec<String>,
}

/// Primary and unique key constraints, grouped by constraint name.
///
/// A composite key spans multiple catalog rows; a new group starts exactly
/// when the constraint name changes, and the trailing group is flushed once
/// the result set is exhausted.
fn create_key_constraints(
    catalog: &mut dyn Catalog,
    policy: &IdentifierPolicy,
    out: &mut Dispatcher,
    table_name: &str,
) -> Result<()> {
    let sql = format!(
        "SELECT uc.constraint_name, uc.constraint_type, ucc.column_name, ui.tablespace_name \
           FROM user_constraints uc, user_cons_columns ucc, user_indexes ui \
          WHERE uc.constraint_type IN ('P','U') \
            AND uc.table_name = '{}' \
            AND uc.constraint_name = ucc.constraint_name \
            AND uc.index_name = ui.index_name \
          ORDER BY uc.constraint_name, ucc.position",
        table_name
    );

    let rows = catalog.query(&sql)?;
    let mut group: Option<KeyGroup> = None;

    for rec in rows.records() {
        let name = rec.text("constraint_name")?;
        if group.as_ref().map(|g| g.name != name).unwrap_or(true) {
            if let Some(done) = group.take() {
                emit_key_constraint(policy, out, table_name, &done)?;
            }
            group = Some(KeyGroup {
                name: name.to_string(),
                constraint_type: rec.text("constraint_type")?.to_string(),
                tablespace: rec.opt_text("tablespace_name")?.unwrap_or("").to_string(),
                columns: Vec::new(),
            });
        }
        group
            .as_mut()
            .expect("open constraint group")
            .columns
            .push(rec.text("column_name")?.to_string());
    }

    if let Some(done) = group.take() {
        emit_key_constraint(policy, out, table_name, &done)?;
    }

    Ok(())
}

fn emit_key_constraint(
    policy: &IdentifierPolicy,
    out: &mut Dispatcher,
    table_name: &str,
    group: &KeyGroup,
) -> Result<()> {
    if policy.is_excluded(ObjectKind::Constraint, &group.name) {
        return Ok(());
    }
    // A constraint referencing an excluded column must vanish with it.
    if group
        .columns
        .iter()
        .any(|c| policy.is_column_excluded(table_name, c))
    {
        return Ok(());
    }

    let target_table = policy.resolve(ObjectKind::Table, table_name);
    let target_name = policy.resolve(ObjectKind::Constraint, &group.name);
    let columns = group
        .columns
        .iter()
        .map(|c| policy.resolve_column(table_name, c))
        .collect::<Vec<_>>()
        .join(",");
    let constraint_type = if group.constraint_type == "P" {
        "PRIMARY KEY"
    } else {
        "UNIQUE"
    };
    let tablespace = policy.resolve_tablespace(
        ObjectKind::Index,
        &group.name,
        &group.tablespace,
        " USING INDEX TABLESPACE ",
    );

    out.dispatch(&format!(
        "ALTER TABLE %%schema%%.{} ADD CONSTRAINT {} {} ({}){};",
        target_table, target_name, constraint_type, columns, tablespace
    ))
}

fn create_table_comment(
    catalog: &mut dyn Catalog,
    policy: &IdentifierPolicy,
    out: &mut Dispatcher,
    table_name: &str,
) -> Result<()> {
    let sql = format!(
        "SELECT REPLACE(comments, '''', '''''') comments \
           FROM user_tab_comments \
          WHERE table_name = '{}'",
        table_name
    );

    let target_table = policy.resolve(ObjectKind::Table, table_name);
    let rows = catalog.query(&sql)?;
    for rec in rows.records() {
        if let Some(comment) = rec.opt_text("comments")? {
            if comment.is_empty() {
                continue;
            }
            let comment = comment.replace('\n', " ");
            out.dispatch(&format!(
                "\nCOMMENT ON TABLE %%schema%%.{} IS '{}';\n",
                target_table, comment
            ))?;
        }
    }

    Ok(())
}

fn create_column_comments(
    catalog: &mut dyn Catalog,
    policy: &IdentifierPolicy,
    out: &mut Dispatcher,
    table_name: &str,
) -> Result<()> {
    let sql = format!(
        "SELECT column_name, REPLACE(comments, '''', '''''') comments \
           FROM user_col_comments \
          WHERE table_name = '{}'",
        table_name
    );

    let target_table = policy.resolve(ObjectKind::Table, table_name);
    let rows = catalog.query(&sql)?;
    for rec in rows.records() {
        let column_name = rec.text("column_name")?;
        if policy.is_column_excluded(table_name, column_name) {
            continue;
        }
        if let Some(comment) = rec.opt_text("comments")? {
            if comment.is_empty() {
                continue;
            }
            let target_column = policy.resolve_column(table_name, column_name);
            let comment = comment.replace('\n', " ");
            out.dispatch(&format!(
                "COMMENT ON COLUMN %%schema%%.{}.{} IS '{}';",
                target_table, target_column, comment
            ))?;
        }
    }

    Ok(())
}
