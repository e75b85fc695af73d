//! Bulk data export as batched INSERT statements.

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::policy::{IdentifierPolicy, ObjectKind};
use crate::source::{Catalog, SqlValue};

/// Emit the rows of `table_name` as INSERT statements of at most
/// `insert_rows` rows each.
///
/// `columns` are the source column names the table generator included, in
/// emission order.
pub(crate) fn generate(
    catalog: &mut dyn Catalog,
    config: &Config,
    policy: &IdentifierPolicy,
    out: &mut Dispatcher,
    table_name: &str,
    columns: &[String],
) -> Result<()> {
    if columns.is_empty() {
        return Ok(());
    }

    let sql = format!("SELECT {} FROM {}", columns.join(","), table_name);
    let rows = catalog.query(&sql)?;

    let target_table = policy.resolve(ObjectKind::Table, table_name);
    let target_columns = columns
        .iter()
        .map(|c| policy.resolve_column(table_name, c))
        .collect::<Vec<_>>()
        .join(",");

    let records: Vec<_> = rows.records().collect();
    for chunk in records.chunks(config.migration.insert_rows) {
        let values = chunk
            .iter()
            .map(|rec| {
                format!(
                    "({})",
                    rec.values()
                        .iter()
                        .map(literal)
                        .collect::<Vec<_>>()
                        .join(",")
                )
            })
            .collect::<Vec<_>>()
            .join(",\n");

        let cmd = format!(
            "INSERT INTO %%schema%%.{}({}) VALUES \n{}; \n",
            target_table, target_columns, values
        );
        // NUL bytes break both psql and the wire protocol.
        out.dispatch(&cmd.replace('\u{0}', ""))?;
    }

    Ok(())
}

/// Render one value as a PostgreSQL literal.
fn literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Number(n) => n.clone(),
        SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        SqlValue::Bytes(bytes) => format!("DECODE('{}', 'hex')", hex::encode(bytes)),
        SqlValue::Timestamp(ts) => format!(
            "TO_TIMESTAMP('{}','YYYYMMDDHH24MISS')",
            ts.format("%Y%m%d%H%M%S")
        ),
    }
}
