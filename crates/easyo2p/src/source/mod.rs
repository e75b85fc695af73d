//! Oracle source catalog operations.

mod types;

pub use types::*;

use chrono::NaiveDateTime;
use oracle::sql_type::OracleType;
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::error::Result;

/// Trait for source catalog access.
///
/// The pipeline issues read-only introspection queries against the standard
/// `user_*` catalog views and bulk data queries, and consumes the results as
/// ordered rows with named columns. Implementations other than
/// [`OracleCatalog`] exist mainly so the pipeline can be driven from canned
/// result sets in tests.
pub trait Catalog {
    /// Execute a query and return the full ordered result set.
    fn query(&mut self, sql: &str) -> Result<Rows>;
}

/// Oracle catalog adapter over a single blocking connection.
pub struct OracleCatalog {
    conn: oracle::Connection,
}

impl OracleCatalog {
    /// Connect to the source database.
    pub fn connect(config: &SourceConfig) -> Result<Self> {
        let conn =
            oracle::Connection::connect(&config.username, &config.password, &config.connect)?;
        info!("Connected to Oracle: {}", config.connect);
        Ok(Self { conn })
    }
}

impl Catalog for OracleCatalog {
    fn query(&mut self, sql: &str) -> Result<Rows> {
        debug!("oracle query: {}", sql);
        let result = self.conn.query(sql, &[])?;

        let column_types: Vec<(String, OracleType)> = result
            .column_info()
            .iter()
            .map(|c| (c.name().to_lowercase(), c.oracle_type().clone()))
            .collect();
        let columns = column_types.iter().map(|(name, _)| name.clone()).collect();

        let mut rows = Vec::new();
        for row in result {
            let row = row?;
            let mut values = Vec::with_capacity(column_types.len());
            for (idx, (_, oracle_type)) in column_types.iter().enumerate() {
                values.push(convert_value(&row, idx, oracle_type)?);
            }
            rows.push(values);
        }

        Ok(Rows::new(columns, rows))
    }
}

/// Convert one Oracle value into the pipeline's value model.
fn convert_value(row: &oracle::Row, idx: usize, oracle_type: &OracleType) -> Result<SqlValue> {
    let value = match oracle_type {
        OracleType::Number(_, _)
        | OracleType::Float(_)
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble
        | OracleType::Int64
        | OracleType::UInt64 => row.get::<_, Option<String>>(idx)?.map(SqlValue::Number),
        OracleType::Date | OracleType::Timestamp(_) => row
            .get::<_, Option<NaiveDateTime>>(idx)?
            .map(SqlValue::Timestamp),
        OracleType::Raw(_) | OracleType::BLOB | OracleType::LongRaw => {
            row.get::<_, Option<Vec<u8>>>(idx)?.map(SqlValue::Bytes)
        }
        // VARCHAR2, CHAR, CLOB, LONG, timezone-aware timestamps and anything
        // else the catalog may produce are carried as text.
        _ => row.get::<_, Option<String>>(idx)?.map(SqlValue::Text),
    };

    Ok(value.unwrap_or(SqlValue::Null))
}
