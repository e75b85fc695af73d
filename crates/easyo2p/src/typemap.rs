//! Type mapping from Oracle column metadata to PostgreSQL column types.

/// Source column metadata as read from `user_tab_columns`.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    /// Source column name.
    pub name: String,

    /// Source data type (e.g. "NUMBER", "VARCHAR2", "TIMESTAMP(6)").
    pub data_type: String,

    /// Declared length for character types.
    pub length: Option<i64>,

    /// Numeric precision; `None` for unconstrained NUMBER.
    pub precision: Option<i64>,

    /// Numeric scale; `None` or zero both mean "no fractional digits".
    pub scale: Option<i64>,

    /// Whether the column allows NULL.
    pub nullable: bool,
}

/// Result of mapping one column type.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedType {
    /// Target column-type fragment, possibly carrying a CHECK clause.
    pub sql: String,

    /// False when the source type was not recognised and the UNKNOWN
    /// sentinel was emitted instead.
    pub known: bool,
}

/// Map an Oracle column to a PostgreSQL column-type fragment.
///
/// `target_name` is the already-resolved target column name (used inside
/// generated CHECK clauses). An operator-supplied `override_type` wins
/// unconditionally. Unrecognised types produce the `UNKNOWN` sentinel rather
/// than failing; the caller is expected to log and continue.
pub fn map_column(
    meta: &ColumnMeta,
    target_name: &str,
    override_type: Option<&str>,
    id_suffix: &str,
) -> MappedType {
    if let Some(explicit) = override_type {
        return MappedType {
            sql: explicit.to_string(),
            known: true,
        };
    }

    let data_type = meta.data_type.as_str();

    let sql = if matches!(
        data_type,
        "BINARY_DOUBLE" | "BINARY_FLOAT" | "FLOAT" | "NUMBER"
    ) {
        number_type(meta, target_name, id_suffix)
    } else if data_type.contains("CHAR") {
        format!("VARCHAR({})", meta.length.unwrap_or(0))
    } else if data_type == "DATE" {
        "TIMESTAMP(0)".to_string()
    } else if data_type.starts_with("TIMESTAMP") {
        data_type.to_string()
    } else if matches!(data_type, "CLOB" | "NCLOB" | "LONG") {
        "TEXT".to_string()
    } else if matches!(data_type, "BLOB" | "LONG RAW") {
        "BYTEA".to_string()
    } else {
        return MappedType {
            sql: "UNKNOWN".to_string(),
            known: false,
        };
    };

    MappedType { sql, known: true }
}

/// Convert the Oracle NUMBER family to a concrete PostgreSQL numeric type.
fn number_type(meta: &ColumnMeta, target_name: &str, id_suffix: &str) -> String {
    match meta.data_type.as_str() {
        "BINARY_FLOAT" => return "FLOAT(4)".to_string(),
        "BINARY_DOUBLE" | "FLOAT" => return "FLOAT(8)".to_string(),
        _ => {}
    }

    let precision = meta.precision.filter(|&p| p > 0);
    let scale = meta.scale.filter(|&s| s != 0);

    match (precision, scale) {
        (Some(p), Some(s)) => format!("NUMERIC({},{})", p, s),
        (Some(p), None) => {
            let mut sql = if meta.name.ends_with(id_suffix) {
                "INTEGER".to_string()
            } else if p < 5 {
                "SMALLINT".to_string()
            } else if p > 9 {
                "BIGINT".to_string()
            } else {
                "INTEGER".to_string()
            };
            // The target integer types are wider than the declared precision;
            // a range check preserves the source column's narrower contract.
            if p < 9 {
                sql.push_str(&format!(
                    " CHECK ({} < 1{})",
                    target_name,
                    "0".repeat(p as usize)
                ));
            }
            sql
        }
        _ => "NUMERIC".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(name: &str, precision: Option<i64>, scale: Option<i64>) -> ColumnMeta {
        ColumnMeta {
            name: name.to_string(),
            data_type: "NUMBER".to_string(),
            length: None,
            precision,
            scale,
            nullable: true,
        }
    }

    fn map(meta: &ColumnMeta) -> String {
        map_column(meta, &meta.name, None, "_ID").sql
    }

    #[test]
    fn precision_bands() {
        assert_eq!(map(&number("QTY", Some(4), None)), "SMALLINT CHECK (QTY < 10000)");
        assert_eq!(
            map(&number("QTY", Some(7), None)),
            "INTEGER CHECK (QTY < 10000000)"
        );
        // Threshold boundary: precision 9 keeps INTEGER but drops the check.
        assert_eq!(map(&number("QTY", Some(9), None)), "INTEGER");
        assert_eq!(map(&number("QTY", Some(10), None)), "BIGINT");
    }

    #[test]
    fn identifier_suffix_forces_integer() {
        assert_eq!(map(&number("EMP_ID", Some(12), None)), "INTEGER");
        assert_eq!(
            map(&number("DEPT_ID", Some(4), None)),
            "INTEGER CHECK (DEPT_ID < 10000)"
        );
    }

    #[test]
    fn precision_and_scale_give_numeric() {
        assert_eq!(map(&number("SAL", Some(7), Some(2))), "NUMERIC(7,2)");
        // Scale zero behaves like no scale.
        assert_eq!(map(&number("QTY", Some(10), Some(0))), "BIGINT");
        assert_eq!(map(&number("SAL", None, None)), "NUMERIC");
    }

    #[test]
    fn float_family() {
        let mut meta = number("X", None, None);
        meta.data_type = "BINARY_FLOAT".to_string();
        assert_eq!(map(&meta), "FLOAT(4)");
        meta.data_type = "BINARY_DOUBLE".to_string();
        assert_eq!(map(&meta), "FLOAT(8)");
        meta.data_type = "FLOAT".to_string();
        assert_eq!(map(&meta), "FLOAT(8)");
    }

    #[test]
    fn character_date_and_lob_types() {
        let mut meta = number("C", None, None);
        meta.data_type = "VARCHAR2".to_string();
        meta.length = Some(30);
        assert_eq!(map(&meta), "VARCHAR(30)");
        meta.data_type = "NCHAR".to_string();
        assert_eq!(map(&meta), "VARCHAR(30)");
        meta.data_type = "DATE".to_string();
        assert_eq!(map(&meta), "TIMESTAMP(0)");
        meta.data_type = "TIMESTAMP(6)".to_string();
        assert_eq!(map(&meta), "TIMESTAMP(6)");
        meta.data_type = "CLOB".to_string();
        assert_eq!(map(&meta), "TEXT");
        meta.data_type = "LONG RAW".to_string();
        assert_eq!(map(&meta), "BYTEA");
    }

    #[test]
    fn unknown_type_emits_sentinel() {
        let mut meta = number("X", None, None);
        meta.data_type = "SDO_GEOMETRY".to_string();
        let mapped = map_column(&meta, "X", None, "_ID");
        assert_eq!(mapped.sql, "UNKNOWN");
        assert!(!mapped.known);
    }

    #[test]
    fn explicit_override_wins() {
        let meta = number("SAL", Some(7), Some(2));
        let mapped = map_column(&meta, "SAL", Some("MONEY"), "_ID");
        assert_eq!(mapped.sql, "MONEY");
        assert!(mapped.known);
    }
}
