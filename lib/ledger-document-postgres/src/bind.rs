//! Quoting, placeholder numbering and serde-based binding for PostgreSQL.
//!
//! Statements are assembled with the core crate's clause builders, which emit
//! positional `?` placeholders. [`number_placeholders`] rewrites them into
//! PostgreSQL's `$1, $2, ...` form before execution.

use ledger_document::LedgerError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgColumn, PgRow};
use sqlx::{Arguments, Column, Row};

fn bind_error(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Gateway(e.to_string())
}

/// Double-quote an identifier, doubling embedded quotes and dropping NULs.
pub fn quote_ident(identifier: &str) -> String {
    let escaped: String = identifier
        .chars()
        .filter(|c| *c != '\0')
        .collect::<String>()
        .replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Single-quote a string literal, doubling embedded quotes and dropping NULs.
pub fn quote_literal(literal: &str) -> String {
    let escaped: String = literal
        .chars()
        .filter(|c| *c != '\0')
        .collect::<String>()
        .replace('\'', "''");
    format!("'{}'", escaped)
}

/// Escape `LIKE` wildcards so `needle` only matches itself.
pub fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Replace each `?` outside quoted regions with `$1`, `$2`, ... in order.
///
/// Single-quoted literals and double-quoted identifiers are copied through
/// untouched; doubled quotes inside them need no special handling since they
/// close and immediately reopen the region.
pub fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote: Option<char> = None;
    let mut next = 1;

    for c in sql.chars() {
        match (quote, c) {
            (None, '?') => {
                out.push('$');
                out.push_str(&next.to_string());
                next += 1;
                continue;
            }
            (None, '\'' | '"') => quote = Some(c),
            (Some(open), _) if open == c => quote = None,
            _ => {}
        }
        out.push(c);
    }

    out
}

/// Build INSERT SQL for a table with the given columns.
pub(crate) fn build_insert_sql(table: &str, columns: &[&str]) -> String {
    let cols = columns.join(", ");
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        cols,
        placeholders.join(", ")
    )
}

/// Serialize `item` and bind the entries named by `columns`, in order.
///
/// Missing entries bind as typed NULLs.
pub(crate) fn bind_columns<T: Serialize>(
    args: &mut PgArguments,
    item: &T,
    columns: &[&str],
    column_types: &[&str],
) -> Result<(), LedgerError> {
    let json = serde_json::to_value(item)?;
    let obj = json
        .as_object()
        .ok_or_else(|| LedgerError::Gateway("Expected JSON object for row".to_string()))?;

    for (idx, column) in columns.iter().enumerate() {
        let value = obj.get(*column).cloned().unwrap_or(Value::Null);
        let col_type = column_types.get(idx).copied().unwrap_or("text");
        bind_json_value(args, &value, col_type)?;
    }
    Ok(())
}

/// Bind a JSON value to PgArguments as the given column type.
pub(crate) fn bind_json_value(
    args: &mut PgArguments,
    value: &Value,
    col_type: &str,
) -> Result<(), LedgerError> {
    if col_type == "jsonb" {
        return args.add(value.clone()).map_err(bind_error);
    }

    match value {
        Value::Null => match col_type {
            "datetime" => args.add(None::<chrono::DateTime<chrono::Utc>>),
            "bigint" => args.add(None::<i64>),
            "boolean" => args.add(None::<bool>),
            _ => args.add(None::<String>),
        }
        .map_err(bind_error),
        Value::Bool(b) => args.add(*b).map_err(bind_error),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                args.add(i).map_err(bind_error)
            } else if let Some(f) = n.as_f64() {
                args.add(f).map_err(bind_error)
            } else {
                args.add(n.to_string()).map_err(bind_error)
            }
        }
        Value::String(s) => {
            if col_type == "datetime" {
                let dt = chrono::DateTime::parse_from_rfc3339(s)
                    .map_err(|e| LedgerError::Gateway(format!("Invalid datetime: {}", e)))?;
                args.add(dt.with_timezone(&chrono::Utc)).map_err(bind_error)
            } else {
                args.add(s.as_str()).map_err(bind_error)
            }
        }
        Value::Array(_) | Value::Object(_) => args.add(value.clone()).map_err(bind_error),
    }
}

/// Deserialize a PostgreSQL row by name, column for column.
///
/// Null values are omitted so optional fields fall back to their defaults.
pub(crate) fn deserialize_row<T: DeserializeOwned>(row: &PgRow) -> Result<T, LedgerError> {
    let mut obj = serde_json::Map::new();
    for col in row.columns() {
        let value = extract_column_value(row, col)?;
        if !value.is_null() {
            obj.insert(col.name().to_string(), value);
        }
    }

    serde_json::from_value(Value::Object(obj))
        .map_err(|e| LedgerError::Gateway(format!("Deserialization error: {}", e)))
}

/// Extract a column value from a row as JSON
fn extract_column_value(row: &PgRow, col: &PgColumn) -> Result<Value, LedgerError> {
    use sqlx::TypeInfo;

    let col_idx = col.ordinal();
    let value = match col.type_info().name() {
        "BOOL" => {
            let v: Option<bool> = row.try_get(col_idx).map_err(bind_error)?;
            v.map(Value::Bool).unwrap_or(Value::Null)
        }
        "INT2" => {
            let v: Option<i16> = row.try_get(col_idx).map_err(bind_error)?;
            v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null)
        }
        "INT4" => {
            let v: Option<i32> = row.try_get(col_idx).map_err(bind_error)?;
            v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null)
        }
        "INT8" => {
            let v: Option<i64> = row.try_get(col_idx).map_err(bind_error)?;
            v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null)
        }
        "FLOAT4" => {
            let v: Option<f32> = row.try_get(col_idx).map_err(bind_error)?;
            v.and_then(|n| serde_json::Number::from_f64(f64::from(n)).map(Value::Number))
                .unwrap_or(Value::Null)
        }
        "FLOAT8" => {
            let v: Option<f64> = row.try_get(col_idx).map_err(bind_error)?;
            v.and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
                .unwrap_or(Value::Null)
        }
        "TIMESTAMPTZ" | "TIMESTAMP" => {
            let v: Option<chrono::DateTime<chrono::Utc>> =
                row.try_get(col_idx).map_err(bind_error)?;
            // Microsecond precision with Z, matching LedgerDatetime's serde format
            v.map(|dt| Value::String(dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)))
                .unwrap_or(Value::Null)
        }
        "JSONB" | "JSON" => {
            let v: Option<Value> = row.try_get(col_idx).map_err(bind_error)?;
            v.unwrap_or(Value::Null)
        }
        _ => {
            let v: Option<String> = row.try_get(col_idx).map_err(bind_error)?;
            v.map(Value::String).unwrap_or(Value::Null)
        }
    };

    Ok(value)
}
