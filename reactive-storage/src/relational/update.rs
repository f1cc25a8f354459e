//! `update` — full-replace of matched rows (spec §4.4 "Write
//! operations"). Every declared field in `value` is re-validated as if
//! it were a fresh insert; there is no merge with the row's current
//! contents, so an omitted required field fails the same way a missing
//! field on `insert` would. `_extras` is replaced wholesale by `value`'s
//! non-declared keys.

use chrono::Utc;
use reactive_core::errors::EngineResult;
use reactive_core::schema::CompiledSchema;
use rusqlite::{params_from_iter, Connection};

use crate::predicate::compile_where;
use crate::relational::{encode_row, lookup_table, RowSelector, TableColumnResolver};

/// Returns the number of rows changed.
pub fn update(
    conn: &Connection,
    schema: &CompiledSchema,
    table_name: &str,
    selector: &RowSelector,
    value: &serde_json::Map<String, serde_json::Value>,
) -> EngineResult<u64> {
    let table = lookup_table(schema, table_name)?;
    let encoded = encode_row(table, value)?;
    let now = Utc::now().to_rfc3339();

    let mut assignments = vec!["_updatedAt = ?".to_string(), "_extras = ?".to_string()];
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![
        Box::new(now),
        Box::new(serde_json::to_string(&encoded.extras)?),
    ];
    for (name, scalar) in &encoded.fields {
        assignments.push(format!("\"{name}\" = ?"));
        params.push(Box::new(scalar.clone()));
    }

    let where_sql = match selector {
        RowSelector::Id(id) => {
            params.push(Box::new(id.clone()));
            "_id = ?".to_string()
        }
        RowSelector::Where(where_clause) => {
            let resolver = TableColumnResolver { table };
            let compiled = compile_where(&resolver, where_clause)?;
            for param in compiled.params {
                params.push(Box::new(param));
            }
            compiled.sql
        }
    };

    let sql = format!(
        "UPDATE \"{table_name}\" SET {} WHERE {where_sql}",
        assignments.join(", ")
    );
    let affected = conn.execute(&sql, params_from_iter(params.iter().map(|p| p.as_ref())))?;
    Ok(affected as u64)
}
