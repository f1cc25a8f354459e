//! `delete` — remove the row(s) matched by `{id | where}` (spec §4.4
//! "Write operations"). A row referenced by a physical foreign key
//! under the default `ON DELETE RESTRICT` fails with a
//! `ConstraintError`, surfaced by `From<rusqlite::Error>` classifying
//! the underlying SQLite code.

use reactive_core::errors::EngineResult;
use reactive_core::schema::CompiledSchema;
use rusqlite::{params, params_from_iter, Connection};

use crate::predicate::compile_where;
use crate::relational::{lookup_table, RowSelector, TableColumnResolver};

/// Returns the number of rows deleted.
pub fn delete(
    conn: &Connection,
    schema: &CompiledSchema,
    table_name: &str,
    selector: &RowSelector,
) -> EngineResult<u64> {
    let table = lookup_table(schema, table_name)?;

    let affected = match selector {
        RowSelector::Id(id) => {
            let sql = format!("DELETE FROM \"{table_name}\" WHERE _id = ?1");
            conn.execute(&sql, params![id])?
        }
        RowSelector::Where(where_clause) => {
            let resolver = TableColumnResolver { table };
            let compiled = compile_where(&resolver, where_clause)?;
            let sql = format!("DELETE FROM \"{table_name}\" WHERE {}", compiled.sql);
            conn.execute(&sql, params_from_iter(compiled.params.iter()))?
        }
    };
    Ok(affected as u64)
}
