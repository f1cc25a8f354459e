//! The relational engine: CRUD and query operations over managed
//! tables, built on top of `row::{encode_row, decode_row}` and the
//! shared predicate compiler.

mod delete;
mod get;
mod insert;
mod move_op;
mod row;
mod update;

pub use delete::delete;
pub use get::{count, first, get, list, parse_order_by, OrderByClause, SortDirection};
pub use insert::insert;
pub use move_op::move_row;
pub use row::EncodedRow;
pub use update::update;

pub(crate) use row::{decode_row, encode_row};

use reactive_core::errors::{EngineError, EngineResult};
use reactive_core::schema::CompiledTable;

use crate::predicate::ColumnResolver;

/// Selects the row(s) an `update`/`delete` call targets — exactly one
/// of `id` or `where` (spec §4.4 "requires exactly one of `id` or
/// `where`").
pub enum RowSelector {
    Id(String),
    Where(serde_json::Value),
}

/// Resolves a logical field name against one table's declared columns,
/// falling back to a `json_extract` lookup into `_extras`.
pub(crate) struct TableColumnResolver<'a> {
    pub table: &'a CompiledTable,
}

const META_COLUMNS: &[&str] = &["_id", "_createdAt", "_updatedAt"];

impl<'a> ColumnResolver for TableColumnResolver<'a> {
    fn resolve(&self, field: &str) -> String {
        if META_COLUMNS.contains(&field) || self.table.fields.contains_key(field) {
            format!("\"{field}\"")
        } else {
            format!("json_extract(_extras, '$.{field}')")
        }
    }
}

pub(crate) fn lookup_table<'a>(
    schema: &'a reactive_core::schema::CompiledSchema,
    name: &str,
) -> EngineResult<&'a CompiledTable> {
    schema
        .tables
        .get(name)
        .ok_or_else(|| EngineError::CollectionNotFoundError {
            name: name.to_string(),
        })
}
