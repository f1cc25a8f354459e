//! `get` / `first` / `list` / `count` (spec §4.4 "Read operations").

use reactive_core::errors::{EngineError, EngineResult};
use reactive_core::schema::CompiledSchema;
use rusqlite::{params, params_from_iter, Connection};

use crate::predicate::{compile_where, ColumnResolver};
use crate::relational::{decode_row, lookup_table, TableColumnResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One `orderBy` entry (spec §4.4 "Order and paging").
#[derive(Debug, Clone)]
pub struct OrderByClause {
    pub field: String,
    pub direction: SortDirection,
}

/// Parse a JSON `orderBy` argument: `null`/absent means no ordering is
/// requested, otherwise an array of `{field, direction?}` objects.
/// `direction` defaults to `asc` when omitted.
pub fn parse_order_by(value: &serde_json::Value) -> EngineResult<Vec<OrderByClause>> {
    match value {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(items) => items.iter().map(parse_order_by_clause).collect(),
        _ => Err(EngineError::validation("'orderBy' must be an array")),
    }
}

fn parse_order_by_clause(value: &serde_json::Value) -> EngineResult<OrderByClause> {
    let obj = value
        .as_object()
        .ok_or_else(|| EngineError::validation("each 'orderBy' entry must be an object"))?;
    let field = obj
        .get("field")
        .and_then(|v| v.as_str())
        .ok_or_else(|| EngineError::validation("'orderBy' entry is missing 'field'"))?
        .to_string();
    let direction = match obj.get("direction") {
        None => SortDirection::Asc,
        Some(serde_json::Value::String(s)) if s == "asc" => SortDirection::Asc,
        Some(serde_json::Value::String(s)) if s == "desc" => SortDirection::Desc,
        Some(_) => {
            return Err(EngineError::validation(
                "'orderBy' direction must be 'asc' or 'desc'",
            ))
        }
    };
    Ok(OrderByClause { field, direction })
}

fn order_by_sql(resolver: &dyn ColumnResolver, order_by: &[OrderByClause]) -> String {
    if order_by.is_empty() {
        return "\"_createdAt\" ASC".to_string();
    }
    order_by
        .iter()
        .map(|clause| format!("{} {}", resolver.resolve(&clause.field), clause.direction.keyword()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn get(
    conn: &Connection,
    schema: &CompiledSchema,
    table_name: &str,
    id: &str,
) -> EngineResult<Option<serde_json::Value>> {
    let table = lookup_table(schema, table_name)?;
    let sql = format!("SELECT * FROM \"{table_name}\" WHERE _id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(decode_row(table, row)?)),
        None => Ok(None),
    }
}

/// List rows matching `where_clause` (an empty object matches every
/// row), ordered by `order_by` (falling back to `_createdAt` ascending
/// when empty), optionally capped by `limit` and skipping `offset` rows.
/// An `offset` with no `limit` implies an unbounded limit.
pub fn list(
    conn: &Connection,
    schema: &CompiledSchema,
    table_name: &str,
    where_clause: &serde_json::Value,
    order_by: &[OrderByClause],
    limit: Option<u64>,
    offset: Option<u64>,
) -> EngineResult<Vec<serde_json::Value>> {
    let table = lookup_table(schema, table_name)?;
    let resolver = TableColumnResolver { table };
    let compiled = compile_where(&resolver, where_clause)?;

    let mut sql = format!(
        "SELECT * FROM \"{table_name}\" WHERE {} ORDER BY {}",
        compiled.sql,
        order_by_sql(&resolver, order_by)
    );
    match (limit, offset) {
        (Some(n), Some(o)) => sql.push_str(&format!(" LIMIT {n} OFFSET {o}")),
        (Some(n), None) => sql.push_str(&format!(" LIMIT {n}")),
        (None, Some(o)) => sql.push_str(&format!(" LIMIT -1 OFFSET {o}")),
        (None, None) => {}
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(compiled.params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(decode_row(table, row)?);
    }
    Ok(out)
}

/// The first row matching `where_clause` in `order_by` order, or `None`.
pub fn first(
    conn: &Connection,
    schema: &CompiledSchema,
    table_name: &str,
    where_clause: &serde_json::Value,
    order_by: &[OrderByClause],
) -> EngineResult<Option<serde_json::Value>> {
    Ok(list(conn, schema, table_name, where_clause, order_by, Some(1), None)?
        .into_iter()
        .next())
}

pub fn count(
    conn: &Connection,
    schema: &CompiledSchema,
    table_name: &str,
    where_clause: &serde_json::Value,
) -> EngineResult<i64> {
    let table = lookup_table(schema, table_name)?;
    let resolver = TableColumnResolver { table };
    let compiled = compile_where(&resolver, where_clause)?;
    let sql = format!("SELECT COUNT(*) FROM \"{table_name}\" WHERE {}", compiled.sql);
    let count: i64 = conn.query_row(&sql, params_from_iter(compiled.params.iter()), |row| row.get(0))?;
    Ok(count)
}
