//! `move` — relocate a row from one managed table to another, reusing
//! the same field-mapping algorithm as schema migration (spec §4.4
//! "move reuses the migration rule shape").

use chrono::Utc;
use reactive_core::errors::{EngineError, EngineResult};
use reactive_core::schema::CompiledSchema;
use rusqlite::{params_from_iter, Connection};
use uuid::Uuid;

use crate::migrator::rules::MigrationRule;
use crate::relational::{encode_row, lookup_table};
use crate::remap::build_payload;

/// Move the row at `id` in `source_table` into `target_table`, deleting
/// it from the source. Returns the newly created row in its target
/// shape. Callers that need atomicity with other writes should run this
/// inside their own transaction.
pub fn move_row(
    conn: &Connection,
    schema: &CompiledSchema,
    source_table: &str,
    target_table: &str,
    id: &str,
    rule: Option<&MigrationRule>,
) -> EngineResult<serde_json::Value> {
    let target = lookup_table(schema, target_table)?;

    let source_row = super::get::get(conn, schema, source_table, id)?.ok_or_else(|| {
        EngineError::validation(format!("no row with id '{id}' in table '{source_table}'"))
    })?;
    let source_obj = source_row
        .as_object()
        .expect("decode_row always returns a JSON object");

    let payload = build_payload(source_obj, target, rule);
    let encoded = encode_row(target, &payload)?;

    let new_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    let mut columns = vec!["_id".to_string(), "_createdAt".to_string(), "_updatedAt".to_string(), "_extras".to_string()];
    let mut placeholders = vec!["?", "?", "?", "?"];
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![
        Box::new(new_id.clone()),
        Box::new(now.clone()),
        Box::new(now),
        Box::new(serde_json::to_string(&encoded.extras)?),
    ];
    for (name, scalar) in &encoded.fields {
        columns.push(format!("\"{name}\""));
        placeholders.push("?");
        params.push(Box::new(scalar.clone()));
    }

    let sql = format!(
        "INSERT INTO \"{target_table}\" ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    conn.execute(&sql, params_from_iter(params.iter().map(|p| p.as_ref())))?;

    conn.execute(
        &format!("DELETE FROM \"{source_table}\" WHERE _id = ?1"),
        rusqlite::params![id],
    )?;

    super::get::get(conn, schema, target_table, &new_id)
        .map(|row| row.expect("row just inserted must be readable"))
}
