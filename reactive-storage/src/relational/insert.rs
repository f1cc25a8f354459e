//! `insert` (spec §4.4 "Write operations").

use chrono::Utc;
use reactive_core::errors::{EngineError, EngineResult};
use reactive_core::schema::CompiledSchema;
use rusqlite::{params, params_from_iter, Connection};
use uuid::Uuid;

use crate::relational::{encode_row, lookup_table};

pub fn insert(
    conn: &Connection,
    schema: &CompiledSchema,
    table_name: &str,
    value: &serde_json::Map<String, serde_json::Value>,
) -> EngineResult<serde_json::Value> {
    let table = lookup_table(schema, table_name)?;

    let mut declared_value = value.clone();
    let supplied_id = declared_value.remove("_id");

    let encoded = encode_row(table, &declared_value)?;

    let id = match supplied_id {
        None | Some(serde_json::Value::Null) => Uuid::new_v4().to_string(),
        Some(serde_json::Value::String(s)) if !s.is_empty() => s,
        Some(_) => {
            return Err(EngineError::validation(
                "'_id' must be a non-empty string when supplied",
            ))
        }
    };

    let exists = match conn.query_row(
        &format!("SELECT 1 FROM \"{table_name}\" WHERE _id = ?1"),
        params![id],
        |_row| Ok(()),
    ) {
        Ok(()) => true,
        Err(rusqlite::Error::QueryReturnedNoRows) => false,
        Err(other) => return Err(other.into()),
    };
    if exists {
        return Err(EngineError::constraint("id already exists"));
    }

    let now = Utc::now().to_rfc3339();

    let mut columns = vec!["_id".to_string(), "_createdAt".to_string(), "_updatedAt".to_string(), "_extras".to_string()];
    let mut placeholders = vec!["?", "?", "?", "?"];
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![
        Box::new(id.clone()),
        Box::new(now.clone()),
        Box::new(now.clone()),
        Box::new(serde_json::to_string(&encoded.extras)?),
    ];

    for (name, scalar) in &encoded.fields {
        columns.push(format!("\"{name}\""));
        placeholders.push("?");
        params.push(Box::new(scalar.clone()));
    }

    let sql = format!(
        "INSERT INTO \"{table_name}\" ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );

    conn.execute(&sql, params_from_iter(params.iter().map(|p| p.as_ref())))?;

    super::get::get(conn, schema, table_name, &id)
        .map(|row| row.expect("row just inserted must be readable"))
}
