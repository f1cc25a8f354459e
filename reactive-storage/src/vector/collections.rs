//! Vector collection lifecycle (spec §6 "Collections").

use chrono::Utc;
use reactive_core::errors::{EngineError, EngineResult};
use reactive_core::name_validator::validate_table_name;
use rusqlite::{params, Connection};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct VectorCollection {
    pub id: String,
    pub name: String,
    pub metadata: serde_json::Value,
}

pub fn ensure_vector_tables(conn: &Connection) -> EngineResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _vector_collections (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            metadata TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS _vector_items (
            id TEXT PRIMARY KEY,
            collection_id TEXT NOT NULL REFERENCES _vector_collections(id) ON DELETE CASCADE,
            embedding TEXT NOT NULL,
            document TEXT,
            metadata TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS _vector_items_collection_idx
            ON _vector_items (collection_id);",
    )?;
    Ok(())
}

fn row_to_collection(row: &rusqlite::Row<'_>) -> rusqlite::Result<VectorCollection> {
    let metadata_text: String = row.get("metadata")?;
    Ok(VectorCollection {
        id: row.get("id")?,
        name: row.get("name")?,
        metadata: serde_json::from_str(&metadata_text).unwrap_or(serde_json::Value::Null),
    })
}

pub fn create_collection(
    conn: &Connection,
    name: &str,
    metadata: &serde_json::Value,
) -> EngineResult<VectorCollection> {
    validate_table_name(name)?;
    if get_collection(conn, name)?.is_some() {
        return Err(EngineError::CollectionAlreadyExistsError {
            name: name.to_string(),
        });
    }
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO _vector_collections (id, name, metadata, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, name, serde_json::to_string(metadata)?, now],
    )?;
    Ok(VectorCollection {
        id,
        name: name.to_string(),
        metadata: metadata.clone(),
    })
}

pub fn get_collection(conn: &Connection, name: &str) -> EngineResult<Option<VectorCollection>> {
    match conn.query_row(
        "SELECT id, name, metadata FROM _vector_collections WHERE name = ?1",
        params![name],
        row_to_collection,
    ) {
        Ok(row) => Ok(Some(row)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(other) => Err(other.into()),
    }
}

pub fn get_or_create_collection(
    conn: &Connection,
    name: &str,
    metadata: &serde_json::Value,
) -> EngineResult<VectorCollection> {
    if let Some(existing) = get_collection(conn, name)? {
        return Ok(existing);
    }
    create_collection(conn, name, metadata)
}

pub fn list_collections(conn: &Connection) -> EngineResult<Vec<VectorCollection>> {
    let mut stmt = conn.prepare("SELECT id, name, metadata FROM _vector_collections ORDER BY created_at ASC")?;
    let rows = stmt
        .query_map([], row_to_collection)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns `true` if a collection named `name` existed and was removed,
/// cascading to its items.
pub fn delete_collection(conn: &Connection, name: &str) -> EngineResult<bool> {
    let affected = conn.execute("DELETE FROM _vector_collections WHERE name = ?1", params![name])?;
    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        ensure_vector_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn create_then_get_round_trips() {
        let conn = setup();
        create_collection(&conn, "docs", &serde_json::json!({"dim": 3})).unwrap();
        let found = get_collection(&conn, "docs").unwrap().unwrap();
        assert_eq!(found.name, "docs");
    }

    #[test]
    fn duplicate_create_errors() {
        let conn = setup();
        create_collection(&conn, "docs", &serde_json::json!({})).unwrap();
        let err = create_collection(&conn, "docs", &serde_json::json!({})).unwrap_err();
        assert_eq!(err.kind_name(), "CollectionAlreadyExistsError");
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let conn = setup();
        let first = get_or_create_collection(&conn, "docs", &serde_json::json!({})).unwrap();
        let second = get_or_create_collection(&conn, "docs", &serde_json::json!({})).unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn delete_removes_collection() {
        let conn = setup();
        create_collection(&conn, "docs", &serde_json::json!({})).unwrap();
        assert!(delete_collection(&conn, "docs").unwrap());
        assert!(get_collection(&conn, "docs").unwrap().is_none());
    }
}
