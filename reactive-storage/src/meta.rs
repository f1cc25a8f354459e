//! `_schema_meta` / `_schema_state` — the only source of truth for
//! which physical tables are managed by the engine, and at which
//! signature (spec §4.3).

use std::collections::HashSet;

use reactive_core::EngineResult;
use rusqlite::{params, Connection};

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaMetaRow {
    pub table_name: String,
    pub table_signature: String,
}

pub fn ensure_meta_tables(conn: &Connection) -> EngineResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _schema_meta (
            table_name TEXT PRIMARY KEY,
            table_signature TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS _schema_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_signature TEXT NOT NULL,
            managed_tables TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}

pub fn read_schema_meta(conn: &Connection) -> EngineResult<Vec<SchemaMetaRow>> {
    let mut stmt = conn.prepare("SELECT table_name, table_signature FROM _schema_meta")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SchemaMetaRow {
                table_name: row.get(0)?,
                table_signature: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn read_schema_signature(conn: &Connection) -> EngineResult<Option<String>> {
    let result: Option<String> = conn
        .query_row(
            "SELECT schema_signature FROM _schema_state WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .ok();
    Ok(result)
}

pub fn physical_table_names(conn: &Connection) -> EngineResult<HashSet<String>> {
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(names)
}

/// Overwrite `_schema_meta`/`_schema_state` to mirror the compiled
/// schema exactly (spec invariant: "`_schema_meta` mirrors S exactly").
pub fn write_schema_meta(
    conn: &Connection,
    tables: &[(String, String)],
    schema_signature: &str,
    now: &str,
) -> EngineResult<()> {
    conn.execute("DELETE FROM _schema_meta", [])?;
    for (name, sig) in tables {
        conn.execute(
            "INSERT INTO _schema_meta (table_name, table_signature, updated_at) VALUES (?1, ?2, ?3)",
            params![name, sig, now],
        )?;
    }

    let managed_tables_json = serde_json::to_string(
        &tables.iter().map(|(n, _)| n.clone()).collect::<Vec<_>>(),
    )?;
    conn.execute(
        "INSERT INTO _schema_state (id, schema_signature, managed_tables, updated_at)
         VALUES (1, ?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
            schema_signature = excluded.schema_signature,
            managed_tables = excluded.managed_tables,
            updated_at = excluded.updated_at",
        params![schema_signature, managed_tables_json, now],
    )?;
    Ok(())
}
