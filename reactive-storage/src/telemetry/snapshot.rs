//! The aggregate telemetry snapshot: a small side SQLite file
//! (conventionally named `dbstat.sqlite3`, though that filename is not
//! a contract callers should rely on) holding point-in-time counters.
//! Rewritten wholesale on each `write`, never appended to.

use std::path::Path;

use reactive_core::EngineResult;
use rusqlite::{params, Connection};

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub generated_at: String,
    pub table_row_counts: Vec<(String, i64)>,
    pub operation_counts: Vec<(String, i64)>,
}

pub struct SnapshotStore {
    conn: Option<Connection>,
}

impl Snapshot {
    /// Read the current snapshot back from a `dbstat.sqlite3`-style
    /// file. Returns `None` if no snapshot has ever been written there.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Option<Self>> {
        let conn = Connection::open(path.as_ref())?;
        let generated_at: Option<String> = conn
            .query_row("SELECT generated_at FROM snapshot_meta WHERE id = 1", [], |r| r.get(0))
            .ok();
        let Some(generated_at) = generated_at else {
            return Ok(None);
        };

        let mut table_stmt = conn.prepare("SELECT table_name, row_count FROM table_row_counts ORDER BY table_name ASC")?;
        let table_row_counts = table_stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut op_stmt = conn.prepare("SELECT operation, count FROM operation_counts ORDER BY operation ASC")?;
        let operation_counts = op_stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Snapshot {
            generated_at,
            table_row_counts,
            operation_counts,
        }))
    }
}

impl SnapshotStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        match Connection::open(path.as_ref()) {
            Ok(conn) => {
                if let Err(err) = init(&conn) {
                    tracing::warn!(error = %err, "failed to initialize telemetry snapshot store; disabling snapshots");
                    return Self { conn: None };
                }
                Self { conn: Some(conn) }
            }
            Err(err) => {
                tracing::warn!(path = %path.as_ref().display(), error = %err, "failed to open telemetry snapshot store; disabling snapshots");
                Self { conn: None }
            }
        }
    }

    pub fn disabled() -> Self {
        Self { conn: None }
    }

    pub fn write(&self, snapshot: &Snapshot) {
        let Some(conn) = &self.conn else { return };
        if let Err(err) = write_snapshot(conn, snapshot) {
            tracing::warn!(error = %err, "failed to write telemetry snapshot");
        }
    }
}

fn init(conn: &Connection) -> EngineResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS table_row_counts (table_name TEXT PRIMARY KEY, row_count INTEGER NOT NULL);
         CREATE TABLE IF NOT EXISTS operation_counts (operation TEXT PRIMARY KEY, count INTEGER NOT NULL);
         CREATE TABLE IF NOT EXISTS snapshot_meta (id INTEGER PRIMARY KEY CHECK (id = 1), generated_at TEXT NOT NULL);",
    )?;
    Ok(())
}

fn write_snapshot(conn: &Connection, snapshot: &Snapshot) -> EngineResult<()> {
    conn.execute_batch("DELETE FROM table_row_counts; DELETE FROM operation_counts;")?;
    for (table, count) in &snapshot.table_row_counts {
        conn.execute(
            "INSERT INTO table_row_counts (table_name, row_count) VALUES (?1, ?2)",
            params![table, count],
        )?;
    }
    for (operation, count) in &snapshot.operation_counts {
        conn.execute(
            "INSERT INTO operation_counts (operation, count) VALUES (?1, ?2)",
            params![operation, count],
        )?;
    }
    conn.execute(
        "INSERT INTO snapshot_meta (id, generated_at) VALUES (1, ?1)
         ON CONFLICT(id) DO UPDATE SET generated_at = excluded.generated_at",
        params![snapshot.generated_at],
    )?;
    Ok(())
}
