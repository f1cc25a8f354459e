//! Connection-level PRAGMAs, applied once per opened connection.

use reactive_core::EngineResult;
use rusqlite::Connection;

/// Apply the baseline pragmas every connection needs: foreign key
/// enforcement on, WAL journaling for crash-safe commits, and a busy
/// timeout so a contended file-backed store doesn't fail fast under
/// transient lock contention.
pub fn apply_pragmas(conn: &Connection, busy_timeout_ms: u32) -> EngineResult<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms as u64))?;
    Ok(())
}

/// Toggle foreign key enforcement off for the duration of a migration.
/// `PRAGMA foreign_keys` is a no-op inside an active transaction, so
/// this must run before `BEGIN`.
pub fn set_foreign_keys(conn: &Connection, enabled: bool) -> EngineResult<()> {
    conn.pragma_update(None, "foreign_keys", if enabled { "ON" } else { "OFF" })?;
    Ok(())
}

/// `PRAGMA foreign_key_check` — returns a human-readable description of
/// the first violation found, if any.
pub fn foreign_key_check(conn: &Connection) -> EngineResult<Option<String>> {
    let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
    let mut rows = stmt.query([])?;
    if let Some(row) = rows.next()? {
        let table: String = row.get(0)?;
        return Ok(Some(format!("foreign key violation in table '{table}'")));
    }
    Ok(None)
}
