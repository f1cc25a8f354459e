//! The single store handle the engine serializes all operations
//! through (spec §5: "the engine holds exclusive ownership of one
//! store handle; all operations serialize through it").

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use reactive_core::EngineResult;
use rusqlite::Connection;

use crate::pragmas;

pub struct Handle {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    closed: std::sync::atomic::AtomicBool,
}

impl Handle {
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        pragmas::apply_pragmas(&conn, 5000)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
            closed: std::sync::atomic::AtomicBool::new(false),
        })
    }

    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        pragmas::apply_pragmas(&conn, 5000)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
            closed: std::sync::atomic::AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the underlying connection. Fails deterministically
    /// once the handle has been closed.
    pub fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> EngineResult<T>) -> EngineResult<T> {
        if self.closed.load(std::sync::atomic::Ordering::Acquire) {
            return Err(reactive_core::EngineError::DatabaseError(
                "store handle is closed".into(),
            ));
        }
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| reactive_core::EngineError::DatabaseError("connection mutex poisoned".into()))?;
        f(&mut guard)
    }

    /// Commit pending state and release the handle. Operations issued
    /// after `close` fail deterministically.
    pub fn close(&self) -> EngineResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);").ok();
            Ok(())
        })?;
        self.closed.store(true, std::sync::atomic::Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_roundtrip() {
        let handle = Handle::open_in_memory().unwrap();
        handle
            .with_conn(|conn| {
                conn.execute_batch("CREATE TABLE t (x INTEGER)")?;
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn closed_handle_rejects_operations() {
        let handle = Handle::open_in_memory().unwrap();
        handle.close().unwrap();
        let result = handle.with_conn(|_| Ok(()));
        assert!(result.is_err());
    }
}
