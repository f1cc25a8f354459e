//! Synchronous transactions (spec §5 "transactions run the caller's
//! callback to completion before any other operation may observe the
//! store"). The callback must be synchronous: the single `Handle`
//! mutex is held for its entire duration, so there is no way to await
//! anything mid-transaction without deadlocking the engine.

use reactive_core::errors::{EngineError, EngineResult};
use rusqlite::Connection;

use crate::handle::Handle;

/// Run `f` inside a `BEGIN IMMEDIATE` / `COMMIT` transaction. Any `Err`
/// returned by `f` rolls the transaction back and propagates unchanged.
pub fn run_transaction<T>(
    handle: &Handle,
    f: impl FnOnce(&Connection) -> EngineResult<T>,
) -> EngineResult<T> {
    handle.with_conn(|conn| {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(conn) {
            Ok(value) => {
                conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(err) => {
                conn.execute_batch("ROLLBACK").ok();
                Err(err)
            }
        }
    })
}

/// Reject a transaction callback that claims to be asynchronous. The
/// engine has no async runtime at the storage boundary; an async
/// handler reaching this point is a caller bug, not a retryable error.
pub fn reject_async_callback() -> EngineError {
    EngineError::validation(
        "transaction callbacks must be synchronous; async handlers are not supported",
    )
}
