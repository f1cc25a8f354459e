//! `StorageEngine` — the top-level facade tying together the store
//! handle, the relational and vector engines, schema migration, and
//! telemetry (spec §5 "Engine").

use std::path::Path;
use std::sync::RwLock;
use std::time::Instant;

use chrono::Utc;
use reactive_core::errors::EngineResult;
use reactive_core::schema::{compile, CompiledSchema, Schema};

use crate::handle::Handle;
use crate::migrator::{apply_schema, MigrationPlan, MigrationRules};
use crate::relational;
use crate::telemetry::{Event, Snapshot, SnapshotStore, TelemetryLog};
use crate::transaction::run_transaction;
use crate::vector;

pub struct StorageEngine {
    handle: Handle,
    schema: RwLock<CompiledSchema>,
    telemetry_log: TelemetryLog,
    snapshot_store: SnapshotStore,
}

impl StorageEngine {
    /// Open (or create) a file-backed store, compile `schema`, and
    /// apply any pending migration before returning.
    pub fn open(
        path: impl AsRef<Path>,
        schema: &Schema,
        rules: &MigrationRules,
        telemetry_dir: Option<&Path>,
    ) -> EngineResult<Self> {
        let handle = Handle::open(path)?;
        Self::with_handle(handle, schema, rules, telemetry_dir)
    }

    pub fn open_in_memory(schema: &Schema, rules: &MigrationRules) -> EngineResult<Self> {
        let handle = Handle::open_in_memory()?;
        Self::with_handle(handle, schema, rules, None)
    }

    fn with_handle(
        handle: Handle,
        schema: &Schema,
        rules: &MigrationRules,
        telemetry_dir: Option<&Path>,
    ) -> EngineResult<Self> {
        let compiled = compile(schema)?;
        handle.with_conn(|conn| {
            vector::ensure_vector_tables(conn)?;
            apply_schema(conn, &compiled, rules)?;
            Ok(())
        })?;

        let (telemetry_log, snapshot_store) = match telemetry_dir {
            Some(dir) => (
                TelemetryLog::open(dir.join("telemetry.jsonl")),
                SnapshotStore::open(dir.join("dbstat.sqlite3")),
            ),
            None => (TelemetryLog::disabled(), SnapshotStore::disabled()),
        };

        Ok(Self {
            handle,
            schema: RwLock::new(compiled),
            telemetry_log,
            snapshot_store,
        })
    }

    pub fn schema(&self) -> CompiledSchema {
        self.schema.read().expect("schema lock poisoned").clone()
    }

    /// Re-plan and apply a new schema against the running store.
    pub fn apply_schema(&self, schema: &Schema, rules: &MigrationRules) -> EngineResult<MigrationPlan> {
        let compiled = compile(schema)?;
        let plan = self
            .handle
            .with_conn(|conn| apply_schema(conn, &compiled, rules))?;
        *self.schema.write().expect("schema lock poisoned") = compiled;
        Ok(plan)
    }

    pub fn insert(
        &self,
        table: &str,
        value: &serde_json::Map<String, serde_json::Value>,
    ) -> EngineResult<serde_json::Value> {
        self.timed("insert", Some(table.to_string()), || {
            let schema = self.schema();
            self.handle
                .with_conn(|conn| relational::insert(conn, &schema, table, value))
        })
    }

    pub fn get(&self, table: &str, id: &str) -> EngineResult<Option<serde_json::Value>> {
        self.timed("get", Some(table.to_string()), || {
            let schema = self.schema();
            self.handle.with_conn(|conn| relational::get(conn, &schema, table, id))
        })
    }

    pub fn list(
        &self,
        table: &str,
        where_clause: &serde_json::Value,
        order_by: &serde_json::Value,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> EngineResult<Vec<serde_json::Value>> {
        self.timed("list", Some(table.to_string()), || {
            let schema = self.schema();
            let order_by = relational::parse_order_by(order_by)?;
            self.handle.with_conn(|conn| {
                relational::list(conn, &schema, table, where_clause, &order_by, limit, offset)
            })
        })
    }

    pub fn first(
        &self,
        table: &str,
        where_clause: &serde_json::Value,
        order_by: &serde_json::Value,
    ) -> EngineResult<Option<serde_json::Value>> {
        self.timed("first", Some(table.to_string()), || {
            let schema = self.schema();
            let order_by = relational::parse_order_by(order_by)?;
            self.handle
                .with_conn(|conn| relational::first(conn, &schema, table, where_clause, &order_by))
        })
    }

    pub fn count(&self, table: &str, where_clause: &serde_json::Value) -> EngineResult<i64> {
        self.timed("count", Some(table.to_string()), || {
            let schema = self.schema();
            self.handle
                .with_conn(|conn| relational::count(conn, &schema, table, where_clause))
        })
    }

    pub fn update(
        &self,
        table: &str,
        selector: &relational::RowSelector,
        value: &serde_json::Map<String, serde_json::Value>,
    ) -> EngineResult<u64> {
        self.timed("update", Some(table.to_string()), || {
            let schema = self.schema();
            self.handle
                .with_conn(|conn| relational::update(conn, &schema, table, selector, value))
        })
    }

    pub fn delete(&self, table: &str, selector: &relational::RowSelector) -> EngineResult<u64> {
        self.timed("delete", Some(table.to_string()), || {
            let schema = self.schema();
            self.handle
                .with_conn(|conn| relational::delete(conn, &schema, table, selector))
        })
    }

    pub fn move_row(
        &self,
        source_table: &str,
        target_table: &str,
        id: &str,
        rule: Option<&crate::migrator::MigrationRule>,
    ) -> EngineResult<serde_json::Value> {
        self.timed("move", Some(target_table.to_string()), || {
            let schema = self.schema();
            self.handle.with_conn(|conn| {
                relational::move_row(conn, &schema, source_table, target_table, id, rule)
            })
        })
    }

    /// Run `f` inside one synchronous transaction.
    pub fn transaction<T>(&self, f: impl FnOnce(&rusqlite::Connection) -> EngineResult<T>) -> EngineResult<T> {
        self.timed("transaction", None, || run_transaction(&self.handle, f))
    }

    pub fn close(&self) -> EngineResult<()> {
        self.handle.close()
    }

    /// Recompute and persist the aggregate telemetry snapshot across
    /// every managed table.
    pub fn write_telemetry_snapshot(&self) -> EngineResult<()> {
        let schema = self.schema();
        let counts = self.handle.with_conn(|conn| {
            let mut out = Vec::new();
            for name in schema.tables.keys() {
                let count: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM \"{name}\""), [], |r| r.get(0))?;
                out.push((name.clone(), count));
            }
            Ok(out)
        })?;
        self.snapshot_store.write(&Snapshot {
            generated_at: Utc::now().to_rfc3339(),
            table_row_counts: counts,
            operation_counts: vec![],
        });
        Ok(())
    }

    fn timed<T>(
        &self,
        operation: &str,
        table: Option<String>,
        f: impl FnOnce() -> EngineResult<T>,
    ) -> EngineResult<T> {
        let start = Instant::now();
        let result = f();
        let duration_micros = start.elapsed().as_micros() as u64;
        let now = Utc::now().to_rfc3339();
        let event = match &result {
            Ok(_) => Event::ok(operation, table, duration_micros, &now),
            Err(err) => Event::error(operation, table, duration_micros, &now, err),
        };
        self.telemetry_log.record(&event);
        result
    }
}
