//! Schema migration: plan (pure) then execute (transactional), tied
//! together as the single `apply_schema` entry point the engine calls.

pub mod execute;
pub mod plan;
pub mod rules;

use reactive_core::errors::EngineResult;
use reactive_core::schema::CompiledSchema;
use rusqlite::Connection;

pub use plan::{MigrationPlan, PlannedAction};
pub use rules::{MigrationRule, MigrationRules};

use crate::meta;

/// Bring the store's physical schema in line with `schema`, using
/// `rules` to resolve any table whose signature changed. A no-op plan
/// short-circuits before touching `_schema_meta`.
pub fn apply_schema(
    conn: &Connection,
    schema: &CompiledSchema,
    rules: &MigrationRules,
) -> EngineResult<MigrationPlan> {
    meta::ensure_meta_tables(conn)?;
    let old_meta = meta::read_schema_meta(conn)?;
    let physical = meta::physical_table_names(conn)?;

    let computed_plan = plan::plan_migration(&old_meta, &physical, schema, rules)?;
    execute::execute_plan(conn, schema, &computed_plan, rules)?;
    Ok(computed_plan)
}
