//! Transactional migration execution (spec §4.3 "Execution"): given a
//! plan produced by `plan_migration`, materialize the new schema inside
//! one transaction, verify referential integrity, then rewrite
//! `_schema_meta`/`_schema_state` to mirror it exactly.

use chrono::Utc;
use reactive_core::errors::{EngineError, EngineResult};
use reactive_core::schema::CompiledSchema;
use rusqlite::Connection;

use crate::ddl::{create_index_sql, create_table_sql};
use crate::meta;
use crate::migrator::plan::{MigrationPlan, PlannedAction};
use crate::migrator::rules::MigrationRules;
use crate::pragmas;
use crate::relational::encode_row;
use crate::remap::build_payload;

const STAGING_PREFIX: &str = "__migrating__";

/// Apply `plan` against `conn`. Foreign key enforcement is toggled off
/// for the duration (it is a no-op mid-transaction anyway) and verified
/// afterward with `PRAGMA foreign_key_check` before the transaction
/// commits, so a broken reference never reaches a committed state.
pub fn execute_plan(
    conn: &Connection,
    schema: &CompiledSchema,
    plan: &MigrationPlan,
    rules: &MigrationRules,
) -> EngineResult<()> {
    if plan.is_noop() {
        return Ok(());
    }

    pragmas::set_foreign_keys(conn, false)?;
    let result = run_plan_in_transaction(conn, schema, plan, rules);
    pragmas::set_foreign_keys(conn, true)?;
    result
}

fn run_plan_in_transaction(
    conn: &Connection,
    schema: &CompiledSchema,
    plan: &MigrationPlan,
    rules: &MigrationRules,
) -> EngineResult<()> {
    conn.execute_batch("BEGIN IMMEDIATE")?;

    if let Err(err) = materialize(conn, schema, plan, rules) {
        conn.execute_batch("ROLLBACK").ok();
        return Err(err);
    }

    if let Some(violation) = pragmas::foreign_key_check(conn)? {
        conn.execute_batch("ROLLBACK").ok();
        return Err(EngineError::SchemaMismatchError(violation));
    }

    let now = Utc::now().to_rfc3339();
    let meta_rows: Vec<(String, String)> = schema
        .tables
        .values()
        .map(|t| (t.name.clone(), t.signature.clone()))
        .collect();
    if let Err(err) = meta::write_schema_meta(conn, &meta_rows, &schema.signature, &now) {
        conn.execute_batch("ROLLBACK").ok();
        return Err(err);
    }

    conn.execute_batch("COMMIT")?;
    Ok(())
}

fn materialize(
    conn: &Connection,
    schema: &CompiledSchema,
    plan: &MigrationPlan,
    rules: &MigrationRules,
) -> EngineResult<()> {
    for action in &plan.actions {
        match action {
            PlannedAction::Unchanged { .. } => {}
            PlannedAction::Create { target } => {
                let table = &schema.tables[target];
                conn.execute_batch(&create_table_sql(target, table))?;
                for index in &table.indexes {
                    conn.execute_batch(&create_index_sql(target, &index.name, &index.columns))?;
                }
            }
            PlannedAction::Migrate { target, source } => {
                migrate_table(conn, schema, target, source, rules)?;
            }
        }
    }
    Ok(())
}

/// Copy every row of `source` into a freshly built `target`, remapping
/// fields per any matching rule, then swap `target` into place. When
/// `source == target` the source data must first be moved aside under
/// a staging name so the rebuild doesn't read from the table it is
/// replacing.
fn migrate_table(
    conn: &Connection,
    schema: &CompiledSchema,
    target: &str,
    source: &str,
    rules: &MigrationRules,
) -> EngineResult<()> {
    let target_table = &schema.tables[target];
    let rule = rules.get(target);

    let same_name = source == target;
    let read_from = if same_name {
        let staged = format!("{STAGING_PREFIX}{source}");
        conn.execute_batch(&format!(
            "ALTER TABLE \"{source}\" RENAME TO \"{staged}\""
        ))?;
        staged
    } else {
        source.to_string()
    };

    conn.execute_batch(&create_table_sql(target, target_table))?;

    let rows = read_rows(conn, &read_from)?;
    for row in rows {
        let payload = build_payload(&row, target_table, rule);
        let encoded = encode_row(target_table, &payload)?;
        insert_encoded(conn, target, &encoded)?;
    }

    conn.execute_batch(&format!("DROP TABLE \"{read_from}\""))?;

    for index in &target_table.indexes {
        conn.execute_batch(&create_index_sql(target, &index.name, &index.columns))?;
    }

    Ok(())
}

/// A source table during migration is read generically: every physical
/// column is decoded into a flat JSON scalar (the migrator doesn't know
/// the source's original declared types, only that it has the standard
/// `_id/_createdAt/_updatedAt/_extras` envelope plus arbitrary columns).
fn read_rows(
    conn: &Connection,
    table_name: &str,
) -> EngineResult<Vec<serde_json::Map<String, serde_json::Value>>> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM \"{table_name}\""))?;
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let mut rows_stmt = stmt.query([])?;

    let mut out = Vec::new();
    while let Some(row) = rows_stmt.next()? {
        let mut extras_map = serde_json::Map::new();
        let mut flat = serde_json::Map::new();
        for (idx, name) in column_names.iter().enumerate() {
            if name == "_extras" {
                let text: Option<String> = row.get(idx)?;
                if let Some(text) = text {
                    if !text.is_empty() {
                        if let serde_json::Value::Object(obj) = serde_json::from_str(&text)? {
                            extras_map.extend(obj);
                        }
                    }
                }
                continue;
            }
            let value = decode_generic_cell(row, idx)?;
            flat.insert(name.clone(), value);
        }
        flat.extend(extras_map);
        out.push(flat);
    }
    Ok(out)
}

fn decode_generic_cell(row: &rusqlite::Row<'_>, idx: usize) -> EngineResult<serde_json::Value> {
    use rusqlite::types::ValueRef;
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::json!(i),
        ValueRef::Real(r) => serde_json::json!(r),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(_) => serde_json::Value::Null,
    })
}

fn insert_encoded(
    conn: &Connection,
    table_name: &str,
    encoded: &crate::relational::EncodedRow,
) -> EngineResult<()> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    let mut columns = vec![
        "_id".to_string(),
        "_createdAt".to_string(),
        "_updatedAt".to_string(),
        "_extras".to_string(),
    ];
    let mut placeholders = vec!["?", "?", "?", "?"];
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![
        Box::new(id),
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
        "INSERT INTO \"{table_name}\" ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    conn.execute(&sql, rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrator::plan::plan_migration;
    use indexmap::IndexMap;
    use reactive_core::schema::{Schema, TableDefinition};
    use reactive_core::value::ValueDef;
    use std::collections::HashSet;

    #[test]
    fn create_action_builds_physical_table() {
        let mut fields = IndexMap::new();
        fields.insert("name".to_string(), ValueDef::String);
        let table = TableDefinition {
            name: "users".to_string(),
            fields,
            indexes: vec![],
        };
        let schema = reactive_core::schema::compile(&Schema::new().with_table(table)).unwrap();

        let conn = Connection::open_in_memory().unwrap();
        meta::ensure_meta_tables(&conn).unwrap();
        let plan = plan_migration(&[], &HashSet::new(), &schema, &MigrationRules::new()).unwrap();
        execute_plan(&conn, &schema, &plan, &MigrationRules::new()).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='users'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn migrating_same_name_table_preserves_rows_via_field_map() {
        let conn = Connection::open_in_memory().unwrap();
        meta::ensure_meta_tables(&conn).unwrap();

        let mut old_fields = IndexMap::new();
        old_fields.insert("name".to_string(), ValueDef::String);
        let old_table = TableDefinition {
            name: "users".to_string(),
            fields: old_fields,
            indexes: vec![],
        };
        let old_schema =
            reactive_core::schema::compile(&Schema::new().with_table(old_table)).unwrap();
        let create_plan =
            plan_migration(&[], &HashSet::new(), &old_schema, &MigrationRules::new()).unwrap();
        execute_plan(&conn, &old_schema, &create_plan, &MigrationRules::new()).unwrap();
        crate::relational::insert(
            &conn,
            &old_schema,
            "users",
            &serde_json::json!({"name": "Ada"}).as_object().unwrap().clone(),
        )
        .unwrap();

        let mut new_fields = IndexMap::new();
        new_fields.insert("fullName".to_string(), ValueDef::String);
        let new_table = TableDefinition {
            name: "users".to_string(),
            fields: new_fields,
            indexes: vec![],
        };
        let new_schema =
            reactive_core::schema::compile(&Schema::new().with_table(new_table)).unwrap();

        let old_meta = meta::read_schema_meta(&conn).unwrap();
        let physical = meta::physical_table_names(&conn).unwrap();

        let mut rules = MigrationRules::new();
        let mut rule = crate::migrator::rules::MigrationRule::default();
        rule.field_map.insert("fullName".to_string(), "name".to_string());
        rules.insert("users".to_string(), rule);

        let plan = plan_migration(&old_meta, &physical, &new_schema, &rules).unwrap();
        execute_plan(&conn, &new_schema, &plan, &rules).unwrap();

        let rows = crate::relational::list(
            &conn,
            &new_schema,
            "users",
            &serde_json::json!({}),
            &[],
            None,
            None,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["fullName"], serde_json::json!("Ada"));
    }
}
