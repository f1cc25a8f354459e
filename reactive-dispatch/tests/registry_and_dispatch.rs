//! Integration coverage tying the manifest scanner to the call
//! dispatcher against a real storage engine.

use std::fs;
use std::sync::Arc;

use indexmap::IndexMap;
use reactive_core::schema::{Schema, TableDefinition};
use reactive_core::value::ValueDef;
use reactive_dispatch::{scan, CallDispatcher, CallMode};
use reactive_storage::migrator::MigrationRules;
use reactive_storage::StorageEngine;

fn write_manifest(root: &std::path::Path, relative: &str, bindings: &[&str]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let bindings_toml = bindings
        .iter()
        .map(|b| format!("\"{b}\""))
        .collect::<Vec<_>>()
        .join(", ");
    fs::write(path, format!("bindings = [{bindings_toml}]\n")).unwrap();
}

fn users_schema() -> Schema {
    let mut fields = IndexMap::new();
    fields.insert("name".to_string(), ValueDef::String);
    Schema::new().with_table(TableDefinition {
        name: "users".to_string(),
        fields,
        indexes: vec![],
    })
}

#[test]
fn scanned_registry_drives_dispatch_against_a_live_engine() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "users/create.endpoint.toml", &["createUser"]);
    write_manifest(dir.path(), "users/index.endpoint.toml", &["list"]);

    let registry = scan(dir.path()).unwrap();
    assert!(registry.get("users.create.createUser").is_some());
    assert!(registry.get("users.list").is_some());

    let engine = StorageEngine::open_in_memory(&users_schema(), &MigrationRules::new()).unwrap();

    let mut args_shape = IndexMap::new();
    args_shape.insert("name".to_string(), ValueDef::String);

    let mut dispatcher = CallDispatcher::new();
    dispatcher.register(
        "users.create.createUser",
        CallMode::Mutation,
        Some(args_shape),
        Arc::new(|ctx, args| {
            ctx.require_mutation()?;
            let obj = args.as_object().unwrap();
            ctx.engine.insert("users", obj)
        }),
    );
    dispatcher.register(
        "users.list",
        CallMode::ReadOnly,
        None,
        Arc::new(|ctx, _args| {
            let rows = ctx
                .engine
                .list("users", &serde_json::json!({}), &serde_json::Value::Null, None, None)?;
            Ok(serde_json::Value::Array(rows))
        }),
    );

    let created = dispatcher
        .dispatch(&engine, "users.create.createUser", serde_json::json!({"name": "Ada"}))
        .unwrap();
    assert_eq!(created["name"], serde_json::json!("Ada"));

    let listed = dispatcher
        .dispatch(&engine, "users.list", serde_json::json!({}))
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[test]
fn read_only_endpoint_cannot_mutate_through_dispatch() {
    let engine = StorageEngine::open_in_memory(&users_schema(), &MigrationRules::new()).unwrap();

    let mut dispatcher = CallDispatcher::new();
    dispatcher.register(
        "users.sneakyWrite",
        CallMode::ReadOnly,
        None,
        Arc::new(|ctx, _args| {
            ctx.require_mutation()?;
            ctx.engine.insert("users", serde_json::json!({"name": "Eve"}).as_object().unwrap())
        }),
    );

    let err = dispatcher
        .dispatch(&engine, "users.sneakyWrite", serde_json::json!({}))
        .unwrap_err();
    assert_eq!(err.kind_name(), "ConstraintError");
    assert_eq!(engine.count("users", &serde_json::json!({})).unwrap(), 0);
}
