//! Physical DDL generation for managed tables (spec §4.4 "Physical
//! encoding"): every managed table gets `_id/_createdAt/_updatedAt/_extras`
//! plus one column per declared field, with `Id` fields carrying a
//! physical foreign key (`ON DELETE RESTRICT ON UPDATE CASCADE`).

use reactive_core::schema::CompiledTable;
use reactive_core::value::ValueDef;

fn sql_type(def: &ValueDef) -> &'static str {
    match def {
        ValueDef::String | ValueDef::Id { .. } | ValueDef::Object { .. } => "TEXT",
        ValueDef::Number => "REAL",
        ValueDef::Boolean => "INTEGER",
        ValueDef::Optional { inner } => sql_type(inner),
    }
}

/// `CREATE TABLE` statement for a physical table named `physical_name`
/// (which may differ from `table.name` while a migration is using a
/// temporary staging name).
pub fn create_table_sql(physical_name: &str, table: &CompiledTable) -> String {
    let mut columns = vec![
        "_id TEXT PRIMARY KEY".to_string(),
        "_createdAt TEXT NOT NULL".to_string(),
        "_updatedAt TEXT NOT NULL".to_string(),
        "_extras TEXT".to_string(),
    ];
    let mut foreign_keys = Vec::new();

    for (name, field) in &table.fields {
        let ty = sql_type(&field.base);
        let nullability = if field.optional { "" } else { " NOT NULL" };
        columns.push(format!("\"{name}\" {ty}{nullability}"));
        if let ValueDef::Id { table: target } = &field.base {
            foreign_keys.push(format!(
                "FOREIGN KEY (\"{name}\") REFERENCES \"{target}\"(_id) ON DELETE RESTRICT ON UPDATE CASCADE"
            ));
        }
    }

    columns.extend(foreign_keys);

    format!(
        "CREATE TABLE \"{physical_name}\" ({})",
        columns.join(", ")
    )
}

/// `CREATE INDEX` statement for one declared index.
pub fn create_index_sql(physical_table: &str, index_name: &str, columns: &[String]) -> String {
    let cols = columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE INDEX \"{index_name}\" ON \"{physical_table}\" ({cols})"
    )
}
