//! Row encode/decode: bridges a JSON payload to the physical column
//! set of a managed table (spec §3 "Row", §4.4 "Physical encoding").

use indexmap::IndexMap;
use reactive_core::errors::EngineResult;
use reactive_core::name_validator::validate_column_name;
use reactive_core::schema::CompiledTable;
use reactive_core::value::{decode_column, encode_column, SqlScalar};
use rusqlite::Row;

pub struct EncodedRow {
    pub fields: IndexMap<String, SqlScalar>,
    pub extras: serde_json::Value,
}

/// Validate and encode a JSON object against a table's declared
/// fields; unknown keys are collected into `extras` after their name
/// is validated (spec §4.4 "Unknown keys are put into `_extras` after
/// column-name validation").
pub fn encode_row(
    table: &CompiledTable,
    value: &serde_json::Map<String, serde_json::Value>,
) -> EngineResult<EncodedRow> {
    let mut fields = IndexMap::with_capacity(table.fields.len());
    for (name, field) in &table.fields {
        let scalar = encode_column(&field.base, field.optional, value.get(name), name)?;
        fields.insert(name.clone(), scalar);
    }

    let mut extras = serde_json::Map::new();
    for (key, val) in value {
        if table.fields.contains_key(key) {
            continue;
        }
        validate_column_name(key)?;
        extras.insert(key.clone(), val.clone());
    }

    Ok(EncodedRow {
        fields,
        extras: serde_json::Value::Object(extras),
    })
}

/// Decode one physical row (as read through the ordered column list
/// `_id, _createdAt, _updatedAt, _extras, <declared fields...>`) back
/// into the logical JSON row shape, with declared fields overriding
/// `_extras` on name collision (there should be none, by construction).
pub fn decode_row(table: &CompiledTable, row: &Row<'_>) -> EngineResult<serde_json::Value> {
    let id: String = row.get("_id")?;
    let created_at: String = row.get("_createdAt")?;
    let updated_at: String = row.get("_updatedAt")?;
    let extras_text: Option<String> = row.get("_extras")?;
    let extras: serde_json::Value = match extras_text {
        Some(text) if !text.is_empty() => serde_json::from_str(&text)?,
        _ => serde_json::Value::Object(Default::default()),
    };

    let mut out = serde_json::Map::new();
    if let serde_json::Value::Object(extras_map) = &extras {
        out.extend(extras_map.clone());
    }

    for (name, field) in &table.fields {
        let scalar = read_scalar(row, name)?;
        let decoded = decode_column(&field.base, field.optional, &scalar)?;
        out.insert(name.clone(), decoded);
    }

    out.insert("_id".to_string(), serde_json::Value::String(id));
    out.insert(
        "_createdAt".to_string(),
        serde_json::Value::String(created_at),
    );
    out.insert(
        "_updatedAt".to_string(),
        serde_json::Value::String(updated_at),
    );
    out.insert("_extras".to_string(), extras);

    Ok(serde_json::Value::Object(out))
}

fn read_scalar(row: &Row<'_>, column: &str) -> EngineResult<SqlScalar> {
    use rusqlite::types::ValueRef;
    let value_ref = row.get_ref(column)?;
    Ok(match value_ref {
        ValueRef::Null => SqlScalar::Null,
        ValueRef::Integer(i) => SqlScalar::Integer(i),
        ValueRef::Real(r) => SqlScalar::Real(r),
        ValueRef::Text(t) => SqlScalar::Text(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(_) => {
            return Err(reactive_core::EngineError::DatabaseError(
                format!("unexpected BLOB in column '{column}'"),
            ))
        }
    })
}
