//! Schema compiler (spec §4.2): validates a declared `Schema` and
//! derives a `CompiledSchema` carrying content-addressed signatures.

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::errors::{EngineError, EngineResult};
use crate::name_validator::{reject_reserved_column, validate_column_name, validate_table_name};
use crate::schema::types::{IndexDefinition, Schema, TableDefinition};
use crate::value::{UnwrappedField, ValueDef};

#[derive(Debug, Clone)]
pub struct CompiledTable {
    pub name: String,
    /// Declared fields with their `Optional` wrapper peeled off,
    /// insertion order preserved.
    pub fields: IndexMap<String, UnwrappedField>,
    pub indexes: Vec<IndexDefinition>,
    /// Content-addressed SHA-256 hex digest over this table's sorted
    /// canonical encoding.
    pub signature: String,
}

#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub tables: IndexMap<String, CompiledTable>,
    /// SHA-256 hex digest over the sorted map of per-table signatures.
    pub signature: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

fn canonical_table_json(table: &TableDefinition) -> serde_json::Value {
    let mut fields = serde_json::Map::new();
    for (name, def) in &table.fields {
        fields.insert(name.clone(), def.canonical_json());
    }

    let mut indexes: Vec<&IndexDefinition> = table.indexes.iter().collect();
    indexes.sort_by(|a, b| a.name.cmp(&b.name));
    let indexes_json: Vec<serde_json::Value> = indexes
        .iter()
        .map(|idx| serde_json::json!({"name": idx.name, "columns": idx.columns}))
        .collect();

    serde_json::json!({
        "fields": fields,
        "indexes": indexes_json,
    })
}

fn validate_table(table: &TableDefinition) -> EngineResult<IndexMap<String, UnwrappedField>> {
    validate_table_name(&table.name)?;

    let mut unwrapped = IndexMap::with_capacity(table.fields.len());
    for (field_name, def) in &table.fields {
        validate_column_name(field_name)?;
        reject_reserved_column(field_name)?;
        unwrapped.insert(field_name.clone(), def.unwrap_optional());
    }

    for index in &table.indexes {
        validate_table_name(&index.name)?;
        if index.columns.is_empty() {
            return Err(EngineError::validation(format!(
                "index '{}' on table '{}' must reference at least one column",
                index.name, table.name
            )));
        }
        for column in &index.columns {
            validate_column_name(column)?;
            if !table.fields.contains_key(column) {
                return Err(EngineError::validation(format!(
                    "index '{}' on table '{}' references unknown column '{}'",
                    index.name, table.name, column
                )));
            }
        }
    }

    Ok(unwrapped)
}

/// Recursively collect every `Id{table}` reference reachable from a
/// `ValueDef`, including those nested inside `Object` shapes.
fn collect_id_refs(def: &ValueDef, out: &mut Vec<String>) {
    match def {
        ValueDef::Id { table } => out.push(table.clone()),
        ValueDef::Object { shape } => {
            for child in shape.values() {
                collect_id_refs(child, out);
            }
        }
        ValueDef::Optional { inner } => collect_id_refs(inner, out),
        ValueDef::String | ValueDef::Number | ValueDef::Boolean => {}
    }
}

/// Compile a declared `Schema` into a `CompiledSchema`, validating
/// names, indexes, and id-reference targets per spec §4.2.
pub fn compile(schema: &Schema) -> EngineResult<CompiledSchema> {
    let mut tables = IndexMap::with_capacity(schema.tables.len());

    for (name, table) in &schema.tables {
        let fields = validate_table(table)?;
        let canonical = canonical_table_json(table);
        let signature = sha256_hex(canonical.to_string().as_bytes());
        tables.insert(
            name.clone(),
            CompiledTable {
                name: name.clone(),
                fields,
                indexes: table.indexes.clone(),
                signature,
            },
        );
    }

    // Step 4: every Id{table=T} must resolve within this schema.
    for table in schema.tables.values() {
        for def in table.fields.values() {
            let mut refs = Vec::new();
            collect_id_refs(def, &mut refs);
            for target in refs {
                if !schema.tables.contains_key(&target) {
                    return Err(EngineError::validation(format!(
                        "table '{}' field references unknown table '{}' via Id",
                        table.name, target
                    )));
                }
            }
        }
    }

    let mut sorted_sigs: Vec<(&String, &String)> =
        tables.iter().map(|(k, v)| (k, &v.signature)).collect();
    sorted_sigs.sort_by(|a, b| a.0.cmp(b.0));
    let schema_json: serde_json::Map<String, serde_json::Value> = sorted_sigs
        .into_iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect();
    let schema_signature = sha256_hex(serde_json::Value::Object(schema_json).to_string().as_bytes());

    Ok(CompiledSchema {
        tables,
        signature: schema_signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::TableDefinition;

    fn users_table() -> TableDefinition {
        let mut fields = IndexMap::new();
        fields.insert("name".to_string(), ValueDef::String);
        fields.insert("age".to_string(), ValueDef::Number);
        TableDefinition {
            name: "users".to_string(),
            fields,
            indexes: vec![IndexDefinition {
                name: "by_name".to_string(),
                columns: vec!["name".to_string()],
            }],
        }
    }

    #[test]
    fn compiles_a_simple_schema() {
        let schema = Schema::new().with_table(users_table());
        let compiled = compile(&schema).unwrap();
        assert!(compiled.tables.contains_key("users"));
        assert_eq!(compiled.tables["users"].fields.len(), 2);
    }

    #[test]
    fn rejects_unknown_id_target() {
        let mut fields = IndexMap::new();
        fields.insert("title".to_string(), ValueDef::String);
        fields.insert(
            "authorId".to_string(),
            ValueDef::Id {
                table: "users".to_string(),
            },
        );
        let posts = TableDefinition {
            name: "posts".to_string(),
            fields,
            indexes: vec![],
        };
        let schema = Schema::new().with_table(posts);
        assert!(compile(&schema).is_err());
    }

    #[test]
    fn rejects_index_on_missing_column() {
        let mut table = users_table();
        table.indexes.push(IndexDefinition {
            name: "bad_idx".to_string(),
            columns: vec!["nonexistent".to_string()],
        });
        let schema = Schema::new().with_table(table);
        assert!(compile(&schema).is_err());
    }

    #[test]
    fn rejects_empty_index_columns() {
        let mut table = users_table();
        table.indexes.push(IndexDefinition {
            name: "empty_idx".to_string(),
            columns: vec![],
        });
        let schema = Schema::new().with_table(table);
        assert!(compile(&schema).is_err());
    }

    #[test]
    fn signature_is_order_insensitive() {
        let mut fields_a = IndexMap::new();
        fields_a.insert("name".to_string(), ValueDef::String);
        fields_a.insert("age".to_string(), ValueDef::Number);
        let mut fields_b = IndexMap::new();
        fields_b.insert("age".to_string(), ValueDef::Number);
        fields_b.insert("name".to_string(), ValueDef::String);

        let table_a = TableDefinition {
            name: "users".to_string(),
            fields: fields_a,
            indexes: vec![],
        };
        let table_b = TableDefinition {
            name: "users".to_string(),
            fields: fields_b,
            indexes: vec![],
        };

        let schema_a = Schema::new().with_table(table_a);
        let schema_b = Schema::new().with_table(table_b);

        assert_eq!(
            compile(&schema_a).unwrap().signature,
            compile(&schema_b).unwrap().signature
        );
    }

    #[test]
    fn signature_changes_when_a_field_changes() {
        let schema_a = Schema::new().with_table(users_table());
        let mut table_b = users_table();
        table_b.fields.insert("email".to_string(), ValueDef::String);
        let schema_b = Schema::new().with_table(table_b);

        assert_ne!(
            compile(&schema_a).unwrap().signature,
            compile(&schema_b).unwrap().signature
        );
    }

    proptest::proptest! {
        #[test]
        fn signature_is_insensitive_to_field_declaration_order(
            field_names in proptest::collection::hash_set("[a-z]{1,8}", 1..6)
        ) {
            let names: Vec<String> = field_names.into_iter().collect();

            let mut forward = IndexMap::new();
            for name in &names {
                forward.insert(name.clone(), ValueDef::String);
            }
            let mut reversed = IndexMap::new();
            for name in names.iter().rev() {
                reversed.insert(name.clone(), ValueDef::String);
            }

            let schema_a = Schema::new().with_table(TableDefinition {
                name: "t".to_string(),
                fields: forward,
                indexes: vec![],
            });
            let schema_b = Schema::new().with_table(TableDefinition {
                name: "t".to_string(),
                fields: reversed,
                indexes: vec![],
            });

            prop_assert_eq!(
                compile(&schema_a).unwrap().signature,
                compile(&schema_b).unwrap().signature
            );
        }
    }
}
