//! Shared row-remapping algorithm used by both the `move` operation and
//! schema migration execution (spec §4.3/§4.4): given a decoded source
//! row and a target table's declared fields, resolve each target field
//! from a `fieldMap` entry, a default, or by falling through to the
//! source row's own value of the same name. Anything left over on the
//! source side passes through untouched, so it becomes the target row's
//! `_extras` once the result is handed to `encode_row`.

use reactive_core::schema::CompiledTable;

use crate::migrator::rules::MigrationRule;

const META_FIELDS: &[&str] = &["_id", "_createdAt", "_updatedAt", "_extras"];

pub fn build_payload(
    source_row: &serde_json::Map<String, serde_json::Value>,
    target: &CompiledTable,
    rule: Option<&MigrationRule>,
) -> serde_json::Map<String, serde_json::Value> {
    let mut working = source_row.clone();
    for meta in META_FIELDS {
        working.remove(*meta);
    }

    let mut out = serde_json::Map::new();

    for target_field in target.fields.keys() {
        let source_key = rule
            .and_then(|r| r.field_map.get(target_field))
            .cloned()
            .unwrap_or_else(|| target_field.clone());

        if let Some(value) = working.remove(&source_key) {
            out.insert(target_field.clone(), value);
            continue;
        }
        if let Some(default) = rule.and_then(|r| r.defaults.get(target_field)) {
            out.insert(target_field.clone(), default.clone());
        }
        // Otherwise the target field is left unset; `encode_row` will
        // reject it if it's required.
    }

    // Anything left in `working` was not consumed by a target-field
    // mapping. Merge it in without clobbering already-assigned target
    // fields, so it survives as `_extras` on the new row.
    for (key, value) in working {
        out.entry(key).or_insert(value);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use reactive_core::value::ValueDef;

    fn target_table(fields: &[(&str, ValueDef)]) -> CompiledTable {
        let mut f = IndexMap::new();
        for (name, def) in fields {
            f.insert(name.to_string(), def.clone().unwrap_optional());
        }
        CompiledTable {
            name: "target".to_string(),
            fields: f,
            indexes: vec![],
            signature: "irrelevant".to_string(),
        }
    }

    #[test]
    fn falls_through_to_same_named_source_field() {
        let target = target_table(&[("name", ValueDef::String)]);
        let mut source = serde_json::Map::new();
        source.insert("name".to_string(), serde_json::json!("Ada"));
        let payload = build_payload(&source, &target, None);
        assert_eq!(payload.get("name"), Some(&serde_json::json!("Ada")));
    }

    #[test]
    fn field_map_redirects_source_key() {
        let target = target_table(&[("fullName", ValueDef::String)]);
        let mut source = serde_json::Map::new();
        source.insert("name".to_string(), serde_json::json!("Ada"));
        let mut rule = MigrationRule::default();
        rule.field_map.insert("fullName".to_string(), "name".to_string());
        let payload = build_payload(&source, &target, Some(&rule));
        assert_eq!(payload.get("fullName"), Some(&serde_json::json!("Ada")));
        assert!(!payload.contains_key("name"));
    }

    #[test]
    fn default_fills_when_source_key_absent() {
        let target = target_table(&[("tier", ValueDef::String)]);
        let source = serde_json::Map::new();
        let mut rule = MigrationRule::default();
        rule.defaults.insert("tier".to_string(), serde_json::json!("free"));
        let payload = build_payload(&source, &target, Some(&rule));
        assert_eq!(payload.get("tier"), Some(&serde_json::json!("free")));
    }

    #[test]
    fn leftover_source_keys_survive_into_extras_without_clobbering() {
        let target = target_table(&[("fullName", ValueDef::String)]);
        let mut source = serde_json::Map::new();
        source.insert("name".to_string(), serde_json::json!("Ada"));
        source.insert("nickname".to_string(), serde_json::json!("Lovelace"));
        let mut rule = MigrationRule::default();
        rule.field_map.insert("fullName".to_string(), "name".to_string());
        let payload = build_payload(&source, &target, Some(&rule));
        assert_eq!(payload.get("fullName"), Some(&serde_json::json!("Ada")));
        assert_eq!(payload.get("nickname"), Some(&serde_json::json!("Lovelace")));
    }
}
