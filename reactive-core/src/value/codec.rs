//! Validate and encode/decode declared-field values against a
//! `ValueDef`, implementing the type rules of spec §3/§4.4.

use serde_json::Value as Json;

use crate::errors::{EngineError, EngineResult};
use crate::value::def::ValueDef;
use crate::value::scalar::SqlScalar;

/// Validate and encode one top-level declared field into its physical
/// representation. `input` is `None` when the caller's payload omitted
/// the key entirely; JSON `null` is treated the same as omission.
pub fn encode_column(
    def: &ValueDef,
    optional: bool,
    input: Option<&Json>,
    field_path: &str,
) -> EngineResult<SqlScalar> {
    let present = input.filter(|v| !v.is_null());
    let Some(value) = present else {
        if optional {
            return Ok(SqlScalar::Null);
        }
        return Err(EngineError::constraint(format!(
            "required field '{field_path}' is missing"
        )));
    };

    match def {
        ValueDef::String => value
            .as_str()
            .map(|s| SqlScalar::Text(s.to_string()))
            .ok_or_else(|| type_error(field_path, "string", value)),
        ValueDef::Number => value
            .as_f64()
            .map(SqlScalar::Real)
            .ok_or_else(|| type_error(field_path, "number", value)),
        ValueDef::Boolean => value
            .as_bool()
            .map(|b| SqlScalar::Integer(b as i64))
            .ok_or_else(|| type_error(field_path, "boolean", value)),
        ValueDef::Id { .. } => match value.as_str() {
            Some(s) if !s.is_empty() => Ok(SqlScalar::Text(s.to_string())),
            _ => Err(type_error(field_path, "id string", value)),
        },
        ValueDef::Object { shape } => {
            let obj = value
                .as_object()
                .ok_or_else(|| type_error(field_path, "object", value))?;
            let normalized = encode_object_shape(shape, obj, field_path)?;
            Ok(SqlScalar::Text(serde_json::to_string(&normalized)?))
        }
        ValueDef::Optional { inner } => {
            // A doubly-wrapped Optional collapses to its base type.
            encode_column(inner, true, Some(value), field_path)
        }
    }
}

/// Validate and normalize the contents of a nested `Object` field (or,
/// recursively, one of its own nested objects) into a JSON value, used
/// both to build the column payload and to re-validate on decode.
fn encode_object_shape(
    shape: &indexmap::IndexMap<String, ValueDef>,
    input: &serde_json::Map<String, Json>,
    field_path: &str,
) -> EngineResult<Json> {
    let mut out = serde_json::Map::with_capacity(shape.len());
    for (key, def) in shape {
        let child_path = format!("{field_path}.{key}");
        let unwrapped = def.unwrap_optional();
        let value = encode_json_field(
            &unwrapped.base,
            unwrapped.optional,
            input.get(key),
            &child_path,
        )?;
        out.insert(key.clone(), value);
    }
    for key in input.keys() {
        if !shape.contains_key(key) {
            return Err(EngineError::validation(format!(
                "unknown key '{key}' in object field '{field_path}'"
            )));
        }
    }
    Ok(Json::Object(out))
}

/// Like `encode_column` but returns a JSON value rather than a
/// `SqlScalar` — used for fields nested inside an `Object`, which stay
/// JSON-typed (booleans stay booleans) rather than collapsing to the
/// physical column encoding.
fn encode_json_field(
    def: &ValueDef,
    optional: bool,
    input: Option<&Json>,
    field_path: &str,
) -> EngineResult<Json> {
    let present = input.filter(|v| !v.is_null());
    let Some(value) = present else {
        if optional {
            return Ok(Json::Null);
        }
        return Err(EngineError::constraint(format!(
            "required field '{field_path}' is missing"
        )));
    };

    match def {
        ValueDef::String => {
            if value.is_string() {
                Ok(value.clone())
            } else {
                Err(type_error(field_path, "string", value))
            }
        }
        ValueDef::Number => {
            if value.is_number() {
                Ok(value.clone())
            } else {
                Err(type_error(field_path, "number", value))
            }
        }
        ValueDef::Boolean => {
            if value.is_boolean() {
                Ok(value.clone())
            } else {
                Err(type_error(field_path, "boolean", value))
            }
        }
        ValueDef::Id { .. } => match value.as_str() {
            Some(s) if !s.is_empty() => Ok(Json::String(s.to_string())),
            _ => Err(type_error(field_path, "id string", value)),
        },
        ValueDef::Object { shape } => {
            let obj = value
                .as_object()
                .ok_or_else(|| type_error(field_path, "object", value))?;
            encode_object_shape(shape, obj, field_path)
        }
        ValueDef::Optional { inner } => encode_json_field(inner, true, Some(value), field_path),
    }
}

/// Decode a physical column value back into JSON for a returned row.
pub fn decode_column(def: &ValueDef, optional: bool, scalar: &SqlScalar) -> EngineResult<Json> {
    if scalar.is_null() {
        return Ok(Json::Null);
    }
    let _ = optional;
    match def {
        ValueDef::String | ValueDef::Id { .. } => Ok(Json::String(
            scalar
                .as_text()
                .ok_or_else(|| EngineError::DatabaseError("expected TEXT column".into()))?
                .to_string(),
        )),
        ValueDef::Number => match scalar {
            SqlScalar::Real(r) => Ok(serde_json::json!(r)),
            SqlScalar::Integer(i) => Ok(serde_json::json!(*i as f64)),
            _ => Err(EngineError::DatabaseError("expected numeric column".into())),
        },
        ValueDef::Boolean => match scalar {
            SqlScalar::Integer(i) => Ok(Json::Bool(*i != 0)),
            _ => Err(EngineError::DatabaseError("expected boolean column".into())),
        },
        ValueDef::Object { .. } => {
            let text = scalar
                .as_text()
                .ok_or_else(|| EngineError::DatabaseError("expected JSON TEXT column".into()))?;
            Ok(serde_json::from_str(text)?)
        }
        ValueDef::Optional { inner } => decode_column(inner, true, scalar),
    }
}

fn type_error(field_path: &str, expected: &str, got: &Json) -> EngineError {
    EngineError::validation(format!(
        "field '{field_path}' expected {expected}, got {got}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn encodes_scalar_fields() {
        assert_eq!(
            encode_column(&ValueDef::String, false, Some(&serde_json::json!("hi")), "f").unwrap(),
            SqlScalar::Text("hi".into())
        );
        assert_eq!(
            encode_column(&ValueDef::Number, false, Some(&serde_json::json!(3.5)), "f").unwrap(),
            SqlScalar::Real(3.5)
        );
        assert_eq!(
            encode_column(&ValueDef::Boolean, false, Some(&serde_json::json!(true)), "f")
                .unwrap(),
            SqlScalar::Integer(1)
        );
    }

    #[test]
    fn missing_required_field_errors() {
        let err = encode_column(&ValueDef::String, false, None, "name").unwrap_err();
        assert_eq!(err.kind_name(), "ConstraintError");
    }

    #[test]
    fn missing_optional_field_is_null() {
        assert_eq!(
            encode_column(&ValueDef::String, true, None, "nickname").unwrap(),
            SqlScalar::Null
        );
    }

    #[test]
    fn nested_object_round_trips() {
        let mut shape = IndexMap::new();
        shape.insert("bio".to_string(), ValueDef::String);
        shape.insert(
            "score".to_string(),
            ValueDef::Optional {
                inner: Box::new(ValueDef::Number),
            },
        );
        let def = ValueDef::Object { shape };

        let input = serde_json::json!({"bio": "Engineer", "score": 7});
        let encoded = encode_column(&def, false, Some(&input), "profile").unwrap();
        let decoded = decode_column(&def, false, &encoded).unwrap();
        assert_eq!(decoded, serde_json::json!({"bio": "Engineer", "score": 7.0}));
    }

    #[test]
    fn nested_object_rejects_unknown_keys() {
        let mut shape = IndexMap::new();
        shape.insert("bio".to_string(), ValueDef::String);
        let def = ValueDef::Object { shape };
        let input = serde_json::json!({"bio": "x", "extra": 1});
        assert!(encode_column(&def, false, Some(&input), "profile").is_err());
    }

    #[test]
    fn boolean_round_trip_preserves_type() {
        let encoded =
            encode_column(&ValueDef::Boolean, false, Some(&serde_json::json!(false)), "f")
                .unwrap();
        let decoded = decode_column(&ValueDef::Boolean, false, &encoded).unwrap();
        assert_eq!(decoded, serde_json::json!(false));
    }
}
