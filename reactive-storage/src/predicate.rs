//! The shared predicate DSL compiler (spec §4.4 "Predicate DSL" and
//! §4.5 "Filter engine" reuse this grammar against different column
//! sets: declared relational fields, or vector item metadata).

use reactive_core::errors::{EngineError, EngineResult};
use rusqlite::types::Value as SqlValue;
use serde_json::Value as Json;

/// Resolves a field name to a SQL column reference. Declared fields
/// (including the reserved `_id`/`_createdAt`/`_updatedAt` trio) map to
/// a real column; anything else resolves against a JSON blob column via
/// `json_extract` (spec: "unknown filter fields resolve against
/// `_extras` using a JSON path extract").
pub trait ColumnResolver {
    fn resolve(&self, field: &str) -> String;
}

/// One compiled `WHERE`-shaped clause: a SQL boolean expression plus
/// its bound parameters, in positional order.
pub struct Compiled {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

pub fn compile_where(resolver: &dyn ColumnResolver, value: &Json) -> EngineResult<Compiled> {
    compile_object(resolver, value)
}

fn compile_object(resolver: &dyn ColumnResolver, value: &Json) -> EngineResult<Compiled> {
    let obj = value
        .as_object()
        .ok_or_else(|| EngineError::validation("a where clause must be a JSON object"))?;

    if obj.is_empty() {
        return Ok(Compiled {
            sql: "1=1".to_string(),
            params: vec![],
        });
    }

    let mut parts = Vec::with_capacity(obj.len());
    let mut params = Vec::new();
    for (key, val) in obj {
        let compiled = compile_entry(resolver, key, val)?;
        parts.push(format!("({})", compiled.sql));
        params.extend(compiled.params);
    }

    Ok(Compiled {
        sql: parts.join(" AND "),
        params,
    })
}

fn compile_entry(resolver: &dyn ColumnResolver, key: &str, value: &Json) -> EngineResult<Compiled> {
    match key {
        "$and" => compile_bool_list(resolver, value, "AND", "1=1"),
        "$or" => compile_bool_list(resolver, value, "OR", "1=0"),
        field => compile_field(resolver, field, value),
    }
}

fn compile_bool_list(
    resolver: &dyn ColumnResolver,
    value: &Json,
    joiner: &str,
    empty_sql: &str,
) -> EngineResult<Compiled> {
    let arr = value
        .as_array()
        .ok_or_else(|| EngineError::validation(format!("'${joiner}' expects an array")))?;
    if arr.is_empty() {
        return Ok(Compiled {
            sql: empty_sql.to_string(),
            params: vec![],
        });
    }
    let mut parts = Vec::with_capacity(arr.len());
    let mut params = Vec::new();
    for sub in arr {
        let compiled = compile_object(resolver, sub)?;
        parts.push(format!("({})", compiled.sql));
        params.extend(compiled.params);
    }
    Ok(Compiled {
        sql: parts.join(&format!(" {joiner} ")),
        params,
    })
}

fn compile_field(resolver: &dyn ColumnResolver, field: &str, value: &Json) -> EngineResult<Compiled> {
    let column = resolver.resolve(field);
    if let Some(ops) = value.as_object() {
        if ops.is_empty() {
            return Ok(Compiled {
                sql: "1=1".to_string(),
                params: vec![],
            });
        }
        let mut parts = Vec::with_capacity(ops.len());
        let mut params = Vec::new();
        for (op, operand) in ops {
            let compiled = compile_operator(&column, op, operand)?;
            parts.push(compiled.sql);
            params.extend(compiled.params);
        }
        Ok(Compiled {
            sql: parts.join(" AND "),
            params,
        })
    } else {
        // Sugar for `$eq`.
        compile_operator(&column, "$eq", value)
    }
}

fn compile_operator(column: &str, op: &str, operand: &Json) -> EngineResult<Compiled> {
    match op {
        "$eq" if operand.is_null() => Ok(Compiled {
            sql: format!("{column} IS NULL"),
            params: vec![],
        }),
        "$eq" => Ok(Compiled {
            sql: format!("{column} = ?"),
            params: vec![json_to_sql(operand)?],
        }),
        "$ne" if operand.is_null() => Ok(Compiled {
            sql: format!("{column} IS NOT NULL"),
            params: vec![],
        }),
        "$ne" => Ok(Compiled {
            sql: format!("{column} != ?"),
            params: vec![json_to_sql(operand)?],
        }),
        "$gt" => binary_cmp(column, ">", operand),
        "$gte" => binary_cmp(column, ">=", operand),
        "$lt" => binary_cmp(column, "<", operand),
        "$lte" => binary_cmp(column, "<=", operand),
        "$in" => in_clause(column, operand, false),
        "$nin" => in_clause(column, operand, true),
        "$contains" => {
            let needle = operand
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| operand.to_string());
            let escaped = escape_like(&needle);
            Ok(Compiled {
                sql: format!("CAST({column} AS TEXT) LIKE ? ESCAPE '\\'"),
                params: vec![SqlValue::Text(format!("%{escaped}%"))],
            })
        }
        other => Err(EngineError::validation(format!("unknown operator '{other}'"))),
    }
}

fn binary_cmp(column: &str, op: &str, operand: &Json) -> EngineResult<Compiled> {
    Ok(Compiled {
        sql: format!("{column} {op} ?"),
        params: vec![json_to_sql(operand)?],
    })
}

fn in_clause(column: &str, operand: &Json, negate: bool) -> EngineResult<Compiled> {
    let arr = operand
        .as_array()
        .ok_or_else(|| EngineError::validation("'$in'/'$nin' expects an array"))?;
    if arr.is_empty() {
        return Ok(Compiled {
            sql: if negate { "1=1".to_string() } else { "1=0".to_string() },
            params: vec![],
        });
    }
    let placeholders = std::iter::repeat("?").take(arr.len()).collect::<Vec<_>>().join(", ");
    let params = arr.iter().map(json_to_sql).collect::<EngineResult<Vec<_>>>()?;
    let keyword = if negate { "NOT IN" } else { "IN" };
    Ok(Compiled {
        sql: format!("{column} {keyword} ({placeholders})"),
        params,
    })
}

fn json_to_sql(value: &Json) -> EngineResult<SqlValue> {
    match value {
        Json::Null => Ok(SqlValue::Null),
        Json::Bool(b) => Ok(SqlValue::Integer(*b as i64)),
        Json::Number(n) => n
            .as_f64()
            .map(SqlValue::Real)
            .ok_or_else(|| EngineError::validation("operand number out of range")),
        Json::String(s) => Ok(SqlValue::Text(s.clone())),
        Json::Array(_) | Json::Object(_) => {
            Err(EngineError::validation("operand must be a scalar"))
        }
    }
}

fn escape_like(input: &str) -> String {
    input.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatResolver;
    impl ColumnResolver for FlatResolver {
        fn resolve(&self, field: &str) -> String {
            format!("\"{field}\"")
        }
    }

    #[test]
    fn scalar_sugar_is_eq() {
        let compiled = compile_where(&FlatResolver, &serde_json::json!({"score": 10})).unwrap();
        assert_eq!(compiled.sql, "(\"score\" = ?)");
    }

    #[test]
    fn empty_and_is_tautology() {
        let compiled = compile_where(&FlatResolver, &serde_json::json!({"$and": []})).unwrap();
        assert_eq!(compiled.sql, "(1=1)");
    }

    #[test]
    fn empty_or_is_contradiction() {
        let compiled = compile_where(&FlatResolver, &serde_json::json!({"$or": []})).unwrap();
        assert_eq!(compiled.sql, "(1=0)");
    }

    #[test]
    fn empty_in_is_contradiction_empty_nin_is_tautology() {
        let in_c = compile_where(&FlatResolver, &serde_json::json!({"x": {"$in": []}})).unwrap();
        assert!(in_c.sql.contains("1=0"));
        let nin_c = compile_where(&FlatResolver, &serde_json::json!({"x": {"$nin": []}})).unwrap();
        assert!(nin_c.sql.contains("1=1"));
    }

    #[test]
    fn null_eq_becomes_is_null() {
        let compiled = compile_where(&FlatResolver, &serde_json::json!({"x": {"$eq": null}})).unwrap();
        assert!(compiled.sql.contains("IS NULL"));
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn unknown_operator_errors() {
        let err = compile_where(&FlatResolver, &serde_json::json!({"x": {"$bogus": 1}})).unwrap_err();
        assert_eq!(err.kind_name(), "ValidationError");
    }

    #[test]
    fn boolean_operand_normalizes_to_integer() {
        let compiled = compile_where(&FlatResolver, &serde_json::json!({"active": true})).unwrap();
        assert_eq!(compiled.params, vec![SqlValue::Integer(1)]);
    }
}
