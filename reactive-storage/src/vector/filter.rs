//! Metadata/document filtering for vector queries, reusing the same
//! predicate grammar as the relational engine (spec §6 "`where` filters
//! metadata, `whereDocument` filters the document text").

use reactive_core::errors::{EngineError, EngineResult};

use crate::predicate::{compile_where, ColumnResolver};

struct MetadataResolver;

impl ColumnResolver for MetadataResolver {
    fn resolve(&self, field: &str) -> String {
        format!("json_extract(metadata, '$.{field}')")
    }
}

/// Compile an optional `where` (metadata) clause and an optional
/// `whereDocument` substring match into one SQL boolean expression.
pub fn compile_item_filter(
    where_clause: Option<&serde_json::Value>,
    where_document: Option<&str>,
) -> EngineResult<(String, Vec<rusqlite::types::Value>)> {
    let mut parts = Vec::new();
    let mut params = Vec::new();

    if let Some(clause) = where_clause {
        let compiled = compile_where(&MetadataResolver, clause)?;
        parts.push(format!("({})", compiled.sql));
        params.extend(compiled.params);
    }

    if let Some(substring) = where_document {
        if substring.is_empty() {
            return Err(EngineError::validation("whereDocument must not be empty"));
        }
        parts.push("(document LIKE ?)".to_string());
        params.push(rusqlite::types::Value::Text(format!(
            "%{}%",
            substring.replace('%', "\\%").replace('_', "\\_")
        )));
    }

    if parts.is_empty() {
        Ok(("1=1".to_string(), vec![]))
    } else {
        Ok((parts.join(" AND "), params))
    }
}
