//! Vector item CRUD and nearest-neighbor query (spec §6 "Items").
//!
//! There is no ANN index: `query` does a full table scan of the
//! collection, computing cosine distance against every candidate row in
//! Rust, then sorts and truncates. Acceptable for the embedded,
//! single-process scale this engine targets; a real index is future
//! work if that stops being true.

use chrono::Utc;
use reactive_core::errors::{EngineError, EngineResult};
use rusqlite::{params, params_from_iter, Connection};
use uuid::Uuid;

use crate::vector::filter::compile_item_filter;
use crate::vector::similarity::cosine_distance;

#[derive(Debug, Clone, PartialEq)]
pub struct VectorItem {
    pub id: String,
    pub embedding: Vec<f64>,
    pub document: Option<String>,
    pub metadata: serde_json::Value,
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<VectorItem> {
    let embedding_text: String = row.get("embedding")?;
    let metadata_text: String = row.get("metadata")?;
    Ok(VectorItem {
        id: row.get("id")?,
        embedding: serde_json::from_str(&embedding_text).unwrap_or_default(),
        document: row.get("document")?,
        metadata: serde_json::from_str(&metadata_text).unwrap_or(serde_json::Value::Null),
    })
}

pub fn add_item(
    conn: &Connection,
    collection_id: &str,
    id: Option<String>,
    embedding: &[f64],
    document: Option<&str>,
    metadata: &serde_json::Value,
) -> EngineResult<String> {
    if embedding.is_empty() {
        return Err(EngineError::validation("embedding must not be empty"));
    }
    let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO _vector_items (id, collection_id, embedding, document, metadata, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            id,
            collection_id,
            serde_json::to_string(embedding)?,
            document,
            serde_json::to_string(metadata)?,
            now
        ],
    )?;
    Ok(id)
}

pub fn get_item(
    conn: &Connection,
    collection_id: &str,
    id: &str,
) -> EngineResult<Option<VectorItem>> {
    match conn.query_row(
        "SELECT id, embedding, document, metadata FROM _vector_items
         WHERE collection_id = ?1 AND id = ?2",
        params![collection_id, id],
        row_to_item,
    ) {
        Ok(item) => Ok(Some(item)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(other) => Err(other.into()),
    }
}

pub fn update_item(
    conn: &Connection,
    collection_id: &str,
    id: &str,
    embedding: Option<&[f64]>,
    document: Option<Option<&str>>,
    metadata: Option<&serde_json::Value>,
) -> EngineResult<()> {
    if get_item(conn, collection_id, id)?.is_none() {
        return Err(EngineError::validation(format!(
            "no vector item '{id}' in this collection"
        )));
    }

    let mut assignments = vec!["updated_at = ?".to_string()];
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(Utc::now().to_rfc3339())];

    if let Some(embedding) = embedding {
        assignments.push("embedding = ?".to_string());
        params.push(Box::new(serde_json::to_string(embedding)?));
    }
    if let Some(document) = document {
        assignments.push("document = ?".to_string());
        params.push(Box::new(document.map(|d| d.to_string())));
    }
    if let Some(metadata) = metadata {
        assignments.push("metadata = ?".to_string());
        params.push(Box::new(serde_json::to_string(metadata)?));
    }

    params.push(Box::new(collection_id.to_string()));
    params.push(Box::new(id.to_string()));

    let sql = format!(
        "UPDATE _vector_items SET {} WHERE collection_id = ? AND id = ?",
        assignments.join(", ")
    );
    conn.execute(&sql, params_from_iter(params.iter().map(|p| p.as_ref())))?;
    Ok(())
}

pub fn delete_item(conn: &Connection, collection_id: &str, id: &str) -> EngineResult<bool> {
    let affected = conn.execute(
        "DELETE FROM _vector_items WHERE collection_id = ?1 AND id = ?2",
        params![collection_id, id],
    )?;
    Ok(affected > 0)
}

pub fn count_items(
    conn: &Connection,
    collection_id: &str,
    where_clause: Option<&serde_json::Value>,
) -> EngineResult<i64> {
    let (filter_sql, filter_params) = compile_item_filter(where_clause, None)?;
    let sql = format!("SELECT COUNT(*) FROM _vector_items WHERE collection_id = ? AND ({filter_sql})");
    let mut bound: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(collection_id.to_string())];
    bound.extend(filter_params.into_iter().map(|v| Box::new(v) as Box<dyn rusqlite::ToSql>));
    let count: i64 = conn.query_row(
        &sql,
        params_from_iter(bound.iter().map(|p| p.as_ref())),
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Nearest-neighbor search: candidates are narrowed by `where`/
/// `whereDocument` in SQL, then ranked by cosine distance in Rust.
pub fn query(
    conn: &Connection,
    collection_id: &str,
    query_embedding: &[f64],
    n_results: usize,
    where_clause: Option<&serde_json::Value>,
    where_document: Option<&str>,
) -> EngineResult<Vec<(VectorItem, f64)>> {
    if query_embedding.is_empty() {
        return Err(EngineError::validation("query embedding must not be empty"));
    }

    let (filter_sql, filter_params) = compile_item_filter(where_clause, where_document)?;
    let sql = format!(
        "SELECT id, embedding, document, metadata FROM _vector_items
         WHERE collection_id = ? AND ({filter_sql})"
    );
    let mut bound: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(collection_id.to_string())];
    bound.extend(filter_params.into_iter().map(|v| Box::new(v) as Box<dyn rusqlite::ToSql>));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(bound.iter().map(|p| p.as_ref())), row_to_item)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut scored: Vec<(VectorItem, f64)> = rows
        .into_iter()
        .filter(|item| item.embedding.len() == query_embedding.len())
        .map(|item| {
            let distance = cosine_distance(query_embedding, &item.embedding);
            (item, distance)
        })
        .collect();

    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(n_results);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::collections::{create_collection, ensure_vector_tables};

    fn setup() -> (Connection, String) {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        ensure_vector_tables(&conn).unwrap();
        let collection = create_collection(&conn, "docs", &serde_json::json!({})).unwrap();
        (conn, collection.id)
    }

    #[test]
    fn add_then_get_round_trips() {
        let (conn, collection_id) = setup();
        let id = add_item(&conn, &collection_id, None, &[1.0, 0.0], Some("hello"), &serde_json::json!({"k": "v"})).unwrap();
        let item = get_item(&conn, &collection_id, &id).unwrap().unwrap();
        assert_eq!(item.embedding, vec![1.0, 0.0]);
        assert_eq!(item.document.as_deref(), Some("hello"));
    }

    #[test]
    fn query_orders_by_cosine_distance() {
        let (conn, collection_id) = setup();
        add_item(&conn, &collection_id, Some("near".into()), &[1.0, 0.0], None, &serde_json::json!({})).unwrap();
        add_item(&conn, &collection_id, Some("far".into()), &[0.0, 1.0], None, &serde_json::json!({})).unwrap();

        let results = query(&conn, &collection_id, &[1.0, 0.0], 2, None, None).unwrap();
        assert_eq!(results[0].0.id, "near");
        assert_eq!(results[1].0.id, "far");
    }

    #[test]
    fn query_respects_metadata_filter() {
        let (conn, collection_id) = setup();
        add_item(&conn, &collection_id, Some("a".into()), &[1.0, 0.0], None, &serde_json::json!({"tag": "keep"})).unwrap();
        add_item(&conn, &collection_id, Some("b".into()), &[1.0, 0.0], None, &serde_json::json!({"tag": "drop"})).unwrap();

        let results = query(
            &conn,
            &collection_id,
            &[1.0, 0.0],
            10,
            Some(&serde_json::json!({"tag": "keep"})),
            None,
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, "a");
    }

    #[test]
    fn delete_removes_item() {
        let (conn, collection_id) = setup();
        let id = add_item(&conn, &collection_id, None, &[1.0], None, &serde_json::json!({})).unwrap();
        assert!(delete_item(&conn, &collection_id, &id).unwrap());
        assert!(get_item(&conn, &collection_id, &id).unwrap().is_none());
    }
}
