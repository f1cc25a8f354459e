//! Declarative schema types (spec §3): `Schema`, `TableDefinition`,
//! `IndexDefinition`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::ValueDef;

/// A declared index: a name and an ordered, non-empty list of columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
}

/// A declared table: fields in insertion order (preserved for
/// deterministic test fixtures and migration field iteration), plus an
/// ordered list of indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub fields: IndexMap<String, ValueDef>,
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
}

/// A full declared schema: table name → table definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub tables: IndexMap<String, TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: TableDefinition) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }
}
