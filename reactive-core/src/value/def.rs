//! Value Definition — the tagged schema-side type description (spec §3).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A declared field type. `Optional` is the only nullability marker;
/// every other variant is implicitly required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValueDef {
    String,
    Number,
    Boolean,
    Id {
        table: String,
    },
    Object {
        shape: IndexMap<String, ValueDef>,
    },
    Optional {
        inner: Box<ValueDef>,
    },
}

/// A `ValueDef` with its `Optional` wrapper peeled off, as computed by
/// the schema compiler (spec §4.2 step 1).
#[derive(Debug, Clone, PartialEq)]
pub struct UnwrappedField {
    pub optional: bool,
    pub base: ValueDef,
}

impl ValueDef {
    /// Strip a single `Optional` layer, recording whether one was
    /// present. `Optional` never nests in declared schemas; a nested
    /// `Optional` is treated as if collapsed to one layer.
    pub fn unwrap_optional(&self) -> UnwrappedField {
        match self {
            ValueDef::Optional { inner } => {
                let mut unwrapped = inner.unwrap_optional();
                unwrapped.optional = true;
                unwrapped
            }
            other => UnwrappedField {
                optional: false,
                base: other.clone(),
            },
        }
    }

    /// Canonical JSON used as input to the schema/table signature hash:
    /// `Object` shape keys sorted, everything else encoded by tag.
    pub fn canonical_json(&self) -> serde_json::Value {
        match self {
            ValueDef::String => serde_json::json!({"type": "string"}),
            ValueDef::Number => serde_json::json!({"type": "number"}),
            ValueDef::Boolean => serde_json::json!({"type": "boolean"}),
            ValueDef::Id { table } => serde_json::json!({"type": "id", "table": table}),
            ValueDef::Object { shape } => {
                let mut sorted: Vec<(&String, &ValueDef)> = shape.iter().collect();
                sorted.sort_by(|a, b| a.0.cmp(b.0));
                let fields: serde_json::Map<String, serde_json::Value> = sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), v.canonical_json()))
                    .collect();
                serde_json::json!({"type": "object", "shape": fields})
            }
            ValueDef::Optional { inner } => {
                serde_json::json!({"type": "optional", "inner": inner.canonical_json()})
            }
        }
    }
}
