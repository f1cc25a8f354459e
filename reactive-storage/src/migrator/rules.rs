//! Declarative migration rules, keyed by target table name.

use std::collections::HashMap;

/// One target table's migration instructions.
#[derive(Debug, Clone, Default)]
pub struct MigrationRule {
    /// Physical source table to copy rows from. Defaults to the
    /// target's own name when omitted (spec §4.3 planning).
    pub from: Option<String>,
    /// target_field → source_field (or source extras key).
    pub field_map: HashMap<String, String>,
    /// target_field → JSON default used when no source value resolves.
    pub defaults: HashMap<String, serde_json::Value>,
}

/// All migration rules for one `apply_schema` call, keyed by the
/// *target* table name they construct.
pub type MigrationRules = HashMap<String, MigrationRule>;
