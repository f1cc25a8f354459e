//! Pure migration planning (spec §4.3 "Planning"). No side effects: it
//! only classifies tables given the current meta snapshot, the
//! physical tables that actually exist, the new compiled schema, and
//! any declarative migration rules.

use std::collections::{HashMap, HashSet};

use reactive_core::errors::{EngineError, EngineResult};
use reactive_core::schema::CompiledSchema;

use crate::meta::SchemaMetaRow;
use crate::migrator::rules::MigrationRules;

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedAction {
    /// Signature unchanged and the physical table already exists.
    Unchanged { table: String },
    /// Brand-new table with no rows to migrate.
    Create { target: String },
    /// Copy rows from `source` into `target`, transforming per any
    /// matching migration rule.
    Migrate { target: String, source: String },
}

#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    pub actions: Vec<PlannedAction>,
    /// Tables dropped from management; their physical table is left
    /// untouched.
    pub removed: Vec<String>,
}

impl MigrationPlan {
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty()
            && self
                .actions
                .iter()
                .all(|a| matches!(a, PlannedAction::Unchanged { .. }))
    }
}

pub fn plan_migration(
    old_meta: &[SchemaMetaRow],
    physical_tables: &HashSet<String>,
    new_schema: &CompiledSchema,
    rules: &MigrationRules,
) -> EngineResult<MigrationPlan> {
    let old_sig_by_name: HashMap<&str, &str> = old_meta
        .iter()
        .map(|r| (r.table_name.as_str(), r.table_signature.as_str()))
        .collect();

    let removed: Vec<String> = old_sig_by_name
        .keys()
        .filter(|name| !new_schema.tables.contains_key(**name))
        .map(|s| s.to_string())
        .collect();

    let mut actions = Vec::new();
    let mut unchanged_names: HashSet<String> = HashSet::new();

    for (name, table) in &new_schema.tables {
        if let Some(old_sig) = old_sig_by_name.get(name.as_str()) {
            if *old_sig == table.signature && physical_tables.contains(name) {
                actions.push(PlannedAction::Unchanged {
                    table: name.clone(),
                });
                unchanged_names.insert(name.clone());
            }
        }
    }

    for target in rules.keys() {
        if unchanged_names.contains(target) {
            return Err(EngineError::SchemaMismatchError(format!(
                "migration rule targets unchanged table '{target}'"
            )));
        }
    }

    let mut used_sources: HashMap<String, String> = HashMap::new();

    for (name, table) in &new_schema.tables {
        if unchanged_names.contains(name) {
            continue;
        }

        let rule = rules.get(name);
        let source_name = rule
            .and_then(|r| r.from.clone())
            .or_else(|| physical_tables.contains(name).then(|| name.clone()));

        let was_managed = old_sig_by_name.contains_key(name.as_str());

        match source_name {
            Some(source) => {
                if unchanged_names.contains(&source) {
                    return Err(EngineError::SchemaMismatchError(format!(
                        "source table '{source}' is unchanged and cannot be used as a migration source"
                    )));
                }
                if let Some(existing_target) = used_sources.get(&source) {
                    return Err(EngineError::SchemaMismatchError(format!(
                        "source table '{source}' is mapped to two targets: '{existing_target}' and '{name}'"
                    )));
                }
                if let Some(r) = rule {
                    for field in r.field_map.keys().chain(r.defaults.keys()) {
                        if !table.fields.contains_key(field) {
                            return Err(EngineError::ValidationError(format!(
                                "migration rule for '{name}' references unknown target field '{field}'"
                            )));
                        }
                    }
                }
                used_sources.insert(source.clone(), name.clone());
                actions.push(PlannedAction::Migrate {
                    target: name.clone(),
                    source,
                });
            }
            None => {
                if was_managed {
                    return Err(EngineError::SchemaMismatchError(format!(
                        "managed table '{name}' is missing and no migration source was specified"
                    )));
                }
                actions.push(PlannedAction::Create {
                    target: name.clone(),
                });
            }
        }
    }

    Ok(MigrationPlan { actions, removed })
}
