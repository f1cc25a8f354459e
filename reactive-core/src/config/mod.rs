//! Engine configuration, loaded from TOML the way
//! `cortex_core::config::CortexConfig` is: `#[serde(default)]` on every
//! field so a partial file still produces a complete config.

use serde::{Deserialize, Serialize};

/// Configuration for the relational + vector storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `PRAGMA busy_timeout` in milliseconds.
    pub busy_timeout_ms: u32,
    /// Directory backups are written to; defaults to the store's own
    /// directory when unset.
    pub backup_dir: Option<String>,
    /// Directory the telemetry log and aggregate snapshot live in.
    pub telemetry_dir: String,
    /// Whether physical foreign keys are enforced outside migration.
    /// Always `true` in production; exposed for test harnesses.
    pub enforce_foreign_keys: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5000,
            backup_dir: None,
            telemetry_dir: ".reactive".to_string(),
            enforce_foreign_keys: true,
        }
    }
}

/// Configuration for the vector engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub default_n_results: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            default_n_results: 10,
        }
    }
}

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub storage: StorageConfig,
    pub vector: VectorConfig,
}

impl EngineConfig {
    /// Load config from a TOML string, falling back to defaults for
    /// missing fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = EngineConfig::from_toml("").unwrap();
        assert_eq!(cfg.storage.busy_timeout_ms, 5000);
        assert_eq!(cfg.vector.default_n_results, 10);
    }

    #[test]
    fn partial_toml_overrides_only_given_fields() {
        let cfg = EngineConfig::from_toml(
            r#"
            [storage]
            busy_timeout_ms = 9000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.storage.busy_timeout_ms, 9000);
        assert!(cfg.storage.enforce_foreign_keys);
    }
}
