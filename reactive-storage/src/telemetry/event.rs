//! One JSON-lines telemetry event (spec §9 "Telemetry"). Telemetry is
//! best-effort: a failure to write it never surfaces as an operation
//! error, it only gets logged.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub timestamp: String,
    pub operation: String,
    pub table: Option<String>,
    pub duration_micros: u64,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum Outcome {
    Ok,
    Error { kind: String, message: String },
}

impl Event {
    pub fn ok(operation: impl Into<String>, table: Option<String>, duration_micros: u64, now: &str) -> Self {
        Self {
            timestamp: now.to_string(),
            operation: operation.into(),
            table,
            duration_micros,
            outcome: Outcome::Ok,
        }
    }

    pub fn error(
        operation: impl Into<String>,
        table: Option<String>,
        duration_micros: u64,
        now: &str,
        err: &reactive_core::EngineError,
    ) -> Self {
        Self {
            timestamp: now.to_string(),
            operation: operation.into(),
            table,
            duration_micros,
            outcome: Outcome::Error {
                kind: err.kind_name().to_string(),
                message: err.to_string(),
            },
        }
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
