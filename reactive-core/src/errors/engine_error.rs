//! The stable error taxonomy for the engine boundary (spec §7).
//!
//! Names are the contract; codes are informative only.

/// Top-level error type for the storage engine. All subsystem errors
/// flow through this enum so the dispatcher and telemetry layer can
/// classify failures by stable name.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("constraint error: {0}")]
    ConstraintError(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatchError(String),

    #[error("schema load error: {0}")]
    SchemaLoadError(String),

    #[error("function resolution error: {0}")]
    FunctionResolutionError(String),

    #[error("collection not found: {name}")]
    CollectionNotFoundError { name: String },

    #[error("collection already exists: {name}")]
    CollectionAlreadyExistsError { name: String },

    #[error("database error: {0}")]
    DatabaseError(String),
}

/// Crate-wide result alias.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// The stable name of this error's kind (the part of the contract
    /// callers and telemetry may rely on).
    pub fn kind_name(&self) -> &'static str {
        match self {
            EngineError::ValidationError(_) => "ValidationError",
            EngineError::ConstraintError(_) => "ConstraintError",
            EngineError::SchemaMismatchError(_) => "SchemaMismatchError",
            EngineError::SchemaLoadError(_) => "SchemaLoadError",
            EngineError::FunctionResolutionError(_) => "FunctionResolutionError",
            EngineError::CollectionNotFoundError { .. } => "CollectionNotFoundError",
            EngineError::CollectionAlreadyExistsError { .. } => "CollectionAlreadyExistsError",
            EngineError::DatabaseError(_) => "DatabaseError",
        }
    }

    /// Informative numeric code. Not part of the stable contract.
    pub fn code(&self) -> u16 {
        match self {
            EngineError::ValidationError(_) => 1000,
            EngineError::ConstraintError(_) => 1100,
            EngineError::SchemaMismatchError(_) => 1200,
            EngineError::SchemaLoadError(_) => 1201,
            EngineError::FunctionResolutionError(_) => 1300,
            EngineError::CollectionNotFoundError { .. } => 1400,
            EngineError::CollectionAlreadyExistsError { .. } => 1401,
            EngineError::DatabaseError(_) => 1900,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::ValidationError(msg.into())
    }

    pub fn constraint(msg: impl Into<String>) -> Self {
        EngineError::ConstraintError(msg.into())
    }
}

/// Classify a raw `rusqlite` error into the engine's taxonomy, the same
/// way `cortex_storage::to_storage_err` collapses driver errors at the
/// storage boundary.
impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi::ErrorCode;
        if let rusqlite::Error::SqliteFailure(e, ref msg) = err {
            match e.code {
                ErrorCode::ConstraintViolation => {
                    return EngineError::ConstraintError(
                        msg.clone().unwrap_or_else(|| err.to_string()),
                    );
                }
                _ => {}
            }
        }
        EngineError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::ValidationError(format!("json: {err}"))
    }
}
