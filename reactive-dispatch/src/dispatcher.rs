//! The call dispatcher: resolves a registered endpoint name, validates
//! its arguments against a declared shape, builds a call context, and
//! invokes the handler (spec §6 "Call dispatch").

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use reactive_core::errors::{EngineError, EngineResult};
use reactive_core::value::{encode_column, ValueDef};
use reactive_storage::StorageEngine;

/// Whether a call is permitted to mutate the store. Read-only calls
/// reject any handler that would otherwise insert/update/delete/move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    ReadOnly,
    Mutation,
}

pub struct CallContext<'a> {
    pub engine: &'a StorageEngine,
    pub mode: CallMode,
}

impl<'a> CallContext<'a> {
    /// Returns an error unless this call was dispatched in `Mutation`
    /// mode. Handlers that write call this before touching the store.
    pub fn require_mutation(&self) -> EngineResult<()> {
        if self.mode == CallMode::Mutation {
            Ok(())
        } else {
            Err(EngineError::constraint("Query context is read-only"))
        }
    }
}

pub type Handler = Arc<dyn Fn(&CallContext, serde_json::Value) -> EngineResult<serde_json::Value> + Send + Sync>;

#[derive(Default)]
pub struct CallDispatcher {
    handlers: HashMap<String, RegisteredHandler>,
}

struct RegisteredHandler {
    handler: Handler,
    args_shape: Option<IndexMap<String, ValueDef>>,
    mode: CallMode,
}

impl CallDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`. `args_shape` is an optional
    /// declared argument schema, validated the same way a relational
    /// record field is validated before the handler ever sees it.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        mode: CallMode,
        args_shape: Option<IndexMap<String, ValueDef>>,
        handler: Handler,
    ) {
        self.handlers.insert(
            name.into(),
            RegisteredHandler {
                handler,
                args_shape,
                mode,
            },
        );
    }

    pub fn dispatch(
        &self,
        engine: &StorageEngine,
        name: &str,
        args: serde_json::Value,
    ) -> EngineResult<serde_json::Value> {
        let registered = self
            .handlers
            .get(name)
            .ok_or_else(|| EngineError::FunctionResolutionError(format!("no endpoint named '{name}'")))?;

        if let Some(shape) = &registered.args_shape {
            validate_args(shape, &args)?;
        }

        let context = CallContext {
            engine,
            mode: registered.mode,
        };
        (registered.handler)(&context, args)
    }
}

/// Validate a call's argument object against a declared shape, reusing
/// the same per-field encode path the relational engine uses for row
/// payloads (spec invariant: argument validation mirrors record
/// validation).
fn validate_args(shape: &IndexMap<String, ValueDef>, args: &serde_json::Value) -> EngineResult<()> {
    let obj = args
        .as_object()
        .ok_or_else(|| EngineError::validation("call arguments must be a JSON object"))?;

    for (name, def) in shape {
        let unwrapped = def.unwrap_optional();
        encode_column(&unwrapped.base, unwrapped.optional, obj.get(name), name)?;
    }

    for key in obj.keys() {
        if !shape.contains_key(key) {
            return Err(EngineError::validation(format!(
                "unknown call argument '{key}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_runs_registered_handler() {
        let engine = StorageEngine::open_in_memory(
            &reactive_core::schema::Schema::new(),
            &reactive_storage::migrator::MigrationRules::new(),
        )
        .unwrap();

        let mut dispatcher = CallDispatcher::new();
        dispatcher.register(
            "ping",
            CallMode::ReadOnly,
            None,
            Arc::new(|_ctx, _args| Ok(serde_json::json!({"pong": true}))),
        );

        let result = dispatcher.dispatch(&engine, "ping", serde_json::json!({})).unwrap();
        assert_eq!(result, serde_json::json!({"pong": true}));
    }

    #[test]
    fn unknown_endpoint_errors() {
        let engine = StorageEngine::open_in_memory(
            &reactive_core::schema::Schema::new(),
            &reactive_storage::migrator::MigrationRules::new(),
        )
        .unwrap();
        let dispatcher = CallDispatcher::new();
        let err = dispatcher
            .dispatch(&engine, "missing", serde_json::json!({}))
            .unwrap_err();
        assert_eq!(err.kind_name(), "FunctionResolutionError");
    }

    #[test]
    fn read_only_handler_rejects_mutation_attempt() {
        let engine = StorageEngine::open_in_memory(
            &reactive_core::schema::Schema::new(),
            &reactive_storage::migrator::MigrationRules::new(),
        )
        .unwrap();

        let mut dispatcher = CallDispatcher::new();
        dispatcher.register(
            "readOnly",
            CallMode::ReadOnly,
            None,
            Arc::new(|ctx, _args| {
                ctx.require_mutation()?;
                Ok(serde_json::json!(null))
            }),
        );

        let err = dispatcher
            .dispatch(&engine, "readOnly", serde_json::json!({}))
            .unwrap_err();
        assert_eq!(err.kind_name(), "ConstraintError");
    }

    #[test]
    fn argument_validation_rejects_unknown_keys() {
        let engine = StorageEngine::open_in_memory(
            &reactive_core::schema::Schema::new(),
            &reactive_storage::migrator::MigrationRules::new(),
        )
        .unwrap();

        let mut shape = IndexMap::new();
        shape.insert("name".to_string(), ValueDef::String);

        let mut dispatcher = CallDispatcher::new();
        dispatcher.register(
            "greet",
            CallMode::ReadOnly,
            Some(shape),
            Arc::new(|_ctx, args| Ok(args)),
        );

        let err = dispatcher
            .dispatch(&engine, "greet", serde_json::json!({"name": "Ada", "extra": 1}))
            .unwrap_err();
        assert_eq!(err.kind_name(), "ValidationError");
    }
}
