mod compile;
mod types;

pub use compile::{compile, CompiledSchema, CompiledTable};
pub use types::{IndexDefinition, Schema, TableDefinition};
