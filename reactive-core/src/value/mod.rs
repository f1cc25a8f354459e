mod codec;
mod def;
mod scalar;

pub use codec::{decode_column, encode_column};
pub use def::{UnwrappedField, ValueDef};
pub use scalar::SqlScalar;
