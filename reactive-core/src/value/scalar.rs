//! `SqlScalar` is the physical-encoding boundary between the value model
//! and the store: every declared field round-trips through exactly one
//! of these variants (spec §4.4 "Physical encoding").

/// A value as it is actually bound into / read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlScalar {
    Text(String),
    Real(f64),
    Integer(i64),
    Null,
}

impl SqlScalar {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlScalar::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlScalar::Null)
    }
}

impl rusqlite::ToSql for SqlScalar {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value};
        Ok(match self {
            SqlScalar::Text(s) => ToSqlOutput::Owned(Value::Text(s.clone())),
            SqlScalar::Real(r) => ToSqlOutput::Owned(Value::Real(*r)),
            SqlScalar::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlScalar::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}
