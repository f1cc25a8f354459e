//! Canonicalize and reject dangerous table/column names (spec §4.1).
//!
//! Validation is defense-in-depth: even though every caller reaches the
//! physical store through parameterized statements, names are
//! interpolated into DDL (`CREATE TABLE`, index names) where
//! parameterization isn't available, so the denylist below exists to
//! make that interpolation safe regardless of how names were sourced.

use crate::errors::{EngineError, EngineResult};

const MAX_NAME_LEN: usize = 64;

const DENYLIST: &[&str] = &[
    ";",
    "--",
    "/*",
    "*/",
    "union select",
    "union all select",
    "exec(",
    "execute(",
    "xp_",
    "drop table",
    "drop database",
    "pragma",
    "attach database",
];

fn is_table_name_char(c: char, first: bool) -> bool {
    if first {
        c.is_ascii_alphabetic() || c == '_'
    } else {
        c.is_ascii_alphanumeric() || c == '_' || c == '-'
    }
}

fn is_column_name_char(c: char, first: bool) -> bool {
    if first {
        c.is_ascii_alphabetic() || c == '_'
    } else {
        c.is_ascii_alphanumeric() || c == '_'
    }
}

fn check_denylist(name: &str, kind: &str) -> EngineResult<()> {
    let lower = name.to_ascii_lowercase();
    for pattern in DENYLIST {
        if lower.contains(pattern) {
            return Err(EngineError::validation(format!(
                "{kind} name '{name}' contains a disallowed substring"
            )));
        }
    }
    Ok(())
}

fn check_pattern(name: &str, kind: &str, char_ok: fn(char, bool) -> bool) -> EngineResult<()> {
    if name.is_empty() {
        return Err(EngineError::validation(format!("{kind} name must not be empty")));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::validation(format!(
            "{kind} name '{name}' exceeds {MAX_NAME_LEN} characters"
        )));
    }
    for (i, c) in name.chars().enumerate() {
        if !char_ok(c, i == 0) {
            return Err(EngineError::validation(format!(
                "{kind} name '{name}' contains an illegal character at position {i}"
            )));
        }
    }
    Ok(())
}

/// Validate a table name against `^[A-Za-z_][A-Za-z0-9_-]{0,63}$` plus the
/// shared denylist.
pub fn validate_table_name(name: &str) -> EngineResult<()> {
    check_denylist(name, "table")?;
    check_pattern(name, "table", is_table_name_char)
}

/// Validate a column name against `^[A-Za-z_][A-Za-z0-9_]{0,63}$` plus the
/// shared denylist.
pub fn validate_column_name(name: &str) -> EngineResult<()> {
    check_denylist(name, "column")?;
    check_pattern(name, "column", is_column_name_char)
}

/// Reserved metadata columns that user schemas may not declare.
pub const RESERVED_COLUMNS: &[&str] = &["_id", "_createdAt", "_updatedAt", "_extras"];

pub fn reject_reserved_column(name: &str) -> EngineResult<()> {
    if RESERVED_COLUMNS.contains(&name) {
        return Err(EngineError::validation(format!(
            "field name '{name}' collides with a reserved metadata column"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_names() {
        assert!(validate_table_name("users").is_ok());
        assert!(validate_table_name("user_posts-v2").is_ok());
        assert!(validate_column_name("first_name").is_ok());
    }

    #[test]
    fn rejects_empty_and_overlong() {
        assert!(validate_table_name("").is_err());
        let long = "a".repeat(65);
        assert!(validate_table_name(&long).is_err());
    }

    #[test]
    fn rejects_leading_digit() {
        assert!(validate_table_name("1users").is_err());
        assert!(validate_column_name("1name").is_err());
    }

    #[test]
    fn column_names_reject_hyphen() {
        assert!(validate_column_name("first-name").is_err());
    }

    #[test]
    fn rejects_denylisted_substrings() {
        assert!(validate_table_name("users; DROP TABLE x").is_err());
        assert!(validate_table_name("a UNION SELECT b").is_err());
        assert!(validate_column_name("x/*comment*/").is_err());
    }

    #[test]
    fn rejects_reserved_columns() {
        for name in RESERVED_COLUMNS {
            assert!(reject_reserved_column(name).is_err());
        }
        assert!(reject_reserved_column("nickname").is_ok());
    }
}
