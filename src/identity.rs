//! Table identity: name validation and the `<keyspace>/<table>` identifier.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// Separator between the keyspace and table parts of an identifier.
pub const TABLE_ID_SEPARATOR: char = '/';

/// Maximum length of a keyspace or table name.
pub const MAX_NAME_LEN: usize = 48;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_]{0,47}$").expect("valid name pattern"));

/// Check a keyspace or table name against the service naming rules.
///
/// Names are 1-48 characters of alphanumerics and underscores and must start
/// with an alphanumeric.
pub fn validate_name(field: &'static str, name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(ValidationError::NameLength {
            field,
            name: name.to_string(),
        });
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(ValidationError::NamePattern {
            field,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Composite key of a table: keyspace name plus table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableId {
    keyspace_name: String,
    table_name: String,
}

impl TableId {
    /// Build an identifier from already-validated names.
    pub fn new(keyspace_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            keyspace_name: keyspace_name.into(),
            table_name: table_name.into(),
        }
    }

    pub fn keyspace_name(&self) -> &str {
        &self.keyspace_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Parse a persisted identifier.
    ///
    /// Exactly one separator is accepted and both sides must be non-empty.
    pub fn parse(id: &str) -> Result<Self, ValidationError> {
        let mut parts = id.split(TABLE_ID_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(keyspace), Some(table), None) if !keyspace.is_empty() && !table.is_empty() => {
                Ok(Self::new(keyspace, table))
            }
            _ => Err(ValidationError::MalformedId { id: id.to_string() }),
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.keyspace_name, TABLE_ID_SEPARATOR, self.table_name
        )
    }
}

impl FromStr for TableId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trips() {
        for (ks, tbl) in [("ks", "t"), ("my_keyspace", "orders_2024"), ("A1", "b_")] {
            let id = TableId::new(ks, tbl).to_string();
            let parsed = TableId::parse(&id).unwrap();
            assert_eq!(parsed.keyspace_name(), ks);
            assert_eq!(parsed.table_name(), tbl);
        }
    }

    #[test]
    fn id_uses_slash_separator() {
        assert_eq!(TableId::new("ks", "tbl").to_string(), "ks/tbl");
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "foo", "/foo", "foo/", "/", "a/b/c", "a//b"] {
            let err = TableId::parse(bad).unwrap_err();
            assert!(
                matches!(err, ValidationError::MalformedId { ref id } if id == bad),
                "expected malformed id for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn names_accept_valid_patterns() {
        assert!(validate_name("table_name", "a").is_ok());
        assert!(validate_name("table_name", "Orders_2024").is_ok());
        assert!(validate_name("table_name", &"x".repeat(48)).is_ok());
    }

    #[test]
    fn names_reject_invalid_patterns() {
        assert!(matches!(
            validate_name("table_name", ""),
            Err(ValidationError::NameLength { .. })
        ));
        assert!(matches!(
            validate_name("table_name", &"x".repeat(49)),
            Err(ValidationError::NameLength { .. })
        ));
        assert!(matches!(
            validate_name("keyspace_name", "_leading"),
            Err(ValidationError::NamePattern { .. })
        ));
        assert!(matches!(
            validate_name("keyspace_name", "has-dash"),
            Err(ValidationError::NamePattern { .. })
        ));
        assert!(matches!(
            validate_name("keyspace_name", "a/b"),
            Err(ValidationError::NamePattern { .. })
        ));
    }
}
