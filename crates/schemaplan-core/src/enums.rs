//! Closed enumerations used across the IR
//!
//! Every enum here is parsed from its canonical SQL spelling through
//! `FromStr`, which is the only way a raw string becomes a member. Parsing is
//! case-insensitive. Enums with a documented default accept the empty string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raised when a raw string is not a member of a closed enumeration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind} value: '{value}'")]
pub struct EnumParseError {
    /// Enumeration being parsed (e.g. "index type")
    pub kind: &'static str,

    /// Offending input
    pub value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Declares a closed enum with canonical spellings, `FromStr`, `Display`,
/// and string-based serde.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal, default = $default:expr,
        { $( $(#[$vmeta:meta])* $variant:ident => $text:literal $(| $alias:literal)* ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Canonical SQL spelling
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )+
                }
            }
        }

        impl FromStr for $name {
            type Err = EnumParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    let default: Option<Self> = $default;
                    return default.ok_or_else(|| EnumParseError::new($kind, s));
                }
                $(
                    if trimmed.eq_ignore_ascii_case($text)
                        $(|| trimmed.eq_ignore_ascii_case($alias))*
                    {
                        return Ok(Self::$variant);
                    }
                )+
                Err(EnumParseError::new($kind, s))
            }
        }

        impl TryFrom<String> for $name {
            type Error = EnumParseError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_enum! {
    /// Target SQL format
    SqlFormat, "sql format", default = None, {
        /// PostgreSQL 8+
        Pgsql8 => "pgsql8",
        /// Microsoft SQL Server 2005+
        Mssql10 => "mssql10",
        /// MySQL 5
        Mysql5 => "mysql5",
    }
}

closed_enum! {
    /// Index access method
    IndexType, "index type", default = None, {
        Btree => "btree",
        Hash => "hash",
        Gin => "gin",
        Gist => "gist",
    }
}

impl Default for IndexType {
    fn default() -> Self {
        Self::Btree
    }
}

closed_enum! {
    /// Referential action on update/delete. Empty input means NO ACTION.
    ForeignKeyAction, "foreign key action", default = Some(ForeignKeyAction::NoAction), {
        NoAction => "NO ACTION" | "NO_ACTION",
        Restrict => "RESTRICT",
        Cascade => "CASCADE",
        SetNull => "SET NULL" | "SET_NULL",
        SetDefault => "SET DEFAULT" | "SET_DEFAULT",
    }
}

impl Default for ForeignKeyAction {
    fn default() -> Self {
        Self::NoAction
    }
}

closed_enum! {
    /// Function parameter direction. Empty input means IN.
    FuncParamDir, "function parameter direction", default = Some(FuncParamDir::In), {
        In => "IN",
        Out => "OUT",
        InOut => "INOUT",
    }
}

impl Default for FuncParamDir {
    fn default() -> Self {
        Self::In
    }
}

closed_enum! {
    /// Kind of a user-defined type
    TypeDefKind, "type kind", default = None, {
        Enum => "enum",
        Composite => "composite",
        Domain => "domain",
    }
}

impl Default for TypeDefKind {
    fn default() -> Self {
        Self::Enum
    }
}

closed_enum! {
    /// Table constraint kind
    ConstraintType, "constraint type", default = None, {
        PrimaryKey => "PRIMARY KEY",
        Unique => "UNIQUE",
        Check => "CHECK",
        ForeignKey => "FOREIGN KEY",
    }
}

impl Default for ConstraintType {
    fn default() -> Self {
        Self::Check
    }
}

closed_enum! {
    /// When a trigger fires relative to its event
    TriggerTiming, "trigger timing", default = None, {
        Before => "BEFORE",
        After => "AFTER",
    }
}

impl Default for TriggerTiming {
    fn default() -> Self {
        Self::After
    }
}

closed_enum! {
    /// Trigger granularity
    TriggerForEach, "trigger granularity", default = None, {
        Row => "ROW",
        Statement => "STATEMENT",
    }
}

impl Default for TriggerForEach {
    fn default() -> Self {
        Self::Row
    }
}

closed_enum! {
    /// Migration stage a free-form SQL snippet runs in
    SqlStage, "sql stage", default = None, {
        Before1 => "BEFORE1",
        Before2 => "BEFORE2",
        After1 => "AFTER1",
        After2 => "AFTER2",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("BTREE".parse::<IndexType>().unwrap(), IndexType::Btree);
        assert_eq!("gist".parse::<IndexType>().unwrap(), IndexType::Gist);
        assert_eq!("Pgsql8".parse::<SqlFormat>().unwrap(), SqlFormat::Pgsql8);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = "brin".parse::<IndexType>().unwrap_err();
        assert_eq!(err.kind, "index type");
        assert_eq!(err.to_string(), "Invalid index type value: 'brin'");

        assert!("".parse::<IndexType>().is_err());
        assert!("".parse::<SqlFormat>().is_err());
        assert!("INSTEAD OF".parse::<TriggerTiming>().is_err());
    }

    #[test]
    fn documented_defaults_apply_to_empty_input() {
        assert_eq!("".parse::<ForeignKeyAction>().unwrap(), ForeignKeyAction::NoAction);
        assert_eq!("  ".parse::<FuncParamDir>().unwrap(), FuncParamDir::In);
    }

    #[test]
    fn aliases_parse_to_canonical_member() {
        assert_eq!("set_null".parse::<ForeignKeyAction>().unwrap(), ForeignKeyAction::SetNull);
        assert_eq!(ForeignKeyAction::SetNull.to_string(), "SET NULL");
    }

    #[test]
    fn serde_uses_canonical_spelling() {
        let json = serde_json::to_string(&ConstraintType::ForeignKey).unwrap();
        assert_eq!(json, "\"FOREIGN KEY\"");

        let parsed: FuncParamDir = serde_json::from_str("\"inout\"").unwrap();
        assert_eq!(parsed, FuncParamDir::InOut);

        assert!(serde_json::from_str::<TypeDefKind>("\"table\"").is_err());
    }
}
