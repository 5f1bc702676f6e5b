//! Unresolved key references

use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to columns of a table, by name
///
/// This is the stored shape of a key. An empty `schema` means "the schema of
/// the referring table". An empty entry in `columns` means "the column with
/// the same name as the corresponding local column".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyNames {
    #[serde(default)]
    pub schema: String,

    pub table: String,

    #[serde(default)]
    pub columns: Vec<String>,

    /// Constraint name, if the key is named
    #[serde(default)]
    pub key_name: String,
}

impl KeyNames {
    pub fn new<C>(schema: impl Into<String>, table: impl Into<String>, columns: C) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            schema: schema.into(),
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            key_name: String::new(),
        }
    }

    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = key_name.into();
        self
    }
}

impl fmt::Display for KeyNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.schema.is_empty() {
            write!(f, "{}.", self.schema)?;
        }
        write!(f, "{}({})", self.table, self.columns.join(", "))
    }
}
