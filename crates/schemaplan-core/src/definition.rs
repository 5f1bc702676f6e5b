//! The root of the IR

use serde::{Deserialize, Serialize};

use crate::enums::{SqlFormat, SqlStage};
use crate::identity::{names_match, Identity};
use crate::schema::Schema;

/// One database schema definition: the unit compositing, validation, and
/// resolution operate on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub database: Option<Database>,

    #[serde(default)]
    pub schemas: Vec<Schema>,

    #[serde(default)]
    pub languages: Vec<Language>,

    #[serde(default)]
    pub sql: Vec<Sql>,
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn try_get_schema_named(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| names_match(&s.name, name))
    }

    pub fn try_get_schema_named_mut(&mut self, name: &str) -> Option<&mut Schema> {
        self.schemas.iter_mut().find(|s| names_match(&s.name, name))
    }

    /// Return the named schema, appending an empty one if it does not exist
    pub fn get_or_create_schema_named(&mut self, name: &str) -> &mut Schema {
        match self.schemas.iter().position(|s| names_match(&s.name, name)) {
            Some(idx) => &mut self.schemas[idx],
            None => {
                self.schemas.push(Schema::new(name));
                let last = self.schemas.len() - 1;
                &mut self.schemas[last]
            }
        }
    }

    pub fn try_get_language_named(&self, name: &str) -> Option<&Language> {
        self.languages.iter().find(|l| names_match(&l.name, name))
    }

    /// Format declared by the database block, if any
    pub fn sql_format(&self) -> Option<SqlFormat> {
        self.database.as_ref().and_then(|db| db.sql_format)
    }

    /// Total number of tables across all schemas
    pub fn table_count(&self) -> usize {
        self.schemas.iter().map(|s| s.tables.len()).sum()
    }
}

/// Database-wide settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub sql_format: Option<SqlFormat>,

    #[serde(default)]
    pub roles: Option<RoleAssignment>,

    #[serde(default)]
    pub config_params: Vec<ConfigParam>,
}

/// Well-known roles plus any custom roles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    #[serde(default)]
    pub application: String,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub replication: String,

    #[serde(default)]
    pub read_only: String,

    #[serde(default)]
    pub custom_roles: Vec<String>,
}

impl RoleAssignment {
    /// Whether `role` is one of the assigned roles
    pub fn is_role_defined(&self, role: &str) -> bool {
        [&self.application, &self.owner, &self.replication, &self.read_only]
            .into_iter()
            .chain(self.custom_roles.iter())
            .any(|r| names_match(r, role))
    }
}

/// Database configuration parameter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigParam {
    pub name: String,
    pub value: String,
}

impl Identity for ConfigParam {
    fn identity_matches(&self, other: &Self) -> bool {
        names_match(&self.name, &other.name)
    }
}

/// Procedural language
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub name: String,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub trusted: bool,

    #[serde(default)]
    pub procedural: bool,

    #[serde(default)]
    pub handler: String,

    #[serde(default)]
    pub validator: String,
}

impl Identity for Language {
    fn identity_matches(&self, other: &Self) -> bool {
        names_match(&self.name, &other.name)
    }
}

/// Free-form SQL run at a migration stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sql {
    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub ticket: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub comment: String,

    #[serde(default)]
    pub stage: Option<SqlStage>,

    pub text: String,
}

impl Sql {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

impl Identity for Sql {
    /// Exact text match
    fn identity_matches(&self, other: &Self) -> bool {
        self.text == other.text
    }
}
