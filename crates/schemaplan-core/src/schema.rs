//! Schemas: named containers of tables and other objects

use serde::{Deserialize, Serialize};

use crate::grant::Grant;
use crate::identity::{names_match, Identity};
use crate::objects::{Function, Sequence, Trigger, TypeDef, View};
use crate::table::Table;

/// A named schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tables: Vec<Table>,

    #[serde(default)]
    pub types: Vec<TypeDef>,

    #[serde(default)]
    pub sequences: Vec<Sequence>,

    #[serde(default)]
    pub functions: Vec<Function>,

    #[serde(default)]
    pub triggers: Vec<Trigger>,

    #[serde(default)]
    pub views: Vec<View>,

    #[serde(default)]
    pub grants: Vec<Grant>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_type(mut self, type_def: TypeDef) -> Self {
        self.types.push(type_def);
        self
    }

    pub fn with_sequence(mut self, sequence: Sequence) -> Self {
        self.sequences.push(sequence);
        self
    }

    pub fn with_function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn with_view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    pub fn try_get_table_named(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| names_match(&t.name, name))
    }

    pub fn try_get_table_named_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| names_match(&t.name, name))
    }

    pub fn try_get_type_named(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| names_match(&t.name, name))
    }

    pub fn try_get_sequence_named(&self, name: &str) -> Option<&Sequence> {
        self.sequences.iter().find(|s| names_match(&s.name, name))
    }

    pub fn try_get_view_named(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| names_match(&v.name, name))
    }

    /// All functions with this name, across overloads and formats
    pub fn functions_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Function> + 'a {
        self.functions.iter().filter(move |f| names_match(&f.name, name))
    }

    /// Triggers attached to `table`
    pub fn triggers_for_table<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = &'a Trigger> + 'a {
        self.triggers.iter().filter(move |t| names_match(&t.table, table))
    }
}

impl Identity for Schema {
    fn identity_matches(&self, other: &Self) -> bool {
        names_match(&self.name, &other.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::SqlFormat;
    use crate::objects::{Function, Sequence, Trigger, TypeDef, View};

    #[test]
    fn lookups_are_case_insensitive() {
        let schema = Schema::new("public")
            .with_table(Table::new("Users"))
            .with_function(Function::new("now_utc", "timestamp"))
            .with_trigger(Trigger::new("audit", "users", "log_change"));

        assert!(schema.try_get_table_named("USERS").is_some());
        assert!(schema.try_get_table_named("orders").is_none());
        assert_eq!(schema.functions_named("NOW_UTC").count(), 1);
        assert_eq!(schema.triggers_for_table("Users").count(), 1);
    }

    #[test]
    fn object_lookups_by_name() {
        let mut schema = Schema::new("public")
            .with_table(Table::new("users"))
            .with_type(TypeDef::enumeration("Mood", ["happy", "sad"]))
            .with_sequence(Sequence::new("user_ids"))
            .with_view(View::new("Active_Users").with_query(SqlFormat::Pgsql8, "SELECT 1"));

        assert_eq!(schema.try_get_type_named("mood").unwrap().enum_values.len(), 2);
        assert!(schema.try_get_type_named("feeling").is_none());
        assert_eq!(schema.try_get_sequence_named("USER_IDS").unwrap().name, "user_ids");
        assert!(schema.try_get_sequence_named("order_ids").is_none());
        assert_eq!(schema.try_get_view_named("active_users").unwrap().queries.len(), 1);
        assert!(schema.try_get_view_named("users").is_none());

        schema.try_get_table_named_mut("Users").unwrap().owner = "app".into();
        assert_eq!(schema.tables[0].owner, "app");
        assert!(schema.try_get_table_named_mut("orders").is_none());
    }
}
