//! Tables and everything nested inside them

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::enums::{ConstraintType, ForeignKeyAction, IndexType, SqlFormat};
use crate::grant::Grant;
use crate::identity::{name_lists_match, names_match, FormatEq, Identity};
use crate::key::KeyNames;

fn default_true() -> bool {
    true
}

/// A table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name, unique within its schema
    pub name: String,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub description: String,

    /// Ordered primary key column names
    #[serde(default)]
    pub primary_key: Vec<String>,

    #[serde(default)]
    pub primary_key_name: String,

    #[serde(default)]
    pub cluster_index: Option<String>,

    /// Schema of the parent table; empty means this table's schema
    #[serde(default)]
    pub inherits_schema: String,

    /// Parent table; empty means no inheritance
    #[serde(default)]
    pub inherits_table: String,

    #[serde(default)]
    pub table_options: Vec<TableOption>,

    #[serde(default)]
    pub columns: Vec<Column>,

    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,

    #[serde(default)]
    pub indexes: Vec<Index>,

    #[serde(default)]
    pub constraints: Vec<Constraint>,

    #[serde(default)]
    pub grants: Vec<Grant>,

    #[serde(default)]
    pub rows: Option<DataRows>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Inherit from `schema.table`; an empty schema means this table's schema
    pub fn inheriting(mut self, schema: impl Into<String>, table: impl Into<String>) -> Self {
        self.inherits_schema = schema.into();
        self.inherits_table = table.into();
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_grant(mut self, grant: Grant) -> Self {
        self.grants.push(grant);
        self
    }

    /// Whether this table declares a parent
    pub fn has_parent(&self) -> bool {
        !self.inherits_table.is_empty()
    }

    /// Find a column declared directly on this table (not inherited)
    pub fn try_get_column_named(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| names_match(&c.name, name))
    }

    pub fn try_get_column_named_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| names_match(&c.name, name))
    }

    pub fn try_get_index_named(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| names_match(&i.name, name))
    }

    pub fn try_get_constraint_named(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| names_match(&c.name, name))
    }

    pub fn try_get_foreign_key_named(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys
            .iter()
            .find(|fk| names_match(&fk.constraint_name, name))
    }

    /// Table options that apply to `format`
    pub fn options_for(&self, format: SqlFormat) -> impl Iterator<Item = &TableOption> {
        self.table_options
            .iter()
            .filter(move |o| o.sql_format == format)
    }

    /// Whether `column` is part of the primary key
    pub fn is_primary_key_column(&self, column: &str) -> bool {
        self.primary_key.iter().any(|pk| names_match(pk, column))
    }
}

impl Identity for Table {
    fn identity_matches(&self, other: &Self) -> bool {
        names_match(&self.name, &other.name)
    }
}

/// Format-specific table storage option (e.g. `with` for pgsql8, `engine` for mysql5)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOption {
    pub sql_format: SqlFormat,
    pub name: String,
    pub value: String,
}

impl TableOption {
    pub fn new(sql_format: SqlFormat, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            sql_format,
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Identity for TableOption {
    fn identity_matches(&self, other: &Self) -> bool {
        self.sql_format == other.sql_format && names_match(&self.name, &other.name)
    }
}

impl FormatEq for TableOption {
    fn equals(&self, other: &Self, format: SqlFormat) -> bool {
        self.sql_format == format && self.identity_matches(other) && self.value == other.value
    }
}

/// SQL run around adding a column during a three-stage migration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnHooks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_add_stage1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_add_stage2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_add_stage3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_add_stage1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_add_stage2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_add_stage3: Option<String>,
}

/// A table column
///
/// The foreign key fields are either all empty or at least `foreign_table`
/// is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    /// Declared SQL type. Absent on proxy columns whose type comes from the
    /// column their foreign key points at.
    #[serde(default, rename = "type")]
    pub data_type: Option<String>,

    #[serde(default = "default_true")]
    pub nullable: bool,

    #[serde(default)]
    pub default: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub check: Option<String>,

    #[serde(default)]
    pub foreign_schema: String,

    #[serde(default)]
    pub foreign_table: String,

    #[serde(default)]
    pub foreign_column: String,

    #[serde(default)]
    pub foreign_key_name: String,

    #[serde(default)]
    pub foreign_on_update: ForeignKeyAction,

    #[serde(default)]
    pub foreign_on_delete: ForeignKeyAction,

    #[serde(default)]
    pub hooks: ColumnHooks,
}

impl Default for Column {
    fn default() -> Self {
        Self {
            name: String::new(),
            data_type: None,
            nullable: true,
            default: None,
            description: String::new(),
            unique: false,
            check: None,
            foreign_schema: String::new(),
            foreign_table: String::new(),
            foreign_column: String::new(),
            foreign_key_name: String::new(),
            foreign_on_update: ForeignKeyAction::NoAction,
            foreign_on_delete: ForeignKeyAction::NoAction,
            hooks: ColumnHooks::default(),
        }
    }
}

impl Column {
    /// A typed column
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type.into()),
            ..Self::default()
        }
    }

    /// An untyped column taking its type from its foreign key target
    pub fn proxy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Reference `schema.table.column`; empty parts mean "same schema" and
    /// "same-named column"
    pub fn references(
        mut self,
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.foreign_schema = schema.into();
        self.foreign_table = table.into();
        self.foreign_column = column.into();
        self
    }

    pub fn has_foreign_key(&self) -> bool {
        !self.foreign_table.is_empty()
    }

    /// Any foreign key field populated, including partially
    pub fn has_any_foreign_key_field(&self) -> bool {
        !self.foreign_schema.is_empty()
            || !self.foreign_table.is_empty()
            || !self.foreign_column.is_empty()
            || !self.foreign_key_name.is_empty()
    }

    /// Stored form of this column's foreign key
    pub fn foreign_key_names(&self) -> Option<KeyNames> {
        if !self.has_foreign_key() {
            return None;
        }
        Some(
            KeyNames::new(
                self.foreign_schema.clone(),
                self.foreign_table.clone(),
                [self.foreign_column.clone()],
            )
            .with_key_name(self.foreign_key_name.clone()),
        )
    }
}

impl Identity for Column {
    fn identity_matches(&self, other: &Self) -> bool {
        names_match(&self.name, &other.name)
    }
}

impl FormatEq for Column {
    fn equals(&self, other: &Self, _format: SqlFormat) -> bool {
        let types_match = match (&self.data_type, &other.data_type) {
            (Some(a), Some(b)) => names_match(a, b),
            (None, None) => true,
            _ => false,
        };

        self.identity_matches(other)
            && types_match
            && self.nullable == other.nullable
            && self.default == other.default
            && self.description == other.description
            && self.unique == other.unique
            && self.check == other.check
            && names_match(&self.foreign_schema, &other.foreign_schema)
            && names_match(&self.foreign_table, &other.foreign_table)
            && names_match(&self.foreign_column, &other.foreign_column)
            && names_match(&self.foreign_key_name, &other.foreign_key_name)
            && self.foreign_on_update == other.foreign_on_update
            && self.foreign_on_delete == other.foreign_on_delete
    }
}

/// Multi-column foreign key declared on a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub columns: Vec<String>,

    #[serde(default)]
    pub foreign_schema: String,

    pub foreign_table: String,

    /// Empty, or one entry per local column; empty entries mean "same name"
    #[serde(default)]
    pub foreign_columns: Vec<String>,

    #[serde(default)]
    pub constraint_name: String,

    #[serde(default)]
    pub index_name: String,

    #[serde(default)]
    pub on_update: ForeignKeyAction,

    #[serde(default)]
    pub on_delete: ForeignKeyAction,
}

impl ForeignKey {
    pub fn new<L, F>(
        constraint_name: impl Into<String>,
        columns: L,
        foreign_schema: impl Into<String>,
        foreign_table: impl Into<String>,
        foreign_columns: F,
    ) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            foreign_schema: foreign_schema.into(),
            foreign_table: foreign_table.into(),
            foreign_columns: foreign_columns.into_iter().map(Into::into).collect(),
            constraint_name: constraint_name.into(),
            ..Self::default()
        }
    }

    /// Stored form of the referenced side
    pub fn foreign_key_names(&self) -> KeyNames {
        KeyNames::new(
            self.foreign_schema.clone(),
            self.foreign_table.clone(),
            self.foreign_columns.iter().cloned(),
        )
        .with_key_name(self.constraint_name.clone())
    }
}

impl Identity for ForeignKey {
    fn identity_matches(&self, other: &Self) -> bool {
        names_match(&self.constraint_name, &other.constraint_name)
    }
}

impl FormatEq for ForeignKey {
    fn equals(&self, other: &Self, _format: SqlFormat) -> bool {
        self.identity_matches(other)
            && name_lists_match(&self.columns, &other.columns)
            && names_match(&self.foreign_schema, &other.foreign_schema)
            && names_match(&self.foreign_table, &other.foreign_table)
            && name_lists_match(&self.foreign_columns, &other.foreign_columns)
            && names_match(&self.index_name, &other.index_name)
            && self.on_update == other.on_update
            && self.on_delete == other.on_delete
    }
}

/// One indexed column or expression
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDim {
    #[serde(default)]
    pub name: String,

    /// `value` is a SQL expression rather than a column name
    #[serde(default)]
    pub sql: bool,

    pub value: String,
}

impl IndexDim {
    pub fn column(value: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            sql: false,
            value: value.into(),
        }
    }

    pub fn expression(value: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            sql: true,
            value: value.into(),
        }
    }

    fn same(&self, other: &Self) -> bool {
        if self.sql != other.sql {
            return false;
        }
        if self.sql {
            self.value.trim() == other.value.trim()
        } else {
            names_match(&self.value, &other.value)
        }
    }
}

/// Partial-index predicate for one SQL format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCond {
    pub sql_format: SqlFormat,
    pub condition: String,
}

/// An index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,

    #[serde(default)]
    pub using: IndexType,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub concurrently: bool,

    /// Ordered; order is part of equality
    #[serde(default)]
    pub dimensions: Vec<IndexDim>,

    #[serde(default)]
    pub conditions: Vec<IndexCond>,
}

impl Index {
    pub fn new<I>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            name: name.into(),
            dimensions: columns.into_iter().map(IndexDim::column).collect(),
            ..Self::default()
        }
    }

    pub fn using(mut self, using: IndexType) -> Self {
        self.using = using;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_condition(mut self, sql_format: SqlFormat, condition: impl Into<String>) -> Self {
        self.conditions.push(IndexCond {
            sql_format,
            condition: condition.into(),
        });
        self
    }

    /// Partial-index predicate for `format`, if any
    pub fn condition_for(&self, format: SqlFormat) -> Option<&str> {
        self.conditions
            .iter()
            .find(|c| c.sql_format == format)
            .map(|c| c.condition.as_str())
    }
}

impl Identity for Index {
    fn identity_matches(&self, other: &Self) -> bool {
        names_match(&self.name, &other.name)
    }
}

impl FormatEq for Index {
    fn equals(&self, other: &Self, format: SqlFormat) -> bool {
        let conditions_match = match (self.condition_for(format), other.condition_for(format)) {
            (Some(a), Some(b)) => a.trim() == b.trim(),
            (None, None) => true,
            _ => false,
        };

        self.identity_matches(other)
            && self.using == other.using
            && self.unique == other.unique
            && self.concurrently == other.concurrently
            && self.dimensions.len() == other.dimensions.len()
            && self
                .dimensions
                .iter()
                .zip(&other.dimensions)
                .all(|(a, b)| a.same(b))
            && conditions_match
    }
}

/// A table constraint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ConstraintType,

    #[serde(default)]
    pub definition: String,

    #[serde(default)]
    pub foreign_index_name: String,

    #[serde(default)]
    pub foreign_schema: String,

    #[serde(default)]
    pub foreign_table: String,
}

impl Constraint {
    pub fn new(
        name: impl Into<String>,
        kind: ConstraintType,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            definition: definition.into(),
            ..Self::default()
        }
    }

    /// Point a FOREIGN KEY constraint at `schema.table`
    pub fn referencing(mut self, schema: impl Into<String>, table: impl Into<String>) -> Self {
        self.foreign_schema = schema.into();
        self.foreign_table = table.into();
        self
    }

    /// FOREIGN KEY constraint that names the table it references
    pub fn references_table(&self) -> bool {
        self.kind == ConstraintType::ForeignKey && !self.foreign_table.is_empty()
    }
}

impl Identity for Constraint {
    fn identity_matches(&self, other: &Self) -> bool {
        names_match(&self.name, &other.name)
    }
}

impl FormatEq for Constraint {
    fn equals(&self, other: &Self, _format: SqlFormat) -> bool {
        self.identity_matches(other)
            && self.kind == other.kind
            && self.definition.trim() == other.definition.trim()
            && names_match(&self.foreign_index_name, &other.foreign_index_name)
            && names_match(&self.foreign_schema, &other.foreign_schema)
            && names_match(&self.foreign_table, &other.foreign_table)
    }
}

/// Static row data shipped with a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRows {
    /// Column names, one per value in each row
    pub columns: Vec<String>,

    #[serde(default)]
    pub rows: Vec<DataRow>,
}

impl DataRows {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| names_match(c, name))
    }
}

/// One row; `None` values are NULL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRow {
    pub values: Vec<Option<String>>,

    /// Row is to be deleted rather than upserted
    #[serde(default)]
    pub delete: bool,
}

impl DataRow {
    pub fn new<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            values: values.into_iter().map(|v| Some(v.into())).collect(),
            delete: false,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data_type {
            Some(t) => write!(f, "{} {}", self.name, t),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_foreign_key_presence() {
        let plain = Column::new("id", "int");
        assert!(!plain.has_foreign_key());
        assert!(plain.foreign_key_names().is_none());

        let fk = Column::proxy("user_id").references("", "users", "id");
        assert!(fk.has_foreign_key());
        assert_eq!(fk.foreign_key_names().unwrap(), KeyNames::new("", "users", ["id"]));
    }

    #[test]
    fn column_defaults_to_nullable() {
        let col: Column = serde_json::from_str(r#"{"name": "x", "type": "text"}"#).unwrap();
        assert!(col.nullable);
        assert_eq!(col.data_type.as_deref(), Some("text"));
        assert_eq!(col.foreign_on_delete, ForeignKeyAction::NoAction);
    }

    #[test]
    fn index_dimension_order_matters() {
        let a = Index::new("ix", ["a", "b"]);
        let b = Index::new("IX", ["b", "a"]);
        assert!(a.identity_matches(&b));
        assert!(!a.equals(&b, SqlFormat::Pgsql8));
        assert!(a.equals(&Index::new("ix", ["A", "B"]), SqlFormat::Pgsql8));
    }

    #[test]
    fn index_conditions_compare_per_format() {
        let a = Index::new("ix", ["a"]).with_condition(SqlFormat::Pgsql8, "a > 0");
        let b = Index::new("ix", ["a"])
            .with_condition(SqlFormat::Pgsql8, "a > 0")
            .with_condition(SqlFormat::Mssql10, "a > 1");

        assert!(a.equals(&b, SqlFormat::Pgsql8));
        assert!(!a.equals(&b, SqlFormat::Mssql10));
        assert!(a.equals(&Index::new("ix", ["a"]), SqlFormat::Mysql5));
    }

    #[test]
    fn table_option_identity_includes_format() {
        let a = TableOption::new(SqlFormat::Pgsql8, "with", "(fillfactor=70)");
        let b = TableOption::new(SqlFormat::Mysql5, "WITH", "(fillfactor=70)");
        assert!(!a.identity_matches(&b));
        assert!(a.equals(&a.clone(), SqlFormat::Pgsql8));
        assert!(!a.equals(&a.clone(), SqlFormat::Mysql5));
    }

    #[test]
    fn constraint_references_table_only_for_foreign_keys() {
        let check = Constraint::new("ck", ConstraintType::Check, "x > 0").referencing("", "t");
        assert!(!check.references_table());

        let fk = Constraint::new("fk", ConstraintType::ForeignKey, "(a) REFERENCES t (a)")
            .referencing("", "t");
        assert!(fk.references_table());
    }

    #[test]
    fn table_member_lookups() {
        let mut table = Table::new("orders")
            .with_column(Column::new("id", "int"))
            .with_column(Column::new("user_id", "int"))
            .with_primary_key(["ID"])
            .with_index(Index::new("ix_user", ["user_id"]))
            .with_constraint(Constraint::new("ck_id", ConstraintType::Check, "id > 0"))
            .with_foreign_key(ForeignKey::new("fk_user", ["user_id"], "", "users", ["id"]));

        table.try_get_column_named_mut("USER_ID").unwrap().nullable = false;
        assert!(!table.columns[1].nullable);
        assert!(table.try_get_column_named_mut("total").is_none());

        assert_eq!(table.try_get_index_named("IX_USER").unwrap().name, "ix_user");
        assert!(table.try_get_index_named("ix_total").is_none());
        assert_eq!(
            table.try_get_constraint_named("CK_ID").unwrap().kind,
            ConstraintType::Check
        );
        assert!(table.try_get_constraint_named("ck_total").is_none());
        assert_eq!(table.try_get_foreign_key_named("FK_USER").unwrap().foreign_table, "users");
        assert!(table.try_get_foreign_key_named("fk_other").is_none());

        assert!(table.is_primary_key_column("id"));
        assert!(!table.is_primary_key_column("user_id"));
    }

    #[test]
    fn options_filter_by_format() {
        let mut table = Table::new("events");
        table.table_options = vec![
            TableOption::new(SqlFormat::Pgsql8, "with", "(fillfactor=70)"),
            TableOption::new(SqlFormat::Mysql5, "engine", "InnoDB"),
            TableOption::new(SqlFormat::Pgsql8, "tablespace", "fast"),
        ];

        let pg: Vec<&str> = table
            .options_for(SqlFormat::Pgsql8)
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(pg, vec!["with", "tablespace"]);
        assert_eq!(table.options_for(SqlFormat::Mssql10).count(), 0);
    }
}
