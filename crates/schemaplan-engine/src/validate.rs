//! Structural validation of a composited definition
//!
//! Validation never mutates and never stops early: every violation found is
//! reported, each with a stable code and the path of the offending entity.
//! Violation codes are part of the public API. Never rename or remove a
//! code; add new ones.

use schemaplan_core::identity::Identity;
use schemaplan_core::{Definition, Function, Schema, Table, TypeDefKind};
use std::collections::HashSet;
use std::fmt;

/// Violation code registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationCode {
    DuplicateSchema,
    DuplicateLanguage,
    DuplicateTable,
    DuplicateColumn,
    DuplicateIndex,
    DuplicateConstraint,
    DuplicateForeignKey,
    DuplicateType,
    DuplicateSequence,
    DuplicateFunction,
    DuplicateTrigger,
    DuplicateView,

    /// TypeDef payload disagrees with its declared kind
    TypeKindMismatch,

    /// Table-level foreign key without a constraint name
    ForeignKeyMissingName,

    /// Table-level foreign key without local columns
    ForeignKeyMissingColumns,

    /// Function definition without a declared SQL format
    FunctionDefinitionMissingFormat,

    /// Column foreign key fields set but no foreign table
    ColumnForeignKeyIncomplete,

    /// Primary key names a column the table does not have
    PrimaryKeyUnknownColumn,

    /// Data row value count differs from the row column count
    DataRowArity,
}

impl ViolationCode {
    /// Stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateSchema => "DUPLICATE_SCHEMA",
            Self::DuplicateLanguage => "DUPLICATE_LANGUAGE",
            Self::DuplicateTable => "DUPLICATE_TABLE",
            Self::DuplicateColumn => "DUPLICATE_COLUMN",
            Self::DuplicateIndex => "DUPLICATE_INDEX",
            Self::DuplicateConstraint => "DUPLICATE_CONSTRAINT",
            Self::DuplicateForeignKey => "DUPLICATE_FOREIGN_KEY",
            Self::DuplicateType => "DUPLICATE_TYPE",
            Self::DuplicateSequence => "DUPLICATE_SEQUENCE",
            Self::DuplicateFunction => "DUPLICATE_FUNCTION",
            Self::DuplicateTrigger => "DUPLICATE_TRIGGER",
            Self::DuplicateView => "DUPLICATE_VIEW",
            Self::TypeKindMismatch => "TYPE_KIND_MISMATCH",
            Self::ForeignKeyMissingName => "FOREIGN_KEY_MISSING_NAME",
            Self::ForeignKeyMissingColumns => "FOREIGN_KEY_MISSING_COLUMNS",
            Self::FunctionDefinitionMissingFormat => "FUNCTION_DEFINITION_MISSING_FORMAT",
            Self::ColumnForeignKeyIncomplete => "COLUMN_FOREIGN_KEY_INCOMPLETE",
            Self::PrimaryKeyUnknownColumn => "PRIMARY_KEY_UNKNOWN_COLUMN",
            Self::DataRowArity => "DATA_ROW_ARITY",
        }
    }

    /// Whether this code reports an identity collision
    pub fn is_duplicate(&self) -> bool {
        self.as_str().starts_with("DUPLICATE_")
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural violation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{code}] {context}: {message}")]
pub struct ValidationError {
    pub code: ViolationCode,

    /// Path to the offending entity, e.g. `public.users.email` or
    /// `public.add(int, int)`
    pub context: String,

    pub message: String,
}

impl ValidationError {
    pub fn new(
        code: ViolationCode,
        context: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            context: context.into(),
            message: message.into(),
        }
    }
}

/// All violations found in one definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Whether any violation carries `code`
    pub fn contains(&self, code: ViolationCode) -> bool {
        self.0.iter().any(|e| e.code == code)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Validate a definition, failing with every violation found
pub fn validate(def: &Definition) -> Result<(), ValidationErrors> {
    let violations = collect_violations(def);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(violations))
    }
}

/// Collect every violation in `def`
pub fn collect_violations(def: &Definition) -> Vec<ValidationError> {
    let mut out = Vec::new();

    check_duplicates(
        &def.schemas,
        ViolationCode::DuplicateSchema,
        "definition",
        |s| format!("schema '{}' is declared more than once", s.name),
        &mut out,
    );
    check_duplicates(
        &def.languages,
        ViolationCode::DuplicateLanguage,
        "definition",
        |l| format!("language '{}' is declared more than once", l.name),
        &mut out,
    );

    for schema in &def.schemas {
        validate_schema(schema, &mut out);
    }

    tracing::debug!(violations = out.len(), "validation finished");
    out
}

/// Report every item whose identity matches an earlier sibling
fn check_duplicates<T, F>(
    items: &[T],
    code: ViolationCode,
    context: &str,
    describe: F,
    out: &mut Vec<ValidationError>,
) where
    T: Identity,
    F: Fn(&T) -> String,
{
    for (i, item) in items.iter().enumerate() {
        if items[..i].iter().any(|prev| prev.identity_matches(item)) {
            out.push(ValidationError::new(code, context, describe(item)));
        }
    }
}

fn validate_schema(schema: &Schema, out: &mut Vec<ValidationError>) {
    let ctx = schema.name.as_str();

    check_duplicates(
        &schema.tables,
        ViolationCode::DuplicateTable,
        ctx,
        |t| format!("table '{}' is declared more than once", t.name),
        out,
    );
    check_duplicates(
        &schema.types,
        ViolationCode::DuplicateType,
        ctx,
        |t| format!("type '{}' is declared more than once", t.name),
        out,
    );
    check_duplicates(
        &schema.sequences,
        ViolationCode::DuplicateSequence,
        ctx,
        |s| format!("sequence '{}' is declared more than once", s.name),
        out,
    );
    check_duplicates(
        &schema.triggers,
        ViolationCode::DuplicateTrigger,
        ctx,
        |t| format!("trigger '{}' on table '{}' is declared more than once", t.name, t.table),
        out,
    );
    check_duplicates(
        &schema.views,
        ViolationCode::DuplicateView,
        ctx,
        |v| format!("view '{}' is declared more than once", v.name),
        out,
    );

    validate_functions(schema, out);

    for type_def in &schema.types {
        let type_ctx = format!("{}.{}", schema.name, type_def.name);
        for field in type_def.stray_payload() {
            out.push(ValidationError::new(
                ViolationCode::TypeKindMismatch,
                type_ctx.clone(),
                format!("{} type must not declare {}", type_def.kind, field),
            ));
        }
        if type_def.kind == TypeDefKind::Domain && type_def.domain_type.is_none() {
            out.push(ValidationError::new(
                ViolationCode::TypeKindMismatch,
                type_ctx,
                "domain type must declare a base type",
            ));
        }
    }

    for table in &schema.tables {
        validate_table(schema, table, out);
    }
}

/// Functions collide on (name, parameters, format); the same name and
/// parameters may legitimately repeat for different formats.
fn validate_functions(schema: &Schema, out: &mut Vec<ValidationError>) {
    for (i, function) in schema.functions.iter().enumerate() {
        let ctx = format!("{}.{}", schema.name, function.signature());

        let mut seen_formats = HashSet::new();
        for definition in &function.definitions {
            let Some(format) = definition.sql_format else {
                out.push(ValidationError::new(
                    ViolationCode::FunctionDefinitionMissingFormat,
                    ctx.clone(),
                    "function definition does not declare a SQL format",
                ));
                continue;
            };

            if !seen_formats.insert(format) {
                out.push(ValidationError::new(
                    ViolationCode::DuplicateFunction,
                    ctx.clone(),
                    format!("function has more than one {} definition", format),
                ));
                continue;
            }

            let collides = schema.functions[..i].iter().any(|prev: &Function| {
                prev.signature_matches(function) && prev.definition_for(format).is_some()
            });
            if collides {
                out.push(ValidationError::new(
                    ViolationCode::DuplicateFunction,
                    ctx.clone(),
                    format!("function is declared more than once for {}", format),
                ));
            }
        }
    }
}

fn validate_table(schema: &Schema, table: &Table, out: &mut Vec<ValidationError>) {
    let ctx = format!("{}.{}", schema.name, table.name);

    check_duplicates(
        &table.columns,
        ViolationCode::DuplicateColumn,
        &ctx,
        |c| format!("column '{}' is declared more than once", c.name),
        out,
    );
    check_duplicates(
        &table.indexes,
        ViolationCode::DuplicateIndex,
        &ctx,
        |i| format!("index '{}' is declared more than once", i.name),
        out,
    );
    check_duplicates(
        &table.constraints,
        ViolationCode::DuplicateConstraint,
        &ctx,
        |c| format!("constraint '{}' is declared more than once", c.name),
        out,
    );

    let named_keys: Vec<_> = table
        .foreign_keys
        .iter()
        .filter(|fk| !fk.constraint_name.is_empty())
        .cloned()
        .collect();
    check_duplicates(
        &named_keys,
        ViolationCode::DuplicateForeignKey,
        &ctx,
        |fk| format!("foreign key '{}' is declared more than once", fk.constraint_name),
        out,
    );

    for fk in &table.foreign_keys {
        if fk.constraint_name.is_empty() {
            out.push(ValidationError::new(
                ViolationCode::ForeignKeyMissingName,
                ctx.clone(),
                format!("foreign key referencing '{}' has no constraint name", fk.foreign_table),
            ));
        }
        if fk.columns.is_empty() {
            out.push(ValidationError::new(
                ViolationCode::ForeignKeyMissingColumns,
                ctx.clone(),
                format!(
                    "foreign key '{}' does not list any local columns",
                    fk.constraint_name
                ),
            ));
        }
    }

    for column in &table.columns {
        if column.has_any_foreign_key_field() && !column.has_foreign_key() {
            out.push(ValidationError::new(
                ViolationCode::ColumnForeignKeyIncomplete,
                format!("{}.{}", ctx, column.name),
                "foreign key fields are set but no foreign table is named",
            ));
        }
    }

    // Inherited tables may take key columns from their parent.
    if !table.has_parent() {
        for pk in &table.primary_key {
            if table.try_get_column_named(pk).is_none() {
                out.push(ValidationError::new(
                    ViolationCode::PrimaryKeyUnknownColumn,
                    ctx.clone(),
                    format!("primary key column '{}' does not exist", pk),
                ));
            }
        }
    }

    if let Some(rows) = &table.rows {
        for (n, row) in rows.rows.iter().enumerate() {
            if row.values.len() != rows.columns.len() {
                out.push(ValidationError::new(
                    ViolationCode::DataRowArity,
                    ctx.clone(),
                    format!(
                        "row {} has {} value(s) for {} column(s)",
                        n + 1,
                        row.values.len(),
                        rows.columns.len()
                    ),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaplan_core::{
        Column, DomainType, ForeignKey, FunctionDefinition, FunctionParameter, Language, SqlFormat,
        Trigger, TypeDef,
    };

    fn add(format: SqlFormat) -> Function {
        Function::new("add", "int")
            .with_parameter(FunctionParameter::new("a", "int"))
            .with_parameter(FunctionParameter::new("b", "int"))
            .with_definition(FunctionDefinition::new(format, "sql", "SELECT a + b"))
    }

    fn codes(def: &Definition) -> Vec<ViolationCode> {
        collect_violations(def).into_iter().map(|e| e.code).collect()
    }

    #[test]
    fn valid_definition_passes() {
        let def = Definition::new().with_schema(
            Schema::new("public")
                .with_table(
                    Table::new("users")
                        .with_column(Column::new("id", "int"))
                        .with_primary_key(["id"]),
                )
                .with_function(add(SqlFormat::Pgsql8))
                .with_function(add(SqlFormat::Mssql10)),
        );
        assert!(validate(&def).is_ok());
    }

    #[test]
    fn duplicate_tables_are_reported_with_schema_context() {
        let def = Definition::new().with_schema(
            Schema::new("app")
                .with_table(Table::new("users"))
                .with_table(Table::new("USERS")),
        );

        let errors = validate(&def).unwrap_err();
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.code, ViolationCode::DuplicateTable);
        assert_eq!(error.context, "app");
        assert!(error.to_string().contains("USERS"));
    }

    #[test]
    fn duplicate_function_requires_shared_format() {
        let def = Definition::new().with_schema(
            Schema::new("public")
                .with_function(add(SqlFormat::Pgsql8))
                .with_function(add(SqlFormat::Pgsql8)),
        );
        let errors = validate(&def).unwrap_err();
        assert!(errors.contains(ViolationCode::DuplicateFunction));
        assert!(errors.to_string().contains("public.add(int, int)"));
    }

    #[test]
    fn repeated_format_within_one_function() {
        let f = add(SqlFormat::Pgsql8)
            .with_definition(FunctionDefinition::new(SqlFormat::Pgsql8, "sql", "SELECT 0"));
        let def = Definition::new().with_schema(Schema::new("public").with_function(f));
        assert_eq!(codes(&def), vec![ViolationCode::DuplicateFunction]);
    }

    #[test]
    fn function_definition_needs_format() {
        let mut f = add(SqlFormat::Pgsql8);
        f.definitions[0].sql_format = None;
        let def = Definition::new().with_schema(Schema::new("public").with_function(f));
        assert_eq!(codes(&def), vec![ViolationCode::FunctionDefinitionMissingFormat]);
    }

    #[test]
    fn typedef_payload_must_match_kind() {
        let mut composite = TypeDef::composite("pair", Vec::new());
        composite.enum_values = vec!["x".into()];

        let mut domain = TypeDef::domain(
            "email",
            DomainType { base_type: "text".into(), default: None, nullable: true },
        );
        domain.domain_type = None;

        let def = Definition::new().with_schema(
            Schema::new("public").with_type(composite).with_type(domain),
        );
        assert_eq!(
            codes(&def),
            vec![ViolationCode::TypeKindMismatch, ViolationCode::TypeKindMismatch]
        );
    }

    #[test]
    fn foreign_key_rules() {
        let table = Table::new("orders")
            .with_column(Column::new("user_id", "int"))
            .with_foreign_key(ForeignKey::new("", ["user_id"], "", "users", ["id"]))
            .with_foreign_key(ForeignKey::new("fk_x", Vec::<String>::new(), "", "users", ["id"]))
            .with_foreign_key(ForeignKey::new("FK_X", ["user_id"], "", "users", ["id"]));
        let def = Definition::new().with_schema(Schema::new("public").with_table(table));

        let found = codes(&def);
        assert!(found.contains(&ViolationCode::ForeignKeyMissingName));
        assert!(found.contains(&ViolationCode::ForeignKeyMissingColumns));
        assert!(found.contains(&ViolationCode::DuplicateForeignKey));
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn column_foreign_key_without_table() {
        let mut column = Column::new("user_id", "int");
        column.foreign_column = "id".into();
        let def = Definition::new().with_schema(
            Schema::new("public").with_table(Table::new("orders").with_column(column)),
        );

        let errors = collect_violations(&def);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ViolationCode::ColumnForeignKeyIncomplete);
        assert_eq!(errors[0].context, "public.orders.user_id");
    }

    #[test]
    fn primary_key_columns_must_exist_unless_inherited() {
        let own = Table::new("a").with_primary_key(["id"]);
        let inherited = Table::new("b").inheriting("", "a").with_primary_key(["id"]);
        let def = Definition::new()
            .with_schema(Schema::new("public").with_table(own).with_table(inherited));

        let errors = collect_violations(&def);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ViolationCode::PrimaryKeyUnknownColumn);
        assert_eq!(errors[0].context, "public.a");
    }

    #[test]
    fn triggers_duplicate_only_on_same_table() {
        let def = Definition::new().with_schema(
            Schema::new("public")
                .with_trigger(Trigger::new("audit", "users", "log"))
                .with_trigger(Trigger::new("audit", "orders", "log"))
                .with_trigger(Trigger::new("AUDIT", "Users", "log")),
        );
        assert_eq!(codes(&def), vec![ViolationCode::DuplicateTrigger]);
    }

    #[test]
    fn duplicate_languages_and_schemas() {
        let mut def = Definition::new()
            .with_schema(Schema::new("public"))
            .with_schema(Schema::new("Public"));
        def.languages.push(Language { name: "plpgsql".into(), ..Language::default() });
        def.languages.push(Language { name: "PLPGSQL".into(), ..Language::default() });

        assert_eq!(
            codes(&def),
            vec![ViolationCode::DuplicateSchema, ViolationCode::DuplicateLanguage]
        );
    }

    #[test]
    fn code_strings_are_stable() {
        assert_eq!(ViolationCode::DuplicateSchema.as_str(), "DUPLICATE_SCHEMA");
        assert_eq!(ViolationCode::TypeKindMismatch.as_str(), "TYPE_KIND_MISMATCH");
        assert!(ViolationCode::DuplicateView.is_duplicate());
        assert!(!ViolationCode::DataRowArity.is_duplicate());
    }
}
