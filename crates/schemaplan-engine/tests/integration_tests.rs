//! Integration tests for compositing and validation

use pretty_assertions::assert_eq;
use schemaplan_core::{
    Column, CompositeConfig, DataRow, DataRows, Definition, DomainType, Function,
    FunctionDefinition, FunctionParameter, Schema, Sequence, SqlFormat, Table, TypeDef,
};
use schemaplan_engine::{
    collect_violations, composite, composite_documents, validate, CompositeError, Merge,
    ViolationCode,
};

fn table_with_owner(name: &str, owner: &str) -> Table {
    let mut table = Table::new(name)
        .with_column(Column::new("id", "int").not_null())
        .with_primary_key(["id"]);
    table.owner = owner.to_string();
    table
}

fn doc(schema: Schema) -> Definition {
    Definition::new().with_schema(schema)
}

fn base_document() -> Definition {
    doc(Schema::new("public")
        .with_table(table_with_owner("users", "app").with_column(Column::new("email", "text")))
        .with_table(table_with_owner("audit", "app"))
        .with_sequence(Sequence::new("user_ids")))
}

fn overlay_document() -> Definition {
    doc(Schema::new("public")
        .with_table(
            table_with_owner("users", "admin")
                .with_column(Column::new("email", "varchar(320)"))
                .with_column(Column::new("created_at", "timestamptz")),
        )
        .with_table(table_with_owner("sessions", "admin")))
}

#[test]
fn reapplying_an_overlay_is_stable() {
    let mut once = base_document();
    once.merge(overlay_document());

    let mut twice = once.clone();
    twice.merge(overlay_document());

    assert_eq!(twice, once);

    let users = once.schemas[0].try_get_table_named("users").unwrap();
    assert_eq!(users.owner, "admin");
    assert_eq!(users.columns.len(), 3);
    assert_eq!(once.schemas[0].tables.len(), 3);
}

#[test]
fn merge_never_deletes_unmatched_entities() {
    let base = base_document();
    let audit_before = base.schemas[0].try_get_table_named("audit").unwrap().clone();
    let sequence_before = base.schemas[0].try_get_sequence_named("user_ids").unwrap().clone();

    let merged = composite(vec![base, overlay_document()]);
    let schema = &merged.schemas[0];

    assert_eq!(schema.try_get_table_named("audit"), Some(&audit_before));
    assert_eq!(schema.try_get_sequence_named("user_ids"), Some(&sequence_before));
    assert!(schema
        .try_get_table_named("users")
        .unwrap()
        .try_get_column_named("email")
        .is_some());
}

#[test]
fn fold_order_decides_scalar_winners() {
    let a = doc(Schema::new("public").with_table(table_with_owner("users", "alice")));
    let b = doc(Schema::new("public").with_table(table_with_owner("users", "bob")));

    let ab = composite(vec![a.clone(), b.clone()]);
    let ba = composite(vec![b, a]);

    assert_eq!(ab.schemas[0].tables[0].owner, "bob");
    assert_eq!(ba.schemas[0].tables[0].owner, "alice");
}

#[test]
fn stepwise_fold_equals_direct_fold() {
    let a = base_document();
    let b = overlay_document();
    let mut c_table = table_with_owner("users", "carol");
    c_table.description = "application users".to_string();
    let c = doc(Schema::new("public").with_table(c_table));

    let mut stepwise = composite(vec![a.clone(), b.clone()]);
    stepwise.merge(c.clone());

    let direct = composite(vec![a, b, c]);
    assert_eq!(stepwise, direct);
    assert_eq!(direct.schemas[0].tables[0].owner, "carol");
}

#[test]
fn validator_reports_each_planted_violation() {
    let mut bad_type = TypeDef::enumeration("mood", ["happy", "sad"]);
    bad_type.domain_type = Some(DomainType {
        base_type: "text".to_string(),
        default: None,
        nullable: true,
    });

    let lookup = || {
        Function::new("lookup", "int")
            .with_parameter(FunctionParameter::new("key", "text"))
            .with_definition(FunctionDefinition::new(SqlFormat::Pgsql8, "sql", "SELECT 1"))
    };

    let def = Definition::new()
        .with_schema(
            Schema::new("public")
                .with_type(bad_type)
                .with_function(lookup())
                .with_function(lookup()),
        )
        .with_schema(Schema::new("PUBLIC"));

    let violations = collect_violations(&def);
    let codes: Vec<ViolationCode> = violations.iter().map(|v| v.code).collect();

    assert!(violations.len() >= 3, "got {violations:?}");
    for expected in [
        ViolationCode::DuplicateSchema,
        ViolationCode::DuplicateFunction,
        ViolationCode::TypeKindMismatch,
    ] {
        assert!(codes.contains(&expected), "missing {expected:?} in {codes:?}");
    }

    let errors = validate(&def).unwrap_err();
    assert_eq!(errors.len(), violations.len());
}

#[test]
fn clean_composite_validates() {
    let def = composite(vec![base_document(), overlay_document()]);
    assert!(validate(&def).is_ok());
}

#[test]
fn json_documents_run_through_the_pipeline() {
    let base: Definition = serde_json::from_value(serde_json::json!({
        "schemas": [{
            "name": "public",
            "tables": [{
                "name": "users",
                "primary_key": ["id"],
                "columns": [
                    { "name": "id", "type": "int", "nullable": false },
                    { "name": "email", "type": "text" }
                ],
                "rows": {
                    "columns": ["id", "email"],
                    "rows": [{ "values": ["1", "root@example.com"] }]
                }
            }]
        }]
    }))
    .unwrap();

    let overlay: Definition = serde_json::from_value(serde_json::json!({
        "database": { "sql_format": "pgsql8" },
        "schemas": [{
            "name": "public",
            "tables": [{
                "name": "users",
                "primary_key": ["id"],
                "rows": {
                    "columns": ["id", "email"],
                    "rows": [
                        { "values": ["1", "admin@example.com"] },
                        { "values": ["2", null] }
                    ]
                }
            }]
        }]
    }))
    .unwrap();

    let def = composite_documents(vec![base, overlay], &CompositeConfig::default()).unwrap();
    assert_eq!(def.sql_format(), Some(SqlFormat::Pgsql8));

    let users = def.schemas[0].try_get_table_named("users").unwrap();
    assert_eq!(users.columns.len(), 2);

    let rows = users.rows.as_ref().unwrap();
    assert_eq!(rows.rows.len(), 2);
    assert_eq!(rows.rows[0].values[1].as_deref(), Some("admin@example.com"));
    assert_eq!(rows.rows[1].values[1], None);

    let encoded = serde_json::to_value(&def).unwrap();
    let decoded: Definition = serde_json::from_value(encoded).unwrap();
    assert_eq!(decoded, def);
}

#[test]
fn pipeline_reports_overlay_that_breaks_the_definition() {
    let broken = doc(Schema::new("public").with_table(
        Table::new("users").with_column(Column::proxy("bad").references("", "", "id")),
    ));

    let err = composite_documents(
        vec![base_document(), overlay_document(), broken],
        &CompositeConfig::default(),
    )
    .unwrap_err();

    match err {
        CompositeError::Invalid { index, errors } => {
            assert_eq!(index, 2);
            assert!(errors.contains(ViolationCode::ColumnForeignKeyIncomplete));
            // Primary key was overwritten with an empty list, so only the
            // foreign key fields are at fault.
            assert_eq!(errors.len(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn row_arity_errors_survive_the_merge() {
    let with_rows = |rows: Vec<DataRow>| {
        let mut table = Table::new("status")
            .with_column(Column::new("id", "int"))
            .with_column(Column::new("label", "text"))
            .with_primary_key(["id"]);
        table.rows = Some(DataRows {
            columns: vec!["id".to_string(), "label".to_string()],
            rows,
        });
        doc(Schema::new("public").with_table(table))
    };

    let base = with_rows(vec![DataRow::new(["1", "a"])]);
    let overlay = with_rows(vec![DataRow::new(["2"]), DataRow::new(["3", "b", "EXTRA"])]);

    let err = composite_documents(vec![base, overlay], &CompositeConfig::default()).unwrap_err();
    match err {
        CompositeError::Invalid { index, errors } => {
            assert_eq!(index, 1);
            assert_eq!(errors.len(), 2);
            assert!(errors.iter().all(|e| e.code == ViolationCode::DataRowArity));
        }
        other => panic!("unexpected error: {other}"),
    }
}
