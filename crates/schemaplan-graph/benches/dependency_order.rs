//! Benchmarks for table dependency ordering
//!
//! Each generated table references the two tables before it, so every round
//! of ordering peels exactly one table.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use schemaplan_core::{Column, Definition, Schema, Table};
use schemaplan_graph::{table_dependency_order, Resolver};

/// Generate one schema with `num_tables` chained tables, declared in reverse
fn generate_chain(num_tables: usize) -> Definition {
    let mut schema = Schema::new("bench");

    for i in (0..num_tables).rev() {
        let mut table = Table::new(format!("table_{}", i))
            .with_column(Column::new("id", "bigint"))
            .with_primary_key(["id"]);

        for j in i.saturating_sub(2)..i {
            let column = Column::proxy(format!("table_{}_id", j));
            table = table.with_column(column.references("", format!("table_{}", j), "id"));
        }
        schema.tables.push(table);
    }

    Definition::new().with_schema(schema)
}

fn bench_dependency_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("dependency_order");

    for num_tables in [10, 100, 500] {
        let def = generate_chain(num_tables);
        group.bench_with_input(BenchmarkId::from_parameter(num_tables), &def, |b, def| {
            b.iter(|| table_dependency_order(black_box(def)).unwrap())
        });
    }

    group.finish();
}

fn bench_terminal_column(c: &mut Criterion) {
    let def = generate_chain(100);
    let schema = &def.schemas[0];
    let table = &schema.tables[0];
    let column = &table.columns[1];

    c.bench_function("terminal_foreign_column", |b| {
        let resolver = Resolver::new(&def);
        b.iter(|| {
            resolver
                .get_terminal_foreign_column(schema, table, black_box(column))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_dependency_order, bench_terminal_column);
criterion_main!(benches);
