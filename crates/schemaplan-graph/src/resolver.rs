//! Reference resolution
//!
//! Turns name references (foreign keys, inheritance) into borrowed entities
//! of a composited definition. Resolution happens on demand and never
//! mutates the definition. Dangling names are reported as errors.

use schemaplan_core::{Column, Constraint, Definition, ForeignKey, KeyNames, Schema, Table};
use std::collections::HashSet;
use std::fmt;

/// A resolved table together with the schema that owns it
#[derive(Clone, Copy)]
pub struct TableRef<'a> {
    pub schema: &'a Schema,
    pub table: &'a Table,
}

impl<'a> TableRef<'a> {
    pub fn new(schema: &'a Schema, table: &'a Table) -> Self {
        Self { schema, table }
    }

    /// `schema.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema.name, self.table.name)
    }
}

/// Two refs are equal when they point at the same table value
impl PartialEq for TableRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && std::ptr::eq(self.table, other.table)
    }
}

impl Eq for TableRef<'_> {}

impl fmt::Debug for TableRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableRef")
            .field("schema", &self.schema.name)
            .field("table", &self.table.name)
            .finish()
    }
}

impl fmt::Display for TableRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema.name, self.table.name)
    }
}

/// A resolved key: columns of one table
///
/// Columns may be declared on an ancestor of `table` when the key was
/// resolved through inheritance. Keys borrow from the definition and are
/// never stored in it; [`KeyNames`] is the stored form.
#[derive(Clone)]
pub struct Key<'a> {
    pub schema: &'a Schema,
    pub table: &'a Table,
    pub columns: Vec<&'a Column>,
}

impl<'a> Key<'a> {
    pub fn table_ref(&self) -> TableRef<'a> {
        TableRef::new(self.schema, self.table)
    }

    pub fn column_names(&self) -> Vec<&'a str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl fmt::Debug for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("schema", &self.schema.name)
            .field("table", &self.table.name)
            .field("columns", &self.column_names())
            .finish()
    }
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({})",
            self.schema.name,
            self.table.name,
            self.column_names().join(", ")
        )
    }
}

/// Resolution failures
///
/// `referrer` names the entity holding the dangling reference:
/// `schema.table.column` for column foreign keys, `schema.table (name)` for
/// table foreign keys and constraints, the child table for inheritance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Reference to unknown schema '{schema}' from '{referrer}'")]
    UnknownSchema { referrer: String, schema: String },

    #[error("Reference to unknown table '{schema}.{table}' from '{referrer}'")]
    UnknownTable {
        referrer: String,
        schema: String,
        table: String,
    },

    #[error(
        "Reference to unknown column '{column}' on '{schema}.{table}' or its ancestors \
         from '{referrer}'"
    )]
    UnknownColumn {
        referrer: String,
        schema: String,
        table: String,
        column: String,
    },

    #[error(
        "Foreign key {referrer} -> {target}: {local} local column(s) but {foreign} foreign \
         column(s)"
    )]
    ColumnCountMismatch {
        referrer: String,
        target: String,
        local: usize,
        foreign: usize,
    },

    #[error("Foreign key '{name}' on '{referrer}' lists no local columns")]
    EmptyKey { referrer: String, name: String },

    #[error("Inheritance cycle through '{table}'")]
    InheritanceCycle { table: String },

    #[error("Foreign key chain from '{start}' loops back to '{column}'")]
    ForeignKeyCycle { start: String, column: String },

    #[error(
        "Column '{column}' reached from '{referrer}' has no type and no foreign key to take \
         one from"
    )]
    UntypedColumn { referrer: String, column: String },
}

/// Resolves name references against one definition
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    def: &'a Definition,
}

impl<'a> Resolver<'a> {
    pub fn new(def: &'a Definition) -> Self {
        Self { def }
    }

    pub fn definition(&self) -> &'a Definition {
        self.def
    }

    /// Resolve `schema_name.table_name` as seen from `local_schema`
    ///
    /// An empty `schema_name` means `local_schema` itself.
    pub fn resolve_schema_table(
        &self,
        local_schema: &'a Schema,
        schema_name: &str,
        table_name: &str,
    ) -> Result<TableRef<'a>, ResolveError> {
        self.lookup_table(local_schema, schema_name, table_name, &local_schema.name)
    }

    /// Resolve the foreign table a FOREIGN KEY constraint of `table` names
    pub fn resolve_constraint_table(
        &self,
        schema: &'a Schema,
        table: &'a Table,
        constraint: &Constraint,
    ) -> Result<TableRef<'a>, ResolveError> {
        self.lookup_table(
            schema,
            &constraint.foreign_schema,
            &constraint.foreign_table,
            &named_referrer(schema, table, &constraint.name),
        )
    }

    fn lookup_table(
        &self,
        local_schema: &'a Schema,
        schema_name: &str,
        table_name: &str,
        referrer: &str,
    ) -> Result<TableRef<'a>, ResolveError> {
        let schema = if schema_name.is_empty() {
            local_schema
        } else {
            self.def
                .try_get_schema_named(schema_name)
                .ok_or_else(|| ResolveError::UnknownSchema {
                    referrer: referrer.to_string(),
                    schema: schema_name.to_string(),
                })?
        };

        let table = schema
            .try_get_table_named(table_name)
            .ok_or_else(|| ResolveError::UnknownTable {
                referrer: referrer.to_string(),
                schema: schema.name.clone(),
                table: table_name.to_string(),
            })?;

        Ok(TableRef::new(schema, table))
    }

    /// Find `column` on `table` or, failing that, on its ancestors
    ///
    /// Returns `Ok(None)` when the inheritance chain ends without finding the
    /// column. A dangling parent reference is an error.
    pub fn try_inheritance_get_column(
        &self,
        schema: &'a Schema,
        table: &'a Table,
        column: &str,
    ) -> Result<Option<&'a Column>, ResolveError> {
        Ok(self
            .find_inherited_column(schema, table, column)?
            .map(|(_, col)| col))
    }

    /// Like [`Self::try_inheritance_get_column`], also returning the table
    /// that declares the column
    fn find_inherited_column(
        &self,
        schema: &'a Schema,
        table: &'a Table,
        column: &str,
    ) -> Result<Option<(TableRef<'a>, &'a Column)>, ResolveError> {
        let mut current = TableRef::new(schema, table);
        let mut visited: HashSet<*const Table> = HashSet::new();

        loop {
            if !visited.insert(current.table as *const Table) {
                return Err(ResolveError::InheritanceCycle {
                    table: current.qualified_name(),
                });
            }

            if let Some(col) = current.table.try_get_column_named(column) {
                return Ok(Some((current, col)));
            }

            if !current.table.has_parent() {
                return Ok(None);
            }

            current = self.lookup_table(
                current.schema,
                &current.table.inherits_schema,
                &current.table.inherits_table,
                &current.qualified_name(),
            )?;
        }
    }

    /// Resolve named local columns of `table` into a key
    pub fn local_key(
        &self,
        schema: &'a Schema,
        table: &'a Table,
        columns: &[String],
    ) -> Result<Key<'a>, ResolveError> {
        let referrer = TableRef::new(schema, table).qualified_name();
        self.local_key_for(schema, table, columns, &referrer)
    }

    fn local_key_for(
        &self,
        schema: &'a Schema,
        table: &'a Table,
        columns: &[String],
        referrer: &str,
    ) -> Result<Key<'a>, ResolveError> {
        let columns = columns
            .iter()
            .map(|name| {
                self.try_inheritance_get_column(schema, table, name)?
                    .ok_or_else(|| ResolveError::UnknownColumn {
                        referrer: referrer.to_string(),
                        schema: schema.name.clone(),
                        table: table.name.clone(),
                        column: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Key {
            schema,
            table,
            columns,
        })
    }

    /// Resolve the foreign side of a key
    ///
    /// `foreign.schema` is relative to the local key's schema. An empty
    /// foreign column name resolves to the local column with the same
    /// position; an empty foreign column list does so for every column.
    /// Foreign columns may be inherited.
    ///
    /// # Panics
    ///
    /// Panics if `local` has no columns.
    pub fn resolve_foreign_key(
        &self,
        local: &Key<'a>,
        foreign: &KeyNames,
    ) -> Result<Key<'a>, ResolveError> {
        let referrer = match local.columns.as_slice() {
            [column] => format!("{}.{}", local.table_ref(), column.name),
            _ => local.to_string(),
        };
        let referrer = if foreign.key_name.is_empty() {
            referrer
        } else {
            format!("{} ({})", referrer, foreign.key_name)
        };
        self.resolve_foreign_key_from(local, foreign, &referrer)
    }

    fn resolve_foreign_key_from(
        &self,
        local: &Key<'a>,
        foreign: &KeyNames,
        referrer: &str,
    ) -> Result<Key<'a>, ResolveError> {
        assert!(
            !local.columns.is_empty(),
            "cannot resolve a foreign key for an empty local key on {}",
            local.table_ref()
        );

        let target = self.lookup_table(local.schema, &foreign.schema, &foreign.table, referrer)?;

        if !foreign.columns.is_empty() && foreign.columns.len() != local.columns.len() {
            return Err(ResolveError::ColumnCountMismatch {
                referrer: referrer.to_string(),
                target: foreign.to_string(),
                local: local.columns.len(),
                foreign: foreign.columns.len(),
            });
        }

        let columns = local
            .columns
            .iter()
            .enumerate()
            .map(|(i, local_col)| {
                let name = foreign
                    .columns
                    .get(i)
                    .filter(|n| !n.is_empty())
                    .unwrap_or(&local_col.name);

                self.try_inheritance_get_column(target.schema, target.table, name)?
                    .ok_or_else(|| ResolveError::UnknownColumn {
                        referrer: referrer.to_string(),
                        schema: target.schema.name.clone(),
                        table: target.table.name.clone(),
                        column: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Key {
            schema: target.schema,
            table: target.table,
            columns,
        })
    }

    /// Resolve the column-level foreign key declared on `column`
    ///
    /// # Panics
    ///
    /// Panics if `column` declares no foreign key; check
    /// [`Column::has_foreign_key`] first.
    pub fn resolve_foreign_key_column(
        &self,
        schema: &'a Schema,
        table: &'a Table,
        column: &'a Column,
    ) -> Result<Key<'a>, ResolveError> {
        let Some(foreign) = column.foreign_key_names() else {
            panic!(
                "column {}.{}.{} has no foreign key to resolve",
                schema.name, table.name, column.name
            );
        };

        let local = Key {
            schema,
            table,
            columns: vec![column],
        };
        let referrer = format!("{}.{}.{}", schema.name, table.name, column.name);
        self.resolve_foreign_key_from(&local, &foreign, &referrer)
    }

    /// Resolve a table-level foreign key element of `table`
    pub fn resolve_table_foreign_key(
        &self,
        schema: &'a Schema,
        table: &'a Table,
        foreign_key: &ForeignKey,
    ) -> Result<Key<'a>, ResolveError> {
        if foreign_key.columns.is_empty() {
            return Err(ResolveError::EmptyKey {
                referrer: TableRef::new(schema, table).qualified_name(),
                name: foreign_key.constraint_name.clone(),
            });
        }

        let referrer = named_referrer(schema, table, &foreign_key.constraint_name);
        let local = self.local_key_for(schema, table, &foreign_key.columns, &referrer)?;
        self.resolve_foreign_key_from(&local, &foreign_key.foreign_key_names(), &referrer)
    }

    /// Follow `column`'s foreign key, and the foreign keys of untyped proxy
    /// columns after it, to the first column with a declared type
    ///
    /// # Panics
    ///
    /// Panics if `column` declares no foreign key.
    pub fn get_terminal_foreign_column(
        &self,
        schema: &'a Schema,
        table: &'a Table,
        column: &'a Column,
    ) -> Result<&'a Column, ResolveError> {
        let start = format!("{}.{}.{}", schema.name, table.name, column.name);
        let mut visited: HashSet<*const Column> = HashSet::new();
        visited.insert(column as *const Column);

        let mut key = self.resolve_foreign_key_column(schema, table, column)?;
        loop {
            let foreign = key.columns[0];
            let owner = self
                .find_inherited_column(key.schema, key.table, &foreign.name)?
                .map(|(owner, _)| owner)
                .unwrap_or_else(|| key.table_ref());
            let qualified = format!("{}.{}", owner.qualified_name(), foreign.name);

            if foreign.data_type.is_some() {
                return Ok(foreign);
            }
            if !foreign.has_foreign_key() {
                return Err(ResolveError::UntypedColumn {
                    referrer: start,
                    column: qualified,
                });
            }
            if !visited.insert(foreign as *const Column) {
                return Err(ResolveError::ForeignKeyCycle {
                    start,
                    column: qualified,
                });
            }

            tracing::trace!(from = %start, via = %qualified, "following proxy column");
            key = self.resolve_foreign_key_column(owner.schema, owner.table, foreign)?;
        }
    }
}

/// `schema.table (name)`, or `schema.table` for unnamed keys
fn named_referrer(schema: &Schema, table: &Table, name: &str) -> String {
    if name.is_empty() {
        format!("{}.{}", schema.name, table.name)
    } else {
        format!("{}.{} ({})", schema.name, table.name, name)
    }
}
