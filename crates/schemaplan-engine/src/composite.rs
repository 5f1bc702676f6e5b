//! Compositing: folding overlay definitions into a base definition
//!
//! Merge rules, applied at every level of the tree:
//! - scalar attributes are overwritten by the overlay
//! - child collections with an identity are merged per child: an overlay
//!   child matching a base child is merged into it, otherwise appended
//! - base children without an overlay counterpart are never removed
//! - grants are always appended
//! - a table's foreign keys are replaced wholesale by the overlay's list
//! - columns (and other leaf entities) are replaced as a whole value
//!
//! Compositing is a left fold: later overlays win scalar conflicts.

use schemaplan_core::identity::Identity;
use schemaplan_core::{
    names_match, Column, ConfigParam, Constraint, DataRow, DataRows, Database, Definition,
    Function, FunctionDefinition, Index, Language, Schema, Sequence, Table, TableOption, Trigger,
    TypeDef, View, ViewQuery,
};

/// Fold an overlay into `self`
///
/// Merging never fails. Structural problems it introduces are left for the
/// validator.
pub trait Merge {
    fn merge(&mut self, overlay: Self);
}

/// Merge each overlay child into the base child it identity-matches, or
/// append it.
///
/// Only children present before this call are merge targets: two overlay
/// children with the same identity both land in the result and are left for
/// the validator to report.
pub fn merge_children<T: Identity + Merge>(base: &mut Vec<T>, overlay: Vec<T>) {
    let existing = base.len();
    for child in overlay {
        match base[..existing]
            .iter_mut()
            .find(|b| b.identity_matches(&child))
        {
            Some(target) => target.merge(child),
            None => base.push(child),
        }
    }
}

/// Composite `documents` in order. The first document is the base.
pub fn composite<I>(documents: I) -> Definition
where
    I: IntoIterator<Item = Definition>,
{
    let mut documents = documents.into_iter();
    let mut base = documents.next().unwrap_or_default();
    for overlay in documents {
        base.merge(overlay);
    }
    base
}

/// Leaf entities merge by whole-value replacement
macro_rules! merge_by_assignment {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Merge for $ty {
                fn merge(&mut self, overlay: Self) {
                    *self = overlay;
                }
            }
        )+
    };
}

merge_by_assignment!(
    Column,
    Index,
    Constraint,
    TableOption,
    TypeDef,
    Trigger,
    FunctionDefinition,
    ViewQuery,
    ConfigParam,
    Language,
);

impl Merge for Definition {
    fn merge(&mut self, overlay: Self) {
        if let Some(database) = overlay.database {
            self.database.get_or_insert_with(Database::default).merge(database);
        }

        merge_children(&mut self.schemas, overlay.schemas);
        merge_children(&mut self.languages, overlay.languages);

        for sql in overlay.sql {
            if !self.sql.iter().any(|s| s.identity_matches(&sql)) {
                self.sql.push(sql);
            }
        }
    }
}

impl Merge for Database {
    fn merge(&mut self, overlay: Self) {
        if overlay.sql_format.is_some() {
            self.sql_format = overlay.sql_format;
        }

        if let Some(roles) = overlay.roles {
            match &mut self.roles {
                Some(base) => {
                    base.application = roles.application;
                    base.owner = roles.owner;
                    base.replication = roles.replication;
                    base.read_only = roles.read_only;
                    for role in roles.custom_roles {
                        if !base.custom_roles.iter().any(|r| names_match(r, &role)) {
                            base.custom_roles.push(role);
                        }
                    }
                }
                None => self.roles = Some(roles),
            }
        }

        merge_children(&mut self.config_params, overlay.config_params);
    }
}

impl Merge for Schema {
    fn merge(&mut self, overlay: Self) {
        self.owner = overlay.owner;
        self.description = overlay.description;

        merge_children(&mut self.tables, overlay.tables);
        merge_children(&mut self.types, overlay.types);
        merge_children(&mut self.sequences, overlay.sequences);
        merge_children(&mut self.functions, overlay.functions);
        merge_children(&mut self.triggers, overlay.triggers);
        merge_children(&mut self.views, overlay.views);

        self.grants.extend(overlay.grants);
    }
}

impl Merge for Table {
    fn merge(&mut self, overlay: Self) {
        self.owner = overlay.owner;
        self.description = overlay.description;
        self.primary_key = overlay.primary_key;
        self.primary_key_name = overlay.primary_key_name;
        self.cluster_index = overlay.cluster_index;
        self.inherits_schema = overlay.inherits_schema;
        self.inherits_table = overlay.inherits_table;

        merge_children(&mut self.table_options, overlay.table_options);
        merge_children(&mut self.columns, overlay.columns);
        merge_children(&mut self.indexes, overlay.indexes);
        merge_children(&mut self.constraints, overlay.constraints);

        // Constraint names may be absent, so per-entry matching is unreliable.
        self.foreign_keys = overlay.foreign_keys;

        self.grants.extend(overlay.grants);

        if let Some(rows) = overlay.rows {
            match &mut self.rows {
                Some(base) => merge_rows(base, rows, &self.primary_key),
                None => self.rows = Some(rows),
            }
        }
    }
}

impl Merge for Sequence {
    fn merge(&mut self, overlay: Self) {
        self.owner = overlay.owner;
        self.description = overlay.description;
        self.cache = overlay.cache;
        self.start = overlay.start;
        self.min = overlay.min;
        self.max = overlay.max;
        self.increment = overlay.increment;
        self.cycle = overlay.cycle;
        self.owned_by = overlay.owned_by;

        self.grants.extend(overlay.grants);
    }
}

impl Merge for Function {
    fn merge(&mut self, overlay: Self) {
        self.owner = overlay.owner;
        self.description = overlay.description;
        self.returns = overlay.returns;
        self.cache_policy = overlay.cache_policy;
        self.security_definer = overlay.security_definer;
        self.parameters = overlay.parameters;

        merge_children(&mut self.definitions, overlay.definitions);

        self.grants.extend(overlay.grants);
    }
}

impl Merge for View {
    fn merge(&mut self, overlay: Self) {
        self.owner = overlay.owner;
        self.description = overlay.description;
        self.depends_on_views = overlay.depends_on_views;

        merge_children(&mut self.queries, overlay.queries);

        self.grants.extend(overlay.grants);
    }
}

/// Merge overlay rows into base rows, matching on primary key values
///
/// Overlay columns missing from the base are appended to the base column
/// list; existing base rows get NULL for them. Without a primary key present
/// on both sides every overlay row is appended.
///
/// Rows whose value count differs from their own column list are never
/// reshaped: malformed base rows keep their values, malformed overlay rows
/// are appended as they are, and neither takes part in key matching.
fn merge_rows(base: &mut DataRows, overlay: DataRows, primary_key: &[String]) {
    let base_width = base.columns.len();
    let overlay_width = overlay.columns.len();

    let mut mapping = Vec::with_capacity(overlay.columns.len());
    for column in &overlay.columns {
        let idx = match base.column_index(column) {
            Some(idx) => idx,
            None => {
                base.columns.push(column.clone());
                base.columns.len() - 1
            }
        };
        mapping.push(idx);
    }

    let width = base.columns.len();
    for row in base.rows.iter_mut().filter(|r| r.values.len() == base_width) {
        row.values.resize(width, None);
    }

    let key_positions: Option<Vec<(usize, usize)>> = if primary_key.is_empty() {
        None
    } else {
        primary_key
            .iter()
            .map(|pk| {
                let overlay_idx = overlay.columns.iter().position(|c| names_match(c, pk))?;
                Some((overlay_idx, mapping[overlay_idx]))
            })
            .collect()
    };

    for row in overlay.rows {
        if row.values.len() != overlay_width {
            base.rows.push(row);
            continue;
        }

        let target = key_positions.as_ref().and_then(|keys| {
            base.rows.iter().position(|existing| {
                existing.values.len() == width
                    && keys.iter().all(|&(overlay_idx, base_idx)| {
                        let value = &row.values[overlay_idx];
                        value.is_some() && existing.values[base_idx] == *value
                    })
            })
        });

        let target = match target {
            Some(idx) => idx,
            None => {
                base.rows.push(DataRow {
                    values: vec![None; width],
                    delete: false,
                });
                base.rows.len() - 1
            }
        };

        let existing = &mut base.rows[target];
        for (value, &base_idx) in row.values.into_iter().zip(&mapping) {
            existing.values[base_idx] = value;
        }
        existing.delete = row.delete;
    }
}
