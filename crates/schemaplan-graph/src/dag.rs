//! Table dependency graph and creation ordering
//!
//! A table depends on every table its foreign keys point at: column-level
//! foreign keys, table-level foreign key elements, and FOREIGN KEY
//! constraints naming a foreign table. Inheritance and sequence ownership do
//! not create edges.

use schemaplan_core::{Definition, OrderingConfig, Table};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::resolver::{ResolveError, Resolver, TableRef};

/// Node identifier: position of the table in discovery order
type NodeId = usize;

/// Dependency ordering failures
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    #[error("Dependency cycle detected; tables left unordered: {}", .tables.join(", "))]
    Cycle { tables: Vec<String> },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Dependency graph over the tables of one definition
#[derive(Debug, Clone)]
pub struct DependencyGraph<'a> {
    /// Tables in discovery order (schemas in order, tables in order)
    tables: Vec<TableRef<'a>>,

    /// Forward edges: table -> tables it depends on
    parents: BTreeMap<NodeId, BTreeSet<NodeId>>,

    /// Reverse edges: table -> tables that depend on it
    children: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph, resolving every foreign key reference
    pub fn build(def: &'a Definition, config: &OrderingConfig) -> Result<Self, DagError> {
        let resolver = Resolver::new(def);

        let tables: Vec<TableRef<'a>> = def
            .schemas
            .iter()
            .flat_map(|schema| {
                schema
                    .tables
                    .iter()
                    .map(move |table| TableRef::new(schema, table))
            })
            .collect();

        let ids: HashMap<*const Table, NodeId> = tables
            .iter()
            .enumerate()
            .map(|(id, t)| (t.table as *const Table, id))
            .collect();

        let mut parents: BTreeMap<NodeId, BTreeSet<NodeId>> =
            (0..tables.len()).map(|id| (id, BTreeSet::new())).collect();
        let mut children: BTreeMap<NodeId, BTreeSet<NodeId>> =
            (0..tables.len()).map(|id| (id, BTreeSet::new())).collect();

        for (id, node) in tables.iter().enumerate() {
            let (schema, table) = (node.schema, node.table);
            let mut targets = Vec::new();

            for column in table.columns.iter().filter(|c| c.has_foreign_key()) {
                let key = resolver.resolve_foreign_key_column(schema, table, column)?;
                targets.push(key.table_ref());
            }

            for foreign_key in &table.foreign_keys {
                let key = resolver.resolve_table_foreign_key(schema, table, foreign_key)?;
                targets.push(key.table_ref());
            }

            for constraint in table.constraints.iter().filter(|c| c.references_table()) {
                targets.push(resolver.resolve_constraint_table(schema, table, constraint)?);
            }

            for target in targets {
                let Some(&dep) = ids.get(&(target.table as *const Table)) else {
                    continue;
                };
                if dep == id && config.allow_self_references {
                    continue;
                }
                parents.entry(id).or_default().insert(dep);
                children.entry(dep).or_default().insert(id);
            }
        }

        let edges: usize = parents.values().map(BTreeSet::len).sum();
        tracing::debug!(tables = tables.len(), edges, "built table dependency graph");

        Ok(Self {
            tables,
            parents,
            children,
        })
    }

    /// All tables in discovery order
    pub fn tables(&self) -> &[TableRef<'a>] {
        &self.tables
    }

    fn id_of(&self, table: &TableRef<'_>) -> Option<NodeId> {
        self.tables.iter().position(|t| {
            std::ptr::eq(t.schema, table.schema) && std::ptr::eq(t.table, table.table)
        })
    }

    fn refs(&self, ids: impl IntoIterator<Item = NodeId>) -> Vec<TableRef<'a>> {
        ids.into_iter().map(|id| self.tables[id]).collect()
    }

    /// Tables `table` references directly
    pub fn parents(&self, table: &TableRef<'_>) -> Vec<TableRef<'a>> {
        self.id_of(table)
            .and_then(|id| self.parents.get(&id))
            .map(|deps| self.refs(deps.iter().copied()))
            .unwrap_or_default()
    }

    /// Tables referencing `table` directly
    pub fn children(&self, table: &TableRef<'_>) -> Vec<TableRef<'a>> {
        self.id_of(table)
            .and_then(|id| self.children.get(&id))
            .map(|deps| self.refs(deps.iter().copied()))
            .unwrap_or_default()
    }

    /// Every table that transitively depends on `table`
    ///
    /// These must be dropped before `table` can be.
    pub fn downstream(&self, table: &TableRef<'_>) -> Vec<TableRef<'a>> {
        self.id_of(table)
            .map(|id| self.refs(walk(&self.children, id)))
            .unwrap_or_default()
    }

    /// Every table `table` transitively depends on
    pub fn upstream(&self, table: &TableRef<'_>) -> Vec<TableRef<'a>> {
        self.id_of(table)
            .map(|id| self.refs(walk(&self.parents, id)))
            .unwrap_or_default()
    }

    /// Order tables so each appears after every table it references
    ///
    /// Each round removes all tables whose remaining dependencies are empty,
    /// in discovery order. A round that removes nothing means a cycle.
    pub fn creation_order(&self) -> Result<Vec<TableRef<'a>>, DagError> {
        let mut remaining = self.parents.clone();
        let mut order = Vec::with_capacity(self.tables.len());
        let mut round = 0usize;

        while !remaining.is_empty() {
            let ready: Vec<NodeId> = remaining
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(&id, _)| id)
                .collect();

            if ready.is_empty() {
                let tables = remaining
                    .keys()
                    .map(|&id| self.tables[id].qualified_name())
                    .collect();
                return Err(DagError::Cycle { tables });
            }

            round += 1;
            tracing::debug!(
                round,
                ready = ready.len(),
                remaining = remaining.len(),
                "dependency round"
            );

            for id in ready {
                remaining.remove(&id);
                if let Some(dependents) = self.children.get(&id) {
                    for dependent in dependents {
                        if let Some(deps) = remaining.get_mut(dependent) {
                            deps.remove(&id);
                        }
                    }
                }
                order.push(self.tables[id]);
            }
        }

        Ok(order)
    }

    /// Reverse of [`Self::creation_order`]
    pub fn drop_order(&self) -> Result<Vec<TableRef<'a>>, DagError> {
        let mut order = self.creation_order()?;
        order.reverse();
        Ok(order)
    }
}

/// Breadth-first transitive closure over `edges` starting after `start`
fn walk(edges: &BTreeMap<NodeId, BTreeSet<NodeId>>, start: NodeId) -> Vec<NodeId> {
    let mut visited = BTreeSet::new();
    let mut queue: VecDeque<NodeId> = edges.get(&start).into_iter().flatten().copied().collect();
    let mut result = Vec::new();

    while let Some(current) = queue.pop_front() {
        if current == start || !visited.insert(current) {
            continue;
        }
        result.push(current);

        if let Some(next) = edges.get(&current) {
            queue.extend(next.iter().copied().filter(|n| !visited.contains(n)));
        }
    }

    result
}

/// Safe table creation order with default ordering settings
pub fn table_dependency_order(def: &Definition) -> Result<Vec<TableRef<'_>>, DagError> {
    table_dependency_order_with(def, &OrderingConfig::default())
}

/// Safe table creation order
pub fn table_dependency_order_with<'a>(
    def: &'a Definition,
    config: &OrderingConfig,
) -> Result<Vec<TableRef<'a>>, DagError> {
    DependencyGraph::build(def, config)?.creation_order()
}
