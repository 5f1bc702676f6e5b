//! schemaplan graph
//!
//! Read-only queries over a composited definition:
//! - Resolving foreign key and inheritance references
//! - Ordering tables for creation

pub mod dag;
pub mod resolver;

pub use dag::{table_dependency_order, table_dependency_order_with, DagError, DependencyGraph};
pub use resolver::{Key, ResolveError, Resolver, TableRef};
