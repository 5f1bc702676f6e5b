//! schemaplan core
//!
//! The intermediate representation of a database schema: the entity tree
//! rooted at [`Definition`], the closed enumerations its fields draw from,
//! and the identity/equality primitives compositing and validation build on.
//!
//! Child entities are owned by their parent. References between entities
//! (foreign keys, inheritance, trigger functions) are by name and are
//! resolved on demand by `schemaplan-graph`.

pub mod config;
pub mod definition;
pub mod enums;
pub mod grant;
pub mod identity;
pub mod key;
pub mod objects;
pub mod schema;
pub mod table;

pub use config::{CompositeConfig, Config, ConfigError, OrderingConfig};
pub use definition::{ConfigParam, Database, Definition, Language, RoleAssignment, Sql};
pub use enums::{
    ConstraintType, EnumParseError, ForeignKeyAction, FuncParamDir, IndexType, SqlFormat,
    SqlStage, TriggerForEach, TriggerTiming, TypeDefKind,
};
pub use grant::Grant;
pub use identity::{equals_opt, matches_opt, names_match, FormatEq, Identity};
pub use key::KeyNames;
pub use objects::{
    CompositeField, DomainConstraint, DomainType, Function, FunctionDefinition,
    FunctionParameter, Sequence, Trigger, TypeDef, View, ViewQuery,
};
pub use schema::Schema;
pub use table::{
    Column, ColumnHooks, Constraint, DataRow, DataRows, ForeignKey, Index, IndexCond, IndexDim,
    Table, TableOption,
};
