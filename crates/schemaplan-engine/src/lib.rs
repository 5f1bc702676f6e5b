//! schemaplan engine
//!
//! This crate implements compositing and validation:
//! - Folding overlay documents into one definition
//! - Structural validation of the result
//! - The document pipeline tying the two together

pub mod composite;
pub mod pipeline;
pub mod validate;

pub use composite::{composite, merge_children, Merge};
pub use pipeline::{composite_documents, CompositeError};
pub use validate::{collect_violations, validate, ValidationError, ValidationErrors, ViolationCode};
