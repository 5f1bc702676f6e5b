//! Compositing pipeline: fold documents in order, validating as configured

use schemaplan_core::{CompositeConfig, Database, Definition};

use crate::composite::Merge;
use crate::validate::{validate, ValidationErrors};

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    #[error("No documents to composite")]
    NoDocuments,

    /// `index` is the position of the document whose fold step produced the
    /// violations (0 is the base document)
    #[error("Document {index} produced an invalid definition: {errors}")]
    Invalid {
        index: usize,
        errors: ValidationErrors,
    },
}

/// Composite `documents` into one validated definition
///
/// The first document is the base; each later document is folded into the
/// accumulated result in order. With `validate_each_overlay` the result is
/// validated after every step, so an error names the document that
/// introduced it. Otherwise only the final result is validated and the error
/// names the last document.
pub fn composite_documents(
    documents: Vec<Definition>,
    config: &CompositeConfig,
) -> Result<Definition, CompositeError> {
    let total = documents.len();
    let mut documents = documents.into_iter();
    let mut base = documents.next().ok_or(CompositeError::NoDocuments)?;

    tracing::info!(documents = total, "compositing schema documents");

    if config.validate_each_overlay {
        check(&base, 0)?;
    }

    for (offset, overlay) in documents.enumerate() {
        let index = offset + 1;
        tracing::debug!(
            index,
            schemas = overlay.schemas.len(),
            tables = overlay.table_count(),
            "folding overlay"
        );

        base.merge(overlay);

        if config.validate_each_overlay {
            check(&base, index)?;
        }
    }

    if !config.validate_each_overlay {
        check(&base, total - 1)?;
    }

    if base.sql_format().is_none() {
        if let Some(format) = config.default_format {
            tracing::debug!(%format, "applying default sql format");
            base.database.get_or_insert_with(Database::default).sql_format = Some(format);
        }
    }

    tracing::info!(
        schemas = base.schemas.len(),
        tables = base.table_count(),
        "composite complete"
    );

    Ok(base)
}

fn check(def: &Definition, index: usize) -> Result<(), CompositeError> {
    validate(def).map_err(|errors| {
        tracing::warn!(index, violations = errors.len(), "document produced validation errors");
        CompositeError::Invalid { index, errors }
    })
}
