//! Taxonomy-level error type.

use thiserror::Error;

/// Errors produced when a category is parsed strictly.
///
/// Tolerant inference (see [`crate::infer`]) never returns this; it only
/// surfaces when a caller asks for an exact category name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    /// The string is not one of `trigger`, `action`, `logic` or `ai`.
    #[error("unknown node category: '{0}'")]
    UnknownCategory(String),
}
