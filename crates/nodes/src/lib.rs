//! `nodes` crate: the node taxonomy.
//!
//! Defines the closed [`Category`] set, the fixed compatibility table, the
//! configurable fan-out [`ConnectionPolicy`], and the single mapping from
//! free-form subtype names to categories.

pub mod category;
pub mod error;
pub mod infer;
pub mod policy;

pub use category::Category;
pub use error::TaxonomyError;
pub use infer::infer_category;
pub use policy::ConnectionPolicy;
