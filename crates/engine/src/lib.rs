//! `engine` crate: workflow document model, connection rules, cycle
//! detection, whole-graph validation, and the gates built on top of them.
//!
//! Everything here is a synchronous pure function of the graph passed in;
//! no state is kept between calls except in the opt-in [`ValidationCache`].

pub mod cache;
pub mod config;
pub mod connection;
pub mod cycle;
pub mod dag;
pub mod error;
pub mod gate;
pub mod models;
pub mod report;
pub mod validator;

pub use cache::{Fingerprint, ValidationCache};
pub use config::{EngineConfig, ScoringConfig};
pub use connection::{can_connect, ConnectionDecision, ConnectionRejection, ConnectionRules};
pub use dag::execution_order;
pub use error::EngineError;
pub use gate::GateAction;
pub use models::{category_of, Edge, Node, NodeDefinition, Position, Workflow};
pub use report::{Issue, IssueCategory, NodeRef, Severity, ValidationResult, ValidationSummary};
pub use validator::{validate, WorkflowValidator};

pub use nodes::{Category, ConnectionPolicy};
