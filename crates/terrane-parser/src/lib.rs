//! Parsers for the external inputs of the Terrane pipeline.
//!
//! Two documents are consumed:
//!
//! - the raw dependency graph, a DOT-subset text emitted by the infra tool's
//!   graph command ([`graph`] module);
//! - the machine-readable plan JSON ([`plan`] module).
//!
//! Both parsers are tolerant: malformed graph statements are skipped with a
//! warning and absent plan sections degrade to empty, per the pipeline's
//! never-fatal error policy.

pub mod error;
pub mod graph;
pub mod plan;

pub use error::ParseError;
pub use graph::{RawGraph, parse_graph};
pub use plan::parse_plan;
