//! Error types for Terrane pipeline operations.

use thiserror::Error;

use terrane_parser::ParseError;

/// The main error type for pipeline operations.
///
/// Classification and traversal failures never surface here; they degrade
/// at node/edge granularity inside the engines. Only input-document and
/// layout-level failures are reported.
#[derive(Debug, Error)]
pub enum TerraneError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("layout error: {0}")]
    Layout(String),
}
