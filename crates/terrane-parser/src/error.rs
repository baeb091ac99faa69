//! Error types for the input parsers.

use thiserror::Error;

/// Error type for graph and plan parsing.
///
/// Individual malformed graph statements never surface here; they are
/// skipped at statement granularity. Only document-level failures are
/// reported.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("graph source contains no statements")]
    EmptyGraphSource,

    #[error("invalid plan document: {0}")]
    Plan(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_error_wraps_serde() {
        let err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let wrapped: ParseError = err.into();
        assert!(wrapped.to_string().starts_with("invalid plan document"));
    }
}
