//! Loader for the machine-readable plan document.

use log::debug;

use terrane_core::plan::Plan;

use crate::error::ParseError;

/// Parses a plan JSON document.
///
/// Absent `resource_changes` / `configuration` sections deserialize to
/// empty, so a partial document degrades to "no plan" behavior downstream.
///
/// # Errors
///
/// Returns [`ParseError::Plan`] when the document is not valid JSON or does
/// not match the plan schema.
pub fn parse_plan(source: &str) -> Result<Plan, ParseError> {
    let plan: Plan = serde_json::from_str(source)?;
    debug!(
        resource_changes = plan.resource_changes.len(),
        has_configuration = plan.configuration.is_some();
        "plan parsed"
    );
    Ok(plan)
}
