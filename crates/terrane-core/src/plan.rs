//! Serde model of the plan document.
//!
//! Only the sections the pipeline consumes are modeled: per-resource change
//! records and the static configuration (declared variables, outputs,
//! resource expressions, and module calls). Attribute snapshots and
//! expression trees are kept as raw [`serde_json::Value`]s and walked on
//! demand.
//!
//! Absent sections deserialize to empty collections so a partial document
//! degrades to "no plan" behavior instead of failing.

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// A machine-readable plan: pending changes plus static configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Plan {
    /// One change record per declared resource instance.
    #[serde(default)]
    pub resource_changes: Vec<ResourceChange>,
    /// The static configuration section, when present.
    #[serde(default)]
    pub configuration: Option<Configuration>,
}

/// One entry from the plan's per-resource changes.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResourceChange {
    /// Full address of the resource instance.
    pub address: String,
    /// Address of the enclosing module, absent for root resources.
    #[serde(default)]
    pub module_address: Option<String>,
    /// Resource type (`aws_instance`).
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource instance name.
    pub name: String,
    /// Fully qualified provider name.
    #[serde(default)]
    pub provider_name: Option<String>,
    /// The pending change for this instance.
    pub change: Change,
}

/// The action sequence and attribute snapshots of one pending change.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Change {
    /// Ordered action sequence (`["delete", "create"]` for a replacement).
    #[serde(default)]
    pub actions: Vec<ChangeAction>,
    /// Attribute snapshot before the change.
    #[serde(default)]
    pub before: Option<Value>,
    /// Attribute snapshot after the change.
    #[serde(default)]
    pub after: Option<Value>,
    /// Markers for attributes unknown until apply.
    #[serde(default)]
    pub after_unknown: Option<Value>,
}

/// A single plan action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeAction {
    NoOp,
    Create,
    Read,
    Update,
    Delete,
}

/// A compound change label folded from an action sequence, also used as a
/// group's aggregate state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangeKind {
    #[default]
    NoOp,
    Create,
    Read,
    Update,
    Delete,
    /// Replacement: delete then create.
    DeleteCreate,
    /// Replacement: create then delete.
    CreateDelete,
}

impl ChangeKind {
    /// Folds an ordered action sequence into its compound label.
    pub fn from_actions(actions: &[ChangeAction]) -> Self {
        match actions {
            [] => ChangeKind::NoOp,
            [ChangeAction::NoOp] => ChangeKind::NoOp,
            [ChangeAction::Create] => ChangeKind::Create,
            [ChangeAction::Read] => ChangeKind::Read,
            [ChangeAction::Update] => ChangeKind::Update,
            [ChangeAction::Delete] => ChangeKind::Delete,
            [ChangeAction::Delete, ChangeAction::Create] => ChangeKind::DeleteCreate,
            [ChangeAction::Create, ChangeAction::Delete] => ChangeKind::CreateDelete,
            _ if actions.iter().all(|a| *a == ChangeAction::NoOp) => ChangeKind::NoOp,
            _ => ChangeKind::Update,
        }
    }

    /// Whether this label never overrides a more specific one.
    pub fn is_trivial(self) -> bool {
        matches!(self, ChangeKind::NoOp | ChangeKind::Read)
    }

    /// Combines two labels with aggregate-state precedence: trivial labels
    /// never override, a create/delete pair forms the replacement compound,
    /// any other pair of distinct non-trivial labels collapses to `Update`.
    pub fn combine(self, other: ChangeKind) -> ChangeKind {
        use ChangeKind::*;
        match (self, other) {
            (s, NoOp) => s,
            (NoOp, o) => o,
            (s, Read) => s,
            (Read, o) => o,
            (Create, Delete) => CreateDelete,
            (Delete, Create) => DeleteCreate,
            (s, o) if s == o => s,
            _ => Update,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeKind::NoOp => "no-op",
            ChangeKind::Create => "create",
            ChangeKind::Read => "read",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
            ChangeKind::DeleteCreate => "delete-create",
            ChangeKind::CreateDelete => "create-delete",
        };
        write!(f, "{label}")
    }
}

/// The static configuration section of a plan.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Configuration {
    /// Configuration of the root module.
    #[serde(default)]
    pub root_module: ModuleConfig,
}

/// Declared blocks of one module.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleConfig {
    /// Declared resources with their attribute expressions.
    #[serde(default)]
    pub resources: Vec<ConfigResource>,
    /// Declared input variables by name.
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
    /// Declared outputs by name.
    #[serde(default)]
    pub outputs: IndexMap<String, OutputConfig>,
    /// Child module calls by name.
    #[serde(default)]
    pub module_calls: IndexMap<String, ModuleCall>,
}

/// A declared resource and its attribute expression tree.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigResource {
    /// Module-local address (`aws_instance.app`).
    #[serde(default)]
    pub address: String,
    /// Raw attribute expression tree.
    #[serde(default)]
    pub expressions: Value,
}

/// A declared output and its value expression.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// The output's value expression.
    #[serde(default)]
    pub expression: Value,
}

/// A child module call: the child's configuration plus the argument
/// expressions supplied by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleCall {
    /// The called module's own configuration.
    #[serde(default)]
    pub module: ModuleConfig,
    /// Argument expressions, keyed by the child's variable names.
    #[serde(default)]
    pub expressions: Value,
}

/// Collects every string under a `references` key anywhere in an expression
/// tree, preserving document order.
pub fn expression_references(expression: &Value) -> Vec<String> {
    let mut references = Vec::new();
    collect_references(expression, &mut references);
    references
}

fn collect_references(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map {
                if key == "references" {
                    if let Value::Array(items) = entry {
                        out.extend(items.iter().filter_map(|item| {
                            item.as_str().map(str::to_string)
                        }));
                    }
                } else {
                    collect_references(entry, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_from_actions() {
        use ChangeAction::*;
        assert_eq!(ChangeKind::from_actions(&[]), ChangeKind::NoOp);
        assert_eq!(ChangeKind::from_actions(&[NoOp]), ChangeKind::NoOp);
        assert_eq!(ChangeKind::from_actions(&[Create]), ChangeKind::Create);
        assert_eq!(
            ChangeKind::from_actions(&[Delete, Create]),
            ChangeKind::DeleteCreate
        );
        assert_eq!(
            ChangeKind::from_actions(&[Create, Delete]),
            ChangeKind::CreateDelete
        );
    }

    #[test]
    fn test_combine_trivial_never_overrides() {
        assert_eq!(
            ChangeKind::Create.combine(ChangeKind::NoOp),
            ChangeKind::Create
        );
        assert_eq!(
            ChangeKind::DeleteCreate.combine(ChangeKind::Read),
            ChangeKind::DeleteCreate
        );
        assert_eq!(ChangeKind::NoOp.combine(ChangeKind::NoOp), ChangeKind::NoOp);
    }

    #[test]
    fn test_combine_first_specific_state_taken_outright() {
        // A replacement label survives aggregation over an otherwise
        // unchanged group instead of being forced to update.
        assert_eq!(
            ChangeKind::NoOp.combine(ChangeKind::DeleteCreate),
            ChangeKind::DeleteCreate
        );
    }

    #[test]
    fn test_combine_distinct_states_collapse_to_update() {
        assert_eq!(
            ChangeKind::Update.combine(ChangeKind::Delete),
            ChangeKind::Update
        );
        assert_eq!(
            ChangeKind::DeleteCreate.combine(ChangeKind::Create),
            ChangeKind::Update
        );
        // Beyond two distinct labels the aggregate stays update.
        assert_eq!(
            ChangeKind::Update
                .combine(ChangeKind::Delete)
                .combine(ChangeKind::Create),
            ChangeKind::Update
        );
    }

    #[test]
    fn test_combine_create_delete_pair_forms_replacement() {
        assert_eq!(
            ChangeKind::Create.combine(ChangeKind::Delete),
            ChangeKind::CreateDelete
        );
        assert_eq!(
            ChangeKind::Delete.combine(ChangeKind::Create),
            ChangeKind::DeleteCreate
        );
    }

    #[test]
    fn test_plan_deserializes_sample() {
        let plan: Plan = serde_json::from_str(
            r#"{
                "resource_changes": [
                    {
                        "address": "aws_instance.app",
                        "type": "aws_instance",
                        "name": "app",
                        "provider_name": "registry.terraform.io/hashicorp/aws",
                        "change": {
                            "actions": ["create"],
                            "before": null,
                            "after": {"instance_type": "t3.micro"},
                            "after_unknown": {"id": true}
                        }
                    }
                ],
                "configuration": {
                    "root_module": {
                        "outputs": {
                            "endpoint": {
                                "expression": {"references": ["aws_instance.app"]}
                            }
                        }
                    }
                }
            }"#,
        )
        .expect("sample plan must deserialize");

        assert_eq!(plan.resource_changes.len(), 1);
        let change = &plan.resource_changes[0];
        assert_eq!(change.address, "aws_instance.app");
        assert_eq!(
            ChangeKind::from_actions(&change.change.actions),
            ChangeKind::Create
        );
        let configuration = plan.configuration.expect("configuration present");
        assert!(configuration.root_module.outputs.contains_key("endpoint"));
    }

    #[test]
    fn test_missing_sections_degrade_to_empty() {
        let plan: Plan = serde_json::from_str("{}").expect("empty plan deserializes");
        assert!(plan.resource_changes.is_empty());
        assert!(plan.configuration.is_none());
    }

    #[test]
    fn test_expression_references_nested() {
        let expression = serde_json::json!({
            "instance_type": {"constant_value": "t3.micro"},
            "vpc_security_group_ids": {
                "references": ["aws_security_group.sg.id", "aws_security_group.sg"]
            },
            "tags": [
                {"references": ["var.name"]}
            ]
        });
        let refs = expression_references(&expression);
        assert!(refs.contains(&"aws_security_group.sg".to_string()));
        assert!(refs.contains(&"var.name".to_string()));
        assert_eq!(refs.len(), 3);
    }
}
