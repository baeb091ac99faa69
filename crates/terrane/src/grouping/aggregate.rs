//! Aggregation of member change labels into a group state.

use terrane_core::{plan::ChangeKind, semantic::GroupMember};

/// The folded change state of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Aggregate {
    /// Folded aggregate state.
    pub state: ChangeKind,
    /// Count of members whose own label is not no-op/read.
    pub number_of_changes: usize,
}

/// Folds each member's compound label into the group aggregate.
///
/// Trivial labels (no-op, read) never override a more specific prior state;
/// the first specific label is taken outright so replacement labels survive;
/// further distinct specific labels collapse to update.
pub(crate) fn fold_members(members: &[GroupMember]) -> Aggregate {
    let mut state = ChangeKind::NoOp;
    let mut number_of_changes = 0;

    for member in members {
        let kind = member.change_kind();
        if !kind.is_trivial() {
            number_of_changes += 1;
        }
        state = state.combine(kind);
    }

    Aggregate {
        state,
        number_of_changes,
    }
}

#[cfg(test)]
mod tests {
    use terrane_core::{
        identifier::Addr,
        plan::{Change, ChangeAction, ResourceChange},
    };

    use super::*;

    fn member(address: &str, actions: Vec<ChangeAction>) -> GroupMember {
        let mut member = GroupMember::new(
            Addr::new(address),
            "aws_instance".to_string(),
            "test".to_string(),
        );
        member.change_records.push(ResourceChange {
            address: address.to_string(),
            module_address: None,
            resource_type: "aws_instance".to_string(),
            name: "test".to_string(),
            provider_name: None,
            change: Change {
                actions,
                ..Change::default()
            },
        });
        member
    }

    #[test]
    fn test_noop_and_create_yields_create() {
        let members = vec![
            member("a.one", vec![ChangeAction::NoOp]),
            member("a.two", vec![ChangeAction::Create]),
        ];
        let aggregate = fold_members(&members);
        assert_eq!(aggregate.state, ChangeKind::Create);
        assert_eq!(aggregate.number_of_changes, 1);
    }

    #[test]
    fn test_create_then_delete_forms_replacement() {
        let members = vec![
            member("a.one", vec![ChangeAction::Create]),
            member("a.two", vec![ChangeAction::Delete]),
        ];
        let aggregate = fold_members(&members);
        assert_eq!(aggregate.state, ChangeKind::CreateDelete);
        assert_eq!(aggregate.number_of_changes, 2);
    }

    #[test]
    fn test_all_noop_stays_noop() {
        let members = vec![
            member("a.one", vec![ChangeAction::NoOp]),
            member("a.two", vec![ChangeAction::NoOp]),
        ];
        let aggregate = fold_members(&members);
        assert_eq!(aggregate.state, ChangeKind::NoOp);
        assert_eq!(aggregate.number_of_changes, 0);
    }

    #[test]
    fn test_replacement_label_survives_noop_members() {
        let members = vec![
            member("a.one", vec![ChangeAction::NoOp]),
            member("a.two", vec![ChangeAction::Delete, ChangeAction::Create]),
            member("a.three", vec![ChangeAction::Read]),
        ];
        let aggregate = fold_members(&members);
        assert_eq!(aggregate.state, ChangeKind::DeleteCreate);
        assert_eq!(aggregate.number_of_changes, 1);
    }

    #[test]
    fn test_three_distinct_labels_collapse_to_update() {
        let members = vec![
            member("a.one", vec![ChangeAction::Update]),
            member("a.two", vec![ChangeAction::Delete, ChangeAction::Create]),
            member("a.three", vec![ChangeAction::Create]),
        ];
        let aggregate = fold_members(&members);
        assert_eq!(aggregate.state, ChangeKind::Update);
        assert_eq!(aggregate.number_of_changes, 3);
    }

    #[test]
    fn test_member_without_records_counts_as_noop() {
        let bare = GroupMember::new(
            Addr::new("aws_instance.bare"),
            "aws_instance".to_string(),
            "bare".to_string(),
        );
        let aggregate = fold_members(&[bare]);
        assert_eq!(aggregate.state, ChangeKind::NoOp);
        assert_eq!(aggregate.number_of_changes, 0);
    }
}
