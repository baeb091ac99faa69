//! The grouped diagram model.
//!
//! These types represent the resolved mid-pipeline model: raw graph nodes
//! clustered into [`ResourceGroup`]s, deduplicated [`Connection`]s between
//! them, and the variable/output catalog entries ([`VarOut`]) used for
//! indirect dependency resolution.
//!
//! # Pipeline Position
//!
//! ```text
//! Raw graph text + plan document
//!     ↓ parse
//! RawGraph + Plan
//!     ↓ grouping
//! GroupSet (these types)
//!     ↓ resolve
//! GroupSet + VarOut catalog + dependency sets
//!     ↓ layout
//! Positioned compound diagram
//! ```

use indexmap::{IndexMap, IndexSet};

use crate::{
    identifier::Addr,
    plan::{ChangeKind, ResourceChange},
};

/// One member of a resource group. The main resource is always the first
/// member of its group.
#[derive(Debug, Clone)]
pub struct GroupMember {
    /// The raw graph node this member came from.
    pub node: Addr,
    /// Resource type (`aws_security_group`).
    pub resource_type: String,
    /// Resource instance name.
    pub resource_name: String,
    /// Plan change records matched to this member's address.
    pub change_records: Vec<ResourceChange>,
}

impl GroupMember {
    /// Creates a member with no change records attached yet.
    pub fn new(node: Addr, resource_type: String, resource_name: String) -> Self {
        Self {
            node,
            resource_type,
            resource_name,
            change_records: Vec::new(),
        }
    }

    /// Folds this member's change records into its own compound label.
    pub fn change_kind(&self) -> ChangeKind {
        self.change_records
            .iter()
            .map(|record| ChangeKind::from_actions(&record.change.actions))
            .fold(ChangeKind::NoOp, ChangeKind::combine)
    }

    /// The member's module-local address (`type.name`).
    pub fn local_address(&self) -> String {
        format!("{}.{}", self.resource_type, self.resource_name)
    }
}

/// The core diagram unit: a main resource plus the secondary resources
/// absorbed into it.
///
/// Created by the grouping engine, annotated by the dependency resolver,
/// and read-only once the layout engine consumes it.
#[derive(Debug, Clone)]
pub struct ResourceGroup {
    /// Canonical address of the main resource; globally unique.
    pub id: Addr,
    /// Display category from the catalog (`compute`, `network`, …).
    pub category: String,
    /// Human-readable service name from the catalog.
    pub service_name: String,
    /// Icon path from the catalog.
    pub icon_ref: String,
    /// Immediate enclosing module name, empty for root.
    pub module_name: String,
    /// Enclosing module chain above `module_name`, outermost first.
    pub parent_modules: Vec<String>,
    /// Ordered members; the main resource is `members[0]`.
    pub members: Vec<GroupMember>,
    /// Aggregate change state folded over the members.
    pub aggregate_state: ChangeKind,
    /// Count of members whose own label is not no-op/read.
    pub number_of_changes: usize,
    /// Groups connected by a raw edge leaving this group.
    pub connections_in: IndexSet<Addr>,
    /// Groups connected by a raw edge arriving at this group.
    pub connections_out: IndexSet<Addr>,
    /// Modules this group depends on through variable/output indirection.
    pub module_connections_out: IndexSet<String>,
    /// Modules affected by this group through variable/output indirection.
    pub module_connections_in: IndexSet<String>,
    /// Set when the group originates from an externally merged state file.
    pub state_file_ref: Option<String>,
}

impl ResourceGroup {
    /// Creates a group seeded with its main member.
    pub fn new(
        id: Addr,
        main: GroupMember,
        category: String,
        service_name: String,
        icon_ref: String,
        module_name: String,
        parent_modules: Vec<String>,
    ) -> Self {
        Self {
            id,
            category,
            service_name,
            icon_ref,
            module_name,
            parent_modules,
            members: vec![main],
            aggregate_state: ChangeKind::NoOp,
            number_of_changes: 0,
            connections_in: IndexSet::new(),
            connections_out: IndexSet::new(),
            module_connections_out: IndexSet::new(),
            module_connections_in: IndexSet::new(),
            state_file_ref: None,
        }
    }

    /// The main member of the group.
    pub fn main_member(&self) -> &GroupMember {
        &self.members[0]
    }

    /// The group's module path (`parent_modules` + `module_name`).
    pub fn module_path(&self) -> Vec<String> {
        let mut path = self.parent_modules.clone();
        if !self.module_name.is_empty() {
            path.push(self.module_name.clone());
        }
        path
    }

    /// The module path joined with `.`, empty for root.
    pub fn module_path_joined(&self) -> String {
        self.module_path().join(".")
    }
}

/// A directed, deduplicated edge between two resource groups.
///
/// A raw edge A→B is recorded exactly once, as `from = A`, `to = B`, with
/// `A.connections_in ∋ B` and `B.connections_out ∋ A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Group owning the edge's source node.
    pub from: Addr,
    /// Group owning the edge's target node.
    pub to: Addr,
}

/// The grouping engine's output: groups keyed by id plus the deduplicated
/// connection list.
#[derive(Debug, Clone, Default)]
pub struct GroupSet {
    /// Groups in creation order, keyed by canonical main address.
    pub groups: IndexMap<Addr, ResourceGroup>,
    /// Deduplicated inter-group connections.
    pub connections: Vec<Connection>,
}

impl GroupSet {
    /// Returns the group with the given id, if present.
    pub fn group(&self, id: Addr) -> Option<&ResourceGroup> {
        self.groups.get(&id)
    }

    /// Number of groups in the set.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the set holds no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Declaration kind of a [`VarOut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarOutKind {
    Variable,
    Output,
}

/// Kind of a resolved expression reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// A variable of the same module.
    Variable,
    /// An output of a named child module.
    Output,
    /// A resource resolved to its owning group.
    Resource,
    /// A whole-module marker produced by fan-in collapsing.
    Module,
}

/// A classified expression reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedRef {
    /// What the reference points at.
    pub kind: RefKind,
    /// Module path the referent lives in, empty for root.
    pub module: String,
    /// Referent name; `type.name` for resources, empty for module markers.
    pub name: String,
}

impl TypedRef {
    /// Creates a reference of the given kind.
    pub fn new(kind: RefKind, module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            module: module.into(),
            name: name.into(),
        }
    }
}

/// A declared variable or output scoped to one module, with its classified
/// expression references. Built once per render pass, read-only thereafter.
#[derive(Debug, Clone)]
pub struct VarOut {
    /// Declared name.
    pub name: String,
    /// Module path the declaration lives in, empty for root.
    pub module: String,
    /// Variable or output.
    pub kind: VarOutKind,
    /// Classified references of the declared expression, in order.
    pub references: Vec<TypedRef>,
}
