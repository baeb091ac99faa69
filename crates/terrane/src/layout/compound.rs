//! Containment forest construction for the compound layout.
//!
//! Groups nest inside one container per enclosing module, module containers
//! nest along the module path, and groups merged from an external state file
//! get a state container at the root. Connections are projected into the
//! nearest scope that contains both endpoints, with each endpoint replaced
//! by its representative direct child of that scope.

use indexmap::{IndexMap, IndexSet};

use terrane_core::{identifier::Addr, semantic::GroupSet};

/// Key of the implicit root scope.
pub(crate) const ROOT_SCOPE: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    Root,
    Module,
    State,
}

/// A connection projected into a scope.
///
/// `from`/`to` are the representative direct children used for ranking and
/// routing; `source_group`/`target_group` are the leaf groups the raw
/// connection joined, kept so edge styling can follow the leaves even when
/// the endpoints are containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScopeEdge {
    pub from: String,
    pub to: String,
    pub source_group: Addr,
    pub target_group: Addr,
}

/// One containment scope: the root, a module container, or a state
/// container.
#[derive(Debug, Clone)]
pub(crate) struct Scope {
    pub key: String,
    pub label: String,
    pub kind: ScopeKind,
    pub parent: Option<String>,
    pub depth: usize,
    /// Direct child containers, in first-seen order.
    pub container_children: Vec<String>,
    /// Direct child groups, in group order.
    pub group_children: Vec<Addr>,
    /// Connections projected into this scope.
    pub edges: Vec<ScopeEdge>,
}

impl Scope {
    fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        kind: ScopeKind,
        parent: Option<String>,
        depth: usize,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            parent,
            depth,
            container_children: Vec::new(),
            group_children: Vec::new(),
            edges: Vec::new(),
        }
    }
}

/// The containment forest, rooted at [`ROOT_SCOPE`].
#[derive(Debug, Clone)]
pub(crate) struct CompoundForest {
    /// Scopes keyed by scope key; the root scope is always present.
    pub scopes: IndexMap<String, Scope>,
}

impl CompoundForest {
    /// Scope keys ordered innermost first, root last. Processing in this
    /// order guarantees child container sizes exist before their parent's
    /// layout runs.
    pub fn keys_innermost_first(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.scopes.keys().cloned().collect();
        keys.sort_by_key(|key| std::cmp::Reverse(self.scopes[key].depth));
        keys
    }
}

/// Builds the containment forest for a group set.
pub(crate) fn build(groups: &GroupSet) -> CompoundForest {
    let mut scopes: IndexMap<String, Scope> = IndexMap::new();
    scopes.insert(
        ROOT_SCOPE.to_string(),
        Scope::new(ROOT_SCOPE, "", ScopeKind::Root, None, 0),
    );

    // Scope ancestry per group, root first and own scope last.
    let mut ancestry: IndexMap<Addr, Vec<String>> = IndexMap::new();

    for group in groups.groups.values() {
        let path = group.module_path();
        let scope_key = if !path.is_empty() {
            ensure_module_chain(&mut scopes, &path)
        } else if let Some(state_ref) = &group.state_file_ref {
            ensure_state_scope(&mut scopes, state_ref)
        } else {
            ROOT_SCOPE.to_string()
        };

        scopes[&scope_key].group_children.push(group.id);
        ancestry.insert(group.id, ancestry_of(&scopes, &scope_key));
    }

    let mut seen_edges: IndexSet<(String, String, String)> = IndexSet::new();
    for connection in &groups.connections {
        let (Some(from_chain), Some(to_chain)) =
            (ancestry.get(&connection.from), ancestry.get(&connection.to))
        else {
            continue;
        };

        let common = common_prefix_len(from_chain, to_chain);
        // Both chains start at the root, so the common prefix is never empty.
        let scope_key = from_chain[common - 1].clone();
        let from_repr = representative(from_chain, common, connection.from);
        let to_repr = representative(to_chain, common, connection.to);
        if from_repr == to_repr {
            continue;
        }
        if seen_edges.insert((scope_key.clone(), from_repr.clone(), to_repr.clone())) {
            scopes[&scope_key].edges.push(ScopeEdge {
                from: from_repr,
                to: to_repr,
                source_group: connection.from,
                target_group: connection.to,
            });
        }
    }

    CompoundForest { scopes }
}

/// Creates the module container chain for a module path and returns the
/// innermost scope key.
fn ensure_module_chain(scopes: &mut IndexMap<String, Scope>, path: &[String]) -> String {
    let mut parent = ROOT_SCOPE.to_string();
    let mut joined = String::new();
    for (depth, segment) in path.iter().enumerate() {
        if !joined.is_empty() {
            joined.push('.');
        }
        joined.push_str(segment);
        let key = format!("module:{joined}");
        if !scopes.contains_key(&key) {
            scopes.insert(
                key.clone(),
                Scope::new(&key, segment, ScopeKind::Module, Some(parent.clone()), depth + 1),
            );
            scopes[&parent].container_children.push(key.clone());
        }
        parent = key;
    }
    parent
}

fn ensure_state_scope(scopes: &mut IndexMap<String, Scope>, state_ref: &str) -> String {
    let key = format!("state:{state_ref}");
    if !scopes.contains_key(&key) {
        scopes.insert(
            key.clone(),
            Scope::new(
                &key,
                state_ref,
                ScopeKind::State,
                Some(ROOT_SCOPE.to_string()),
                1,
            ),
        );
        scopes[ROOT_SCOPE].container_children.push(key.clone());
    }
    key
}

fn ancestry_of(scopes: &IndexMap<String, Scope>, scope_key: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = Some(scope_key.to_string());
    while let Some(key) = current {
        current = scopes[&key].parent.clone();
        chain.push(key);
    }
    chain.reverse();
    chain
}

fn common_prefix_len(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// The direct child of the common scope standing in for an endpoint: the
/// group itself when it lives in the common scope, otherwise the container
/// one level below it on the endpoint's ancestry chain.
fn representative(chain: &[String], common: usize, group: Addr) -> String {
    if chain.len() == common {
        group.resolve()
    } else {
        chain[common].clone()
    }
}
