//! Indirect dependency resolution through variables and outputs.
//!
//! The resolver builds a per-module catalog of declared variables and
//! outputs ([`VarOut`] entries) from the plan's static configuration, then
//! answers "depends on" / "affects" queries for any resource group:
//!
//! - a variable's references come from the argument expressions of the
//!   enclosing module call, classified in the parent module's scope;
//! - an output's references come from its declared expression, classified in
//!   its own module's scope;
//! - single-reference chains are collapsed to their ultimate origin across
//!   module boundaries; same-module fan-in collapses to a whole-module
//!   marker; cross-module fan-in is deliberately left uncollapsed.
//!
//! References that name neither a declared variable/output nor a resolvable
//! group are dropped, not errors.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use log::debug;

use terrane_core::{
    identifier::Addr,
    plan::{Configuration, ModuleConfig, expression_references},
    semantic::{GroupSet, RefKind, ResourceGroup, TypedRef, VarOut, VarOutKind},
};

/// Catalog key: (module path, kind, declared name).
type VarOutKey = (String, VarOutKind, String);

/// The resolved dependency sets of one group or module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// What this group depends on, deduplicated by (kind, module, name).
    pub depends_on: Vec<TypedRef>,
    /// What depends on this group, deduplicated by (kind, module, name).
    pub affects: Vec<TypedRef>,
}

/// Resolves indirect dependencies over a built group set.
pub struct DependencyResolver {
    catalog: IndexMap<VarOutKey, VarOut>,
    /// Classified variable/output references per group, from the group
    /// members' configuration expressions.
    member_refs: IndexMap<Addr, Vec<TypedRef>>,
    /// Full member address → owning group id.
    resource_index: IndexMap<String, Addr>,
}

impl DependencyResolver {
    /// Builds the variable/output catalog for the root module and every
    /// module in the configuration tree, then classifies each group's
    /// member expression references.
    ///
    /// With no configuration the resolver is empty and every query returns
    /// only connection-derived dependencies.
    pub fn new(groups: &GroupSet, configuration: Option<&Configuration>) -> Self {
        let mut resource_index = IndexMap::new();
        for group in groups.groups.values() {
            for member in &group.members {
                resource_index.insert(member.node.resolve(), group.id);
            }
        }

        let mut resolver = Self {
            catalog: IndexMap::new(),
            member_refs: IndexMap::new(),
            resource_index,
        };

        let Some(configuration) = configuration else {
            return resolver;
        };

        // Declared names must be known before classification, so collect
        // the whole module tree first.
        let mut modules: Vec<(String, &ModuleConfig)> = Vec::new();
        collect_modules(String::new(), &configuration.root_module, &mut modules);
        let declarations: Declarations = Declarations::collect(&modules);

        resolver.build_catalog(&modules, &declarations, groups);
        resolver.classify_member_refs(&modules, &declarations, groups);

        debug!(
            var_outs = resolver.catalog.len(),
            groups = resolver.member_refs.len();
            "variable/output catalog built"
        );
        resolver
    }

    /// All catalog entries, in declaration order.
    pub fn var_outs(&self) -> impl Iterator<Item = &VarOut> {
        self.catalog.values()
    }

    /// Computes the depends-on and affects sets for a group.
    ///
    /// Depends-on unions one collapsed reference per variable/output the
    /// group's members reference with one resource reference per group in
    /// `connections_out`; affects is the symmetric computation over the
    /// inverse variable/output scan and `connections_in`. Self-references
    /// are filtered.
    pub fn dependencies_of(&self, group: &ResourceGroup, groups: &GroupSet) -> Dependencies {
        let own_module = group.module_path_joined();
        let own_resource = group.main_member().local_address();

        let mut depends_on: IndexSet<TypedRef> = IndexSet::new();
        if let Some(refs) = self.member_refs.get(&group.id) {
            for reference in refs {
                depends_on.insert(self.collapse_reference(reference));
            }
        }
        for &other_id in &group.connections_out {
            if let Some(other) = groups.group(other_id) {
                depends_on.insert(resource_ref(other));
            }
        }

        let mut affects: IndexSet<TypedRef> = IndexSet::new();
        for var_out in self.catalog.values() {
            let references_this_group = var_out.references.iter().any(|reference| {
                reference.kind == RefKind::Resource
                    && reference.module == own_module
                    && reference.name == own_resource
            });
            if references_this_group {
                affects.insert(TypedRef::new(
                    var_out_kind_to_ref(var_out.kind),
                    var_out.module.clone(),
                    var_out.name.clone(),
                ));
            }
        }
        for &other_id in &group.connections_in {
            if let Some(other) = groups.group(other_id) {
                affects.insert(resource_ref(other));
            }
        }

        let keep = |reference: &TypedRef| !is_self_reference(reference, &own_module, &own_resource);
        Dependencies {
            depends_on: depends_on.into_iter().filter(|r| keep(r)).collect(),
            affects: affects.into_iter().filter(|r| keep(r)).collect(),
        }
    }

    /// Unions the dependency sets of every group in the named module.
    pub fn dependencies_of_module(&self, module: &str, groups: &GroupSet) -> Dependencies {
        let mut depends_on: IndexSet<TypedRef> = IndexSet::new();
        let mut affects: IndexSet<TypedRef> = IndexSet::new();
        for group in groups.groups.values() {
            if group.module_path_joined() != module {
                continue;
            }
            let dependencies = self.dependencies_of(group, groups);
            depends_on.extend(dependencies.depends_on);
            affects.extend(dependencies.affects);
        }
        let keep = |reference: &TypedRef| {
            !(reference.kind == RefKind::Module && reference.module == module)
        };
        Dependencies {
            depends_on: depends_on.into_iter().filter(|r| keep(r)).collect(),
            affects: affects.into_iter().filter(|r| keep(r)).collect(),
        }
    }

    /// Writes each group's indirect module connection sets.
    ///
    /// A group depends on a module when one of its members references that
    /// module's output; a module affects a group when one of the module's
    /// variables or outputs references the group. Connections drawn from
    /// raw edges do not contribute here.
    pub fn annotate_module_connections(&self, groups: &mut GroupSet) {
        let mut updates: Vec<(Addr, Vec<String>, Vec<String>)> = Vec::new();
        for group in groups.groups.values() {
            let own_module = group.module_path_joined();
            let own_resource = group.main_member().local_address();

            let mut out = Vec::new();
            if let Some(refs) = self.member_refs.get(&group.id) {
                for reference in refs {
                    if reference.module != own_module && !reference.module.is_empty() {
                        out.push(reference.module.clone());
                    }
                }
            }

            let mut incoming = Vec::new();
            for var_out in self.catalog.values() {
                if var_out.module == own_module || var_out.module.is_empty() {
                    continue;
                }
                let references_this_group = var_out.references.iter().any(|reference| {
                    reference.kind == RefKind::Resource
                        && reference.module == own_module
                        && reference.name == own_resource
                });
                if references_this_group {
                    incoming.push(var_out.module.clone());
                }
            }

            updates.push((group.id, out, incoming));
        }

        for (id, out, incoming) in updates {
            let Some(group) = groups.groups.get_mut(&id) else {
                continue;
            };
            group.module_connections_out.extend(out);
            group.module_connections_in.extend(incoming);
        }
    }

    /// Follows a reference chain to its ultimate origin.
    ///
    /// The chain is followed only while each variable/output has exactly one
    /// reference. Fan-in collapses to a whole-module marker when every
    /// branch shares one module and otherwise stays put. A visited set
    /// guards against reference cycles: a repeated node stops the walk.
    pub fn collapse_reference(&self, reference: &TypedRef) -> TypedRef {
        let mut visited: HashSet<VarOutKey> = HashSet::new();
        self.collapse_inner(reference, &mut visited)
    }

    fn collapse_inner(&self, reference: &TypedRef, visited: &mut HashSet<VarOutKey>) -> TypedRef {
        let kind = match reference.kind {
            RefKind::Variable => VarOutKind::Variable,
            RefKind::Output => VarOutKind::Output,
            _ => return reference.clone(),
        };
        let key = (reference.module.clone(), kind, reference.name.clone());
        if !visited.insert(key.clone()) {
            return reference.clone();
        }
        let Some(var_out) = self.catalog.get(&key) else {
            return reference.clone();
        };
        match var_out.references.as_slice() {
            [] => reference.clone(),
            [single] => self.collapse_inner(single, visited),
            many => {
                let first_module = &many[0].module;
                if many.iter().all(|r| r.module == *first_module) {
                    TypedRef::new(RefKind::Module, first_module.clone(), "")
                } else {
                    reference.clone()
                }
            }
        }
    }

    fn build_catalog(
        &mut self,
        modules: &[(String, &ModuleConfig)],
        declarations: &Declarations,
        groups: &GroupSet,
    ) {
        for (path, config) in modules {
            // Variables: argument expressions live in the parent module.
            let parent_scope = parent_path(path);
            for name in config.variables.keys() {
                let references = match (path.is_empty(), parent_module_call(modules, path)) {
                    // Root variables have no caller, hence no references.
                    (true, _) | (false, None) => Vec::new(),
                    (false, Some(call)) => call
                        .expressions
                        .get(name)
                        .map(|expression| {
                            expression_references(expression)
                                .iter()
                                .filter_map(|raw| {
                                    self.classify_reference(
                                        parent_scope.as_deref().unwrap_or(""),
                                        raw,
                                        declarations,
                                        groups,
                                    )
                                })
                                .collect()
                        })
                        .unwrap_or_default(),
                };
                self.catalog.insert(
                    (path.clone(), VarOutKind::Variable, name.clone()),
                    VarOut {
                        name: name.clone(),
                        module: path.clone(),
                        kind: VarOutKind::Variable,
                        references,
                    },
                );
            }

            // Outputs: expressions live in their own module.
            for (name, output) in &config.outputs {
                let references = expression_references(&output.expression)
                    .iter()
                    .filter_map(|raw| self.classify_reference(path, raw, declarations, groups))
                    .collect();
                self.catalog.insert(
                    (path.clone(), VarOutKind::Output, name.clone()),
                    VarOut {
                        name: name.clone(),
                        module: path.clone(),
                        kind: VarOutKind::Output,
                        references,
                    },
                );
            }
        }
    }

    fn classify_member_refs(
        &mut self,
        modules: &[(String, &ModuleConfig)],
        declarations: &Declarations,
        groups: &GroupSet,
    ) {
        for group in groups.groups.values() {
            let scope = group.module_path_joined();
            let Some((_, config)) = modules.iter().find(|(path, _)| *path == scope) else {
                continue;
            };
            let mut refs = Vec::new();
            for member in &group.members {
                let local = member.local_address();
                let data_local = format!("data.{local}");
                let Some(resource) = config
                    .resources
                    .iter()
                    .find(|resource| resource.address == local || resource.address == data_local)
                else {
                    continue;
                };
                for raw in expression_references(&resource.expressions) {
                    let Some(reference) =
                        self.classify_reference(&scope, &raw, declarations, groups)
                    else {
                        continue;
                    };
                    // Only variable/output references matter here; direct
                    // resource references already surface as connections.
                    if matches!(reference.kind, RefKind::Variable | RefKind::Output) {
                        refs.push(reference);
                    }
                }
            }
            self.member_refs.insert(group.id, refs);
        }
    }

    /// Classifies a raw reference string within a module scope.
    ///
    /// Instance indices are skipped. Unresolvable references yield `None`.
    fn classify_reference(
        &self,
        scope: &str,
        raw: &str,
        declarations: &Declarations,
        groups: &GroupSet,
    ) -> Option<TypedRef> {
        let segments: Vec<&str> = raw.split('.').map(strip_index).collect();
        match segments.as_slice() {
            ["var", name, ..] => declarations
                .has_variable(scope, name)
                .then(|| TypedRef::new(RefKind::Variable, scope, *name)),
            ["module", child] => Some(TypedRef::new(
                RefKind::Module,
                join_path(scope, child),
                "",
            )),
            ["module", child, name, ..] => {
                let child_path = join_path(scope, child);
                declarations
                    .has_output(&child_path, name)
                    .then(|| TypedRef::new(RefKind::Output, child_path, *name))
            }
            ["data", resource_type, name, ..] => {
                self.resolve_resource(scope, &format!("data.{resource_type}.{name}"), groups)
            }
            [resource_type, name, ..] => {
                self.resolve_resource(scope, &format!("{resource_type}.{name}"), groups)
            }
            _ => None,
        }
    }

    /// Resolves a module-local resource reference to its owning group.
    fn resolve_resource(&self, scope: &str, local: &str, groups: &GroupSet) -> Option<TypedRef> {
        let full = full_address(scope, local);
        let group_id = self.resource_index.get(&full)?;
        let group = groups.group(*group_id)?;
        Some(resource_ref(group))
    }
}

/// Declared variable and output names per module path.
struct Declarations {
    variables: IndexMap<String, IndexSet<String>>,
    outputs: IndexMap<String, IndexSet<String>>,
}

impl Declarations {
    fn collect(modules: &[(String, &ModuleConfig)]) -> Self {
        let mut variables: IndexMap<String, IndexSet<String>> = IndexMap::new();
        let mut outputs: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for (path, config) in modules {
            variables
                .entry(path.clone())
                .or_default()
                .extend(config.variables.keys().cloned());
            outputs
                .entry(path.clone())
                .or_default()
                .extend(config.outputs.keys().cloned());
        }
        Self { variables, outputs }
    }

    fn has_variable(&self, module: &str, name: &str) -> bool {
        self.variables
            .get(module)
            .is_some_and(|names| names.contains(name))
    }

    fn has_output(&self, module: &str, name: &str) -> bool {
        self.outputs
            .get(module)
            .is_some_and(|names| names.contains(name))
    }
}

/// Flattens the module tree into (path, config) pairs, root first.
fn collect_modules<'a>(
    path: String,
    config: &'a ModuleConfig,
    out: &mut Vec<(String, &'a ModuleConfig)>,
) {
    out.push((path.clone(), config));
    for (name, call) in &config.module_calls {
        collect_modules(join_path(&path, name), &call.module, out);
    }
}

/// Finds the module call declaring the module at `path`, in its parent.
fn parent_module_call<'a>(
    modules: &[(String, &'a ModuleConfig)],
    path: &str,
) -> Option<&'a terrane_core::plan::ModuleCall> {
    let (parent, name) = match path.rsplit_once('.') {
        Some((parent, name)) => (parent.to_string(), name),
        None => (String::new(), path),
    };
    modules
        .iter()
        .find(|(candidate, _)| *candidate == parent)
        .and_then(|(_, config)| config.module_calls.get(name))
}

fn parent_path(path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    Some(match path.rsplit_once('.') {
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    })
}

fn join_path(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

/// Builds the full node address of a module-local one.
fn full_address(scope: &str, local: &str) -> String {
    if scope.is_empty() {
        return local.to_string();
    }
    let prefix: Vec<String> = scope
        .split('.')
        .map(|segment| format!("module.{segment}"))
        .collect();
    format!("{}.{local}", prefix.join("."))
}

fn strip_index(segment: &str) -> &str {
    match segment.find('[') {
        Some(idx) => &segment[..idx],
        None => segment,
    }
}

fn resource_ref(group: &ResourceGroup) -> TypedRef {
    TypedRef::new(
        RefKind::Resource,
        group.module_path_joined(),
        group.main_member().local_address(),
    )
}

fn var_out_kind_to_ref(kind: VarOutKind) -> RefKind {
    match kind {
        VarOutKind::Variable => RefKind::Variable,
        VarOutKind::Output => RefKind::Output,
    }
}

fn is_self_reference(reference: &TypedRef, own_module: &str, own_resource: &str) -> bool {
    match reference.kind {
        RefKind::Module => reference.module == own_module,
        RefKind::Resource => reference.module == own_module && reference.name == own_resource,
        _ => false,
    }
}
