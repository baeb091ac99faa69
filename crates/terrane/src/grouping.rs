//! The grouping engine.
//!
//! Clusters raw graph nodes into [`ResourceGroup`]s in six passes:
//!
//! 1. seed one group per catalog-registered main resource node;
//! 2. absorb secondary resources and data sources by transitive traversal
//!    from each seed, in both edge directions;
//! 3. in detailed mode, promote unclaimed resource nodes to singletons;
//! 4. merge plan change records onto members and fold the aggregate state;
//! 5. filter by change presence, category, and tag selection;
//! 6. derive deduplicated inter-group connections from the raw edges.
//!
//! Grouping is a pure function of (nodes, edges, catalog, plan, options):
//! the absorbed member set does not depend on edge iteration order, and an
//! owner map guards the traversal against cycles.

pub(crate) mod aggregate;

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use petgraph::{Direction, prelude::DiGraphMap};
use serde_json::Value;

use terrane_core::{
    address::{BlockDescriptor, BlockKind, classify},
    catalog::ResourceCatalog,
    identifier::Addr,
    plan::Plan,
    semantic::{Connection, GroupMember, GroupSet, ResourceGroup},
};
use terrane_parser::RawGraph;

use crate::config::RenderOptions;

/// Category used for detailed-mode singletons without a catalog row.
const UNKNOWN_CATEGORY: &str = "unknown";

/// Builds resource groups and connections from a raw graph.
pub struct GroupingEngine<'a> {
    catalog: &'a ResourceCatalog,
    options: &'a RenderOptions,
}

impl<'a> GroupingEngine<'a> {
    /// Creates an engine over the given catalog and options.
    pub fn new(catalog: &'a ResourceCatalog, options: &'a RenderOptions) -> Self {
        Self { catalog, options }
    }

    /// Runs all six passes and returns the grouped model.
    ///
    /// A plan without change records is treated as absent, so a partial
    /// document degrades to "no plan" behavior instead of filtering
    /// everything out.
    pub fn build_groups(&self, graph: &RawGraph, plan: Option<&Plan>) -> GroupSet {
        let plan = plan.filter(|plan| !plan.resource_changes.is_empty());

        let descriptors: IndexMap<Addr, BlockDescriptor> = graph
            .nodes
            .iter()
            .map(|&node| (node, classify(&node.resolve())))
            .collect();

        let mut adjacency: DiGraphMap<Addr, ()> = DiGraphMap::new();
        for &node in &graph.nodes {
            adjacency.add_node(node);
        }
        for &(from, to) in &graph.edges {
            adjacency.add_edge(from, to, ());
        }

        let mut groups: IndexMap<Addr, ResourceGroup> = IndexMap::new();
        // One owner per node, consulted before any absorption or recursion.
        let mut owner: IndexMap<Addr, Addr> = IndexMap::new();

        self.seed_groups(&descriptors, &mut groups, &mut owner);
        self.absorb_secondaries(&adjacency, &descriptors, &mut groups, &mut owner);
        if self.options.detailed() {
            self.promote_singletons(&descriptors, &mut groups, &mut owner);
        }
        if let Some(plan) = plan {
            self.merge_plan(plan, &mut groups);
        }
        self.filter_groups(plan.is_some(), &mut groups);
        let connections = self.derive_connections(graph, &owner, &mut groups);

        debug!(
            groups = groups.len(),
            connections = connections.len();
            "grouping finished"
        );
        GroupSet {
            groups,
            connections,
        }
    }

    /// Pass 1: one group per main-typed resource node with an instance name.
    fn seed_groups(
        &self,
        descriptors: &IndexMap<Addr, BlockDescriptor>,
        groups: &mut IndexMap<Addr, ResourceGroup>,
        owner: &mut IndexMap<Addr, Addr>,
    ) {
        for (&node, descriptor) in descriptors {
            if descriptor.kind != BlockKind::Resource || !descriptor.has_instance_name {
                continue;
            }
            let Some(resource_type) = descriptor.resource_type.as_deref() else {
                continue;
            };
            if !self.catalog.is_main(resource_type) {
                continue;
            }
            let Some(row) = self.catalog.row(resource_type) else {
                continue;
            };

            let member = member_from_descriptor(node, descriptor);
            let group = ResourceGroup::new(
                node,
                member,
                row.category.clone(),
                row.service_name.clone(),
                row.icon_path.clone(),
                descriptor.module_name.clone(),
                descriptor.parent_modules.clone(),
            );
            owner.insert(node, node);
            groups.insert(node, group);
        }
        debug!(seeded = groups.len(); "main resource groups seeded");
    }

    /// Pass 2: transitive absorption of secondary blocks and data sources.
    fn absorb_secondaries(
        &self,
        adjacency: &DiGraphMap<Addr, ()>,
        descriptors: &IndexMap<Addr, BlockDescriptor>,
        groups: &mut IndexMap<Addr, ResourceGroup>,
        owner: &mut IndexMap<Addr, Addr>,
    ) {
        let seeds: Vec<Addr> = groups.keys().copied().collect();
        for seed in seeds {
            let main_type = groups[&seed].main_member().resource_type.clone();

            let mut stack = vec![seed];
            let mut visited: IndexSet<Addr> = IndexSet::from([seed]);
            while let Some(node) = stack.pop() {
                for direction in [Direction::Outgoing, Direction::Incoming] {
                    for neighbor in adjacency.neighbors_directed(node, direction) {
                        if !visited.insert(neighbor) {
                            continue;
                        }
                        if owner.contains_key(&neighbor) {
                            continue;
                        }
                        let Some(descriptor) = descriptors.get(&neighbor) else {
                            continue;
                        };
                        if !self.absorbs(&main_type, descriptor) {
                            continue;
                        }
                        owner.insert(neighbor, seed);
                        groups[&seed]
                            .members
                            .push(member_from_descriptor(neighbor, descriptor));
                        // Absorption is transitive: keep exploring from the
                        // absorbed node in both directions.
                        stack.push(neighbor);
                    }
                }
            }
        }
    }

    /// Whether the descriptor's type is absorbed by `main_type`.
    fn absorbs(&self, main_type: &str, descriptor: &BlockDescriptor) -> bool {
        if !descriptor.has_instance_name {
            return false;
        }
        let Some(candidate) = descriptor.resource_type.as_deref() else {
            return false;
        };
        match descriptor.kind {
            BlockKind::Resource => self.catalog.is_secondary_of(main_type, candidate),
            BlockKind::Data => self.catalog.is_data_source_of(main_type, candidate),
            _ => false,
        }
    }

    /// Pass 3: detailed mode promotes unclaimed resource nodes to
    /// singleton groups, with catalog metadata when available.
    fn promote_singletons(
        &self,
        descriptors: &IndexMap<Addr, BlockDescriptor>,
        groups: &mut IndexMap<Addr, ResourceGroup>,
        owner: &mut IndexMap<Addr, Addr>,
    ) {
        for (&node, descriptor) in descriptors {
            if descriptor.kind != BlockKind::Resource
                || !descriptor.has_instance_name
                || owner.contains_key(&node)
            {
                continue;
            }
            let Some(resource_type) = descriptor.resource_type.as_deref() else {
                continue;
            };
            let (category, service_name, icon) = match self.catalog.row(resource_type) {
                Some(row) => (
                    row.category.clone(),
                    row.service_name.clone(),
                    row.icon_path.clone(),
                ),
                None => (
                    UNKNOWN_CATEGORY.to_string(),
                    resource_type.to_string(),
                    String::new(),
                ),
            };
            let member = member_from_descriptor(node, descriptor);
            let group = ResourceGroup::new(
                node,
                member,
                category,
                service_name,
                icon,
                descriptor.module_name.clone(),
                descriptor.parent_modules.clone(),
            );
            owner.insert(node, node);
            groups.insert(node, group);
        }
    }

    /// Pass 4: attach matching change records per member and fold the
    /// aggregate state.
    fn merge_plan(&self, plan: &Plan, groups: &mut IndexMap<Addr, ResourceGroup>) {
        for group in groups.values_mut() {
            for member in &mut group.members {
                let address = member.node.resolve();
                let indexed_prefix = format!("{address}[");
                member.change_records = plan
                    .resource_changes
                    .iter()
                    .filter(|record| {
                        record.address == address || record.address.starts_with(&indexed_prefix)
                    })
                    .cloned()
                    .collect();
            }
            let aggregate = aggregate::fold_members(&group.members);
            group.aggregate_state = aggregate.state;
            group.number_of_changes = aggregate.number_of_changes;
        }
    }

    /// Pass 5: drop planless, unchanged, de-selected, and untagged groups.
    fn filter_groups(&self, plan_present: bool, groups: &mut IndexMap<Addr, ResourceGroup>) {
        if plan_present {
            groups.retain(|_, group| !group.main_member().change_records.is_empty());
            if !self.options.show_unchanged() {
                groups.retain(|_, group| {
                    group.number_of_changes > 0 || group.state_file_ref.is_some()
                });
            }
        }
        if !self.options.deselected_categories().is_empty() {
            groups.retain(|_, group| {
                !self
                    .options
                    .deselected_categories()
                    .iter()
                    .any(|category| *category == group.category)
            });
        }
        if !self.options.selected_tags().is_empty() {
            groups.retain(|_, group| has_selected_tag(group, self.options.selected_tags()));
        }
    }

    /// Pass 6: register one deduplicated connection per ordered group pair
    /// linked by a raw edge.
    fn derive_connections(
        &self,
        graph: &RawGraph,
        owner: &IndexMap<Addr, Addr>,
        groups: &mut IndexMap<Addr, ResourceGroup>,
    ) -> Vec<Connection> {
        let mut seen: IndexSet<(Addr, Addr)> = IndexSet::new();
        let mut connections = Vec::new();

        for &(from_node, to_node) in &graph.edges {
            let (Some(&from_group), Some(&to_group)) =
                (owner.get(&from_node), owner.get(&to_node))
            else {
                continue;
            };
            if from_group == to_group {
                continue;
            }
            if !groups.contains_key(&from_group) || !groups.contains_key(&to_group) {
                // One endpoint was filtered away.
                continue;
            }
            if !seen.insert((from_group, to_group)) {
                continue;
            }
            connections.push(Connection {
                from: from_group,
                to: to_group,
            });
            groups[&from_group].connections_in.insert(to_group);
            groups[&to_group].connections_out.insert(from_group);
        }

        connections
    }
}

/// Builds a member from a classified node descriptor.
fn member_from_descriptor(node: Addr, descriptor: &BlockDescriptor) -> GroupMember {
    let resource_type = descriptor.resource_type.clone().unwrap_or_else(|| {
        warn!(address = descriptor.canonical_address.as_str(); "member without a resource type");
        String::new()
    });
    let resource_name = descriptor.resource_name.clone().unwrap_or_default();
    GroupMember::new(node, resource_type, resource_name)
}

/// Whether any member change snapshot carries one of the selected tag keys.
fn has_selected_tag(group: &ResourceGroup, selected_tags: &[String]) -> bool {
    group
        .members
        .iter()
        .flat_map(|member| &member.change_records)
        .any(|record| {
            [&record.change.before, &record.change.after]
                .into_iter()
                .flatten()
                .any(|snapshot| snapshot_has_tag(snapshot, selected_tags))
        })
}

fn snapshot_has_tag(snapshot: &Value, selected_tags: &[String]) -> bool {
    ["tags", "tags_all"].into_iter().any(|key| {
        snapshot
            .get(key)
            .and_then(Value::as_object)
            .is_some_and(|tags| selected_tags.iter().any(|tag| tags.contains_key(tag)))
    })
}

#[cfg(test)]
mod tests {
    use terrane_core::plan::ChangeKind;

    use super::*;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> RawGraph {
        let mut raw = RawGraph::default();
        for node in nodes {
            raw.nodes.push(Addr::new(node));
        }
        for (from, to) in edges {
            raw.edges.push((Addr::new(from), Addr::new(to)));
        }
        raw
    }

    fn plan_json(json: &str) -> Plan {
        serde_json::from_str(json).expect("test plan must deserialize")
    }

    #[test]
    fn test_seed_uniqueness() {
        let catalog = ResourceCatalog::default();
        let options = RenderOptions::default();
        let raw = graph(
            &["aws_instance.app", "aws_instance.db", "var.region"],
            &[],
        );
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, None);

        assert_eq!(set.len(), 2);
        assert!(set.group(Addr::new("aws_instance.app")).is_some());
        assert!(set.group(Addr::new("aws_instance.db")).is_some());
    }

    #[test]
    fn test_secondary_absorption() {
        let catalog = ResourceCatalog::default();
        let options = RenderOptions::default();
        let raw = graph(
            &[
                "aws_instance.app",
                "aws_security_group.sg",
                "data.aws_ami.ubuntu",
            ],
            &[
                ("aws_instance.app", "aws_security_group.sg"),
                ("aws_instance.app", "data.aws_ami.ubuntu"),
            ],
        );
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, None);

        assert_eq!(set.len(), 1);
        let group = set.group(Addr::new("aws_instance.app")).unwrap();
        assert_eq!(group.members.len(), 3);
        assert_eq!(group.main_member().resource_type, "aws_instance");
    }

    #[test]
    fn test_absorption_chain_through_secondary() {
        let catalog = ResourceCatalog::default();
        let options = RenderOptions::default();
        // The volume attachment is only reachable through the volume.
        let raw = graph(
            &[
                "aws_instance.app",
                "aws_ebs_volume.data",
                "aws_volume_attachment.data",
            ],
            &[
                ("aws_ebs_volume.data", "aws_instance.app"),
                ("aws_volume_attachment.data", "aws_ebs_volume.data"),
            ],
        );
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, None);

        let group = set.group(Addr::new("aws_instance.app")).unwrap();
        assert_eq!(group.members.len(), 3);
    }

    #[test]
    fn test_absorption_claims_each_node_once() {
        let catalog = ResourceCatalog::default();
        let options = RenderOptions::default();
        let raw = graph(
            &[
                "aws_instance.app",
                "aws_instance.db",
                "aws_security_group.shared",
            ],
            &[
                ("aws_instance.app", "aws_security_group.shared"),
                ("aws_instance.db", "aws_security_group.shared"),
            ],
        );
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, None);

        let total_members: usize = set.groups.values().map(|group| group.members.len()).sum();
        assert_eq!(total_members, 3);
    }

    #[test]
    fn test_cyclic_edges_terminate() {
        let catalog = ResourceCatalog::default();
        let options = RenderOptions::default();
        let raw = graph(
            &["aws_instance.app", "aws_security_group.sg"],
            &[
                ("aws_instance.app", "aws_security_group.sg"),
                ("aws_security_group.sg", "aws_instance.app"),
            ],
        );
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, None);
        assert_eq!(set.len(), 1);
        assert_eq!(set.groups[&Addr::new("aws_instance.app")].members.len(), 2);
    }

    #[test]
    fn test_detailed_mode_promotes_unclaimed_nodes() {
        let catalog = ResourceCatalog::default();
        let raw = graph(&["aws_iam_role.standalone"], &[]);

        let plain = GroupingEngine::new(&catalog, &RenderOptions::default())
            .build_groups(&raw, None);
        assert!(plain.is_empty());

        let detailed_options = RenderOptions::default().with_detailed(true);
        let detailed = GroupingEngine::new(&catalog, &detailed_options).build_groups(&raw, None);
        assert_eq!(detailed.len(), 1);
        let group = detailed.group(Addr::new("aws_iam_role.standalone")).unwrap();
        assert_eq!(group.category, UNKNOWN_CATEGORY);
        assert_eq!(group.service_name, "aws_iam_role");
    }

    #[test]
    fn test_plan_merge_matches_indexed_instances() {
        let catalog = ResourceCatalog::default();
        let options = RenderOptions::default();
        let raw = graph(&["aws_instance.app"], &[]);
        let plan = plan_json(
            r#"{"resource_changes": [
                {"address": "aws_instance.app[0]", "type": "aws_instance", "name": "app",
                 "change": {"actions": ["create"]}},
                {"address": "aws_instance.app[1]", "type": "aws_instance", "name": "app",
                 "change": {"actions": ["create"]}},
                {"address": "aws_instance.apple", "type": "aws_instance", "name": "apple",
                 "change": {"actions": ["create"]}}
            ]}"#,
        );
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, Some(&plan));

        let group = set.group(Addr::new("aws_instance.app")).unwrap();
        // `aws_instance.apple` must not match the `aws_instance.app` prefix.
        assert_eq!(group.main_member().change_records.len(), 2);
        assert_eq!(group.aggregate_state, ChangeKind::Create);
        assert_eq!(group.number_of_changes, 1);
    }

    #[test]
    fn test_filtering_drops_unchanged_groups() {
        let catalog = ResourceCatalog::default();
        let options = RenderOptions::default();
        let raw = graph(&["aws_instance.app", "aws_instance.db"], &[]);
        let plan = plan_json(
            r#"{"resource_changes": [
                {"address": "aws_instance.app", "type": "aws_instance", "name": "app",
                 "change": {"actions": ["update"]}},
                {"address": "aws_instance.db", "type": "aws_instance", "name": "db",
                 "change": {"actions": ["no-op"]}}
            ]}"#,
        );
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, Some(&plan));

        assert_eq!(set.len(), 1);
        assert!(set.group(Addr::new("aws_instance.db")).is_none());
    }

    #[test]
    fn test_filtered_group_leaves_no_connections() {
        let catalog = ResourceCatalog::default();
        let options = RenderOptions::default();
        let raw = graph(
            &["aws_instance.app", "aws_instance.db"],
            &[("aws_instance.app", "aws_instance.db")],
        );
        let plan = plan_json(
            r#"{"resource_changes": [
                {"address": "aws_instance.app", "type": "aws_instance", "name": "app",
                 "change": {"actions": ["update"]}},
                {"address": "aws_instance.db", "type": "aws_instance", "name": "db",
                 "change": {"actions": ["no-op"]}}
            ]}"#,
        );
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, Some(&plan));

        // The unchanged target is removed, and the edge to it must not
        // survive in the connection list or the survivor's sets.
        assert_eq!(set.len(), 1);
        assert!(set.connections.is_empty());
        let app = set.group(Addr::new("aws_instance.app")).unwrap();
        assert!(app.connections_in.is_empty());
        assert!(app.connections_out.is_empty());
    }

    #[test]
    fn test_show_unchanged_keeps_noop_groups() {
        let catalog = ResourceCatalog::default();
        let options = RenderOptions::default().with_show_unchanged(true);
        let raw = graph(&["aws_instance.app", "aws_instance.db"], &[]);
        let plan = plan_json(
            r#"{"resource_changes": [
                {"address": "aws_instance.app", "type": "aws_instance", "name": "app",
                 "change": {"actions": ["update"]}},
                {"address": "aws_instance.db", "type": "aws_instance", "name": "db",
                 "change": {"actions": ["no-op"]}}
            ]}"#,
        );
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, Some(&plan));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_category_deselection() {
        let catalog = ResourceCatalog::default();
        let options =
            RenderOptions::default().with_deselected_categories(vec!["compute".to_string()]);
        let raw = graph(&["aws_instance.app", "aws_s3_bucket.logs"], &[]);
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, None);

        assert_eq!(set.len(), 1);
        assert!(set.group(Addr::new("aws_s3_bucket.logs")).is_some());
    }

    #[test]
    fn test_tag_selection_keeps_tagged_groups() {
        let catalog = ResourceCatalog::default();
        let options = RenderOptions::default().with_selected_tags(vec!["env".to_string()]);
        let raw = graph(&["aws_instance.app", "aws_instance.db"], &[]);
        let plan = plan_json(
            r#"{"resource_changes": [
                {"address": "aws_instance.app", "type": "aws_instance", "name": "app",
                 "change": {"actions": ["create"], "after": {"tags": {"env": "prod"}}}},
                {"address": "aws_instance.db", "type": "aws_instance", "name": "db",
                 "change": {"actions": ["create"], "after": {"tags": {"team": "data"}}}}
            ]}"#,
        );
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, Some(&plan));

        assert_eq!(set.len(), 1);
        assert!(set.group(Addr::new("aws_instance.app")).is_some());
    }

    #[test]
    fn test_connections_deduplicated() {
        let catalog = ResourceCatalog::default();
        let options = RenderOptions::default();
        let raw = graph(
            &["aws_instance.app", "aws_instance.db"],
            &[
                ("aws_instance.app", "aws_instance.db"),
                ("aws_instance.app", "aws_instance.db"),
            ],
        );
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, None);

        assert_eq!(set.connections.len(), 1);
        let app = set.group(Addr::new("aws_instance.app")).unwrap();
        let db = set.group(Addr::new("aws_instance.db")).unwrap();
        assert!(app.connections_in.contains(&Addr::new("aws_instance.db")));
        assert!(db.connections_out.contains(&Addr::new("aws_instance.app")));
        assert!(app.connections_out.is_empty());
        assert!(db.connections_in.is_empty());
    }

    #[test]
    fn test_connection_through_member_nodes() {
        let catalog = ResourceCatalog::default();
        let options = RenderOptions::default();
        // The raw edge touches a secondary member, not the main node.
        let raw = graph(
            &[
                "aws_instance.app",
                "aws_security_group.sg",
                "aws_s3_bucket.logs",
            ],
            &[
                ("aws_instance.app", "aws_security_group.sg"),
                ("aws_security_group.sg", "aws_s3_bucket.logs"),
            ],
        );
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, None);

        assert_eq!(set.len(), 2);
        assert_eq!(set.connections.len(), 1);
        assert_eq!(set.connections[0].from, Addr::new("aws_instance.app"));
        assert_eq!(set.connections[0].to, Addr::new("aws_s3_bucket.logs"));
    }

    #[test]
    fn test_empty_plan_changes_treated_as_no_plan() {
        let catalog = ResourceCatalog::default();
        let options = RenderOptions::default();
        let raw = graph(&["aws_instance.app"], &[]);
        let plan = plan_json("{}");
        let set = GroupingEngine::new(&catalog, &options).build_groups(&raw, Some(&plan));

        // Degrades to "no plan": the group survives with a no-op state.
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.group(Addr::new("aws_instance.app")).unwrap().aggregate_state,
            ChangeKind::NoOp
        );
    }
}
