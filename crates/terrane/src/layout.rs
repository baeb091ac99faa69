//! Compound hierarchical layout of a grouped diagram model.
//!
//! The engine builds the containment forest ([`compound`]), positions each
//! scope's children innermost-first with a layered algorithm ([`scope`]),
//! sizes every container from its content plus padding and header, then
//! walks back down assigning absolute coordinates. The output is a flat
//! node/edge list ready for rendering.

mod compound;
mod scope;

use indexmap::IndexMap;
use log::debug;

use terrane_core::{
    geometry::{Bounds, Insets, Point, Size},
    identifier::Addr,
    semantic::{GroupSet, ResourceGroup},
};

use crate::error::TerraneError;

use compound::{ROOT_SCOPE, ScopeKind};

/// Opacity applied to unchanged groups when dimming is active.
const DIMMED_OPACITY: f32 = 0.25;

/// What a positioned node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A resource group.
    Group,
    /// A module container.
    ModuleContainer,
    /// A container for groups merged from an external state file.
    StateContainer,
}

/// One positioned diagram node in absolute coordinates.
#[derive(Debug, Clone)]
pub struct LayoutNode {
    /// Stable node id: the group's canonical address, or the container key.
    pub id: String,
    /// Display label.
    pub label: String,
    pub kind: NodeKind,
    /// Top-left corner.
    pub origin: Point,
    pub size: Size,
    /// Render opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// The group behind this node, for [`NodeKind::Group`] nodes.
    pub group: Option<Addr>,
}

/// A rendered connection between two positioned nodes.
#[derive(Debug, Clone)]
pub struct LayoutEdge {
    pub from: String,
    pub to: String,
    /// Center of the source node.
    pub from_point: Point,
    /// Center of the target node.
    pub to_point: Point,
    /// Minimum of the connected leaf groups' opacities.
    pub opacity: f32,
}

/// The final positioned diagram. Containers precede their contents in
/// `nodes`, so painting in order nests correctly.
#[derive(Debug, Clone, Default)]
pub struct DiagramLayout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    /// Total canvas size including the outer margin.
    pub size: Size,
}

impl DiagramLayout {
    /// Finds a node by id.
    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

/// Computes the compound layout of a group set.
pub struct LayoutEngine {
    leaf_size: Size,
    horizontal_spacing: f32,
    vertical_spacing: f32,
    container_padding: Insets,
    header_height: f32,
    margin: Insets,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self {
            leaf_size: Size::new(120.0, 100.0),
            horizontal_spacing: 50.0,
            vertical_spacing: 80.0,
            container_padding: Insets::uniform(20.0),
            header_height: 28.0,
            margin: Insets::uniform(40.0),
        }
    }
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fixed size used for group nodes.
    pub fn set_leaf_size(&mut self, size: Size) -> &mut Self {
        self.leaf_size = size;
        self
    }

    /// Sets the horizontal spacing between siblings.
    pub fn set_horizontal_spacing(&mut self, spacing: f32) -> &mut Self {
        self.horizontal_spacing = spacing;
        self
    }

    /// Sets the vertical spacing between layers.
    pub fn set_vertical_spacing(&mut self, spacing: f32) -> &mut Self {
        self.vertical_spacing = spacing;
        self
    }

    /// Sets the padding inside containers.
    pub fn set_container_padding(&mut self, padding: Insets) -> &mut Self {
        self.container_padding = padding;
        self
    }

    /// Computes the layout.
    ///
    /// `dim_unchanged` activates the opacity rule: groups whose aggregate
    /// state is trivial and that did not come from an external state file
    /// are dimmed. Containers are always fully opaque.
    ///
    /// # Errors
    ///
    /// Returns [`TerraneError::Layout`] when scope processing produces an
    /// inconsistent forest, which indicates a bug rather than bad input.
    pub fn layout(
        &self,
        groups: &GroupSet,
        dim_unchanged: bool,
    ) -> Result<DiagramLayout, TerraneError> {
        let forest = compound::build(groups);

        // Innermost-first: child container sizes before parents need them.
        let mut relative: IndexMap<String, IndexMap<String, Point>> = IndexMap::new();
        let mut container_sizes: IndexMap<String, Size> = IndexMap::new();

        for key in forest.keys_innermost_first() {
            let scope = &forest.scopes[&key];

            let mut children: Vec<(String, Size)> = Vec::new();
            for child in &scope.container_children {
                let size = container_sizes.get(child).copied().ok_or_else(|| {
                    TerraneError::Layout(format!("container size missing for scope {child}"))
                })?;
                children.push((child.clone(), size));
            }
            for &group_id in &scope.group_children {
                children.push((group_id.resolve(), self.leaf_size));
            }

            let ranked_edges: Vec<(String, String)> = scope
                .edges
                .iter()
                .map(|edge| (edge.from.clone(), edge.to.clone()))
                .collect();
            let positions = scope::position_children(
                &children,
                &ranked_edges,
                self.horizontal_spacing,
                self.vertical_spacing,
            );

            let content = children
                .iter()
                .fold(Bounds::empty(), |bounds, (id, size)| {
                    match positions.get(id) {
                        Some(&origin) => bounds.extend(origin, *size),
                        None => bounds,
                    }
                })
                .size();

            if scope.kind != ScopeKind::Root {
                let mut size = content.grow(self.container_padding);
                size = Size::new(size.width(), size.height() + self.header_height);
                container_sizes.insert(key.clone(), size);
            } else {
                container_sizes.insert(key.clone(), content.grow(self.margin));
            }
            relative.insert(key, positions);
        }

        let total = container_sizes
            .get(ROOT_SCOPE)
            .copied()
            .unwrap_or_default();

        // Top-down absolute placement.
        let mut origins: IndexMap<String, Point> = IndexMap::new();
        let mut node_rects: IndexMap<String, (Point, Size)> = IndexMap::new();
        let mut nodes: Vec<LayoutNode> = Vec::new();

        let mut keys = forest.keys_innermost_first();
        keys.reverse();
        for key in keys {
            let scope = &forest.scopes[&key];
            let scope_origin = if scope.kind == ScopeKind::Root {
                Point::new(self.margin.left(), self.margin.top())
            } else {
                let container_origin = origins.get(&key).copied().ok_or_else(|| {
                    TerraneError::Layout(format!("origin missing for scope {key}"))
                })?;
                container_origin.add_point(Point::new(
                    self.container_padding.left(),
                    self.container_padding.top() + self.header_height,
                ))
            };

            let positions = &relative[&key];
            for child in &scope.container_children {
                let child_scope = &forest.scopes[child];
                let origin = scope_origin.add_point(positions[child]);
                let size = container_sizes[child];
                origins.insert(child.clone(), origin);
                node_rects.insert(child.clone(), (origin, size));
                nodes.push(LayoutNode {
                    id: child.clone(),
                    label: child_scope.label.clone(),
                    kind: match child_scope.kind {
                        ScopeKind::State => NodeKind::StateContainer,
                        _ => NodeKind::ModuleContainer,
                    },
                    origin,
                    size,
                    opacity: 1.0,
                    group: None,
                });
            }
            for &group_id in &scope.group_children {
                let id = group_id.resolve();
                let origin = scope_origin.add_point(positions[&id]);
                let group = groups.group(group_id).ok_or_else(|| {
                    TerraneError::Layout(format!("group missing for node {id}"))
                })?;
                node_rects.insert(id.clone(), (origin, self.leaf_size));
                nodes.push(LayoutNode {
                    id,
                    label: group.service_name.clone(),
                    kind: NodeKind::Group,
                    origin,
                    size: self.leaf_size,
                    opacity: self.group_opacity(group, dim_unchanged),
                    group: Some(group_id),
                });
            }
        }

        // Edge opacity follows the leaf groups behind the connection even
        // when the routed endpoint is a container.
        let leaf_opacity = |id: Addr| {
            groups
                .group(id)
                .map(|group| self.group_opacity(group, dim_unchanged))
                .unwrap_or(1.0)
        };

        let mut edges: Vec<LayoutEdge> = Vec::new();
        for scope in forest.scopes.values() {
            for edge in &scope.edges {
                let (Some(&(from_origin, from_size)), Some(&(to_origin, to_size))) =
                    (node_rects.get(&edge.from), node_rects.get(&edge.to))
                else {
                    continue;
                };
                edges.push(LayoutEdge {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    from_point: center(from_origin, from_size),
                    to_point: center(to_origin, to_size),
                    opacity: leaf_opacity(edge.source_group).min(leaf_opacity(edge.target_group)),
                });
            }
        }

        debug!(
            nodes = nodes.len(),
            edges = edges.len();
            "layout computed"
        );
        Ok(DiagramLayout {
            nodes,
            edges,
            size: total,
        })
    }

    fn group_opacity(&self, group: &ResourceGroup, dim_unchanged: bool) -> f32 {
        if dim_unchanged && group.aggregate_state.is_trivial() && group.state_file_ref.is_none() {
            DIMMED_OPACITY
        } else {
            1.0
        }
    }
}

fn center(origin: Point, size: Size) -> Point {
    origin.add_point(Point::new(size.width() / 2.0, size.height() / 2.0))
}
