//! Terrane - diagram models for infrastructure dependency graphs.
//!
//! Parsing, grouping, dependency resolution, and compound layout for
//! infrastructure-as-code dependency graphs and plan documents.

pub mod config;
pub mod layout;

mod error;
mod grouping;
mod resolve;

pub use terrane_core::{address, catalog, geometry, identifier, plan, semantic};

pub use error::TerraneError;
pub use resolve::Dependencies;

use indexmap::IndexMap;
use log::{debug, info};

use terrane_core::{
    catalog::ResourceCatalog,
    identifier::Addr,
    plan::Plan,
    semantic::{GroupSet, VarOut},
};
use terrane_parser::RawGraph;

use config::RenderOptions;
use grouping::GroupingEngine;
use layout::{DiagramLayout, LayoutEngine};
use resolve::DependencyResolver;

/// The fully resolved diagram model: groups, the variable/output catalog,
/// per-group dependency sets, and the positioned layout.
#[derive(Debug, Clone)]
pub struct DiagramModel {
    /// Grouped resources with their connections.
    pub groups: GroupSet,
    /// Declared variables and outputs, with classified references.
    pub var_outs: Vec<VarOut>,
    /// Depends-on and affects sets per group, keyed by group id.
    pub dependencies: IndexMap<Addr, Dependencies>,
    /// Union of the dependency sets of each module's groups, keyed by
    /// dot-joined module path. The root module is not included.
    pub module_dependencies: IndexMap<String, Dependencies>,
    /// Positioned nodes and edges.
    pub layout: DiagramLayout,
}

/// Builder for turning a raw dependency graph and an optional plan into a
/// positioned diagram model.
///
/// # Examples
///
/// ```rust,no_run
/// use terrane::{DiagramPipeline, config::RenderOptions};
///
/// let source = r#"
/// digraph {
///     "aws_instance.app" -> "aws_security_group.sg"
/// }
/// "#;
///
/// let pipeline = DiagramPipeline::new(RenderOptions::default());
/// let graph = pipeline.parse_graph(source).expect("graph parses");
/// let model = pipeline.render(&graph, None).expect("model builds");
/// println!("{} groups", model.groups.len());
/// ```
#[derive(Default)]
pub struct DiagramPipeline {
    options: RenderOptions,
    catalog: ResourceCatalog,
}

impl DiagramPipeline {
    /// Creates a pipeline with the given options and the built-in resource
    /// catalog.
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            catalog: ResourceCatalog::default(),
        }
    }

    /// Replaces the resource catalog.
    pub fn with_catalog(mut self, catalog: ResourceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Parses raw dependency graph text.
    ///
    /// # Errors
    ///
    /// Returns an error when the source contains no graph statements at
    /// all. Malformed individual statements are skipped.
    pub fn parse_graph(&self, source: &str) -> Result<RawGraph, TerraneError> {
        info!("parsing dependency graph");
        let graph = terrane_parser::parse_graph(source)?;
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count();
            "graph parsed"
        );
        Ok(graph)
    }

    /// Parses a plan document.
    ///
    /// # Errors
    ///
    /// Returns an error when the document is not valid JSON or does not
    /// match the plan schema.
    pub fn parse_plan(&self, source: &str) -> Result<Plan, TerraneError> {
        info!("parsing plan document");
        let plan = terrane_parser::parse_plan(source)?;
        debug!(changes = plan.resource_changes.len(); "plan parsed");
        Ok(plan)
    }

    /// Builds the diagram model: grouping, dependency resolution, and
    /// layout.
    ///
    /// A plan whose change list is empty is treated as absent; change
    /// filtering and dimming then stay off, the same as passing `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TerraneError::Layout`] when layout fails. Grouping and
    /// resolution degrade per node and never fail.
    pub fn render(
        &self,
        graph: &RawGraph,
        plan: Option<&Plan>,
    ) -> Result<DiagramModel, TerraneError> {
        let plan = plan.filter(|plan| !plan.resource_changes.is_empty());

        info!(nodes = graph.node_count(), plan = plan.is_some(); "building diagram model");
        let mut groups = GroupingEngine::new(&self.catalog, &self.options).build_groups(graph, plan);

        let resolver =
            DependencyResolver::new(&groups, plan.and_then(|plan| plan.configuration.as_ref()));
        resolver.annotate_module_connections(&mut groups);

        let dependencies: IndexMap<Addr, Dependencies> = groups
            .groups
            .values()
            .map(|group| (group.id, resolver.dependencies_of(group, &groups)))
            .collect();
        let var_outs: Vec<VarOut> = resolver.var_outs().cloned().collect();

        let mut module_dependencies: IndexMap<String, Dependencies> = IndexMap::new();
        for group in groups.groups.values() {
            let module = group.module_path_joined();
            if module.is_empty() || module_dependencies.contains_key(&module) {
                continue;
            }
            let deps = resolver.dependencies_of_module(&module, &groups);
            module_dependencies.insert(module, deps);
        }
        debug!(
            var_outs = var_outs.len(),
            groups = dependencies.len(),
            modules = module_dependencies.len();
            "dependencies resolved"
        );

        let dim_unchanged = plan.is_some() && !self.options.opacity_full();
        let layout = LayoutEngine::new().layout(&groups, dim_unchanged)?;
        info!(
            nodes = layout.nodes.len(),
            edges = layout.edges.len();
            "diagram model built"
        );

        Ok(DiagramModel {
            groups,
            var_outs,
            dependencies,
            module_dependencies,
            layout,
        })
    }
}
