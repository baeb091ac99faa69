//! Parser for the raw dependency graph text.
//!
//! The infra tool emits a DOT-subset directed graph: a `digraph { … }`
//! wrapper, optional `subgraph "root" { … }` blocks, node statements with a
//! quoted identifier and an optional attribute list, and edge statements
//! `"a" -> "b"`. Only quoted-identifier statements carry information; the
//! structural lines are skipped.
//!
//! Node identifiers are normalized before interning: a leading `[root] `
//! marker and a trailing parenthesized state marker (` (expand)`,
//! ` (close)`, …) are stripped. Malformed statements are skipped with a
//! warning, never fatal.

use indexmap::IndexSet;
use log::{debug, warn};
use winnow::{
    ModalResult, Parser,
    ascii::multispace0,
    token::any,
};

use terrane_core::identifier::Addr;

use crate::error::ParseError;

/// The parsed raw graph: deduplicated node addresses and directed edges.
#[derive(Debug, Clone, Default)]
pub struct RawGraph {
    /// Node addresses in first-seen order, deduplicated.
    pub nodes: Vec<Addr>,
    /// Directed edges as ordered address pairs.
    pub edges: Vec<(Addr, Addr)>,
}

impl RawGraph {
    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Parses raw graph text into a [`RawGraph`].
///
/// # Errors
///
/// Returns [`ParseError::EmptyGraphSource`] when the source contains no
/// statements at all. Individually malformed statements are skipped.
///
/// # Examples
///
/// ```
/// let source = r#"
/// digraph {
///     "[root] aws_instance.app (expand)" [label = "aws_instance.app"]
///     "[root] aws_instance.app (expand)" -> "[root] aws_security_group.sg (expand)"
/// }
/// "#;
/// let graph = terrane_parser::parse_graph(source).unwrap();
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.edge_count(), 1);
/// ```
pub fn parse_graph(source: &str) -> Result<RawGraph, ParseError> {
    let mut nodes: IndexSet<Addr> = IndexSet::new();
    let mut edges: Vec<(Addr, Addr)> = Vec::new();

    for line in source.lines() {
        let line = line.trim();
        // Statements start with a quoted identifier; everything else is
        // structural (digraph/subgraph wrappers, attribute assignments).
        if !line.starts_with('"') {
            continue;
        }

        let mut input = line;
        if let Ok((source_label, target_label)) = edge_statement(&mut input) {
            let source_addr = normalize_label(&source_label);
            let target_addr = normalize_label(&target_label);
            match (source_addr, target_addr) {
                (Some(from), Some(to)) => {
                    let from = Addr::new(&from);
                    let to = Addr::new(&to);
                    nodes.insert(from);
                    nodes.insert(to);
                    edges.push((from, to));
                }
                _ => warn!(line; "skipping edge with blank endpoint"),
            }
            continue;
        }

        let mut input = line;
        match node_statement(&mut input) {
            Ok(label) => match normalize_label(&label) {
                Some(address) => {
                    nodes.insert(Addr::new(&address));
                }
                None => warn!(line; "skipping node with blank identifier"),
            },
            Err(_) => warn!(line; "skipping malformed graph statement"),
        }
    }

    if nodes.is_empty() && edges.is_empty() {
        return Err(ParseError::EmptyGraphSource);
    }

    debug!(nodes = nodes.len(), edges = edges.len(); "raw graph parsed");
    Ok(RawGraph {
        nodes: nodes.into_iter().collect(),
        edges,
    })
}

/// Parses a quoted identifier, honoring backslash escapes.
fn quoted(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut content = String::new();
    loop {
        let c = any.parse_next(input)?;
        match c {
            '"' => break,
            '\\' => content.push(any.parse_next(input)?),
            c => content.push(c),
        }
    }
    Ok(content)
}

/// Parses `"a" -> "b"`, ignoring any trailing attribute list.
fn edge_statement(input: &mut &str) -> ModalResult<(String, String)> {
    let (source, _, _, _, target) =
        (quoted, multispace0, "->", multispace0, quoted).parse_next(input)?;
    Ok((source, target))
}

/// Parses a node statement's quoted identifier, ignoring trailing attributes.
fn node_statement(input: &mut &str) -> ModalResult<String> {
    quoted.parse_next(input)
}

/// Strips the `[root] ` prefix and a trailing parenthesized state marker.
///
/// Returns `None` when nothing remains.
fn normalize_label(label: &str) -> Option<String> {
    let mut label = label.trim();
    label = label.strip_prefix("[root] ").unwrap_or(label);
    if label.ends_with(')') {
        if let Some(idx) = label.rfind(" (") {
            label = &label[..idx];
        }
    }
    let label = label.trim();
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}
