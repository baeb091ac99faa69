//! Layered positioning of one containment scope's children.
//!
//! Children with edges between them go through the rust-sugiyama layered
//! algorithm; the resulting ranks are materialized as rows using the
//! children's real sizes. Children the algorithm does not place (isolated
//! nodes, or everything when the algorithm panics) are appended as a final
//! row. Coordinates are relative to the scope's content origin.

use std::collections::BTreeMap;

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use rust_sugiyama::configure::Config;

use terrane_core::geometry::{Point, Size};

/// Positions the scope's direct children, returning each child's origin.
pub(crate) fn position_children(
    children: &[(String, Size)],
    edges: &[(String, String)],
    horizontal_spacing: f32,
    vertical_spacing: f32,
) -> IndexMap<String, Point> {
    let mut positions: IndexMap<String, Point> = IndexMap::new();
    if children.is_empty() {
        return positions;
    }

    let index_of: IndexMap<&str, u32> = children
        .iter()
        .enumerate()
        .map(|(i, (id, _))| (id.as_str(), i as u32))
        .collect();

    let mut layered_edges: Vec<(u32, u32)> = Vec::new();
    let mut seen: IndexSet<(u32, u32)> = IndexSet::new();
    for (from, to) in edges {
        let (Some(&a), Some(&b)) = (index_of.get(from.as_str()), index_of.get(to.as_str()))
        else {
            continue;
        };
        if a != b && seen.insert((a, b)) {
            layered_edges.push((a, b));
        }
    }

    // Rank rows per component, stacked vertically in component order.
    let mut rows: Vec<Vec<u32>> = Vec::new();
    let mut placed: IndexSet<u32> = IndexSet::new();

    if !layered_edges.is_empty() {
        debug!(
            nodes = children.len(),
            edges = layered_edges.len();
            "running layered placement"
        );
        let algorithm_edges = layered_edges.clone();
        let outcome = std::panic::catch_unwind(move || {
            let config = Config {
                minimum_length: 1,
                vertex_spacing: 3.0,
                ..Default::default()
            };
            rust_sugiyama::from_edges(&algorithm_edges, &config)
        });

        match outcome {
            Ok(components) => {
                for (coords, _, _) in &components {
                    let mut ranks: BTreeMap<i64, Vec<(i64, u32)>> = BTreeMap::new();
                    for &(id, (x, y)) in coords {
                        if id >= children.len() {
                            continue;
                        }
                        let id = id as u32;
                        if placed.insert(id) {
                            ranks
                                .entry(y.round() as i64)
                                .or_default()
                                .push((x.round() as i64, id));
                        }
                    }
                    for (_, mut row) in ranks {
                        row.sort_by_key(|(x, _)| *x);
                        rows.push(row.into_iter().map(|(_, id)| id).collect());
                    }
                }
            }
            Err(_) => {
                warn!("layered placement panicked; arranging children in a single row");
            }
        }
    }

    // Isolated children, or everything on fallback.
    let leftovers: Vec<u32> = (0..children.len() as u32)
        .filter(|id| !placed.contains(id))
        .collect();
    if !leftovers.is_empty() {
        rows.push(leftovers);
    }

    let mut cursor_y = 0.0;
    for row in rows {
        let mut cursor_x = 0.0;
        let mut row_height: f32 = 0.0;
        for id in row {
            let (child_id, size) = &children[id as usize];
            positions.insert(child_id.clone(), Point::new(cursor_x, cursor_y));
            cursor_x += size.width() + horizontal_spacing;
            row_height = row_height.max(size.height());
        }
        cursor_y += row_height + vertical_spacing;
    }

    positions
}
