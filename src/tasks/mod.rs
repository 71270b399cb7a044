//! tags edges by intersection with task-status polygons. grounded on
//! `geo::Intersects` usage for consolidation/containment checks throughout
//! `bambam-osm` (e.g. `consolidation_ops.rs`, `import_ops.rs`).

use crate::graph::OsmGraph;
use geo::{Intersects, LineString, Polygon};

/// a single task polygon feature: its footprint and mapping status string
/// (`"MAPPED"`, `"VALIDATED"`, or anything else, treated as not-done).
#[derive(Debug, Clone)]
pub struct TaskPolygon {
    pub geometry: Polygon<f64>,
    pub status: String,
}

impl TaskPolygon {
    pub fn is_done(&self) -> bool {
        matches!(self.status.as_str(), "MAPPED" | "VALIDATED")
    }
}

/// sets the boolean edge attribute named by `attribute` to 1 for every edge
/// whose geometry intersects a "done" task polygon, 0 otherwise. edges
/// without materialized geometry are left untouched. `attribute` selects
/// which field to write via `setter`, so this single primitive backs both
/// `annotate_crossings` and `annotate_sidewalks`.
fn annotate(
    graph: &mut OsmGraph,
    polygons: &[TaskPolygon],
    predicate: impl Fn(&crate::graph::GraphEdge) -> bool,
    setter: impl Fn(&mut crate::graph::GraphEdge, bool),
) {
    let done_polygons: Vec<&Polygon<f64>> = polygons
        .iter()
        .filter(|p| p.is_done())
        .map(|p| &p.geometry)
        .collect();

    for (_source, edge) in graph.edges_mut() {
        if !predicate(edge) {
            continue;
        }
        let line: &LineString<f64> = match &edge.geometry {
            Some(g) => g,
            None => continue,
        };
        let mapped = done_polygons.iter().any(|poly| line.intersects(*poly));
        setter(edge, mapped);
    }
}

/// sets `crossings_mapped` on every crossing edge.
pub fn annotate_crossings(graph: &mut OsmGraph, polygons: &[TaskPolygon]) {
    annotate(
        graph,
        polygons,
        |e| e.is_crossing(),
        |e, mapped| e.crossings_mapped = Some(mapped),
    );
}

/// sets `sidewalks_mapped` on every sidewalk edge.
pub fn annotate_sidewalks(graph: &mut OsmGraph, polygons: &[TaskPolygon]) {
    annotate(
        graph,
        polygons,
        |e| e.is_sidewalk(),
        |e, mapped| e.sidewalks_mapped = Some(mapped),
    );
}
