//! collapses chains of intermediate degree-2 nodes within a single way into
//! a single edge, grounded on the run-merging algorithm in the original
//! `OSMGraph` simplification pass and shaped here as the teacher's
//! `simplified_way.rs` shapes a consolidated way: collect candidates, group
//! by the source way, then replace each maximal run with one edge.

use crate::graph::{GraphEdge, OsmGraph, OsmNodeId};
use crate::model::StageSummary;
use std::collections::HashMap;

struct Candidate {
    p: OsmNodeId,
    n: OsmNodeId,
    s: OsmNodeId,
    segment: usize,
}

/// simplifies `graph` in place, returning a summary of runs that could not
/// be applied (their seed edge had already been consumed by an earlier run
/// in the same pass).
pub fn simplify(graph: &mut OsmGraph) -> StageSummary {
    let mut summary = StageSummary::new();
    let candidates = collect_candidates(graph);
    let by_way = group_by_way(candidates);

    for (osm_id, mut group) in by_way {
        group.sort_by_key(|c| c.segment);
        for run in partition_into_runs(group) {
            apply_run(graph, &run, osm_id, &mut summary);
        }
    }

    summary
}

fn collect_candidates(graph: &OsmGraph) -> Vec<(i64, Candidate)> {
    let mut out = Vec::new();
    let node_ids: Vec<OsmNodeId> = graph.nodes().map(|(id, _)| *id).collect();

    for n in node_ids {
        if graph.node(n).map(|node| node.kerb.is_some()).unwrap_or(false) {
            continue;
        }
        let preds = graph.predecessors(n);
        let succs = graph.successors(n);
        if preds.len() != 1 || succs.len() != 1 {
            continue;
        }
        let p = preds[0];
        let s = succs[0];
        if p == n || s == n {
            continue;
        }
        let incoming = match graph.get_edge(p, n) {
            Some(e) => e,
            None => continue,
        };
        let outgoing = match graph.get_edge(n, s) {
            Some(e) => e,
            None => continue,
        };
        let (incoming_way, incoming_segment) = match (incoming.osm_id, incoming.segment) {
            (Some(w), Some(seg)) => (w, seg),
            _ => continue,
        };
        if outgoing.osm_id != Some(incoming_way) {
            continue;
        }
        out.push((
            incoming_way,
            Candidate {
                p,
                n,
                s,
                segment: incoming_segment,
            },
        ));
    }
    out
}

fn group_by_way(candidates: Vec<(i64, Candidate)>) -> HashMap<i64, Vec<Candidate>> {
    let mut map: HashMap<i64, Vec<Candidate>> = HashMap::new();
    for (way, c) in candidates {
        map.entry(way).or_default().push(c);
    }
    map
}

/// splits a way's sorted candidates into maximal runs of consecutive
/// segment indices.
fn partition_into_runs(sorted: Vec<Candidate>) -> Vec<Vec<Candidate>> {
    let mut runs: Vec<Vec<Candidate>> = Vec::new();
    for c in sorted {
        match runs.last_mut() {
            Some(run) if c.segment == run.last().unwrap().segment + 1 => run.push(c),
            _ => runs.push(vec![c]),
        }
    }
    runs
}

fn apply_run(graph: &mut OsmGraph, run: &[Candidate], osm_id: i64, summary: &mut StageSummary) {
    let p0 = run[0].p;
    let n0 = run[0].n;

    let seed = match graph.get_edge(p0, n0) {
        Some(e) => e.clone(),
        None => {
            summary.record("run_seed_already_consumed", format!("way {osm_id}"));
            return;
        }
    };

    let mut ndref = seed.ndref.clone().unwrap_or_else(|| vec![p0, n0]);
    let mut last_s = n0;
    for c in run {
        if graph.get_edge(c.n, c.s).is_none() {
            summary.record("run_intermediate_edge_missing", format!("way {osm_id}"));
            continue;
        }
        ndref.push(c.s);
        graph.remove_edge(c.n, c.s);
        last_s = c.s;
    }

    if last_s == n0 {
        // every intermediate edge in the run was already gone; nothing left to merge.
        return;
    }

    graph.remove_edge(p0, n0);
    let merged = GraphEdge {
        target: last_s,
        ndref: Some(ndref),
        ..seed
    };
    graph.add_edge(p0, merged);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WayClass;

    fn way_edge(way: i64, segment: usize, u: OsmNodeId, v: OsmNodeId) -> GraphEdge {
        GraphEdge {
            target: v,
            way_class: WayClass::Sidewalk,
            highway: "footway".to_string(),
            footway: Some("sidewalk".to_string()),
            crossing: None,
            width: None,
            incline: None,
            opening_hours: None,
            elevator: None,
            curbramps: None,
            bridge: None,
            crossings_mapped: None,
            sidewalks_mapped: None,
            osm_id: Some(way),
            segment: Some(segment),
            ndref: Some(vec![u, v]),
            geometry: None,
            length: None,
        }
    }

    fn chain_graph() -> OsmGraph {
        // a single way 1->2->3->4->5, none of the intermediate nodes are kerbs.
        let mut g = OsmGraph::new();
        for i in 1..=5 {
            g.upsert_node(OsmNodeId(i), i as f64, 0.0);
        }
        g.add_edge(OsmNodeId(1), way_edge(100, 0, OsmNodeId(1), OsmNodeId(2)));
        g.add_edge(OsmNodeId(2), way_edge(100, 1, OsmNodeId(2), OsmNodeId(3)));
        g.add_edge(OsmNodeId(3), way_edge(100, 2, OsmNodeId(3), OsmNodeId(4)));
        g.add_edge(OsmNodeId(4), way_edge(100, 3, OsmNodeId(4), OsmNodeId(5)));
        g
    }

    #[test]
    fn test_simplify_collapses_degree2_chain() {
        let mut g = chain_graph();
        let summary = simplify(&mut g);
        assert!(summary.is_empty());
        assert_eq!(g.edge_count(), 1);
        let edge = g.get_edge(OsmNodeId(1), OsmNodeId(5)).unwrap();
        assert_eq!(
            edge.ndref,
            Some(vec![OsmNodeId(1), OsmNodeId(2), OsmNodeId(3), OsmNodeId(4), OsmNodeId(5)])
        );
    }

    #[test]
    fn test_simplify_preserves_kerb_node() {
        let mut g = chain_graph();
        g.node_mut(OsmNodeId(3)).unwrap().kerb = Some("flush".to_string());
        simplify(&mut g);
        // node 3 is preserved, so the chain splits into two edges around it.
        assert_eq!(g.edge_count(), 2);
        assert!(g.get_edge(OsmNodeId(1), OsmNodeId(3)).is_some());
        assert!(g.get_edge(OsmNodeId(3), OsmNodeId(5)).is_some());
    }

    #[test]
    fn test_simplify_leaves_branching_node_untouched() {
        let mut g = OsmGraph::new();
        for i in 1..=3 {
            g.upsert_node(OsmNodeId(i), i as f64, 0.0);
        }
        g.upsert_node(OsmNodeId(4), 4.0, 1.0);
        g.add_edge(OsmNodeId(1), way_edge(100, 0, OsmNodeId(1), OsmNodeId(2)));
        g.add_edge(OsmNodeId(2), way_edge(100, 1, OsmNodeId(2), OsmNodeId(3)));
        // node 2 also has a second predecessor, so it is not degree-2.
        g.add_edge(OsmNodeId(4), way_edge(100, 5, OsmNodeId(4), OsmNodeId(2)));

        simplify(&mut g);
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn test_simplify_does_not_merge_across_way_boundary() {
        let mut g = OsmGraph::new();
        for i in 1..=3 {
            g.upsert_node(OsmNodeId(i), i as f64, 0.0);
        }
        g.add_edge(OsmNodeId(1), way_edge(100, 0, OsmNodeId(1), OsmNodeId(2)));
        g.add_edge(OsmNodeId(2), way_edge(200, 0, OsmNodeId(2), OsmNodeId(3)));

        simplify(&mut g);
        assert_eq!(g.edge_count(), 2);
    }
}
