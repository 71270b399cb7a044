use super::{GraphEdge, GraphNode, OsmNodeId};
use std::collections::HashMap;

/// a directed multigraph keyed by OSM node id. the representation favors
/// simplicity over micro-optimized storage: forward adjacency holds, per
/// source node, the ordered list of outgoing edges (parallel edges allowed);
/// a reverse index is maintained alongside it so predecessor queries used by
/// the simplifier don't require a full edge scan.
#[derive(Debug, Default, Clone)]
pub struct OsmGraph {
    nodes: HashMap<OsmNodeId, GraphNode>,
    adj: HashMap<OsmNodeId, Vec<GraphEdge>>,
    rev: HashMap<OsmNodeId, Vec<OsmNodeId>>,
}

impl OsmGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adj.values().map(|v| v.len()).sum()
    }

    pub fn node(&self, id: OsmNodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: OsmNodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&OsmNodeId, &GraphNode)> {
        self.nodes.iter()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = (&OsmNodeId, &mut GraphNode)> {
        self.nodes.iter_mut()
    }

    pub fn contains_node(&self, id: OsmNodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// inserts a node, or merges `attrs` into an existing node (used by
    /// ingest, where the same coordinate may be visited by multiple ways).
    pub fn upsert_node(&mut self, id: OsmNodeId, lon: f64, lat: f64) {
        self.nodes
            .entry(id)
            .or_insert_with(|| GraphNode::new(lon, lat));
    }

    pub fn add_edge(&mut self, source: OsmNodeId, edge: GraphEdge) {
        self.rev.entry(edge.target).or_default().push(source);
        self.adj.entry(source).or_default().push(edge);
    }

    pub fn edges_from(&self, source: OsmNodeId) -> &[GraphEdge] {
        self.adj.get(&source).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edges_from_mut(&mut self, source: OsmNodeId) -> Option<&mut Vec<GraphEdge>> {
        self.adj.get_mut(&source)
    }

    /// the edge `source -> target` at multigraph key 0 (the first such edge
    /// found), matching the simplifier's "operate on key 0" convention.
    pub fn get_edge(&self, source: OsmNodeId, target: OsmNodeId) -> Option<&GraphEdge> {
        self.adj
            .get(&source)
            .and_then(|edges| edges.iter().find(|e| e.target == target))
    }

    /// removes the first `source -> target` edge (key 0), returning it if
    /// present. updates the reverse index accordingly.
    pub fn remove_edge(&mut self, source: OsmNodeId, target: OsmNodeId) -> Option<GraphEdge> {
        let removed = {
            let edges = self.adj.get_mut(&source)?;
            let pos = edges.iter().position(|e| e.target == target)?;
            Some(edges.remove(pos))
        }?;
        if let Some(preds) = self.rev.get_mut(&target) {
            if let Some(pos) = preds.iter().position(|&p| p == source) {
                preds.remove(pos);
            }
        }
        Some(removed)
    }

    /// unique predecessor nodes of `n` (nodes `p` with an edge `p -> n`).
    pub fn predecessors(&self, n: OsmNodeId) -> Vec<OsmNodeId> {
        match self.rev.get(&n) {
            None => Vec::new(),
            Some(preds) => {
                let mut uniq: Vec<OsmNodeId> = preds.clone();
                uniq.sort();
                uniq.dedup();
                uniq
            }
        }
    }

    /// unique successor nodes of `n` (nodes `s` with an edge `n -> s`).
    pub fn successors(&self, n: OsmNodeId) -> Vec<OsmNodeId> {
        match self.adj.get(&n) {
            None => Vec::new(),
            Some(edges) => {
                let mut uniq: Vec<OsmNodeId> = edges.iter().map(|e| e.target).collect();
                uniq.sort();
                uniq.dedup();
                uniq
            }
        }
    }

    /// iterates every `(source, &edge)` pair in the graph.
    pub fn edges(&self) -> impl Iterator<Item = (OsmNodeId, &GraphEdge)> {
        self.adj
            .iter()
            .flat_map(|(&u, edges)| edges.iter().map(move |e| (u, e)))
    }

    /// iterates every `(source, &mut edge)` pair in the graph.
    pub fn edges_mut(&mut self) -> impl Iterator<Item = (OsmNodeId, &mut GraphEdge)> {
        self.adj
            .iter_mut()
            .flat_map(|(&u, edges)| edges.iter_mut().map(move |e| (u, e)))
    }

    pub fn source_nodes(&self) -> impl Iterator<Item = &OsmNodeId> {
        self.adj.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WayClass;

    fn edge(target: i64) -> GraphEdge {
        GraphEdge {
            target: OsmNodeId(target),
            way_class: WayClass::Footway,
            highway: "footway".to_string(),
            footway: None,
            crossing: None,
            width: None,
            incline: None,
            opening_hours: None,
            elevator: None,
            curbramps: None,
            bridge: None,
            crossings_mapped: None,
            sidewalks_mapped: None,
            osm_id: Some(1),
            segment: Some(0),
            ndref: None,
            geometry: None,
            length: None,
        }
    }

    #[test]
    fn test_predecessors_successors() {
        let mut g = OsmGraph::new();
        g.upsert_node(OsmNodeId(1), 0.0, 0.0);
        g.upsert_node(OsmNodeId(2), 0.0, 0.0);
        g.upsert_node(OsmNodeId(3), 0.0, 0.0);
        g.add_edge(OsmNodeId(1), edge(2));
        g.add_edge(OsmNodeId(2), edge(3));

        assert_eq!(g.predecessors(OsmNodeId(2)), vec![OsmNodeId(1)]);
        assert_eq!(g.successors(OsmNodeId(2)), vec![OsmNodeId(3)]);
        assert!(g.predecessors(OsmNodeId(1)).is_empty());
    }

    #[test]
    fn test_remove_edge_updates_reverse_index() {
        let mut g = OsmGraph::new();
        g.add_edge(OsmNodeId(1), edge(2));
        assert!(g.remove_edge(OsmNodeId(1), OsmNodeId(2)).is_some());
        assert!(g.predecessors(OsmNodeId(2)).is_empty());
        assert!(g.edges_from(OsmNodeId(1)).is_empty());
    }

    #[test]
    fn test_parallel_edges_key_zero_convention() {
        let mut g = OsmGraph::new();
        g.add_edge(OsmNodeId(1), edge(2));
        g.add_edge(OsmNodeId(1), edge(2));
        assert_eq!(g.edges_from(OsmNodeId(1)).len(), 2);
        g.remove_edge(OsmNodeId(1), OsmNodeId(2));
        assert_eq!(g.edges_from(OsmNodeId(1)).len(), 1);
    }
}
