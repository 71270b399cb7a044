//! materializes edge geometry and length from the node chains produced by
//! ingest and simplification, then discards the chains. mirrors the
//! geometry-building pass in the original `OSMGraph` construction, which
//! builds a `LineString` per edge and measures it geodesically rather than
//! in projected coordinates.

use crate::graph::OsmGraph;
use crate::model::PipelineError;
use geo::{line_measures::LengthMeasurable, Geodesic, LineString, Point};

/// walks every edge's `ndref` chain, looks up each node's coordinates,
/// builds a `LineString`, measures its length on the WGS84 ellipsoid, and
/// stores both on the edge. `ndref` is cleared afterward: it has no role
/// past this point and every downstream stage only needs the geometry.
pub fn build_geometries(graph: &mut OsmGraph) -> Result<(), PipelineError> {
    let positions: std::collections::HashMap<_, _> = graph
        .nodes()
        .map(|(id, node)| (*id, node.point()))
        .collect();

    for (_source, edge) in graph.edges_mut() {
        let ndref = match &edge.ndref {
            Some(chain) if chain.len() >= 2 => chain.clone(),
            Some(_) | None => {
                return Err(PipelineError::InvalidGeometry(
                    "edge has fewer than two node references".to_string(),
                ))
            }
        };

        let mut points: Vec<Point<f64>> = Vec::with_capacity(ndref.len());
        for id in &ndref {
            let point = positions
                .get(id)
                .ok_or(PipelineError::GraphMissingNodeId(*id))?;
            points.push(*point);
        }

        let line: LineString<f64> = points.into_iter().collect();
        let length = (line.length(&Geodesic) * 10.0).round() / 10.0;
        edge.geometry = Some(line);
        edge.length = Some(length);
        edge.ndref = None;
    }

    for (_id, node) in graph.nodes_mut() {
        if node.geometry.is_none() {
            node.geometry = Some(node.point());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, OsmNodeId};
    use crate::model::WayClass;

    fn edge(u: OsmNodeId, v: OsmNodeId) -> GraphEdge {
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
            osm_id: Some(1),
            segment: Some(0),
            ndref: Some(vec![u, v]),
            geometry: None,
            length: None,
        }
    }

    #[test]
    fn test_build_geometries_sets_length_and_clears_ndref() {
        let mut g = OsmGraph::new();
        g.upsert_node(OsmNodeId(1), -122.0, 47.0);
        g.upsert_node(OsmNodeId(2), -122.001, 47.0);
        g.add_edge(OsmNodeId(1), edge(OsmNodeId(1), OsmNodeId(2)));

        build_geometries(&mut g).unwrap();

        let e = g.get_edge(OsmNodeId(1), OsmNodeId(2)).unwrap();
        assert!(e.ndref.is_none());
        assert!(e.geometry.is_some());
        let length = e.length.unwrap();
        assert!(length > 60.0 && length < 90.0);
    }

    #[test]
    fn test_build_geometries_fails_on_missing_node() {
        let mut g = OsmGraph::new();
        g.upsert_node(OsmNodeId(1), -122.0, 47.0);
        g.add_edge(OsmNodeId(1), edge(OsmNodeId(1), OsmNodeId(2)));

        let err = build_geometries(&mut g).unwrap_err();
        assert!(matches!(err, PipelineError::GraphMissingNodeId(OsmNodeId(2))));
    }
}
