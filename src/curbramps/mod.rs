//! tags crossing edges with curb-ramp accessibility by proximity to kerb
//! nodes. grounded on the "Curb-Ramp Inferrer" rule and on the `rstar`
//! nearest-neighbor usage pattern used for spatial joins across the
//! example pack.

use crate::dem::bridge::utm_epsg_code;
use crate::graph::OsmGraph;
use crate::model::PipelineError;
use geo::Point;
use proj4rs::proj::Proj;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

struct KerbPoint {
    x: f64,
    y: f64,
}

impl RTreeObject for KerbPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for KerbPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

fn project_all(points: &[Point<f64>], epsg: u16) -> Result<Vec<(f64, f64)>, PipelineError> {
    let src = Proj::from_epsg_code(4326)
        .map_err(|e| PipelineError::InvalidGeometry(format!("failure loading EPSG:4326: {e}")))?;
    let dst = Proj::from_epsg_code(epsg)
        .map_err(|e| PipelineError::InvalidGeometry(format!("failure loading EPSG:{epsg}: {e}")))?;
    points
        .iter()
        .map(|p| {
            let mut coord = (p.x().to_radians(), p.y().to_radians());
            proj4rs::transform::transform(&src, &dst, &mut coord)
                .map_err(|e| PipelineError::InvalidGeometry(format!("projection failure: {e}")))?;
            Ok(coord)
        })
        .collect()
}

/// sets `curbramps` on every crossing edge in `graph`: 1 if an accessible
/// kerb node lies within `search_radius_m` of either endpoint, else 0.
/// non-crossing edges are left untouched.
pub fn infer_curbramps(graph: &mut OsmGraph, search_radius_m: f64) -> Result<(), PipelineError> {
    let kerb_points: Vec<Point<f64>> = graph
        .nodes()
        .filter(|(_, node)| node.is_accessible_kerb())
        .map(|(_, node)| node.point())
        .collect();

    if kerb_points.is_empty() {
        for (_source, edge) in graph.edges_mut() {
            if edge.is_crossing() {
                edge.curbramps = Some(0);
            }
        }
        return Ok(());
    }

    let epsg = utm_epsg_code(kerb_points[0].x(), kerb_points[0].y());
    let projected_kerbs = project_all(&kerb_points, epsg)?;
    let tree = RTree::bulk_load(
        projected_kerbs
            .into_iter()
            .map(|(x, y)| KerbPoint { x, y })
            .collect(),
    );

    for (_source, edge) in graph.edges_mut() {
        if !edge.is_crossing() {
            continue;
        }
        let geometry = match &edge.geometry {
            Some(g) => g,
            None => continue,
        };
        let endpoints: Vec<Point<f64>> = [geometry.0.first(), geometry.0.last()]
            .into_iter()
            .flatten()
            .map(|c| Point::new(c.x, c.y))
            .collect();
        let projected_endpoints = project_all(&endpoints, epsg)?;

        let has_nearby_ramp = projected_endpoints.iter().any(|&(x, y)| {
            tree.locate_within_distance([x, y], search_radius_m * search_radius_m)
                .next()
                .is_some()
        });
        edge.curbramps = Some(if has_nearby_ramp { 1 } else { 0 });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, OsmNodeId};
    use crate::model::{RawTags, WayClass};

    fn crossing_edge(u: OsmNodeId, v: OsmNodeId, line: geo::LineString<f64>) -> (OsmNodeId, GraphEdge) {
        let mut tags = RawTags::new();
        tags.insert("highway".to_string(), "footway".to_string());
        tags.insert("footway".to_string(), "crossing".to_string());
        let mut edge = GraphEdge::from_normalized(WayClass::Crossing, 1, 0, u, v, &tags);
        edge.geometry = Some(line);
        edge.ndref = None;
        (u, edge)
    }

    #[test]
    fn test_infer_curbramps_marks_nearby_kerb() {
        let mut g = OsmGraph::new();
        g.upsert_node(OsmNodeId(1), -122.33, 47.6);
        g.upsert_node(OsmNodeId(2), -122.3301, 47.6);
        g.upsert_node(OsmNodeId(3), -122.33, 47.6);
        g.node_mut(OsmNodeId(3)).unwrap().kerb = Some("flush".to_string());

        let line = geo::LineString::from(vec![(-122.33, 47.6), (-122.3301, 47.6)]);
        let (u, edge) = crossing_edge(OsmNodeId(1), OsmNodeId(2), line);
        g.add_edge(u, edge);

        infer_curbramps(&mut g, 3.0).unwrap();
        let edge = g.get_edge(OsmNodeId(1), OsmNodeId(2)).unwrap();
        assert_eq!(edge.curbramps, Some(1));
    }

    #[test]
    fn test_infer_curbramps_no_kerb_nodes_sets_zero() {
        let mut g = OsmGraph::new();
        g.upsert_node(OsmNodeId(1), -122.33, 47.6);
        g.upsert_node(OsmNodeId(2), -122.3301, 47.6);
        let line = geo::LineString::from(vec![(-122.33, 47.6), (-122.3301, 47.6)]);
        let (u, edge) = crossing_edge(OsmNodeId(1), OsmNodeId(2), line);
        g.add_edge(u, edge);

        infer_curbramps(&mut g, 3.0).unwrap();
        let edge = g.get_edge(OsmNodeId(1), OsmNodeId(2)).unwrap();
        assert_eq!(edge.curbramps, Some(0));
    }
}
