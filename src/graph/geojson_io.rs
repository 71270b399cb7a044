//! serialization of [`OsmGraph`] to/from the two-feature-collection GeoJSON
//! form described in the external interfaces section: `{id}.graph.nodes.geojson`
//! and `{id}.graph.edges.geojson`.

use super::{GraphEdge, GraphNode, OsmGraph, OsmNodeId};
use crate::model::{PipelineError, WayClass};
use geo::{Geometry as GeoGeometry, LineString, Point};
use geojson::{Feature, FeatureCollection, Value as GeoJsonValue};
use serde_json::{Map, Number, Value as JsonValue};

pub fn write_nodes(graph: &OsmGraph) -> FeatureCollection {
    let features = graph
        .nodes()
        .map(|(id, node)| node_feature(*id, node))
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn write_edges(graph: &OsmGraph) -> FeatureCollection {
    let features = graph
        .edges()
        .filter_map(|(u, edge)| edge_feature(u, edge))
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn node_feature(id: OsmNodeId, node: &GraphNode) -> Feature {
    let point = node.geometry.unwrap_or_else(|| node.point());
    let mut props = Map::new();
    props.insert("_id".to_string(), JsonValue::Number(id.0.into()));
    if let Some(kerb) = &node.kerb {
        props.insert("kerb".to_string(), JsonValue::String(kerb.clone()));
    }
    if let Some(ts) = &node.tactile_surface {
        props.insert(
            "tactile_surface".to_string(),
            JsonValue::String(ts.clone()),
        );
    }
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(GeoJsonValue::from(&GeoGeometry::Point(point)))),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

/// returns `None` if this edge has no materialized geometry yet (the
/// post-C4 pipeline always does; this simply guards against serializing a
/// half-built graph).
fn edge_feature(u: OsmNodeId, edge: &GraphEdge) -> Option<Feature> {
    let geometry = edge.geometry.clone()?;
    let length = edge.length?;
    let mut props = Map::new();
    props.insert("_u_id".to_string(), JsonValue::Number(u.0.into()));
    props.insert("_v_id".to_string(), JsonValue::Number(edge.target.0.into()));
    props.insert("highway".to_string(), JsonValue::String(edge.highway.clone()));
    props.insert(
        "length".to_string(),
        Number::from_f64(length)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
    );
    if let Some(footway) = &edge.footway {
        props.insert("footway".to_string(), JsonValue::String(footway.clone()));
    }
    if let Some(crossing) = &edge.crossing {
        props.insert("crossing".to_string(), JsonValue::String(crossing.clone()));
    }
    if let Some(width) = edge.width {
        props.insert(
            "width".to_string(),
            Number::from_f64(width).map(JsonValue::Number).unwrap_or(JsonValue::Null),
        );
    }
    if let Some(incline) = edge.incline {
        props.insert(
            "incline".to_string(),
            Number::from_f64(incline)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
        );
    }
    if let Some(curbramps) = edge.curbramps {
        props.insert("curbramps".to_string(), JsonValue::Number(curbramps.into()));
    }
    if let Some(oh) = &edge.opening_hours {
        props.insert("opening_hours".to_string(), JsonValue::String(oh.clone()));
    }
    if let Some(elevator) = edge.elevator {
        props.insert("elevator".to_string(), JsonValue::Bool(elevator));
    }
    if let Some(bridge) = &edge.bridge {
        props.insert("bridge".to_string(), JsonValue::String(bridge.clone()));
    }
    if let Some(mapped) = edge.crossings_mapped {
        props.insert("crossings_mapped".to_string(), JsonValue::Bool(mapped));
    }
    if let Some(mapped) = edge.sidewalks_mapped {
        props.insert("sidewalks_mapped".to_string(), JsonValue::Bool(mapped));
    }
    Some(Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(GeoJsonValue::from(&GeoGeometry::LineString(
            geometry,
        )))),
        id: None,
        properties: Some(props),
        foreign_members: None,
    })
}

/// rebuilds an [`OsmGraph`] from a previously-written pair of feature
/// collections. only the properties this crate writes are read back;
/// unrecognized properties are ignored.
pub fn read_graph(
    nodes_fc: &FeatureCollection,
    edges_fc: &FeatureCollection,
) -> Result<OsmGraph, PipelineError> {
    let mut graph = OsmGraph::new();

    for feature in &nodes_fc.features {
        let props = feature
            .properties
            .as_ref()
            .ok_or_else(|| PipelineError::GeoJsonError("node feature missing properties".into()))?;
        let id = read_i64(props, "_id")?;
        let geom = feature
            .geometry
            .as_ref()
            .ok_or_else(|| PipelineError::GeoJsonError("node feature missing geometry".into()))?;
        let geo_geom: GeoGeometry<f64> = geom
            .value
            .clone()
            .try_into()
            .map_err(|e| PipelineError::GeoJsonError(format!("invalid node geometry: {e:?}")))?;
        let point: Point<f64> = match geo_geom {
            GeoGeometry::Point(p) => p,
            other => {
                return Err(PipelineError::GeoJsonError(format!(
                    "expected Point geometry for node, got {other:?}"
                )))
            }
        };
        let mut node = GraphNode::new(point.x(), point.y());
        node.geometry = Some(point);
        node.kerb = props.get("kerb").and_then(|v| v.as_str()).map(String::from);
        node.tactile_surface = props
            .get("tactile_surface")
            .and_then(|v| v.as_str())
            .map(String::from);
        graph.upsert_node(OsmNodeId(id), point.x(), point.y());
        if let Some(n) = graph.node_mut(OsmNodeId(id)) {
            *n = node;
        }
    }

    for feature in &edges_fc.features {
        let props = feature
            .properties
            .as_ref()
            .ok_or_else(|| PipelineError::GeoJsonError("edge feature missing properties".into()))?;
        let u = OsmNodeId(read_i64(props, "_u_id")?);
        let v = OsmNodeId(read_i64(props, "_v_id")?);
        let geom = feature
            .geometry
            .as_ref()
            .ok_or_else(|| PipelineError::GeoJsonError("edge feature missing geometry".into()))?;
        let geo_geom: GeoGeometry<f64> = geom
            .value
            .clone()
            .try_into()
            .map_err(|e| PipelineError::GeoJsonError(format!("invalid edge geometry: {e:?}")))?;
        let linestring: LineString<f64> = match geo_geom {
            GeoGeometry::LineString(ls) => ls,
            other => {
                return Err(PipelineError::GeoJsonError(format!(
                    "expected LineString geometry for edge, got {other:?}"
                )))
            }
        };
        let highway = props
            .get("highway")
            .and_then(|v| v.as_str())
            .unwrap_or("footway")
            .to_string();
        let footway = props.get("footway").and_then(|v| v.as_str()).map(String::from);
        let way_class = if highway == "footway" {
            match footway.as_deref() {
                Some("sidewalk") => WayClass::Sidewalk,
                Some("crossing") => WayClass::Crossing,
                _ => WayClass::Footway,
            }
        } else {
            WayClass::Road
        };
        let length = props.get("length").and_then(|v| v.as_f64());
        let edge = GraphEdge {
            target: v,
            way_class,
            highway,
            footway,
            crossing: props.get("crossing").and_then(|v| v.as_str()).map(String::from),
            width: props.get("width").and_then(|v| v.as_f64()),
            incline: props.get("incline").and_then(|v| v.as_f64()),
            opening_hours: props
                .get("opening_hours")
                .and_then(|v| v.as_str())
                .map(String::from),
            elevator: props.get("elevator").and_then(|v| v.as_bool()),
            curbramps: props.get("curbramps").and_then(|v| v.as_u64()).map(|n| n as u8),
            bridge: props.get("bridge").and_then(|v| v.as_str()).map(String::from),
            crossings_mapped: props.get("crossings_mapped").and_then(|v| v.as_bool()),
            sidewalks_mapped: props.get("sidewalks_mapped").and_then(|v| v.as_bool()),
            osm_id: None,
            segment: None,
            ndref: None,
            geometry: Some(linestring),
            length,
        };
        graph.add_edge(u, edge);
    }

    Ok(graph)
}

fn read_i64(props: &Map<String, JsonValue>, key: &str) -> Result<i64, PipelineError> {
    props
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| PipelineError::GeoJsonError(format!("missing or non-integer '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::build_geometries;
    use crate::model::WayClass;

    fn sample_graph() -> OsmGraph {
        let mut g = OsmGraph::new();
        g.upsert_node(OsmNodeId(1), -122.0, 47.0);
        g.upsert_node(OsmNodeId(2), -122.001, 47.001);
        let mut tags = crate::model::RawTags::new();
        tags.insert("highway".to_string(), "footway".to_string());
        tags.insert("footway".to_string(), "sidewalk".to_string());
        let edge = GraphEdge::from_normalized(WayClass::Sidewalk, 10, 0, OsmNodeId(1), OsmNodeId(2), &tags);
        g.add_edge(OsmNodeId(1), edge);
        build_geometries(&mut g).unwrap();
        g
    }

    #[test]
    fn test_roundtrip() {
        let g = sample_graph();
        let nodes_fc = write_nodes(&g);
        let edges_fc = write_edges(&g);
        assert_eq!(nodes_fc.features.len(), 2);
        assert_eq!(edges_fc.features.len(), 1);

        let g2 = read_graph(&nodes_fc, &edges_fc).unwrap();
        assert_eq!(g2.node_count(), 2);
        assert_eq!(g2.edge_count(), 1);
        let edge = g2.get_edge(OsmNodeId(1), OsmNodeId(2)).unwrap();
        assert_eq!(edge.footway.as_deref(), Some("sidewalk"));
        assert!(edge.length.unwrap() > 0.0);
    }
}
