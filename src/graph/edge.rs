use super::OsmNodeId;
use crate::model::{RawTags, WayClass};
use geo::LineString;
use serde::{Deserialize, Serialize};

/// attributes carried by a graph edge. during ingest/simplification `ndref`
/// holds the ordered node chain the edge traverses; the geometry builder
/// (C4) consumes `ndref` to materialize `geometry`/`length` and discards it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    /// the node this edge points to (the source is implicit: the key this
    /// edge is stored under in the adjacency map).
    pub target: OsmNodeId,
    pub way_class: WayClass,
    pub highway: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incline: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevator: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curbramps: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossings_mapped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidewalks_mapped: Option<bool>,

    /// identity fields used only up through simplification/geometry; dropped
    /// from the persisted form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osm_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndref: Option<Vec<OsmNodeId>>,

    /// post-processing fields, populated by C4/C6/C7.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<LineString<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
}

impl GraphEdge {
    /// builds a fresh single-segment edge from a normalized way tag set, the
    /// way's osm id, this segment's index within the way, and the two node
    /// refs it spans.
    pub fn from_normalized(
        way_class: WayClass,
        osm_id: i64,
        segment: usize,
        u: OsmNodeId,
        v: OsmNodeId,
        tags: &RawTags,
    ) -> Self {
        let highway = tags
            .get("highway")
            .cloned()
            .unwrap_or_else(|| "footway".to_string());
        let width = tags.get("width").and_then(|s| s.parse::<f64>().ok());
        let incline = tags.get("incline").and_then(|s| s.parse::<f64>().ok());
        let elevator = tags.get("elevator").map(|v| is_truthy(v));
        GraphEdge {
            target: v,
            way_class,
            highway,
            footway: tags.get("footway").cloned(),
            crossing: tags.get("crossing").cloned(),
            width,
            incline,
            opening_hours: tags.get("opening_hours").cloned(),
            elevator,
            curbramps: None,
            bridge: tags.get("bridge").cloned(),
            crossings_mapped: None,
            sidewalks_mapped: None,
            osm_id: Some(osm_id),
            segment: Some(segment),
            ndref: Some(vec![u, v]),
            geometry: None,
            length: None,
        }
    }

    pub fn is_crossing(&self) -> bool {
        self.highway == "footway" && self.footway.as_deref() == Some("crossing")
    }

    pub fn is_sidewalk(&self) -> bool {
        self.highway == "footway" && self.footway.as_deref() == Some("sidewalk")
    }
}

/// OSM boolean-ish tag convention: "yes"/"true"/"1" are truthy, anything else
/// (including unrecognized strings) is not.
fn is_truthy(v: &str) -> bool {
    matches!(v, "yes" | "true" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_normalized_parses_numeric_fields() {
        let mut tags = RawTags::new();
        tags.insert("highway".to_string(), "footway".to_string());
        tags.insert("footway".to_string(), "crossing".to_string());
        tags.insert("width".to_string(), "1.5".to_string());
        tags.insert("elevator".to_string(), "yes".to_string());

        let e = GraphEdge::from_normalized(
            WayClass::Crossing,
            100,
            0,
            OsmNodeId(1),
            OsmNodeId(2),
            &tags,
        );
        assert_eq!(e.width, Some(1.5));
        assert_eq!(e.elevator, Some(true));
        assert!(e.is_crossing());
        assert_eq!(e.ndref, Some(vec![OsmNodeId(1), OsmNodeId(2)]));
    }
}
