//! extracts building and bridge footprints directly from a PBF file for
//! DEM masking. Grounded on `mask_dem.BuildingHandler`/`BuildingCounter`;
//! this implementation handles the closed-way case directly (the common
//! case for NED-tile-sized regions) rather than depending on an
//! osmium-style area assembler for multipolygon relations.

use crate::model::{PipelineError, StageSummary};
use geo::{LineString, Polygon};
use osmpbf::{Element, ElementReader};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Footprints {
    pub buildings: Vec<Polygon<f64>>,
    pub bridges: Vec<LineString<f64>>,
}

/// true iff `v` is a recognized OSM truthy value for a boolean-ish tag.
fn is_truthy(v: &str) -> bool {
    v == "yes" || v == "true" || v == "1"
}

pub fn extract(pbf_path: &str) -> Result<(Footprints, StageSummary), PipelineError> {
    let mut summary = StageSummary::new();
    let mut locations: HashMap<i64, (f64, f64)> = HashMap::new();
    let mut buildings = Vec::new();
    let mut bridges = Vec::new();

    let path = Path::new(pbf_path);
    let reader = ElementReader::from_path(path)
        .map_err(|e| PipelineError::CorruptInput(format!("{pbf_path}: {e}")))?;

    reader
        .for_each(|el| match el {
            Element::Node(node) => {
                locations.insert(node.id(), (node.lon(), node.lat()));
            }
            Element::DenseNode(node) => {
                locations.insert(node.id(), (node.lon(), node.lat()));
            }
            Element::Way(way) => {
                let has_building = way.tags().any(|(k, _)| k == "building");
                let bridge_value = way.tags().find(|(k, _)| *k == "bridge").map(|(_, v)| v);
                let has_highway = way.tags().any(|(k, _)| k == "highway");

                let refs: Vec<i64> = way.refs().collect();
                if has_building {
                    if refs.first() != refs.last() || refs.len() < 4 {
                        summary.record("unclosed_building_way", format!("way {}", way.id()));
                        return;
                    }
                    match ring(&refs, &locations) {
                        Some(ring) => buildings.push(Polygon::new(ring, vec![])),
                        None => summary
                            .record("building_missing_node_location", format!("way {}", way.id())),
                    }
                } else if bridge_value.map(is_truthy).unwrap_or(false) && has_highway {
                    match linestring(&refs, &locations) {
                        Some(ls) => bridges.push(ls),
                        None => summary
                            .record("bridge_missing_node_location", format!("way {}", way.id())),
                    }
                }
            }
            Element::Relation(rel) => {
                let is_building = rel.tags().any(|(k, v)| k == "building" && !v.is_empty());
                if is_building {
                    summary.record("building_relation_unresolved", format!("relation {}", rel.id()));
                }
            }
        })
        .map_err(|e| PipelineError::CorruptInput(format!("{pbf_path}: {e}")))?;

    Ok((Footprints { buildings, bridges }, summary))
}

fn ring(refs: &[i64], locations: &HashMap<i64, (f64, f64)>) -> Option<LineString<f64>> {
    let coords: Option<Vec<(f64, f64)>> = refs.iter().map(|id| locations.get(id).copied()).collect();
    coords.map(LineString::from)
}

fn linestring(refs: &[i64], locations: &HashMap<i64, (f64, f64)>) -> Option<LineString<f64>> {
    ring(refs, locations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("yes"));
        assert!(is_truthy("1"));
        assert!(!is_truthy("no"));
    }

    #[test]
    fn test_extract_missing_file_is_corrupt_input() {
        let err = extract("/nonexistent/path/to.osm.pbf").unwrap_err();
        assert!(matches!(err, PipelineError::CorruptInput(_)));
    }
}
