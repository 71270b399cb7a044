//! streams an OSM PBF extract into an [`OsmGraph`], in the two passes
//! described by the component design: a way pass that builds single-segment
//! edges (and captures node coordinates along the way, since coordinates
//! precede their referencing ways in standard PBF block order), then a node
//! pass that merges retained node tags (kerbs) into nodes already present in
//! the graph. Grounded on the teacher's `import_ops::read_pbf`, trimmed down
//! to this pipeline's simpler single-multigraph output instead of the
//! teacher's routing-oriented adjacency lists.

use crate::graph::{GraphEdge, OsmGraph, OsmNodeId};
use crate::model::{way_filter, NodeNormalizer, PipelineError, RawTags, StageSummary, WayClass, WayNormalizer};
use osmpbf::{Element, ElementReader};
use std::collections::HashMap;
use std::path::Path;

/// raw element counts across a PBF file, used to size progress reporting
/// before the real ingest passes begin.
#[derive(Debug, Default, Clone, Copy)]
pub struct ElementCounts {
    pub nodes: u64,
    pub ways: u64,
    pub relations: u64,
}

/// a single forward streaming pass purely to tally element kinds. pure and
/// local (no network), so unlike the tile fetch it is implemented here even
/// though it is not strictly required by any downstream stage.
pub fn count_elements(pbf_path: &str) -> Result<ElementCounts, PipelineError> {
    let reader = open_reader(pbf_path)?;
    let mut counts = ElementCounts::default();
    reader
        .for_each(|el| match el {
            Element::Node(_) | Element::DenseNode(_) => counts.nodes += 1,
            Element::Way(_) => counts.ways += 1,
            Element::Relation(_) => counts.relations += 1,
        })
        .map_err(|e| PipelineError::CorruptInput(format!("{pbf_path}: {e}")))?;
    Ok(counts)
}

fn open_reader(pbf_path: &str) -> Result<ElementReader<std::io::BufReader<std::fs::File>>, PipelineError> {
    let path = Path::new(pbf_path);
    if !path.exists() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{pbf_path}: no such file"),
        )));
    }
    ElementReader::from_path(path)
        .map_err(|e| PipelineError::CorruptInput(format!("{pbf_path}: {e}")))
}

/// builds the graph from `pbf_path`. fatal on a corrupt or unreadable file;
/// node refs that resolve to no cached location (nodes outside the extract's
/// bbox) are a non-fatal skip recorded in the returned summary.
pub fn build_graph(pbf_path: &str) -> Result<(OsmGraph, StageSummary), PipelineError> {
    let mut summary = StageSummary::new();
    let mut graph = OsmGraph::new();

    log::info!("ingest: pass 1 (ways) over {pbf_path}");
    let locations = ingest_ways(pbf_path, &mut graph, &mut summary)?;

    log::info!("ingest: pass 2 (nodes) over {pbf_path}");
    ingest_node_tags(pbf_path, &mut graph)?;

    log::info!(
        "ingest: {} nodes, {} edges ({} cached locations)",
        graph.node_count(),
        graph.edge_count(),
        locations.len()
    );

    Ok((graph, summary))
}

fn ingest_ways(
    pbf_path: &str,
    graph: &mut OsmGraph,
    summary: &mut StageSummary,
) -> Result<HashMap<i64, (f64, f64)>, PipelineError> {
    let reader = open_reader(pbf_path)?;
    let mut locations: HashMap<i64, (f64, f64)> = HashMap::new();

    reader
        .for_each(|el| match el {
            Element::Node(node) => {
                locations.insert(node.id(), (node.lon(), node.lat()));
            }
            Element::DenseNode(node) => {
                locations.insert(node.id(), (node.lon(), node.lat()));
            }
            Element::Way(way) => {
                let tags: RawTags = way
                    .tags()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                if !way_filter(&tags) {
                    return;
                }
                let way_class = match WayClass::classify(&tags) {
                    Some(c) => c,
                    None => return,
                };
                let normalized = match WayNormalizer::new(&tags).normalize() {
                    Some(t) => t,
                    None => return,
                };
                let refs: Vec<i64> = way.refs().collect();
                for (segment, window) in refs.windows(2).enumerate() {
                    let (u_id, v_id) = (window[0], window[1]);
                    let (Some(&(u_lon, u_lat)), Some(&(v_lon, v_lat))) =
                        (locations.get(&u_id), locations.get(&v_id))
                    else {
                        summary.record(
                            "missing_node_location",
                            format!("way {} segment {}", way.id(), segment),
                        );
                        continue;
                    };
                    let u = OsmNodeId(u_id);
                    let v = OsmNodeId(v_id);
                    graph.upsert_node(u, u_lon, u_lat);
                    graph.upsert_node(v, v_lon, v_lat);
                    let edge = GraphEdge::from_normalized(way_class, way.id(), segment, u, v, &normalized);
                    graph.add_edge(u, edge);
                }
            }
            Element::Relation(_) => {}
        })
        .map_err(|e| PipelineError::CorruptInput(format!("{pbf_path}: {e}")))?;

    Ok(locations)
}

fn ingest_node_tags(pbf_path: &str, graph: &mut OsmGraph) -> Result<(), PipelineError> {
    let reader = open_reader(pbf_path)?;
    reader
        .for_each(|el| {
            let (id, tags): (i64, RawTags) = match el {
                Element::Node(node) => (
                    node.id(),
                    node.tags().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                ),
                Element::DenseNode(node) => (
                    node.id(),
                    node.tags().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                ),
                _ => return,
            };
            let osm_id = OsmNodeId(id);
            if !graph.contains_node(osm_id) {
                return;
            }
            if let Some(normalized) = NodeNormalizer::new(&tags).normalize() {
                if let Some(n) = graph.node_mut(osm_id) {
                    n.kerb = normalized.get("kerb").cloned();
                    n.tactile_surface = normalized.get("tactile_surface").cloned();
                }
            }
        })
        .map_err(|e| PipelineError::CorruptInput(format!("{pbf_path}: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_elements_missing_file_is_io_error() {
        let err = count_elements("/nonexistent/path/to.osm.pbf").unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[test]
    fn test_build_graph_missing_file_is_io_error() {
        let err = build_graph("/nonexistent/path/to.osm.pbf").unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
