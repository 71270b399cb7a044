pub mod edge;
pub mod geojson_io;
pub mod ids;
pub mod node;
pub mod osm_graph;

pub use edge::GraphEdge;
pub use ids::{OsmNodeId, OsmWayId};
pub use node::GraphNode;
pub use osm_graph::OsmGraph;
