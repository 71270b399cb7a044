use geo::Point;
use serde::{Deserialize, Serialize};

/// attributes carried by a graph node. `lon`/`lat` are populated at ingest;
/// `geometry` is materialized by the geometry builder (C4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub lon: f64,
    pub lat: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Point<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kerb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tactile_surface: Option<String>,
}

impl GraphNode {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon,
            lat,
            geometry: None,
            kerb: None,
            tactile_surface: None,
        }
    }

    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// true iff this node's kerb value is in the accessible set used by the
    /// curb-ramp inferrer (flush, lowered) -- distinct from the broader
    /// retained set (flush, lowered, rolled, raised) used to decide
    /// retention during normalization.
    pub fn is_accessible_kerb(&self) -> bool {
        matches!(self.kerb.as_deref(), Some("flush") | Some("lowered"))
    }
}
