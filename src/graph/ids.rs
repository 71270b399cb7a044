use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// a 64-bit OSM node identifier.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Deserialize, Serialize, Hash,
)]
pub struct OsmNodeId(pub i64);

impl Display for OsmNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OsmNodeId {
    fn from(value: i64) -> Self {
        OsmNodeId(value)
    }
}

/// a 64-bit OSM way identifier.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Deserialize, Serialize, Hash,
)]
pub struct OsmWayId(pub i64);

impl Display for OsmWayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OsmWayId {
    fn from(value: i64) -> Self {
        OsmWayId(value)
    }
}
