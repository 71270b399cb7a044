use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// an unordered OSM tag mapping, as read off the wire. key/value are kept as
/// plain owned strings at the ingest boundary; the normalized subset below
/// is what survives into the graph.
pub type RawTags = HashMap<String, String>;

const ROAD_HIGHWAY_VALUES: [&str; 5] =
    ["primary", "secondary", "tertiary", "residential", "service"];

const KERB_VALUES: [&str; 4] = ["flush", "lowered", "rolled", "raised"];

const MARKED_CROSSING_VALUES: [&str; 4] =
    ["marked", "uncontrolled", "traffic_signals", "zebra"];

/// the four retained way classes. a way outside these is dropped, not an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WayClass {
    Sidewalk,
    Crossing,
    Footway,
    Road,
}

impl WayClass {
    pub fn classify(tags: &RawTags) -> Option<WayClass> {
        let highway = tags.get("highway").map(String::as_str).unwrap_or("");
        let footway = tags.get("footway").map(String::as_str).unwrap_or("");
        if highway == "footway" && footway == "sidewalk" {
            Some(WayClass::Sidewalk)
        } else if highway == "footway" && footway == "crossing" {
            Some(WayClass::Crossing)
        } else if highway == "footway" {
            Some(WayClass::Footway)
        } else if ROAD_HIGHWAY_VALUES.contains(&highway) {
            Some(WayClass::Road)
        } else {
            None
        }
    }
}

/// normalizes a raw way tag set into the canonical OpenSidewalks schema for
/// its class. mirrors `OSWWayNormalizer` in the original Python pipeline.
pub struct WayNormalizer<'a> {
    tags: &'a RawTags,
}

impl<'a> WayNormalizer<'a> {
    pub fn new(tags: &'a RawTags) -> Self {
        Self { tags }
    }

    /// returns `None` if the way does not fall into one of the four retained
    /// classes (the feature should be excluded from the graph, not treated
    /// as an error).
    pub fn normalize(&self) -> Option<RawTags> {
        match WayClass::classify(self.tags)? {
            WayClass::Footway => Some(self.normalize_footway_base()),
            WayClass::Sidewalk => {
                let mut t = self.normalize_footway_base();
                t.insert("footway".to_string(), "sidewalk".to_string());
                Some(t)
            }
            WayClass::Crossing => Some(self.normalize_crossing()),
            WayClass::Road => Some(self.normalize_road()),
        }
    }

    fn normalize_footway_base(&self) -> RawTags {
        let mut out = RawTags::new();
        out.insert("highway".to_string(), "footway".to_string());
        if let Some(w) = self.tags.get("width") {
            if let Ok(v) = w.parse::<f64>() {
                out.insert("width".to_string(), v.to_string());
            }
        }
        if let Some(i) = self.tags.get("incline") {
            if let Ok(v) = i.parse::<f64>() {
                out.insert("incline".to_string(), v.to_string());
            }
        }
        self.carry_ambient_tags(&mut out);
        out
    }

    /// tags that are part of the retained schema but are not touched by the
    /// per-class branching logic: they are copied through verbatim whenever
    /// present, for any class. `opening_hours`/`elevator` matter on footway
    /// edges that model an indoor elevator connection; `bridge` matters on
    /// any class since the DEM mask engine keys off it directly on ways.
    fn carry_ambient_tags(&self, out: &mut RawTags) {
        for key in ["opening_hours", "elevator", "bridge"] {
            if let Some(v) = self.tags.get(key) {
                out.insert(key.to_string(), v.clone());
            }
        }
    }

    fn normalize_crossing(&self) -> RawTags {
        let mut out = self.normalize_footway_base();
        out.insert("footway".to_string(), "crossing".to_string());
        if let Some(c) = self.tags.get("crossing") {
            if MARKED_CROSSING_VALUES.contains(&c.as_str()) {
                out.insert("crossing".to_string(), "marked".to_string());
            } else if c == "unmarked" {
                out.insert("crossing".to_string(), "unmarked".to_string());
            }
        }
        out
    }

    fn normalize_road(&self) -> RawTags {
        let mut out = RawTags::new();
        // classify() guarantees this key exists and is in ROAD_HIGHWAY_VALUES
        if let Some(h) = self.tags.get("highway") {
            out.insert("highway".to_string(), h.clone());
        }
        if let Some(w) = self.tags.get("width") {
            if let Ok(v) = w.parse::<f64>() {
                out.insert("width".to_string(), v.to_string());
            }
        }
        self.carry_ambient_tags(&mut out);
        out
    }
}

/// true iff this way's tags pass classification; used as the PBF way filter
/// during ingest.
pub fn way_filter(tags: &RawTags) -> bool {
    WayClass::classify(tags).is_some()
}

/// normalizes a raw node tag set, retaining only kerb-relevant attributes.
/// mirrors `OSWNodeNormalizer`.
pub struct NodeNormalizer<'a> {
    tags: &'a RawTags,
}

impl<'a> NodeNormalizer<'a> {
    pub fn new(tags: &'a RawTags) -> Self {
        Self { tags }
    }

    pub fn is_kerb(&self) -> bool {
        self.tags
            .get("kerb")
            .map(|v| KERB_VALUES.contains(&v.as_str()))
            .unwrap_or(false)
    }

    /// returns `None` if this node has no retainable kerb tag.
    pub fn normalize(&self) -> Option<RawTags> {
        if !self.is_kerb() {
            return None;
        }
        let mut out = RawTags::new();
        if let Some(k) = self.tags.get("kerb") {
            out.insert("kerb".to_string(), k.clone());
        }
        if let Some(t) = self.tags.get("tactile_surface") {
            out.insert("tactile_surface".to_string(), t.clone());
        }
        out
    }
}

/// true iff this node passes the kerb filter; used as the PBF node filter
/// during ingest pass 2.
pub fn node_filter(tags: &RawTags) -> bool {
    NodeNormalizer::new(tags).is_kerb()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> RawTags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_classify_sidewalk() {
        let t = tags(&[("highway", "footway"), ("footway", "sidewalk")]);
        assert_eq!(WayClass::classify(&t), Some(WayClass::Sidewalk));
    }

    #[test]
    fn test_classify_road() {
        let t = tags(&[("highway", "residential")]);
        assert_eq!(WayClass::classify(&t), Some(WayClass::Road));
    }

    #[test]
    fn test_classify_rejects_unknown_highway() {
        let t = tags(&[("highway", "motorway")]);
        assert_eq!(WayClass::classify(&t), None);
    }

    #[test]
    fn test_normalize_crossing_marked() {
        let t = tags(&[
            ("highway", "footway"),
            ("footway", "crossing"),
            ("crossing", "zebra"),
        ]);
        let n = WayNormalizer::new(&t).normalize().unwrap();
        assert_eq!(n.get("crossing").map(String::as_str), Some("marked"));
        assert_eq!(n.get("footway").map(String::as_str), Some("crossing"));
    }

    #[test]
    fn test_normalize_crossing_unmarked() {
        let t = tags(&[
            ("highway", "footway"),
            ("footway", "crossing"),
            ("crossing", "unmarked"),
        ]);
        let n = WayNormalizer::new(&t).normalize().unwrap();
        assert_eq!(n.get("crossing").map(String::as_str), Some("unmarked"));
    }

    #[test]
    fn test_normalize_crossing_unknown_value_omitted() {
        let t = tags(&[
            ("highway", "footway"),
            ("footway", "crossing"),
            ("crossing", "island"),
        ]);
        let n = WayNormalizer::new(&t).normalize().unwrap();
        assert!(!n.contains_key("crossing"));
    }

    #[test]
    fn test_unparsable_width_dropped_silently() {
        let t = tags(&[("highway", "footway"), ("footway", "sidewalk"), ("width", "wide")]);
        let n = WayNormalizer::new(&t).normalize().unwrap();
        assert!(!n.contains_key("width"));
    }

    #[test]
    fn test_normalize_road_keeps_width() {
        let t = tags(&[("highway", "service"), ("width", "3.5")]);
        let n = WayNormalizer::new(&t).normalize().unwrap();
        assert_eq!(n.get("highway").map(String::as_str), Some("service"));
        assert_eq!(n.get("width").map(String::as_str), Some("3.5"));
    }

    #[test]
    fn test_node_normalize_drops_barrier_keeps_kerb() {
        let t = tags(&[("kerb", "flush"), ("barrier", "kerb"), ("tactile_surface", "yes")]);
        let n = NodeNormalizer::new(&t).normalize().unwrap();
        assert!(!n.contains_key("barrier"));
        assert_eq!(n.get("kerb").map(String::as_str), Some("flush"));
        assert_eq!(n.get("tactile_surface").map(String::as_str), Some("yes"));
    }

    #[test]
    fn test_ambient_tags_carried_through_footway() {
        let t = tags(&[
            ("highway", "footway"),
            ("elevator", "yes"),
            ("opening_hours", "Mo-Fr 08:00-18:00"),
        ]);
        let n = WayNormalizer::new(&t).normalize().unwrap();
        assert_eq!(n.get("elevator").map(String::as_str), Some("yes"));
        assert_eq!(
            n.get("opening_hours").map(String::as_str),
            Some("Mo-Fr 08:00-18:00")
        );
    }

    #[test]
    fn test_node_normalize_rejects_non_kerb() {
        let t = tags(&[("amenity", "bench")]);
        assert!(NodeNormalizer::new(&t).normalize().is_none());
    }
}
