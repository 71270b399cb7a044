//! Tobler-based edge cost function evaluated at query time by a downstream
//! router. grounded on the incline-penalty shape used throughout the
//! example pack's routing cost functions, and on `opening_hours`'s
//! expression parsing (see `bambam-omf`'s `during_expression`) for
//! elevator gating.

use crate::graph::GraphEdge;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::America::Los_Angeles;

/// Tobler's optimum downhill grade: the incline at which walking speed is
/// maximized, per the hiking-function literature this cost model follows.
pub const INCLINE_IDEAL: f64 = -0.0087;
/// sets the curvature of the incline penalty around `INCLINE_IDEAL`.
pub const DIVISOR: f64 = 5.0;

/// per-request preferences the cost function is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct CostRequest {
    pub base_speed_mps: f64,
    pub downhill_max: f64,
    pub uphill_max: f64,
    pub avoid_curbs: bool,
    /// milliseconds since epoch; `None` means "now" is left to the caller
    /// (evaluated eagerly into a `DateTime<Utc>` before calling `evaluate`).
    pub timestamp_ms: Option<i64>,
    pub street_avoidance: f64,
}

impl CostRequest {
    pub fn pedestrian_default() -> Self {
        Self {
            base_speed_mps: 1.3,
            downhill_max: 0.1,
            uphill_max: 0.1,
            avoid_curbs: false,
            timestamp_ms: None,
            street_avoidance: 0.0,
        }
    }

    pub fn wheelchair_default() -> Self {
        Self {
            base_speed_mps: 0.6,
            avoid_curbs: true,
            ..Self::pedestrian_default()
        }
    }

    pub fn powered_default() -> Self {
        Self {
            base_speed_mps: 2.0,
            ..Self::pedestrian_default()
        }
    }

    fn request_time(&self) -> DateTime<chrono_tz::Tz> {
        let utc = match self.timestamp_ms {
            Some(ms) => Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now),
            None => Utc::now(),
        };
        utc.with_timezone(&Los_Angeles)
    }
}

/// `k_up`/`k_down` are both `ln(5) / |grade - INCLINE_IDEAL|`, evaluated at
/// `uphill_max` and `-downhill_max` respectively.
fn k_for_grade(grade: f64) -> f64 {
    DIVISOR.ln() / (grade - INCLINE_IDEAL).abs()
}

/// true iff `expr` (an opening_hours syntax string) evaluates to "closed"
/// at `at`. malformed or unparseable expressions are treated as open, per
/// the gating rule.
fn is_closed_at(expr: &str, at: DateTime<chrono_tz::Tz>) -> bool {
    match opening_hours::OpeningHours::parse(expr) {
        Ok(oh) => oh.is_closed(at.naive_local()),
        Err(_) => false,
    }
}

/// evaluates the cost of traversing `edge` under `request`. `None` signals
/// an infinite cost (the edge is excluded from the candidate set).
pub fn evaluate(edge: &GraphEdge, request: &CostRequest) -> Option<f64> {
    let mut time = 0.0;
    let mut speed = request.base_speed_mps;
    let mut street_factor = 1.0;

    if edge.highway == "footway" {
        if edge.is_crossing() {
            let has_ramp = matches!(edge.curbramps, Some(1));
            if request.avoid_curbs && !has_ramp {
                return None;
            }
            time += 30.0;
        } else if edge.elevator.unwrap_or(false) {
            time += 45.0;
            if let Some(expr) = &edge.opening_hours {
                if is_closed_at(expr, request.request_time()) {
                    return None;
                }
            }
        }
    } else if matches!(
        edge.highway.as_str(),
        "secondary" | "tertiary" | "residential" | "service" | "pedestrian"
    ) {
        street_factor = match edge.highway.as_str() {
            "pedestrian" => 1.0,
            "service" => (2.0 * request.street_avoidance).exp(),
            "residential" => (3.0 * request.street_avoidance).exp(),
            _ => (4.0 * request.street_avoidance).exp(),
        };
        if request.street_avoidance >= 1.0 {
            return None;
        }
    } else {
        return None;
    }

    if let Some(incline) = edge.incline {
        let length = edge.length.unwrap_or(0.0);
        if length > 3.0 && (incline > request.uphill_max || incline < -request.downhill_max) {
            return None;
        }
        let k = if incline > INCLINE_IDEAL {
            k_for_grade(request.uphill_max)
        } else {
            k_for_grade(-request.downhill_max)
        };
        speed = request.base_speed_mps * (-k * (incline - INCLINE_IDEAL).abs()).exp();
    }

    if speed == 0.0 {
        return None;
    }

    let length = edge.length.unwrap_or(0.0);
    time += length / speed;
    Some(street_factor * time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::OsmNodeId;
    use crate::model::{RawTags, WayClass};

    fn footway_edge(length: f64) -> GraphEdge {
        let mut tags = RawTags::new();
        tags.insert("highway".to_string(), "footway".to_string());
        tags.insert("footway".to_string(), "sidewalk".to_string());
        let mut e = GraphEdge::from_normalized(WayClass::Sidewalk, 1, 0, OsmNodeId(1), OsmNodeId(2), &tags);
        e.length = Some(length);
        e
    }

    #[test]
    fn test_flat_sidewalk_cost_is_length_over_base_speed() {
        let edge = footway_edge(100.0);
        let request = CostRequest::pedestrian_default();
        let cost = evaluate(&edge, &request).unwrap();
        assert!((cost - 100.0 / 1.3).abs() < 1e-6);
    }

    #[test]
    fn test_crossing_without_ramp_excluded_when_avoiding_curbs() {
        let mut tags = RawTags::new();
        tags.insert("highway".to_string(), "footway".to_string());
        tags.insert("footway".to_string(), "crossing".to_string());
        let mut edge = GraphEdge::from_normalized(WayClass::Crossing, 1, 0, OsmNodeId(1), OsmNodeId(2), &tags);
        edge.length = Some(5.0);
        edge.curbramps = Some(0);

        let request = CostRequest::wheelchair_default();
        assert!(evaluate(&edge, &request).is_none());
    }

    #[test]
    fn test_steep_incline_beyond_max_excluded() {
        let mut edge = footway_edge(50.0);
        edge.incline = Some(0.25);
        let request = CostRequest::pedestrian_default();
        assert!(evaluate(&edge, &request).is_none());
    }

    #[test]
    fn test_unknown_highway_excluded() {
        let mut edge = footway_edge(10.0);
        edge.highway = "motorway".to_string();
        let request = CostRequest::pedestrian_default();
        assert!(evaluate(&edge, &request).is_none());
    }

    #[test]
    fn test_street_avoidance_at_max_excludes_roads() {
        let mut edge = footway_edge(10.0);
        edge.highway = "residential".to_string();
        let mut request = CostRequest::pedestrian_default();
        request.street_avoidance = 1.0;
        assert!(evaluate(&edge, &request).is_none());
    }
}
