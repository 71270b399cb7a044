//! converts a bridge linestring from WGS84 into a local UTM zone, buffers
//! it, and converts the buffered polygon back to WGS84. grounded on the
//! "Bridge buffering" rule in the DEM mask engine design and on the UTM
//! selection + `proj4rs::transform` idiom used for edge-length metrics in
//! the broader example pack.

use crate::model::PipelineError;
use geo::{Coord, LineString, MultiPolygon};
use proj4rs::proj::Proj;

/// the UTM EPSG code (32600+zone north, 32700+zone south) for the zone
/// containing `(lon, lat)`.
pub fn utm_epsg_code(lon: f64, lat: f64) -> u16 {
    let zone = (((lon + 180.0) / 6.0).floor() as i64).rem_euclid(60) + 1;
    let base = if lat >= 0.0 { 32600 } else { 32700 };
    base + zone as u16
}

fn geographic_proj() -> Result<Proj, PipelineError> {
    Proj::from_epsg_code(4326)
        .map_err(|e| PipelineError::InvalidGeometry(format!("failure loading EPSG:4326: {e}")))
}

fn utm_proj(epsg: u16) -> Result<Proj, PipelineError> {
    Proj::from_epsg_code(epsg)
        .map_err(|e| PipelineError::InvalidGeometry(format!("failure loading EPSG:{epsg}: {e}")))
}

fn to_utm(lon: f64, lat: f64, epsg: u16) -> Result<(f64, f64), PipelineError> {
    let src = geographic_proj()?;
    let dst = utm_proj(epsg)?;
    let mut point = (lon.to_radians(), lat.to_radians());
    proj4rs::transform::transform(&src, &dst, &mut point)
        .map_err(|e| PipelineError::InvalidGeometry(format!("projection failure: {e}")))?;
    Ok(point)
}

fn from_utm(x: f64, y: f64, epsg: u16) -> Result<(f64, f64), PipelineError> {
    let src = utm_proj(epsg)?;
    let dst = geographic_proj()?;
    let mut point = (x, y);
    proj4rs::transform::transform(&src, &dst, &mut point)
        .map_err(|e| PipelineError::InvalidGeometry(format!("projection failure: {e}")))?;
    Ok((point.0.to_degrees(), point.1.to_degrees()))
}

/// buffers `line` (WGS84 degrees) by `distance_m` meters, via the UTM zone
/// of its first coordinate, returning the result back in WGS84.
pub fn buffer_bridge(line: &LineString<f64>, distance_m: f64) -> Result<MultiPolygon<f64>, PipelineError> {
    let first = line
        .0
        .first()
        .ok_or_else(|| PipelineError::InvalidGeometry("bridge linestring has no coordinates".to_string()))?;
    let epsg = utm_epsg_code(first.x, first.y);

    let utm_coords: Result<Vec<Coord<f64>>, PipelineError> = line
        .0
        .iter()
        .map(|c| to_utm(c.x, c.y, epsg).map(|(x, y)| Coord { x, y }))
        .collect();
    let utm_line = LineString::new(utm_coords?);

    let buffered = geo_buffer::buffer_linestring(&utm_line, distance_m);

    let wgs84_polygons = buffered
        .0
        .into_iter()
        .map(|poly| {
            let (exterior, interiors) = poly.into_inner();
            let ext_coords: Result<Vec<Coord<f64>>, PipelineError> = exterior
                .0
                .iter()
                .map(|c| from_utm(c.x, c.y, epsg).map(|(x, y)| Coord { x, y }))
                .collect();
            let interiors: Result<Vec<LineString<f64>>, PipelineError> = interiors
                .into_iter()
                .map(|ring| {
                    let coords: Result<Vec<Coord<f64>>, PipelineError> = ring
                        .0
                        .iter()
                        .map(|c| from_utm(c.x, c.y, epsg).map(|(x, y)| Coord { x, y }))
                        .collect();
                    coords.map(LineString::new)
                })
                .collect();
            Ok(geo::Polygon::new(LineString::new(ext_coords?), interiors?))
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    Ok(MultiPolygon::new(wgs84_polygons))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utm_zone_seattle_is_north() {
        assert_eq!(utm_epsg_code(-122.33, 47.6), 32610);
    }

    #[test]
    fn test_utm_zone_sydney_is_south() {
        assert_eq!(utm_epsg_code(151.2, -33.9), 32756);
    }

    #[test]
    fn test_utm_zone_wraps_at_antimeridian() {
        assert_eq!(utm_epsg_code(179.9, 10.0), 32660);
        assert_eq!(utm_epsg_code(-179.9, 10.0), 32601);
    }
}
