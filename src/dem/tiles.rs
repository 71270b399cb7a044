//! NED 1/3 arc-second tile naming and bounds lookup. Grounded on
//! `transforms.get_ned13_for_bounds`; the fetch step described alongside it
//! is out of scope, but the naming math is pure and local.

use std::collections::HashSet;

/// the set of valid NED 1/3 arc-second tile names, as parsed from the
/// upstream tile index JSON. construction of the set from that JSON is a
/// plain `serde_json` decode left to the caller (e.g. the CLI); this module
/// only consumes it.
pub type TileIndex = HashSet<String>;

/// tile naming convention: `n{N}w{WWW}` where the tile covers the 1-degree
/// square whose northeast corner sits at `(N degrees N, WWW degrees W)`.
pub fn tile_name(north: i32, west: i32) -> String {
    format!("n{north}w{west:03}")
}

/// every NED13 tile name (present in `index`) whose 1-degree square
/// intersects `bounds = [w, s, e, n]` (WGS84 degrees).
pub fn tiles_for_bounds(bounds: [f64; 4], index: &TileIndex) -> Vec<String> {
    let [w, s, e, n] = bounds;
    let north_min = s.floor() as i32;
    let north_max = n.ceil() as i32;
    let west_min = (-e).floor() as i32;
    let west_max = (-w).ceil() as i32;

    let mut tiles = Vec::new();
    for north in (north_min + 1)..=north_max {
        for west in (west_min + 1)..=west_max {
            let name = tile_name(north, west);
            if index.contains(&name) {
                tiles.push(name);
            }
        }
    }
    tiles
}

/// the NE-corner tile name covering `(lon, lat)`, regardless of whether it
/// is present in any index.
pub fn tile_name_for_point(lon: f64, lat: f64) -> String {
    let north = lat.ceil() as i32;
    let west = (-lon).ceil() as i32;
    tile_name(north, west)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_name_pads_west_degrees() {
        assert_eq!(tile_name(48, 123), "n48w123");
        assert_eq!(tile_name(48, 5), "n48w005");
    }

    #[test]
    fn test_tile_name_for_point_seattle() {
        // Seattle: approx (-122.33, 47.6) -> NE corner n48w123
        assert_eq!(tile_name_for_point(-122.33, 47.6), "n48w123");
    }

    #[test]
    fn test_tiles_for_bounds_filters_by_index() {
        let mut index = TileIndex::new();
        index.insert("n48w123".to_string());
        index.insert("n48w122".to_string());
        // n47w123 deliberately absent from the index
        let bounds = [-122.6, 47.2, -121.9, 47.9];
        let tiles = tiles_for_bounds(bounds, &index);
        assert!(tiles.contains(&"n48w123".to_string()));
        assert!(tiles.contains(&"n48w122".to_string()));
        assert!(!tiles.iter().any(|t| t == "n47w123"));
    }
}
