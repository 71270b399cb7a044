//! marks DEM pixels beneath building/bridge footprints as nodata. grounded
//! on `mask_dem.mask_polygon`, adapted from rasterio's window + paired
//! read/write-mask calls to `gdal`'s windowed `RasterBand` read/write (this
//! crate represents "nodata" by overwriting pixel values with the band's
//! nodata sentinel, since `gdal-rs` does not expose rasterio's separate
//! mask-band abstraction).

use crate::model::PipelineError;
use gdal::raster::Buffer;
use gdal::{Dataset, DatasetOptions, GdalOpenFlags, GeoTransformEx};
use geo::{Coord, Distance, Euclidean, LineString, Point, Polygon};
use std::path::Path;

fn open_for_update(tile_path: &str) -> Result<Dataset, PipelineError> {
    Dataset::open_ex(
        Path::new(tile_path),
        DatasetOptions {
            open_flags: GdalOpenFlags::GDAL_OF_UPDATE | GdalOpenFlags::GDAL_OF_RASTER,
            ..Default::default()
        },
    )
    .map_err(|e| PipelineError::CorruptInput(format!("{tile_path}: {e}")))
}

/// applies every polygon's mask to the DEM at `tile_path`, returning the
/// number of pixels newly marked nodata.
pub fn apply_masks(tile_path: &str, polygons: &[Polygon<f64>]) -> Result<usize, PipelineError> {
    let dataset = open_for_update(tile_path)?;
    let geo_transform = dataset
        .geo_transform()
        .map_err(|e| PipelineError::CorruptInput(format!("{tile_path}: missing geotransform: {e}")))?;
    let inverse = geo_transform
        .invert()
        .map_err(|e| PipelineError::CorruptInput(format!("{tile_path}: uninvertible geotransform: {e}")))?;
    let (width, height) = dataset.raster_size();
    let band = dataset
        .rasterband(1)
        .map_err(|e| PipelineError::CorruptInput(format!("{tile_path}: {e}")))?;
    let nodata = band.no_data_value().unwrap_or(f64::NAN);

    let mut masked_count = 0;
    for polygon in polygons {
        masked_count += mask_polygon(&band, &inverse, width, height, polygon, nodata)?;
    }
    Ok(masked_count)
}

fn to_pixel_space(polygon: &Polygon<f64>, inverse: &gdal::GeoTransform) -> Polygon<f64> {
    let ring_to_pixels = |ring: &LineString<f64>| -> LineString<f64> {
        LineString::new(
            ring.0
                .iter()
                .map(|c| {
                    let (px, py) = inverse.apply(c.x, c.y);
                    Coord { x: px, y: py }
                })
                .collect(),
        )
    };
    let exterior = ring_to_pixels(polygon.exterior());
    let interiors = polygon.interiors().iter().map(ring_to_pixels).collect();
    Polygon::new(exterior, interiors)
}

fn mask_polygon(
    band: &gdal::raster::RasterBand,
    inverse: &gdal::GeoTransform,
    width: usize,
    height: usize,
    polygon: &Polygon<f64>,
    nodata: f64,
) -> Result<usize, PipelineError> {
    let pixel_polygon = to_pixel_space(polygon, inverse);
    let bounds = match pixel_bounds(&pixel_polygon) {
        Some(b) => b,
        None => return Ok(0),
    };

    let (minx, miny, maxx, maxy) = bounds;
    if maxx <= 0 || maxy <= 0 || minx >= width as i64 || miny >= height as i64 {
        return Ok(0);
    }
    let minx = minx.max(0) as usize;
    let miny = miny.max(0) as usize;
    let maxx = (maxx as usize).min(width);
    let maxy = (maxy as usize).min(height);
    if maxx <= minx || maxy <= miny {
        return Ok(0);
    }

    let dx = maxx - minx;
    let dy = maxy - miny;

    let mut buffer: Buffer<f64> = read_window(band, minx, miny, dx, dy)?;
    let mut changed = 0;
    for row in 0..dy {
        for col in 0..dx {
            let px = (minx + col) as f64 + 0.5;
            let py = (miny + row) as f64 + 0.5;
            let point = Point::new(px, py);
            if Euclidean.distance(&point, &pixel_polygon) == 0.0 {
                let idx = row * dx + col;
                if buffer.data[idx] != nodata {
                    buffer.data[idx] = nodata;
                    changed += 1;
                }
            }
        }
    }
    if changed > 0 {
        write_window(band, minx, miny, dx, dy, &buffer)?;
    }
    Ok(changed)
}

fn pixel_bounds(polygon: &Polygon<f64>) -> Option<(i64, i64, i64, i64)> {
    let mut minx = f64::INFINITY;
    let mut miny = f64::INFINITY;
    let mut maxx = f64::NEG_INFINITY;
    let mut maxy = f64::NEG_INFINITY;
    for c in polygon.exterior().0.iter() {
        minx = minx.min(c.x);
        miny = miny.min(c.y);
        maxx = maxx.max(c.x);
        maxy = maxy.max(c.y);
    }
    if !minx.is_finite() {
        return None;
    }
    Some((
        minx.floor() as i64,
        miny.floor() as i64,
        maxx.floor() as i64 + 1,
        maxy.floor() as i64 + 1,
    ))
}

fn read_window(
    band: &gdal::raster::RasterBand,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
) -> Result<Buffer<f64>, PipelineError> {
    band.read_as::<f64>((x as isize, y as isize), (w, h), (w, h), None)
        .map_err(|e| PipelineError::CorruptInput(format!("windowed raster read failed: {e}")))
}

fn write_window(
    band: &gdal::raster::RasterBand,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    buffer: &Buffer<f64>,
) -> Result<(), PipelineError> {
    band.write((x as isize, y as isize), (w, h), buffer)
        .map_err(|e| PipelineError::CorruptInput(format!("windowed raster write failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_pixel_bounds_rounds_outward() {
        let poly = polygon![(x: 1.2, y: 2.2), (x: 4.8, y: 2.2), (x: 4.8, y: 5.8), (x: 1.2, y: 5.8)];
        let bounds = pixel_bounds(&poly).unwrap();
        assert_eq!(bounds, (1, 2, 5, 6));
    }
}
