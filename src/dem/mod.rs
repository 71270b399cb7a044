pub mod bridge;
pub mod footprints;
pub mod interpolate;
pub mod mask;
pub mod tiles;

use crate::config::{InterpolationMethod, PipelineConfig};
use crate::graph::OsmGraph;
use crate::model::{PipelineError, StageSummary};
use gdal::Dataset;
use gdal::GeoTransformEx;
use interpolate::Window;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// applies building and bridge masks to every NED13 tile covering `region`,
/// given footprints already extracted from the source PBF. tiles are
/// disjoint files, so this parallelizes across `tiles` with `rayon` when
/// more than one is involved, per the concurrency design.
pub fn mask_tiles(
    tile_paths: &[String],
    footprints: &footprints::Footprints,
    config: &PipelineConfig,
) -> Result<StageSummary, PipelineError> {
    let buffered_bridges: Result<Vec<_>, PipelineError> = footprints
        .bridges
        .iter()
        .map(|b| bridge::buffer_bridge(b, config.bridge_buffer_m))
        .collect();
    let buffered_bridges = buffered_bridges?;

    let mut polygons = footprints.buildings.clone();
    for mp in &buffered_bridges {
        polygons.extend(mp.0.iter().cloned());
    }

    let results: Vec<Result<usize, PipelineError>> = if config.parallelize && tile_paths.len() > 1 {
        tile_paths
            .par_iter()
            .map(|path| mask::apply_masks(path, &polygons))
            .collect()
    } else {
        kdam::tqdm!(tile_paths.iter(), desc = "masking DEM tiles")
            .map(|path| mask::apply_masks(path, &polygons))
            .collect()
    };

    let mut summary = StageSummary::new();
    for (path, result) in tile_paths.iter().zip(results) {
        match result {
            Ok(n) => log::info!("mask: {n} pixels newly masked nodata in {path}"),
            Err(e) => summary.record("tile_mask_failed", format!("{path}: {e}")),
        }
    }
    Ok(summary)
}

/// infers `incline` on every edge in `graph` using the DEM tile(s) named in
/// `tile_index`. a tile referenced by an edge's geometry but absent from
/// `tile_index` is fatal (§7 `UnknownTile`); a DEM window read failure for
/// one edge is a non-fatal skip (the edge's incline is simply left absent).
pub fn infer_inclines(
    graph: &mut OsmGraph,
    workdir: &str,
    tile_index: &tiles::TileIndex,
    config: &PipelineConfig,
) -> Result<StageSummary, PipelineError> {
    let mut summary = StageSummary::new();
    let mut open_tiles: HashMap<String, Dataset> = HashMap::new();

    for (_source, edge) in graph.edges_mut() {
        let geometry = match &edge.geometry {
            Some(g) => g.clone(),
            None => continue,
        };
        let length = match edge.length {
            Some(l) => l,
            None => continue,
        };
        let first = match geometry.0.first() {
            Some(c) => (c.x, c.y),
            None => continue,
        };
        let last = match geometry.0.last() {
            Some(c) => (c.x, c.y),
            None => continue,
        };

        let tile_name = tiles::tile_name_for_point(first.0, first.1);
        if !tile_index.contains(&tile_name) {
            return Err(PipelineError::UnknownTile(tile_name));
        }

        let dataset = match open_tiles.get(&tile_name) {
            Some(d) => d,
            None => {
                let path = format!("{workdir}/dems/{tile_name}.tif");
                let ds = Dataset::open(Path::new(&path))
                    .map_err(|e| PipelineError::CorruptInput(format!("{path}: {e}")))?;
                open_tiles.entry(tile_name.clone()).or_insert(ds)
            }
        };

        let first_elevation = sample_elevation(dataset, first.0, first.1, config.interpolation_method);
        let last_elevation = sample_elevation(dataset, last.0, last.1, config.interpolation_method);
        match interpolate::infer_incline(first_elevation, last_elevation, length) {
            Some(incline) => edge.incline = Some(incline),
            None => summary.record("incline_unavailable", format!("edge -> {}", edge.target)),
        }
    }

    Ok(summary)
}

fn sample_elevation(dataset: &Dataset, lon: f64, lat: f64, method: InterpolationMethod) -> Option<f64> {
    let geo_transform = dataset.geo_transform().ok()?;
    let inverse = geo_transform.invert().ok()?;
    let (px, py) = inverse.apply(lon, lat);
    let band = dataset.rasterband(1).ok()?;
    let (width, height) = dataset.raster_size();

    let (dim, offset_x, offset_y) = match method {
        InterpolationMethod::Bilinear => (2usize, px.floor() as isize, py.floor() as isize),
        InterpolationMethod::BicubicSpline | InterpolationMethod::Idw => {
            (3usize, px.floor() as isize - 1, py.floor() as isize - 1)
        }
    };
    if offset_x < 0 || offset_y < 0 || offset_x as usize + dim > width || offset_y as usize + dim > height {
        return None;
    }

    let nodata = band.no_data_value();
    let buffer = band.read_as::<f64>((offset_x, offset_y), (dim, dim), (dim, dim), None).ok()?;

    let mut values = vec![vec![0.0; dim]; dim];
    let mut mask = vec![vec![true; dim]; dim];
    for row in 0..dim {
        for col in 0..dim {
            let v = buffer.data[row * dim + col];
            values[row][col] = v;
            let is_nodata = nodata.map(|nd| v == nd).unwrap_or(false) || v.is_nan();
            mask[row][col] = !is_nodata;
        }
    }

    let window = Window { values, mask };
    let dx = px - offset_x as f64;
    let dy = py - offset_y as f64;
    interpolate::interpolate(method, &window, dx, dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_inclines_unknown_tile_is_fatal() {
        let mut g = OsmGraph::new();
        g.upsert_node(crate::graph::OsmNodeId(1), 0.0, 0.0);
        g.upsert_node(crate::graph::OsmNodeId(2), 1.0, 0.0);
        let mut edge = crate::graph::GraphEdge::from_normalized(
            crate::model::WayClass::Sidewalk,
            1,
            0,
            crate::graph::OsmNodeId(1),
            crate::graph::OsmNodeId(2),
            &crate::model::RawTags::new(),
        );
        edge.geometry = Some(geo::LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]));
        edge.length = Some(100.0);
        g.add_edge(crate::graph::OsmNodeId(1), edge);

        let config = PipelineConfig::default();
        let index = tiles::TileIndex::new();
        let err = infer_inclines(&mut g, "/tmp/does-not-exist", &index, &config).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownTile(_)));
    }
}
