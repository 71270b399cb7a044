use clap::{Parser, Subcommand};
use osw_network::config::PipelineConfig;
use osw_network::graph::geojson_io;
use osw_network::model::CliError;
use osw_network::{cost, curbramps, dem, geometry, ingest, simplify, tasks};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
    /// intermediate-file directory; falls back to `OSW_WORKDIR` then `.`.
    #[arg(long, global = true)]
    workdir: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// ingest a PBF into a simplified, geometry-complete graph and write it
    /// as a node/edge GeoJSON pair under `--workdir`.
    Network {
        #[arg(long)]
        pbf_file: String,
        #[arg(long)]
        configuration_file: Option<String>,
        #[arg(long)]
        region_id: String,
    },
    /// mask building/bridge footprints out of the DEM tiles covering a
    /// region's graph.
    Mask {
        #[arg(long)]
        pbf_file: String,
        #[arg(long)]
        tile_paths: Vec<String>,
        #[arg(long)]
        configuration_file: Option<String>,
    },
    /// infer per-edge incline from DEM tiles and rewrite the region's edge
    /// GeoJSON.
    Incline {
        #[arg(long)]
        region_id: String,
        #[arg(long)]
        tile_index_file: String,
        #[arg(long)]
        configuration_file: Option<String>,
    },
    /// infer curb-ramp accessibility on crossing edges.
    InferCurbramps {
        #[arg(long)]
        region_id: String,
        #[arg(long)]
        configuration_file: Option<String>,
    },
    /// annotate crossing/sidewalk edges by task-polygon mapping status.
    AnnotateTasks {
        #[arg(long)]
        region_id: String,
        #[arg(long)]
        crossings_tasks_file: Option<String>,
        #[arg(long)]
        sidewalks_tasks_file: Option<String>,
    },
    /// evaluate the query-time cost function on a single edge, for
    /// diagnostics (a real router links against the `cost` module directly).
    Cost {
        #[arg(long)]
        length: f64,
        #[arg(long)]
        highway: String,
        #[arg(long)]
        incline: Option<f64>,
    },
}

fn workdir(args: &CliArgs) -> String {
    args.workdir
        .clone()
        .or_else(|| std::env::var("OSW_WORKDIR").ok())
        .unwrap_or_else(|| ".".to_string())
}

fn load_config(path: &Option<String>) -> Result<PipelineConfig, CliError> {
    match path {
        Some(p) => PipelineConfig::try_from(p.as_str()),
        None => Ok(PipelineConfig::default()),
    }
}

fn nodes_path(workdir: &str, region_id: &str) -> PathBuf {
    Path::new(workdir).join(format!("{region_id}.graph.nodes.geojson"))
}

fn edges_path(workdir: &str, region_id: &str) -> PathBuf {
    Path::new(workdir).join(format!("{region_id}.graph.edges.geojson"))
}

fn load_graph(workdir: &str, region_id: &str) -> Result<osw_network::graph::OsmGraph, CliError> {
    let nodes_fc = read_feature_collection(&nodes_path(workdir, region_id))?;
    let edges_fc = read_feature_collection(&edges_path(workdir, region_id))?;
    geojson_io::read_graph(&nodes_fc, &edges_fc).map_err(CliError::from)
}

fn read_feature_collection(path: &Path) -> Result<geojson::FeatureCollection, CliError> {
    let contents = std::fs::read_to_string(path)?;
    let parsed = geojson::GeoJson::from_str(&contents).map_err(|e| {
        CliError::Pipeline(osw_network::model::PipelineError::GeoJsonError(format!(
            "{}: {e}",
            path.display()
        )))
    })?;
    match parsed {
        geojson::GeoJson::FeatureCollection(fc) => Ok(fc),
        other => Err(CliError::Pipeline(osw_network::model::PipelineError::GeoJsonError(
            format!("{}: expected a FeatureCollection, found {other:?}", path.display()),
        ))),
    }
}

fn write_graph(workdir: &str, region_id: &str, graph: &osw_network::graph::OsmGraph) -> Result<(), CliError> {
    let nodes_fc = geojson_io::write_nodes(graph);
    let edges_fc = geojson_io::write_edges(graph);
    std::fs::write(nodes_path(workdir, region_id), geojson::GeoJson::from(nodes_fc).to_string())?;
    std::fs::write(edges_path(workdir, region_id), geojson::GeoJson::from(edges_fc).to_string())?;
    Ok(())
}

fn run(args: &CliArgs) -> Result<(), CliError> {
    let workdir = workdir(args);
    match &args.command {
        Command::Network {
            pbf_file,
            configuration_file,
            region_id,
        } => {
            let config = load_config(configuration_file)?;
            let (mut graph, ingest_summary) = ingest::build_graph(pbf_file)?;
            log::info!("ingest skips: {}", ingest_summary.digest());

            if config.simplify {
                let simplify_summary = simplify::simplify(&mut graph);
                log::info!("simplify skips: {}", simplify_summary.digest());
            }

            geometry::build_geometries(&mut graph)?;
            write_graph(&workdir, region_id, &graph)?;
            eprintln!("wrote {region_id}.graph.{{nodes,edges}}.geojson to {workdir}");
            Ok(())
        }
        Command::Mask {
            pbf_file,
            tile_paths,
            configuration_file,
        } => {
            let config = load_config(configuration_file)?;
            let (footprints, extract_summary) = dem::footprints::extract(pbf_file)?;
            log::info!("footprint extraction skips: {}", extract_summary.digest());
            let mask_summary = dem::mask_tiles(tile_paths, &footprints, &config)?;
            log::info!("mask skips: {}", mask_summary.digest());
            eprintln!("masked {} tile(s)", tile_paths.len());
            Ok(())
        }
        Command::Incline {
            region_id,
            tile_index_file,
            configuration_file,
        } => {
            let config = load_config(configuration_file)?;
            let mut graph = load_graph(&workdir, region_id)?;
            let index_contents = std::fs::read_to_string(tile_index_file)?;
            let names: Vec<String> = serde_json::from_str(&index_contents)?;
            let tile_index: dem::tiles::TileIndex = names.into_iter().collect();

            let summary = dem::infer_inclines(&mut graph, &workdir, &tile_index, &config)?;
            log::info!("incline skips: {}", summary.digest());
            write_graph(&workdir, region_id, &graph)?;
            Ok(())
        }
        Command::InferCurbramps {
            region_id,
            configuration_file,
        } => {
            let config = load_config(configuration_file)?;
            let mut graph = load_graph(&workdir, region_id)?;
            curbramps::infer_curbramps(&mut graph, config.curbramp_search_radius_m)?;
            write_graph(&workdir, region_id, &graph)?;
            Ok(())
        }
        Command::AnnotateTasks {
            region_id,
            crossings_tasks_file,
            sidewalks_tasks_file,
        } => {
            let mut graph = load_graph(&workdir, region_id)?;
            if let Some(path) = crossings_tasks_file {
                let polygons = read_task_polygons(Path::new(path))?;
                tasks::annotate_crossings(&mut graph, &polygons);
            }
            if let Some(path) = sidewalks_tasks_file {
                let polygons = read_task_polygons(Path::new(path))?;
                tasks::annotate_sidewalks(&mut graph, &polygons);
            }
            write_graph(&workdir, region_id, &graph)?;
            Ok(())
        }
        Command::Cost {
            length,
            highway,
            incline,
        } => {
            let mut tags = osw_network::model::RawTags::new();
            tags.insert("highway".to_string(), highway.clone());
            let mut edge = osw_network::graph::GraphEdge::from_normalized(
                osw_network::model::WayClass::Road,
                0,
                0,
                osw_network::graph::OsmNodeId(0),
                osw_network::graph::OsmNodeId(1),
                &tags,
            );
            edge.length = Some(*length);
            edge.incline = *incline;
            let request = cost::CostRequest::pedestrian_default();
            match cost::evaluate(&edge, &request) {
                Some(c) => println!("{c}"),
                None => println!("infinite"),
            }
            Ok(())
        }
    }
}

fn read_task_polygons(path: &Path) -> Result<Vec<tasks::TaskPolygon>, CliError> {
    let fc = read_feature_collection(path)?;
    let mut polygons = Vec::new();
    for feature in &fc.features {
        let geom = match &feature.geometry {
            Some(g) => g,
            None => continue,
        };
        let geo_geom: geo::Geometry<f64> = match geom.value.clone().try_into() {
            Ok(g) => g,
            Err(_) => continue,
        };
        let polygon = match geo_geom {
            geo::Geometry::Polygon(p) => p,
            _ => continue,
        };
        let status = feature
            .properties
            .as_ref()
            .and_then(|p| p.get("taskStatus"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        polygons.push(tasks::TaskPolygon { geometry: polygon, status });
    }
    Ok(polygons)
}

fn main() {
    env_logger::init();
    let args = CliArgs::parse();
    if let Err(e) = run(&args) {
        log::error!("{e}");
        eprintln!("{e}");
        std::process::exit(1);
    }
}
