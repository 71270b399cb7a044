use thiserror::Error;

use crate::graph::OsmNodeId;

/// failure taxonomy for the build pipeline (ingest, simplify, geometry, dem,
/// curb-ramp inference, task annotation). every fatal variant carries the
/// offending identifier (region id, tile name, way id, ...) per the error
/// handling design.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid pipeline configuration: {0}")]
    Config(String),
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("failure reading .pbf file: {0}")]
    CorruptInput(String),
    #[error("NED 1/3 arc-second tile '{0}' is not present in the tile index")]
    UnknownTile(String),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("attempting to reference node '{0}' not present in graph")]
    GraphMissingNodeId(OsmNodeId),
    #[error("failure simplifying graph: {0}")]
    GraphSimplificationError(String),
    #[error("failure decoding GeoJSON: {0}")]
    GeoJsonError(String),
    #[error("download failure for external resource: {0}")]
    Network(String),
    #[error("{0}")]
    Internal(String),
}

/// errors surfaced only by the CLI wrapper, which adds the ambient
/// serialization/config-file concerns around [`PipelineError`].
#[derive(Error, Debug)]
pub enum CliError {
    #[error("failure reading run configuration: {0}")]
    Configuration(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    StdIo(#[from] std::io::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
