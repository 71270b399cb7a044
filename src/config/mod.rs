use crate::model::CliError;
use serde::{Deserialize, Serialize};

/// elevation interpolation strategy used by the DEM incline stage (C6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    Bilinear,
    BicubicSpline,
    Idw,
}

impl Default for InterpolationMethod {
    fn default() -> Self {
        InterpolationMethod::Idw
    }
}

/// per-run knobs for the whole pipeline, read from a `.toml` or `.json` file
/// named on the CLI. mirrors `OsmImportConfiguration`'s shape: a flat struct
/// of booleans and distances with a `Default` impl rather than a builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// run the degree-2 coalescing pass (C3) after ingest.
    pub simplify: bool,
    /// kept as an `Option` for forward compatibility even though nothing in
    /// this pipeline currently consolidates nearby intersections; mirrors
    /// the teacher carrying an unused `consolidation_threshold` knob.
    pub consolidation_threshold_m: Option<f64>,
    pub ignore_osm_parsing_errors: bool,
    pub parallelize: bool,
    pub overwrite: bool,
    pub interpolation_method: InterpolationMethod,
    /// meters; radius searched by the curb-ramp inference STR-tree query.
    pub curbramp_search_radius_m: f64,
    /// meters; half-width used to buffer bridge footprints before DEM
    /// masking.
    pub bridge_buffer_m: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            simplify: true,
            consolidation_threshold_m: None,
            ignore_osm_parsing_errors: false,
            parallelize: true,
            overwrite: false,
            interpolation_method: InterpolationMethod::default(),
            curbramp_search_radius_m: 10.0,
            bridge_buffer_m: 30.0,
        }
    }
}

impl TryFrom<&str> for PipelineConfig {
    type Error = CliError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CliError::Configuration(format!("failure reading {path}: {e}")))?;
        if path.ends_with(".toml") {
            toml::from_str(&contents)
                .map_err(|e| CliError::Configuration(format!("failure decoding {path}: {e}")))
        } else if path.ends_with(".json") {
            serde_json::from_str(&contents)
                .map_err(|e| CliError::Configuration(format!("failure decoding {path}: {e}")))
        } else {
            Err(CliError::Configuration(format!(
                "unsupported configuration file type: {path}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_teacher_leaning_toggles() {
        let cfg = PipelineConfig::default();
        assert!(cfg.simplify);
        assert!(cfg.parallelize);
        assert!(!cfg.overwrite);
        assert_eq!(cfg.interpolation_method, InterpolationMethod::Idw);
    }

    #[test]
    fn test_try_from_rejects_unknown_extension() {
        let err = PipelineConfig::try_from("config.yaml");
        assert!(err.is_err());
    }

    #[test]
    fn test_try_from_toml() {
        let dir = std::env::temp_dir();
        let path = dir.join("osw_network_test_config.toml");
        std::fs::write(&path, "simplify = false\ncurbramp_search_radius_m = 25.0\n").unwrap();
        let cfg = PipelineConfig::try_from(path.to_str().unwrap()).unwrap();
        assert!(!cfg.simplify);
        assert_eq!(cfg.curbramp_search_radius_m, 25.0);
        std::fs::remove_file(&path).ok();
    }
}
