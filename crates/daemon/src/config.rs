use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

use boards::BoardConfig;
use pipeline::PipelineConfig;
use thermo_sensor::SensorConfig;

/// Looked for when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";

/// Configuration for the daemon
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Stage timing and calibration
    pub pipeline: PipelineConfig,
    /// Which sensor to read and how it behaves
    pub sensor: SensorConfig,
    /// Clock tree bring-up
    pub board: BoardConfig,
}

impl DaemonConfig {
    /// Parse `contents`, choosing the format from the extension of `path`.
    pub fn parse(path: &Path, contents: &str) -> anyhow::Result<Self> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let config = match extension {
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .with_context(|| format!("Could not parse YAML configuration '{}'", path.display()))?,
            "json" => serde_json::from_str(contents)
                .with_context(|| format!("Could not parse JSON configuration '{}'", path.display()))?,
            other => bail!("Unsupported configuration format '{}' for '{}'", other, path.display()),
        };
        Ok(config)
    }
}

/// Load daemon configuration.
///
/// An explicit path must exist. Without one, [`DEFAULT_CONFIG_PATH`] is used
/// if present and built-in defaults otherwise.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<DaemonConfig> {
    let path = match path {
        Some(path) => path,
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                tracing::info!("No configuration file at '{}', using defaults", DEFAULT_CONFIG_PATH);
                return Ok(DaemonConfig::default());
            }
            default
        }
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read configuration file at '{}'", path.display()))?;
    let config = DaemonConfig::parse(path, &contents)?;
    tracing::info!("Loaded configuration from {}", path.display());
    Ok(config)
}
