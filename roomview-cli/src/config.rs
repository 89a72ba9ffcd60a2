//! Configuration handling for the RoomView CLI

use roomview_core::sim::SimulationProfile;
use roomview_core::ArConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading or writing the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: ArConfig,

    #[serde(default)]
    pub simulation: SimulationProfile,

    #[serde(default)]
    pub scenario: ScenarioConfig,
}

/// Scripted user input and world motion for `roomview simulate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default = "default_asset")]
    pub asset: String,

    #[serde(default = "default_frames")]
    pub frames: u64,

    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: f64,

    /// First frame on which the floor is visible
    #[serde(default = "default_surface_from")]
    pub surface_from_frame: u64,

    #[serde(default = "default_surface_position")]
    pub surface_position: [f32; 3],

    #[serde(default = "default_tap_at")]
    pub tap_at: Vec<u64>,

    #[serde(default)]
    pub reset_at: Vec<u64>,

    /// Anchor drift added per frame, in metres
    #[serde(default)]
    pub drift_per_frame: [f32; 3],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinch: Option<PinchConfig>,

    #[serde(default = "default_true")]
    pub end_session: bool,
}

/// A two-finger gesture spread over a frame range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinchConfig {
    pub start_frame: u64,
    pub end_frame: u64,

    #[serde(default = "default_pinch_from")]
    pub from_distance: f32,

    #[serde(default = "default_pinch_to")]
    pub to_distance: f32,

    /// Vertical offset change over the gesture, in pixels
    #[serde(default)]
    pub twist_px: f32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            asset: default_asset(),
            frames: default_frames(),
            frame_interval_ms: default_frame_interval(),
            surface_from_frame: default_surface_from(),
            surface_position: default_surface_position(),
            tap_at: default_tap_at(),
            reset_at: Vec::new(),
            drift_per_frame: [0.0; 3],
            pinch: None,
            end_session: default_true(),
        }
    }
}

fn default_true() -> bool { true }
fn default_asset() -> String { "armchair.glb".to_string() }
fn default_frames() -> u64 { 120 }
fn default_frame_interval() -> f64 { 1000.0 / 60.0 }
fn default_surface_from() -> u64 { 10 }
fn default_surface_position() -> [f32; 3] { [0.0, -1.2, -1.5] }
fn default_tap_at() -> Vec<u64> { vec![20] }
fn default_pinch_from() -> f32 { 100.0 }
fn default_pinch_to() -> f32 { 150.0 }

/// Default location of the user configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".roomview").join("config.toml"))
}

/// Load configuration from file or use defaults
pub fn load_config(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    if let Some(path) = path {
        read_config(&path)
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            read_config(&default_path)
        } else {
            Ok(Config::default())
        }
    } else {
        Ok(Config::default())
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Save configuration to file
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, content).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_sections_use_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[engine.gesture]\nmax_scale = 4.0\n\n[simulation]\ngrant_anchors = false\n",
        )
        .unwrap();

        let config = load_config(Some(path)).unwrap();

        assert_eq!(config.engine.gesture.max_scale, 4.0);
        assert_eq!(config.engine.gesture.min_scale, 0.5);
        assert!(!config.simulation.grant_anchors);
        assert!(config.simulation.supported);
        assert_eq!(config.scenario, ScenarioConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.scenario.reset_at = vec![60];
        config.scenario.pinch = Some(PinchConfig {
            start_frame: 30,
            end_frame: 40,
            from_distance: 80.0,
            to_distance: 160.0,
            twist_px: 25.0,
        });

        save_config(&config, &path).unwrap();

        assert_eq!(load_config(Some(path)).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_names_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[scenario\nframes = ").unwrap();

        let err = load_config(Some(path.clone())).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let err = load_config(Some(dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
