use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_CONFIG_FILE: &str = "frame-classifier.toml";
pub const CONFIG_PATH_VAR: &str = "FRAME_CLASSIFIER_CONFIG";
const ENV_PREFIX: &str = "FRAME_CLASSIFIER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    Front,
    Back,
}

/// Named session presets, mirroring the resolutions capture hardware
/// exposes for its low/medium/high presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Low,
    Medium,
    High,
}

impl QualityPreset {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            QualityPreset::Low => (192, 144),
            QualityPreset::Medium => (480, 360),
            QualityPreset::High => (1280, 720),
        }
    }
}

/// How label results that complete out of frame order are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelOrdering {
    /// A label older than the one on screen is dropped.
    #[default]
    DiscardStale,
    /// Whichever result arrives last is shown.
    LastArrival,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: CameraPosition,
    pub quality: QualityPreset,
    pub frame_rate: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: CameraPosition::Back,
            quality: QualityPreset::Medium,
            frame_rate: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Minimum whole percentage a prediction needs to reach the display.
    pub confidence_threshold: u32,
    pub frame_buffer_size: usize,
    pub label_ordering: LabelOrdering,
    pub inference_timeout_ms: Option<u64>,
    pub max_concurrent_inference: Option<usize>,
}

impl PipelineSettings {
    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 70,
            frame_buffer_size: 1,
            label_ordering: LabelOrdering::DiscardStale,
            inference_timeout_ms: None,
            max_concurrent_inference: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub headless: bool,
    pub window_title: String,
    pub width: f32,
    pub height: f32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            headless: false,
            window_title: "Frame Classifier".to_string(),
            width: 640.0,
            height: 720.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub camera: CameraSettings,
    pub pipeline: PipelineSettings,
    pub display: DisplaySettings,
    pub logging: LoggingSettings,
}

impl Configuration {
    /// Loads the optional config file and overlays `FRAME_CLASSIFIER__*`
    /// environment variables, e.g. `FRAME_CLASSIFIER__CAMERA__POSITION=front`.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        tracing::debug!("Loading configuration from {}", path.display());

        let configuration = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(configuration)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, AppError> {
        let configuration = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(configuration)
    }

    fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn log_level(&self) -> tracing::Level {
        self.logging.level.parse().unwrap_or(tracing::Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_shipped_behaviour() {
        let configuration = Configuration::default();
        assert_eq!(configuration.camera.position, CameraPosition::Back);
        assert_eq!(configuration.camera.quality, QualityPreset::Medium);
        assert_eq!(configuration.pipeline.confidence_threshold, 70);
        assert_eq!(configuration.pipeline.frame_buffer_size, 1);
        assert_eq!(
            configuration.pipeline.label_ordering,
            LabelOrdering::DiscardStale
        );
        assert!(configuration.pipeline.inference_timeout().is_none());
        assert_eq!(configuration.log_level(), tracing::Level::INFO);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_fields() {
        let configuration = Configuration::from_toml_str(
            r#"
            [camera]
            position = "front"
            quality = "high"

            [pipeline]
            label_ordering = "last_arrival"
            inference_timeout_ms = 250

            [logging]
            level = "debug"
            "#,
        )
        .expect("valid configuration");

        assert_eq!(configuration.camera.position, CameraPosition::Front);
        assert_eq!(configuration.camera.quality.dimensions(), (1280, 720));
        assert_eq!(configuration.camera.frame_rate, 30);
        assert_eq!(
            configuration.pipeline.label_ordering,
            LabelOrdering::LastArrival
        );
        assert_eq!(
            configuration.pipeline.inference_timeout(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(configuration.pipeline.confidence_threshold, 70);
        assert!(!configuration.display.headless);
        assert_eq!(configuration.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn unknown_camera_position_is_rejected() {
        let result = Configuration::from_toml_str("[camera]\nposition = \"sideways\"\n");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn unparseable_log_level_falls_back_to_info() {
        let mut configuration = Configuration::default();
        configuration.logging.level = "chatty".to_string();
        assert_eq!(configuration.log_level(), tracing::Level::INFO);
    }
}
