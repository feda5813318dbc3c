//! TOML-backed configuration for the predictor and its collaborators.

use crate::error::{PredictError, Result};
use crate::normalize::Normalization;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Model artifact and the preprocessing it was trained with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    /// Must match the network stored at `path`.
    pub normalization: Normalization,
    pub input_size: Size,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/tomato_grading_model.onnx"),
            normalization: Normalization::EfficientNet,
            input_size: Size::new(224, 224),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub preview_size: Size,
    /// Header logo and result icons; each is shown only when the file exists.
    pub logo: PathBuf,
    pub fresh_icon: PathBuf,
    pub rotten_icon: PathBuf,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            preview_size: Size::new(526, 250),
            logo: PathBuf::from("static/logo.png"),
            fresh_icon: PathBuf::from("static/fresh.png"),
            rotten_icon: PathBuf::from("static/rotten.png"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub prefix: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("static/uploads"),
            prefix: "upl".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of rows shown in the recent predictions table.
    pub recent_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { recent_limit: 20 }
    }
}

/// Top-level configuration, usually read from `tomato.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub model: ModelConfig,
    pub display: DisplayConfig,
    pub uploads: UploadConfig,
    pub history: HistoryConfig,
}

impl PredictorConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let cfg: Self =
            toml::from_str(raw).map_err(|e| PredictError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let cfg = Self::from_toml_str(&raw)?;
        tracing::info!("loaded configuration from {}", path.display());
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.input_size.is_empty() {
            return Err(PredictError::InvalidConfig(
                "model.input_size must be non-zero".into(),
            ));
        }
        if self.display.preview_size.is_empty() {
            return Err(PredictError::InvalidConfig(
                "display.preview_size must be non-zero".into(),
            ));
        }
        if self.history.recent_limit == 0 {
            return Err(PredictError::InvalidConfig(
                "history.recent_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
