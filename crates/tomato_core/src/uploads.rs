//! Write-only archive of uploaded photos, kept for auditing.

use crate::error::{PredictError, Result};
use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    prefix: String,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves `image` as PNG and returns where it went.
    pub fn save(&self, image: &DynamicImage) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(self.file_name(Utc::now()));
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(PredictError::Encode)?;
        tracing::debug!("saved upload to {}", path.display());
        Ok(path)
    }

    /// `{prefix}_{YYYYmmdd_HHMMSS}_{6 hex}.png`
    fn file_name(&self, at: DateTime<Utc>) -> String {
        let suffix: u32 = rand::rng().random_range(0..0x100_0000);
        format!(
            "{}_{}_{:06x}.png",
            self.prefix,
            at.format("%Y%m%d_%H%M%S"),
            suffix
        )
    }
}
