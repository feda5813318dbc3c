use std::path::PathBuf;

/// Errors produced by the prediction pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    /// The uploaded bytes could not be decoded as an image.
    #[error("could not read uploaded image: {0}")]
    UnreadableImage(String),
    /// No model artifact at the configured location.
    #[error("model not found at {}", .0.display())]
    ModelNotFound(PathBuf),
    /// A record was rejected by the history ledger.
    #[error("malformed prediction record: {0}")]
    MalformedRecord(String),
    /// The classifier backend failed or returned an unusable score.
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("image resize failed: {0}")]
    Resize(String),
    #[error("could not encode image: {0}")]
    Encode(image::ImageError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = PredictError> = std::result::Result<T, E>;
