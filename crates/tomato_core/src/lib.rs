//! Fresh/rotten tomato grading: photo normalization, binary classification and
//! a per-session prediction history.

pub mod classifier;
pub mod config;
pub mod error;
pub mod ledger;
pub mod normalize;
pub mod pipeline;
pub mod resolve;
pub mod uploads;

pub use classifier::{FixedScore, OnnxClassifier, Score, ScoreModel};
pub use config::{PredictorConfig, Size};
pub use error::{PredictError, Result};
pub use ledger::{HistoryLedger, LabelCounts, PredictionRecord};
pub use normalize::{
    InferenceTensor, Normalization, Normalizer, decode_image, make_preview, prepare_for_model,
};
pub use pipeline::{PredictionSession, Predictor, Upload};
pub use resolve::{FRESH_THRESHOLD, Prediction, Quality, resolve};
pub use uploads::UploadStore;
