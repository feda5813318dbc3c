//! Binary freshness classifier: the model seam and its ONNX Runtime backend.

use crate::error::{PredictError, Result};
use crate::normalize::InferenceTensor;
use ndarray::CowArray;
use ort::{
    GraphOptimizationLevel, SessionBuilder, environment::Environment, session::Session,
    tensor::OrtOwnedTensor, value::Value,
};
use std::path::Path;
use std::sync::Arc;

/// Model output: probability of the "fresh" class, always finite and in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Score(f32);

impl Score {
    pub fn new(value: f32) -> Result<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PredictError::Inference(format!(
                "score {value} is outside [0, 1]"
            )))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

/// A loaded classifier. Implementations must be stateless between calls so a
/// single instance can serve every session concurrently.
pub trait ScoreModel: Send + Sync {
    fn predict(&self, tensor: &InferenceTensor) -> Result<Score>;
}

/// Sigmoid-output network exported to ONNX, run through ONNX Runtime.
pub struct OnnxClassifier {
    // Kept alive for as long as the session exists.
    _env: Arc<Environment>,
    session: Session,
}

impl OnnxClassifier {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PredictError::ModelNotFound(path.to_path_buf()));
        }
        let env = Environment::builder()
            .with_name("tomato-predictor")
            .build()
            .map_err(|e| PredictError::Inference(format!("could not start ONNX Runtime: {e}")))?
            .into_arc();
        let session = SessionBuilder::new(&env)
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level1))
            .and_then(|b| b.with_model_from_file(path))
            .map_err(|e| {
                PredictError::Inference(format!("could not load {}: {e}", path.display()))
            })?;
        tracing::info!("loaded classifier from {}", path.display());
        Ok(Self { _env: env, session })
    }
}

impl ScoreModel for OnnxClassifier {
    fn predict(&self, tensor: &InferenceTensor) -> Result<Score> {
        let input_array = tensor.view().into_dyn();
        let cow = CowArray::from(input_array);
        let input = Value::from_array(self.session.allocator(), &cow)
            .map_err(|e| PredictError::Inference(format!("could not build input tensor: {e}")))?;
        let outputs: Vec<Value> = self
            .session
            .run(vec![input])
            .map_err(|e| PredictError::Inference(e.to_string()))?;
        let first = outputs
            .first()
            .ok_or_else(|| PredictError::Inference("model produced no output".into()))?;
        let probs: OrtOwnedTensor<f32, _> = first
            .try_extract()
            .map_err(|e| PredictError::Inference(e.to_string()))?;
        let value = probs
            .view()
            .iter()
            .next()
            .copied()
            .ok_or_else(|| PredictError::Inference("empty model output".into()))?;
        Score::new(value)
    }
}

/// Always answers with the same score. Stands in for a real network in tests
/// and demos.
#[derive(Debug, Clone, Copy)]
pub struct FixedScore(pub f32);

impl ScoreModel for FixedScore {
    fn predict(&self, _tensor: &InferenceTensor) -> Result<Score> {
        Score::new(self.0)
    }
}
