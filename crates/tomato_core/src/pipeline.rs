//! Wires normalizer, classifier, resolver and ledger into one request.

use crate::classifier::{OnnxClassifier, ScoreModel};
use crate::config::PredictorConfig;
use crate::error::Result;
use crate::ledger::{HistoryLedger, PredictionRecord};
use crate::normalize::{Normalizer, decode_image};
use crate::resolve::{Prediction, resolve};
use crate::uploads::UploadStore;
use chrono::Utc;
use image::{DynamicImage, RgbImage};
use std::sync::Arc;

/// Loaded once per process and shared by every session.
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn ScoreModel>,
    normalizer: Normalizer,
}

impl Predictor {
    pub fn new(model: Arc<dyn ScoreModel>, cfg: &PredictorConfig) -> Self {
        Self {
            model,
            normalizer: Normalizer {
                preview_size: cfg.display.preview_size,
                model_size: cfg.model.input_size,
                normalization: cfg.model.normalization,
            },
        }
    }

    /// Loads the ONNX model named in `cfg`. Fails with `ModelNotFound` when the
    /// artifact is missing; callers treat that as fatal.
    pub fn load(cfg: &PredictorConfig) -> Result<Self> {
        cfg.validate()?;
        let model = OnnxClassifier::load(&cfg.model.path)?;
        tracing::info!(
            "predictor ready: {:?} normalization, {}x{} input",
            cfg.model.normalization,
            cfg.model.input_size.width,
            cfg.model.input_size.height
        );
        Ok(Self::new(Arc::new(model), cfg))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Scores one image without touching any history.
    pub fn classify(&self, image: &DynamicImage) -> Result<Prediction> {
        let tensor = self.normalizer.tensor(image);
        let score = self.model.predict(&tensor)?;
        let prediction = resolve(score);
        tracing::info!(
            "score {:.4} -> {} ({:.2}%)",
            score.value(),
            prediction.label,
            prediction.confidence
        );
        Ok(prediction)
    }

    /// Classifies and records the outcome. On error the ledger is unchanged.
    pub fn analyze(
        &self,
        image: &DynamicImage,
        ledger: &mut HistoryLedger,
    ) -> Result<PredictionRecord> {
        let prediction = self.classify(image)?;
        let record = PredictionRecord::new(Utc::now(), prediction);
        ledger.append(record.clone())?;
        Ok(record)
    }

    pub fn analyze_bytes(
        &self,
        bytes: &[u8],
        ledger: &mut HistoryLedger,
    ) -> Result<PredictionRecord> {
        let image = decode_image(bytes)?;
        self.analyze(&image, ledger)
    }
}

/// Photo currently selected in a session, with its display preview.
#[derive(Debug, Clone)]
pub struct Upload {
    pub image: DynamicImage,
    pub preview: RgbImage,
}

/// State owned by a single user session. Sessions never share ledgers.
#[derive(Debug, Default)]
pub struct PredictionSession {
    ledger: HistoryLedger,
    upload: Option<Upload>,
    last: Option<PredictionRecord>,
}

impl PredictionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub fn upload(&self) -> Option<&Upload> {
        self.upload.as_ref()
    }

    /// Most recent successful analysis of the current upload.
    pub fn last_prediction(&self) -> Option<&PredictionRecord> {
        self.last.as_ref()
    }

    /// Decodes a new upload and builds its preview. A copy goes to `store`
    /// when given; failing to archive it is logged and otherwise ignored.
    /// A failed upload replaces the current photo with nothing, so the user
    /// has to pick again; the history is never touched.
    pub fn load_upload(
        &mut self,
        predictor: &Predictor,
        bytes: &[u8],
        store: Option<&UploadStore>,
    ) -> Result<&Upload> {
        self.discard_upload();
        let image = decode_image(bytes)?;
        let preview = predictor.normalizer().preview(&image)?;
        if let Some(store) = store
            && let Err(e) = store.save(&image)
        {
            tracing::warn!("could not archive upload in {}: {e}", store.dir().display());
        }
        Ok(self.upload.insert(Upload { image, preview }))
    }

    /// Forgets the current photo and its result, keeping the history.
    pub fn discard_upload(&mut self) {
        self.upload = None;
        self.last = None;
    }

    /// Analyzes the current upload. Returns `Ok(None)` when nothing is uploaded.
    pub fn analyze(&mut self, predictor: &Predictor) -> Result<Option<&PredictionRecord>> {
        let Some(upload) = &self.upload else {
            return Ok(None);
        };
        let record = predictor.analyze(&upload.image, &mut self.ledger)?;
        Ok(Some(self.last.insert(record)))
    }

    pub fn clear_history(&mut self) {
        self.ledger.clear();
        self.last = None;
    }
}
