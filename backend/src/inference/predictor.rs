use log::info;
use ndarray::Array4;
use shared::PredictionResult;
use std::path::Path;
use std::sync::Arc;

use crate::config::ModelConfig;

use super::labels::{LabelError, LabelSet};
use super::model::{load_classifier, softmax, ImageClassifier, InferenceError};
use super::preprocess::{load_image, prepare_image, Normalization, PreprocessError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Labels(#[from] LabelError),
}

#[derive(Debug, Clone, Copy)]
pub struct PredictorSettings {
    pub image_size: u32,
    pub normalization: Normalization,
    pub apply_softmax: bool,
    pub top_k: usize,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self {
            image_size: 224,
            normalization: Normalization::default(),
            apply_softmax: false,
            top_k: PredictionResult::MAX_LEN,
        }
    }
}

/// Stored image in, ranked labels out. One instance is shared by every request.
pub struct Predictor {
    classifier: Arc<dyn ImageClassifier + Send + Sync>,
    labels: LabelSet,
    settings: PredictorSettings,
}

impl Predictor {
    pub fn new(
        classifier: Arc<dyn ImageClassifier + Send + Sync>,
        labels: LabelSet,
        settings: PredictorSettings,
    ) -> Self {
        Self {
            classifier,
            labels,
            settings,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self, PipelineError> {
        let labels = LabelSet::load(&config.labels_path())?;
        info!(
            "Loaded {} class labels from {}",
            labels.len(),
            config.labels_path().display()
        );

        let classifier = load_classifier(
            &config.model_path(),
            config.image.size as usize,
            config.image.layout,
        )?;

        Ok(Self::new(
            classifier,
            labels,
            PredictorSettings {
                image_size: config.image.size,
                normalization: config.image.normalization,
                apply_softmax: config.model.apply_softmax,
                top_k: config.decode.top_k,
            },
        ))
    }

    /// Blocking: decodes, preprocesses and classifies the file at `path`.
    pub fn predict_file(&self, path: &Path) -> Result<PredictionResult, PipelineError> {
        let image = load_image(path)?;
        let input = prepare_image(&image, self.settings.image_size, self.settings.normalization);
        self.predict_tensor(&input)
    }

    pub fn predict_tensor(&self, input: &Array4<f32>) -> Result<PredictionResult, PipelineError> {
        let mut scores = self.classifier.classify(input)?;
        if self.settings.apply_softmax {
            softmax(&mut scores);
        }
        let decoded = self.labels.decode_top_k(&scores, self.settings.top_k)?;
        Ok(PredictionResult::from_ranked(decoded))
    }
}
