use ndarray::Array4;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Failed to load model {path}: {reason}")]
    Load { path: String, reason: String },
    #[error("Unsupported model file: {0}")]
    UnsupportedModel(String),
    #[error("Model input has shape {actual:?}, expected {expected:?}")]
    InputShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("Model error: {0}")]
    Model(String),
}

/// Memory layout the network expects for its input tensor.
///
/// Preprocessing always produces NHWC; engines transpose when the model wants NCHW.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputLayout {
    #[default]
    Nhwc,
    Nchw,
}

impl InputLayout {
    pub fn shape(&self, size: usize) -> [usize; 4] {
        match self {
            InputLayout::Nhwc => [1, size, size, 3],
            InputLayout::Nchw => [1, 3, size, size],
        }
    }

    /// Flattens an NHWC batch into this layout's row-major order.
    pub fn flatten(&self, input: &Array4<f32>) -> Vec<f32> {
        match self {
            InputLayout::Nhwc => input.iter().copied().collect(),
            InputLayout::Nchw => input.view().permuted_axes([0, 3, 1, 2]).iter().copied().collect(),
        }
    }
}

/// A pretrained classifier: normalized `[1, H, W, 3]` batch in, one score per class out.
///
/// Implementations are loaded once and shared by every request, so `classify` takes `&self`.
pub trait ImageClassifier {
    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

/// Checks that a preprocessed batch is a single square RGB image of `size` pixels.
pub fn check_input(input: &Array4<f32>, size: usize) -> Result<(), InferenceError> {
    let expected = [1, size, size, 3];
    if input.shape() != expected {
        return Err(InferenceError::InputShape {
            expected: expected.to_vec(),
            actual: input.shape().to_vec(),
        });
    }
    Ok(())
}

/// Loads the engine matching the model file's extension.
pub fn load_classifier(
    path: &Path,
    size: usize,
    layout: InputLayout,
) -> Result<Arc<dyn ImageClassifier + Send + Sync>, InferenceError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("onnx") => Ok(Arc::new(super::onnx::OnnxClassifier::new(path, size, layout)?)),
        #[cfg(feature = "torch")]
        Some("pt") | Some("pth") => Ok(Arc::new(super::torch::TorchClassifier::new(
            path, size, layout,
        )?)),
        _ => Err(InferenceError::UnsupportedModel(path.display().to_string())),
    }
}

/// In-place softmax for engines that return raw logits.
pub fn softmax(scores: &mut [f32]) {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return;
    }
    let mut sum = 0.0;
    for score in scores.iter_mut() {
        *score = (*score - max).exp();
        sum += *score;
    }
    if sum > 0.0 {
        scores.iter_mut().for_each(|s| *s /= sum);
    }
}
