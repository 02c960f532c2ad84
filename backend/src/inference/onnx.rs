use log::info;
use ndarray::Array4;
use std::path::Path;
use tract_onnx::prelude::*;

use super::model::{check_input, ImageClassifier, InferenceError, InputLayout};

/// ONNX network run through tract, optimized once for a fixed input shape.
pub struct OnnxClassifier {
    model: TypedRunnableModel<TypedModel>,
    size: usize,
    layout: InputLayout,
}

impl OnnxClassifier {
    pub fn new(path: &Path, size: usize, layout: InputLayout) -> Result<Self, InferenceError> {
        let load_error = |e: TractError| InferenceError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(load_error)?
            .with_input_fact(0, f32::fact(layout.shape(size)).into())
            .map_err(load_error)?
            .into_optimized()
            .map_err(load_error)?
            .into_runnable()
            .map_err(load_error)?;

        info!(
            "Loaded ONNX model {} ({:?} input {:?})",
            path.display(),
            layout,
            layout.shape(size)
        );
        Ok(Self {
            model,
            size,
            layout,
        })
    }
}

impl ImageClassifier for OnnxClassifier {
    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        check_input(input, self.size)?;

        let data = self.layout.flatten(input);
        let tensor = Tensor::from_shape(&self.layout.shape(self.size), data.as_slice())
            .map_err(|e| InferenceError::Model(e.to_string()))?;

        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::Model(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::Model("model produced no output".into()))?
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::Model(e.to_string()))?;

        Ok(output.iter().copied().collect())
    }
}
