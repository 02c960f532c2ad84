use log::info;
use ndarray::Array4;
use std::path::Path;
use std::sync::Mutex;
use tch::{nn::ModuleT, CModule, Device, Kind, Tensor};

use super::model::{check_input, ImageClassifier, InferenceError, InputLayout};

/// TorchScript network run through libtorch, on CUDA when available.
pub struct TorchClassifier {
    model: Mutex<CModule>,
    device: Device,
    size: usize,
    layout: InputLayout,
}

impl TorchClassifier {
    pub fn new(path: &Path, size: usize, layout: InputLayout) -> Result<Self, InferenceError> {
        let device = Device::cuda_if_available();
        let model = CModule::load_on_device(path, device).map_err(|e| InferenceError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        info!("Loaded TorchScript model {} on {:?}", path.display(), device);
        Ok(Self {
            model: Mutex::new(model),
            device,
            size,
            layout,
        })
    }
}

impl ImageClassifier for TorchClassifier {
    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        check_input(input, self.size)?;

        let shape: Vec<i64> = self.layout.shape(self.size).iter().map(|&d| d as i64).collect();
        let tensor = Tensor::from_slice(&self.layout.flatten(input))
            .view(shape.as_slice())
            .to_device(self.device);

        let output = self
            .model
            .lock()
            .map_err(|_| InferenceError::Model("model lock poisoned".into()))?
            .forward_t(&tensor, false);

        let output_vec: Vec<f32> = output
            .to_kind(Kind::Float)
            .to_device(Device::Cpu)
            .view([-1])
            .try_into()
            .map_err(|e: tch::TchError| InferenceError::Model(e.to_string()))?;
        Ok(output_vec)
    }
}
