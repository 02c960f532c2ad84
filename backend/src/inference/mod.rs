pub mod labels;
pub mod model;
pub mod onnx;
pub mod predictor;
pub mod preprocess;
#[cfg(feature = "torch")]
pub mod torch;

pub use model::{ImageClassifier, InferenceError, InputLayout};
pub use predictor::{PipelineError, Predictor, PredictorSettings};
