pub mod config;
pub mod errors;
pub mod flash;
pub mod inference;
pub mod routes;
pub mod storage;
pub mod templates;

use std::sync::Arc;

use inference::Predictor;
use storage::UploadStore;

pub use routes::configure_routes;

/// Shared by every worker. The predictor is loaded once and only ever read.
pub struct AppState {
    pub predictor: Arc<Predictor>,
    pub store: UploadStore,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(predictor: Predictor, store: UploadStore, max_upload_bytes: usize) -> Self {
        Self {
            predictor: Arc::new(predictor),
            store,
            max_upload_bytes,
        }
    }
}
