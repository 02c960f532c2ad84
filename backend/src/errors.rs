use actix_multipart::MultipartError;
use actix_web::error::BlockingError;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;

use crate::inference::PipelineError;
use crate::storage::StorageError;
use crate::templates;

/// Failures past input validation. All of them end the request, none end the process,
/// and the client only ever sees a generic error page.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Prediction failed: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Blocking task failed: {0}")]
    Blocking(#[from] BlockingError),
    #[error("Upload exceeds {0} bytes")]
    PayloadTooLarge(usize),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error!("Request failed: {}", self);
        let status = self.status_code();
        HttpResponse::build(status)
            .content_type(ContentType::html())
            .body(templates::render_error(status))
    }
}
