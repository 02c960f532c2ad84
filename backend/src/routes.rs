use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::http::header::{self, ContentType};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use log::{info, warn};
use serde_json::json;

use crate::errors::AppError;
use crate::flash;
use crate::storage::upload_store::StorageError;
use crate::storage::validation::{validate_upload, FilePart, IMAGE_FIELD};
use crate::templates;
use crate::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/file/{filename:.*}").route(web::get().to(uploaded_file)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn home(req: HttpRequest) -> HttpResponse {
    let message = flash::take_flash(&req);

    let mut response = HttpResponse::Ok();
    response.content_type(ContentType::html());
    if message.is_some() {
        response.cookie(flash::removal_cookie());
    }
    response.body(templates::render_index(message.as_deref()))
}

async fn predict(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let file_part = if is_multipart(&req) {
        read_image_field(payload, state.max_upload_bytes).await?
    } else {
        None
    };

    let upload = match validate_upload(file_part) {
        Ok(upload) => upload,
        Err(rejection) => {
            warn!("Rejected upload: {}", rejection);
            return Ok(flash::redirect_with_flash("/", &rejection.to_string()));
        }
    };

    let stored = state.store.save(&upload, Utc::now()).await?;
    info!(
        "Stored upload {:?} as {} ({} bytes)",
        stored.original_name, stored.storage_name, stored.size
    );

    let predictor = state.predictor.clone();
    let path = stored.path.clone();
    let result = web::block(move || predictor.predict_file(&path)).await??;

    if let Some(top) = result.top() {
        info!(
            "Classified {} as {} ({:.3})",
            stored.storage_name, top.label, top.score
        );
    }

    let image_url = format!("/file/{}", urlencoding::encode(&stored.storage_name));
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(templates::render_result(&image_url, &stored.storage_name, &result)))
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"))
}

/// Pulls the first `image` file part out of the body, draining every other field.
///
/// A part only counts as a file when its content disposition carries a `filename`
/// parameter, even an empty one.
async fn read_image_field(
    mut payload: Multipart,
    max_bytes: usize,
) -> Result<Option<FilePart>, AppError> {
    let mut image = None;

    while let Some(mut field) = payload.try_next().await? {
        let filename = if image.is_none() && field.name() == Some(IMAGE_FIELD) {
            field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_owned)
        } else {
            None
        };

        let Some(filename) = filename else {
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            if bytes.len() + data.len() > max_bytes {
                return Err(AppError::PayloadTooLarge(max_bytes));
            }
            bytes.extend_from_slice(&data);
        }
        image = Some(FilePart { filename, bytes });
    }

    Ok(image)
}

async fn uploaded_file(
    req: HttpRequest,
    state: web::Data<AppState>,
    filename: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let Some(path) = state.store.locate(&filename).await? else {
        info!("Upload not found: {}", filename);
        return Ok(HttpResponse::NotFound()
            .content_type(ContentType::html())
            .body(templates::render_error(actix_web::http::StatusCode::NOT_FOUND)));
    };

    let file = NamedFile::open_async(&path)
        .await
        .map_err(|source| StorageError::Read {
            path: path.clone(),
            source,
        })?;
    Ok(file.into_response(&req))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
