use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use backend::flash::FLASH_COOKIE;
use backend::inference::labels::{ClassLabel, LabelSet};
use backend::inference::{ImageClassifier, InferenceError, Predictor, PredictorSettings};
use backend::storage::UploadStore;
use backend::{configure_routes, AppState};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use ndarray::Array4;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const BOUNDARY: &str = "classifier-test-boundary";
const TABBY: usize = 281;

/// Always votes "tabby cat" and counts how often it was asked.
struct TabbyClassifier {
    calls: Arc<AtomicUsize>,
}

impl ImageClassifier for TabbyClassifier {
    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(input.shape(), &[1, 224, 224, 3]);

        let mut scores = vec![0.0001; 1000];
        scores[TABBY] = 0.9;
        scores[282] = 0.05;
        Ok(scores)
    }
}

struct Fixture {
    dir: TempDir,
    calls: Arc<AtomicUsize>,
    state: web::Data<AppState>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_limit(1024 * 1024)
    }

    fn with_limit(max_upload_bytes: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let labels = LabelSet::new(
            (0..1000)
                .map(|i| ClassLabel {
                    class_id: format!("n{:08}", i),
                    name: match i {
                        TABBY => "tabby_cat".to_string(),
                        282 => "tiger_cat".to_string(),
                        _ => format!("class_{}", i),
                    },
                })
                .collect(),
        );
        let predictor = Predictor::new(
            Arc::new(TabbyClassifier {
                calls: calls.clone(),
            }),
            labels,
            PredictorSettings::default(),
        );
        let state = web::Data::new(AppState::new(
            predictor,
            UploadStore::new(dir.path()),
            max_upload_bytes,
        ));

        Self { dir, calls, state }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

macro_rules! app {
    ($fixture:expr) => {
        test::init_service(
            App::new()
                .app_data($fixture.state.clone())
                .configure(configure_routes),
        )
        .await
    };
}

enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                        name, value
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn predict_request(parts: &[Part<'_>]) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/predict")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(parts))
}

fn png_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(40, 30, Rgb([200, 150, 100])));
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

fn flash_of(resp: &actix_web::dev::ServiceResponse) -> Option<String> {
    resp.response()
        .cookies()
        .find(|c| c.name() == FLASH_COOKIE)
        .map(|c| c.value().to_owned())
}

async fn assert_redirected_with(fixture: &Fixture, parts: &[Part<'_>], message: &str) {
    let app = app!(fixture);
    let resp = test::call_service(&app, predict_request(parts).to_request()).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");
    assert_eq!(flash_of(&resp).as_deref(), Some(message));
    assert_eq!(fixture.calls(), 0);
    assert!(fixture.stored_files().is_empty());
}

#[actix_web::test]
async fn home_renders_upload_form() {
    let fixture = Fixture::new();
    let app = app!(fixture);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("action=\"/predict\""));
    assert!(body.contains("enctype=\"multipart/form-data\""));
    assert!(!body.contains("class=\"flash\""));
}

#[actix_web::test]
async fn missing_image_field_redirects() {
    let fixture = Fixture::new();
    assert_redirected_with(
        &fixture,
        &[Part::Text {
            name: "comment",
            value: "hello",
        }],
        "No file part in request.",
    )
    .await;
}

#[actix_web::test]
async fn image_field_without_filename_is_not_a_file() {
    let fixture = Fixture::new();
    assert_redirected_with(
        &fixture,
        &[Part::Text {
            name: "image",
            value: "not a file",
        }],
        "No file part in request.",
    )
    .await;
}

#[actix_web::test]
async fn empty_filename_redirects() {
    let fixture = Fixture::new();
    assert_redirected_with(
        &fixture,
        &[Part::File {
            name: "image",
            filename: "",
            bytes: b"",
        }],
        "No file selected.",
    )
    .await;
}

#[actix_web::test]
async fn disallowed_extension_redirects() {
    let fixture = Fixture::new();
    let png = png_bytes();
    assert_redirected_with(
        &fixture,
        &[Part::File {
            name: "image",
            filename: "cat.tiff",
            bytes: &png,
        }],
        "Unsupported file type. Please upload a PNG/JPG/GIF/BMP/WEBP.",
    )
    .await;
}

#[actix_web::test]
async fn non_multipart_post_redirects() {
    let fixture = Fixture::new();
    let app = app!(fixture);

    let req = test::TestRequest::post()
        .uri("/predict")
        .insert_header((header::CONTENT_TYPE, "application/x-www-form-urlencoded"))
        .set_payload("image=cat.png")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(flash_of(&resp).as_deref(), Some("No file part in request."));
    assert_eq!(fixture.calls(), 0);
}

#[actix_web::test]
async fn flash_is_shown_once_then_cleared() {
    let fixture = Fixture::new();
    let app = app!(fixture);

    let req = test::TestRequest::get()
        .uri("/")
        .cookie(Cookie::new(FLASH_COOKIE, "No file selected."))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let removal = resp
        .response()
        .cookies()
        .find(|c| c.name() == FLASH_COOKIE)
        .unwrap();
    assert_eq!(removal.value(), "");
    assert_eq!(
        removal.max_age(),
        Some(actix_web::cookie::time::Duration::ZERO)
    );

    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("No file selected."));
}

#[actix_web::test]
async fn valid_upload_is_stored_classified_and_served() {
    let fixture = Fixture::new();
    let app = app!(fixture);
    let png = png_bytes();

    let resp = test::call_service(
        &app,
        predict_request(&[
            Part::Text {
                name: "comment",
                value: "ignored",
            },
            Part::File {
                name: "image",
                filename: "My Cat.PNG",
                bytes: &png,
            },
        ])
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(fixture.calls(), 1);

    let stored = fixture.stored_files();
    assert_eq!(stored.len(), 1);
    let storage_name = &stored[0];
    assert!(storage_name.ends_with("_My_Cat.PNG"), "{storage_name}");
    assert_eq!(storage_name.len(), "YYYYMMDD-HHMMSS_My_Cat.PNG".len());

    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let image_url = format!("/file/{}", storage_name);
    assert!(body.contains(&format!("src=\"{}\"", image_url)));
    assert!(!body.contains("My Cat.PNG"));
    let tabby = body.find("Tabby Cat").unwrap();
    let tiger = body.find("Tiger Cat").unwrap();
    assert!(tabby < tiger);
    assert!(body.contains("90.00%"));

    let served = test::call_service(&app, test::TestRequest::get().uri(&image_url).to_request()).await;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(
        served.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    assert_eq!(test::read_body(served).await.to_vec(), png);
}

#[actix_web::test]
async fn corrupt_image_is_a_generic_server_error() {
    let fixture = Fixture::new();
    let app = app!(fixture);

    let resp = test::call_service(
        &app,
        predict_request(&[Part::File {
            name: "image",
            filename: "broken.jpg",
            bytes: b"this is not a jpeg",
        }])
        .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(fixture.calls(), 0);
    assert_eq!(fixture.stored_files().len(), 1);

    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("500 Internal Server Error"));
    assert!(!body.contains("decode"));
}

#[actix_web::test]
async fn oversized_upload_is_rejected() {
    let fixture = Fixture::with_limit(16);
    let app = app!(fixture);
    let png = png_bytes();

    let resp = test::call_service(
        &app,
        predict_request(&[Part::File {
            name: "image",
            filename: "cat.png",
            bytes: &png,
        }])
        .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(fixture.calls(), 0);
    assert!(fixture.stored_files().is_empty());
}

#[actix_web::test]
async fn unknown_files_are_not_found() {
    let fixture = Fixture::new();
    std::fs::write(fixture.dir.path().join("kept.png"), png_bytes()).unwrap();
    let app = app!(fixture);

    for uri in [
        "/file/never-written.png",
        "/file/../../etc/passwd",
        "/file/",
    ] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/file/kept.png").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn health_reports_ok() {
    let fixture = Fixture::new();
    let app = app!(fixture);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}
