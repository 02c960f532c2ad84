//! Stand-in home page for the classifier, with no inference behind it.

use actix_web::http::header::ContentType;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer};
use serde_json::json;
use std::env;

const DEFAULT_PORT: u16 = 8082;

fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn home() -> HttpResponse {
    let body = "<h1>Image Classifier</h1>\n\
                <p>The classifier is not deployed here yet. Check back soon.</p>";
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(shared::html::page("Image Classifier", body))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = match env::var("PORT") {
        Ok(value) => value.parse::<u16>().map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid PORT: {:?}", value),
            )
        })?,
        Err(_) => DEFAULT_PORT,
    };
    let bind_address = format!("{}:{}", host, port);

    log::info!("Starting placeholder server on {}", bind_address);

    HttpServer::new(|| {
        App::new()
            .wrap(Logger::default())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
