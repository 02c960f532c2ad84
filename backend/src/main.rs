use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use backend::config::{ModelConfig, ServerConfig};
use backend::inference::Predictor;
use backend::storage::UploadStore;
use backend::{configure_routes, AppState};
use std::env;

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = ServerConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;
    log::info!(
        "Upload directory: {}, model config: {}, max upload: {} bytes",
        config.upload_dir.display(),
        config.model_config.display(),
        config.max_upload_bytes
    );

    let model_config = ModelConfig::load(&config.model_config)
        .map_err(|e| startup_error("Model config loading failed", e))?;
    if let Some(version) = model_config.version {
        log::info!("Model config version {}", version);
    }
    let predictor = Predictor::from_config(&model_config)
        .map_err(|e| startup_error("Model loading failed", e))?;
    log::info!(
        "Model ready: {} ({}x{}, {:?})",
        model_config.model_path().display(),
        model_config.image.size,
        model_config.image.size,
        model_config.image.normalization
    );

    let store = UploadStore::new(config.upload_dir.clone());
    store.ensure_dir()?;

    let state = web::Data::new(AppState::new(predictor, store, config.max_upload_bytes));
    let bind_address = config.bind_address();

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
