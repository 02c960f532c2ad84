use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::inference::model::InputLayout;
use crate::inference::preprocess::Normalization;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },
    #[error("Invalid model config: {0}")]
    Invalid(String),
}

/// Process-level settings, read from the environment (and `.env`) at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub model_config: PathBuf,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub const DEFAULT_PORT: u16 = 8081;
    pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

    pub fn from_env() -> Result<Self, ConfigError> {
        let install_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", Self::DEFAULT_PORT)?,
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| install_dir.join("uploads")),
            model_config: env::var("MODEL_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| install_dir.join("config/model.yaml")),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", Self::DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        Err(_) => Ok(default),
    }
}

/// Description of the pretrained classifier, loaded from `config/model.yaml`.
#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub version: Option<f32>,
    pub model: ModelSpec,
    #[serde(default)]
    pub image: ImageSpec,
    #[serde(default)]
    pub decode: DecodeSpec,
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct ModelSpec {
    pub path: PathBuf,
    pub labels: PathBuf,
    #[serde(default)]
    pub apply_softmax: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImageSpec {
    #[serde(default = "default_image_size")]
    pub size: u32,
    #[serde(default)]
    pub layout: InputLayout,
    #[serde(default)]
    pub normalization: Normalization,
}

#[derive(Debug, Deserialize)]
pub struct DecodeSpec {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_image_size() -> u32 {
    224
}

fn default_top_k() -> usize {
    shared::PredictionResult::MAX_LEN
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            size: default_image_size(),
            layout: InputLayout::default(),
            normalization: Normalization::default(),
        }
    }
}

impl Default for DecodeSpec {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

impl ModelConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_yaml(&config_str, base_dir).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parses a config document; relative paths inside it resolve against `base_dir`.
    pub fn from_yaml(config_str: &str, base_dir: PathBuf) -> Result<Self, ConfigError> {
        let mut config: ModelConfig =
            serde_yaml::from_str(config_str).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        config.base_dir = base_dir;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.image.size == 0 {
            return Err(ConfigError::Invalid("image.size must be positive".into()));
        }
        if !(1..=shared::PredictionResult::MAX_LEN).contains(&self.decode.top_k) {
            return Err(ConfigError::Invalid(format!(
                "decode.top_k must be between 1 and {}",
                shared::PredictionResult::MAX_LEN
            )));
        }
        Ok(())
    }

    pub fn model_path(&self) -> PathBuf {
        self.base_dir.join(&self.model.path)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.base_dir.join(&self.model.labels)
    }
}
