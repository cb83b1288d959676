use neuroscan_model::InputSize;
use neuroscan_model::onnx::{OnnxConfig, optimization_level};
use neuroscan_web::state::DEFAULT_MAX_UPLOAD_BYTES;
use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub upload_dir: PathBuf,
    /// Side of the square model input, used when the model does not declare one
    pub img_size: u32,
    pub max_upload_bytes: usize,
    /// ORT graph optimization level, 0 to 3
    pub optimization_level: u8,
    pub intra_threads: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = OnnxConfig::default();
        Ok(Config {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse(&var, "PORT", 8000)?,
            model_path: var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            img_size: match parse(&var, "IMG_SIZE", InputSize::default().width)? {
                0 => return Err(ConfigError::InvalidValue("IMG_SIZE".to_string())),
                size => size,
            },
            max_upload_bytes: parse(&var, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            optimization_level: match parse(&var, "ORT_OPT_LEVEL", defaults.optimization_level)? {
                level if optimization_level(level).is_some() => level,
                _ => return Err(ConfigError::InvalidValue("ORT_OPT_LEVEL".to_string())),
            },
            intra_threads: var("ORT_INTRA_THREADS")
                .map(|v| {
                    v.parse()
                        .map_err(|_| ConfigError::InvalidValue("ORT_INTRA_THREADS".to_string()))
                })
                .transpose()?,
        })
    }

    pub fn onnx(&self) -> OnnxConfig {
        OnnxConfig {
            model_path: self.model_path.clone(),
            input_size: InputSize::square(self.img_size),
            optimization_level: self.optimization_level,
            intra_threads: self.intra_threads,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match var(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(var) => write!(f, "Invalid value for: {}", var),
        }
    }
}

impl std::error::Error for ConfigError {}
