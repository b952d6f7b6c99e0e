//! Configuration loading for fruitscand.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.fruitscan/config.toml` (user)
//! 3. `/etc/fruitscan/config.toml` (system)
//!
//! When none of these exist the built-in defaults are used, so the daemon runs
//! out of the box next to a `fruitscan.onnx` file.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::model::Device;
use crate::preprocess::{DEFAULT_INPUT_SIZE, Preprocessor, ResizeFilter};
use crate::types::ClassTable;
use crate::{FruitscanError, Result};

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:8000).
    #[serde(default = "default_address")]
    pub address: String,
    /// Map errors to 4xx/5xx statuses instead of always answering 200.
    #[serde(default)]
    pub strict_status: bool,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            strict_status: false,
            limits: LimitsConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:8000".to_string()
}

/// Resource limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes (default: 10 MiB).
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
    /// Maximum inferences in flight at once (default: 4).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_inferences: usize,
    /// Time a request may wait for and spend in inference, in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub inference_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload(),
            max_concurrent_inferences: default_max_concurrent(),
            inference_timeout_secs: default_timeout(),
        }
    }
}

impl LimitsConfig {
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }
}

fn default_max_upload() -> usize {
    10 * 1024 * 1024
}

fn default_max_concurrent() -> usize {
    4
}

fn default_timeout() -> u64 {
    30
}

/// Cross-origin policy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// The model artifact and the labels that belong to it.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX model (default: fruitscan.onnx).
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    /// Labels file; the built-in leaf classes when unset.
    #[serde(default)]
    pub labels: Option<PathBuf>,
    /// Square input resolution the model was trained at (default: 256).
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default)]
    pub resize_filter: ResizeFilter,
    /// Apply softmax to the model output (for graphs exported without one).
    #[serde(default)]
    pub softmax: bool,
    /// Device to use: "cpu", "cuda" or "cuda:N" (default: "cpu").
    #[serde(default = "default_device")]
    pub device: String,
    /// Intra-op threads for the runtime; 0 keeps its default.
    #[serde(default)]
    pub intra_threads: usize,
    /// Name of the score output; the first model output when unset.
    #[serde(default)]
    pub output_name: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            labels: None,
            input_size: default_input_size(),
            resize_filter: ResizeFilter::default(),
            softmax: false,
            device: default_device(),
            intra_threads: 0,
            output_name: None,
        }
    }
}

fn default_model_path() -> PathBuf {
    PathBuf::from("fruitscan.onnx")
}

fn default_input_size() -> u32 {
    DEFAULT_INPUT_SIZE
}

fn default_device() -> String {
    "cpu".to_string()
}

impl ModelConfig {
    /// Class table for this model: the labels file if set, else the built-in table.
    pub fn class_table(&self) -> Result<ClassTable> {
        match &self.labels {
            Some(path) => ClassTable::load(path),
            None => Ok(ClassTable::builtin()),
        }
    }

    pub fn preprocessor(&self) -> Result<Preprocessor> {
        Preprocessor::new(self.input_size, self.resize_filter)
    }

    pub fn device(&self) -> Result<Device> {
        Device::parse(&self.device)
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided, must exist)
    /// 2. `~/.fruitscan/config.toml`
    /// 3. `/etc/fruitscan/config.toml`
    /// 4. Built-in defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => {
                info!(path = %path.display(), "loading configuration");
                let content = fs::read_to_string(&path).map_err(|e| {
                    FruitscanError::Configuration(format!(
                        "Failed to read config file {path:?}: {e}"
                    ))
                })?;
                toml::from_str(&content).map_err(|e| {
                    FruitscanError::Configuration(format!(
                        "Failed to parse config file {path:?}: {e}"
                    ))
                })
            }
            None => {
                info!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            FruitscanError::Configuration(format!("Failed to parse config: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(FruitscanError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".fruitscan").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/fruitscan/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.address, "0.0.0.0:8000");
        assert!(!config.server.strict_status);
        assert_eq!(config.server.limits.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.server.limits.max_concurrent_inferences, 4);
        assert_eq!(config.server.limits.inference_timeout(), Duration::from_secs(30));
        assert!(config.server.cors.allowed_origins.is_empty());
        assert_eq!(config.model.path, PathBuf::from("fruitscan.onnx"));
        assert_eq!(config.model.input_size, 256);
        assert_eq!(config.model.resize_filter, ResizeFilter::CatmullRom);
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [server]
            address = "127.0.0.1:9000"
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.server.address, "127.0.0.1:9000");
        // Defaults preserved
        assert_eq!(config.server.limits.max_concurrent_inferences, 4);
        assert_eq!(config.model.device, "cpu");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [server]
            address = "127.0.0.1:8000"
            strict_status = true

            [server.limits]
            max_upload_bytes = 1048576
            max_concurrent_inferences = 2
            inference_timeout_secs = 5

            [server.cors]
            allowed_origins = ["https://fruitscan.example"]

            [model]
            path = "/opt/models/leaves.onnx"
            labels = "/opt/models/leaves.toml"
            input_size = 224
            resize_filter = "triangle"
            softmax = true
            intra_threads = 2
            output_name = "probs"
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        assert!(config.server.strict_status);
        assert_eq!(config.server.limits.max_upload_bytes, 1_048_576);
        assert_eq!(config.server.limits.inference_timeout(), Duration::from_secs(5));
        assert_eq!(config.server.cors.allowed_origins, vec!["https://fruitscan.example"]);
        assert_eq!(config.model.path, PathBuf::from("/opt/models/leaves.onnx"));
        assert_eq!(config.model.labels, Some(PathBuf::from("/opt/models/leaves.toml")));
        assert_eq!(config.model.resize_filter, ResizeFilter::Triangle);
        assert!(config.model.softmax);
        assert_eq!(config.model.output_name.as_deref(), Some("probs"));

        let pre = config.model.preprocessor().unwrap();
        assert_eq!(pre.input_shape(), [1, 224, 224, 3]);
    }

    #[test]
    fn unknown_filter_is_a_parse_error() {
        let err = Config::from_toml_str("[model]\nresize_filter = \"sinc\"").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[model]\npath = \"other.onnx\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.model.path, PathBuf::from("other.onnx"));
    }

    #[test]
    fn labels_default_to_builtin_table() {
        let table = ModelConfig::default().class_table().unwrap();
        assert_eq!(table, ClassTable::builtin());
    }

    #[test]
    fn labels_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.toml");
        fs::write(
            &path,
            "[[class]]\nfruit = \"Peach\"\ncondition = \"Bacterial spot\"\n",
        )
        .unwrap();

        let model = ModelConfig {
            labels: Some(path),
            ..Default::default()
        };
        let table = model.class_table().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().fruit, "Peach");
    }
}
