use crate::ai::{HF_DEFAULT_MODEL_URL, OPENROUTER_DEFAULT_BASE_URL, OPENROUTER_DEFAULT_MODEL};
use crate::error::ConfigError;
use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

// Mirrors config.toml; every key is optional
#[derive(Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub bind: Option<String>,
    pub server_url: Option<String>,
    pub database_url: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: Option<String>,
    pub openrouter_model: Option<String>,
    pub hf_api_key: Option<String>,
    pub hf_model_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub bind: String,
    pub server_url: String,
    pub database_url: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    pub openrouter_model: String,
    pub hf_api_key: Option<String>,
    pub hf_model_url: String,
    pub request_timeout: Option<Duration>,
}

impl Config {
    /// Loads `config.toml` from the user config dir (if present), then
    /// applies environment overrides.
    pub fn load() -> Result<Config, ConfigError> {
        let file = match default_path() {
            Some(path) if path.exists() => read_file(&path)?,
            _ => FileConfig::default(),
        };
        Ok(Config::resolve(file, |key| env::var(key).ok()))
    }

    pub fn resolve(file: FileConfig, var: impl Fn(&str) -> Option<String>) -> Config {
        let pick = |key: &str, from_file: Option<String>| {
            var(key).filter(|v| !v.trim().is_empty()).or(from_file)
        };

        Config {
            bind: pick("DAILY_TASKS_BIND", file.bind).unwrap_or_else(|| DEFAULT_BIND.to_string()),
            server_url: pick("DAILY_TASKS_SERVER_URL", file.server_url)
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            database_url: pick("DATABASE_URL", file.database_url),
            openrouter_api_key: pick("OPENROUTER_API_KEY", file.openrouter_api_key),
            openrouter_base_url: pick("OPENROUTER_BASE_URL", file.openrouter_base_url)
                .unwrap_or_else(|| OPENROUTER_DEFAULT_BASE_URL.to_string()),
            openrouter_model: pick("OPENROUTER_MODEL", file.openrouter_model)
                .unwrap_or_else(|| OPENROUTER_DEFAULT_MODEL.to_string()),
            hf_api_key: pick("HF_API_KEY", file.hf_api_key),
            hf_model_url: pick("HF_MODEL_URL", file.hf_model_url)
                .unwrap_or_else(|| HF_DEFAULT_MODEL_URL.to_string()),
            request_timeout: timeout_secs(
                var("DAILY_TASKS_REQUEST_TIMEOUT_SECS"),
                file.request_timeout_secs,
            )
            .map(Duration::from_secs),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.bind.clone()))
    }
}

// A non-numeric env value is ignored in favour of the file
fn timeout_secs(from_env: Option<String>, from_file: Option<u64>) -> Option<u64> {
    match from_env.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => match raw.parse() {
            Ok(secs) => Some(secs),
            Err(_) => {
                tracing::warn!("ignoring DAILY_TASKS_REQUEST_TIMEOUT_SECS={:?}", raw);
                from_file
            }
        },
        None => from_file,
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("daily-tasks").join("config.toml"))
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}
