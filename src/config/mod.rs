// ABOUTME: Receiver configuration from environment variables or a YAML file.
// ABOUTME: Validates required settings so the process refuses to start without them.

mod env_value;
mod size;

pub use env_value::{EnvValue, resolve_optional};
pub use size::parse_size;

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_WORK_DIR: &str = "WORK_DIR";
/// Older name for the work root, still honored when `WORK_DIR` is unset.
pub const ENV_WORK_DIR_FALLBACK: &str = "DESTINATION_DIR";
pub const ENV_SECRET_KEY: &str = "SECRET_KEY";
pub const ENV_INDEX_MESSAGE: &str = "INDEX_MESSAGE";
pub const ENV_MAX_UPLOAD_SIZE: &str = "MAX_UPLOAD_SIZE";
pub const ENV_PORT: &str = "PORT";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";

pub const DEFAULT_INDEX_MESSAGE: &str = "Hello, world!";
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 64 * 1024 * 1024;
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Shared secret for the deploy endpoint. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: PathBuf,
    pub secret_key: SecretKey,
    pub index_message: String,
    pub max_upload_size: usize,
    pub bind_addr: String,
    pub port: u16,
}

/// On-disk shape of the YAML config file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    work_dir: EnvValue,
    secret_key: EnvValue,
    #[serde(default)]
    index_message: Option<EnvValue>,
    #[serde(default)]
    max_upload_size: Option<SizeValue>,
    #[serde(default)]
    bind_addr: Option<String>,
    #[serde(default)]
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Bytes(usize),
    Text(EnvValue),
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let work_dir = get(ENV_WORK_DIR)
            .or_else(|| get(ENV_WORK_DIR_FALLBACK))
            .ok_or_else(|| Error::MissingEnvVar(ENV_WORK_DIR.to_string()))?;

        let secret_key =
            get(ENV_SECRET_KEY).ok_or_else(|| Error::MissingEnvVar(ENV_SECRET_KEY.to_string()))?;

        let max_upload_size = get(ENV_MAX_UPLOAD_SIZE)
            .map(|v| parse_size(&v).map_err(|e| invalid(ENV_MAX_UPLOAD_SIZE, e)))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE);

        let port = get(ENV_PORT)
            .map(|v| v.trim().parse::<u16>().map_err(|e| invalid(ENV_PORT, e)))
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        let config = Config {
            work_dir: PathBuf::from(work_dir),
            secret_key: SecretKey::new(secret_key),
            index_message: get(ENV_INDEX_MESSAGE)
                .unwrap_or_else(|| DEFAULT_INDEX_MESSAGE.to_string()),
            max_upload_size,
            bind_addr: get(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: FileConfig = serde_yaml::from_str(yaml)?;

        let max_upload_size = match file.max_upload_size {
            None => DEFAULT_MAX_UPLOAD_SIZE,
            Some(SizeValue::Bytes(n)) => n,
            Some(SizeValue::Text(value)) => {
                parse_size(&value.resolve()?).map_err(|e| invalid("max_upload_size", e))?
            }
        };

        let config = Config {
            work_dir: PathBuf::from(file.work_dir.resolve()?),
            secret_key: SecretKey::new(file.secret_key.resolve()?),
            index_message: resolve_optional(file.index_message.as_ref())?
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_INDEX_MESSAGE.to_string()),
            max_upload_size,
            bind_addr: file
                .bind_addr
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port: file.port.unwrap_or(DEFAULT_PORT),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Read only the work root from a YAML config file.
    ///
    /// Other settings are parsed but not resolved, so a secret that lives in
    /// an unset environment variable does not matter here.
    pub fn load_work_dir(path: &Path) -> Result<PathBuf> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::work_dir_from_yaml(&content)
    }

    pub fn work_dir_from_yaml(yaml: &str) -> Result<PathBuf> {
        let file: FileConfig = serde_yaml::from_str(yaml)?;
        let work_dir = file.work_dir.resolve()?;
        if work_dir.is_empty() {
            return Err(Error::InvalidConfig("work_dir must not be empty".to_string()));
        }
        Ok(PathBuf::from(work_dir))
    }

    /// Load from `path` when given, otherwise from the environment.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::from_env(),
        }
    }

    /// Socket address to listen on.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn validate(&self) -> Result<()> {
        if self.work_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("work_dir must not be empty".to_string()));
        }

        let secret = self.secret_key.expose();
        if secret.is_empty() {
            return Err(Error::InvalidConfig("secret_key must not be empty".to_string()));
        }
        // Bearer tokens are a single whitespace-free word.
        if secret.chars().any(char::is_whitespace) {
            return Err(Error::InvalidConfig(
                "secret_key must not contain whitespace".to_string(),
            ));
        }

        if self.max_upload_size == 0 {
            return Err(Error::InvalidConfig(
                "max_upload_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, err: impl std::fmt::Display) -> Error {
    Error::InvalidConfig(format!("{}: {}", field, err))
}
