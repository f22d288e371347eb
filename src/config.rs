use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::SeqvaultError;

pub const DEFAULT_CONFIG_FILE: &str = "seqvault.json";
const CONFIG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub ncbi: NcbiSection,
    #[serde(default)]
    pub store: StoreSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NcbiSection {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub max_retries: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StoreSection {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NcbiSettings {
    pub email: Option<String>,
    pub api_key: Option<String>,
    pub tool: String,
    pub max_retries: usize,
    pub timeout_secs: u64,
}

impl Default for NcbiSettings {
    fn default() -> Self {
        Self {
            email: None,
            api_key: None,
            tool: "seqvault".to_string(),
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub ncbi: NcbiSettings,
    pub store_path: Utf8PathBuf,
}

/// Values taken from the process environment; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub ncbi_email: Option<String>,
    pub ncbi_api_key: Option<String>,
    pub store_path: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            ncbi_email: read("NCBI_EMAIL"),
            ncbi_api_key: read("NCBI_API_KEY"),
            store_path: read("SEQVAULT_STORE"),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SeqvaultError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| SeqvaultError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| SeqvaultError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config, EnvOverrides::from_env())
    }

    pub fn resolve_config(
        config: Config,
        env: EnvOverrides,
    ) -> Result<ResolvedConfig, SeqvaultError> {
        let schema_version = config.schema_version.unwrap_or(CONFIG_SCHEMA_VERSION);
        if schema_version != CONFIG_SCHEMA_VERSION {
            return Err(SeqvaultError::UnsupportedConfigVersion(schema_version));
        }
        let defaults = NcbiSettings::default();

        let ncbi = NcbiSettings {
            email: env.ncbi_email.or(config.ncbi.email),
            api_key: env.ncbi_api_key.or(config.ncbi.api_key),
            tool: config.ncbi.tool.unwrap_or(defaults.tool),
            max_retries: config.ncbi.max_retries.unwrap_or(defaults.max_retries),
            timeout_secs: config.ncbi.timeout_secs.unwrap_or(defaults.timeout_secs),
        };

        let store_path = match env.store_path.or(config.store.path) {
            Some(path) => Utf8PathBuf::from(path),
            None => default_store_path()?,
        };

        Ok(ResolvedConfig {
            schema_version,
            ncbi,
            store_path,
        })
    }
}

pub fn default_store_path() -> Result<Utf8PathBuf, SeqvaultError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(
                dirs.home_dir()
                    .join(".cache")
                    .join("seqvault")
                    .join("sequences.json"),
            )
            .ok()
        })
        .ok_or(SeqvaultError::StoreLocation)
}
