use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8081;
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANALYSIS_MAX_TOKENS: u32 = 800;
const DEFAULT_RERANK_MAX_TOKENS: u32 = 10;
const DEFAULT_CATALOG_BASE_URL: &str = "https://world.openfoodfacts.org";
const DEFAULT_CATALOG_PAGE_SIZE: u32 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

pub const CONFIG_PATH_VAR: &str = "NUTRISCAN_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Optional YAML overlay. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub vision_model: Option<String>,
    pub analysis_max_tokens: Option<u32>,
    pub rerank_max_tokens: Option<u32>,
    pub catalog_base_url: Option<String>,
    pub catalog_page_size: Option<u32>,
    pub catalog_user_agent: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub max_image_bytes: Option<usize>,
    pub static_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: String,
    pub base_url: Url,
    pub model: String,
    pub analysis_max_tokens: u32,
    pub rerank_max_tokens: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: Url,
    pub page_size: u32,
    pub user_agent: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub vision: VisionConfig,
    pub catalog: CatalogConfig,
    pub max_image_bytes: usize,
    pub static_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Reads the optional YAML file named by `NUTRISCAN_CONFIG`, then applies
    /// process environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) => FileConfig::load(Path::new(&path))?,
            None => FileConfig::default(),
        };
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    pub fn from_sources<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = env("OPENAI_API_KEY")
            .or(file.openai_api_key)
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let timeout_secs = parse_or(
            "REQUEST_TIMEOUT_SECS",
            env("REQUEST_TIMEOUT_SECS"),
            file.request_timeout_secs,
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_SECS",
                reason: "must be greater than zero".into(),
            });
        }
        let timeout = Duration::from_secs(timeout_secs);

        let vision = VisionConfig {
            api_key,
            base_url: parse_url(
                "OPENAI_BASE_URL",
                env("OPENAI_BASE_URL")
                    .or(file.openai_base_url)
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            )?,
            model: env("VISION_MODEL")
                .or(file.vision_model)
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            analysis_max_tokens: parse_or(
                "ANALYSIS_MAX_TOKENS",
                env("ANALYSIS_MAX_TOKENS"),
                file.analysis_max_tokens,
                DEFAULT_ANALYSIS_MAX_TOKENS,
            )?,
            rerank_max_tokens: parse_or(
                "RERANK_MAX_TOKENS",
                env("RERANK_MAX_TOKENS"),
                file.rerank_max_tokens,
                DEFAULT_RERANK_MAX_TOKENS,
            )?,
            timeout,
        };

        let catalog = CatalogConfig {
            base_url: parse_url(
                "CATALOG_BASE_URL",
                env("CATALOG_BASE_URL")
                    .or(file.catalog_base_url)
                    .unwrap_or_else(|| DEFAULT_CATALOG_BASE_URL.to_string()),
            )?,
            page_size: parse_or(
                "CATALOG_PAGE_SIZE",
                env("CATALOG_PAGE_SIZE"),
                file.catalog_page_size,
                DEFAULT_CATALOG_PAGE_SIZE,
            )?,
            user_agent: env("CATALOG_USER_AGENT")
                .or(file.catalog_user_agent)
                .unwrap_or_else(default_user_agent),
            timeout,
        };

        Ok(Self {
            host: env("HOST")
                .or(file.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("PORT", env("PORT"), file.port, DEFAULT_PORT)?,
            vision,
            catalog,
            max_image_bytes: parse_or(
                "MAX_IMAGE_BYTES",
                env("MAX_IMAGE_BYTES"),
                file.max_image_bytes,
                DEFAULT_MAX_IMAGE_BYTES,
            )?,
            static_dir: env("STATIC_DIR").map(PathBuf::from).or(file.static_dir),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_user_agent() -> String {
    format!("nutriscan/{}", env!("CARGO_PKG_VERSION"))
}

fn parse_or<T>(
    key: &'static str,
    from_env: Option<String>,
    from_file: Option<T>,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match from_env {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(from_file.unwrap_or(default)),
    }
}

fn parse_url(key: &'static str, raw: String) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("{} is not a base URL", raw),
        });
    }
    Ok(url)
}
