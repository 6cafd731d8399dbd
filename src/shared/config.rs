//! Application configuration. Paths, site URLs, secrets, Câmara endpoint.

use crate::domain::DomainError;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_BASE_URL: &str = "http://localhost";
pub const DEFAULT_AVATAR: &str = "/assets/img/default_avatar.png";
pub const DEFAULT_CAMARA_API_URL: &str = "https://www.camara.leg.br/SitCamaraWS/Proposicoes.asmx";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const FALLBACK_CODE_WORD: &str = "plenario";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Directory holding plenario.db. Read from PLENARIO_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Public site root used to build profile URLs. Read from PLENARIO_BASE_URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Avatar shown for users without one. Read from PLENARIO_DEFAULT_AVATAR.
    #[serde(default)]
    pub default_avatar: Option<String>,

    /// Secret mixed into password digests. Read from PLENARIO_ENCODE_CODE_WORD.
    #[serde(default)]
    pub encode_code_word: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Câmara dos Deputados web service
    // ─────────────────────────────────────────────────────────────────────────
    /// Proposicoes.asmx endpoint. Read from PLENARIO_CAMARA_API_URL.
    #[serde(default)]
    pub camara_api_url: Option<String>,

    /// Request timeout in seconds. Read from PLENARIO_HTTP_TIMEOUT_SECS.
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Env (`PLENARIO_*`, `.env` included) plus the file named by `PLENARIO_CONFIG`, if set.
    pub fn load() -> Result<Self, DomainError> {
        dotenv::dotenv().ok();
        Self::load_from(std::env::var("PLENARIO_CONFIG").ok().as_deref())
    }

    /// Env plus an optional config file. A missing or malformed file is an error.
    pub fn load_from(file: Option<&str>) -> Result<Self, DomainError> {
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("PLENARIO"));
        if let Some(path) = file {
            c = c.add_source(config::File::with_name(path));
        }
        c.build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| DomainError::Config(e.to_string()))
    }

    pub fn data_dir_or_default(&self) -> String {
        non_empty(&self.data_dir).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
    }

    pub fn base_url_or_default(&self) -> String {
        non_empty(&self.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn default_avatar_or_default(&self) -> String {
        non_empty(&self.default_avatar).unwrap_or_else(|| DEFAULT_AVATAR.to_string())
    }

    /// Returns the password code word. Falls back to a built-in value (and warns) when unset.
    pub fn encode_code_word_or_default(&self) -> String {
        non_empty(&self.encode_code_word).unwrap_or_else(|| {
            warn!("PLENARIO_ENCODE_CODE_WORD not set; using built-in code word");
            FALLBACK_CODE_WORD.to_string()
        })
    }

    pub fn camara_api_url_or_default(&self) -> String {
        non_empty(&self.camara_api_url).unwrap_or_else(|| DEFAULT_CAMARA_API_URL.to_string())
    }

    pub fn http_timeout_secs_or_default(&self) -> u64 {
        self.http_timeout_secs
            .filter(|&s| s > 0)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
