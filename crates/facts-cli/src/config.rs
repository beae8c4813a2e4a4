use std::collections::HashMap;

use thiserror::Error;

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const GEMINI_MODEL_ENV: &str = "GEMINI_MODEL";
pub const CURSEFORGE_API_KEY_ENV: &str = "CURSEFORGE_API_KEY";
pub const STEAM_LANGUAGE_ENV: &str = "STEAM_LANGUAGE";
pub const STEAM_COUNTRY_CODE_ENV: &str = "STEAM_COUNTRY_CODE";
pub const TIMEOUT_SECS_ENV: &str = "STREAMTITLE_TIMEOUT_SECS";
pub const RETRY_MAX_ATTEMPTS_ENV: &str = "STREAMTITLE_RETRY_MAX_ATTEMPTS";
pub const LOG_FILTER_ENV: &str = "STREAMTITLE_LOG";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_STEAM_LANGUAGE: &str = "en";
pub const DEFAULT_STEAM_COUNTRY_CODE: &str = "us";
pub const DEFAULT_LOG_FILTER: &str = "warn";

pub const PROVIDER_TIMEOUT_SECS: u64 = 8;
const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 30;

pub const PROVIDER_RETRY_MAX_ATTEMPTS: usize = 1;
const MAX_RETRY_ATTEMPTS: usize = 3;
pub const PROVIDER_RETRY_BASE_BACKOFF_MS: u64 = 200;

pub const USER_AGENT: &str =
    "streamtitle-facts/0.3 (+https://github.com/streamtitle/streamtitle-facts)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub curseforge_api_key: Option<String>,
    pub steam_language: String,
    pub steam_country_code: String,
    pub timeout_secs: u64,
    pub retry_policy: RetryPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            curseforge_api_key: None,
            steam_language: DEFAULT_STEAM_LANGUAGE.to_string(),
            steam_country_code: DEFAULT_STEAM_COUNTRY_CODE.to_string(),
            timeout_secs: PROVIDER_TIMEOUT_SECS,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_pairs(std::env::vars())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env_map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        let timeout_secs = parse_timeout_secs(non_blank(&env_map, TIMEOUT_SECS_ENV))?;
        let max_attempts = parse_max_attempts(non_blank(&env_map, RETRY_MAX_ATTEMPTS_ENV))?;
        let steam_country_code =
            parse_country_code(non_blank(&env_map, STEAM_COUNTRY_CODE_ENV))?;

        Ok(Self {
            gemini_api_key: non_blank(&env_map, GEMINI_API_KEY_ENV).map(ToOwned::to_owned),
            gemini_model: non_blank(&env_map, GEMINI_MODEL_ENV)
                .unwrap_or(DEFAULT_GEMINI_MODEL)
                .to_string(),
            curseforge_api_key: non_blank(&env_map, CURSEFORGE_API_KEY_ENV)
                .map(ToOwned::to_owned),
            steam_language: non_blank(&env_map, STEAM_LANGUAGE_ENV)
                .map(str::to_ascii_lowercase)
                .unwrap_or_else(|| DEFAULT_STEAM_LANGUAGE.to_string()),
            steam_country_code,
            timeout_secs,
            retry_policy: RetryPolicy {
                max_attempts,
                ..RetryPolicy::default()
            },
        })
    }

    /// Every configured credential, for masking in logs and error output.
    pub fn secrets(&self) -> Vec<&str> {
        [
            self.gemini_api_key.as_deref(),
            self.curseforge_api_key.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

fn non_blank<'a>(env_map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env_map
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_timeout_secs(raw: Option<&str>) -> Result<u64, ConfigError> {
    let Some(value) = raw else {
        return Ok(PROVIDER_TIMEOUT_SECS);
    };

    let parsed = value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidTimeout(value.to_string()))?;

    Ok(parsed.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS))
}

fn parse_max_attempts(raw: Option<&str>) -> Result<usize, ConfigError> {
    let Some(value) = raw else {
        return Ok(PROVIDER_RETRY_MAX_ATTEMPTS);
    };

    let parsed = value
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidRetryAttempts(value.to_string()))?;

    Ok(parsed.clamp(1, MAX_RETRY_ATTEMPTS))
}

fn parse_country_code(raw: Option<&str>) -> Result<String, ConfigError> {
    let Some(value) = raw else {
        return Ok(DEFAULT_STEAM_COUNTRY_CODE.to_string());
    };

    let normalized = value.to_ascii_lowercase();
    let is_valid = normalized.len() == 2 && normalized.chars().all(|ch| ch.is_ascii_lowercase());
    if !is_valid {
        return Err(ConfigError::InvalidCountryCode(value.to_string()));
    }

    Ok(normalized)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: PROVIDER_RETRY_MAX_ATTEMPTS,
            base_backoff_ms: PROVIDER_RETRY_BASE_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    pub fn backoff_for_attempt(self, attempt: usize) -> u64 {
        if attempt <= 1 {
            return 0;
        }

        let shift = (attempt - 2).min(8);
        self.base_backoff_ms.saturating_mul(1_u64 << shift)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid STREAMTITLE_TIMEOUT_SECS: {0}")]
    InvalidTimeout(String),
    #[error("invalid STREAMTITLE_RETRY_MAX_ATTEMPTS: {0}")]
    InvalidRetryAttempts(String),
    #[error("invalid STEAM_COUNTRY_CODE: {0} (expected 2-letter code)")]
    InvalidCountryCode(String),
}
