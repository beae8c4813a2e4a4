use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;
use thiserror::Error;

use crate::config::{RetryPolicy, RuntimeConfig, USER_AGENT};
use crate::model::{Fact, FactSource};

pub mod curseforge;
pub mod modrinth;
pub mod steam;

#[cfg(test)]
pub(crate) mod mock_server;

/// One external catalog that can turn a canonical name into a `Fact`.
///
/// `Ok(None)` means the source answered but had no usable match. Transport,
/// status, and payload problems come back as `Err` so the caller decides how
/// to continue.
pub trait FactProvider {
    fn source(&self) -> FactSource;

    /// Why this provider cannot be queried right now, if it cannot.
    fn skip_reason(&self) -> Option<&'static str> {
        None
    }

    fn search(&self, name: &str) -> Result<Option<Fact>, ProviderError>;
}

pub fn build_http_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|error| ProviderError::Transport(error.to_string()))
}

/// Providers in waterfall order: storefront first, most specialized last.
pub fn default_providers(
    config: &RuntimeConfig,
    client: &Client,
) -> Vec<Box<dyn FactProvider>> {
    vec![
        Box::new(steam::SteamStoreProvider::new(
            client.clone(),
            config.retry_policy,
            &config.steam_language,
            &config.steam_country_code,
        )),
        Box::new(modrinth::ModrinthProvider::new(
            client.clone(),
            config.retry_policy,
        )),
        Box::new(curseforge::CurseForgeProvider::new(
            client.clone(),
            config.retry_policy,
            config.curseforge_api_key.clone(),
        )),
    ]
}

pub fn execute_with_retry<T, F, S>(
    provider_name: &'static str,
    policy: RetryPolicy,
    mut operation: F,
    mut sleep_fn: S,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Result<T, ProviderError>,
    S: FnMut(Duration),
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !error.retryable() || attempt == max_attempts {
                    return Err(error.with_provider(provider_name));
                }

                let delay = policy.backoff_for_attempt(attempt + 1);
                tracing::debug!(
                    provider = provider_name,
                    attempt,
                    delay_ms = delay,
                    %error,
                    "retrying provider call"
                );
                sleep_fn(Duration::from_millis(delay));
            }
        }
    }

    Err(ProviderError::InvalidResponse(format!(
        "{provider_name}: exhausted retry attempts"
    )))
}

pub(crate) fn execute_request(request: RequestBuilder) -> Result<String, ProviderError> {
    let response = request
        .send()
        .map_err(|error| ProviderError::Transport(error.without_url().to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|error| ProviderError::Transport(error.without_url().to_string()))?;

    check_status(status.as_u16(), &body)?;
    Ok(body)
}

pub(crate) fn check_status(status: u16, body: &str) -> Result<(), ProviderError> {
    if (200..=299).contains(&status) {
        return Ok(());
    }

    Err(ProviderError::Http {
        status,
        message: extract_error_message(body).unwrap_or_else(|| format!("HTTP {status}")),
    })
}

fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let json = serde_json::from_str::<Value>(trimmed).ok()?;
    let candidates = [
        json.get("description").and_then(Value::as_str),
        json.get("message").and_then(Value::as_str),
        json.get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str),
        json.get("error").and_then(Value::as_str),
        json.get("errorMessage").and_then(Value::as_str),
    ];

    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(ToOwned::to_owned)
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http error ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            ProviderError::InvalidResponse(_) => false,
        }
    }

    pub fn with_provider(self, provider: &'static str) -> Self {
        match self {
            ProviderError::Transport(message) => {
                ProviderError::Transport(format!("{provider}: {message}"))
            }
            ProviderError::Http { status, message } => ProviderError::Http {
                status,
                message: format!("{provider}: {message}"),
            },
            ProviderError::InvalidResponse(message) => {
                ProviderError::InvalidResponse(format!("{provider}: {message}"))
            }
        }
    }
}
