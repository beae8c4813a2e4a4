use std::collections::HashMap;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::RetryPolicy;
use crate::model::{Fact, FactSource};
use crate::normalize::storefront_fact;

use super::{FactProvider, ProviderError, execute_request, execute_with_retry};

const PROVIDER_NAME: &str = "steam";
pub const STORE_BASE_URL: &str = "https://store.steampowered.com";
const SEARCH_PATH: &str = "/api/storesearch/";
const DETAILS_PATH: &str = "/api/appdetails";

#[derive(Debug, Clone)]
pub struct SteamStoreProvider {
    client: Client,
    base_url: String,
    retry_policy: RetryPolicy,
    language: String,
    country_code: String,
}

impl SteamStoreProvider {
    pub fn new(
        client: Client,
        retry_policy: RetryPolicy,
        language: &str,
        country_code: &str,
    ) -> Self {
        Self::with_base_url(client, STORE_BASE_URL, retry_policy, language, country_code)
    }

    pub fn with_base_url(
        client: Client,
        base_url: &str,
        retry_policy: RetryPolicy,
        language: &str,
        country_code: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_policy,
            language: language.to_string(),
            country_code: country_code.to_string(),
        }
    }

    fn search_once(&self, term: &str) -> Result<Option<u64>, ProviderError> {
        let query = StoreSearchQuery {
            term,
            l: &self.language,
            cc: &self.country_code,
        };
        tracing::debug!(term, l = %self.language, cc = %self.country_code, "steam store search");

        let url = format!("{}{SEARCH_PATH}", self.base_url);
        let body = execute_request(self.client.get(url).query(&query))?;
        parse_search_response(&body)
    }

    fn details_once(&self, app_id: u64) -> Result<Option<AppData>, ProviderError> {
        let url = format!("{}{DETAILS_PATH}", self.base_url);
        let body = execute_request(
            self.client
                .get(url)
                .query(&[("appids", app_id.to_string())]),
        )?;
        parse_details_response(&body, app_id)
    }
}

impl FactProvider for SteamStoreProvider {
    fn source(&self) -> FactSource {
        FactSource::StorefrontCatalog
    }

    fn search(&self, name: &str) -> Result<Option<Fact>, ProviderError> {
        let app_id = execute_with_retry(
            PROVIDER_NAME,
            self.retry_policy,
            || self.search_once(name),
            std::thread::sleep,
        )?;
        let Some(app_id) = app_id else {
            return Ok(None);
        };
        tracing::info!(app_id, "found steam app id");

        let details = execute_with_retry(
            PROVIDER_NAME,
            self.retry_policy,
            || self.details_once(app_id),
            std::thread::sleep,
        )?;
        let Some(details) = details else {
            tracing::info!(app_id, "steam app details unavailable");
            return Ok(None);
        };

        storefront_fact(details).map(Some)
    }
}

#[derive(Debug, Serialize)]
struct StoreSearchQuery<'a> {
    term: &'a str,
    l: &'a str,
    cc: &'a str,
}

#[derive(Debug, Deserialize)]
struct StoreSearchResponse {
    #[serde(default)]
    items: Vec<StoreSearchItem>,
}

#[derive(Debug, Deserialize)]
struct StoreSearchItem {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct AppDetailsEntry {
    #[serde(default)]
    success: bool,
    data: Option<AppData>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AppData {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) short_description: String,
    pub(crate) genres: Option<Vec<AppGenre>>,
    pub(crate) developers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AppGenre {
    #[serde(default)]
    pub(crate) description: String,
}

/// First item only; the store's own ordering is the tie-break.
fn parse_search_response(body: &str) -> Result<Option<u64>, ProviderError> {
    let payload: StoreSearchResponse = serde_json::from_str(body)
        .map_err(|error| ProviderError::InvalidResponse(format!("store search payload: {error}")))?;

    Ok(payload.items.first().map(|item| item.id))
}

fn parse_details_response(body: &str, app_id: u64) -> Result<Option<AppData>, ProviderError> {
    let mut payload: HashMap<String, AppDetailsEntry> = serde_json::from_str(body)
        .map_err(|error| ProviderError::InvalidResponse(format!("app details payload: {error}")))?;

    let Some(entry) = payload.remove(&app_id.to_string()) else {
        return Ok(None);
    };

    if !entry.success {
        return Ok(None);
    }

    Ok(entry.data)
}
