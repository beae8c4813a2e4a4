use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::RetryPolicy;
use crate::model::{Fact, FactSource};
use crate::normalize::mod_registry_fact;

use super::{FactProvider, ProviderError, execute_request, execute_with_retry};

const PROVIDER_NAME: &str = "curseforge";
pub const API_BASE_URL: &str = "https://api.curseforge.com";
const SEARCH_PATH: &str = "/v1/mods/search";
const API_KEY_HEADER: &str = "x-api-key";
pub const MINECRAFT_GAME_ID: u32 = 432;
pub const MODPACK_CLASS_ID: u32 = 4471;
const MISSING_KEY_REASON: &str = "missing CURSEFORGE_API_KEY";

#[derive(Debug, Clone)]
pub struct CurseForgeProvider {
    client: Client,
    base_url: String,
    retry_policy: RetryPolicy,
    api_key: Option<String>,
}

impl CurseForgeProvider {
    pub fn new(client: Client, retry_policy: RetryPolicy, api_key: Option<String>) -> Self {
        Self::with_base_url(client, API_BASE_URL, retry_policy, api_key)
    }

    pub fn with_base_url(
        client: Client,
        base_url: &str,
        retry_policy: RetryPolicy,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_policy,
            api_key,
        }
    }

    fn search_once(
        &self,
        api_key: &str,
        name: &str,
    ) -> Result<Option<CurseForgeMod>, ProviderError> {
        let query = SearchQuery {
            game_id: MINECRAFT_GAME_ID,
            search_filter: name,
            class_id: MODPACK_CLASS_ID,
            page_size: 1,
        };

        let url = format!("{}{SEARCH_PATH}", self.base_url);
        let body = execute_request(
            self.client
                .get(url)
                .header(reqwest::header::ACCEPT, "application/json")
                .header(API_KEY_HEADER, api_key)
                .query(&query),
        )?;
        parse_search_response(&body)
    }
}

impl FactProvider for CurseForgeProvider {
    fn source(&self) -> FactSource {
        FactSource::ModRegistry
    }

    fn skip_reason(&self) -> Option<&'static str> {
        self.api_key.is_none().then_some(MISSING_KEY_REASON)
    }

    fn search(&self, name: &str) -> Result<Option<Fact>, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::info!("curseforge api key not configured, skipping");
            return Ok(None);
        };

        let found = execute_with_retry(
            PROVIDER_NAME,
            self.retry_policy,
            || self.search_once(api_key, name),
            std::thread::sleep,
        )?;

        found.map(mod_registry_fact).transpose()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuery<'a> {
    game_id: u32,
    search_filter: &'a str,
    class_id: u32,
    page_size: u8,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<CurseForgeMod>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CurseForgeMod {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) summary: String,
    #[serde(default)]
    pub(crate) categories: Vec<CurseForgeCategory>,
    #[serde(default)]
    pub(crate) latest_files: Vec<CurseForgeFile>,
    #[serde(default)]
    pub(crate) download_count: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CurseForgeCategory {
    #[serde(default)]
    pub(crate) name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CurseForgeFile {
    pub(crate) game_version: Option<String>,
}

fn parse_search_response(body: &str) -> Result<Option<CurseForgeMod>, ProviderError> {
    let payload: SearchResponse = serde_json::from_str(body)
        .map_err(|error| ProviderError::InvalidResponse(format!("mods search payload: {error}")))?;

    Ok(payload.data.into_iter().next())
}
