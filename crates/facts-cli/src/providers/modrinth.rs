use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::RetryPolicy;
use crate::model::{Fact, FactSource};
use crate::normalize::package_registry_fact;

use super::{FactProvider, ProviderError, execute_request, execute_with_retry};

const PROVIDER_NAME: &str = "modrinth";
pub const API_BASE_URL: &str = "https://api.modrinth.com";
const SEARCH_PATH: &str = "/v2/search";
const MODPACK_FACETS: &str = r#"[["project_type:modpack"]]"#;

#[derive(Debug, Clone)]
pub struct ModrinthProvider {
    client: Client,
    base_url: String,
    retry_policy: RetryPolicy,
}

impl ModrinthProvider {
    pub fn new(client: Client, retry_policy: RetryPolicy) -> Self {
        Self::with_base_url(client, API_BASE_URL, retry_policy)
    }

    pub fn with_base_url(client: Client, base_url: &str, retry_policy: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_policy,
        }
    }

    fn search_once(&self, name: &str) -> Result<Option<ModrinthHit>, ProviderError> {
        let query = SearchQuery {
            query: name,
            limit: 1,
            facets: MODPACK_FACETS,
        };

        let url = format!("{}{SEARCH_PATH}", self.base_url);
        let body = execute_request(self.client.get(url).query(&query))?;
        parse_search_response(&body)
    }
}

impl FactProvider for ModrinthProvider {
    fn source(&self) -> FactSource {
        FactSource::PackageRegistry
    }

    fn search(&self, name: &str) -> Result<Option<Fact>, ProviderError> {
        let hit = execute_with_retry(
            PROVIDER_NAME,
            self.retry_policy,
            || self.search_once(name),
            std::thread::sleep,
        )?;

        hit.map(package_registry_fact).transpose()
    }
}

#[derive(Debug, Serialize)]
struct SearchQuery<'a> {
    query: &'a str,
    limit: u8,
    facets: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<ModrinthHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ModrinthHit {
    #[serde(default)]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) categories: Vec<String>,
    #[serde(default)]
    pub(crate) versions: Vec<String>,
    #[serde(default)]
    pub(crate) downloads: u64,
}

fn parse_search_response(body: &str) -> Result<Option<ModrinthHit>, ProviderError> {
    let payload: SearchResponse = serde_json::from_str(body)
        .map_err(|error| ProviderError::InvalidResponse(format!("search payload: {error}")))?;

    Ok(payload.hits.into_iter().next())
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::model::ModpackFact;
    use crate::providers::build_http_client;
    use crate::providers::mock_server::{MockResponse, MockServer, SilentServer};

    fn provider_at(base_url: &str, timeout_secs: u64) -> ModrinthProvider {
        ModrinthProvider::with_base_url(
            build_http_client(timeout_secs).expect("client"),
            base_url,
            RetryPolicy::default(),
        )
    }

    #[test]
    fn modrinth_search_asks_for_one_modpack_hit() {
        let server = MockServer::spawn(vec![MockResponse::json(
            200,
            "OK",
            r#"{"hits": [{"title": "Fabulously Optimized", "downloads": 10}]}"#,
        )]);

        let fact = provider_at(&server.base_url, 5)
            .search("fabulously optimized")
            .expect("search")
            .expect("fact");

        assert_eq!(fact.name(), "Fabulously Optimized");
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].target,
            "/v2/search?query=fabulously+optimized&limit=1\
             &facets=%5B%5B%22project_type%3Amodpack%22%5D%5D"
        );
        server.join();
    }

    #[test]
    fn modrinth_search_server_error_is_http_error() {
        let server = MockServer::spawn(vec![MockResponse::json(
            502,
            "Bad Gateway",
            r#"{"error": "bad_gateway", "description": "upstream down"}"#,
        )]);

        let error = provider_at(&server.base_url, 5)
            .search("pack")
            .expect_err("must fail");

        assert_eq!(
            error,
            ProviderError::Http {
                status: 502,
                message: "modrinth: upstream down".to_string(),
            }
        );
        server.join();
    }

    #[test]
    fn modrinth_search_times_out_on_silent_server() {
        let server = SilentServer::bind();
        let started = Instant::now();

        let error = provider_at(&server.base_url, 1)
            .search("pack")
            .expect_err("must time out");

        assert!(matches!(error, ProviderError::Transport(_)), "{error:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn modrinth_search_maps_first_hit_fields() {
        let body = r#"{
            "hits": [
                {
                    "project_id": "1KVo5zza",
                    "project_type": "modpack",
                    "title": "Fabulously Optimized",
                    "description": "Improve your graphics and performance.",
                    "categories": ["optimization", "fabric"],
                    "versions": ["1.20.1", "1.20.4"],
                    "downloads": 8123456
                }
            ],
            "offset": 0,
            "limit": 1,
            "total_hits": 42
        }"#;

        let hit = parse_search_response(body).expect("parse").expect("hit");
        let fact = package_registry_fact(hit).expect("fact");

        assert_eq!(
            fact,
            Fact::PackageRegistry(ModpackFact {
                title: "Fabulously Optimized".to_string(),
                description: "Improve your graphics and performance.".to_string(),
                categories: vec!["optimization".to_string(), "fabric".to_string()],
                versions: vec!["1.20.1".to_string(), "1.20.4".to_string()],
                downloads: 8123456,
            })
        );
    }

    #[test]
    fn modrinth_search_passes_versions_through_unchanged() {
        let body = r#"{"hits": [{"title": "Pack", "versions": ["1.19.2", "1.19.2"]}]}"#;

        let hit = parse_search_response(body).expect("parse").expect("hit");
        let Fact::PackageRegistry(pack) = package_registry_fact(hit).expect("fact") else {
            panic!("expected package registry fact");
        };

        assert_eq!(pack.versions, vec!["1.19.2", "1.19.2"]);
        assert_eq!(pack.downloads, 0);
    }

    #[test]
    fn modrinth_search_without_hits_is_a_miss() {
        let body = r#"{"hits": [], "offset": 0, "limit": 1, "total_hits": 0}"#;
        assert!(parse_search_response(body).expect("parse").is_none());
    }

    #[test]
    fn modrinth_search_rejects_malformed_payload() {
        let error = parse_search_response(r#"{"hits": "nope"}"#).expect_err("must fail");
        assert!(matches!(error, ProviderError::InvalidResponse(_)));
    }
}
