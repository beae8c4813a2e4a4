//! Pure shaping of provider payloads into `Fact` records, and of a failed
//! resolution into the `NotFound` payload returned to callers.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Fact, FactSource, GameFact, ModpackFact, Preferences, UNKNOWN_DEVELOPER};
use crate::providers::ProviderError;
use crate::providers::curseforge::CurseForgeMod;
use crate::providers::modrinth::ModrinthHit;
use crate::providers::steam::AppData;

/// Genres default to empty and developers to `["Unknown"]` only when the
/// store omits the field; lists that are present pass through as-is.
pub(crate) fn storefront_fact(data: AppData) -> Result<Fact, ProviderError> {
    let name = required_name(&data.name, "app details")?;
    let genres = data
        .genres
        .unwrap_or_default()
        .into_iter()
        .map(|genre| genre.description)
        .collect();
    let developers = data
        .developers
        .unwrap_or_else(|| vec![UNKNOWN_DEVELOPER.to_string()]);

    Ok(Fact::StorefrontCatalog(GameFact {
        name,
        description: data.short_description,
        genres,
        developers,
    }))
}

pub(crate) fn package_registry_fact(hit: ModrinthHit) -> Result<Fact, ProviderError> {
    let title = required_name(&hit.title, "search hit")?;

    Ok(Fact::PackageRegistry(ModpackFact {
        title,
        description: hit.description,
        categories: hit.categories,
        versions: hit.versions,
        downloads: hit.downloads,
    }))
}

pub(crate) fn mod_registry_fact(found: CurseForgeMod) -> Result<Fact, ProviderError> {
    let title = required_name(&found.name, "mods search entry")?;
    let categories = found
        .categories
        .into_iter()
        .map(|category| category.name)
        .collect();
    // One entry per file, so the same game version shows up repeatedly.
    let versions = dedupe_preserving_order(
        found
            .latest_files
            .into_iter()
            .filter_map(|file| file.game_version),
    );

    Ok(Fact::ModRegistry(ModpackFact {
        title,
        description: found.summary,
        categories,
        versions,
        downloads: clamp_download_count(found.download_count),
    }))
}

pub fn dedupe_preserving_order<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

fn required_name(raw: &str, context: &str) -> Result<String, ProviderError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ProviderError::InvalidResponse(format!(
            "{context}: empty name"
        )));
    }
    Ok(name.to_string())
}

fn clamp_download_count(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    value.round() as u64
}

/// Terminal failure of a resolution: nothing matched in any source.
///
/// `original_query` and `preferences` are echoed back verbatim so a client
/// can restore its form state and offer a retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFound {
    pub reason: String,
    pub searched_name: String,
    pub original_query: String,
    pub preferences: Preferences,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_trace: Vec<String>,
    pub fallback_content: FallbackContent,
}

/// Ready-to-render placeholder content for a failed lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackContent {
    pub game: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub announcement: String,
    pub thumbnail_text: String,
}

pub fn build_not_found(
    searched_name: &str,
    original_query: &str,
    preferences: &Preferences,
    sources: &[FactSource],
    source_trace: Vec<String>,
) -> NotFound {
    let reason = format!(
        "Not found in {}. (Searched for: \"{searched_name}\")",
        describe_sources(sources)
    );
    let fallback_content = fallback_content(original_query, &reason);

    NotFound {
        reason,
        searched_name: searched_name.to_string(),
        original_query: original_query.to_string(),
        preferences: preferences.clone(),
        source_trace,
        fallback_content,
    }
}

fn fallback_content(original_query: &str, reason: &str) -> FallbackContent {
    FallbackContent {
        game: "Invalid Input".to_string(),
        title: "🎮 Error: Content Not Found".to_string(),
        description: format!(
            "The input '{original_query}' could not be found as a game or modpack.\n\nDetails: {reason}\n\nPlease check the spelling or try a different name."
        ),
        tags: vec![
            "error".to_string(),
            "invalid input".to_string(),
            "not found".to_string(),
        ],
        announcement: format!(
            "❌ **Error:** The game or modpack '{original_query}' was not found."
        ),
        thumbnail_text: "ERROR".to_string(),
    }
}

/// "Steam", "Steam or Modrinth", "Steam, Modrinth, or CurseForge".
fn describe_sources(sources: &[FactSource]) -> String {
    let names: Vec<&str> = sources.iter().map(|source| source.display_name()).collect();
    match names.as_slice() {
        [] => "any source".to_string(),
        [only] => (*only).to_string(),
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    }
}
