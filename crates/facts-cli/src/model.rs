use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PLATFORM: &str = "YouTube";
pub const DEFAULT_LANGUAGE: &str = "English";
pub const DEFAULT_DESCRIPTION_LENGTH: &str = "Medium";
pub const UNKNOWN_DEVELOPER: &str = "Unknown";

/// Creator preferences. Opaque to resolution; carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub platform: String,
    pub language: String,
    pub description_length: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            platform: DEFAULT_PLATFORM.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            description_length: DEFAULT_DESCRIPTION_LENGTH.to_string(),
            profile_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactSource {
    #[serde(rename = "Steam")]
    StorefrontCatalog,
    #[serde(rename = "Modrinth")]
    PackageRegistry,
    #[serde(rename = "CurseForge")]
    ModRegistry,
}

impl FactSource {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::StorefrontCatalog => "Steam",
            Self::PackageRegistry => "Modrinth",
            Self::ModRegistry => "CurseForge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameFact {
    pub name: String,
    pub description: String,
    pub genres: Vec<String>,
    pub developers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModpackFact {
    pub title: String,
    pub description: String,
    pub categories: Vec<String>,
    pub versions: Vec<String>,
    pub downloads: u64,
}

/// Verified record for one game or modpack, tagged by the source that produced it.
///
/// Serializes with a `source` discriminator (`Steam`, `Modrinth`, `CurseForge`)
/// next to the source-specific fields, which is the shape content generation
/// consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source")]
pub enum Fact {
    #[serde(rename = "Steam")]
    StorefrontCatalog(GameFact),
    #[serde(rename = "Modrinth")]
    PackageRegistry(ModpackFact),
    #[serde(rename = "CurseForge")]
    ModRegistry(ModpackFact),
}

impl Fact {
    pub fn source(&self) -> FactSource {
        match self {
            Self::StorefrontCatalog(_) => FactSource::StorefrontCatalog,
            Self::PackageRegistry(_) => FactSource::PackageRegistry,
            Self::ModRegistry(_) => FactSource::ModRegistry,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::StorefrontCatalog(game) => &game.name,
            Self::PackageRegistry(pack) | Self::ModRegistry(pack) => &pack.title,
        }
    }
}

/// Payload handed to content generation once a fact is found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationHandoff {
    pub facts: Fact,
    pub preferences: Preferences,
    pub original_query: String,
    pub canonical_name: String,
    pub resolved_at: String,
}

pub fn normalize_query(raw: &str) -> Result<String, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    Ok(value.to_string())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("game or modpack name is required")]
    EmptyQuery,
}
