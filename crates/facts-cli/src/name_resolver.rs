use thiserror::Error;

pub const EXPANDER_PROMPT: &str = "You are a gaming expert. Your task is to expand abbreviations or correct typos in video game or modpack names. Examples:
- 'bg3' -> 'Baldur's Gate 3'
- 'cod mw3' -> 'Call of Duty: Modern Warfare III'
- 'elden ring' -> 'Elden Ring'
- 'stardew' -> 'Stardew Valley'
- 'ftb' -> 'Feed The Beast'
If it's ambiguous or not a game, just return the original text. Do not add any other text, just the name.";

pub const EXPANDER_MAX_OUTPUT_TOKENS: u32 = 100;
pub const EXPANDER_TEMPERATURE: f32 = 0.0;

/// Single-turn text completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn expand_name(query: &str) -> Self {
        Self {
            system: EXPANDER_PROMPT.to_string(),
            user: query.to_string(),
            max_output_tokens: EXPANDER_MAX_OUTPUT_TOKENS,
            temperature: EXPANDER_TEMPERATURE,
        }
    }
}

pub trait CompletionApi {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion transport error: {0}")]
    Transport(String),
    #[error("completion http error ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("invalid completion response: {0}")]
    InvalidResponse(String),
    #[error("completion returned no text")]
    EmptyResponse,
}

/// Best-effort expansion of abbreviated or misspelled names.
///
/// Never fails: a missing backend, a transport error, or an empty answer all
/// resolve to the query itself.
pub struct NameResolver {
    completion: Option<Box<dyn CompletionApi>>,
}

impl NameResolver {
    pub fn new(completion: Box<dyn CompletionApi>) -> Self {
        Self {
            completion: Some(completion),
        }
    }

    pub fn disabled() -> Self {
        Self { completion: None }
    }

    pub fn resolve(&self, query: &str) -> String {
        let Some(completion) = self.completion.as_ref() else {
            tracing::debug!("name expansion disabled, using query as-is");
            return query.to_string();
        };

        match completion.complete(&CompletionRequest::expand_name(query)) {
            Ok(candidate) => {
                let canonical = choose_canonical(query, &candidate);
                if canonical != query {
                    tracing::info!(query, canonical = %canonical, "expanded query");
                }
                canonical
            }
            Err(error) => {
                tracing::warn!(query, %error, "name expansion failed, using query as-is");
                query.to_string()
            }
        }
    }
}

/// Adopts `candidate` only when it is non-empty and differs from the query
/// ignoring case. Otherwise the query is returned byte-for-byte.
pub fn choose_canonical(query: &str, candidate: &str) -> String {
    let candidate = candidate.trim();
    if candidate.is_empty() || candidate.to_lowercase() == query.to_lowercase() {
        return query.to_string();
    }
    candidate.to_string()
}
