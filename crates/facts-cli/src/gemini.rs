//! Blocking client for the Gemini `generateContent` endpoint.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::name_resolver::{CompletionApi, CompletionError, CompletionRequest};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: &str, model: &str) -> Self {
        Self::with_endpoint(client, DEFAULT_ENDPOINT, api_key, model)
    }

    pub fn with_endpoint(client: Client, endpoint: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn build_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl CompletionApi for GeminiClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = GenerateRequest::from_completion(request);

        let response = self
            .client
            .post(self.build_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .map_err(|error| CompletionError::Transport(error.without_url().to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|error| CompletionError::Transport(error.without_url().to_string()))?;

        parse_generate_response(status, &text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    generation_config: GenerationConfig,
}

impl GenerateRequest {
    fn from_completion(request: &CompletionRequest) -> Self {
        let system_instruction = (!request.system.is_empty()).then(|| SystemInstruction {
            parts: vec![Part {
                text: request.system.clone(),
            }],
        });

        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: request.user.clone(),
                }],
            }],
            system_instruction,
            generation_config: GenerationConfig {
                max_output_tokens: request.max_output_tokens,
                temperature: request.temperature,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// First text part of the first candidate.
pub fn parse_generate_response(status: u16, body: &str) -> Result<String, CompletionError> {
    let parsed = serde_json::from_str::<GenerateResponse>(body);

    if !(200..=299).contains(&status) {
        let message = parsed
            .ok()
            .and_then(|payload| payload.error)
            .map(|error| error.message.trim().to_string())
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(CompletionError::Http { status, message });
    }

    let payload =
        parsed.map_err(|error| CompletionError::InvalidResponse(error.to_string()))?;
    if let Some(error) = payload.error {
        return Err(CompletionError::InvalidResponse(error.message));
    }

    let text = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .map(|part| part.text)
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(CompletionError::EmptyResponse);
    }
    Ok(text)
}
