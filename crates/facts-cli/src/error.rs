use serde_json::Value;

use crate::config::ConfigError;
use crate::model::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    User,
    Runtime,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Runtime => "runtime",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

pub const ERROR_CODE_USER_INVALID_INPUT: &str = "user.invalid_input";
pub const ERROR_CODE_USER_INVALID_CONFIG: &str = "user.invalid_config";
pub const ERROR_CODE_USER_NOT_FOUND: &str = "user.not_found";
pub const ERROR_CODE_RUNTIME_CLIENT_INIT: &str = "runtime.client_init_failed";
pub const ERROR_CODE_RUNTIME_PROVIDER: &str = "runtime.provider_failed";
pub const ERROR_CODE_RUNTIME_SERIALIZE: &str = "runtime.serialize_failed";

impl AppError {
    pub fn user(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::User,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn runtime(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Runtime,
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Extra structured context merged into the error envelope's `details`.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind {
            ErrorKind::User => 2,
            ErrorKind::Runtime => 1,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        Self::user(ERROR_CODE_USER_INVALID_INPUT, value.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::user(ERROR_CODE_USER_INVALID_CONFIG, value.to_string())
    }
}

const REDACTED: &str = "[REDACTED]";

/// Masks only the configured secret values, leaving user text such as
/// `name=value` intact.
pub fn mask_secret_values(input: &str, secrets: &[&str]) -> String {
    let mut output = input.to_string();
    for secret in secrets.iter().filter(|secret| !secret.is_empty()) {
        output = output.replace(secret, REDACTED);
    }
    output
}

/// Masks known secret values and `key=`-style query fragments.
pub fn redact_secrets(input: &str, secrets: &[&str]) -> String {
    let mut output = mask_secret_values(input, secrets);
    for pattern in ["key=", "api_key=", "x-api-key:", "x-goog-api-key:"] {
        output = redact_after_pattern(&output, pattern);
    }

    output
}

fn redact_after_pattern(input: &str, pattern: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut output = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find(pattern) {
        let value_start = cursor + found + pattern.len();
        let value_start = skip_whitespace(input, value_start);
        let value_end = find_value_end(input, value_start);

        output.push_str(&input[cursor..value_start]);
        if value_start < value_end && &input[value_start..value_end] != REDACTED {
            output.push_str(REDACTED);
        } else {
            output.push_str(&input[value_start..value_end]);
        }

        cursor = value_end;
    }

    output.push_str(&input[cursor..]);
    output
}

fn skip_whitespace(input: &str, mut index: usize) -> usize {
    let bytes = input.as_bytes();
    while index < bytes.len() && bytes[index].is_ascii_whitespace() {
        index += 1;
    }
    index
}

fn find_value_end(input: &str, mut index: usize) -> usize {
    let bytes = input.as_bytes();
    while index < bytes.len() {
        let byte = bytes[index];
        if byte.is_ascii_whitespace() || matches!(byte, b'&' | b',' | b';' | b')' | b'"') {
            break;
        }
        index += 1;
    }
    index
}
