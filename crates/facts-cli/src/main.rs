use std::io::IsTerminal;

use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use facts_cli::{
    config::{DEFAULT_LOG_FILTER, LOG_FILTER_ENV, RuntimeConfig},
    error::{
        AppError, ERROR_CODE_RUNTIME_CLIENT_INIT, ERROR_CODE_RUNTIME_PROVIDER,
        ERROR_CODE_RUNTIME_SERIALIZE, ERROR_CODE_USER_INVALID_CONFIG, ERROR_CODE_USER_NOT_FOUND,
        mask_secret_values, redact_secrets,
    },
    model::{
        DEFAULT_DESCRIPTION_LENGTH, DEFAULT_LANGUAGE, DEFAULT_PLATFORM, FactSource,
        GenerationHandoff, Preferences, normalize_query,
    },
    normalize::NotFound,
    resolver::{FactResolver, ResolutionOutcome, SourceAttempt},
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Resolve verified game and modpack facts from Steam, Modrinth, and CurseForge"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Expand the query, then search each source in priority order.
    Resolve {
        #[arg(long)]
        query: String,
        #[arg(long, default_value = DEFAULT_PLATFORM)]
        platform: String,
        #[arg(long, default_value = DEFAULT_LANGUAGE)]
        language: String,
        #[arg(long, default_value = DEFAULT_DESCRIPTION_LENGTH)]
        description_length: String,
        #[arg(long)]
        profile_id: Option<String>,
    },
    /// Expand an abbreviated or misspelled game name.
    Expand {
        #[arg(long)]
        query: String,
    },
    /// Search a single source without expansion or fallback.
    Search {
        #[arg(long, value_enum)]
        source: SourceArg,
        #[arg(long)]
        name: String,
    },
}

const ENVELOPE_SCHEMA_VERSION: &str = "v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    Steam,
    Modrinth,
    Curseforge,
}

impl From<SourceArg> for FactSource {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Steam => FactSource::StorefrontCatalog,
            SourceArg::Modrinth => FactSource::PackageRegistry,
            SourceArg::Curseforge => FactSource::ModRegistry,
        }
    }
}

impl Cli {
    fn command_name(&self) -> &'static str {
        match &self.command {
            Commands::Resolve { .. } => "facts.resolve",
            Commands::Expand { .. } => "facts.expand",
            Commands::Search { .. } => "facts.search",
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let command = cli.command_name();

    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            let error = AppError::from(error);
            emit_error(command, &error, &[]);
            std::process::exit(error.exit_code());
        }
    };

    match run(cli, &config) {
        Ok(output) => println!("{output}"),
        Err(error) => {
            emit_error(command, &error, &config.secrets());
            std::process::exit(error.exit_code());
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

fn run(cli: Cli, config: &RuntimeConfig) -> Result<String, AppError> {
    let resolver = FactResolver::from_config(config)
        .map_err(|error| AppError::runtime(ERROR_CODE_RUNTIME_CLIENT_INIT, error.to_string()))?;
    run_with(cli, &resolver, Utc::now)
}

fn run_with<N>(cli: Cli, resolver: &FactResolver, now_fn: N) -> Result<String, AppError>
where
    N: Fn() -> DateTime<Utc>,
{
    let command = cli.command_name();

    match cli.command {
        Commands::Resolve {
            query,
            platform,
            language,
            description_length,
            profile_id,
        } => {
            let preferences = Preferences {
                platform,
                language,
                description_length,
                profile_id,
            };
            normalize_query(&query)?;
            let resolution = resolver.resolve(&query, &preferences);

            match resolution.outcome {
                ResolutionOutcome::Found(facts) => {
                    let handoff = GenerationHandoff {
                        facts,
                        preferences,
                        original_query: query,
                        canonical_name: resolution.canonical_name,
                        resolved_at: now_fn().to_rfc3339_opts(SecondsFormat::Secs, true),
                    };
                    render_json_envelope(command, &handoff)
                }
                ResolutionOutcome::NotFound(not_found) => Err(not_found_error(&not_found)?),
            }
        }
        Commands::Expand { query } => {
            let normalized = normalize_query(&query)?;
            let canonical_name = resolver.canonical_name(&normalized);
            let expanded = canonical_name != normalized;

            render_json_envelope(
                command,
                &json!({
                    "original_query": query,
                    "canonical_name": canonical_name,
                    "expanded": expanded,
                }),
            )
        }
        Commands::Search { source, name } => {
            let name = normalize_query(&name)?;
            let source = FactSource::from(source);

            let fact = match resolver.search_source(source, &name) {
                Some(SourceAttempt::Hit(fact)) => Some(fact),
                Some(SourceAttempt::Miss) => None,
                Some(SourceAttempt::Skipped(reason)) => {
                    return Err(AppError::user(
                        ERROR_CODE_USER_INVALID_CONFIG,
                        format!("{} search unavailable: {reason}", source.display_name()),
                    ));
                }
                Some(SourceAttempt::Failed(error)) => {
                    return Err(AppError::runtime(
                        ERROR_CODE_RUNTIME_PROVIDER,
                        error.to_string(),
                    ));
                }
                None => {
                    return Err(AppError::runtime(
                        ERROR_CODE_RUNTIME_PROVIDER,
                        format!("no {} provider configured", source.display_name()),
                    ));
                }
            };

            render_json_envelope(command, &json!({ "source": source, "fact": fact }))
        }
    }
}

fn not_found_error(not_found: &NotFound) -> Result<AppError, AppError> {
    let details = serde_json::to_value(not_found).map_err(|error| {
        AppError::runtime(
            ERROR_CODE_RUNTIME_SERIALIZE,
            format!("failed to serialize not-found payload: {error}"),
        )
    })?;

    Ok(AppError::user(ERROR_CODE_USER_NOT_FOUND, not_found.reason.clone()).with_details(details))
}

fn render_json_envelope<T: Serialize>(command: &str, result: &T) -> Result<String, AppError> {
    let result = serde_json::to_value(result).map_err(|error| {
        AppError::runtime(
            ERROR_CODE_RUNTIME_SERIALIZE,
            format!("failed to serialize output: {error}"),
        )
    })?;
    serde_json::to_string(&json!({
        "schema_version": ENVELOPE_SCHEMA_VERSION,
        "command": command,
        "ok": true,
        "result": result,
    }))
    .map_err(|error| {
        AppError::runtime(
            ERROR_CODE_RUNTIME_SERIALIZE,
            format!("failed to serialize output envelope: {error}"),
        )
    })
}

fn error_envelope(command: &str, error: &AppError, secrets: &[&str]) -> Value {
    let mut details = json!({
        "kind": error.kind.as_str(),
        "exit_code": error.exit_code(),
    });
    if let (Some(Value::Object(extra)), Some(target)) =
        (&error.details, details.as_object_mut())
    {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }

    json!({
        "schema_version": ENVELOPE_SCHEMA_VERSION,
        "command": command,
        "ok": false,
        "error": {
            "code": error.code,
            "message": redact_message(error, secrets),
            "details": details,
        }
    })
}

/// NotFound messages quote the user's query, so only configured secrets are
/// masked there.
fn redact_message(error: &AppError, secrets: &[&str]) -> String {
    if error.code == ERROR_CODE_USER_NOT_FOUND {
        return mask_secret_values(&error.message, secrets);
    }
    redact_secrets(&error.message, secrets)
}

fn emit_error(command: &str, error: &AppError, secrets: &[&str]) {
    println!("{}", error_envelope(command, error, secrets));
}
