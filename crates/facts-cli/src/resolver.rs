use crate::config::RuntimeConfig;
use crate::gemini::GeminiClient;
use crate::model::{Fact, FactSource, Preferences};
use crate::name_resolver::NameResolver;
use crate::normalize::{NotFound, build_not_found};
use crate::providers::{FactProvider, ProviderError, build_http_client, default_providers};

/// What one provider contributed to a waterfall run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceAttempt {
    Hit(Fact),
    Miss,
    Skipped(&'static str),
    Failed(ProviderError),
}

impl SourceAttempt {
    pub fn trace_line(&self, source: FactSource) -> String {
        let name = source.display_name();
        match self {
            Self::Hit(fact) => format!("{name}: found \"{}\"", fact.name()),
            Self::Miss => format!("{name}: no results"),
            Self::Skipped(reason) => format!("{name}: skipped ({reason})"),
            Self::Failed(error) => format!("{name}: {error}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Found(Fact),
    NotFound(NotFound),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub canonical_name: String,
    pub outcome: ResolutionOutcome,
    pub source_trace: Vec<String>,
}

/// Name expansion followed by the fixed-priority provider waterfall.
pub struct FactResolver {
    names: NameResolver,
    providers: Vec<Box<dyn FactProvider>>,
}

impl FactResolver {
    pub fn new(names: NameResolver, providers: Vec<Box<dyn FactProvider>>) -> Self {
        Self { names, providers }
    }

    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ProviderError> {
        let client = build_http_client(config.timeout_secs)?;
        let names = match config.gemini_api_key.as_deref() {
            Some(api_key) => NameResolver::new(Box::new(GeminiClient::new(
                client.clone(),
                api_key,
                &config.gemini_model,
            ))),
            None => {
                tracing::info!("GEMINI_API_KEY not set, name expansion disabled");
                NameResolver::disabled()
            }
        };

        Ok(Self::new(names, default_providers(config, &client)))
    }

    pub fn canonical_name(&self, query: &str) -> String {
        self.names.resolve(query)
    }

    pub fn sources(&self) -> Vec<FactSource> {
        self.providers
            .iter()
            .map(|provider| provider.source())
            .collect()
    }

    /// Runs the full pipeline for a raw query.
    ///
    /// Always ends in `Found` or `NotFound`: provider failures are folded into
    /// the outcome, and `NotFound` echoes `query` exactly as given.
    pub fn resolve(&self, query: &str, preferences: &Preferences) -> Resolution {
        let canonical_name = self.canonical_name(query.trim());

        let mut source_trace = Vec::new();
        for provider in &self.providers {
            let source = provider.source();
            let attempt = self.attempt(provider.as_ref(), &canonical_name);
            source_trace.push(attempt.trace_line(source));

            if let SourceAttempt::Hit(fact) = attempt {
                tracing::info!(
                    source = source.display_name(),
                    name = fact.name(),
                    "fact resolved"
                );
                return Resolution {
                    canonical_name,
                    outcome: ResolutionOutcome::Found(fact),
                    source_trace,
                };
            }
        }

        let not_found = build_not_found(
            &canonical_name,
            query,
            preferences,
            &self.sources(),
            source_trace.clone(),
        );
        tracing::info!(searched = %canonical_name, "no source matched");

        Resolution {
            canonical_name,
            outcome: ResolutionOutcome::NotFound(not_found),
            source_trace,
        }
    }

    pub fn resolve_facts(&self, query: &str, preferences: &Preferences) -> ResolutionOutcome {
        self.resolve(query, preferences).outcome
    }

    /// One provider, no expansion and no fallback. `None` when no provider
    /// for `source` is configured.
    pub fn search_source(&self, source: FactSource, name: &str) -> Option<SourceAttempt> {
        self.providers
            .iter()
            .find(|provider| provider.source() == source)
            .map(|provider| self.attempt(provider.as_ref(), name))
    }

    fn attempt(&self, provider: &dyn FactProvider, name: &str) -> SourceAttempt {
        let source = provider.source().display_name();

        if let Some(reason) = provider.skip_reason() {
            tracing::info!(source, reason, "source skipped");
            return SourceAttempt::Skipped(reason);
        }

        tracing::info!(source, name, "searching source");
        match provider.search(name) {
            Ok(Some(fact)) => SourceAttempt::Hit(fact),
            Ok(None) => SourceAttempt::Miss,
            Err(error) => {
                tracing::warn!(source, %error, "source failed, trying next");
                SourceAttempt::Failed(error)
            }
        }
    }
}
