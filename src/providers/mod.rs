//! Language model providers.
//!
//! Providers are a sealed enum behind a two-method surface (`name`,
//! `generate`):
//! - `Stub`: deterministic answer, used by tests and as the failure floor
//! - `Ollama`: local REST server
//! - `Groq`: hosted OpenAI-compatible endpoint
//! - `LlamaCpp`: llama.cpp completion server
//!
//! `auto` selection probes hosted then local vendors with short, bounded
//! timeouts and falls back to the stub with a human-readable reason.

pub mod groq;
pub mod llamacpp;
pub mod ollama;
pub mod stub;

pub use groq::GroqProvider;
pub use llamacpp::LlamaCppProvider;
pub use ollama::OllamaProvider;
pub use stub::StubProvider;

use std::time::Duration;

use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};

const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub enum ModelProvider {
    Stub(StubProvider),
    Ollama(OllamaProvider),
    Groq(GroqProvider),
    LlamaCpp(LlamaCppProvider),
}

impl ModelProvider {
    pub fn name(&self) -> &'static str {
        match self {
            ModelProvider::Stub(_) => "stub",
            ModelProvider::Ollama(_) => "ollama",
            ModelProvider::Groq(_) => "groq",
            ModelProvider::LlamaCpp(_) => "llamacpp",
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        match self {
            ModelProvider::Stub(provider) => Ok(provider.generate(prompt)),
            ModelProvider::Ollama(provider) => provider.generate(prompt).await,
            ModelProvider::Groq(provider) => provider.generate(prompt).await,
            ModelProvider::LlamaCpp(provider) => provider.generate(prompt).await,
        }
    }
}

/// Active provider plus the selection bookkeeping surfaced by health.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    pub provider: ModelProvider,
    pub configured: String,
    pub model_name: String,
    pub reason: Option<String>,
}

impl ProviderContext {
    pub fn stub(configured: &str, reason: Option<String>) -> Self {
        Self {
            provider: ModelProvider::Stub(StubProvider),
            configured: configured.to_string(),
            model_name: "stub".to_string(),
            reason,
        }
    }
}

/// Build the provider for an explicit name. Unknown names are the caller's
/// mistake (`BadInput`); a hosted choice without credentials degrades to
/// the stub with a recorded reason.
pub fn context_for(settings: &Settings, name: &str) -> Result<ProviderContext> {
    match name {
        "stub" => Ok(ProviderContext::stub(name, None)),
        "ollama" => Ok(ProviderContext {
            provider: ModelProvider::Ollama(OllamaProvider::new(
                &settings.ollama_host,
                &settings.model_name,
                settings.model_timeout_sec,
            )),
            configured: name.to_string(),
            model_name: settings.model_name.clone(),
            reason: None,
        }),
        "llamacpp" => Ok(ProviderContext {
            provider: ModelProvider::LlamaCpp(LlamaCppProvider::new(
                &settings.llamacpp_host,
                Some(settings.model_name.as_str()),
                settings.model_timeout_sec,
            )),
            configured: name.to_string(),
            model_name: settings.model_name.clone(),
            reason: None,
        }),
        "groq" => match &settings.groq_api_key {
            Some(key) => Ok(ProviderContext {
                provider: ModelProvider::Groq(GroqProvider::new(
                    key,
                    &settings.groq_api_url,
                    &settings.hosted_model_name,
                    settings.model_timeout_sec,
                )),
                configured: name.to_string(),
                model_name: settings.hosted_model_name.clone(),
                reason: None,
            }),
            None => Ok(ProviderContext::stub(
                name,
                Some("GROQ_API_KEY not set; using stub".to_string()),
            )),
        },
        other => Err(Error::BadInput(format!(
            "provider must be one of ollama, groq, llamacpp, or stub, got '{other}'"
        ))),
    }
}

/// Choose the active provider at startup. Explicit names are honored;
/// `auto` probes hosted then local vendors and falls back to the stub.
pub async fn select_provider(settings: &Settings) -> ProviderContext {
    if settings.model_provider != "auto" {
        return match context_for(settings, &settings.model_provider) {
            Ok(context) => {
                if let Some(reason) = &context.reason {
                    warn!(%reason, "provider degraded at startup");
                }
                context
            }
            Err(err) => {
                warn!(%err, "invalid provider configuration; using stub");
                ProviderContext::stub(&settings.model_provider, Some(err.to_string()))
            }
        };
    }

    if settings.groq_api_key.is_some()
        && probe_hosted(settings.groq_api_key.as_deref(), &settings.groq_api_url).await
    {
        info!("auto-selected hosted Groq provider");
        if let Ok(mut context) = context_for(settings, "groq") {
            context.configured = "auto".to_string();
            return context;
        }
    }

    if probe_ollama(&settings.ollama_host).await {
        info!(host = %settings.ollama_host, "auto-selected Ollama provider");
        if let Ok(mut context) = context_for(settings, "ollama") {
            context.configured = "auto".to_string();
            return context;
        }
    }

    if probe_llamacpp(&settings.llamacpp_host).await {
        info!(host = %settings.llamacpp_host, "auto-selected llama.cpp provider");
        if let Ok(mut context) = context_for(settings, "llamacpp") {
            context.configured = "auto".to_string();
            return context;
        }
    }

    let reason = "no model provider reachable; using stub".to_string();
    warn!("{reason}");
    ProviderContext::stub("auto", Some(reason))
}

/// GET a vendor endpoint with a short timeout and report reachability.
async fn probe_get(url: &str, bearer: Option<&str>) -> bool {
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };
    let mut request = client.get(url);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }
    request
        .send()
        .await
        .map(|response| response.status().is_success())
        .unwrap_or(false)
}

pub async fn probe_ollama(host: &str) -> bool {
    probe_get(&format!("{}/api/tags", host.trim_end_matches('/')), None).await
}

pub async fn probe_llamacpp(host: &str) -> bool {
    probe_get(&format!("{}/health", host.trim_end_matches('/')), None).await
}

pub async fn probe_hosted(api_key: Option<&str>, api_url: &str) -> bool {
    let Some(key) = api_key else {
        return false;
    };
    let models_url = hosted_models_url(api_url);
    if models_url.is_empty() {
        return false;
    }
    probe_get(&models_url, Some(key)).await
}

/// Derive the models listing URL from a chat-completions URL.
fn hosted_models_url(api_url: &str) -> String {
    if api_url.is_empty() {
        return String::new();
    }
    let mut sanitized = api_url.trim_end_matches('/').to_string();
    if let Some(base) = sanitized.strip_suffix("/chat/completions") {
        sanitized = base.to_string();
    }
    if sanitized.ends_with("/openai/v1") {
        format!("{sanitized}/models")
    } else {
        format!("{sanitized}/openai/v1/models")
    }
}
