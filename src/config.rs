//! Configuration for the copilot core
//!
//! All settings come from environment variables (optionally seeded from a
//! `.env` file via dotenvy). Provider names are case-folded on load and
//! integer knobs are validated up front so later layers can trust them.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Answer returned by the deterministic stub provider.
pub const DEFAULT_STUB_ANSWER: &str = "hi, this was a test you pass";

pub const DEFAULT_MODEL_NAME: &str = "phi3:mini";
pub const DEFAULT_HOSTED_MODEL_NAME: &str = "llama-3.1-8b-instant";
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_TOP_K: usize = 6;
pub const DEFAULT_CHUNK_TOKENS: usize = 512;
pub const DEFAULT_CHUNK_OVERLAP: usize = 64;
pub const DEFAULT_MODEL_TIMEOUT_SEC: u64 = 20;

const MODEL_PROVIDERS: &[&str] = &["auto", "ollama", "groq", "llamacpp", "stub"];
const EMBED_PROVIDERS: &[&str] = &["auto", "remote", "ollama", "stub"];

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Settings {
    pub model_provider: String,
    pub model_name: String,
    pub model_timeout_sec: u64,
    pub hosted_model_name: String,
    pub groq_api_key: Option<String>,
    pub groq_api_url: String,
    pub ollama_host: String,
    pub llamacpp_host: String,
    pub embed_provider: String,
    pub embed_model: String,
    pub top_k: usize,
    pub chunk_tokens: usize,
    pub chunk_overlap: usize,
    pub graph_uri: String,
    pub graph_user: String,
    pub graph_password: String,
    pub vector_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    pub url_max_depth: usize,
    pub url_max_pages: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_provider: "auto".to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_timeout_sec: DEFAULT_MODEL_TIMEOUT_SEC,
            hosted_model_name: DEFAULT_HOSTED_MODEL_NAME.to_string(),
            groq_api_key: None,
            groq_api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            llamacpp_host: "http://localhost:8080".to_string(),
            embed_provider: "auto".to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
            chunk_tokens: DEFAULT_CHUNK_TOKENS,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            graph_uri: "bolt://localhost:7687".to_string(),
            graph_user: "neo4j".to_string(),
            graph_password: "neo4j".to_string(),
            vector_dir: PathBuf::from("store/vectors"),
            allowed_origins: vec!["http://localhost:5173".to_string()],
            url_max_depth: 1,
            url_max_pages: 5,
        }
    }
}

impl Settings {
    /// Load settings from the environment, seeding from `.env` when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Settings::default();
        let model_provider = read_lowercase("MODEL_PROVIDER", &defaults.model_provider);
        if !MODEL_PROVIDERS.contains(&model_provider.as_str()) {
            return Err(Error::Config(format!(
                "MODEL_PROVIDER must be one of {}, got '{model_provider}'",
                MODEL_PROVIDERS.join(", ")
            )));
        }

        let embed_provider = read_lowercase("EMBED_PROVIDER", &defaults.embed_provider);
        if !EMBED_PROVIDERS.contains(&embed_provider.as_str()) {
            return Err(Error::Config(format!(
                "EMBED_PROVIDER must be one of {}, got '{embed_provider}'",
                EMBED_PROVIDERS.join(", ")
            )));
        }
        // "remote" is the public alias for the Ollama HTTP embedder.
        let embed_provider = if embed_provider == "remote" {
            "ollama".to_string()
        } else {
            embed_provider
        };

        let top_k = read_positive("TOP_K", defaults.top_k)?;
        let chunk_tokens = read_positive("CHUNK_TOKENS", defaults.chunk_tokens)?;
        let chunk_overlap = read_non_negative("CHUNK_OVERLAP", defaults.chunk_overlap)?;
        if chunk_overlap >= chunk_tokens {
            return Err(Error::Config(format!(
                "CHUNK_OVERLAP ({chunk_overlap}) must be smaller than CHUNK_TOKENS ({chunk_tokens})"
            )));
        }

        let model_timeout_sec = read_positive("MODEL_TIMEOUT_SEC", defaults.model_timeout_sec as usize)? as u64;
        let url_max_depth = read_non_negative("URL_MAX_DEPTH", defaults.url_max_depth)?;
        let url_max_pages = read_positive("URL_MAX_PAGES", defaults.url_max_pages)?;

        Ok(Self {
            model_provider,
            model_name: read_string("MODEL_NAME", &defaults.model_name),
            model_timeout_sec,
            hosted_model_name: read_string("HOSTED_MODEL_NAME", &defaults.hosted_model_name),
            groq_api_key: std::env::var("GROQ_API_KEY").ok().filter(|v| !v.is_empty()),
            groq_api_url: read_string("GROQ_API_URL", &defaults.groq_api_url),
            ollama_host: read_string("OLLAMA_HOST", &defaults.ollama_host),
            llamacpp_host: read_string("LLAMACPP_HOST", &defaults.llamacpp_host),
            embed_provider,
            embed_model: read_string("EMBED_MODEL", &defaults.embed_model),
            top_k,
            chunk_tokens,
            chunk_overlap,
            graph_uri: read_string("GRAPH_URI", &defaults.graph_uri),
            graph_user: read_string("GRAPH_USER", &defaults.graph_user),
            graph_password: read_string("GRAPH_PASSWORD", &defaults.graph_password),
            vector_dir: PathBuf::from(read_string(
                "VECTOR_DIR",
                defaults.vector_dir.to_str().unwrap_or("store/vectors"),
            )),
            allowed_origins: read_origins("ALLOWED_ORIGINS", &defaults.allowed_origins),
            url_max_depth,
            url_max_pages,
        })
    }

    /// Settings wired for fully offline operation (tests, CI).
    pub fn offline() -> Self {
        Self {
            model_provider: "stub".to_string(),
            embed_provider: "stub".to_string(),
            ..Self::default()
        }
    }
}

fn read_string(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn read_lowercase(key: &str, default: &str) -> String {
    read_string(key, default).to_lowercase()
}

fn read_positive(key: &str, default: usize) -> Result<usize> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            let parsed: i64 = value
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{key} must be an integer, got '{value}'")))?;
            if parsed <= 0 {
                return Err(Error::Config(format!("{key} must be positive, got {parsed}")));
            }
            Ok(parsed as usize)
        }
        _ => Ok(default),
    }
}

fn read_non_negative(key: &str, default: usize) -> Result<usize> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            let parsed: i64 = value
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{key} must be an integer, got '{value}'")))?;
            if parsed < 0 {
                return Err(Error::Config(format!(
                    "{key} must be non-negative, got {parsed}"
                )));
            }
            Ok(parsed as usize)
        }
        _ => Ok(default),
    }
}

fn read_origins(key: &str, default: &[String]) -> Vec<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect(),
        _ => default.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }

        fn unset(key: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::remove_var(key);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => std::env::set_var(&self.key, value),
                None => std::env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.top_k, 6);
        assert_eq!(settings.chunk_tokens, 512);
        assert_eq!(settings.chunk_overlap, 64);
        assert_eq!(settings.model_provider, "auto");
        assert_eq!(settings.graph_uri, "bolt://localhost:7687");
    }

    #[test]
    fn provider_names_are_lowercased() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::set("MODEL_PROVIDER", "STUB"),
            EnvGuard::set("EMBED_PROVIDER", "Stub"),
        ];

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.model_provider, "stub");
        assert_eq!(settings.embed_provider, "stub");
    }

    #[test]
    fn remote_embed_provider_aliases_ollama() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::set("EMBED_PROVIDER", "remote");

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.embed_provider, "ollama");
    }

    #[test]
    fn rejects_unknown_model_provider() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::set("MODEL_PROVIDER", "openai");

        let err = Settings::from_env().unwrap_err();
        assert!(err.to_string().contains("MODEL_PROVIDER"));
    }

    #[test]
    fn rejects_non_positive_top_k() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::unset("MODEL_PROVIDER"),
            EnvGuard::set("TOP_K", "0"),
        ];

        let err = Settings::from_env().unwrap_err();
        assert!(err.to_string().contains("TOP_K"));
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_tokens() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::unset("MODEL_PROVIDER"),
            EnvGuard::unset("TOP_K"),
            EnvGuard::set("CHUNK_TOKENS", "32"),
            EnvGuard::set("CHUNK_OVERLAP", "32"),
        ];

        let err = Settings::from_env().unwrap_err();
        assert!(err.to_string().contains("CHUNK_OVERLAP"));
    }

    #[test]
    fn rejects_non_numeric_chunk_tokens() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::unset("MODEL_PROVIDER"),
            EnvGuard::unset("CHUNK_OVERLAP"),
            EnvGuard::set("CHUNK_TOKENS", "many"),
        ];

        let err = Settings::from_env().unwrap_err();
        assert!(err.to_string().contains("CHUNK_TOKENS"));
    }

    #[test]
    fn splits_allowed_origins_csv() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::unset("MODEL_PROVIDER"),
            EnvGuard::unset("CHUNK_TOKENS"),
            EnvGuard::set(
                "ALLOWED_ORIGINS",
                "http://localhost:5173, https://desk.example.com ,",
            ),
        ];

        let settings = Settings::from_env().unwrap();
        assert_eq!(
            settings.allowed_origins,
            vec![
                "http://localhost:5173".to_string(),
                "https://desk.example.com".to_string()
            ]
        );
    }

    #[test]
    fn empty_groq_key_reads_as_none() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guards = [
            EnvGuard::unset("MODEL_PROVIDER"),
            EnvGuard::unset("ALLOWED_ORIGINS"),
            EnvGuard::set("GROQ_API_KEY", ""),
        ];

        let settings = Settings::from_env().unwrap();
        assert!(settings.groq_api_key.is_none());
    }

    #[test]
    fn offline_settings_use_stubs() {
        let settings = Settings::offline();
        assert_eq!(settings.model_provider, "stub");
        assert_eq!(settings.embed_provider, "stub");
    }
}
