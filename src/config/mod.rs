use crate::error::AppError;
use crate::services::retry::RetryConfig;
use config::{Config as Cfg, File};
use secrecy::Secret;
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Default Gemini REST endpoint base.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AskaiConfig {
    pub common: CommonConfig,
    pub gemini: GeminiSettings,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommonConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Upstream credential. `None` means the service starts degraded and
    /// answers 503 on the forwarding endpoint without touching the network.
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base: String,
    /// Per-attempt timeout for the outbound call.
    pub request_timeout: Duration,
}

impl AskaiConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let common = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .map(Secret::new);

        Ok(AskaiConfig {
            common,
            gemini: GeminiSettings {
                api_key,
                model: get_env("GEMINI_MODEL", DEFAULT_MODEL),
                api_base: get_env("GEMINI_API_BASE", DEFAULT_API_BASE),
                request_timeout: Duration::from_secs(
                    get_env(
                        "ASKAI_REQUEST_TIMEOUT_SECS",
                        &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
                    )
                    .parse()
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
                ),
            },
            retry: RetryConfig {
                max_attempts: get_env("ASKAI_MAX_ATTEMPTS", &DEFAULT_MAX_ATTEMPTS.to_string())
                    .parse()
                    .unwrap_or(DEFAULT_MAX_ATTEMPTS),
                base_delay: Duration::from_millis(
                    get_env(
                        "ASKAI_BACKOFF_BASE_MS",
                        &DEFAULT_BACKOFF_BASE_MS.to_string(),
                    )
                    .parse()
                    .unwrap_or(DEFAULT_BACKOFF_BASE_MS),
                ),
            },
        })
    }

    /// True when an upstream credential is present.
    pub fn is_configured(&self) -> bool {
        self.gemini.api_key.is_some()
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
