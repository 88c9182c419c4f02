use std::time::Duration;

use crate::auth::jwt::JwtConfig;

/// Read an env var and parse it, falling back to `default` when unset.
///
/// # Panics
///
/// Panics if the variable is set but does not parse. Misconfiguration should
/// fail fast at startup.
fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be valid: {e}")),
        Err(_) => default,
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the secrets have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `90`, above the LLM timeout).
    pub request_timeout_secs: u64,
    /// JWT validation settings for the admin routes.
    pub jwt: JwtConfig,
    /// Quota defaults and metering timeouts.
    pub metering: MeteringConfig,
    /// Model provider settings.
    pub llm: LlmConfig,
    /// Optional webhook receiving every logged notification.
    pub notification_webhook_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `HOST`                     | `0.0.0.0`               |
    /// | `PORT`                     | `3000`                  |
    /// | `CORS_ORIGINS`             | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`     | `90`                    |
    /// | `NOTIFICATION_WEBHOOK_URL` | unset                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 90);

        let notification_webhook_url = std::env::var("NOTIFICATION_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            metering: MeteringConfig::from_env(),
            llm: LlmConfig::from_env(),
            notification_webhook_url,
        }
    }
}

// ---------------------------------------------------------------------------
// Metering
// ---------------------------------------------------------------------------

/// Quota defaults and per-call timeouts for the metering service.
#[derive(Debug, Clone)]
pub struct MeteringConfig {
    /// Token ceiling for new projects.
    pub default_monthly_token_limit: i64,
    /// Subscription term for new projects, in months.
    pub default_term_months: u32,
    /// Bound on each project store round-trip.
    pub store_timeout: Duration,
    /// Bound on each notification write.
    pub notify_timeout: Duration,
    /// Interval between maintenance sweeps.
    pub sweep_interval: Duration,
}

impl MeteringConfig {
    /// | Env Var                       | Default  |
    /// |-------------------------------|----------|
    /// | `DEFAULT_MONTHLY_TOKEN_LIMIT` | `100000` |
    /// | `DEFAULT_TERM_MONTHS`         | `12`     |
    /// | `STORE_TIMEOUT_SECS`          | `5`      |
    /// | `NOTIFY_TIMEOUT_SECS`         | `5`      |
    /// | `SWEEP_INTERVAL_SECS`         | `86400`  |
    pub fn from_env() -> Self {
        let default_monthly_token_limit: i64 = env_or("DEFAULT_MONTHLY_TOKEN_LIMIT", 100_000);
        assert!(
            default_monthly_token_limit > 0,
            "DEFAULT_MONTHLY_TOKEN_LIMIT must be positive"
        );

        Self {
            default_monthly_token_limit,
            default_term_months: env_or("DEFAULT_TERM_MONTHS", 12),
            store_timeout: Duration::from_secs(env_or("STORE_TIMEOUT_SECS", 5)),
            notify_timeout: Duration::from_secs(env_or("NOTIFY_TIMEOUT_SECS", 5)),
            sweep_interval: Duration::from_secs(env_or("SWEEP_INTERVAL_SECS", 86_400)),
        }
    }
}

impl Default for MeteringConfig {
    fn default() -> Self {
        Self {
            default_monthly_token_limit: 100_000,
            default_term_months: 12,
            store_timeout: Duration::from_secs(5),
            notify_timeout: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(86_400),
        }
    }
}

// ---------------------------------------------------------------------------
// LLM
// ---------------------------------------------------------------------------

/// Model provider settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    /// Model used when a project does not name one.
    pub default_model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl LlmConfig {
    /// | Env Var                                   | Required | Default                     |
    /// |-------------------------------------------|----------|-----------------------------|
    /// | `LLM_API_KEY` (fallback `OPENAI_API_KEY`) | **yes**  | --                          |
    /// | `LLM_BASE_URL`                            | no       | `https://api.openai.com/v1` |
    /// | `LLM_DEFAULT_MODEL`                       | no       | `gpt-4o`                    |
    /// | `LLM_TIMEOUT_SECS`                        | no       | `60`                        |
    /// | `LLM_MAX_TOKENS`                          | no       | `500`                       |
    /// | `LLM_TEMPERATURE`                         | no       | `0.7`                       |
    ///
    /// # Panics
    ///
    /// Panics if no API key is configured.
    pub fn from_env() -> Self {
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .expect("LLM_API_KEY or OPENAI_API_KEY must be set in the environment");
        assert!(!api_key.trim().is_empty(), "LLM_API_KEY must not be empty");

        Self {
            api_key,
            base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            default_model: std::env::var("LLM_DEFAULT_MODEL").unwrap_or_else(|_| "gpt-4o".into()),
            timeout: Duration::from_secs(env_or("LLM_TIMEOUT_SECS", 60)),
            max_tokens: env_or("LLM_MAX_TOKENS", 500),
            temperature: env_or("LLM_TEMPERATURE", 0.7),
        }
    }

    /// Settings for the HTTP client implementation.
    pub fn to_openai(&self) -> parley_llm::OpenAiConfig {
        parley_llm::OpenAiConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            timeout: self.timeout,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}
