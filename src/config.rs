use std::fmt;

/// Application-level constants
pub const APP_NAME: &str = "medsum";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the Anthropic API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

pub const DEFAULT_VALIDATION_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medsum=info,medsum_lib=info,tower_http=warn"
}

/// Settings for the grounding validator.
#[derive(Clone, PartialEq)]
pub struct ValidatorConfig {
    /// Fallback credential when a request carries none.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_VALIDATION_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ValidatorConfig {
    /// Load from process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Self {
            api_key: get(API_KEY_ENV),
            model: get("MEDSUM_VALIDATION_MODEL").unwrap_or(defaults.model),
            api_base_url: get("MEDSUM_ANTHROPIC_URL").unwrap_or(defaults.api_base_url),
            timeout_secs: parse_or_default(
                "MEDSUM_API_TIMEOUT_SECS",
                get("MEDSUM_API_TIMEOUT_SECS"),
                defaults.timeout_secs,
            ),
            max_tokens: parse_or_default(
                "MEDSUM_MAX_TOKENS",
                get("MEDSUM_MAX_TOKENS"),
                defaults.max_tokens,
            ),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy + PartialOrd + Default,
{
    match raw {
        None => default,
        Some(v) => match v.parse::<T>() {
            Ok(parsed) if parsed > T::default() => parsed,
            _ => {
                tracing::warn!(key, "Invalid numeric setting; using default");
                default
            }
        },
    }
}

// Credentials never reach logs.
impl fmt::Debug for ValidatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Address the HTTP service binds to (`MEDSUM_BIND_ADDR`).
pub fn bind_addr() -> String {
    std::env::var("MEDSUM_BIND_ADDR")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
}
