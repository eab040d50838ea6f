//! API Config

use std::time::Duration;

use clap::Args;

use crate::{
    api::{BearerToken, HttpConfig},
    retry::RetryPolicy,
};

/// Storefront API settings.
#[derive(Debug, Args)]
pub struct ApiConfig {
    /// Storefront API base URL
    #[arg(
        long,
        env = "GEBEYA_API_URL",
        default_value = "https://api.seregelagebeya.com/api/v1"
    )]
    pub api_url: String,

    /// Bearer token of the signed-in shopper
    #[arg(long, env = "GEBEYA_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "GEBEYA_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Attempts for catalogue and order reads
    #[arg(long, env = "GEBEYA_READ_RETRIES", default_value_t = 3)]
    pub read_retries: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(long, env = "GEBEYA_RETRY_DELAY_MS", default_value_t = 500)]
    pub retry_delay_ms: u64,
}

impl ApiConfig {
    /// HTTP client settings for these options.
    #[must_use]
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            base_url: self.api_url.clone(),
            token: self
                .api_token
                .as_deref()
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(BearerToken::new),
            timeout: Duration::from_secs(self.request_timeout_secs),
            retry: RetryPolicy {
                attempts: self.read_retries.max(1),
                initial_delay: Duration::from_millis(self.retry_delay_ms),
            },
        }
    }
}
