use std::time::Duration;

use log::*;

const DEFAULT_API_URL: &str = "https://api.unzer.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_MAX_RETRIES: u32 = 2;

#[derive(Debug, Clone)]
pub struct UnzerConfig {
    /// Base URL of the gateway REST API, without a trailing slash.
    pub api_url: String,
    /// Upper bound for each outbound HTTP call.
    pub timeout: Duration,
    /// Number of retries for transient network failures. See [`crate::UnzerApi::rest_query`].
    pub max_retries: u32,
}

impl Default for UnzerConfig {
    fn default() -> Self {
        Self { api_url: DEFAULT_API_URL.to_string(), timeout: DEFAULT_TIMEOUT, max_retries: DEFAULT_MAX_RETRIES }
    }
}

impl UnzerConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("UPG_UNZER_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                info!("UPG_UNZER_API_URL not set, using {DEFAULT_API_URL}");
                DEFAULT_API_URL.to_string()
            });
        let timeout = std::env::var("UPG_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("Invalid value for UPG_HTTP_TIMEOUT_SECS ({s}): {e}. Using the default."))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        let max_retries = std::env::var("UPG_HTTP_MAX_RETRIES")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("Invalid value for UPG_HTTP_MAX_RETRIES ({s}): {e}. Using the default."))
                    .ok()
            })
            .unwrap_or(DEFAULT_MAX_RETRIES);
        Self { api_url, timeout, max_retries }
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }
}
