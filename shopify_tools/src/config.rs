use std::time::Duration;

use log::*;

const DEFAULT_API_VERSION: &str = "unstable";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    /// The payments apps API version, e.g. `unstable` or `2024-07`.
    pub api_version: String,
    pub timeout: Duration,
    /// Replaces `https://{shop}` as the origin of every request. Used to point the client at a local server.
    pub base_url_override: Option<String>,
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self { api_version: DEFAULT_API_VERSION.to_string(), timeout: DEFAULT_TIMEOUT, base_url_override: None }
    }
}

impl ShopifyConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_version = std::env::var("UPG_SHOPIFY_PAYMENTS_APP_API_VERSION").unwrap_or_else(|_| {
            info!("UPG_SHOPIFY_PAYMENTS_APP_API_VERSION not set, using {DEFAULT_API_VERSION} as default");
            DEFAULT_API_VERSION.to_string()
        });
        let timeout = std::env::var("UPG_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        Self { api_version, timeout, base_url_override: None }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url_override = Some(url.trim_end_matches('/').to_string());
        self
    }
}
