use std::env;

use log::*;
use shopify_tools::ShopifyConfig;
use unzer_payment_engine::FlowSettings;
use unzer_tools::UnzerConfig;
use upg_common::{parse_boolean_flag, parse_list, Secret};

const DEFAULT_UPG_HOST: &str = "127.0.0.1";
const DEFAULT_UPG_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/unzer_payments.db";
const DEFAULT_SHOP_VERSION: &str = "2024-07";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The externally visible origin of the app. Pay-page return URLs and the gateway webhook point here.
    pub public_url: String,
    /// Payment types that are never offered, whatever the shop configuration says.
    pub excluded_payment_types: Vec<String>,
    /// The shop version reported to the gateway in the payment metadata.
    pub shop_version: String,
    /// Bearer token for the `/api` admin routes. The admin routes refuse every request when this is not set.
    pub admin_token: Option<Secret<String>>,
    pub shopify_config: ShopifyServerConfig,
    pub unzer_api: UnzerConfig,
}

#[derive(Clone, Debug)]
pub struct ShopifyServerConfig {
    /// The app secret that the marketplace signs its webhooks with.
    pub api_secret: Secret<String>,
    pub hmac_checks: bool,
    pub payments_api: ShopifyConfig,
}

impl Default for ShopifyServerConfig {
    fn default() -> Self {
        Self { api_secret: Secret::default(), hmac_checks: true, payments_api: ShopifyConfig::default() }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_UPG_HOST.to_string(),
            port: DEFAULT_UPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            public_url: format!("http://{DEFAULT_UPG_HOST}:{DEFAULT_UPG_PORT}"),
            excluded_payment_types: Vec::default(),
            shop_version: DEFAULT_SHOP_VERSION.to_string(),
            admin_token: None,
            shopify_config: ShopifyServerConfig::default(),
            unzer_api: UnzerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, public_url: format!("http://{host}:{port}"), ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("UPG_HOST").ok().unwrap_or_else(|| DEFAULT_UPG_HOST.into());
        let port = env::var("UPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for UPG_PORT. {e} Using the default, {DEFAULT_UPG_PORT}, instead."
                    );
                    DEFAULT_UPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_UPG_PORT);
        let database_url = env::var("UPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ UPG_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let public_url = env::var("UPG_PUBLIC_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| {
                let url = format!("http://{host}:{port}");
                warn!(
                    "🪛️ UPG_PUBLIC_URL is not set. Using {url}. The gateway and buyers will not be able to reach the \
                     app unless this is its public address."
                );
                url
            });
        let excluded_payment_types = env::var("UPG_UNZER_EXCLUDE_PAYMENT_TYPES")
            .map(|s| parse_list(&s))
            .unwrap_or_else(|_| {
                info!("🪛️ UPG_UNZER_EXCLUDE_PAYMENT_TYPES is not set. No payment types are excluded system-wide.");
                Vec::default()
            });
        let shop_version = env::var("UPG_METADATA_SHOP_VERSION").ok().unwrap_or_else(|| {
            warn!("🪛️ UPG_METADATA_SHOP_VERSION is not set. Using the default, {DEFAULT_SHOP_VERSION}.");
            DEFAULT_SHOP_VERSION.to_string()
        });
        let admin_token = env::var("UPG_ADMIN_TOKEN").ok().filter(|s| !s.is_empty()).map(Secret::new);
        if admin_token.is_none() {
            warn!("🪛️ UPG_ADMIN_TOKEN is not set. The admin API is disabled.");
        }
        let shopify_config = ShopifyServerConfig::from_env_or_defaults();
        let unzer_api = UnzerConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            public_url,
            excluded_payment_types,
            shop_version,
            admin_token,
            shopify_config,
            unzer_api,
        }
    }

    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings::new(&self.public_url, self.excluded_payment_types.clone(), &self.shop_version)
    }
}

impl ShopifyServerConfig {
    pub fn from_env_or_defaults() -> Self {
        let payments_api = ShopifyConfig::new_from_env_or_default();
        let api_secret = env::var("UPG_SHOPIFY_API_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ UPG_SHOPIFY_API_SECRET is not set. Please set it to the API secret of your Shopify app, otherwise \
                 no marketplace webhook will be accepted."
            );
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("UPG_SHOPIFY_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ HMAC checks for marketplace webhooks are DISABLED. Never run a production server like this.");
        }
        Self { api_secret: Secret::new(api_secret), hmac_checks, payments_api }
    }
}
