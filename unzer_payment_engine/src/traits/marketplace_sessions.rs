use std::fmt::Debug;

use chrono::{DateTime, Utc};
use shopify_tools::{PendReason, RejectReason, SessionKind, SessionResolution};
use thiserror::Error;
use upg_common::Secret;

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    /// The marketplace answered, but refused the mutation. Resolving an already settled session ends up here.
    #[error("The marketplace refused the request. {0}")]
    Refused(String),
    #[error("The marketplace could not be reached. {0}")]
    RequestFailed(String),
}

/// What the engine needs to talk to the marketplace on behalf of a shop.
#[derive(Clone)]
pub struct ShopCredentials {
    pub shop: String,
    pub access_token: Secret<String>,
}

impl ShopCredentials {
    pub fn new(shop: &str, access_token: Secret<String>) -> Self {
        Self { shop: shop.to_string(), access_token }
    }
}

impl Debug for ShopCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ShopCredentials({})", self.shop)
    }
}

/// The marketplace side of the offsite payments protocol.
///
/// A session may be resolved or rejected exactly once. Callers are responsible for not settling a session twice;
/// if they do anyway, implementations report it as [`MarketplaceError::Refused`].
#[allow(async_fn_in_trait)]
pub trait MarketplaceSessions {
    async fn resolve_session(
        &self,
        creds: &ShopCredentials,
        kind: SessionKind,
        gid: &str,
    ) -> Result<SessionResolution, MarketplaceError>;

    async fn reject_session(
        &self,
        creds: &ShopCredentials,
        kind: SessionKind,
        gid: &str,
        reason: &RejectReason,
    ) -> Result<SessionResolution, MarketplaceError>;

    /// Marks a payment session as pending until `expires_at`.
    async fn pend_session(
        &self,
        creds: &ShopCredentials,
        gid: &str,
        reason: PendReason,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionResolution, MarketplaceError>;

    /// Tells the marketplace whether the app is ready to take payments for the shop.
    async fn configure_app(
        &self,
        creds: &ShopCredentials,
        external_handle: Option<String>,
        ready: bool,
    ) -> Result<(), MarketplaceError>;
}
