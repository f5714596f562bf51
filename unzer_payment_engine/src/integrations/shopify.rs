use chrono::{DateTime, Utc};
use shopify_tools::{
    PaymentsAppsApi,
    PendReason,
    RejectReason,
    SessionKind,
    SessionResolution,
    ShopifyApiError,
};

use crate::traits::{MarketplaceError, MarketplaceSessions, ShopCredentials};

impl From<ShopifyApiError> for MarketplaceError {
    fn from(e: ShopifyApiError) -> Self {
        match e {
            ShopifyApiError::UserErrors(_) | ShopifyApiError::GraphQLError(_) => MarketplaceError::Refused(e.to_string()),
            e => MarketplaceError::RequestFailed(e.to_string()),
        }
    }
}

impl MarketplaceSessions for PaymentsAppsApi {
    async fn resolve_session(
        &self,
        creds: &ShopCredentials,
        kind: SessionKind,
        gid: &str,
    ) -> Result<SessionResolution, MarketplaceError> {
        Ok(PaymentsAppsApi::resolve_session(self, &creds.shop, &creds.access_token, kind, gid).await?)
    }

    async fn reject_session(
        &self,
        creds: &ShopCredentials,
        kind: SessionKind,
        gid: &str,
        reason: &RejectReason,
    ) -> Result<SessionResolution, MarketplaceError> {
        Ok(PaymentsAppsApi::reject_session(self, &creds.shop, &creds.access_token, kind, gid, reason).await?)
    }

    async fn pend_session(
        &self,
        creds: &ShopCredentials,
        gid: &str,
        reason: PendReason,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionResolution, MarketplaceError> {
        Ok(self.pend_payment_session(&creds.shop, &creds.access_token, gid, reason, expires_at).await?)
    }

    async fn configure_app(
        &self,
        creds: &ShopCredentials,
        external_handle: Option<String>,
        ready: bool,
    ) -> Result<(), MarketplaceError> {
        self.configure(&creds.shop, &creds.access_token, external_handle.as_deref(), ready).await?;
        Ok(())
    }
}
