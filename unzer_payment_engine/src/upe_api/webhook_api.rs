//! Reconciles gateway notifications with the payment sessions they belong to.
//!
//! Every notification is handled in two steps. First the event specific handler runs (store a transaction mirror,
//! correlate a cancel, resolve a void). Then the payment session status is derived from the event and, where the
//! event is ambiguous, from the current gateway totals. The derivation runs whether or not the handler did anything.
//!
//! Gateway failures are returned as errors, so that the gateway redelivers the notification. Marketplace failures are
//! logged and swallowed: the marketplace session stays unresolved and the operator can see why in the payment log.
use std::fmt::Debug;

use log::*;
use shopify_tools::SessionKind;
use unzer_tools::{data_objects::PaymentData, UnzerEvent};
use upg_common::Secret;

use crate::{
    db_types::{
        CancelTarget,
        ChildSessionKind,
        PaymentSession,
        PaymentSessionStatus,
        SessionStatus,
        ShopConfiguration,
        TransactionKind,
        UnzerCancel,
    },
    traits::{ConfigurationStore, MarketplaceSessions, PaymentGateway, PaymentLogStore, SessionStore, ShopCredentials},
    upe_api::{errors::WebhookError, payment_logger::PaymentLogger, payment_objects::GatewayNotification},
};

const LOG_PREFIX: &str = "Unzer Webhook";

pub struct WebhookApi<B, G, M> {
    db: B,
    gateway: G,
    marketplace: M,
}

impl<B, G, M> Debug for WebhookApi<B, G, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookApi")
    }
}

/// Everything a handler needs to know about the payment session a notification refers to.
struct NotificationContext<'a> {
    notification: &'a GatewayNotification,
    pid: String,
    session: PaymentSession,
    config: ShopConfiguration,
    key: Secret<String>,
    /// The gateway payment, fetched at most once per notification
    payment: Option<PaymentData>,
}

impl NotificationContext<'_> {
    fn credentials(&self) -> Option<ShopCredentials> {
        self.config
            .access_token
            .as_ref()
            .filter(|t| !t.reveal().is_empty())
            .map(|t| ShopCredentials::new(&self.config.shop, t.clone()))
    }
}

impl<B, G, M> WebhookApi<B, G, M> {
    pub fn new(db: B, gateway: G, marketplace: M) -> Self {
        Self { db, gateway, marketplace }
    }
}

impl<B, G, M> WebhookApi<B, G, M>
where
    B: SessionStore + PaymentLogStore + ConfigurationStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    /// Handles a gateway notification.
    ///
    /// Notifications that cannot be matched to a payment session are acknowledged without doing anything, since the
    /// gateway would otherwise keep redelivering them.
    pub async fn handle(&self, notification: &GatewayNotification) -> Result<(), WebhookError> {
        let event = notification.event;
        trace!("🪝️ Handling gateway notification: {event}");
        let Some(mut ctx) = self.load_context(notification).await? else {
            return Ok(());
        };
        let logger = PaymentLogger::new(self.db.clone(), LOG_PREFIX, &ctx.session.id);
        match event {
            UnzerEvent::AuthorizeSucceeded => self.store_transaction(&ctx, TransactionKind::Authorize, &logger).await?,
            UnzerEvent::ChargeSucceeded => self.store_transaction(&ctx, TransactionKind::Charge, &logger).await?,
            UnzerEvent::AuthorizeCanceled | UnzerEvent::ChargeCanceled => self.correlate_cancel(&ctx, &logger).await?,
            UnzerEvent::PaymentCanceled => self.resolve_void(&mut ctx, &logger).await?,
            UnzerEvent::PaymentPending => logger.info("Received Payment Pending", Some(&notification.payload)).await,
            UnzerEvent::PaymentCompleted => logger.info("Received Payment Complete", Some(&notification.payload)).await,
            UnzerEvent::PaymentPartly => logger.info("Received Payment Partly", Some(&notification.payload)).await,
            UnzerEvent::Types |
            UnzerEvent::Authorize |
            UnzerEvent::AuthorizePending |
            UnzerEvent::AuthorizeFailed |
            UnzerEvent::Charge |
            UnzerEvent::ChargeFailed |
            UnzerEvent::ChargePending |
            UnzerEvent::Chargeback |
            UnzerEvent::Customer |
            UnzerEvent::CustomerCreated |
            UnzerEvent::CustomerDeleted |
            UnzerEvent::CustomerUpdated |
            UnzerEvent::BasketCreated |
            UnzerEvent::BasketUsed |
            UnzerEvent::Payment |
            UnzerEvent::PaymentReview |
            UnzerEvent::PaymentChargeback |
            UnzerEvent::Shipment |
            UnzerEvent::Payout |
            UnzerEvent::PayoutSucceeded |
            UnzerEvent::PayoutFailed => trace!("🪝️ Nothing to do for {event}"),
        }
        self.update_status(&mut ctx).await
    }

    /// Finds the payment session and shop configuration for the notification. Returns `None` on a correlation miss.
    async fn load_context<'a>(
        &self,
        notification: &'a GatewayNotification,
    ) -> Result<Option<NotificationContext<'a>>, WebhookError> {
        let (Some(pid), Some(public_key)) = (notification.payment_id.as_ref(), notification.public_key.as_ref()) else {
            debug!("🪝️ {} notification does not refer to a payment. Ignoring it", notification.event);
            return Ok(None);
        };
        let Some(session) = self.db.fetch_payment_session_by_pid(pid, public_key).await? else {
            error!("🪝️ No payment session found for gateway payment {pid} ({} notification)", notification.event);
            return Ok(None);
        };
        let config = self.db.fetch_configuration(&session.shop).await?;
        let key = config.as_ref().and_then(|c| c.gateway_keys()).map(|(key, _)| key.clone());
        let (Some(config), Some(key)) = (config, key) else {
            error!("🪝️ Shop {} has no gateway configuration. Cannot handle {pid}", session.shop);
            let logger = PaymentLogger::new(self.db.clone(), LOG_PREFIX, &session.id);
            logger.error("Configuration for the store was not found", Some(&notification.payload)).await;
            return Ok(None);
        };
        Ok(Some(NotificationContext { notification, pid: pid.clone(), session, config, key, payment: None }))
    }

    //------------------------------------------      Handlers        -------------------------------------------------

    async fn store_transaction(
        &self,
        ctx: &NotificationContext<'_>,
        kind: TransactionKind,
        logger: &PaymentLogger<B>,
    ) -> Result<(), WebhookError> {
        let url = retrieve_url(ctx.notification)?;
        let tx = self.gateway.fetch_transaction(&ctx.key, url).await?;
        let message = match kind {
            TransactionKind::Authorize => "Received Authorize",
            TransactionKind::Charge => "Received Payment Charge",
        };
        logger.info(message, Some(&tx)).await;
        let result = self.db.insert_transaction(kind, &ctx.session.id, &ctx.pid, &tx).await?;
        if result.is_inserted() {
            info!("🪝️ {kind} {} stored for payment session [{}]", tx.id, ctx.session.id);
        } else {
            debug!("🪝️ {kind} {} was redelivered", tx.id);
        }
        Ok(())
    }

    /// Matches a cancel back to the refund or void session that asked for it, and resolves that session.
    async fn correlate_cancel(
        &self,
        ctx: &NotificationContext<'_>,
        logger: &PaymentLogger<B>,
    ) -> Result<(), WebhookError> {
        let url = retrieve_url(ctx.notification)?;
        let tx = self.gateway.fetch_transaction(&ctx.key, url).await?;
        logger.info(&format!("Received {} cancel", cancel_source(ctx.notification.event)), Some(&tx)).await;
        let Some(cancel) = self.find_cancel(ctx, url, &tx.id).await? else {
            error!("🪝️ No cancel {} is recorded for gateway payment {}", tx.id, ctx.pid);
            logger.error("Unzer Cancel not found!", Some(&tx)).await;
            return Ok(());
        };
        let Some((kind, child_id)) = cancel_owner(&cancel) else {
            error!("🪝️ Cancel #{} has no refund or void session", cancel.id);
            logger.error("No refund or void found on Unzer Cancel", Some(&cancel)).await;
            return Ok(());
        };
        let resolved = self.resolve_child(ctx, kind, &child_id, logger).await?;
        if resolved {
            if self.db.resolve_cancel(cancel.id, &tx).await? {
                info!("🪝️ Cancel {} resolved {kind} session [{child_id}]", tx.id);
                logger.info("Payment Cancel Resolved", Some(&cancel)).await;
            } else {
                debug!("🪝️ Cancel {} was already resolved", tx.id);
            }
        }
        Ok(())
    }

    /// The notification can overtake the response to the cancel request, in which case the cancel row has no gateway
    /// id yet. It is then matched on the charge or authorization it cancels, and claims the id.
    async fn find_cancel(
        &self,
        ctx: &NotificationContext<'_>,
        url: &str,
        cancel_id: &str,
    ) -> Result<Option<UnzerCancel>, WebhookError> {
        if let Some(cancel) = self.db.fetch_cancel(&ctx.pid, cancel_id).await? {
            return Ok(Some(cancel));
        }
        let Some((kind, parent_id)) = cancel_parent(url) else {
            return Ok(None);
        };
        let Some(mut cancel) = self.db.fetch_unassigned_cancel(&ctx.pid, kind, parent_id).await? else {
            return Ok(None);
        };
        debug!("🪝️ Cancel {cancel_id} arrived before its request returned. Assigning it to cancel #{}", cancel.id);
        self.db.set_cancel_id(cancel.id, cancel_id).await?;
        cancel.cancel_id = Some(cancel_id.to_string());
        Ok(Some(cancel))
    }

    /// A `payment.canceled` after a void request settles the void session, if nothing else has done so yet.
    async fn resolve_void(
        &self,
        ctx: &mut NotificationContext<'_>,
        logger: &PaymentLogger<B>,
    ) -> Result<(), WebhookError> {
        let payment = self.payment(ctx).await?;
        logger.info("Received Payment Cancel", Some(&payment)).await;
        let Some(void) = self.db.fetch_void_session_for_payment(&ctx.session.id).await? else {
            logger.error("No Void found on payment session", Some(&payment)).await;
            return Ok(());
        };
        if self.resolve_child(ctx, ChildSessionKind::Void, &void.id, logger).await? {
            logger.info("Void resolved", Some(&payment)).await;
        }
        Ok(())
    }

    /// Resolves a refund or void session with the marketplace, unless it was settled before. Returns `true` if the
    /// session is resolved when this returns.
    async fn resolve_child(
        &self,
        ctx: &NotificationContext<'_>,
        kind: ChildSessionKind,
        id: &str,
        logger: &PaymentLogger<B>,
    ) -> Result<bool, WebhookError> {
        let (gid, status) = match kind {
            ChildSessionKind::Refund => self.db.fetch_refund_session(id).await?.map(|s| (s.gid, s.status)),
            ChildSessionKind::Void => self.db.fetch_void_session(id).await?.map(|s| (s.gid, s.status)),
            ChildSessionKind::Capture => self.db.fetch_capture_session(id).await?.map(|s| (s.gid, s.status)),
        }
        .ok_or_else(|| WebhookError::DatabaseError(format!("The {kind} session {id} does not exist")))?;
        match status {
            Some(SessionStatus::Resolve) => {
                debug!("🪝️ The {kind} session [{id}] is already resolved");
                return Ok(true);
            },
            Some(SessionStatus::Reject) => {
                warn!("🪝️ The {kind} session [{id}] was rejected. It will not be resolved");
                return Ok(false);
            },
            _ => {},
        }
        let Some(creds) = ctx.credentials() else {
            error!("🪝️ Shop {} has no marketplace access token. Cannot resolve {kind} session [{id}]", ctx.session.shop);
            logger.error(&format!("No access token to resolve the {kind} session"), Some(&id)).await;
            return Ok(false);
        };
        match self.marketplace.resolve_session(&creds, session_kind(kind), &gid).await {
            Ok(_) => {
                self.db.update_child_session_status(kind, id, SessionStatus::Resolve).await?;
                info!("🪝️ The {kind} session [{id}] is resolved");
                Ok(true)
            },
            Err(e) => {
                error!("🪝️ Could not resolve the {kind} session [{id}]. {e}");
                logger.error(&format!("Could not resolve the {kind} session"), Some(&e.to_string())).await;
                Ok(false)
            },
        }
    }

    //------------------------------------------    Status update     -------------------------------------------------

    async fn update_status(&self, ctx: &mut NotificationContext<'_>) -> Result<(), WebhookError> {
        let Some(status) = self.derive_status(ctx).await? else {
            return Ok(());
        };
        match self.db.update_payment_status(&ctx.session.id, status).await? {
            Some(status) => debug!("🪝️ Payment session [{}] is {status}", ctx.session.id),
            None => debug!("🪝️ Payment session [{}] stays {}", ctx.session.id, ctx.session.status),
        }
        Ok(())
    }

    /// The status a payment session moves to after the notification. A full refund fires both `charge.canceled` and
    /// `payment.canceled`, so both look at the gateway totals.
    async fn derive_status(
        &self,
        ctx: &mut NotificationContext<'_>,
    ) -> Result<Option<PaymentSessionStatus>, WebhookError> {
        let status = match ctx.notification.event {
            UnzerEvent::AuthorizePending => Some(PaymentSessionStatus::AuthorizationPending),
            UnzerEvent::PaymentPending => Some(PaymentSessionStatus::PaymentPending),
            UnzerEvent::AuthorizeSucceeded => Some(PaymentSessionStatus::Authorized),
            UnzerEvent::PaymentPartly => Some(PaymentSessionStatus::PartiallyPaid),
            UnzerEvent::PaymentCompleted => Some(PaymentSessionStatus::Paid),
            UnzerEvent::PaymentCanceled => {
                let payment = self.payment(ctx).await?;
                if payment.amount.total.is_zero() {
                    Some(PaymentSessionStatus::Voided)
                } else {
                    Some(PaymentSessionStatus::Refunded)
                }
            },
            UnzerEvent::ChargeCanceled => {
                let payment = self.payment(ctx).await?;
                (payment.amount.total != payment.amount.canceled).then_some(PaymentSessionStatus::PartiallyRefunded)
            },
            _ => None,
        };
        Ok(status)
    }

    async fn payment(&self, ctx: &mut NotificationContext<'_>) -> Result<PaymentData, WebhookError> {
        if let Some(payment) = &ctx.payment {
            return Ok(payment.clone());
        }
        let payment = self.gateway.get_payment(&ctx.key, &ctx.pid).await?;
        ctx.payment = Some(payment.clone());
        Ok(payment)
    }
}

fn retrieve_url(notification: &GatewayNotification) -> Result<&str, WebhookError> {
    notification.retrieve_url.as_deref().ok_or_else(|| {
        WebhookError::MalformedNotification(format!("The {} notification has no retrieveUrl", notification.event))
    })
}

/// The charge or authorization a cancel hangs off, from a `.../charges/{id}/cancels/{cid}` style url.
fn cancel_parent(url: &str) -> Option<(TransactionKind, &str)> {
    let mut segments = url.trim_end_matches('/').rsplit('/');
    segments.next()?;
    if segments.next()? != "cancels" {
        return None;
    }
    let parent_id = segments.next()?;
    let kind = match segments.next()? {
        "charges" => TransactionKind::Charge,
        "authorize" | "authorizations" => TransactionKind::Authorize,
        _ => return None,
    };
    Some((kind, parent_id))
}

fn cancel_owner(cancel: &UnzerCancel) -> Option<(ChildSessionKind, String)> {
    match cancel.target()? {
        CancelTarget::Refund { refund_id, .. } => Some((ChildSessionKind::Refund, refund_id)),
        CancelTarget::Void { void_id, .. } => Some((ChildSessionKind::Void, void_id)),
    }
}

fn cancel_source(event: UnzerEvent) -> &'static str {
    match event {
        UnzerEvent::AuthorizeCanceled => "Authorize",
        _ => "Charge",
    }
}

fn session_kind(kind: ChildSessionKind) -> SessionKind {
    match kind {
        ChildSessionKind::Capture => SessionKind::Capture,
        ChildSessionKind::Refund => SessionKind::Refund,
        ChildSessionKind::Void => SessionKind::Void,
    }
}
