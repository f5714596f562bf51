use std::{collections::BTreeMap, fmt::Debug};

use chrono::{Duration, Utc};
use log::*;
use shopify_tools::{PendReason, RejectReason, SessionKind};
use unzer_tools::{
    data_objects::{MetadataData, PayPageRequest, PayPageResources, PaymentData},
    PayPageAction,
};
use upg_common::Secret;

use crate::{
    db_types::{
        CancelTarget,
        CaptureSession,
        ChildSessionKind,
        NewUnzerCancel,
        PaymentKind,
        PaymentSession,
        PaymentSessionStatus,
        RefundSession,
        SessionStatus,
        ShopConfiguration,
        TransactionKind,
        VoidSession,
    },
    helpers::{basket_for_checkout, extract_checkout_token, gateway_customer, transaction_status},
    traits::{
        CheckoutStore,
        ConfigurationStore,
        MarketplaceSessions,
        PaymentGateway,
        PaymentLogStore,
        SessionStore,
        ShopCredentials,
    },
    upe_api::{
        errors::PaymentFlowError,
        payment_logger::PaymentLogger,
        payment_objects::{
            CaptureSessionRequest,
            FlowSettings,
            PaymentSessionCreated,
            PaymentSessionRequest,
            RefundSessionRequest,
            VoidSessionRequest,
        },
    },
};

const DEFAULT_LOCALE: &str = "en-GB";

/// `PaymentFlowApi` handles the synchronous side of the offsite payments protocol: the session requests the
/// marketplace sends, and the buyer coming back from the pay-page.
///
/// Refunds and voids are only started here. They are resolved with the marketplace by the
/// [`crate::WebhookApi`] once the gateway reports the cancel.
pub struct PaymentFlowApi<B, G, M> {
    db: B,
    gateway: G,
    marketplace: M,
    settings: FlowSettings,
}

impl<B, G, M> Debug for PaymentFlowApi<B, G, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi ({})", self.settings.public_url)
    }
}

impl<B, G, M> PaymentFlowApi<B, G, M> {
    pub fn new(db: B, gateway: G, marketplace: M, settings: FlowSettings) -> Self {
        Self { db, gateway, marketplace, settings }
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }
}

impl<B, G, M> PaymentFlowApi<B, G, M>
where
    B: SessionStore + PaymentLogStore + CheckoutStore + ConfigurationStore,
    G: PaymentGateway,
    M: MarketplaceSessions,
{
    //------------------------------------------   Payment sessions   -------------------------------------------------

    /// Stores a new payment session and returns the processing URL the marketplace should send the buyer to.
    ///
    /// The checkout token is taken from the cancel URL. Without it there is no way to find the basket later, so the
    /// request is refused and nothing is stored. Repeating a request with the same id is harmless.
    pub async fn create_payment_session(
        &self,
        shop: &str,
        request: PaymentSessionRequest,
    ) -> Result<PaymentSessionCreated, PaymentFlowError> {
        let shop = shop.trim();
        if shop.is_empty() {
            return Err(PaymentFlowError::InvalidRequest("The shop domain is missing".into()));
        }
        let token = extract_checkout_token(&request.cancel_url)
            .ok_or_else(|| PaymentFlowError::MissingCheckoutToken(request.cancel_url.clone()))?;
        let result = self.db.upsert_payment_session(request.into_new_session(shop, token)).await?;
        let logger = PaymentLogger::new(self.db.clone(), "Payment Session", &result.inner().id);
        if result.is_inserted() {
            info!("🔄️💳️ Payment session [{}] created for {shop}", result.inner().id);
            logger.info("Payment Session created", Some(result.inner())).await;
        } else {
            debug!("🔄️💳️ Payment session [{}] already exists", result.inner().id);
        }
        let session = result.into_inner();
        Ok(PaymentSessionCreated { redirect_url: self.settings.processing_url(&session.id) })
    }

    /// Works out where to send a buyer who arrives at the processing URL for `payment_id`.
    ///
    /// * A session that was already settled with the marketplace goes to the URL recorded at the time.
    /// * A session without a gateway payment gets a fresh pay-page.
    /// * Otherwise the gateway payment is checked, and the session is resolved or canceled accordingly.
    pub async fn resume_payment(&self, payment_id: &str) -> Result<String, PaymentFlowError> {
        let session = self
            .db
            .fetch_payment_session(payment_id)
            .await?
            .ok_or_else(|| PaymentFlowError::PaymentSessionNotFound(payment_id.to_string()))?;
        match (session.resolution, session.resolution_redirect_url.as_ref()) {
            (Some(SessionStatus::Resolve), Some(url)) => {
                debug!("🔄️💳️ Payment session [{payment_id}] was already resolved");
                return Ok(url.clone());
            },
            (Some(SessionStatus::Reject), _) => {
                debug!("🔄️💳️ Payment session [{payment_id}] was already rejected");
                return Ok(session.cancel_url.clone());
            },
            _ => {},
        }
        let logger = PaymentLogger::new(self.db.clone(), "Processing", payment_id);
        logger.debug("Fetching Configuration", Some(&session)).await;
        let config = self.shop_configuration(&session.shop, &logger).await?;
        let result = match session.pid.clone() {
            Some(pid) => {
                logger.debug("Processing data found, resuming", Some(&session)).await;
                self.resume_with_pid(&session, &pid, &config, &logger).await
            },
            None => self.create_pay_page(&session, &config, &logger).await,
        };
        log_failure(&logger, result).await
    }

    async fn resume_with_pid(
        &self,
        session: &PaymentSession,
        pid: &str,
        config: &ShopConfiguration,
        logger: &PaymentLogger<B>,
    ) -> Result<String, PaymentFlowError> {
        let (key, _) = keys(config)?;
        let payment = self.gateway.get_payment(key, pid).await?;
        let status = transaction_status(&payment);
        debug!("🔄️💳️ Gateway payment {pid} for [{}] is {status}", session.id);
        if !status.can_resolve() {
            return self.cancel_payment_session(session, &payment, config, logger).await;
        }
        let creds = credentials(config)?;
        logger.info("Resolving Payment Session", None::<&()>).await;
        let resolution = self.marketplace.resolve_session(&creds, SessionKind::Payment, &session.gid).await?;
        self.db.record_resolution(&session.id, SessionStatus::Resolve, resolution.redirect_url.as_deref()).await?;
        info!("🔄️💳️ Payment session [{}] resolved", session.id);
        resolution.redirect_url.ok_or(PaymentFlowError::MissingRedirect)
    }

    /// The buyer came back, but the gateway payment cannot complete.
    ///
    /// Rejecting is final, so it only happens if the buyer actually got as far as a gateway transaction. Otherwise
    /// they are sent back to the checkout, and the marketplace may start a new payment session.
    async fn cancel_payment_session(
        &self,
        session: &PaymentSession,
        payment: &PaymentData,
        config: &ShopConfiguration,
        logger: &PaymentLogger<B>,
    ) -> Result<String, PaymentFlowError> {
        logger.debug("Canceling Payment Session", Some(payment)).await;
        self.db.update_payment_status(&session.id, PaymentSessionStatus::Canceled).await?;
        if payment.transactions.is_empty() {
            return Ok(session.cancel_url.clone());
        }
        let creds = credentials(config)?;
        logger.info("Rejecting Payment Session", None::<&()>).await;
        match self
            .marketplace
            .reject_session(&creds, SessionKind::Payment, &session.gid, &RejectReason::default())
            .await
        {
            Ok(resolution) => {
                self.db
                    .record_resolution(&session.id, SessionStatus::Reject, resolution.redirect_url.as_deref())
                    .await?;
                info!("🔄️💳️ Payment session [{}] rejected", session.id);
                Ok(resolution.redirect_url.unwrap_or_else(|| session.cancel_url.clone()))
            },
            Err(e) => {
                warn!("🔄️💳️ Could not reject payment session [{}]. {e}", session.id);
                logger.error("Error Rejecting Payment Session", Some(&e.to_string())).await;
                Ok(session.cancel_url.clone())
            },
        }
    }

    /// Registers the customer, basket and metadata with the gateway and creates the pay-page.
    ///
    /// Storing the pid is the only write. If anything fails before then, the next visit starts over.
    async fn create_pay_page(
        &self,
        session: &PaymentSession,
        config: &ShopConfiguration,
        logger: &PaymentLogger<B>,
    ) -> Result<String, PaymentFlowError> {
        let (key, public_key) = keys(config)?;
        let customer = gateway_customer(&session.customer)?;
        let customer_id = self.gateway.create_customer(key, &customer).await?;
        logger.debug("Customer created", Some(&customer_id)).await;
        let basket_id = self.create_basket(session, key).await?;
        let metadata = MetadataData::for_shop_version(&self.settings.shop_version);
        let metadata_id = self.gateway.create_metadata(key, &metadata).await?;
        let action = match session.kind {
            PaymentKind::Sale => PayPageAction::Charge,
            PaymentKind::Authorization => PayPageAction::Authorize,
        };
        let page_settings = config.payment_page_settings.clone().unwrap_or_default();
        let locale = page_settings.locale.clone().unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        let request = PayPageRequest {
            amount: session.amount,
            currency: session.currency.clone(),
            return_url: self.settings.processing_url(&session.id),
            exclude_types: self.settings.exclude_types(&config.excluded_payment_types),
            settings: page_settings.page,
            resources: PayPageResources {
                customer_id: Some(customer_id),
                basket_id,
                metadata_id: Some(metadata_id),
            },
            additional_attributes: BTreeMap::new(),
        };
        let page = self.gateway.create_pay_page(key, action, &request).await?;
        logger.debug("Payment Page created", Some(&page)).await;
        let pid = page.resources.payment_id.clone().ok_or(PaymentFlowError::IncompleteGatewayResponse("payment id"))?;
        logger.debug("Updating Payment Session PID Data", Some(&pid)).await;
        if !self.db.assign_pid(&session.id, &pid, public_key).await? {
            warn!("🔄️💳️ Payment session [{}] already has a gateway payment. Pay-page {} is unused", session.id, page.id);
            logger.warn("A payment page was already created for this session", Some(&page)).await;
            return Ok(self.settings.processing_url(&session.id));
        }
        if session.kind == PaymentKind::Sale {
            self.db.update_payment_status(&session.id, PaymentSessionStatus::ChargePending).await?;
        }
        info!("🔄️💳️ Payment session [{}] is gateway payment {pid}", session.id);
        logger.info("Redirecting to Payment Page", Some(&page)).await;
        let separator = if page.redirect_url.contains('?') { '&' } else { '?' };
        Ok(format!("{}{separator}locale={locale}", page.redirect_url))
    }

    /// Sale sessions send the checkout lines along, if the checkout webhook has arrived.
    async fn create_basket(
        &self,
        session: &PaymentSession,
        key: &Secret<String>,
    ) -> Result<Option<String>, PaymentFlowError> {
        if session.kind != PaymentKind::Sale {
            return Ok(None);
        }
        match self.db.fetch_checkout(&session.checkout_token).await? {
            Some(checkout) => {
                let basket = basket_for_checkout(session, &checkout);
                let id = self.gateway.create_basket(key, &basket).await?;
                Ok(Some(id))
            },
            None => {
                debug!("🔄️💳️ No checkout recorded for payment session [{}]. Skipping the basket", session.id);
                Ok(None)
            },
        }
    }

    /// Leaves the payment session pending with the marketplace for one day.
    pub async fn pend_payment_session(
        &self,
        payment_id: &str,
        reason: PendReason,
    ) -> Result<PaymentSession, PaymentFlowError> {
        let logger = PaymentLogger::new(self.db.clone(), "Payment Session", payment_id);
        let (session, config) = self.payment_context(payment_id, &logger).await?;
        if session.resolution.map(|r| r.is_final()).unwrap_or(false) {
            return Err(PaymentFlowError::InvalidRequest(format!("Payment session {payment_id} is already settled")));
        }
        let result = self.pend_with_marketplace(&session, &config, reason, &logger).await;
        log_failure(&logger, result).await
    }

    async fn pend_with_marketplace(
        &self,
        session: &PaymentSession,
        config: &ShopConfiguration,
        reason: PendReason,
        logger: &PaymentLogger<B>,
    ) -> Result<PaymentSession, PaymentFlowError> {
        let creds = credentials(config)?;
        let expires_at = Utc::now() + Duration::days(1);
        self.marketplace.pend_session(&creds, &session.gid, reason, expires_at).await?;
        self.db.record_resolution(&session.id, SessionStatus::Pending, None).await?;
        let status = match session.kind {
            PaymentKind::Authorization => PaymentSessionStatus::AuthorizationPending,
            PaymentKind::Sale => PaymentSessionStatus::ChargePending,
        };
        self.db.update_payment_status(&session.id, status).await?;
        logger.info("Payment Session pending", Some(&reason)).await;
        self.db
            .fetch_payment_session(&session.id)
            .await?
            .ok_or_else(|| PaymentFlowError::PaymentSessionNotFound(session.id.clone()))
    }

    //------------------------------------------   Child sessions     -------------------------------------------------

    /// Charges the authorized payment and resolves the capture session straight away.
    pub async fn capture(&self, request: CaptureSessionRequest) -> Result<CaptureSession, PaymentFlowError> {
        let capture = self.db.insert_capture_session(request.into()).await?.into_inner();
        let logger = PaymentLogger::new(self.db.clone(), "Capture Session", &capture.payment_id);
        if capture.status.map(|s| s.is_final()).unwrap_or(false) {
            debug!("🔄️📥️ Capture session [{}] was already settled", capture.id);
            return Ok(capture);
        }
        logger.info("Capture Created", Some(&capture)).await;
        let result = self.charge_capture(&capture, &logger).await;
        log_failure(&logger, result).await
    }

    async fn charge_capture(
        &self,
        capture: &CaptureSession,
        logger: &PaymentLogger<B>,
    ) -> Result<CaptureSession, PaymentFlowError> {
        let (session, config) = self.payment_context(&capture.payment_id, logger).await?;
        let (key, _) = keys(&config)?;
        let pid = session.pid.as_deref().ok_or_else(|| PaymentFlowError::PaymentNotStarted(session.id.clone()))?;
        if capture.charge_id.is_none() {
            let charge = self.gateway.charge_authorized(key, pid, Some(capture.amount)).await?;
            logger.debug("Authorization charged", Some(&charge)).await;
            self.db.set_capture_charge_id(&capture.id, &charge.id).await?;
        }
        let creds = credentials(&config)?;
        logger.info("Resolving capture", None::<&()>).await;
        self.marketplace.resolve_session(&creds, SessionKind::Capture, &capture.gid).await?;
        self.db.update_child_session_status(ChildSessionKind::Capture, &capture.id, SessionStatus::Resolve).await?;
        info!("🔄️📥️ Capture session [{}] resolved", capture.id);
        self.db
            .fetch_capture_session(&capture.id)
            .await?
            .ok_or_else(|| PaymentFlowError::DatabaseError(format!("Capture session {} vanished", capture.id)))
    }

    /// Asks the gateway to cancel (part of) the charge. The refund session is resolved when the cancel webhook
    /// arrives.
    pub async fn refund(&self, request: RefundSessionRequest) -> Result<RefundSession, PaymentFlowError> {
        let refund = self.db.insert_refund_session(request.into()).await?.into_inner();
        let logger = PaymentLogger::new(self.db.clone(), "Refund Session", &refund.payment_id);
        if refund.status.map(|s| s.is_final()).unwrap_or(false) {
            debug!("🔄️📤️ Refund session [{}] was already settled", refund.id);
            return Ok(refund);
        }
        logger.info("Refund Created", Some(&refund)).await;
        let result = self.cancel_charge(&refund, &logger).await;
        log_failure(&logger, result).await?;
        Ok(refund)
    }

    async fn cancel_charge(&self, refund: &RefundSession, logger: &PaymentLogger<B>) -> Result<(), PaymentFlowError> {
        let (session, config) = self.payment_context(&refund.payment_id, logger).await?;
        let (key, _) = keys(&config)?;
        let pid = session.pid.as_deref().ok_or_else(|| PaymentFlowError::PaymentNotStarted(session.id.clone()))?;
        let charge_id = self.transaction_to_cancel(&session, TransactionKind::Charge).await?;
        let cancel = NewUnzerCancel {
            payment_id: session.id.clone(),
            pid: pid.to_string(),
            target: CancelTarget::Refund { refund_id: refund.id.clone(), charge_id: charge_id.clone() },
        };
        let cancel = self.db.insert_cancel(cancel).await?.into_inner();
        if cancel.cancel_id.is_some() {
            debug!("🔄️📤️ The charge cancel for refund session [{}] was already requested", refund.id);
            return Ok(());
        }
        logger.debug("Requesting Charge Cancel", None::<&()>).await;
        let charge_id = cancel.charge_id.as_deref().unwrap_or(&charge_id);
        let tx = self.gateway.cancel_charge(key, pid, charge_id, Some(refund.amount)).await?;
        self.db.set_cancel_id(cancel.id, &tx.id).await?;
        info!("🔄️📤️ Gateway cancel {} requested for refund session [{}]", tx.id, refund.id);
        logger.debug("Cancel Charge Requested", Some(&tx)).await;
        Ok(())
    }

    /// Asks the gateway to cancel the authorization. The void session is resolved when the cancel webhook arrives.
    pub async fn void(&self, request: VoidSessionRequest) -> Result<VoidSession, PaymentFlowError> {
        let void = self.db.insert_void_session(request.into()).await?.into_inner();
        let logger = PaymentLogger::new(self.db.clone(), "Void Session", &void.payment_id);
        if void.status.map(|s| s.is_final()).unwrap_or(false) {
            debug!("🔄️🚫️ Void session [{}] was already settled", void.id);
            return Ok(void);
        }
        logger.info("Void Created", Some(&void)).await;
        let result = self.cancel_authorization(&void, &logger).await;
        log_failure(&logger, result).await?;
        Ok(void)
    }

    async fn cancel_authorization(&self, void: &VoidSession, logger: &PaymentLogger<B>) -> Result<(), PaymentFlowError> {
        let (session, config) = self.payment_context(&void.payment_id, logger).await?;
        let (key, _) = keys(&config)?;
        let pid = session.pid.as_deref().ok_or_else(|| PaymentFlowError::PaymentNotStarted(session.id.clone()))?;
        let authorize_id = self.transaction_to_cancel(&session, TransactionKind::Authorize).await?;
        let cancel = NewUnzerCancel {
            payment_id: session.id.clone(),
            pid: pid.to_string(),
            target: CancelTarget::Void { void_id: void.id.clone(), authorize_id: authorize_id.clone() },
        };
        let cancel = self.db.insert_cancel(cancel).await?.into_inner();
        if cancel.cancel_id.is_some() {
            debug!("🔄️🚫️ The authorize cancel for void session [{}] was already requested", void.id);
            return Ok(());
        }
        logger.debug("Requesting Authorize Cancel", None::<&()>).await;
        let authorize_id = cancel.authorize_id.as_deref().unwrap_or(&authorize_id);
        let tx = self.gateway.cancel_authorize(key, pid, authorize_id).await?;
        self.db.set_cancel_id(cancel.id, &tx.id).await?;
        info!("🔄️🚫️ Gateway cancel {} requested for void session [{}]", tx.id, void.id);
        logger.debug("Cancel Authorize Requested", Some(&tx)).await;
        Ok(())
    }

    //------------------------------------------      Helpers         -------------------------------------------------

    async fn shop_configuration(
        &self,
        shop: &str,
        logger: &PaymentLogger<B>,
    ) -> Result<ShopConfiguration, PaymentFlowError> {
        match self.db.fetch_configuration(shop).await? {
            Some(config) if config.gateway_keys().is_some() => Ok(config),
            _ => {
                error!("🔄️ Shop {shop} has no gateway configuration");
                logger.error("Configuration not found", Some(&shop)).await;
                Err(PaymentFlowError::MissingConfiguration(shop.to_string()))
            },
        }
    }

    async fn payment_context(
        &self,
        payment_id: &str,
        logger: &PaymentLogger<B>,
    ) -> Result<(PaymentSession, ShopConfiguration), PaymentFlowError> {
        let session = self
            .db
            .fetch_payment_session(payment_id)
            .await?
            .ok_or_else(|| PaymentFlowError::PaymentSessionNotFound(payment_id.to_string()))?;
        let config = self.shop_configuration(&session.shop, logger).await?;
        Ok((session, config))
    }

    /// The gateway transaction a refund or void cancels. A successful transaction is preferred, and the oldest one
    /// wins.
    async fn transaction_to_cancel(
        &self,
        session: &PaymentSession,
        kind: TransactionKind,
    ) -> Result<String, PaymentFlowError> {
        let transactions = self.db.fetch_transactions(&session.id).await?;
        let candidates = transactions.iter().filter(|t| t.kind == kind).collect::<Vec<_>>();
        let chosen = candidates.iter().find(|t| t.is_success).or(candidates.first());
        chosen.map(|t| t.id.clone()).ok_or_else(|| {
            let name = match kind {
                TransactionKind::Charge => "charge",
                TransactionKind::Authorize => "authorize",
            };
            PaymentFlowError::NothingToCancel(session.id.clone(), name)
        })
    }
}

fn keys(config: &ShopConfiguration) -> Result<(&Secret<String>, &str), PaymentFlowError> {
    config.gateway_keys().ok_or_else(|| PaymentFlowError::MissingConfiguration(config.shop.clone()))
}

fn credentials(config: &ShopConfiguration) -> Result<ShopCredentials, PaymentFlowError> {
    match &config.access_token {
        Some(token) if !token.reveal().is_empty() => Ok(ShopCredentials::new(&config.shop, token.clone())),
        _ => Err(PaymentFlowError::MissingAccessToken(config.shop.clone())),
    }
}

async fn log_failure<T, B: PaymentLogStore>(
    logger: &PaymentLogger<B>,
    result: Result<T, PaymentFlowError>,
) -> Result<T, PaymentFlowError> {
    if let Err(e) = &result {
        warn!("🔄️ Payment session [{}] flow failed. {e}", logger.payment_id());
        logger.error(&e.to_string(), None::<&()>).await;
    }
    result
}
