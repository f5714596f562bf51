//! The merchant-facing audit trail for a payment session.
//!
//! Writing to the audit trail never fails the operation being logged. If an entry cannot be stored, the logger makes
//! one attempt to store an error entry in its place, and after that only the process log is left.
use log::*;
use serde::Serialize;

use crate::{
    db_types::{LogMessageType, NewPaymentLog},
    traits::PaymentLogStore,
};

const SYSTEM_PREFIX: &str = "SYSTEM";

pub struct PaymentLogger<B> {
    db: B,
    prefix: String,
    payment_id: String,
}

impl<B> PaymentLogger<B>
where B: PaymentLogStore
{
    pub fn new(db: B, prefix: &str, payment_id: &str) -> Self {
        Self { db, prefix: prefix.to_string(), payment_id: payment_id.to_string() }
    }

    pub fn payment_id(&self) -> &str {
        self.payment_id.as_str()
    }

    pub async fn debug<P: Serialize>(&self, message: &str, payload: Option<&P>) {
        self.log(LogMessageType::Debug, message, payload).await
    }

    pub async fn info<P: Serialize>(&self, message: &str, payload: Option<&P>) {
        self.log(LogMessageType::Info, message, payload).await
    }

    pub async fn warn<P: Serialize>(&self, message: &str, payload: Option<&P>) {
        self.log(LogMessageType::Warn, message, payload).await
    }

    pub async fn error<P: Serialize>(&self, message: &str, payload: Option<&P>) {
        self.log(LogMessageType::Error, message, payload).await
    }

    pub async fn log<P: Serialize>(&self, log_type: LogMessageType, message: &str, payload: Option<&P>) {
        let payload = payload.and_then(|p| serde_json::to_string(p).ok());
        let entry = NewPaymentLog {
            payment_id: self.payment_id.clone(),
            log_type,
            prefix: self.prefix.clone(),
            message: message.to_string(),
            payload,
        };
        if let Err(e) = self.db.append_log(entry).await {
            warn!("📝️ Could not store {log_type} log for payment session [{}]: {e}", self.payment_id);
            let fallback = NewPaymentLog {
                payment_id: self.payment_id.clone(),
                log_type: LogMessageType::Error,
                prefix: SYSTEM_PREFIX.to_string(),
                message: "Could not store log message".to_string(),
                payload: Some(e.to_string()),
            };
            if let Err(e) = self.db.append_log(fallback).await {
                error!("📝️ The audit trail for payment session [{}] is unavailable: {e}", self.payment_id);
            }
        }
    }
}
