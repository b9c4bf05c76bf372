//! Outbound SMS
//!
//! `SnsSmsSender` publishes transactional SMS through AWS SNS.
//! `LogSmsSender` only logs, for development without AWS credentials.

use super::tasks::BackgroundTasks;
use crate::validators::mask_phone;
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_sns::types::MessageAttributeValue;
use aws_sdk_sns::Client as SnsClient;
use std::sync::Arc;
use tracing::{info, warn};

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> anyhow::Result<()>;
}

pub struct SnsSmsSender {
    client: SnsClient,
    sender_id: String,
}

impl SnsSmsSender {
    pub fn new(client: SnsClient, sender_id: impl Into<String>) -> Self {
        Self {
            client,
            sender_id: sender_id.into(),
        }
    }
}

#[async_trait]
impl SmsSender for SnsSmsSender {
    async fn send(&self, phone: &str, message: &str) -> anyhow::Result<()> {
        let sms_type = MessageAttributeValue::builder()
            .data_type("String")
            .string_value("Transactional")
            .build()
            .context("Failed to build SMS type attribute")?;
        let sender_id = MessageAttributeValue::builder()
            .data_type("String")
            .string_value(&self.sender_id)
            .build()
            .context("Failed to build SMS sender attribute")?;

        let output = self
            .client
            .publish()
            .phone_number(phone)
            .message(message)
            .message_attributes("AWS.SNS.SMS.SMSType", sms_type)
            .message_attributes("AWS.SNS.SMS.SenderID", sender_id)
            .send()
            .await
            .context("Failed to send SMS")?;

        info!(
            phone = %mask_phone(phone),
            message_id = ?output.message_id(),
            "SMS sent successfully"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSmsSender;

#[async_trait]
impl SmsSender for LogSmsSender {
    async fn send(&self, phone: &str, message: &str) -> anyhow::Result<()> {
        warn!(
            phone = %mask_phone(phone),
            message = %message,
            "SMS service not configured - message logged for development"
        );
        Ok(())
    }
}

/// Account notices, always delivered off the request path
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn SmsSender>,
    tasks: BackgroundTasks,
}

impl Notifier {
    pub fn new(sender: Arc<dyn SmsSender>, tasks: BackgroundTasks) -> Self {
        Self { sender, tasks }
    }

    pub fn otp_issued(&self, phone: &str, code: &str, valid_minutes: i64) {
        let message = format!(
            "Your verification code is {}. It expires in {} minutes.",
            code, valid_minutes
        );
        self.dispatch("sms_otp", phone, message);
    }

    pub fn account_locked(&self, phone: &str) {
        let message = "Your account has been locked after too many failed PIN attempts. \
                       Reset your PIN with a one-time code or contact support."
            .to_string();
        self.dispatch("sms_account_locked", phone, message);
    }

    fn dispatch(&self, task: &'static str, phone: &str, message: String) {
        let sender = self.sender.clone();
        let phone = phone.to_string();
        self.tasks
            .spawn(task, async move { sender.send(&phone, &message).await });
    }
}
