//! Workflow notifications.
//!
//! The `Dispatcher` decides who gets which mail and hands it to a
//! `MailTransport` on a spawned task. Delivery is best-effort: the outcome
//! is logged and never reaches the store or the HTTP caller.

pub mod compose;
pub mod directory;
pub mod relay;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::models::ServiceRequest;
use directory::{DepartmentDirectory, Fallback};

pub use relay::HttpRelayTransport;

/// Relay payload: `{from, to, subject, htmlBody}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    #[serde(rename = "htmlBody")]
    pub html: String,
}

/// Mail delivery backend. Returns the message id on success.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<String>;
}

/// Writes mail headers to the log instead of sending it. Used when no relay
/// is configured. The body carries approval links and is never logged.
#[derive(Clone, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<String> {
        let message_id = format!("log-{}", uuid::Uuid::new_v4().simple());
        tracing::info!(
            message_id = %message_id,
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            "mail relay not configured, message logged only"
        );
        tracing::debug!(message_id = %message_id, body_bytes = mail.html.len(), "mail body withheld");
        Ok(message_id)
    }
}

/// Fixed addresses and links used in every message.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub from: String,
    pub app_url: String,
    pub it_address: String,
}

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn MailTransport>,
    directory: Arc<DepartmentDirectory>,
    settings: Arc<MailSettings>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        directory: DepartmentDirectory,
        settings: MailSettings,
    ) -> Self {
        Self {
            transport,
            directory: Arc::new(directory),
            settings: Arc::new(settings),
        }
    }

    pub fn directory(&self) -> &DepartmentDirectory {
        &self.directory
    }

    /// Manager mail for a freshly submitted request.
    pub fn submission_mail(&self, request: &ServiceRequest) -> OutgoingMail {
        let recipient = self.directory.resolve(&request.department);
        match recipient.fallback {
            Some(Fallback::UnknownDepartment) => tracing::warn!(
                request_id = request.id,
                department = %request.department,
                "unknown department, sending approval mail to default manager"
            ),
            Some(Fallback::NotConfigured) => tracing::warn!(
                request_id = request.id,
                department = %request.department,
                "manager address not configured, sending approval mail to default manager"
            ),
            None => {}
        }
        compose::submission_mail(
            request,
            &self.settings.from,
            recipient.address,
            &self.settings.app_url,
        )
    }

    pub fn approved_mail(&self, request: &ServiceRequest) -> OutgoingMail {
        compose::approved_mail(request, &self.settings.from, &self.settings.it_address)
    }

    pub fn notify_submission(&self, request: &ServiceRequest) -> JoinHandle<()> {
        let mail = self.submission_mail(request);
        self.deliver("submission", request.id, mail)
    }

    pub fn notify_approved(&self, request: &ServiceRequest) -> JoinHandle<()> {
        let mail = self.approved_mail(request);
        self.deliver("approved", request.id, mail)
    }

    /// Fire-and-forget send. The handle is only useful to tests.
    fn deliver(&self, kind: &'static str, request_id: i64, mail: OutgoingMail) -> JoinHandle<()> {
        let transport = self.transport.clone();
        tokio::spawn(async move {
            match transport.send(&mail).await {
                Ok(message_id) => tracing::info!(
                    kind,
                    request_id,
                    to = %mail.to,
                    message_id = %message_id,
                    "notification sent"
                ),
                Err(e) => tracing::error!(
                    kind,
                    request_id,
                    to = %mail.to,
                    error = %e,
                    "notification failed, dropping"
                ),
            }
        })
    }
}
