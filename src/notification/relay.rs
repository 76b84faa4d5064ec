use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::{MailTransport, OutgoingMail};

/// Delivers mail by POSTing `{from, to, subject, html}` as JSON to an HTTP
/// mail relay. One attempt per message; the caller logs failures.
#[derive(Clone)]
pub struct HttpRelayTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct RelayReply {
    #[serde(alias = "messageId", alias = "message_id")]
    id: Option<String>,
}

impl HttpRelayTransport {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("ServiceDesk-Mail/1.0")
            .build()
            .context("failed to build mail relay HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl MailTransport for HttpRelayTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<String> {
        let delivery_id = uuid::Uuid::new_v4().to_string();

        let mut req = self
            .client
            .post(&self.endpoint)
            .header("x-delivery-id", &delivery_id)
            .json(mail);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.context("mail relay request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(
                endpoint = %self.endpoint,
                delivery_id = %delivery_id,
                status = %status,
                body = %body,
                "mail relay rejected message"
            );
            anyhow::bail!("mail relay returned error: status={}, body={}", status, body);
        }

        // relays that answer with an id get theirs logged, others get ours
        let message_id = resp
            .json::<RelayReply>()
            .await
            .ok()
            .and_then(|r| r.id)
            .unwrap_or(delivery_id);

        info!(
            endpoint = %self.endpoint,
            message_id = %message_id,
            to = %mail.to,
            "mail handed to relay"
        );
        Ok(message_id)
    }
}
