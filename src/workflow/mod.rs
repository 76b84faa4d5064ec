//! Request workflow: submission, token-gated decisions, admin maintenance.
//!
//! `Workflow` is the only writer of request status. It owns the injected
//! store and dispatcher; notifications are spawned after the store write has
//! committed and cannot undo it.

pub mod machine;
pub mod ranking;
pub mod token;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::errors::AppError;
use crate::models::{NewServiceRequest, ServiceRequest};
use crate::notification::Dispatcher;
use crate::store::{RequestStore, StoreError};

pub use machine::{Decision, TransitionError};

/// Fresh tokens tried before an insert gives up on collisions.
const MAX_TOKEN_ATTEMPTS: usize = 3;

const SUBMITTED_AT_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// Submission form as posted by the request page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub position: String,
    #[serde(default, rename = "serviceType")]
    pub service_type: String,
    #[serde(default)]
    pub details: String,
    #[serde(default, rename = "assetID")]
    pub asset_id: Option<String>,
    #[serde(default, rename = "softwareName")]
    pub software_name: Option<String>,
    #[serde(default, rename = "otherTopic")]
    pub other_topic: Option<String>,
}

impl SubmissionForm {
    /// Trim everything and reject blank required fields.
    fn validate(self) -> Result<ValidForm, AppError> {
        let required = [
            ("name", self.name),
            ("phone", self.phone),
            ("department", self.department),
            ("position", self.position),
            ("service type", self.service_type),
            ("details", self.details),
        ];
        let mut values = Vec::with_capacity(required.len());
        for (label, value) in required {
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(AppError::Validation(format!("{} is required", label)));
            }
            values.push(value);
        }
        let optional = |v: Option<String>| v.map(|s| s.trim().to_string()).unwrap_or_default();
        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(ValidForm {
            name: next(),
            phone: next(),
            department: next(),
            position: next(),
            service_type: next(),
            details: next(),
            asset_id: optional(self.asset_id),
            software_name: optional(self.software_name),
            other_topic: optional(self.other_topic),
        })
    }
}

struct ValidForm {
    name: String,
    phone: String,
    department: String,
    position: String,
    service_type: String,
    details: String,
    asset_id: String,
    software_name: String,
    other_topic: String,
}

/// A committed request change and the notification it triggered. Dropping
/// `notification` detaches the send; awaiting it waits for delivery to end.
#[derive(Debug)]
pub struct Notified {
    pub request: ServiceRequest,
    pub notification: JoinHandle<()>,
}

#[derive(Clone)]
pub struct Workflow {
    store: Arc<dyn RequestStore>,
    dispatcher: Dispatcher,
    utc_offset: FixedOffset,
    clock: fn() -> DateTime<Utc>,
}

impl Workflow {
    pub fn new(store: Arc<dyn RequestStore>, dispatcher: Dispatcher, utc_offset: FixedOffset) -> Self {
        Self {
            store,
            dispatcher,
            utc_offset,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn RequestStore> {
        &self.store
    }

    fn submitted_at(&self) -> String {
        (self.clock)()
            .with_timezone(&self.utc_offset)
            .format(SUBMITTED_AT_FORMAT)
            .to_string()
    }

    /// Persist a new pending request and mail its department manager.
    pub async fn submit(&self, form: SubmissionForm) -> Result<Notified, AppError> {
        let form = form.validate()?;
        let submitted_at = self.submitted_at();

        let mut attempt = 0;
        let request = loop {
            attempt += 1;
            let candidate = NewServiceRequest {
                submitted_at: submitted_at.clone(),
                requester_name: form.name.clone(),
                requester_phone: form.phone.clone(),
                department: form.department.clone(),
                position: form.position.clone(),
                service_type: form.service_type.clone(),
                details: form.details.clone(),
                asset_id: form.asset_id.clone(),
                software_name: form.software_name.clone(),
                other_topic: form.other_topic.clone(),
                approval_token: token::generate_approval_token(),
            };
            match self.store.insert(candidate).await {
                Ok(request) => break request,
                Err(StoreError::TokenConflict) if attempt < MAX_TOKEN_ATTEMPTS => {
                    tracing::warn!(attempt, "approval token collided, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(
            request_id = request.id,
            rank = request.sort_order,
            department = %request.department,
            "service request submitted"
        );
        let notification = self.dispatcher.notify_submission(&request);
        Ok(Notified { request, notification })
    }

    /// Manager approval. Notifies the IT team on success.
    pub async fn approve(&self, token: &str) -> Result<Notified, AppError> {
        let request = self.decide(token, Decision::Approve).await?;
        let notification = self.dispatcher.notify_approved(&request);
        Ok(Notified { request, notification })
    }

    /// Manager disapproval. No follow-up mail.
    pub async fn disapprove(&self, token: &str) -> Result<ServiceRequest, AppError> {
        self.decide(token, Decision::Disapprove).await
    }

    async fn decide(&self, token: &str, decision: Decision) -> Result<ServiceRequest, AppError> {
        let shown = token::redact(token);
        let Some(mut request) = self.store.find_by_token(token).await? else {
            tracing::debug!(token = %shown, %decision, "no request for token");
            return Err(AppError::StaleOrUnknownToken);
        };

        let target = request.status.apply(decision).map_err(|e| {
            tracing::debug!(request_id = request.id, token = %shown, "{}", e);
            AppError::StaleOrUnknownToken
        })?;

        if !self
            .store
            .update_status(request.id, request.status, target)
            .await?
        {
            // someone else actioned it between our read and write
            tracing::info!(request_id = request.id, %decision, "lost decision race");
            return Err(AppError::StaleOrUnknownToken);
        }

        request.status = target;
        tracing::info!(
            request_id = request.id,
            %decision,
            status = %request.status,
            "service request decided"
        );
        Ok(request)
    }

    pub async fn get(&self, id: i64) -> Result<ServiceRequest, AppError> {
        self.store.find_by_id(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<ServiceRequest>, AppError> {
        Ok(self.store.list_ordered_by_rank().await?)
    }

    /// Admin delete. An unknown id is a no-op and returns `false`.
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let deleted = self.store.delete(id).await?;
        if deleted {
            tracing::info!(request_id = id, "service request deleted");
        } else {
            tracing::debug!(request_id = id, "delete of unknown request ignored");
        }
        Ok(deleted)
    }

    pub async fn clear_all(&self) -> Result<(), AppError> {
        self.store.clear_all().await?;
        tracing::info!("all service requests cleared");
        Ok(())
    }
}
