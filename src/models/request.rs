use serde::{Deserialize, Serialize};

/// A stored IT service request.
///
/// Serde names follow the flat `db.json` layout so existing data files load
/// without conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    pub id: i64,
    #[serde(rename = "sort_order", default)]
    pub sort_order: i64,
    pub submitted_at: String,
    pub requester_name: String,
    pub requester_phone: String,
    pub department: String,
    pub position: String,
    pub service_type: String,
    pub details: String,
    #[serde(rename = "assetID", default)]
    pub asset_id: String,
    #[serde(default)]
    pub software_name: String,
    #[serde(default)]
    pub other_topic: String,
    pub status: RequestStatus,
    pub approval_token: String,
}

/// Insert candidate: everything except the store-assigned `id` and `sort_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServiceRequest {
    pub submitted_at: String,
    pub requester_name: String,
    pub requester_phone: String,
    pub department: String,
    pub position: String,
    pub service_type: String,
    pub details: String,
    pub asset_id: String,
    pub software_name: String,
    pub other_topic: String,
    pub approval_token: String,
}

impl NewServiceRequest {
    /// Materialize the record once the store has picked an id and a rank.
    /// New records always start out pending.
    pub fn into_request(self, id: i64, sort_order: i64) -> ServiceRequest {
        ServiceRequest {
            id,
            sort_order,
            submitted_at: self.submitted_at,
            requester_name: self.requester_name,
            requester_phone: self.requester_phone,
            department: self.department,
            position: self.position,
            service_type: self.service_type,
            details: self.details,
            asset_id: self.asset_id,
            software_name: self.software_name,
            other_topic: self.other_topic,
            status: RequestStatus::PendingApproval,
            approval_token: self.approval_token,
        }
    }
}

/// Lifecycle of a request. `PendingApproval` is the only non-terminal state.
///
/// The persisted form is the human-readable label, both in the JSON document
/// and in the `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum RequestStatus {
    #[serde(rename = "Pending Manager Approval")]
    #[sqlx(rename = "Pending Manager Approval")]
    PendingApproval,
    #[serde(rename = "Approved, Pending IT")]
    #[sqlx(rename = "Approved, Pending IT")]
    ApprovedPendingIT,
    #[serde(rename = "Disapproved")]
    #[sqlx(rename = "Disapproved")]
    Disapproved,
}

impl RequestStatus {
    pub fn label(self) -> &'static str {
        match self {
            RequestStatus::PendingApproval => "Pending Manager Approval",
            RequestStatus::ApprovedPendingIT => "Approved, Pending IT",
            RequestStatus::Disapproved => "Disapproved",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::PendingApproval)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ServiceRequest {
        NewServiceRequest {
            submitted_at: "16/10/2026, 09:15:00".into(),
            requester_name: "Somchai".into(),
            requester_phone: "1234".into(),
            department: "IT_dep".into(),
            position: "Clerk".into(),
            service_type: "Hardware".into(),
            details: "Broken keyboard".into(),
            asset_id: "A-42".into(),
            software_name: String::new(),
            other_topic: String::new(),
            approval_token: "ab".repeat(20),
        }
        .into_request(3, 1)
    }

    #[test]
    fn test_new_request_starts_pending() {
        let req = sample();
        assert_eq!(req.id, 3);
        assert_eq!(req.sort_order, 1);
        assert_eq!(req.status, RequestStatus::PendingApproval);
        assert!(!req.status.is_terminal());
    }

    #[test]
    fn test_json_layout_matches_data_file() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["sort_order"], 1);
        assert_eq!(json["requesterName"], "Somchai");
        assert_eq!(json["assetID"], "A-42");
        assert_eq!(json["status"], "Pending Manager Approval");
        assert!(json.get("approvalToken").is_some());
    }

    #[test]
    fn test_legacy_record_without_optional_fields_loads() {
        let raw = r#"{
            "id": 7,
            "submittedAt": "1/2/2025, 10:00:00",
            "requesterName": "A",
            "requesterPhone": "1",
            "department": "HR_dep",
            "position": "P",
            "serviceType": "Other",
            "details": "D",
            "status": "Approved, Pending IT",
            "approvalToken": "tok"
        }"#;
        let req: ServiceRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.sort_order, 0);
        assert_eq!(req.asset_id, "");
        assert_eq!(req.status, RequestStatus::ApprovedPendingIT);
        assert!(req.status.is_terminal());
    }
}
