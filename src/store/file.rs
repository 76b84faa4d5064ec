//! Request store backed by a single JSON document on disk.
//!
//! The whole table lives in memory behind a mutex. Each mutation is applied
//! to a copy, written to `<path>.tmp` and renamed over `<path>`; only then is
//! the copy committed. A failed write leaves both the file and the in-memory
//! table unchanged.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::memory::RequestTable;
use super::{RequestStore, StoreError};
use crate::models::{NewServiceRequest, RequestStatus, ServiceRequest};
use crate::workflow::ranking;

pub struct JsonFileStore {
    path: PathBuf,
    table: Mutex<RequestTable>,
}

impl JsonFileStore {
    /// Load `path`, or start empty when it does not exist yet.
    /// Documents whose ranks are not `1..=N` are renumbered on load.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut table = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => RequestTable::new(),
            Ok(bytes) => serde_json::from_slice::<RequestTable>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RequestTable::new(),
            Err(e) => return Err(e.into()),
        };

        let dense = table
            .ordered()
            .iter()
            .enumerate()
            .all(|(i, r)| r.sort_order == i as i64 + 1);
        if !dense {
            tracing::warn!(
                path = %path.display(),
                "request ranks are not contiguous, renumbering"
            );
            ranking::renumber(&mut table.requests);
            write_table(&path, &table).await?;
        }

        tracing::debug!(
            path = %path.display(),
            requests = table.requests.len(),
            "opened json request store"
        );
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the table, persist it, then commit.
    async fn mutate<T, F>(&self, change: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut RequestTable) -> Result<T, StoreError>,
    {
        let mut guard = self.table.lock().await;
        let mut next = guard.clone();
        let out = change(&mut next)?;
        write_table(&self.path, &next).await?;
        *guard = next;
        Ok(out)
    }
}

async fn write_table(path: &Path, table: &RequestTable) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(table)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl RequestStore for JsonFileStore {
    async fn insert(&self, candidate: NewServiceRequest) -> Result<ServiceRequest, StoreError> {
        self.mutate(|table| table.insert(candidate)).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ServiceRequest>, StoreError> {
        Ok(self.table.lock().await.find_by_id(id))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<ServiceRequest>, StoreError> {
        Ok(self.table.lock().await.find_by_token(token))
    }

    async fn list_ordered_by_rank(&self) -> Result<Vec<ServiceRequest>, StoreError> {
        Ok(self.table.lock().await.ordered())
    }

    async fn update_status(
        &self,
        id: i64,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError> {
        // skip the disk write when the compare fails
        let mut guard = self.table.lock().await;
        let mut next = guard.clone();
        if !next.update_status(id, from, to) {
            return Ok(false);
        }
        write_table(&self.path, &next).await?;
        *guard = next;
        Ok(true)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        self.mutate(|table| Ok(table.delete(id))).await
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.mutate(|table| {
            table.clear();
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, token: &str) -> NewServiceRequest {
        NewServiceRequest {
            submitted_at: "16/10/2026, 11:00:00".into(),
            requester_name: name.into(),
            requester_phone: "02-000".into(),
            department: "HR_dep".into(),
            position: "Officer".into(),
            service_type: "Network".into(),
            details: "No wifi".into(),
            asset_id: String::new(),
            software_name: String::new(),
            other_topic: "VPN".into(),
            approval_token: token.into(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("db.json")).await.unwrap();
        assert!(store.list_ordered_by_rank().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        let a = store.insert(candidate("a", "ta")).await.unwrap();
        let b = store.insert(candidate("b", "tb")).await.unwrap();
        assert!(store
            .update_status(b.id, RequestStatus::PendingApproval, RequestStatus::ApprovedPendingIT)
            .await
            .unwrap());
        assert!(store.delete(a.id).await.unwrap());
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let rows = reopened.list_ordered_by_rank().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, b.id);
        assert_eq!(rows[0].sort_order, 1);
        assert_eq!(rows[0].status, RequestStatus::ApprovedPendingIT);

        // the id counter is persisted too
        let c = reopened.insert(candidate("c", "tc")).await.unwrap();
        assert_eq!(c.id, 3);
    }

    #[tokio::test]
    async fn test_legacy_document_is_renumbered_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let legacy = r#"{ "requests": [
            { "id": 4, "sort_order": 9, "submittedAt": "", "requesterName": "late",
              "requesterPhone": "", "department": "IT_dep", "position": "",
              "serviceType": "", "details": "", "status": "Disapproved",
              "approvalToken": "t4" },
            { "id": 2, "sort_order": 3, "submittedAt": "", "requesterName": "early",
              "requesterPhone": "", "department": "IT_dep", "position": "",
              "serviceType": "", "details": "", "status": "Pending Manager Approval",
              "approvalToken": "t2" }
        ] }"#;
        tokio::fs::write(&path, legacy).await.unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        let rows = store.list_ordered_by_rank().await.unwrap();
        let view: Vec<(&str, i64)> = rows
            .iter()
            .map(|r| (r.requester_name.as_str(), r.sort_order))
            .collect();
        assert_eq!(view, vec![("early", 1), ("late", 2)]);

        let on_disk: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(on_disk["requests"][0]["requesterName"], "early");
        assert_eq!(on_disk["requests"][0]["sort_order"], 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();
        let err = JsonFileStore::open(&path).await.err().unwrap();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_table_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.insert(candidate("a", "ta")).await.unwrap();

        // a directory where the temp file should go makes the write fail
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::create_dir(PathBuf::from(tmp)).unwrap();

        assert!(store.insert(candidate("b", "tb")).await.is_err());
        let rows = store.list_ordered_by_rank().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].requester_name, "a");
    }
}
