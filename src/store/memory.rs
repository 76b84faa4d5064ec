//! In-process request store.
//!
//! `RequestTable` holds the records and implements every store operation on
//! plain data. `MemoryStore` wraps it in a mutex; `JsonFileStore` wraps the
//! same table and writes it to disk after each change.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{RequestStore, StoreError};
use crate::models::{NewServiceRequest, RequestStatus, ServiceRequest};
use crate::workflow::ranking;

/// Flat request table. Serialized as `{ "requests": [...], "nextId": n }`;
/// documents without `nextId` derive it from the highest stored id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTable {
    #[serde(default)]
    pub requests: Vec<ServiceRequest>,
    #[serde(default)]
    next_id: i64,
}

impl RequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id to hand out. Never lower than `max(id) + 1`, so ids survive
    /// deletes and clears without reuse.
    fn allocate_id(&mut self) -> i64 {
        let floor = self.requests.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let id = self.next_id.max(floor);
        self.next_id = id + 1;
        id
    }

    pub fn insert(&mut self, candidate: NewServiceRequest) -> Result<ServiceRequest, StoreError> {
        if self
            .requests
            .iter()
            .any(|r| r.approval_token == candidate.approval_token)
        {
            return Err(StoreError::TokenConflict);
        }
        let id = self.allocate_id();
        let rank = ranking::next_rank(self.requests.iter().map(|r| r.sort_order));
        let request = candidate.into_request(id, rank);
        self.requests.push(request.clone());
        Ok(request)
    }

    pub fn find_by_id(&self, id: i64) -> Option<ServiceRequest> {
        self.requests.iter().find(|r| r.id == id).cloned()
    }

    pub fn find_by_token(&self, token: &str) -> Option<ServiceRequest> {
        self.requests
            .iter()
            .find(|r| r.approval_token == token)
            .cloned()
    }

    pub fn ordered(&self) -> Vec<ServiceRequest> {
        let mut rows = self.requests.clone();
        ranking::sort_by_rank(&mut rows);
        rows
    }

    pub fn update_status(&mut self, id: i64, from: RequestStatus, to: RequestStatus) -> bool {
        match self.requests.iter_mut().find(|r| r.id == id) {
            Some(request) if request.status == from => {
                request.status = to;
                true
            }
            _ => false,
        }
    }

    pub fn delete(&mut self, id: i64) -> bool {
        let Some(index) = self.requests.iter().position(|r| r.id == id) else {
            return false;
        };
        // keep the id counter ahead of the removed record
        self.next_id = self.next_id.max(self.requests[index].id + 1);
        self.requests.remove(index);
        ranking::renumber(&mut self.requests);
        true
    }

    pub fn clear(&mut self) {
        let floor = self.requests.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        self.next_id = self.next_id.max(floor);
        self.requests.clear();
    }
}

/// Request store held in memory. All state is lost on restart.
pub struct MemoryStore {
    table: Mutex<RequestTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(RequestTable::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn insert(&self, candidate: NewServiceRequest) -> Result<ServiceRequest, StoreError> {
        self.table.lock().await.insert(candidate)
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
        Ok(self.table.lock().await.update_status(id, from, to))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.table.lock().await.delete(id))
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.table.lock().await.clear();
        Ok(())
    }
}
