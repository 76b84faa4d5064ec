//! Request persistence.
//!
//! `RequestStore` abstracts the backend; the workflow only ever sees
//! `Arc<dyn RequestStore>`. Every method is atomic for its caller: rank
//! assignment happens inside `insert`, renumbering inside `delete`, and
//! `update_status` is a compare-and-set so concurrent link clicks cannot both
//! transition the same request.

pub mod file;
pub mod memory;
pub mod postgres;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewServiceRequest, RequestStatus, ServiceRequest};

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another request already holds this approval token.
    #[error("approval token already in use")]
    TokenConflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt data file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Persist a new pending request, assigning its id and the next rank.
    async fn insert(&self, candidate: NewServiceRequest) -> Result<ServiceRequest, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ServiceRequest>, StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<ServiceRequest>, StoreError>;

    /// All requests, ascending `sort_order`.
    async fn list_ordered_by_rank(&self) -> Result<Vec<ServiceRequest>, StoreError>;

    /// Set `status = to` only if it is currently `from`.
    /// Returns whether the row changed.
    async fn update_status(
        &self,
        id: i64,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError>;

    /// Hard delete and renumber the survivors. Returns `false` for an unknown id.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Remove every request. Ids keep counting from where they were.
    async fn clear_all(&self) -> Result<(), StoreError>;
}

/// Which backend `open` builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    File { path: PathBuf },
    Memory,
}

impl StoreBackend {
    pub fn describe(&self) -> String {
        match self {
            StoreBackend::Postgres { .. } => "postgres".to_string(),
            StoreBackend::File { path } => format!("json file {}", path.display()),
            StoreBackend::Memory => "memory".to_string(),
        }
    }
}

/// Connect to (or create) the configured store. Postgres runs its migrations.
pub async fn open(backend: &StoreBackend) -> Result<Arc<dyn RequestStore>, StoreError> {
    let store: Arc<dyn RequestStore> = match backend {
        StoreBackend::Postgres { database_url } => {
            let db = PgStore::connect(database_url).await?;
            tracing::info!("Running migrations...");
            db.migrate().await?;
            Arc::new(db)
        }
        StoreBackend::File { path } => Arc::new(JsonFileStore::open(path).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
