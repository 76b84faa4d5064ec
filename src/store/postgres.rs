use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use super::{RequestStore, StoreError};
use crate::models::{NewServiceRequest, RequestStatus, ServiceRequest};

/// Advisory lock serializing rank assignment and renumbering.
const RANK_LOCK_KEY: i64 = 0x5e41_d35c;

const COLUMNS: &str = "id, sort_order, submitted_at, requester_name, requester_phone, department, \
     position, service_type, details, asset_id, software_name, other_topic, status, approval_token";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn lock_ranks(tx: &mut Transaction<'_, Postgres>) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(RANK_LOCK_KEY)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RequestStore for PgStore {
    async fn insert(&self, candidate: NewServiceRequest) -> Result<ServiceRequest, StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_ranks(&mut tx).await?;

        let sql = format!(
            r#"INSERT INTO service_requests
                   (sort_order, submitted_at, requester_name, requester_phone, department,
                    position, service_type, details, asset_id, software_name, other_topic,
                    status, approval_token)
               VALUES ((SELECT COALESCE(MAX(sort_order), 0) + 1 FROM service_requests),
                       $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               RETURNING {COLUMNS}"#
        );
        let row = sqlx::query_as::<_, ServiceRequest>(&sql)
            .bind(&candidate.submitted_at)
            .bind(&candidate.requester_name)
            .bind(&candidate.requester_phone)
            .bind(&candidate.department)
            .bind(&candidate.position)
            .bind(&candidate.service_type)
            .bind(&candidate.details)
            .bind(&candidate.asset_id)
            .bind(&candidate.software_name)
            .bind(&candidate.other_topic)
            .bind(RequestStatus::PendingApproval)
            .bind(&candidate.approval_token)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    StoreError::TokenConflict
                }
                other => {
                    tracing::error!("insert service request failed: {:?}", other);
                    StoreError::Database(other)
                }
            })?;

        tx.commit().await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ServiceRequest>, StoreError> {
        let row = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {COLUMNS} FROM service_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<ServiceRequest>, StoreError> {
        let row = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {COLUMNS} FROM service_requests WHERE approval_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_ordered_by_rank(&self) -> Result<Vec<ServiceRequest>, StoreError> {
        let rows = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {COLUMNS} FROM service_requests ORDER BY sort_order ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_status(
        &self,
        id: i64,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE service_requests SET status = $1 WHERE id = $2 AND status = $3")
                .bind(to)
                .bind(id)
                .bind(from)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_ranks(&mut tx).await?;

        let deleted = sqlx::query("DELETE FROM service_requests WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let renumbered = sqlx::query(
            r#"
            UPDATE service_requests AS s
            SET sort_order = r.rank
            FROM (
                SELECT id, ROW_NUMBER() OVER (ORDER BY sort_order, id) AS rank
                FROM service_requests
            ) AS r
            WHERE s.id = r.id AND s.sort_order <> r.rank
            "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        if renumbered.rows_affected() > 0 {
            tracing::debug!(
                rows = renumbered.rows_affected(),
                "renumbered service requests after delete"
            );
        }
        Ok(true)
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        // DELETE, not TRUNCATE ... RESTART IDENTITY: ids must not be reused
        let mut tx = self.pool.begin().await?;
        Self::lock_ranks(&mut tx).await?;
        let removed = sqlx::query("DELETE FROM service_requests")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(rows = removed.rows_affected(), "cleared all service requests");
        Ok(())
    }
}
