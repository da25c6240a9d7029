//! Repository for the `processed_deliveries` idempotency ledger.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::delivery::ProcessedDelivery;

pub struct DeliveryRepo;

impl DeliveryRepo {
    pub async fn exists(pool: &PgPool, key: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM processed_deliveries WHERE idempotency_key = $1)",
        )
        .bind(key)
        .fetch_one(pool)
        .await
    }

    /// Record a key. Returns `false` if it was already present.
    pub async fn insert(pool: &PgPool, key: &str, scope: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO processed_deliveries (idempotency_key, scope) VALUES ($1, $2) \
             ON CONFLICT (idempotency_key) DO NOTHING",
        )
        .bind(key)
        .bind(scope)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find(pool: &PgPool, key: &str) -> Result<Option<ProcessedDelivery>, sqlx::Error> {
        sqlx::query_as::<_, ProcessedDelivery>(
            "SELECT idempotency_key, scope, recorded_at FROM processed_deliveries \
             WHERE idempotency_key = $1",
        )
        .bind(key)
        .fetch_optional(pool)
        .await
    }

    /// Delete ledger rows recorded before `cutoff`. Returns the number removed.
    pub async fn delete_older_than(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM processed_deliveries WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
