use mediatag_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `processed_deliveries` idempotency ledger.
#[derive(Debug, Clone, FromRow)]
pub struct ProcessedDelivery {
    pub idempotency_key: String,
    pub scope: String,
    pub recorded_at: Timestamp,
}
