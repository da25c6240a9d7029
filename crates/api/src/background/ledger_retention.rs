//! Periodic cleanup of the delivery ledger.
//!
//! Applied deliveries only need to be remembered for as long as the queues
//! can redeliver them. Rows older than the retention period are deleted on a
//! fixed interval.

use std::time::Duration;

use chrono::Utc;
use mediatag_db::repositories::DeliveryRepo;
use mediatag_db::DbPool;
use tokio_util::sync::CancellationToken;

/// Default retention period: 30 days.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Read `LEDGER_RETENTION_DAYS`, falling back to the default when unset or
/// not a positive number.
pub fn retention_days(lookup: impl Fn(&str) -> Option<String>) -> i64 {
    lookup("LEDGER_RETENTION_DAYS")
        .and_then(|v| v.trim().parse().ok())
        .filter(|days: &i64| *days > 0)
        .unwrap_or(DEFAULT_RETENTION_DAYS)
}

/// Run the ledger retention loop until `cancel` is triggered.
pub async fn run(pool: DbPool, retention_days: i64, cancel: CancellationToken) {
    tracing::info!(
        retention_days,
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Ledger retention job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Ledger retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - chrono::Duration::days(retention_days);
                match DeliveryRepo::delete_older_than(&pool, cutoff).await {
                    Ok(deleted) => {
                        if deleted > 0 {
                            tracing::info!(deleted, "Ledger retention: purged old rows");
                        } else {
                            tracing::debug!("Ledger retention: no rows to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Ledger retention: cleanup failed");
                    }
                }
            }
        }
    }
}
