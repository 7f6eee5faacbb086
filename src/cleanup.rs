//! Scheduled purge of long-dead token records.
//!
//! Expiry itself is enforced lazily by the authority; this only reclaims
//! storage for records that have been invalid for a long time.

use crate::authority::now_unix;
use crate::db::Database;
use std::time::Duration;
use tracing::{error, info};

/// How long an expired record is kept before it is deleted.
pub const EXPIRED_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database) {
    let cutoff = now_unix() - EXPIRED_RETENTION.as_secs() as i64;
    match db.tokens().purge_expired_before(cutoff).await {
        Ok(count) if count > 0 => info!("Purged {} long-expired tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to purge expired tokens: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&db).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cleanup_keeps_recently_expired_records() {
        let db = Database::open(":memory:").await.unwrap();
        let now = now_unix();
        let retention = EXPIRED_RETENTION.as_secs() as i64;

        db.tokens()
            .create("ancient", "pro-1", now - retention - 60, now - retention - 120)
            .await
            .unwrap();
        db.tokens()
            .create("yesterday", "pro-1", now - 86_400, now - 90_000)
            .await
            .unwrap();
        db.tokens()
            .create("live", "pro-1", now + 3600, now)
            .await
            .unwrap();

        run_cleanup(&db).await;

        assert!(db.tokens().get("ancient").await.unwrap().is_none());
        assert!(db.tokens().get("yesterday").await.unwrap().is_some());
        assert!(db.tokens().get("live").await.unwrap().is_some());
    }
}
