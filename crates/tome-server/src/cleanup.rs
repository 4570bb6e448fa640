use std::time::Duration;

use tome_engine::{Engine, PurgeStatus};
use tracing::{info, warn};

/// Background task that purges recycle bin items past their retention window.
///
/// Runs on an interval across every user. A kind that fails is retried on the
/// next tick; the others are not held back by it.
pub async fn run_purge_loop(engine: Engine, every: Duration) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        let sweep = engine.clone();
        let report = match tokio::task::spawn_blocking(move || {
            sweep.purge_expired(chrono::Utc::now())
        })
        .await
        {
            Ok(report) => report,
            Err(e) => {
                warn!("Purge sweep task failed: {}", e);
                continue;
            }
        };

        match report.status() {
            PurgeStatus::Complete => {
                if report.total_purged() > 0 {
                    info!("Cleanup: purged {} expired items", report.total_purged());
                }
            }
            status => warn!(
                ?status,
                purged = report.total_purged(),
                failed = ?report.failed,
                "Cleanup: sweep did not finish cleanly"
            ),
        }
    }
}
