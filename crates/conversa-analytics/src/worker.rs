use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use crate::repository::AnalyticsRepository;
use crate::sink::AnalyticsQueue;

const DRAIN_INTERVAL_SECS: u64 = 5;

/// Periodically drains the in-memory queue to durable storage. Runs as its
/// own worker so a slow database never backs up the request-handling path.
pub async fn run(queue: Arc<AnalyticsQueue>, repository: Arc<AnalyticsRepository>, mut shutdown: watch::Receiver<bool>) {
    info!("analytics drain worker started");
    let mut interval = tokio::time::interval(Duration::from_secs(DRAIN_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let batch = queue.drain();
                if batch.is_empty() {
                    continue;
                }
                let count = batch.len();
                if let Err(e) = repository.persist_batch(batch) {
                    error!("analytics drain failed: {e}");
                } else {
                    info!(count, "analytics batch persisted");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    let remaining = queue.drain();
                    if !remaining.is_empty() {
                        if let Err(e) = repository.persist_batch(remaining) {
                            error!("final analytics drain failed: {e}");
                        }
                    }
                    info!("analytics drain worker shutting down");
                    break;
                }
            }
        }
    }
}
