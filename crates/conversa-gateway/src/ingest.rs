use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{error, warn};

use conversa_processor::{InboundEvent, MessageProcessor};

use crate::credentials::GatewayCredentialResolver;

/// Number of sharded processing workers. Each shard is a single-consumer
/// queue, so routing every event for a given `(tenant, from)` to the same
/// shard serializes that conversation's processing without a global lock.
const NUM_WORKERS: usize = 8;
/// Per-shard capacity; `NUM_WORKERS * SHARD_CAPACITY` covers the bounded
/// in-process queue floor of 1024.
const SHARD_CAPACITY: usize = 160;

/// Hands fast-acknowledged webhook deliveries off to a pool of background
/// workers that run the full message-processing pipeline. The webhook
/// handler only validates and enqueues; this is where the AI reply actually
/// gets generated and sent.
pub struct IngestQueue {
    shards: Vec<mpsc::Sender<InboundEvent>>,
}

impl IngestQueue {
    pub fn spawn(
        processor: Arc<MessageProcessor>,
        credentials: Arc<GatewayCredentialResolver>,
        bot_number: Option<String>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let mut shards = Vec::with_capacity(NUM_WORKERS);
        for worker_id in 0..NUM_WORKERS {
            let (tx, rx) = mpsc::channel::<InboundEvent>(SHARD_CAPACITY);
            tokio::spawn(run_worker(
                worker_id,
                rx,
                processor.clone(),
                credentials.clone(),
                bot_number.clone(),
                shutdown.clone(),
            ));
            shards.push(tx);
        }
        Self { shards }
    }

    /// Enqueues `event` on the shard owned by its `(tenant, from)` pair.
    /// Returns `false` when that shard is full — the caller should answer
    /// the webhook with 503 so the upstream gateway retries later.
    pub fn try_enqueue(&self, event: InboundEvent) -> bool {
        let shard = shard_index(&event, self.shards.len());
        match self.shards[shard].try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(shard, "ingest queue shard full, rejecting webhook for upstream retry");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(shard, "ingest queue shard closed, rejecting webhook");
                false
            }
        }
    }
}

async fn run_worker(
    worker_id: usize,
    mut rx: mpsc::Receiver<InboundEvent>,
    processor: Arc<MessageProcessor>,
    credentials: Arc<GatewayCredentialResolver>,
    bot_number: Option<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            maybe_event = rx.recv() => {
                let Some(event) = maybe_event else { break };
                let tenant = event.tenant.clone();
                let Some(creds) = credentials.tenant_credentials(&tenant) else {
                    error!(worker_id, %tenant, "no credentials resolvable, dropping inbound event");
                    continue;
                };
                if let Err(e) = processor.process(event, &creds, bot_number.as_deref()).await {
                    error!(worker_id, %tenant, error = %e, "inbound event processing failed");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

fn shard_index(event: &InboundEvent, shard_count: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    event.tenant.as_str().hash(&mut hasher);
    event.from.hash(&mut hasher);
    (hasher.finish() as usize) % shard_count
}
