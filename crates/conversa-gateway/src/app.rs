use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use rusqlite::Connection;
use tokio::sync::watch;

use conversa_analytics::{AnalyticsQueue, AnalyticsRepository};
use conversa_campaign::{CampaignRepository, CampaignRunner};
use conversa_channel::{ChannelClient, HttpChannelClient};
use conversa_context::ContextRepository;
use conversa_core::config::AppConfig;
use conversa_core::crypto::MasterKey;
use conversa_knowledge::KnowledgeStore;
use conversa_llm::{KeyCache, LlmProvider, OpenAiProvider};
use conversa_processor::MessageProcessor;
use conversa_qualifier::DiscoveryCallCooldown;
use conversa_scheduler::{ScheduleRepository, SchedulerEngine};

use crate::credentials::GatewayCredentialResolver;
use crate::ingest::IngestQueue;

const EMBEDDING_DIMENSIONS: usize = 1536;

/// Every component wired as an explicit `Arc`-shared dependency — no global
/// singletons. `AppState` is the composition root: it owns the database
/// connections, the background workers, and the queue the webhook handler
/// hands inbound events off to.
pub struct AppState {
    pub config: AppConfig,
    pub context: Arc<ContextRepository>,
    pub credentials: Arc<GatewayCredentialResolver>,
    pub ingest: IngestQueue,
    pub campaign_repository: Arc<CampaignRepository>,
    pub campaign_runner: Arc<CampaignRunner>,
    pub analytics_queue: Arc<AnalyticsQueue>,
}

impl AppState {
    /// Opens one SQLite connection per repository (each in WAL mode, so
    /// readers never block writers) and spawns the scheduler, campaign, and
    /// analytics-drain background workers. Returns the state plus the
    /// shutdown sender the caller uses to stop them on SIGTERM.
    pub fn new(config: AppConfig) -> anyhow::Result<(Arc<Self>, watch::Sender<bool>)> {
        let context = Arc::new(ContextRepository::new(open_conn(&config.database.path)?)?);
        let knowledge = Arc::new(KnowledgeStore::new(open_conn(&config.database.path)?, EMBEDDING_DIMENSIONS)?);
        let schedule_repo = Arc::new(ScheduleRepository::new(open_conn(&config.database.path)?)?);
        let campaign_repository = Arc::new(CampaignRepository::new(open_conn(&config.database.path)?)?);
        let analytics_repository = Arc::new(AnalyticsRepository::new(open_conn(&config.database.path)?)?);
        let analytics_queue = Arc::new(AnalyticsQueue::new(4096));

        let master = master_key(&config)?;
        let llm_cache = Arc::new(KeyCache::new(master.clone()));
        let credentials = Arc::new(GatewayCredentialResolver::new(context.clone(), master, llm_cache, &config));

        let channel: Arc<dyn ChannelClient> = Arc::new(HttpChannelClient::new(config.channel.api_url.clone()));
        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(config.llm.base_url.clone()));
        let cooldown = Arc::new(DiscoveryCallCooldown::new(config.qualification.discovery_call_cooldown_hours));
        let rate_limiter = Arc::new(conversa_channel::RateLimiter::new(
            config.rate_limit.messages_per_minute,
            config.rate_limit.messages_per_hour,
        ));

        let processor = Arc::new(MessageProcessor::new(
            channel.clone(),
            llm,
            knowledge,
            context.clone(),
            cooldown,
            rate_limiter,
            analytics_queue.clone(),
            config.llm.model.clone(),
            config.llm.discovery_call_url.clone(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let ingest = IngestQueue::spawn(
            processor,
            credentials.clone(),
            config.channel.bot_number.clone(),
            shutdown_rx.clone(),
        );

        if config.scheduler.enabled && config.gateway.web_concurrency <= 1 {
            let scheduler = SchedulerEngine::new(
                schedule_repo,
                context.clone(),
                channel.clone(),
                credentials.clone(),
                config.scheduler.scheduled_message_interval_secs,
                config.scheduler.rescue_interval_secs,
                config.handover.rescue_stage_minutes.clone(),
                i64::from(config.handover.rescue_timeout_minutes),
            );
            tokio::spawn(scheduler.run(shutdown_rx.clone()));
        } else {
            tracing::info!("in-process scheduler disabled (SCHEDULER_ENABLED=false or WEB_CONCURRENCY>1)");
        }

        let campaign_runner = Arc::new(CampaignRunner::new(campaign_repository.clone(), channel));

        tokio::spawn(conversa_analytics::worker::run(analytics_queue.clone(), analytics_repository, shutdown_rx));

        let state = Arc::new(Self {
            config,
            context,
            credentials,
            ingest,
            campaign_repository,
            campaign_runner,
            analytics_queue,
        });
        Ok((state, shutdown_tx))
    }
}

fn open_conn(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(conn)
}

fn master_key(config: &AppConfig) -> anyhow::Result<MasterKey> {
    let encoded = config
        .encryption
        .api_key_encryption_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("API_KEY_ENCRYPTION_KEY is not configured"))?;
    Ok(MasterKey::from_base64(encoded)?)
}

/// Assembles the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/webhook", post(crate::http::webhook::webhook_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
