use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConversaError, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "0.0.0.0";
/// Outbound message body hard cap before the channel client must split into
/// fragments.
pub const MAX_MESSAGE_BODY_CHARS: usize = 4000;
/// Per-fragment packing limits.
pub const MAX_FRAGMENT_LINES: usize = 30;
pub const MAX_FRAGMENT_CHARS: usize = 600;

/// Top-level configuration (`conversa.toml` + `CONVERSA_*` env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub handover: HandoverConfig,
    #[serde(default)]
    pub qualification: QualificationConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            channel: ChannelConfig::default(),
            llm: LlmConfig::default(),
            rate_limit: RateLimitConfig::default(),
            scheduler: SchedulerConfig::default(),
            handover: HandoverConfig::default(),
            qualification: QualificationConfig::default(),
            encryption: EncryptionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Mirrors `WEB_CONCURRENCY`: when >1 the in-process scheduler is
    /// disabled to avoid duplicate fires across replicas.
    #[serde(default = "default_concurrency")]
    pub web_concurrency: u32,
    /// Tenant a webhook delivery is attributed to when it carries no
    /// `X-Tenant-Id` header — the common case for a single-tenant channel
    /// instance pointed at this deployment.
    pub default_tenant_id: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            web_concurrency: default_concurrency(),
            default_tenant_id: None,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_concurrency() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "./conversa.db".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// `CHANNEL_API_TOKEN`.
    pub api_token: Option<String>,
    /// `CHANNEL_API_URL`.
    #[serde(default = "default_channel_url")]
    pub api_url: String,
    /// The bot's own canonicalized phone number, used by the processor to
    /// drop self-originated echoes.
    pub bot_number: Option<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            api_url: default_channel_url(),
            bot_number: None,
        }
    }
}

fn default_channel_url() -> String {
    "https://channel.example.invalid".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `LLM_API_KEY` — default key used for tenants without a tenant-specific key.
    pub default_api_key: Option<String>,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Discovery-call booking link surfaced by the qualifier and RAG
    /// components (`CALENDLY_DISCOVERY_CALL_URL`).
    #[serde(default = "default_discovery_call_url")]
    pub discovery_call_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_api_key: None,
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            discovery_call_url: default_discovery_call_url(),
        }
    }
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_llm_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_discovery_call_url() -> String {
    "https://calendly.com/your-team/discovery-call".to_string()
}

/// `RATE_LIMIT_*` — token-bucket parameters for outbound channel sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_per_minute")]
    pub messages_per_minute: u32,
    #[serde(default = "default_per_hour")]
    pub messages_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            messages_per_minute: default_per_minute(),
            messages_per_hour: default_per_hour(),
        }
    }
}

fn default_per_minute() -> u32 {
    20
}
fn default_per_hour() -> u32 {
    600
}

/// `SCHEDULER_ENABLED` plus tick cadence for the scheduled-message and
/// handover-rescue loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_sched_interval_secs")]
    pub scheduled_message_interval_secs: u64,
    #[serde(default = "default_rescue_interval_secs")]
    pub rescue_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scheduled_message_interval_secs: default_sched_interval_secs(),
            rescue_interval_secs: default_rescue_interval_secs(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_sched_interval_secs() -> u64 {
    60
}
fn default_rescue_interval_secs() -> u64 {
    120
}

/// Handover rescue cadence: how long a conversation can sit with a human
/// handover outstanding before the bot nudges, and finally re-enables itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoverConfig {
    /// Minutes-since-handover at which a progressive update fires.
    #[serde(default = "default_rescue_stages")]
    pub rescue_stage_minutes: Vec<u32>,
    /// Minutes-since-handover at which the bot is auto re-enabled.
    #[serde(default = "default_rescue_timeout_minutes")]
    pub rescue_timeout_minutes: u32,
}

impl Default for HandoverConfig {
    fn default() -> Self {
        Self {
            rescue_stage_minutes: default_rescue_stages(),
            rescue_timeout_minutes: default_rescue_timeout_minutes(),
        }
    }
}

fn default_rescue_stages() -> Vec<u32> {
    vec![10, 20, 30, 45]
}
fn default_rescue_timeout_minutes() -> u32 {
    60
}

/// Discovery-call offer cooldown: minimum gap between two offers to the same
/// contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualificationConfig {
    #[serde(default = "default_cooldown_hours")]
    pub discovery_call_cooldown_hours: i64,
}

impl Default for QualificationConfig {
    fn default() -> Self {
        Self {
            discovery_call_cooldown_hours: default_cooldown_hours(),
        }
    }
}

fn default_cooldown_hours() -> i64 {
    24
}

/// `API_KEY_ENCRYPTION_KEY` — AEAD key for `APIKey.encryptedSecret`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    pub api_key_encryption_key: Option<String>,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            api_key_encryption_key: None,
        }
    }
}

impl AppConfig {
    /// Load config from a TOML file with `CONVERSA_*` env var overrides.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed("CONVERSA_").split("_"))
            .extract()
            .map_err(|e| ConversaError::Config(e.to_string()))
    }
}
