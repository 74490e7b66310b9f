use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use conversa_context::{WebhookEvent, WebhookEventStatus};
use conversa_core::domain::MessageStatus;
use conversa_core::ids::TenantId;
use conversa_core::phone;
use conversa_processor::InboundEvent;

use crate::app::AppState;

/// `POST /webhook` envelope: `{event, data}`. `data`'s shape depends on
/// `event` and is documented per handler below.
#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Routes inbound HTTP event envelopes by `event` tag. Contract violations
/// (malformed JSON, missing required fields on `messages.upsert`) return
/// 400 and are never enqueued. Everything else is acknowledged at the HTTP
/// boundary and audited regardless of how it's ultimately handled.
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> (StatusCode, Json<Value>) {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "empty body"})));
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "invalid webhook body");
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid JSON body"})));
        }
    };

    let Some(tenant) = resolve_tenant(&state, &headers) else {
        warn!("webhook received with no resolvable tenant");
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "missing tenant"})));
    };

    let audit = WebhookEvent::received(tenant.clone(), envelope.event.clone(), envelope.data.to_string());
    if let Err(e) = state.context.insert_webhook_event(&audit) {
        warn!(error = %e, "failed to persist webhook audit row");
    }

    let outcome = match envelope.event.as_str() {
        "messages.upsert" => handle_upsert(&state, &tenant, &envelope.data),
        "message.sent" => {
            handle_status_update(&state, &envelope.data, MessageStatus::Sent);
            Outcome::Ignored
        }
        "message-receipt.update" => {
            handle_receipt_update(&state, &envelope.data);
            Outcome::Ignored
        }
        "messages.update" => {
            info!(%tenant, "message edit event received, logged only");
            Outcome::Ignored
        }
        other => {
            info!(%tenant, event = other, "unrecognized webhook event, acknowledged");
            Outcome::Ignored
        }
    };

    let (final_status, http_status, body_status) = match outcome {
        Outcome::Enqueued => (WebhookEventStatus::Processed, StatusCode::OK, "success"),
        Outcome::Ignored => (WebhookEventStatus::Ignored, StatusCode::OK, "ignored"),
        Outcome::Overloaded => (WebhookEventStatus::Failed, StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
        Outcome::Invalid(reason) => {
            let _ = state.context.mark_webhook_event_status(&audit.id, WebhookEventStatus::Failed);
            return (StatusCode::BAD_REQUEST, Json(json!({"error": reason})));
        }
    };
    let _ = state.context.mark_webhook_event_status(&audit.id, final_status);

    (http_status, Json(json!({"status": body_status, "event_type": envelope.event})))
}

enum Outcome {
    Enqueued,
    Ignored,
    Overloaded,
    Invalid(String),
}

/// Resolves the tenant a delivery belongs to from `X-Tenant-Id`, falling
/// back to the deployment's configured default for single-tenant
/// installations where the channel instance carries no tenant header.
fn resolve_tenant(state: &AppState, headers: &HeaderMap) -> Option<TenantId> {
    if let Some(header) = headers.get("x-tenant-id").and_then(|v| v.to_str().ok()) {
        return Some(TenantId::from(header.to_string()));
    }
    state.config.gateway.default_tenant_id.clone().map(TenantId::from)
}

fn handle_upsert(state: &AppState, tenant: &TenantId, data: &Value) -> Outcome {
    let Some(from) = data.get("from").and_then(|v| v.as_str()) else {
        return Outcome::Invalid("messages.upsert requires 'from'".to_string());
    };
    let Some(text) = data.get("text").and_then(|v| v.as_str()) else {
        return Outcome::Invalid("messages.upsert requires 'text'".to_string());
    };
    let channel_message_id = data.get("channel_message_id").and_then(|v| v.as_str()).map(str::to_string);
    let timestamp = data
        .get("timestamp")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .unwrap_or_else(Utc::now);

    let event = InboundEvent {
        tenant: tenant.clone(),
        from: phone::canonicalize(from),
        channel_message_id,
        text: text.to_string(),
        timestamp,
    };

    if state.ingest.try_enqueue(event) {
        Outcome::Enqueued
    } else {
        Outcome::Overloaded
    }
}

fn handle_status_update(state: &AppState, data: &Value, status: MessageStatus) {
    let Some(channel_message_id) = data.get("channel_message_id").and_then(|v| v.as_str()) else {
        // Missing channelMessageId is tolerated — audit only, per the
        // router's invariants.
        return;
    };
    if let Err(e) = state.context.update_message_status(channel_message_id, status, None) {
        warn!(error = %e, "failed to reconcile message status");
    }
}

fn handle_receipt_update(state: &AppState, data: &Value) {
    let Some(channel_message_id) = data.get("channel_message_id").and_then(|v| v.as_str()) else {
        return;
    };
    let status = match data.get("status").and_then(|v| v.as_str()) {
        Some("delivered") => MessageStatus::Delivered,
        Some("read") => MessageStatus::Read,
        other => {
            warn!(status = ?other, "unrecognized receipt status, ignoring");
            return;
        }
    };
    if let Err(e) = state.context.update_message_status(channel_message_id, status, None) {
        warn!(error = %e, "failed to reconcile message status");
    }
}
