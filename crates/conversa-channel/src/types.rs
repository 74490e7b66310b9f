use serde::{Deserialize, Serialize};

/// A text message ready to hand to the channel gateway. `to` is already in
/// canonical digits-only form (see `conversa_core::phone`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundText {
    pub to: String,
    pub body: String,
}

/// A media attachment to deliver alongside an optional caption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMedia {
    pub to: String,
    pub media_url: String,
    pub mime_type: String,
    pub caption: Option<String>,
}

/// Gateway acknowledgement for a single send call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    pub channel_message_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: String,
    pub name: String,
    pub participant_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInfo {
    pub id: String,
    pub name: Option<String>,
    pub phone_number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Connected,
    Connecting,
    Disconnected,
    QrRequired,
}
