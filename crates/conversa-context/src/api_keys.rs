use std::fmt;
use std::str::FromStr;

use chrono::Utc;

/// Which outbound call an [`ApiKey`] authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyKind {
    Llm,
    Channel,
}

impl fmt::Display for ApiKeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Llm => "llm",
            Self::Channel => "channel",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ApiKeyKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "llm" => Ok(Self::Llm),
            "channel" => Ok(Self::Channel),
            other => Err(format!("unknown api key kind: {other}")),
        }
    }
}

/// A tenant-scoped credential. Management (create/rotate/deactivate) is a
/// REST-surface concern outside this crate; this type only supports the
/// read-then-decrypt path the processing pipeline needs.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: String,
    pub tenant: conversa_core::ids::TenantId,
    pub kind: ApiKeyKind,
    pub name: String,
    pub encrypted_secret: String,
    pub active: bool,
    pub last_used_at: Option<chrono::DateTime<Utc>>,
}
