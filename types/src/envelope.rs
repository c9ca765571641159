//! Message envelope serde types for the host channel.

use serde::{Deserialize, Serialize};

/// Correlation id attached to every outbound request.
///
/// Issued by the correlator: starts at 1, strictly increasing, never reused
/// within a process lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request kinds the sandbox can send to its host.
///
/// The host routes on the serialized tag, so adding a request kind means
/// adding a variant here rather than editing a generic handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Ask the host for a short-lived bearer token.
    AuthTokenRequest,
}

/// Outbound message: `{"type": <tag>, "request_id": N}`.
///
/// Immutable once sent; the reply is matched back solely by `request_id`.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEnvelope {
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub request_id: RequestId,
}

/// Inbound message from the host.
///
/// Replies carry `request_id` (and usually `value`); host-initiated
/// notifications carry a `type` tag and no `request_id`. Fields beyond the
/// envelope are preserved in `extra` so kind-specific handlers can read
/// their payload.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub request_id: Option<RequestId>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl InboundMessage {
    /// The reply's `value` field, if it is a string.
    #[must_use]
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(serde_json::Value::as_str)
    }
}
