//! Outbound sends and the single inbound callback.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};

use sideload_types::{InboundMessage, OutboundEnvelope, RequestId, RequestKind};

use crate::correlator::Correlator;

/// Default deadline for awaiting a host reply.
const DEFAULT_REPLY_TIMEOUT_SECS: u64 = 30;

/// Capacity of the outbound channel drained by the host binding.
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

type NotificationHandler = Box<dyn Fn(InboundMessage) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct GatewayConfig {
    /// How long [`MessageGateway::request`] waits for a matching reply
    /// before giving up and releasing its pending entry.
    pub reply_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_secs(DEFAULT_REPLY_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The outbound channel to the host is gone; the request was never
    /// transmitted.
    #[error("host channel closed; request {0} not transmitted")]
    ChannelClosed(RequestId),
    /// The reply slot was dropped without being completed.
    #[error("reply slot dropped for request {0}")]
    ReplyDropped(RequestId),
    /// No matching reply arrived within the configured deadline.
    #[error("timed out waiting for reply to request {0}")]
    Timeout(RequestId),
}

/// The single channel between the sandboxed interpreter and its host.
///
/// Outbound requests get a fresh correlation id and a pending slot before
/// transmission; inbound traffic enters through [`handle_incoming`], the one
/// callback the host binding drives. Transmission is fire-and-forget: the
/// gateway neither retries nor guarantees delivery.
///
/// [`handle_incoming`]: MessageGateway::handle_incoming
pub struct MessageGateway {
    correlator: Correlator,
    outbound_tx: mpsc::Sender<OutboundEnvelope>,
    handlers: Mutex<HashMap<String, NotificationHandler>>,
    config: GatewayConfig,
}

impl MessageGateway {
    /// Create a gateway plus the receiving half the host binding drains.
    pub fn new(config: GatewayConfig) -> (Self, mpsc::Receiver<OutboundEnvelope>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let gateway = Self {
            correlator: Correlator::new(),
            outbound_tx,
            handlers: Mutex::new(HashMap::new()),
            config,
        };
        (gateway, outbound_rx)
    }

    /// Send `kind` to the host and await its reply.
    ///
    /// The pending entry is removed on every exit path (reply, transmit
    /// failure, dropped slot, deadline expiry) so abandoned exchanges never
    /// leak correlator entries.
    pub async fn request(&self, kind: RequestKind) -> Result<InboundMessage, GatewayError> {
        let id = self.correlator.next_id();
        let rx = self.correlator.register(id).await;

        let envelope = OutboundEnvelope {
            kind,
            request_id: id,
        };
        if self.outbound_tx.send(envelope).await.is_err() {
            self.correlator.forget(id).await;
            tracing::warn!("host channel closed; dropping request {id}");
            return Err(GatewayError::ChannelClosed(id));
        }

        match tokio::time::timeout(self.config.reply_timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => {
                self.correlator.forget(id).await;
                Err(GatewayError::ReplyDropped(id))
            }
            Err(_) => {
                self.correlator.forget(id).await;
                tracing::warn!("request {id} timed out after {:?}", self.config.reply_timeout);
                Err(GatewayError::Timeout(id))
            }
        }
    }

    /// Single inbound callback for the host channel.
    ///
    /// Runs on the host's delivery path: decode failures are logged and
    /// swallowed, never propagated.
    pub async fn handle_incoming(&self, raw: &str) {
        let msg: InboundMessage = match serde_json::from_str(raw) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("malformed inbound message: {e}");
                return;
            }
        };
        self.route(msg).await;
    }

    /// Route an already-decoded inbound message.
    ///
    /// Messages with a `request_id` resolve their pending slot; messages
    /// with only a `type` tag go to the notification table; anything else
    /// is dropped.
    pub async fn route(&self, msg: InboundMessage) {
        if let Some(id) = msg.request_id {
            self.correlator.resolve(id, msg).await;
            return;
        }
        let Some(tag) = msg.kind.clone() else {
            tracing::debug!("inbound message has neither request_id nor type; dropping");
            return;
        };
        let handlers = self.handlers.lock().await;
        match handlers.get(&tag) {
            Some(handler) => handler(msg),
            None => tracing::trace!("ignoring notification with unhandled tag '{tag}'"),
        }
    }

    /// Register a handler for host-initiated notifications tagged `tag`.
    ///
    /// One handler per tag; registering again replaces the previous one.
    pub async fn on_notification(
        &self,
        tag: impl Into<String>,
        handler: impl Fn(InboundMessage) + Send + Sync + 'static,
    ) {
        self.handlers
            .lock()
            .await
            .insert(tag.into(), Box::new(handler));
    }

    #[cfg(test)]
    pub(crate) async fn pending_len(&self) -> usize {
        self.correlator.pending_len().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn short_timeout() -> GatewayConfig {
        GatewayConfig {
            reply_timeout: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn request_reply_roundtrip() {
        let (gateway, mut outbound_rx) = MessageGateway::new(GatewayConfig::default());
        let gateway = Arc::new(gateway);

        let host = gateway.clone();
        let echo = tokio::spawn(async move {
            let envelope = outbound_rx.recv().await.unwrap();
            assert_eq!(envelope.kind, RequestKind::AuthTokenRequest);
            let reply = serde_json::json!({
                "request_id": envelope.request_id,
                "value": "tok-xyz",
            });
            host.handle_incoming(&reply.to_string()).await;
        });

        let reply = gateway.request(RequestKind::AuthTokenRequest).await.unwrap();
        assert_eq!(reply.value_str(), Some("tok-xyz"));
        assert_eq!(gateway.pending_len().await, 0);
        echo.await.unwrap();
    }

    #[tokio::test]
    async fn timeout_surfaces_and_releases_pending_entry() {
        let (gateway, _outbound_rx) = MessageGateway::new(short_timeout());

        let err = gateway.request(RequestKind::AuthTokenRequest).await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout(_)));
        assert_eq!(gateway.pending_len().await, 0);
    }

    #[tokio::test]
    async fn closed_channel_surfaces_and_releases_pending_entry() {
        let (gateway, outbound_rx) = MessageGateway::new(GatewayConfig::default());
        drop(outbound_rx);

        let err = gateway.request(RequestKind::AuthTokenRequest).await.unwrap_err();
        assert!(matches!(err, GatewayError::ChannelClosed(_)));
        assert_eq!(gateway.pending_len().await, 0);
    }

    #[tokio::test]
    async fn late_reply_after_timeout_is_discarded() {
        let (gateway, mut outbound_rx) = MessageGateway::new(short_timeout());

        let err = gateway.request(RequestKind::AuthTokenRequest).await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout(_)));

        // The envelope was transmitted; replying now must be a silent no-op.
        let envelope = outbound_rx.recv().await.unwrap();
        let reply = serde_json::json!({"request_id": envelope.request_id, "value": "late"});
        gateway.handle_incoming(&reply.to_string()).await;
        assert_eq!(gateway.pending_len().await, 0);
    }

    #[tokio::test]
    async fn malformed_inbound_is_swallowed() {
        let (gateway, _outbound_rx) = MessageGateway::new(GatewayConfig::default());

        gateway.handle_incoming("not json at all {{{").await;
        gateway.handle_incoming(r#"["an", "array"]"#).await;
        gateway.handle_incoming("{}").await;
        assert_eq!(gateway.pending_len().await, 0);
    }

    #[tokio::test]
    async fn notifications_dispatch_by_tag() {
        let (gateway, _outbound_rx) = MessageGateway::new(GatewayConfig::default());

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        gateway
            .on_notification("host_status", move |msg| {
                assert_eq!(
                    msg.extra.get("detail").and_then(serde_json::Value::as_str),
                    Some("draining")
                );
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        gateway
            .handle_incoming(r#"{"type": "host_status", "detail": "draining"}"#)
            .await;
        gateway
            .handle_incoming(r#"{"type": "unrelated", "detail": "ignored"}"#)
            .await;

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn interleaved_requests_resolve_by_id() {
        let (gateway, mut outbound_rx) = MessageGateway::new(GatewayConfig::default());
        let gateway = Arc::new(gateway);

        // Answer the two outstanding requests in reverse arrival order.
        let host = gateway.clone();
        let cross = tokio::spawn(async move {
            let first = outbound_rx.recv().await.unwrap();
            let second = outbound_rx.recv().await.unwrap();
            for envelope in [second, first] {
                let reply = serde_json::json!({
                    "request_id": envelope.request_id,
                    "value": format!("reply-{}", envelope.request_id),
                });
                host.handle_incoming(&reply.to_string()).await;
            }
        });

        let (a, b) = tokio::join!(
            gateway.request(RequestKind::AuthTokenRequest),
            gateway.request(RequestKind::AuthTokenRequest),
        );
        let a = a.unwrap();
        let b = b.unwrap();
        assert_eq!(a.value_str(), Some(format!("reply-{}", a.request_id.unwrap()).as_str()));
        assert_eq!(b.value_str(), Some(format!("reply-{}", b.request_id.unwrap()).as_str()));
        cross.await.unwrap();
    }
}
