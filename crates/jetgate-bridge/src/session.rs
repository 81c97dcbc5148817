//! Rosbridge transport session.
//!
//! Exactly one websocket connection to the arm's rosbridge server, driven by
//! [`BridgeSession::run`].  On open the session performs its handshake —
//! subscribe to the status topic, advertise the three command topics — then
//! pumps two directions until the connection ends:
//!
//! * outbound: envelopes queued through [`BridgeHandle::send`] are
//!   serialized and written to the socket;
//! * inbound: text frames are parsed and, when they carry the status topic,
//!   routed into the [`StatusCache`].
//!
//! Sends issued before the connection opens sit in the bounded queue and
//! flush once the pump starts.  After the session ends, sends fail with
//! [`GateError::NotConnected`].  Errors and closes are logged and terminate
//! the session; there is no reconnect loop — the process rides one
//! connection for its lifetime.

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use jetgate_types::{Compression, Envelope, GateError, StatusSnapshot};

use crate::cache::StatusCache;

// ---------------------------------------------------------------------------
// Topic map of the arm's ROS graph
// ---------------------------------------------------------------------------

/// Device status telemetry (inbound).
pub const STATUS_TOPIC: &str = "/jetmax/status";
pub const STATUS_TYPE: &str = "jetmax_control/JetMax";

/// Absolute move commands (outbound).
pub const ABSOLUTE_MOVE_TOPIC: &str = "/jetmax/speed_command";
/// Relative move commands (outbound).
pub const RELATIVE_MOVE_TOPIC: &str = "/jetmax/relative_command";
pub const MOVE_TYPE: &str = "jetmax/SetJetMax";

/// Suction end-effector commands (outbound).
pub const SUCTION_TOPIC: &str = "/jetmax/end_effector/sucker/command";
pub const SUCTION_TYPE: &str = "std_msgs/Bool";

const ADVERTISE_QUEUE_SIZE: u32 = 100;

/// Bound on envelopes queued while the connection is not yet (or no longer)
/// draining.  A full queue rejects the send rather than blocking a handler.
const OUTBOUND_CAPACITY: usize = 64;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

// ---------------------------------------------------------------------------
// Outbound handle
// ---------------------------------------------------------------------------

/// Cloneable sender half shared by every HTTP handler.
#[derive(Clone, Debug)]
pub struct BridgeHandle {
    tx: mpsc::Sender<Envelope>,
}

impl BridgeHandle {
    /// Create a handle and the receiving half a [`BridgeSession`] drains.
    pub fn channel() -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        (Self { tx }, rx)
    }

    /// Queue an envelope for transmission.
    ///
    /// Never blocks: a full queue yields [`GateError::QueueFull`] and a
    /// terminated session yields [`GateError::NotConnected`].
    pub fn send(&self, envelope: Envelope) -> Result<(), GateError> {
        self.tx.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => GateError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => GateError::NotConnected,
        })
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The driving half of the bridge connection.  Construct with
/// [`BridgeSession::new`], then hand to a task running [`BridgeSession::run`].
pub struct BridgeSession {
    url: String,
    cache: StatusCache,
    outbound: mpsc::Receiver<Envelope>,
}

impl BridgeSession {
    pub fn new(url: impl Into<String>, cache: StatusCache, outbound: mpsc::Receiver<Envelope>) -> Self {
        Self {
            url: url.into(),
            cache,
            outbound,
        }
    }

    /// Connect, handshake, then pump until the connection ends.
    ///
    /// Returns `Err` only for a failed connect or a failed write; an inbound
    /// stream error or a server-side close ends the session with `Ok(())`
    /// after logging.  Either way the session is over for good — callers do
    /// not get a reconnect by re-invoking `run`.
    pub async fn run(mut self) -> Result<(), GateError> {
        let (socket, _) = connect_async(&self.url)
            .await
            .map_err(|e| GateError::Transport(format!("connect to {}: {e}", self.url)))?;
        info!(url = %self.url, "connected to rosbridge server");

        let (mut ws_tx, mut ws_rx) = socket.split();

        // The command topics must be advertised before any publish reaches
        // them, so the handshake goes out ahead of the outbound queue.
        for envelope in handshake() {
            write_envelope(&mut ws_tx, &envelope).await?;
        }

        loop {
            tokio::select! {
                queued = self.outbound.recv() => {
                    match queued {
                        Some(envelope) => write_envelope(&mut ws_tx, &envelope).await?,
                        // Every handle dropped; nothing left to transmit.
                        None => break,
                    }
                }
                frame = ws_rx.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => route_frame(text.as_str(), &self.cache),
                        Some(Ok(Message::Close(frame))) => {
                            info!(?frame, "rosbridge server closed the connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!(error = %e, "websocket stream error");
                            break;
                        }
                        None => {
                            info!("websocket stream ended");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// The subscribe/advertise burst sent when the connection opens.
pub fn handshake() -> Vec<Envelope> {
    vec![
        Envelope::subscribe(
            "subscribe:/jetmaxState",
            STATUS_TOPIC,
            STATUS_TYPE,
            Compression::None,
            0,
            0,
        ),
        Envelope::advertise(
            "advertise:/moveTo",
            ABSOLUTE_MOVE_TOPIC,
            MOVE_TYPE,
            false,
            ADVERTISE_QUEUE_SIZE,
        ),
        Envelope::advertise(
            "advertise:/move",
            RELATIVE_MOVE_TOPIC,
            MOVE_TYPE,
            false,
            ADVERTISE_QUEUE_SIZE,
        ),
        Envelope::advertise(
            "advertise:/suction",
            SUCTION_TOPIC,
            SUCTION_TYPE,
            false,
            ADVERTISE_QUEUE_SIZE,
        ),
    ]
}

async fn write_envelope(sink: &mut WsSink, envelope: &Envelope) -> Result<(), GateError> {
    let payload =
        serde_json::to_string(envelope).map_err(|e| GateError::Serialization(e.to_string()))?;
    debug!(op = envelope.op(), id = envelope.id(), "envelope sent");
    sink.send(Message::Text(payload.into()))
        .await
        .map_err(|e| GateError::Transport(format!("websocket send: {e}")))
}

/// Route one inbound text frame.
///
/// A `publish` on the status topic replaces the cache wholesale.  Anything
/// else — unknown topics, service responses, frames that are not JSON — is
/// ignored so that new bridge traffic never breaks an old gateway.
fn route_frame(text: &str, cache: &StatusCache) {
    let Ok(json) = serde_json::from_str::<Value>(text) else {
        debug!("ignoring unparseable frame");
        return;
    };

    let topic = json.get("topic").and_then(|t| t.as_str()).unwrap_or("");
    if topic != STATUS_TOPIC {
        debug!(topic, "ignoring frame for unrecognized topic");
        return;
    }

    let Some(msg) = json.get("msg") else {
        return;
    };
    match serde_json::from_value::<StatusSnapshot>(msg.clone()) {
        Ok(snapshot) => cache.set(snapshot),
        Err(e) => warn!(error = %e, "status payload did not deserialize"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── handshake ────────────────────────────────────────────────────────

    #[test]
    fn handshake_subscribes_status_then_advertises_command_topics() {
        let burst = handshake();
        assert_eq!(burst.len(), 4);

        assert_eq!(burst[0].op(), "subscribe");
        assert_eq!(burst[0].topic(), Some(STATUS_TOPIC));

        let advertised: Vec<_> = burst[1..].iter().map(|e| (e.op(), e.topic().unwrap())).collect();
        assert_eq!(
            advertised,
            vec![
                ("advertise", ABSOLUTE_MOVE_TOPIC),
                ("advertise", RELATIVE_MOVE_TOPIC),
                ("advertise", SUCTION_TOPIC),
            ]
        );
    }

    #[test]
    fn handshake_is_reproducible() {
        assert_eq!(handshake(), handshake());
    }

    // ── inbound routing ──────────────────────────────────────────────────

    #[test]
    fn status_frame_replaces_the_cache() {
        let cache = StatusCache::new();
        let frame = r#"{"op":"publish","topic":"/jetmax/status","msg":{"x":-184.0,"y":80.0,"z":215.0,"sucker":true}}"#;
        route_frame(frame, &cache);

        let snapshot = cache.get().expect("status should be cached");
        assert_eq!(snapshot.x, Some(-184.0));
        assert_eq!(snapshot.rest.get("sucker"), Some(&json!(true)));
    }

    #[test]
    fn later_status_frames_win_wholesale() {
        let cache = StatusCache::new();
        route_frame(r#"{"topic":"/jetmax/status","msg":{"x":1.0,"joint1":30.0}}"#, &cache);
        route_frame(r#"{"topic":"/jetmax/status","msg":{"x":2.0}}"#, &cache);

        let snapshot = cache.get().unwrap();
        assert_eq!(snapshot.x, Some(2.0));
        assert!(snapshot.rest.get("joint1").is_none());
    }

    #[test]
    fn unrecognized_topic_is_ignored() {
        let cache = StatusCache::new();
        route_frame(
            r#"{"op":"publish","topic":"/usb_cam/image_rect_color","msg":{"data":"..."}}"#,
            &cache,
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn unparseable_frame_is_ignored() {
        let cache = StatusCache::new();
        route_frame("not json at all", &cache);
        assert!(cache.is_empty());
    }

    #[test]
    fn non_object_status_payload_leaves_cache_untouched() {
        let cache = StatusCache::new();
        route_frame(r#"{"topic":"/jetmax/status","msg":5}"#, &cache);
        assert!(cache.is_empty());
    }

    // ── outbound queue ───────────────────────────────────────────────────

    #[tokio::test]
    async fn sends_queue_until_the_session_drains_them() {
        let (handle, mut outbound) = BridgeHandle::channel();
        let envelope = Envelope::publish("publish:/suction", SUCTION_TOPIC, json!({"data": true}), false);
        handle.send(envelope.clone()).expect("queue accepts the send");

        assert_eq!(outbound.recv().await, Some(envelope));
    }

    #[test]
    fn send_after_session_end_is_not_connected() {
        let (handle, outbound) = BridgeHandle::channel();
        drop(outbound);

        let err = handle
            .send(Envelope::publish("publish:/moveTo", ABSOLUTE_MOVE_TOPIC, json!({}), false))
            .unwrap_err();
        assert!(matches!(err, GateError::NotConnected));
    }

    #[test]
    fn full_queue_rejects_instead_of_blocking() {
        let (handle, _outbound) = BridgeHandle::channel();
        let envelope = Envelope::publish("publish:/moveTo", ABSOLUTE_MOVE_TOPIC, json!({}), false);

        for _ in 0..OUTBOUND_CAPACITY {
            handle.send(envelope.clone()).expect("below capacity");
        }
        let err = handle.send(envelope).unwrap_err();
        assert!(matches!(err, GateError::QueueFull));
    }
}
