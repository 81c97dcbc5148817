//! `jetgate-types` – shared wire and data types for the jetgate stack.
//!
//! Everything that crosses a crate boundary lives here: the rosbridge
//! [`Envelope`] protocol messages, the cached [`StatusSnapshot`] telemetry,
//! the per-request [`MoveTarget`], the [`Detection`] result of the AprilTag
//! collaborator, and the unified [`GateError`].
//!
//! This crate carries no transport or runtime dependencies so it can be
//! reused by the bridge, the gateway, and test tooling alike.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Rosbridge envelopes
// ---------------------------------------------------------------------------

/// Compression requested when subscribing to a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Png,
    Cbor,
}

/// One discrete protocol message exchanged with the rosbridge server.
///
/// Serializes to the exact wire shape the bridge expects: the `op` tag plus
/// the variant's fields, with optional fields always present (the bridge
/// treats field presence as significant, so nothing is skipped).
///
/// The `id` is a caller-chosen correlation label.  By convention it is a
/// human-readable `"<op>:<route>"` string; it is not guaranteed unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Envelope {
    Subscribe {
        id: String,
        topic: String,
        #[serde(rename = "type")]
        msg_type: String,
        compression: Compression,
        throttle_rate: u32,
        queue_length: u32,
    },
    Advertise {
        id: String,
        topic: String,
        #[serde(rename = "type")]
        msg_type: String,
        latch: bool,
        queue_size: u32,
    },
    Publish {
        id: String,
        topic: String,
        msg: Value,
        latch: bool,
    },
    CallService {
        id: String,
        service: String,
        #[serde(rename = "type")]
        srv_type: String,
        args: Value,
    },
}

impl Envelope {
    /// Subscribe to `topic`, expecting messages of `msg_type`.
    pub fn subscribe(
        id: impl Into<String>,
        topic: impl Into<String>,
        msg_type: impl Into<String>,
        compression: Compression,
        throttle_rate: u32,
        queue_length: u32,
    ) -> Self {
        Self::Subscribe {
            id: id.into(),
            topic: topic.into(),
            msg_type: msg_type.into(),
            compression,
            throttle_rate,
            queue_length,
        }
    }

    /// Advertise `topic` so the bridge accepts subsequent publishes on it.
    pub fn advertise(
        id: impl Into<String>,
        topic: impl Into<String>,
        msg_type: impl Into<String>,
        latch: bool,
        queue_size: u32,
    ) -> Self {
        Self::Advertise {
            id: id.into(),
            topic: topic.into(),
            msg_type: msg_type.into(),
            latch,
            queue_size,
        }
    }

    /// Publish `msg` on a previously advertised `topic`.
    ///
    /// The payload shape is dictated by the topic's message type; this
    /// constructor forwards it verbatim.
    pub fn publish(
        id: impl Into<String>,
        topic: impl Into<String>,
        msg: Value,
        latch: bool,
    ) -> Self {
        Self::Publish {
            id: id.into(),
            topic: topic.into(),
            msg,
            latch,
        }
    }

    /// Call a ROS service with `args`.
    pub fn call_service(
        id: impl Into<String>,
        service: impl Into<String>,
        srv_type: impl Into<String>,
        args: Value,
    ) -> Self {
        Self::CallService {
            id: id.into(),
            service: service.into(),
            srv_type: srv_type.into(),
            args,
        }
    }

    /// The wire-level `op` tag of this envelope.
    pub fn op(&self) -> &'static str {
        match self {
            Envelope::Subscribe { .. } => "subscribe",
            Envelope::Advertise { .. } => "advertise",
            Envelope::Publish { .. } => "publish",
            Envelope::CallService { .. } => "call_service",
        }
    }

    /// The correlation label this envelope was constructed with.
    pub fn id(&self) -> &str {
        match self {
            Envelope::Subscribe { id, .. }
            | Envelope::Advertise { id, .. }
            | Envelope::Publish { id, .. }
            | Envelope::CallService { id, .. } => id,
        }
    }

    /// The topic this envelope targets, if the variant carries one.
    pub fn topic(&self) -> Option<&str> {
        match self {
            Envelope::Subscribe { topic, .. }
            | Envelope::Advertise { topic, .. }
            | Envelope::Publish { topic, .. } => Some(topic),
            Envelope::CallService { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Telemetry snapshot
// ---------------------------------------------------------------------------

/// The arm's end-effector position in workspace millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// The last-reported device status, as published on the status topic.
///
/// The device's status message carries coordinates, joint, servo and
/// actuator states.  Only the coordinates get typed access here; every other
/// field is retained opaquely so the snapshot round-trips wholesale to the
/// state endpoint without this crate pinning the device's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StatusSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    /// Joint, servo, PWM, sucker and any future fields, kept verbatim.
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

impl StatusSnapshot {
    /// The reported position, when all three coordinates are present.
    pub fn position(&self) -> Option<ArmPosition> {
        Some(ArmPosition {
            x: self.x?,
            y: self.y?,
            z: self.z?,
        })
    }
}

// ---------------------------------------------------------------------------
// Move request payload
// ---------------------------------------------------------------------------

/// A move request decoded from one HTTP call.
///
/// `duration` is never trusted from the caller: the gateway overwrites it
/// before publishing (estimator output for relative moves, configured default
/// for absolute moves).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MoveTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl MoveTarget {
    /// Replace the duration, discarding whatever the caller supplied.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}

// ---------------------------------------------------------------------------
// AprilTag detection result
// ---------------------------------------------------------------------------

/// Result of one out-of-process AprilTag detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Tag id of the identified package.
    pub id: i64,
    /// Camera distance to the tag.
    pub distance: f64,
    /// Pixel coordinates of the package center.
    pub center: [f64; 2],
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type spanning configuration, transport, serialization and
/// detector failures.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("configuration error: {0}")]
    Config(String),

    /// The bridge session has terminated; outbound envelopes have nowhere
    /// to go.
    #[error("bridge connection is not open")]
    NotConnected,

    /// The bounded outbound queue is full; the send was rejected rather
    /// than blocking the caller.
    #[error("bridge outbound queue is full")]
    QueueFull,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("detection error: {0}")]
    Detection(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscribe_serializes_with_exact_wire_fields() {
        let env = Envelope::subscribe(
            "subscribe:/jetmaxState",
            "/jetmax/status",
            "jetmax_control/JetMax",
            Compression::None,
            0,
            0,
        );
        let wire = serde_json::to_value(&env).unwrap();
        assert_eq!(
            wire,
            json!({
                "op": "subscribe",
                "id": "subscribe:/jetmaxState",
                "topic": "/jetmax/status",
                "type": "jetmax_control/JetMax",
                "compression": "none",
                "throttle_rate": 0,
                "queue_length": 0,
            })
        );
    }

    #[test]
    fn advertise_serializes_with_exact_wire_fields() {
        let env = Envelope::advertise(
            "advertise:/moveTo",
            "/jetmax/speed_command",
            "jetmax/SetJetMax",
            false,
            100,
        );
        let wire = serde_json::to_value(&env).unwrap();
        assert_eq!(
            wire,
            json!({
                "op": "advertise",
                "id": "advertise:/moveTo",
                "topic": "/jetmax/speed_command",
                "type": "jetmax/SetJetMax",
                "latch": false,
                "queue_size": 100,
            })
        );
    }

    #[test]
    fn publish_carries_payload_verbatim() {
        let payload = json!({"x": -14.0, "y": -117.0, "z": 100.0, "duration": 0.5});
        let env = Envelope::publish("publish:/moveTo", "/jetmax/speed_command", payload.clone(), false);
        let wire = serde_json::to_value(&env).unwrap();
        assert_eq!(wire["op"], "publish");
        assert_eq!(wire["msg"], payload);
        assert_eq!(wire["latch"], json!(false));
    }

    #[test]
    fn call_service_uses_snake_case_op_tag() {
        let env = Envelope::call_service(
            "call:/reset",
            "/jetmax/go_home",
            "std_srvs/Empty",
            json!({}),
        );
        let wire = serde_json::to_value(&env).unwrap();
        assert_eq!(wire["op"], "call_service");
        assert_eq!(wire["service"], "/jetmax/go_home");
        assert_eq!(wire["type"], "std_srvs/Empty");
    }

    /// Optional wire fields must be explicit, never skipped: the bridge
    /// treats field presence as significant.
    #[test]
    fn optional_envelope_fields_are_never_omitted() {
        let env = Envelope::subscribe("s", "/t", "pkg/Type", Compression::None, 0, 0);
        let wire = serde_json::to_value(&env).unwrap();
        for field in ["compression", "throttle_rate", "queue_length"] {
            assert!(wire.get(field).is_some(), "{field} must be present");
        }
    }

    /// Constructing an envelope twice from identical arguments yields
    /// structurally identical values.
    #[test]
    fn constructors_are_idempotent() {
        let a = Envelope::advertise("advertise:/move", "/jetmax/relative_command", "jetmax/SetJetMax", false, 100);
        let b = Envelope::advertise("advertise:/move", "/jetmax/relative_command", "jetmax/SetJetMax", false, 100);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn envelope_accessors_report_op_id_and_topic() {
        let env = Envelope::publish("publish:/suction", "/jetmax/end_effector/sucker/command", json!(true), false);
        assert_eq!(env.op(), "publish");
        assert_eq!(env.id(), "publish:/suction");
        assert_eq!(env.topic(), Some("/jetmax/end_effector/sucker/command"));

        let srv = Envelope::call_service("c", "/svc", "pkg/Srv", json!({}));
        assert_eq!(srv.topic(), None);
    }

    #[test]
    fn snapshot_roundtrips_wholesale_with_unknown_fields() {
        let raw = json!({
            "x": -184.0,
            "y": 80.0,
            "z": 215.0,
            "joint1": 90.0,
            "sucker": true,
            "pwm1": 0,
        });
        let snapshot: StatusSnapshot = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&snapshot).unwrap(), raw);
        assert_eq!(
            snapshot.position(),
            Some(ArmPosition { x: -184.0, y: 80.0, z: 215.0 })
        );
    }

    #[test]
    fn snapshot_position_requires_all_coordinates() {
        let snapshot: StatusSnapshot =
            serde_json::from_value(json!({"x": 1.0, "y": 2.0})).unwrap();
        assert_eq!(snapshot.position(), None);
    }

    #[test]
    fn move_target_decodes_from_request_payload() {
        let target: MoveTarget = serde_json::from_str(r#"{"x":-14,"y":-117,"z":100}"#).unwrap();
        assert_eq!(target.x, Some(-14.0));
        assert_eq!(target.y, Some(-117.0));
        assert_eq!(target.z, Some(100.0));
        assert_eq!(target.duration, None);
    }

    #[test]
    fn with_duration_overrides_caller_value() {
        let target: MoveTarget =
            serde_json::from_str(r#"{"z":50,"duration":9.9}"#).unwrap();
        let target = target.with_duration(0.5);
        assert_eq!(target.duration, Some(0.5));

        let wire = serde_json::to_value(target).unwrap();
        assert_eq!(wire, serde_json::json!({"z": 50.0, "duration": 0.5}));
    }

    #[test]
    fn gate_error_display() {
        assert_eq!(
            GateError::NotConnected.to_string(),
            "bridge connection is not open"
        );
        assert!(
            GateError::Detection("exit status 1".into())
                .to_string()
                .contains("exit status 1")
        );
    }
}
