//! HTTP surface of the gateway.
//!
//! Each command endpoint translates one GET request into a publish envelope
//! on the bridge.  The transport gives no acknowledgment, so move endpoints
//! hold their reply for the motion estimator's timeout budget and then
//! report success unconditionally — an optimistic, documented contract, not
//! a confirmation of device outcome.  The suction endpoint replies
//! immediately, and `/basic/state` serves the cached snapshot with no
//! timing logic at all.
//!
//! Request payloads arrive URL-encoded in the `msg` query parameter as JSON,
//! e.g. `/basic/moveTo?msg={"x":-14,"y":-117,"z":100}`.  A missing or
//! undecodable `msg` yields an immediate plain-text error and no envelope.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use jetgate_bridge::{motion, session};
use jetgate_types::{ArmPosition, Envelope, MoveTarget};

use crate::state::AppState;

const MISSING_MSG_REPLY: &str = "Error, missing msg parameter.";

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/basic/state", get(arm_state))
        .route("/basic/moveTo", get(move_absolute))
        .route("/basic/move", get(move_relative))
        .route("/basic/suction", get(suction))
        .route("/basic/objectCenter", get(object_center))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct MsgQuery {
    #[serde(default)]
    msg: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index() -> &'static str {
    "jetgate server is up and running."
}

/// Current arm status from the cache; `{}` until the first status message
/// arrives.  Always immediate.
async fn arm_state(State(app): State<AppState>) -> Response {
    match app.cache.get() {
        Some(snapshot) => {
            if let Some(received) = app.cache.last_received() {
                debug!(%received, "serving cached arm status");
            }
            Json(snapshot).into_response()
        }
        None => Json(json!({})).into_response(),
    }
}

/// Absolute move.  The caller's `duration` is discarded; absolute moves run
/// at the deployment's configured duration.
async fn move_absolute(State(app): State<AppState>, Query(query): Query<MsgQuery>) -> Response {
    let target: MoveTarget = match decode_msg(query.msg.as_deref()) {
        Ok(target) => target,
        Err(reply) => return reply,
    };
    let target = target.with_duration(app.config.absolute_move_duration);
    let wait = motion::estimate_timeout(&target, current_position(&app));
    info!(?target, wait_ms = wait.as_millis() as u64, "absolute move");

    let Ok(payload) = serde_json::to_value(target) else {
        return "Error, internal serialization failure.".into_response();
    };
    if let Err(reply) = publish(&app, "publish:/moveTo", session::ABSOLUTE_MOVE_TOPIC, payload) {
        return reply;
    }

    sleep(wait).await;
    "/basic/moveTo endpoint completed successfully".into_response()
}

/// Relative move.  `duration` comes from the motion estimator: distance over
/// the configured speed, doubled for downward moves.
async fn move_relative(State(app): State<AppState>, Query(query): Query<MsgQuery>) -> Response {
    let target: MoveTarget = match decode_msg(query.msg.as_deref()) {
        Ok(target) => target,
        Err(reply) => return reply,
    };
    let duration = motion::relative_duration(
        target.z.unwrap_or(0.0),
        app.config.relative_move_speed,
    );
    let target = target.with_duration(duration);
    let wait = motion::estimate_timeout(&target, current_position(&app));
    info!(?target, wait_ms = wait.as_millis() as u64, "relative move");

    let Ok(payload) = serde_json::to_value(target) else {
        return "Error, internal serialization failure.".into_response();
    };
    if let Err(reply) = publish(&app, "publish:/moveTo", session::RELATIVE_MOVE_TOPIC, payload) {
        return reply;
    }

    sleep(wait).await;
    "/basic/move endpoint completed successfully".into_response()
}

/// Suction on/off.  Fire-and-forget: the payload goes out verbatim and the
/// reply is immediate.
async fn suction(State(app): State<AppState>, Query(query): Query<MsgQuery>) -> Response {
    let payload: Value = match decode_msg(query.msg.as_deref()) {
        Ok(payload) => payload,
        Err(reply) => return reply,
    };
    info!(%payload, "suction command");

    if let Err(reply) = publish(&app, "publish:/suction", session::SUCTION_TOPIC, payload) {
        return reply;
    }
    "/basic/suction endpoint completed successfully".into_response()
}

/// Locate the package under the camera via the AprilTag detector.
async fn object_center(State(app): State<AppState>, Query(query): Query<MsgQuery>) -> Response {
    let request: Value = match decode_msg(query.msg.as_deref()) {
        Ok(request) => request,
        Err(reply) => return reply,
    };

    match app.detector.detect(&request).await {
        Ok(detection) => Json(detection).into_response(),
        Err(e) => {
            error!(error = %e, "object detection failed");
            format!("Error, object detection failed: {e}").into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decode_msg<T: serde::de::DeserializeOwned>(msg: Option<&str>) -> Result<T, Response> {
    let Some(raw) = msg else {
        warn!("missing msg parameter");
        return Err(MISSING_MSG_REPLY.into_response());
    };
    serde_json::from_str(raw).map_err(|e| {
        warn!(error = %e, "undecodable msg parameter");
        format!("Error, invalid msg parameter: {e}").into_response()
    })
}

fn publish(app: &AppState, id: &str, topic: &str, payload: Value) -> Result<(), Response> {
    let envelope = Envelope::publish(id, topic, payload, false);
    app.bridge.send(envelope).map_err(|e| {
        error!(error = %e, topic, "publish failed");
        format!("Error, command not sent: {e}").into_response()
    })
}

fn current_position(app: &AppState) -> Option<ArmPosition> {
    app.cache.get().and_then(|snapshot| snapshot.position())
}
