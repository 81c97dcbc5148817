//! Motion timing estimator.
//!
//! The transport gives no acknowledgment that a motion finished, so the
//! gateway holds each HTTP reply for a heuristic estimate of how long the
//! move plausibly takes.  Three pieces:
//!
//! - [`relative_duration`] – how long a relative z-move should be commanded
//!   to take, given the configured speed.
//! - [`absolute_distance`] – planar travel distance to an absolute target,
//!   with a two-segment path when the move crosses the arm's centerline.
//! - [`estimate_timeout`] – the reply-delay budget derived from either of
//!   the above.
//!
//! Everything here is a pure function over coordinates in workspace
//! millimetres.  The estimates are optimistic by design: expiry of the
//! returned timeout means "the move should be done by now", not "the move
//! succeeded".

use std::time::Duration;

use jetgate_types::{ArmPosition, MoveTarget};

/// Safe transit point the arm passes through when a move crosses its
/// centerline.  A direct path between the two sides is physically invalid,
/// so the distance model routes through this waypoint.
pub const TRANSIT_WAYPOINT: (f64, f64) = (0.0, -162.94);

/// Reply-delay per millimetre of travel, in seconds.
pub const SECONDS_PER_UNIT: f64 = 0.003;

/// Fixed settling overhead added to every reply delay, in seconds.
pub const SETTLE_SECONDS: f64 = 0.85;

/// Duration in seconds of a relative z-move of `delta_z` at `speed`.
///
/// Downward moves are modeled as taking twice as long per unit distance as
/// upward moves; the arm lowers against gravity-compensating servos at half
/// speed.  This asymmetry is intentional.
///
/// `speed` must be positive; the caller validates configuration before
/// handing it here.
pub fn relative_duration(delta_z: f64, speed: f64) -> f64 {
    if delta_z < 0.0 {
        2.0 * delta_z.abs() / speed
    } else {
        delta_z / speed
    }
}

/// Planar travel distance from `current` to an absolute `target`.
///
/// - When the arm starts centered (`current.x == 0`) or both x-coordinates
///   lie on the same side of the centerline, the path is the straight line
///   between the two (x, y) points.
/// - When the x-coordinates have opposite non-zero signs the move crosses
///   the centerline, and the distance is the sum of the two legs through
///   [`TRANSIT_WAYPOINT`].
/// - Without usable target x and y, the target's z value stands in as a
///   proxy distance (0 when z is also absent).
pub fn absolute_distance(target: &MoveTarget, current: ArmPosition) -> f64 {
    match (target.x, target.y) {
        (Some(tx), Some(ty)) if current.x == 0.0 || same_side(current.x, tx) => {
            planar_distance((current.x, current.y), (tx, ty))
        }
        (Some(tx), Some(ty)) => {
            planar_distance((current.x, current.y), TRANSIT_WAYPOINT)
                + planar_distance(TRANSIT_WAYPOINT, (tx, ty))
        }
        _ => target.z.unwrap_or(0.0),
    }
}

/// The HTTP reply-delay budget for a move request.
///
/// A move with no x/y displacement (each absent or zero) is relative; its
/// distance is the target z value directly.  Otherwise the distance comes
/// from [`absolute_distance`], falling back to the z-proxy when no telemetry
/// has arrived yet.  The budget is `distance * 0.003 + 0.85` seconds,
/// clamped at zero so a negative proxy distance still forms a valid
/// `Duration`.
pub fn estimate_timeout(target: &MoveTarget, current: Option<ArmPosition>) -> Duration {
    let distance = if zero_or_absent(target.x) && zero_or_absent(target.y) {
        target.z.unwrap_or(0.0)
    } else {
        match current {
            Some(position) => absolute_distance(target, position),
            None => target.z.unwrap_or(0.0),
        }
    };
    let seconds = distance * SECONDS_PER_UNIT + SETTLE_SECONDS;
    Duration::from_secs_f64(seconds.max(0.0))
}

fn planar_distance(from: (f64, f64), to: (f64, f64)) -> f64 {
    ((to.0 - from.0).powi(2) + (to.1 - from.1).powi(2)).sqrt()
}

fn same_side(a: f64, b: f64) -> bool {
    (a < 0.0 && b < 0.0) || (a > 0.0 && b > 0.0)
}

fn zero_or_absent(v: Option<f64>) -> bool {
    v.map_or(true, |v| v == 0.0)
}
