//! `jetgate-bridge` – the rosbridge client side of the gateway.
//!
//! Owns the single persistent websocket connection to the robot arm's
//! rosbridge server and everything fed by it:
//!
//! - [`session`] – connection lifecycle: the subscribe/advertise handshake on
//!   open, the outbound envelope queue, and inbound frame routing.
//! - [`cache`] – the process-wide snapshot of the last-reported device
//!   status.
//! - [`motion`] – the motion timing estimator that turns a move request into
//!   an HTTP reply-delay budget.

pub mod cache;
pub mod motion;
pub mod session;

pub use cache::StatusCache;
pub use session::{BridgeHandle, BridgeSession};
