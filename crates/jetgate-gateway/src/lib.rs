//! `jetgate-gateway` – the HTTP façade of the jetgate stack.
//!
//! Exposes the small synchronous REST surface that callers see and wires it
//! onto the asynchronous rosbridge transport:
//!
//! - [`routes`] – axum router and the `/basic/*` handlers, including the
//!   timed optimistic replies for move commands.
//! - [`config`] – TOML configuration with environment overrides.
//! - [`state`] – shared application state handed to every handler.
//! - [`detect`] – the out-of-process AprilTag detector collaborator.
//! - [`telemetry`] – tracing/OTLP initialisation for the binary.

pub mod config;
pub mod detect;
pub mod routes;
pub mod state;
pub mod telemetry;
