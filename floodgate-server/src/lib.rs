//! # Floodgate Server
//!
//! A JSON API server built around a concurrent request-lifecycle core:
//!
//! - **per-client throttling**: every request is checked against a token
//!   bucket keyed by the peer address before its handler runs
//! - **supervised background tasks**: fire-and-forget units of work
//!   (notification delivery) run off the request path, their failures
//!   isolated and their count tracked
//! - **coordinated shutdown**: a termination signal stops the listener,
//!   drains in-flight requests under one deadline, then drains background
//!   tasks under a second, longer one
//!
//! ## Architecture
//!
//! ```text
//! connection ──► throttle middleware ──► handler ──► response
//!                      │                    │
//!                ┌─────▼──────┐      ┌──────▼───────┐
//!                │  Throttle  │      │     Task     │
//!                │   Actor    │      │  Supervisor  │
//!                │ (Registry) │      │ (outstanding │
//!                └────────────┘      │    count)    │
//!                                    └──────▲───────┘
//!                                           │ drained during shutdown
//!                                    ┌──────┴───────┐
//!                                    │ Coordinator  │
//!                                    └──────────────┘
//! ```
//!
//! The throttle registry lives in one actor task, which is its entire
//! exclusion discipline; the supervisor is a shared atomic counter with a
//! drain wait; the coordinator owns the Running -> Draining -> Stopped
//! sequence.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod movies;
pub mod notify;
pub mod supervisor;
pub mod throttle;
