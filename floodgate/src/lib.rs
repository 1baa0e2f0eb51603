//! # Floodgate
//!
//! A per-client token bucket rate limiter for Rust.
//!
//! ## Overview
//!
//! Floodgate tracks one token bucket per client identity and answers a single
//! question: may this request proceed right now? It provides:
//!
//! - **Burst tolerance**: each identity may spend up to `burst` tokens at once
//! - **Lazy refill**: tokens replenish on access, no timer per entry
//! - **Fractional rates**: rates below one token per second accumulate
//!   correctly instead of truncating to zero
//! - **Bounded memory**: a staleness sweep evicts identities that have gone
//!   quiet, so churn of many distinct clients cannot grow the map forever
//!
//! ## Quick Start
//!
//! ```
//! use floodgate::Registry;
//! use std::time::{Duration, SystemTime};
//!
//! // 2 requests per second with a burst of 4
//! let mut registry = Registry::builder()
//!     .rate(2.0)
//!     .burst(4)
//!     .staleness(Duration::from_secs(180))
//!     .build();
//!
//! let now = SystemTime::now();
//! assert!(registry.allow("10.0.0.1", now));
//! ```
//!
//! ## Decision, not error
//!
//! [`Registry::allow`] never blocks and never fails: every identity string is
//! valid (the empty string included), a disabled registry approves everything
//! without touching state, and clock anomalies degrade to "no refill" rather
//! than an error.
//!
//! ## Thread Safety
//!
//! The registry itself is not thread-safe; `allow` and `sweep` take
//! `&mut self`. For concurrent access, give it a single owner (an actor task)
//! or wrap it in a mutex:
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use floodgate::Registry;
//!
//! let registry = Arc::new(Mutex::new(Registry::builder().build()));
//! ```
//!
//! ## Features
//!
//! - `ahash` (default): Use AHash for faster hashing

pub mod core;

pub use core::{Registry, RegistryBuilder};
