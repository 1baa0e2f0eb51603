//! Core components of the floodgate rate limiting library
//!
//! This module contains the fundamental building blocks:
//! - `bucket`: Per-identity token bucket state
//! - [`registry`]: The identity -> bucket map with lazy refill and sweeping

mod bucket;
pub mod registry;

pub use registry::{Registry, RegistryBuilder};
