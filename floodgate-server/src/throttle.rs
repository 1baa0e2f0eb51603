//! Single-owner actor around the throttle registry.
//!
//! The [`floodgate::Registry`] is not thread-safe, so one spawned task owns
//! it outright and every decision flows through its mailbox. The periodic
//! staleness sweep runs inside the same task, which makes the registry's
//! exclusion discipline a property of ownership instead of a lock: a sweep
//! can never race an `allow` call because both are steps of one loop.

use crate::config::LimiterConfig;
use floodgate::Registry;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, oneshot};

const MAILBOX_SIZE: usize = 1024;

/// Message types for the throttle actor
enum ThrottleMessage {
    Allow {
        identity: String,
        respond_to: oneshot::Sender<bool>,
    },
}

/// Handle to communicate with the throttle actor
#[derive(Clone)]
pub struct ThrottleHandle {
    tx: mpsc::Sender<ThrottleMessage>,
}

impl ThrottleHandle {
    /// Decide whether one request from `identity` may proceed.
    ///
    /// Fails open if the actor is gone (which only happens during shutdown):
    /// a throttle outage must not become an availability outage.
    pub async fn allow(&self, identity: &str) -> bool {
        let (respond_to, response_rx) = oneshot::channel();

        let sent = self
            .tx
            .send(ThrottleMessage::Allow {
                identity: identity.to_string(),
                respond_to,
            })
            .await;
        if sent.is_err() {
            tracing::warn!("throttle actor is gone, allowing request");
            return true;
        }

        match response_rx.await {
            Ok(allowed) => allowed,
            Err(_) => {
                tracing::warn!("throttle actor dropped response, allowing request");
                true
            }
        }
    }
}

/// The throttle actor
pub struct ThrottleActor;

impl ThrottleActor {
    /// Spawn the registry's single owner and return a cloneable handle.
    ///
    /// The actor exits once every handle is dropped.
    pub fn spawn(config: &LimiterConfig) -> ThrottleHandle {
        let (tx, rx) = mpsc::channel(MAILBOX_SIZE);

        let registry = Registry::builder()
            .rate(config.rps)
            .burst(config.burst)
            .enabled(config.enabled)
            .staleness(config.staleness)
            .build();

        tokio::spawn(run_actor(rx, registry, config.sweep_interval));

        ThrottleHandle { tx }
    }
}

async fn run_actor(
    mut rx: mpsc::Receiver<ThrottleMessage>,
    mut registry: Registry,
    sweep_interval: Duration,
) {
    let mut sweep = tokio::time::interval(sweep_interval);
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick fires immediately; nothing can be stale yet.
    sweep.tick().await;

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(ThrottleMessage::Allow { identity, respond_to }) => {
                    let allowed = registry.allow(&identity, SystemTime::now());
                    // The caller may have given up waiting.
                    let _ = respond_to.send(allowed);
                }
                None => break,
            },
            _ = sweep.tick() => {
                let evicted = registry.sweep(SystemTime::now());
                if evicted > 0 {
                    tracing::debug!(
                        evicted,
                        tracked = registry.len(),
                        "swept stale throttle entries"
                    );
                }
            }
        }
    }

    tracing::info!("throttle actor shutting down");
}
