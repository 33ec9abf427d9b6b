//! In-process, single-use nonce store.
//!
//! Hands out values that can be embedded in a client-visible context
//! (a form, a redirect) and redeemed exactly once within a bounded time
//! window. Nothing is persisted beyond process memory; a background
//! pruner bounds growth from nonces that are never redeemed.
//!
//! Values are derived deterministically from `(expiry, salt)` rather than
//! drawn at random, so two nonces issued in the same instant with the same
//! salt collide. The map key *is* the derivation, which is why validation
//! reduces to a single lookup-and-delete.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Sweep cadence of the background pruner, in multiples of the TTL.
const PRUNE_INTERVAL_TTLS: u32 = 5;

/// Salt length when no salt is configured, in bytes.
const RANDOM_SALT_LEN: usize = 20;

struct StoreState {
    salt: String,
    entries: HashMap<String, DateTime<Utc>>,
}

/// An in-memory store of outstanding nonces.
///
/// All map access is serialized through one reader/writer lock per store
/// instance; the pruner takes the same lock. Validation mutates on success
/// (the entry is consumed), so it takes the exclusive lock; concurrent
/// validations of the same value have exactly one winner.
///
/// Salt and TTL belong to the instance, not the process, so each test can
/// construct its own store with its own timing.
pub struct NonceStore {
    state: Arc<RwLock<StoreState>>,
    ttl: watch::Sender<Duration>,
}

impl NonceStore {
    /// Creates a store with the given salt and TTL.
    ///
    /// When `salt` is `None`, a random salt is generated; this fails only
    /// if the system entropy source does.
    pub fn new(salt: Option<String>, ttl: Duration) -> Result<Self, AuthError> {
        let salt = match salt {
            Some(s) => s,
            None => {
                let mut bytes = [0u8; RANDOM_SALT_LEN];
                OsRng
                    .try_fill_bytes(&mut bytes)
                    .map_err(|e| AuthError::crypto(format!("entropy source failed: {e}")))?;
                hex::encode(bytes)
            }
        };

        let (ttl_tx, _) = watch::channel(ttl);

        Ok(Self {
            state: Arc::new(RwLock::new(StoreState {
                salt,
                entries: HashMap::new(),
            })),
            ttl: ttl_tx,
        })
    }

    /// Creates a store from the process configuration.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::new(config.nonce_salt.clone(), config.nonce_ttl)
    }

    /// Issues a new nonce, valid for one TTL from now.
    pub async fn issue(&self) -> String {
        let ttl = *self.ttl.borrow();
        let mut state = self.state.write().await;

        let expiry = Utc::now() + ttl;
        let value = derive_value(&state.salt, expiry);
        state.entries.insert(value.clone(), expiry);

        value
    }

    /// Redeems a nonce, consuming it on success.
    ///
    /// Returns `false` for a value that is unknown *or* expired. The two
    /// cases are indistinguishable by design, so a caller cannot probe
    /// whether a forged value ever existed. Expired entries are left for
    /// the pruner.
    pub async fn validate(&self, value: &str) -> bool {
        let mut state = self.state.write().await;

        match state.entries.get(value) {
            None => false,
            Some(&expiry) if Utc::now() >= expiry => false,
            Some(_) => {
                state.entries.remove(value);
                true
            }
        }
    }

    /// Replaces the derivation salt for nonces issued from now on.
    ///
    /// Outstanding nonces are untouched: they were inserted under their
    /// old derivation and still validate until consumed or pruned.
    pub async fn set_salt(&self, salt: String) {
        self.state.write().await.salt = salt;
    }

    /// Replaces the TTL for nonces issued from now on.
    ///
    /// A running pruner reschedules its wait immediately instead of
    /// sleeping out the old interval. Existing entries keep the expiry
    /// they were issued with.
    pub fn set_ttl(&self, ttl: Duration) {
        self.ttl.send_replace(ttl);
    }

    /// Current TTL applied to newly issued nonces.
    pub fn ttl(&self) -> Duration {
        *self.ttl.borrow()
    }

    /// Number of outstanding (unconsumed, not yet pruned) nonces.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether the store currently holds no nonces.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Spawns the background pruning task for this store.
    ///
    /// The task wakes every `5 x TTL` (or immediately when the TTL
    /// changes) and removes entries whose expiry has passed. One pruner
    /// per store instance is expected. The returned handle stops the task
    /// deterministically.
    pub fn spawn_pruner(&self) -> PrunerHandle {
        let state = Arc::clone(&self.state);
        let mut ttl_rx = self.ttl.subscribe();
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            loop {
                let interval = *ttl_rx.borrow_and_update() * PRUNE_INTERVAL_TTLS;
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        let now = Utc::now();
                        let mut state = state.write().await;
                        let before = state.entries.len();
                        state.entries.retain(|_, expiry| *expiry > now);
                        let removed = before - state.entries.len();
                        drop(state);
                        if removed > 0 {
                            debug!(removed, "pruned expired nonces");
                        }
                    }
                    res = ttl_rx.changed() => {
                        // Recompute the wait with the new TTL; exit if the
                        // store itself is gone.
                        if res.is_err() {
                            break;
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
        });

        PrunerHandle {
            stop: stop_tx,
            task,
        }
    }
}

/// Stop handle for a spawned pruning task.
pub struct PrunerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PrunerHandle {
    /// Signals the pruner to stop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

/// Derives a nonce value from its expiry and the store salt.
fn derive_value(salt: &str, expiry: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(expiry.timestamp_micros().to_string().as_bytes());
    hasher.update(b":");
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}
