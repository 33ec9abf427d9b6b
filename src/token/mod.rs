//! Single-use, purpose-scoped security tokens.
//!
//! A token proves possession of a random secret for one purpose (password
//! reset or email verification), tied to one owner, usable exactly once
//! within a bounded window. The secret is handed to the caller exactly
//! once at issue time, destined for an outbound email link, and only
//! its slow salted hash is persisted, so a later presenter is matched by
//! re-verifying the hash, not by lookup.

mod record;
pub mod storage;

pub use record::{NewSecurityToken, SecurityToken, TokenPurpose, TokenState};
pub use storage::{MemoryTokenStore, TokenStore};

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::hasher::SecretHasher;

/// Entropy of a freshly minted secret, in bytes.
const SECRET_LEN: usize = 15;

/// How many active tokens one resolution pass will consider.
const RESOLVE_PAGE: i64 = 100;

/// Default validity window for new tokens.
const DEFAULT_WINDOW: Duration = Duration::from_secs(3600);

/// The result of minting a token: the plaintext secret (returned exactly
/// once, never stored) and the persisted record.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub secret: String,
    pub token: SecurityToken,
}

/// Issues, resolves, and redeems security tokens.
///
/// Storage calls are isolated round-trips to the collaborator: no
/// internal retries, failures surfaced as-is. There is no cross-request
/// locking either: two racing resolve-then-mark-used sequences for the
/// same secret can both pass validation before one marks it used. The
/// window is narrow and tolerated.
pub struct TokenService<S: TokenStore> {
    storage: Arc<S>,
    hasher: SecretHasher,
    window: Duration,
}

impl<S: TokenStore> TokenService<S> {
    /// Creates a service over `storage` with the default hasher and a
    /// one-hour validity window.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            hasher: SecretHasher::new(),
            window: DEFAULT_WINDOW,
        }
    }

    /// Replaces the secret hasher.
    pub fn with_hasher(mut self, hasher: SecretHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Replaces the validity window applied at issue time.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Mints a token for `owner_id` and `purpose`.
    ///
    /// Generates the random secret, hashes it, and persists the record
    /// with `expires_at = now + window`. Entropy, hashing, and storage
    /// failures are fatal to this call and surfaced to the caller.
    ///
    /// `purpose` is a closed enum: an unknown purpose string is rejected
    /// at [`TokenPurpose`]'s `FromStr` boundary, before anything reaches
    /// this method or storage.
    pub async fn issue(
        &self,
        owner_id: i64,
        purpose: TokenPurpose,
    ) -> Result<IssuedToken, AuthError> {
        let mut bytes = [0u8; SECRET_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AuthError::crypto(format!("entropy source failed: {e}")))?;
        let secret = URL_SAFE_NO_PAD.encode(bytes);

        let secret_hash = self.hasher.hash(&secret)?;

        let token = self
            .storage
            .insert(NewSecurityToken {
                owner_id,
                secret_hash,
                purpose,
                expires_at: Utc::now() + self.window,
            })
            .await?;

        debug!(owner_id, %purpose, token_id = token.id, "issued security token");

        Ok(IssuedToken { secret, token })
    }

    /// Finds the token a presented secret belongs to.
    ///
    /// The hash at rest is salted, so there is nothing to index on:
    /// resolution loads one page of active tokens and verifies the secret
    /// against each until a match or exhaustion. That is O(active tokens)
    /// by design. A secret matching nothing is `Ok(None)`, not an error; the
    /// caller cannot tell a forged secret from one that never existed.
    ///
    /// Resolution does not filter on expiry. Callers must check both
    /// [`SecurityToken::is_expired`] and [`SecurityToken::is_used`] after
    /// resolving, then call [`mark_used`](Self::mark_used) exactly once.
    pub async fn resolve(&self, secret: &str) -> Result<Option<SecurityToken>, AuthError> {
        let candidates = self.storage.list_active(0, RESOLVE_PAGE).await?;

        for token in candidates {
            if self.hasher.verify(secret, &token.secret_hash)? {
                return Ok(Some(token));
            }
        }

        Ok(None)
    }

    /// Purpose-scoped convenience over [`resolve`](Self::resolve).
    ///
    /// A secret that resolves to a token of a different purpose is
    /// reported as not found, same as no match at all.
    pub async fn resolve_for(
        &self,
        secret: &str,
        purpose: TokenPurpose,
    ) -> Result<Option<SecurityToken>, AuthError> {
        Ok(self.resolve(secret).await?.filter(|t| t.purpose == purpose))
    }

    /// Redeems a token.
    ///
    /// The only write path that flips [`SecurityToken::is_used`]; the
    /// caller invokes it exactly once, after every other check has
    /// passed. The change is written through to storage and mirrored into
    /// the handle.
    pub async fn mark_used(&self, token: &mut SecurityToken) -> Result<(), AuthError> {
        let now = Utc::now();
        self.storage
            .set_state(token.id, TokenState::Used, now)
            .await?;

        token.state = TokenState::Used;
        token.updated_at = now;
        Ok(())
    }

    /// Administratively withdraws a token. Terminal, like `used`.
    pub async fn revoke(&self, token: &mut SecurityToken) -> Result<(), AuthError> {
        let now = Utc::now();
        self.storage
            .set_state(token.id, TokenState::Revoked, now)
            .await?;

        warn!(token_id = token.id, owner_id = token.owner_id, "revoked security token");

        token.state = TokenState::Revoked;
        token.updated_at = now;
        Ok(())
    }

    /// One page of `owner_id`'s tokens, in any state.
    pub async fn tokens_for_owner(
        &self,
        owner_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<SecurityToken>, AuthError> {
        self.storage.list_by_owner(owner_id, offset, limit).await
    }

    /// Physically deletes a token.
    ///
    /// Housekeeping only; the normal redemption flow leaves redeemed
    /// tokens behind in the `used` state.
    pub async fn delete(&self, token: SecurityToken) -> Result<(), AuthError> {
        self.storage.delete(token.id).await
    }
}
