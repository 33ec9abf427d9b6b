//! Abstract storage collaborator for security tokens.
//!
//! The durable store for business entities lives outside this crate; the
//! token service only consumes the narrow contract below. An in-memory
//! implementation ships for tests and single-instance use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::record::{NewSecurityToken, SecurityToken, TokenState};
use crate::error::AuthError;

mod memory;
pub use memory::MemoryTokenStore;

/// Storage contract consumed by the token service.
///
/// All methods are single, synchronous-in-spirit round-trips: each may
/// fail or time out independently, the service performs no retries, and
/// callers own deadline propagation.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Inserts a new token and returns the stored record with its
    /// assigned id, state, and timestamps.
    async fn insert(&self, new: NewSecurityToken) -> Result<SecurityToken, AuthError>;

    /// Point lookup by id.
    async fn get(&self, id: i64) -> Result<Option<SecurityToken>, AuthError>;

    /// One page of tokens still in the `issued` state.
    ///
    /// Ordering is arbitrary but deterministic, so offset/limit paging
    /// walks the set without duplicates.
    async fn list_active(&self, offset: i64, limit: i64) -> Result<Vec<SecurityToken>, AuthError>;

    /// One page of a single owner's tokens, in any state.
    async fn list_by_owner(
        &self,
        owner_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<SecurityToken>, AuthError>;

    /// Moves a token to `state` and stamps `updated_at = at`.
    async fn set_state(
        &self,
        id: i64,
        state: TokenState,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Physically removes a token.
    ///
    /// Available to housekeeping; the normal redemption flow never calls
    /// this. Redeemed tokens stay behind in the `used` state.
    async fn delete(&self, id: i64) -> Result<(), AuthError>;
}
