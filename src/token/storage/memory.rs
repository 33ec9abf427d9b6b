//! In-memory token storage.
//!
//! A `BTreeMap` keyed by id behind a `tokio` RwLock. Ids are assigned
//! sequentially, which also gives `list_active` its deterministic order.
//! Nothing survives a restart; production deployments supply their own
//! [`TokenStore`] over the real database.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::TokenStore;
use crate::error::AuthError;
use crate::token::record::{NewSecurityToken, SecurityToken, TokenState};

struct Inner {
    next_id: i64,
    rows: BTreeMap<i64, SecurityToken>,
}

/// A [`TokenStore`] backed by process memory.
#[derive(Clone)]
pub struct MemoryTokenStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                next_id: 1,
                rows: BTreeMap::new(),
            })),
        }
    }

    /// Total number of stored tokens, in any state.
    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

fn page(offset: i64, limit: i64) -> (usize, usize) {
    (offset.max(0) as usize, limit.max(0) as usize)
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, new: NewSecurityToken) -> Result<SecurityToken, AuthError> {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let now = Utc::now();
        let token = SecurityToken {
            id,
            owner_id: new.owner_id,
            secret_hash: new.secret_hash,
            purpose: new.purpose,
            state: TokenState::Issued,
            expires_at: new.expires_at,
            created_at: now,
            updated_at: now,
        };
        inner.rows.insert(id, token.clone());

        Ok(token)
    }

    async fn get(&self, id: i64) -> Result<Option<SecurityToken>, AuthError> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn list_active(&self, offset: i64, limit: i64) -> Result<Vec<SecurityToken>, AuthError> {
        let (skip, take) = page(offset, limit);
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .values()
            .filter(|t| t.state == TokenState::Issued)
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn list_by_owner(
        &self,
        owner_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<SecurityToken>, AuthError> {
        let (skip, take) = page(offset, limit);
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .values()
            .filter(|t| t.owner_id == owner_id)
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn set_state(
        &self,
        id: i64,
        state: TokenState,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        let token = inner
            .rows
            .get_mut(&id)
            .ok_or_else(|| AuthError::storage(format!("no token with id {id}")))?;

        token.state = state;
        token.updated_at = at;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), AuthError> {
        self.inner.write().await.rows.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::record::TokenPurpose;
    use chrono::Duration as ChronoDuration;

    fn new_token(owner_id: i64) -> NewSecurityToken {
        NewSecurityToken {
            owner_id,
            secret_hash: format!("hash-for-{owner_id}"),
            purpose: TokenPurpose::PasswordReset,
            expires_at: Utc::now() + ChronoDuration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_timestamps() {
        let store = MemoryTokenStore::new();

        let a = store.insert(new_token(1)).await.unwrap();
        let b = store.insert(new_token(2)).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.state, TokenState::Issued);
        assert_eq!(a.created_at, a.updated_at);
    }

    #[tokio::test]
    async fn test_get_round_trip() {
        let store = MemoryTokenStore::new();
        let inserted = store.insert(new_token(7)).await.unwrap();

        let fetched = store.get(inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched.owner_id, 7);
        assert_eq!(fetched.secret_hash, inserted.secret_hash);

        assert!(store.get(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_active_excludes_used() {
        let store = MemoryTokenStore::new();
        let a = store.insert(new_token(1)).await.unwrap();
        store.insert(new_token(2)).await.unwrap();

        store
            .set_state(a.id, TokenState::Used, Utc::now())
            .await
            .unwrap();

        let active = store.list_active(0, 100).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].owner_id, 2);
    }

    #[tokio::test]
    async fn test_list_active_pagination_is_deterministic() {
        let store = MemoryTokenStore::new();
        for i in 0..5 {
            store.insert(new_token(i)).await.unwrap();
        }

        let first = store.list_active(0, 2).await.unwrap();
        let second = store.list_active(2, 2).await.unwrap();
        let third = store.list_active(4, 2).await.unwrap();

        let ids: Vec<i64> = first
            .iter()
            .chain(&second)
            .chain(&third)
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let store = MemoryTokenStore::new();
        store.insert(new_token(1)).await.unwrap();
        store.insert(new_token(1)).await.unwrap();
        store.insert(new_token(2)).await.unwrap();

        let owned = store.list_by_owner(1, 0, 100).await.unwrap();
        assert_eq!(owned.len(), 2);
        assert!(owned.iter().all(|t| t.owner_id == 1));
    }

    #[tokio::test]
    async fn test_set_state_on_missing_id_is_a_storage_error() {
        let store = MemoryTokenStore::new();
        let result = store.set_state(41, TokenState::Used, Utc::now()).await;
        assert!(matches!(result, Err(AuthError::Storage(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryTokenStore::new();
        let token = store.insert(new_token(1)).await.unwrap();

        store.delete(token.id).await.unwrap();
        assert!(store.get(token.id).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }
}
