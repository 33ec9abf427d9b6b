//! # Token Auth
//!
//! Credential and token infrastructure for server-rendered web
//! applications: ephemeral single-use nonces, persisted single-use
//! security tokens, and stateless HMAC-signed SSO payloads.
//!
//! The three mechanisms share one idea: a credential that proves intent
//! exactly once, without a live index.
//!
//! - **[`NonceStore`]**: an in-process map of short-lived values for
//!   anti-replay and anti-forgery (one-shot form or handshake tokens),
//!   swept by a background pruner.
//! - **[`TokenService`]**: longer-lived, purpose-scoped tokens for
//!   password resets and email verification. Only a slow salted hash is
//!   persisted; the plaintext secret is returned exactly once at issue
//!   time and resolved later by hash verification against the active set.
//! - **[`SsoCodec`]**: tamper-evident key-value payloads handed off over
//!   URL query strings between the application and an external identity
//!   provider, protected by HMAC-SHA256 under a shared secret.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use token_auth::{MemoryTokenStore, NonceStore, SsoCodec, TokenPurpose, TokenService};
//!
//! # async fn example() -> Result<(), token_auth::AuthError> {
//! // Single-use nonces for forms and handshakes.
//! let nonces = NonceStore::new(None, Duration::from_secs(600))?;
//! let pruner = nonces.spawn_pruner();
//! let value = nonces.issue().await;
//! assert!(nonces.validate(&value).await);
//! assert!(!nonces.validate(&value).await); // consumed
//!
//! // Single-use security tokens, e.g. for a password reset email.
//! let service = TokenService::new(Arc::new(MemoryTokenStore::new()));
//! let issued = service.issue(42, TokenPurpose::PasswordReset).await?;
//! let mut token = service.resolve(&issued.secret).await?.expect("fresh token");
//! assert!(!token.is_expired() && !token.is_used());
//! service.mark_used(&mut token).await?;
//!
//! // Signed SSO handoff over a URL; freshness comes from the nonce.
//! let codec = SsoCodec::new(b"shared-secret");
//! let nonce = nonces.issue().await;
//! let _url = codec.pack(
//!     "https://idp.example.com/session/sso_provider",
//!     &[
//!         ("nonce", nonce.as_str()),
//!         ("return_sso_url", "https://app.example.com/sso/callback"),
//!     ],
//! )?;
//!
//! pruner.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## What this crate is not
//!
//! The nonce store is process-local and best-effort. It is not
//! distributed and does not persist across restarts. Token purposes are
//! a small closed set, not arbitrary claims. The only revocation beyond
//! single use is the explicit per-token `revoked` state.

pub mod config;
pub mod error;
pub mod hasher;
pub mod nonce;
pub mod sso;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use hasher::{HashParams, SecretHasher};
pub use nonce::{NonceStore, PrunerHandle};
pub use sso::{Direction, SsoCodec};
pub use token::{
    IssuedToken, MemoryTokenStore, NewSecurityToken, SecurityToken, TokenPurpose, TokenService,
    TokenState, TokenStore,
};

/// Internal type alias for HMAC-SHA256 operations.
pub(crate) type HmacSha256 = hmac::Hmac<sha2::Sha256>;
