use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// What a security token may be redeemed for.
///
/// This is a closed set; the `FromStr` boundary rejects anything else, so
/// an unknown purpose can never reach the service or its storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenPurpose {
    PasswordReset,
    EmailVerify,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PasswordReset => "password-reset",
            Self::EmailVerify => "email-verify",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenPurpose {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password-reset" => Ok(Self::PasswordReset),
            "email-verify" => Ok(Self::EmailVerify),
            other => Err(AuthError::InvalidPurpose(other.to_string())),
        }
    }
}

/// Lifecycle state of a security token.
///
/// `issued` is the only state in which a token can be resolved; `used`
/// and `revoked` are terminal. The state column is authoritative; it
/// replaces deriving "used" from timestamp equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenState {
    Issued,
    Used,
    Revoked,
}

impl TokenState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::Used => "used",
            Self::Revoked => "revoked",
        }
    }
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted single-use security token.
///
/// The plaintext secret exists only in the [`IssuedToken`] returned at
/// creation; this record carries its slow salted hash and is what the
/// storage collaborator round-trips.
///
/// [`IssuedToken`]: crate::token::IssuedToken
#[derive(Debug, Clone, Serialize)]
pub struct SecurityToken {
    /// Surrogate id assigned by storage.
    pub id: i64,
    /// The user this token belongs to.
    pub owner_id: i64,
    /// Argon2id hash of the plaintext secret.
    #[serde(skip_serializing)]
    pub secret_hash: String,
    pub purpose: TokenPurpose,
    pub state: TokenState,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SecurityToken {
    /// Whether the validity window has closed.
    ///
    /// Inclusive at the boundary: a token is expired at exactly
    /// `expires_at`, not only after it.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Whether the token has been redeemed.
    pub fn is_used(&self) -> bool {
        self.state == TokenState::Used
    }

    /// Whether the token was administratively withdrawn.
    pub fn is_revoked(&self) -> bool {
        self.state == TokenState::Revoked
    }
}

/// Fields for inserting a new token record.
///
/// `id`, `state`, and the timestamps are assigned by storage.
#[derive(Debug, Clone)]
pub struct NewSecurityToken {
    pub owner_id: i64,
    pub secret_hash: String,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
}
