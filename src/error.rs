use thiserror::Error;

/// Error types that can occur across the credential subsystems.
///
/// Not-found outcomes are deliberately *not* errors: a nonce that is
/// absent or expired validates to `false`, and a secret that matches no
/// token resolves to `None`. Collapsing those cases into values keeps the
/// public signal from distinguishing a forged credential from a stale one.
///
/// # Error Categories
///
/// - **Input validation**: [`AuthError::InvalidPurpose`],
///   [`AuthError::InvalidBaseUrl`], [`AuthError::PayloadDecode`],
///   [`AuthError::MissingPayloadKey`]
/// - **System**: [`AuthError::Crypto`], [`AuthError::Storage`]
#[derive(Error, Debug)]
pub enum AuthError {
    /// A token purpose outside the closed set was presented.
    ///
    /// Security tokens are only ever minted for password resets or email
    /// verification. This is a local input-validation failure reported to
    /// the caller before any storage is touched.
    #[error("invalid token purpose: {0}")]
    InvalidPurpose(String),

    /// The base URL given to the payload codec did not parse.
    #[error("invalid base URL")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// An SSO payload could not be base64-decoded.
    ///
    /// Distinct from the missing-key errors so callers can log the
    /// specific cause of a rejected handoff.
    #[error("payload is not valid base64")]
    PayloadDecode(#[from] base64::DecodeError),

    /// An SSO payload decoded cleanly but lacks a required key.
    ///
    /// Every payload must carry `nonce`; outbound payloads additionally
    /// require `return_sso_url`, inbound ones `external_id`.
    #[error("payload is missing required key `{0}`")]
    MissingPayloadKey(&'static str),

    /// A cryptographic operation failed.
    ///
    /// Covers entropy-source failures and hash computation failures.
    /// These are fatal to the operation in progress and are never
    /// downgraded to a not-found result.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The durable storage collaborator reported a failure.
    ///
    /// Surfaced as-is; this crate performs no internal retries.
    #[error("storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Convenience constructor for crypto failures.
    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    /// Convenience constructor for storage-collaborator failures.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
