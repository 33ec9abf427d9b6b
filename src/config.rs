use std::time::Duration;

/// Configuration for the credential subsystems.
///
/// One instance is constructed at process start and handed to the
/// components that need it; nothing here is ambient global state, so each
/// test can build its own configuration.
///
/// # Environment Variables
///
/// [`Default`] reads:
/// - `TOKEN_AUTH_SECRET`: shared HMAC secret for signed SSO payloads
/// - `TOKEN_AUTH_NONCE_SALT`: salt for nonce derivation (random if unset)
/// - `TOKEN_AUTH_NONCE_TTL`: nonce time-to-live in seconds (default: 600)
/// - `TOKEN_AUTH_TOKEN_TTL`: security token window in seconds (default: 3600)
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared secret keying the SSO payload signatures.
    pub shared_secret: String,
    /// Salt mixed into nonce derivation. `None` means each store picks a
    /// random salt at construction.
    pub nonce_salt: Option<String>,
    /// Time-to-live for issued nonces. The pruner sweeps at 5x this value.
    pub nonce_ttl: Duration,
    /// Validity window for security tokens.
    pub token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            shared_secret: std::env::var("TOKEN_AUTH_SECRET").unwrap_or_default(),
            nonce_salt: std::env::var("TOKEN_AUTH_NONCE_SALT").ok(),
            nonce_ttl: Duration::from_secs(
                std::env::var("TOKEN_AUTH_NONCE_TTL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            token_ttl: Duration::from_secs(
                std::env::var("TOKEN_AUTH_TOKEN_TTL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }
}

impl AuthConfig {
    /// Validates the configuration and returns any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.shared_secret.is_empty() {
            warnings.push(
                "Shared secret is empty; signed payloads will be forgeable by anyone".to_string(),
            );
        } else if self.shared_secret.len() < 16 {
            warnings.push("Shared secret is shorter than 16 bytes".to_string());
        }

        if self.nonce_ttl.as_secs() < 60 {
            warnings
                .push("Very short nonce TTL (< 1 minute) may cause usability issues".to_string());
        }
        if self.nonce_ttl.as_secs() > 3600 {
            warnings.push("Long nonce TTL (> 1 hour) may increase replay risk".to_string());
        }

        if self.token_ttl.as_secs() > 24 * 3600 {
            warnings.push("Long token window (> 24 hours) may increase exposure".to_string());
        }

        warnings
    }

    /// Returns a summary of the current configuration.
    ///
    /// The secret itself is never included.
    pub fn summary(&self) -> String {
        format!(
            "AuthConfig {{ Nonce TTL: {}s, Token TTL: {}s, Salt: {} }}",
            self.nonce_ttl.as_secs(),
            self.token_ttl.as_secs(),
            if self.nonce_salt.is_some() {
                "configured"
            } else {
                "random"
            },
        )
    }
}
