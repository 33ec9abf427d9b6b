//! Stateless, HMAC-signed payloads for single-sign-on handoff.
//!
//! Packs a set of key-value fields into a URL query string, base64-encodes
//! it as `sso`, and attaches a detached `sig`: the hex HMAC-SHA256 of the
//! encoded payload under a shared secret. The codec guarantees integrity
//! and authenticity of the fields, nothing more: it keeps no state and no
//! expiry of its own. Freshness comes from the `nonce` field, which
//! callers cross-check against the nonce store.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use hmac::Mac;
use tracing::warn;
use url::Url;
use url::form_urlencoded;

use crate::HmacSha256;
use crate::error::AuthError;

const KEY_NONCE: &str = "nonce";
const KEY_RETURN_URL: &str = "return_sso_url";
const KEY_EXTERNAL_ID: &str = "external_id";

/// Which way a payload is traveling.
///
/// Direction decides the required keys: every payload carries `nonce`; an
/// outbound one (application to identity provider) must also carry
/// `return_sso_url`, an inbound one (identity provider to application)
/// `external_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
}

/// Packs, unpacks, and verifies signed SSO payloads.
pub struct SsoCodec {
    secret: Vec<u8>,
}

impl SsoCodec {
    /// Creates a codec keyed by the shared secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: secret.to_vec(),
        }
    }

    /// Builds a signed URL carrying `fields` as its `sso` payload.
    ///
    /// Fails only if `base_url` does not parse; field content is
    /// arbitrary.
    pub fn pack(&self, base_url: &str, fields: &[(&str, &str)]) -> Result<Url, AuthError> {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            serializer.append_pair(key, value);
        }
        let enc_payload = URL_SAFE.encode(serializer.finish());

        let sig = self.sign(&enc_payload)?;

        let mut url = Url::parse(base_url)?;
        url.query_pairs_mut()
            .append_pair("sso", &enc_payload)
            .append_pair("sig", &sig);

        Ok(url)
    }

    /// Decodes a payload and checks the keys `direction` requires.
    ///
    /// Decode failures and each missing key are distinct, named errors so
    /// callers can log the specific cause of a rejected handoff. Extract
    /// says nothing about authenticity; callers must also pass the
    /// received signature through [`validate`](Self::validate) and reject
    /// the whole request when it fails.
    pub fn extract(
        &self,
        enc_payload: &str,
        direction: Direction,
    ) -> Result<HashMap<String, String>, AuthError> {
        let payload = URL_SAFE.decode(enc_payload).map_err(|e| {
            warn!(error = %e, "failed to decode sso payload");
            AuthError::PayloadDecode(e)
        })?;

        let fields: HashMap<String, String> =
            form_urlencoded::parse(&payload).into_owned().collect();

        let mut required = vec![KEY_NONCE];
        match direction {
            Direction::Outbound => required.push(KEY_RETURN_URL),
            Direction::Inbound => required.push(KEY_EXTERNAL_ID),
        }

        for key in required {
            if !fields.contains_key(key) {
                warn!(key, "sso payload is missing a required key");
                return Err(AuthError::MissingPayloadKey(key));
            }
        }

        Ok(fields)
    }

    /// Checks a detached signature against a received payload.
    ///
    /// Recomputes the HMAC over the exact base64 string as received and
    /// compares in constant time. Malformed hex is simply a failed
    /// validation, not an error.
    pub fn validate(&self, enc_payload: &str, signature: &str) -> bool {
        let Ok(sig) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(enc_payload.as_bytes());
        mac.verify_slice(&sig).is_ok()
    }

    fn sign(&self, enc_payload: &str) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError::crypto(format!("invalid hmac key: {e}")))?;
        mac.update(enc_payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"sso-shared-secret";

    fn codec() -> SsoCodec {
        SsoCodec::new(SECRET)
    }

    /// Pulls the `sso` and `sig` query parameters back out of a packed URL.
    fn unpack_query(url: &Url) -> (String, String) {
        let mut sso = None;
        let mut sig = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "sso" => sso = Some(value.into_owned()),
                "sig" => sig = Some(value.into_owned()),
                _ => {}
            }
        }
        (sso.expect("sso param"), sig.expect("sig param"))
    }

    #[test]
    fn test_pack_extract_round_trip_outbound() {
        let codec = codec();
        let url = codec
            .pack(
                "https://idp.example.com/session/sso_provider",
                &[
                    ("nonce", "abc123"),
                    ("return_sso_url", "https://app.example.com/sso/callback"),
                ],
            )
            .unwrap();

        let (enc_payload, sig) = unpack_query(&url);
        assert!(codec.validate(&enc_payload, &sig));

        let fields = codec.extract(&enc_payload, Direction::Outbound).unwrap();
        assert_eq!(fields["nonce"], "abc123");
        assert_eq!(fields["return_sso_url"], "https://app.example.com/sso/callback");
    }

    #[test]
    fn test_pack_extract_round_trip_inbound() {
        let codec = codec();
        let url = codec
            .pack(
                "https://app.example.com/sso/callback",
                &[("nonce", "abc123"), ("external_id", "user-9000")],
            )
            .unwrap();

        let (enc_payload, sig) = unpack_query(&url);
        assert!(codec.validate(&enc_payload, &sig));

        let fields = codec.extract(&enc_payload, Direction::Inbound).unwrap();
        assert_eq!(fields["external_id"], "user-9000");
    }

    #[test]
    fn test_round_trip_preserves_awkward_values() {
        let codec = codec();
        let url = codec
            .pack(
                "https://idp.example.com/sso",
                &[
                    ("nonce", "n&=?+ %"),
                    ("return_sso_url", "https://app.example.com/cb?next=/events&x=1"),
                    ("name", "Ada Lovelace"),
                ],
            )
            .unwrap();

        let (enc_payload, _) = unpack_query(&url);
        let fields = codec.extract(&enc_payload, Direction::Outbound).unwrap();
        assert_eq!(fields["nonce"], "n&=?+ %");
        assert_eq!(
            fields["return_sso_url"],
            "https://app.example.com/cb?next=/events&x=1"
        );
        assert_eq!(fields["name"], "Ada Lovelace");
    }

    #[test]
    fn test_pack_rejects_unparseable_base_url() {
        let codec = codec();
        let result = codec.pack("not a url at all", &[("nonce", "x")]);
        assert!(matches!(result, Err(AuthError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_extract_missing_nonce() {
        let codec = codec();
        let enc = URL_SAFE.encode("external_id=user-1");

        let result = codec.extract(&enc, Direction::Inbound);
        assert!(matches!(result, Err(AuthError::MissingPayloadKey("nonce"))));
    }

    #[test]
    fn test_extract_missing_return_url_is_named() {
        let codec = codec();
        let enc = URL_SAFE.encode("nonce=abc123");

        // Not a generic decode failure: the error names the absent key.
        let result = codec.extract(&enc, Direction::Outbound);
        assert!(matches!(
            result,
            Err(AuthError::MissingPayloadKey("return_sso_url"))
        ));
    }

    #[test]
    fn test_extract_missing_external_id_is_named() {
        let codec = codec();
        let enc = URL_SAFE.encode("nonce=abc123");

        let result = codec.extract(&enc, Direction::Inbound);
        assert!(matches!(
            result,
            Err(AuthError::MissingPayloadKey("external_id"))
        ));
    }

    #[test]
    fn test_extract_rejects_bad_base64() {
        let codec = codec();
        let result = codec.extract("!!!not-base64!!!", Direction::Inbound);
        assert!(matches!(result, Err(AuthError::PayloadDecode(_))));
    }

    #[test]
    fn test_tampered_payload_fails_validation() {
        let codec = codec();
        let url = codec
            .pack(
                "https://idp.example.com/sso",
                &[("nonce", "abc123"), ("return_sso_url", "https://app.example.com/cb")],
            )
            .unwrap();
        let (enc_payload, sig) = unpack_query(&url);

        // Flip one character of the base64 body.
        let mut tampered: Vec<char> = enc_payload.chars().collect();
        let i = tampered.len() / 2;
        tampered[i] = if tampered[i] == 'A' { 'B' } else { 'A' };
        let tampered: String = tampered.into_iter().collect();

        assert_ne!(tampered, enc_payload);
        assert!(!codec.validate(&tampered, &sig));
    }

    #[test]
    fn test_tampered_signature_fails_validation() {
        let codec = codec();
        let url = codec
            .pack(
                "https://idp.example.com/sso",
                &[("nonce", "abc123"), ("return_sso_url", "https://app.example.com/cb")],
            )
            .unwrap();
        let (enc_payload, sig) = unpack_query(&url);

        let mut tampered: Vec<char> = sig.chars().collect();
        tampered[0] = if tampered[0] == '0' { '1' } else { '0' };
        let tampered: String = tampered.into_iter().collect();

        assert!(!codec.validate(&enc_payload, &tampered));
    }

    #[test]
    fn test_wrong_secret_fails_validation() {
        let codec = codec();
        let url = codec
            .pack(
                "https://idp.example.com/sso",
                &[("nonce", "abc123"), ("return_sso_url", "https://app.example.com/cb")],
            )
            .unwrap();
        let (enc_payload, sig) = unpack_query(&url);

        let other = SsoCodec::new(b"a-different-secret");
        assert!(!other.validate(&enc_payload, &sig));
    }

    #[test]
    fn test_validate_rejects_non_hex_signature() {
        let codec = codec();
        assert!(!codec.validate("AAAA", "zz-not-hex"));
    }

    #[test]
    fn test_pack_preserves_existing_query() {
        let codec = codec();
        let url = codec
            .pack(
                "https://idp.example.com/sso?tenant=events",
                &[("nonce", "abc123"), ("return_sso_url", "https://app.example.com/cb")],
            )
            .unwrap();

        let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["tenant"], "events");
        assert!(pairs.contains_key("sso"));
        assert!(pairs.contains_key("sig"));
    }
}
