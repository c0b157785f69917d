//! Canonical encoding, signature generation and verification.

use std::fmt;

use bytes::Bytes;
use hmac::{Hmac, Mac};
use leadhook_core::WebhookPayload;
use sha2::Sha256;

use crate::error::{Result, SigningError};

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded HMAC-SHA256 digest.
pub const SIGNATURE_HEX_LEN: usize = 64;

/// Encodes a payload into the bytes that are both signed and sent.
///
/// Keys follow the struct's field order and the output has no insignificant
/// whitespace, so equal payloads always produce identical bytes.
///
/// # Errors
///
/// Returns `SigningError::Serialization` if the payload cannot be encoded.
pub fn canonical_bytes(payload: &WebhookPayload) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(payload)?))
}

/// Signs the canonical encoding of `payload` with `secret`.
///
/// Returns 64 lowercase hex characters. Deterministic for equal inputs.
///
/// # Errors
///
/// Returns `SigningError::Serialization` if the payload cannot be encoded.
pub fn generate_signature(payload: &WebhookPayload, secret: &str) -> Result<String> {
    let body = canonical_bytes(payload)?;
    sign_bytes(&body, secret)
}

/// Checks `signature` against the canonical encoding of `payload`.
///
/// Returns `false` for a mismatch and for malformed input: empty, wrong
/// length, non-hex or uppercase signatures.
pub fn validate_signature(payload: &WebhookPayload, signature: &str, secret: &str) -> bool {
    match canonical_bytes(payload) {
        Ok(body) => verify_body(&body, signature, secret),
        Err(_) => false,
    }
}

/// Signs an already-encoded body.
///
/// # Errors
///
/// Returns `SigningError::InvalidKey` if the MAC rejects the key. HMAC accepts
/// keys of any length, so this does not occur with `Sha256`.
pub fn sign_bytes(body: &[u8], secret: &str) -> Result<String> {
    let mut mac = keyed_mac(secret)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a signature over a raw request body.
///
/// Receivers should call this with the body exactly as received rather
/// than re-encoding a parsed payload. Comparison is constant time.
pub fn verify_body(body: &[u8], signature: &str, secret: &str) -> bool {
    if !is_canonical_hex(signature) {
        return false;
    }

    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = keyed_mac(secret) else {
        return false;
    };

    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

fn keyed_mac(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SigningError::InvalidKey)
}

/// Only the exact form `sign_bytes` emits is accepted.
fn is_canonical_hex(signature: &str) -> bool {
    signature.len() == SIGNATURE_HEX_LEN
        && signature.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Signer bound to one secret.
///
/// Useful when many payloads go to the same destination. The secret never
/// appears in `Debug` output.
#[derive(Clone)]
pub struct WebhookSigner {
    secret: String,
}

impl WebhookSigner {
    /// Creates a signer for the given secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    /// Signs the canonical encoding of a payload.
    ///
    /// # Errors
    ///
    /// See [`generate_signature`].
    pub fn sign(&self, payload: &WebhookPayload) -> Result<String> {
        generate_signature(payload, &self.secret)
    }

    /// Signs an already-encoded body.
    ///
    /// # Errors
    ///
    /// See [`sign_bytes`].
    pub fn sign_body(&self, body: &[u8]) -> Result<String> {
        sign_bytes(body, &self.secret)
    }

    /// Verifies a signature over a payload.
    pub fn verify(&self, payload: &WebhookPayload, signature: &str) -> bool {
        validate_signature(payload, signature, &self.secret)
    }

    /// Verifies a signature over a raw body.
    pub fn verify_body(&self, body: &[u8], signature: &str) -> bool {
        verify_body(body, signature, &self.secret)
    }
}

impl fmt::Debug for WebhookSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSigner").field("secret", &"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use leadhook_core::{LeadEventType, QualificationTier};

    use super::*;

    fn payload() -> WebhookPayload {
        WebhookPayload::builder(LeadEventType::LeadQualified, "lead_123")
            .lead_name("Maria Silva")
            .email("maria@example.com")
            .phone("+5511987654321")
            .qualification(QualificationTier::Hot, 85)
            .campaign_id("camp_456")
            .timestamp("2024-01-15T10:30:00.000Z")
            .build()
            .unwrap()
    }

    #[test]
    fn sign_bytes_matches_known_vector() {
        let signature = sign_bytes(b"hello", "secret").unwrap();
        assert_eq!(signature, "88aab3ede8d3adf94d26ab90d3bafd4a2083070c3bcce9c014ee04a443847c0b");
    }

    #[test]
    fn signature_is_lowercase_hex_of_fixed_length() {
        let signature = generate_signature(&payload(), "k").unwrap();

        assert_eq!(signature.len(), SIGNATURE_HEX_LEN);
        assert!(is_canonical_hex(&signature));
    }

    #[test]
    fn generation_is_deterministic() {
        let first = generate_signature(&payload(), "secret").unwrap();
        let second = generate_signature(&payload(), "secret").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn canonical_bytes_have_no_whitespace() {
        let body = canonical_bytes(&payload()).unwrap();
        let text = std::str::from_utf8(&body).unwrap();

        assert!(text.starts_with(r#"{"event_type":"lead_qualified","lead_id":"lead_123","#));
        assert!(!text.contains(": "));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn verification_truth_table() {
        let p = payload();
        let signature = generate_signature(&p, "right").unwrap();

        assert!(validate_signature(&p, &signature, "right"));
        assert!(!validate_signature(&p, &signature, "wrong"));

        let mut tampered = p.clone();
        tampered.qualification_score = 86;
        assert!(!validate_signature(&tampered, &signature, "right"));
    }

    #[test]
    fn malformed_signatures_are_rejected() {
        let p = payload();
        let signature = generate_signature(&p, "k").unwrap();

        assert!(!validate_signature(&p, "", "k"));
        assert!(!validate_signature(&p, &signature[..63], "k"));
        assert!(!validate_signature(&p, &format!("{signature}0"), "k"));
        assert!(!validate_signature(&p, &signature.to_uppercase(), "k"));
        assert!(!validate_signature(&p, &"zz".repeat(32), "k"));
        assert!(!validate_signature(&p, &format!("sha256={signature}"), "k"));
    }

    #[test]
    fn well_formed_wrong_digests_are_rejected() {
        let p = payload();
        let signature = generate_signature(&p, "k").unwrap();

        assert!(!validate_signature(&p, &"0".repeat(64), "k"));

        for index in [0, 31, 63] {
            let mut flipped = signature.clone().into_bytes();
            flipped[index] = if flipped[index] == b'0' { b'1' } else { b'0' };
            let flipped = String::from_utf8(flipped).unwrap();
            assert!(!validate_signature(&p, &flipped, "k"), "nibble {index} flipped");
        }
    }

    #[test]
    fn empty_secret_still_signs() {
        let signature = sign_bytes(b"body", "").unwrap();
        assert!(verify_body(b"body", &signature, ""));
        assert!(!verify_body(b"body", &signature, "x"));
    }

    #[test]
    fn signer_redacts_secret_in_debug() {
        let signer = WebhookSigner::new("super-secret-value");
        let debug = format!("{signer:?}");

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret-value"));
    }

    #[test]
    fn signer_round_trips_body_and_payload() {
        let signer = WebhookSigner::new("k");
        let p = payload();

        let signature = signer.sign(&p).unwrap();
        assert!(signer.verify(&p, &signature));

        let body = canonical_bytes(&p).unwrap();
        assert_eq!(signer.sign_body(&body).unwrap(), signature);
        assert!(signer.verify_body(&body, &signature));
    }
}
