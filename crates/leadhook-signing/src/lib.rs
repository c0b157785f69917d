//! HMAC-SHA256 signing for lead webhook payloads.
//!
//! Senders sign the canonical JSON encoding of a [`WebhookPayload`] and put
//! the lowercase hex digest in the `X-Webhook-Signature` header. Receivers
//! recompute the digest over the raw request body and compare in constant
//! time.
//!
//! ```
//! use leadhook_core::{LeadEventType, QualificationTier, WebhookPayload};
//! use leadhook_signing::{generate_signature, validate_signature};
//!
//! let payload = WebhookPayload::builder(LeadEventType::LeadScored, "lead_1")
//!     .qualification(QualificationTier::Warm, 60)
//!     .timestamp("2024-01-15T10:30:00.000Z")
//!     .build()
//!     .unwrap();
//!
//! let signature = generate_signature(&payload, "secret").unwrap();
//! assert_eq!(signature.len(), 64);
//! assert!(validate_signature(&payload, &signature, "secret"));
//! assert!(!validate_signature(&payload, &signature, "other"));
//! ```
//!
//! [`WebhookPayload`]: leadhook_core::WebhookPayload

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod signer;

pub use error::{Result, SigningError};
pub use signer::{
    canonical_bytes, generate_signature, sign_bytes, validate_signature, verify_body,
    WebhookSigner, SIGNATURE_HEX_LEN,
};
