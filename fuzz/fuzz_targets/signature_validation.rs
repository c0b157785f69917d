#![no_main]

//! Fuzz target for signature verification.
//!
//! Splits the input into a signature, a secret, and a body and checks
//! that verification never panics and only accepts what signing produces.

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    fuzz_signature_validation(data);
});

fn fuzz_signature_validation(data: &[u8]) {
    let (head, body) = data.split_at(data.len().min(64));
    let signature = String::from_utf8_lossy(head);
    let secret = match body.first() {
        Some(&len) => String::from_utf8_lossy(&body[1..body.len().min(1 + len as usize)]),
        None => "".into(),
    };

    let accepted = leadhook_signing::verify_body(body, &signature, &secret);

    if let Ok(expected) = leadhook_signing::sign_bytes(body, &secret) {
        assert_eq!(accepted, expected == signature, "verification disagrees with signing");
        assert!(leadhook_signing::verify_body(body, &expected, &secret));
    }

    if let Ok(payload) = serde_json::from_slice(body) {
        let _ = leadhook_signing::validate_signature(&payload, &signature, &secret);
    }
}
