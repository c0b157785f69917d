#![no_main]

//! Fuzz target for lead payload parsing and canonical encoding.
//!
//! Any payload that parses must validate or be rejected without panicking,
//! and its canonical form must parse back to the same payload.

use leadhook_core::WebhookPayload;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = serde_json::from_slice::<WebhookPayload>(data) else {
        return;
    };
    let _ = payload.validate();

    let canonical = leadhook_signing::canonical_bytes(&payload).expect("payload always encodes");
    let reparsed: WebhookPayload =
        serde_json::from_slice(&canonical).expect("canonical form parses");
    assert_eq!(reparsed, payload);

    let again = leadhook_signing::canonical_bytes(&reparsed).expect("payload always encodes");
    assert_eq!(canonical, again, "canonical encoding is not stable");
});
