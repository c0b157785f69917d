//! Lead payload fixtures.
//!
//! Fixed payloads keep signature assertions reproducible; the random
//! builder spreads tests over many inputs without hand-written tables.

use chrono::{TimeZone, Utc};
use leadhook_core::{LeadEventType, QualificationTier, WebhookPayload};
use rand::Rng;

/// Secret used with [`reference_payload`] in end-to-end checks.
pub const REFERENCE_SECRET: &str = "test_api_key_secret";

/// The qualified lead used across signature and delivery tests.
pub fn reference_payload() -> WebhookPayload {
    WebhookPayload {
        event_type: LeadEventType::LeadQualified,
        lead_id: "lead_123".to_string(),
        lead_name: "Maria Silva".to_string(),
        email: "maria@example.com".to_string(),
        phone: "+5511987654321".to_string(),
        qualification_tier: QualificationTier::Hot,
        qualification_score: 85,
        campaign_id: "camp_456".to_string(),
        timestamp: "2024-01-15T10:30:00.000Z".to_string(),
    }
}

/// A freshly captured lead with no score yet.
pub fn created_payload(lead_id: &str) -> WebhookPayload {
    WebhookPayload {
        event_type: LeadEventType::LeadCreated,
        lead_id: lead_id.to_string(),
        lead_name: "João Pereira".to_string(),
        email: "joao@example.com".to_string(),
        phone: "+5521912345678".to_string(),
        qualification_tier: QualificationTier::Cold,
        qualification_score: 0,
        campaign_id: "camp_789".to_string(),
        timestamp: "2024-03-02T14:05:09.250Z".to_string(),
    }
}

/// A lead with random but valid field values.
pub fn random_payload() -> WebhookPayload {
    let mut rng = rand::rng();
    let score: u8 = rng.random_range(0..=100);
    let tier = match score {
        70..=100 => QualificationTier::Hot,
        40..=69 => QualificationTier::Warm,
        _ => QualificationTier::Cold,
    };
    let seconds = rng.random_range(1_600_000_000..1_800_000_000);
    let occurred_at = Utc.timestamp_opt(seconds, 0).single().unwrap_or_else(Utc::now);

    WebhookPayload::builder(LeadEventType::LeadScored, format!("lead_{}", rng.random::<u32>()))
        .lead_name(format!("Lead {}", rng.random_range(1..10_000)))
        .email(format!("lead{}@example.com", rng.random::<u16>()))
        .phone(format!("+55119{:08}", rng.random_range(0..100_000_000)))
        .qualification(tier, score)
        .campaign_id(format!("camp_{}", rng.random_range(1..500)))
        .occurred_at(occurred_at)
        .build()
        .expect("random fixture is always valid")
}
