//! Lead event payloads and delivery outcomes.
//!
//! `WebhookPayload` is the record sent to a client's webhook. Its field
//! declaration order is the canonical JSON key order used for signing, so
//! fields must never be reordered. `DeliveryOutcome` is what a delivery call
//! hands back to its caller once every attempt has been made.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Highest qualification score a lead can carry.
pub const MAX_QUALIFICATION_SCORE: u8 = 100;

/// Strongly-typed identifier for one logical delivery (all of its attempts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryId(pub Uuid);

impl DeliveryId {
    /// Creates a new random delivery ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DeliveryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of lead event being announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadEventType {
    /// Lead passed qualification.
    LeadQualified,
    /// Lead received a new score.
    LeadScored,
    /// Lead was captured for the first time.
    LeadCreated,
}

impl LeadEventType {
    /// Returns the wire name of the event type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LeadQualified => "lead_qualified",
            Self::LeadScored => "lead_scored",
            Self::LeadCreated => "lead_created",
        }
    }
}

impl fmt::Display for LeadEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualification tier assigned to a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualificationTier {
    /// Ready for immediate sales contact.
    Hot,
    /// Interested, needs nurturing.
    Warm,
    /// Low intent.
    Cold,
}

impl fmt::Display for QualificationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hot => write!(f, "hot"),
            Self::Warm => write!(f, "warm"),
            Self::Cold => write!(f, "cold"),
        }
    }
}

/// A lead event delivered to an external webhook.
///
/// The serialized form of this struct is both the request body and the
/// signature input. Serde emits fields in declaration order, which makes the
/// encoding deterministic across runs and across implementations that follow
/// the same key order.
///
/// # Example
///
/// ```
/// use leadhook_core::models::{LeadEventType, QualificationTier, WebhookPayload};
///
/// let payload = WebhookPayload::builder(LeadEventType::LeadQualified, "lead_123")
///     .lead_name("Maria Silva")
///     .email("maria@example.com")
///     .phone("+5511987654321")
///     .qualification(QualificationTier::Hot, 85)
///     .campaign_id("camp_456")
///     .timestamp("2024-01-15T10:30:00.000Z")
///     .build()
///     .expect("valid payload");
///
/// assert_eq!(payload.qualification_score, 85);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Kind of event.
    pub event_type: LeadEventType,
    /// Identifier of the lead in the platform.
    pub lead_id: String,
    /// Display name of the lead.
    pub lead_name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone, already formatted for the destination.
    pub phone: String,
    /// Qualification tier.
    pub qualification_tier: QualificationTier,
    /// Qualification score between 0 and 100.
    pub qualification_score: u8,
    /// Campaign the lead came from.
    pub campaign_id: String,
    /// When the event occurred, ISO-8601.
    pub timestamp: String,
}

impl WebhookPayload {
    /// Starts building a payload for the given event and lead.
    pub fn builder(event_type: LeadEventType, lead_id: impl Into<String>) -> WebhookPayloadBuilder {
        WebhookPayloadBuilder::new(event_type, lead_id)
    }

    /// Synthetic payload used to check that an endpoint is reachable.
    pub fn connectivity_probe(now: DateTime<Utc>) -> Self {
        Self {
            event_type: LeadEventType::LeadQualified,
            lead_id: format!("test_{}", now.timestamp_millis()),
            lead_name: "Test Lead".to_string(),
            email: "test@example.com".to_string(),
            phone: "+15555550100".to_string(),
            qualification_tier: QualificationTier::Hot,
            qualification_score: MAX_QUALIFICATION_SCORE,
            campaign_id: "connectivity_test".to_string(),
            timestamp: format_timestamp(now),
        }
    }

    /// Checks field-level invariants.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::MissingField` for an empty `lead_id` or
    /// `timestamp`, and `CoreError::InvalidInput` for a score above 100.
    pub fn validate(&self) -> Result<()> {
        if self.lead_id.trim().is_empty() {
            return Err(CoreError::MissingField("lead_id"));
        }
        if self.timestamp.trim().is_empty() {
            return Err(CoreError::MissingField("timestamp"));
        }
        if self.qualification_score > MAX_QUALIFICATION_SCORE {
            return Err(CoreError::InvalidInput(format!(
                "qualification_score {} exceeds {MAX_QUALIFICATION_SCORE}",
                self.qualification_score
            )));
        }
        Ok(())
    }
}

/// Formats a timestamp as RFC 3339 with millisecond precision and a `Z`
/// suffix, e.g. `2024-01-15T10:30:00.000Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builder for [`WebhookPayload`].
#[derive(Debug, Clone)]
pub struct WebhookPayloadBuilder {
    event_type: LeadEventType,
    lead_id: String,
    lead_name: String,
    email: String,
    phone: String,
    qualification_tier: QualificationTier,
    qualification_score: u8,
    campaign_id: String,
    timestamp: Option<String>,
}

impl WebhookPayloadBuilder {
    fn new(event_type: LeadEventType, lead_id: impl Into<String>) -> Self {
        Self {
            event_type,
            lead_id: lead_id.into(),
            lead_name: String::new(),
            email: String::new(),
            phone: String::new(),
            qualification_tier: QualificationTier::Cold,
            qualification_score: 0,
            campaign_id: String::new(),
            timestamp: None,
        }
    }

    /// Sets the lead's display name.
    #[must_use]
    pub fn lead_name(mut self, name: impl Into<String>) -> Self {
        self.lead_name = name.into();
        self
    }

    /// Sets the contact email.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Sets the contact phone.
    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    /// Sets tier and score together.
    #[must_use]
    pub fn qualification(mut self, tier: QualificationTier, score: u8) -> Self {
        self.qualification_tier = tier;
        self.qualification_score = score;
        self
    }

    /// Sets the campaign identifier.
    #[must_use]
    pub fn campaign_id(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = campaign_id.into();
        self
    }

    /// Sets the event timestamp verbatim.
    #[must_use]
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Sets the event timestamp from a UTC time.
    #[must_use]
    pub fn occurred_at(self, at: DateTime<Utc>) -> Self {
        self.timestamp(format_timestamp(at))
    }

    /// Builds and validates the payload.
    ///
    /// # Errors
    ///
    /// Returns the first invariant violated, see [`WebhookPayload::validate`].
    pub fn build(self) -> Result<WebhookPayload> {
        let timestamp = self.timestamp.ok_or(CoreError::MissingField("timestamp"))?;
        let payload = WebhookPayload {
            event_type: self.event_type,
            lead_id: self.lead_id,
            lead_name: self.lead_name,
            email: self.email,
            phone: self.phone,
            qualification_tier: self.qualification_tier,
            qualification_score: self.qualification_score,
            campaign_id: self.campaign_id,
            timestamp,
        };
        payload.validate()?;
        Ok(payload)
    }
}

/// Result of one delivery call, covering the initial try and all retries.
///
/// `response` is only present on success and `last_error` only on failure.
/// `attempts` counts attempts started and is never zero: a call cancelled
/// before its first request still reports one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    /// Whether the destination accepted the event with a 2xx response.
    pub success: bool,
    /// Response body returned by the destination on success.
    pub response: Option<String>,
    /// Number of attempts started, including the final one. At least 1.
    pub attempts: u32,
    /// Description of the last failure.
    pub last_error: Option<String>,
    /// Last HTTP status received, if the destination answered at all.
    pub status_code: Option<u16>,
}

impl DeliveryOutcome {
    /// Creates a successful outcome.
    pub fn delivered(response: impl Into<String>, attempts: u32, status_code: u16) -> Self {
        debug_assert!(attempts >= 1, "a delivered outcome implies at least one attempt");
        Self {
            success: true,
            response: Some(response.into()),
            attempts,
            last_error: None,
            status_code: Some(status_code),
        }
    }

    /// Creates a failed outcome.
    pub fn failed(attempts: u32, last_error: impl Into<String>, status_code: Option<u16>) -> Self {
        debug_assert!(attempts >= 1, "a failed outcome implies at least one attempt");
        Self {
            success: false,
            response: None,
            attempts,
            last_error: Some(last_error.into()),
            status_code,
        }
    }
}
