//! HTTP mocking utilities for webhook testing.

use std::collections::HashMap;

use bytes::Bytes;
use leadhook_core::WebhookPayload;
use leadhook_delivery::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

/// Path every receiver listens on.
pub const WEBHOOK_PATH: &str = "/webhook";

/// Mock webhook destination.
///
/// Wraps a wiremock server listening on a random port. Requests are recorded
/// by wiremock and exposed as [`RecordedRequest`]s.
pub struct MockReceiver {
    server: MockServer,
}

impl MockReceiver {
    /// Starts a new receiver on a random port.
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    /// Base URL of the server.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Full URL of the webhook path.
    pub fn webhook_url(&self) -> String {
        format!("{}{WEBHOOK_PATH}", self.server.uri())
    }

    /// Answers every webhook POST with `status`.
    pub async fn respond_with_status(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Answers every webhook POST with `status` and `body`.
    pub async fn respond_with_body(&self, status: u16, body: impl Into<String>) {
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(body.into()))
            .mount(&self.server)
            .await;
    }

    /// Starts a sequence of responses, one per request.
    pub fn sequence(&self) -> ResponseSequence<'_> {
        ResponseSequence { server: &self.server, responses: Vec::new() }
    }

    /// Returns all requests received so far, oldest first.
    pub async fn received_requests(&self) -> Vec<RecordedRequest> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(RecordedRequest::from)
            .collect()
    }

    /// Asserts that exactly `expected` requests were received.
    pub async fn assert_request_count(&self, expected: usize) {
        let requests = self.received_requests().await;
        assert_eq!(
            requests.len(),
            expected,
            "Expected {} requests, received {}",
            expected,
            requests.len()
        );
    }
}

/// Builder for per-request response sequences.
///
/// Each queued response answers exactly one request. Once the queue is used
/// up the last response repeats.
pub struct ResponseSequence<'a> {
    server: &'a MockServer,
    responses: Vec<(u16, String)>,
}

impl ResponseSequence<'_> {
    /// Queues a response with the given status and empty body.
    #[must_use]
    pub fn then_status(mut self, status: u16) -> Self {
        self.responses.push((status, String::new()));
        self
    }

    /// Queues a response with the given status and body.
    #[must_use]
    pub fn then_respond(mut self, status: u16, body: impl Into<String>) -> Self {
        self.responses.push((status, body.into()));
        self
    }

    /// Mounts the sequence on the server.
    pub async fn mount(self) {
        // Mocks are matched in mount order; spent ones fall through.
        for (status, body) in &self.responses {
            Mock::given(method("POST"))
                .and(path(WEBHOOK_PATH))
                .respond_with(ResponseTemplate::new(*status).set_body_string(body.clone()))
                .up_to_n_times(1)
                .mount(self.server)
                .await;
        }

        if let Some((status, body)) = self.responses.last() {
            Mock::given(method("POST"))
                .and(path(WEBHOOK_PATH))
                .respond_with(ResponseTemplate::new(*status).set_body_string(body.clone()))
                .mount(self.server)
                .await;
        }
    }
}

/// A request captured by the receiver.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// URL path.
    pub path: String,
    /// Headers with lowercase names.
    pub headers: HashMap<String, String>,
    /// Raw body.
    pub body: Bytes,
}

impl RecordedRequest {
    /// Value of a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The signature header.
    pub fn signature(&self) -> Option<&str> {
        self.header(SIGNATURE_HEADER)
    }

    /// The timestamp header.
    pub fn timestamp(&self) -> Option<&str> {
        self.header(TIMESTAMP_HEADER)
    }

    /// Verifies the signature header against the raw body, as a receiver would.
    pub fn signature_valid(&self, secret: &str) -> bool {
        self.signature()
            .is_some_and(|signature| leadhook_signing::verify_body(&self.body, signature, secret))
    }

    /// Parses the body as a lead payload.
    ///
    /// # Panics
    ///
    /// Panics if the body is not a valid payload.
    pub fn payload(&self) -> WebhookPayload {
        serde_json::from_slice(&self.body).expect("request body is not a webhook payload")
    }
}

impl From<&Request> for RecordedRequest {
    fn from(request: &Request) -> Self {
        let headers = request
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        Self {
            method: request.method.to_string(),
            path: request.url.path().to_string(),
            headers,
            body: Bytes::from(request.body.clone()),
        }
    }
}

/// HTTP assertions for webhook testing.
pub mod assertions {
    use super::RecordedRequest;

    /// Asserts that a request contains the expected header.
    pub fn assert_header_present(request: &RecordedRequest, key: &str, value: &str) {
        let header_value =
            request.header(key).unwrap_or_else(|| panic!("Header '{}' not present", key));

        assert_eq!(header_value, value, "Header '{}' has unexpected value", key);
    }

    /// Asserts the headers every signed webhook must carry.
    pub fn assert_signed_json(request: &RecordedRequest, secret: &str) {
        assert_header_present(request, "content-type", "application/json");

        let signature = request.signature().expect("signature header missing");
        assert_eq!(signature.len(), 64, "signature must be 64 hex chars: {signature}");
        assert!(
            signature.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)),
            "signature must be lowercase hex: {signature}"
        );
        assert!(request.signature_valid(secret), "signature does not match body");
        assert!(request.timestamp().is_some(), "timestamp header missing");
    }
}
