//! HTTP client for webhook delivery.
//!
//! Builds the outbound POST with the signature and timestamp headers and
//! turns the response into a [`DeliveryResponse`]. Any HTTP status is a
//! successful exchange at this layer; classification happens in the engine.

use std::time::{Duration, Instant};

use bytes::Bytes;
use leadhook_core::DeliveryId;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};

use crate::{
    error::{DeliveryError, Result},
    transport::{Transport, TransportFuture},
};

/// Header carrying the hex HMAC-SHA256 of the body.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Header carrying the send time of the attempt.
pub const TIMESTAMP_HEADER: &str = "X-Webhook-Timestamp";

/// Response bodies above this size are truncated before being kept.
const MAX_RESPONSE_BODY_SIZE: usize = 64 * 1024;

/// Configuration for the webhook delivery client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client-wide default timeout. Each request's own `timeout` replaces it.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Maximum number of redirects to follow.
    pub max_redirects: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("leadhook/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 3,
        }
    }
}

/// One signed POST to a webhook destination.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    /// Delivery this attempt belongs to.
    pub delivery_id: DeliveryId,
    /// Destination URL.
    pub url: String,
    /// Canonical JSON body, identical across attempts.
    pub body: Bytes,
    /// Lowercase hex signature of `body`.
    pub signature: String,
    /// RFC 3339 send time for this attempt.
    pub timestamp: String,
    /// Attempt number (1-based).
    pub attempt_number: u32,
    /// Time budget for this attempt.
    pub timeout: Duration,
}

/// Response from a webhook delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response body, lossily decoded and size-limited.
    pub body: String,
    /// Total duration of the request.
    pub duration: Duration,
}

impl DeliveryResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// reqwest-backed transport.
///
/// Cheap to clone; clones share one connection pool, which is safe for
/// concurrent deliveries.
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl DeliveryClient {
    /// Creates a new delivery client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the HTTP client cannot
    /// be configured with the provided settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
            .build()
            .map_err(|e| {
                DeliveryError::configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// Creates a new delivery client with default configuration.
    ///
    /// # Errors
    ///
    /// See [`DeliveryClient::new`].
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends one signed request.
    ///
    /// # Errors
    ///
    /// - `Timeout` when the request's `timeout` elapses
    /// - `NetworkError` for connection failures and other transport errors
    pub async fn deliver(&self, request: &DeliveryRequest) -> Result<DeliveryResponse> {
        let start_time = Instant::now();

        let span = info_span!(
            "webhook_delivery",
            delivery_id = %request.delivery_id,
            url = %request.url,
            attempt = request.attempt_number
        );

        async move {
            tracing::debug!(body_bytes = request.body.len(), "sending webhook");

            let result = self
                .client
                .post(&request.url)
                .timeout(request.timeout)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .header(SIGNATURE_HEADER, &request.signature)
                .header(TIMESTAMP_HEADER, &request.timestamp)
                .body(request.body.clone())
                .send()
                .await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    let duration = start_time.elapsed();
                    tracing::warn!(duration_ms = duration.as_millis(), "request failed: {}", e);

                    if e.is_timeout() {
                        return Err(DeliveryError::timeout(request.timeout));
                    }
                    if e.is_connect() {
                        return Err(DeliveryError::network(format!("connection failed: {e}")));
                    }
                    return Err(DeliveryError::network(e.to_string()));
                },
            };

            let delivery_response = read_response(response, start_time).await;

            tracing::debug!(
                status = delivery_response.status_code,
                duration_ms = delivery_response.duration.as_millis(),
                "received response"
            );

            Ok(delivery_response)
        }
        .instrument(span)
        .await
    }
}

impl Transport for DeliveryClient {
    fn post<'a>(&'a self, request: &'a DeliveryRequest) -> TransportFuture<'a> {
        Box::pin(self.deliver(request))
    }
}

async fn read_response(response: Response, start_time: Instant) -> DeliveryResponse {
    let status_code = response.status().as_u16();

    let body = match response.bytes().await {
        Ok(bytes) if bytes.len() > MAX_RESPONSE_BODY_SIZE => {
            let truncated = String::from_utf8_lossy(&bytes[..MAX_RESPONSE_BODY_SIZE]);
            format!("{truncated}... (truncated)")
        },
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!("failed to read response body: {}", e);
            String::new()
        },
    };

    DeliveryResponse { status_code, body, duration: start_time.elapsed() }
}

#[cfg(test)]
mod tests {
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;

    fn create_test_request(url: String) -> DeliveryRequest {
        DeliveryRequest {
            delivery_id: DeliveryId::new(),
            url,
            body: Bytes::from_static(br#"{"event_type":"lead_created"}"#),
            signature: "ab".repeat(32),
            timestamp: "2024-01-15T10:30:00.000Z".to_string(),
            attempt_number: 1,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn successful_delivery() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/webhook"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .mount(&mock_server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let request = create_test_request(format!("{}/webhook", mock_server.uri()));

        let response = client.deliver(&request).await.unwrap();
        assert_eq!(response.status_code, 200);
        assert!(response.is_success());
        assert_eq!(response.body, "OK");
    }

    #[tokio::test]
    async fn error_statuses_are_returned_not_raised() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&mock_server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let request = create_test_request(format!("{}/webhook", mock_server.uri()));

        let response = client.deliver(&request).await.unwrap();
        assert_eq!(response.status_code, 404);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn signed_headers_sent() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::header("content-type", "application/json"))
            .and(matchers::header(SIGNATURE_HEADER, "ab".repeat(32).as_str()))
            .and(matchers::header(TIMESTAMP_HEADER, "2024-01-15T10:30:00.000Z"))
            .and(matchers::body_string(r#"{"event_type":"lead_created"}"#))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let request = create_test_request(mock_server.uri());

        let response = client.deliver(&request).await.unwrap();
        assert_eq!(response.status_code, 204);
    }

    #[tokio::test]
    async fn user_agent_identifies_client() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::header("user-agent", "custom-agent/2"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config =
            ClientConfig { user_agent: "custom-agent/2".to_string(), ..Default::default() };
        let client = DeliveryClient::new(config).unwrap();

        client.deliver(&create_test_request(mock_server.uri())).await.unwrap();
    }

    #[tokio::test]
    async fn slow_destination_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&mock_server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let mut request = create_test_request(mock_server.uri());
        request.timeout = Duration::from_millis(100);

        let error = client.deliver(&request).await.unwrap_err();
        assert_eq!(error, DeliveryError::Timeout { timeout_ms: 100 });
    }

    #[tokio::test]
    async fn request_budget_overrides_client_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&mock_server)
            .await;

        let config = ClientConfig { timeout: Duration::from_millis(50), ..ClientConfig::default() };
        let client = DeliveryClient::new(config).unwrap();
        let mut request = create_test_request(mock_server.uri());
        request.timeout = Duration::from_millis(200);

        let error = client.deliver(&request).await.unwrap_err();
        assert_eq!(error, DeliveryError::Timeout { timeout_ms: 200 });
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let client = DeliveryClient::with_defaults().unwrap();
        let request = create_test_request("http://127.0.0.1:1/webhook".to_string());

        let error = client.deliver(&request).await.unwrap_err();
        assert!(matches!(error, DeliveryError::NetworkError { .. }));
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn large_bodies_truncated() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(100_000)))
            .mount(&mock_server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let response = client.deliver(&create_test_request(mock_server.uri())).await.unwrap();

        assert!(response.body.ends_with("... (truncated)"));
        assert!(response.body.len() < 100_000);
    }
}
