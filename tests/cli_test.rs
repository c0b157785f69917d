//! Tests that drive the `leadhook` binary as an operator would.

use std::{path::PathBuf, process::Output};

use leadhook_core::DeliveryOutcome;
use leadhook_testing::{
    fixtures::{reference_payload, REFERENCE_SECRET},
    http::assertions::assert_signed_json,
    MockReceiver,
};
use tokio::process::Command;

const REFERENCE_SIGNATURE: &str =
    "7da7c9e26a98ce96b3e837b992c3dda4de3699543f02302e0dcde2e771fc10e4";

/// Scratch directory holding a payload file. Also used as the working
/// directory so no stray `leadhook.toml` is picked up.
struct Workdir {
    path: PathBuf,
}

impl Workdir {
    async fn with_reference_payload(name: &str) -> Self {
        let dir = format!("leadhook-cli-{}-{name}", std::process::id());
        let path = std::env::temp_dir().join(dir);
        tokio::fs::create_dir_all(&path).await.unwrap();

        let payload = serde_json::to_vec_pretty(&reference_payload()).unwrap();
        tokio::fs::write(path.join("lead.json"), payload).await.unwrap();

        Self { path }
    }

    async fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_leadhook"))
            .args(args)
            .current_dir(&self.path)
            .env_remove("LEADHOOK_WEBHOOK_SECRET")
            .env("LEADHOOK_MAX_RETRIES", "1")
            .env("LEADHOOK_INITIAL_DELAY_MS", "10")
            .env("RUST_LOG", "warn")
            .output()
            .await
            .unwrap()
    }
}

impl Drop for Workdir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

fn outcome(output: &Output) -> DeliveryOutcome {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[tokio::test]
async fn sign_prints_canonical_body_and_signature() {
    let workdir = Workdir::with_reference_payload("sign").await;

    let output =
        workdir.run(&["sign", "--payload", "lead.json", "--secret", REFERENCE_SECRET]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut lines = stdout.lines();
    assert_eq!(
        lines.next(),
        Some(
            r#"{"event_type":"lead_qualified","lead_id":"lead_123","lead_name":"Maria Silva","email":"maria@example.com","phone":"+5511987654321","qualification_tier":"hot","qualification_score":85,"campaign_id":"camp_456","timestamp":"2024-01-15T10:30:00.000Z"}"#
        )
    );
    assert_eq!(lines.next(), Some(REFERENCE_SIGNATURE));
}

#[tokio::test]
async fn send_delivers_signed_payload() {
    let workdir = Workdir::with_reference_payload("send-ok").await;
    let receiver = MockReceiver::start().await;
    receiver.respond_with_body(200, "accepted").await;

    let output = workdir
        .run(&[
            "send",
            &receiver.webhook_url(),
            "--payload",
            "lead.json",
            "--secret",
            REFERENCE_SECRET,
        ])
        .await;

    assert!(output.status.success());
    let outcome = outcome(&output);
    assert!(outcome.success);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.response.as_deref(), Some("accepted"));

    let requests = receiver.received_requests().await;
    assert_eq!(requests.len(), 1);
    assert_signed_json(&requests[0], REFERENCE_SECRET);
    assert_eq!(requests[0].signature(), Some(REFERENCE_SIGNATURE));
}

#[tokio::test]
async fn send_exits_with_failure_when_rejected() {
    let workdir = Workdir::with_reference_payload("send-rejected").await;
    let receiver = MockReceiver::start().await;
    receiver.respond_with_status(403).await;

    let output = workdir
        .run(&["send", &receiver.webhook_url(), "--payload", "lead.json", "--secret", "k"])
        .await;

    assert_eq!(output.status.code(), Some(1));
    let outcome = outcome(&output);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.last_error.as_deref(), Some("HTTP 403: Forbidden"));
}

#[tokio::test]
async fn send_uses_configured_retry_count() {
    let workdir = Workdir::with_reference_payload("send-retry").await;
    let receiver = MockReceiver::start().await;
    receiver.respond_with_status(503).await;

    let output = workdir
        .run(&["send", &receiver.webhook_url(), "--payload", "lead.json", "--secret", "k"])
        .await;

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(outcome(&output).attempts, 2);
    receiver.assert_request_count(2).await;
}

#[tokio::test]
async fn ping_reports_reachable_destination() {
    let workdir = Workdir::with_reference_payload("ping").await;
    let receiver = MockReceiver::start().await;
    receiver.respond_with_status(204).await;

    let output = workdir.run(&["ping", &receiver.webhook_url(), "--secret", "k"]).await;

    assert!(output.status.success());
    let requests = receiver.received_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].payload().campaign_id, "connectivity_test");
}

#[tokio::test]
async fn missing_secret_is_an_error() {
    let workdir = Workdir::with_reference_payload("no-secret").await;

    let output = workdir.run(&["ping", "http://127.0.0.1:9/webhook"]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no webhook secret"), "stderr: {stderr}");
}

#[tokio::test]
async fn secret_can_come_from_config_file() {
    let workdir = Workdir::with_reference_payload("config-secret").await;
    let config = format!("webhook_secret = \"{REFERENCE_SECRET}\"\n");
    tokio::fs::write(workdir.path.join("leadhook.toml"), config).await.unwrap();

    let output = workdir.run(&["sign", "--payload", "lead.json"]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().nth(1), Some(REFERENCE_SIGNATURE));
}
