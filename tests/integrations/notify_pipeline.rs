//! End-to-end tests for the notification endpoint.

#[path = "../helpers/mod.rs"]
mod helpers;

use anyhow::Result;
use helpers::{
    app::TestAppBuilder,
    mock_directory::{MockDirectory, PanickingDirectory},
    mock_provider::MockProvider,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn intrusion_event() -> Value {
    json!({
        "record": {
            "device_id": "cam-1",
            "event_type": "Intrusion",
            "location_name": "Garage",
            "image_ref": "https://x/y.jpg"
        }
    })
}

#[tokio::test]
async fn test_event_is_sent_to_every_usable_address() -> Result<()> {
    let directory = Arc::new(MockDirectory::with_emails(&[
        Some("a@x.com"),
        None,
        Some("b@x.com"),
    ]));
    let provider = Arc::new(MockProvider::new());
    let app = TestAppBuilder::new()
        .with_directory(directory)
        .with_provider(provider.clone())
        .build()
        .await?;

    let (status, body) = app.post_event(&intrusion_event()).await?;

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "data": { "id": "mock-1" } }));
    let sent = provider.sent_emails();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["a@x.com".to_string(), "b@x.com".to_string()]);
    assert!(sent[0].subject.contains("Intrusion"));
    assert!(sent[0].subject.contains("Garage"));
    assert!(sent[0].html.contains("https://x/y.jpg"));

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_no_usable_addresses_is_success() -> Result<()> {
    let provider = Arc::new(MockProvider::new());
    let app = TestAppBuilder::new()
        .with_directory(Arc::new(MockDirectory::with_emails(&[None, Some("")])))
        .with_provider(provider.clone())
        .build()
        .await?;

    let (status, body) = app.post_event(&intrusion_event()).await?;

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "message": "No users to notify." }));
    assert!(provider.sent_emails().is_empty());

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_malformed_bodies_are_rejected() -> Result<()> {
    let directory = Arc::new(MockDirectory::with_emails(&[Some("a@x.com")]));
    let provider = Arc::new(MockProvider::new());
    let app = TestAppBuilder::new()
        .with_directory(directory.clone())
        .with_provider(provider.clone())
        .build()
        .await?;

    let (status, body) = app.post_event(&json!({ "device_id": "cam-1" })).await?;
    assert_eq!(status, 500);
    let message = body["error"].as_str().unwrap_or_default();
    assert!(message.contains("Malformed event payload"), "got: {}", message);
    assert!(message.contains("record"), "got: {}", message);

    let (status, body) = app.post_raw("definitely not json").await?;
    assert_eq!(status, 500);
    assert!(body["error"].as_str().unwrap_or_default().contains("Malformed event payload"));

    assert_eq!(directory.query_count(), 0);
    assert!(provider.sent_emails().is_empty());

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_oversized_body_is_a_malformed_payload() -> Result<()> {
    let directory = Arc::new(MockDirectory::with_emails(&[Some("a@x.com")]));
    let app = TestAppBuilder::new()
        .with_directory(directory.clone())
        .with_provider(Arc::new(MockProvider::new()))
        .build()
        .await?;

    let huge = json!({ "record": { "device_id": "x".repeat(3 * 1024 * 1024) } });
    let (status, body) = app.post_event(&huge).await?;

    assert_eq!(status, 500);
    let message = body["error"].as_str().unwrap_or_default();
    assert!(message.starts_with("Malformed event payload"), "got: {}", message);
    assert_eq!(directory.query_count(), 0);

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_numeric_device_id_is_accepted() -> Result<()> {
    let provider = Arc::new(MockProvider::new());
    let app = TestAppBuilder::new()
        .with_directory(Arc::new(MockDirectory::with_emails(&[Some("a@x.com")])))
        .with_provider(provider.clone())
        .build()
        .await?;

    let event = json!({ "record": { "device_id": 42, "event_type": "Motion", "location_name": "Porch" } });
    let (status, _) = app.post_event(&event).await?;

    assert_eq!(status, 200);
    let sent = provider.sent_emails();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].html.contains("<strong>42</strong>"));

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_panicking_collaborator_is_unexpected_and_server_survives() -> Result<()> {
    let provider = Arc::new(MockProvider::new());
    let app = TestAppBuilder::new()
        .with_directory(Arc::new(PanickingDirectory))
        .with_provider(provider.clone())
        .build()
        .await?;

    let (status, body) = app.post_event(&intrusion_event()).await?;

    assert_eq!(status, 500);
    let message = body["error"].as_str().unwrap_or_default();
    assert!(message.starts_with("Unexpected error: "), "got: {}", message);
    assert!(message.contains("panicked"), "got: {}", message);
    assert!(provider.sent_emails().is_empty());

    // The listener keeps serving after the failed invocation.
    let health = app.get("/healthz").await?;
    assert_eq!(health.status().as_u16(), 200);
    let (status, _) = app.post_event(&intrusion_event()).await?;
    assert_eq!(status, 500);

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_inner_fields_may_be_missing() -> Result<()> {
    let provider = Arc::new(MockProvider::new());
    let app = TestAppBuilder::new()
        .with_directory(Arc::new(MockDirectory::with_emails(&[Some("a@x.com")])))
        .with_provider(provider.clone())
        .build()
        .await?;

    let (status, _) = app.post_event(&json!({ "record": {} })).await?;

    assert_eq!(status, 200);
    assert_eq!(provider.sent_emails().len(), 1);

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_directory_failure_never_dispatches() -> Result<()> {
    let provider = Arc::new(MockProvider::new());
    let app = TestAppBuilder::new()
        .with_directory(Arc::new(MockDirectory::unavailable("connection refused")))
        .with_provider(provider.clone())
        .build()
        .await?;

    let (status, body) = app.post_event(&intrusion_event()).await?;

    assert_eq!(status, 500);
    assert_eq!(
        body,
        json!({ "error": "Failed to fetch profiles: connection refused" })
    );
    assert!(provider.sent_emails().is_empty());

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_provider_error_detail_is_surfaced() -> Result<()> {
    let detail = r#"{"statusCode":403,"name":"validation_error","message":"You can only send testing emails to your own email address."}"#;
    let app = TestAppBuilder::new()
        .with_directory(Arc::new(MockDirectory::with_emails(&[Some("a@x.com")])))
        .with_provider(Arc::new(MockProvider::rejecting(detail)))
        .build()
        .await?;

    let (status, body) = app.post_event(&intrusion_event()).await?;

    assert_eq!(status, 500);
    assert_eq!(body["error"], detail);

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_missing_api_key_is_reported_per_invocation() -> Result<()> {
    let directory = Arc::new(MockDirectory::with_emails(&[Some("a@x.com")]));
    let app = TestAppBuilder::new()
        .with_config_modifier(|config| config.provider.api_key = None)
        .with_directory(directory.clone())
        .with_provider(Arc::new(MockProvider::new()))
        .build()
        .await?;

    let (status, body) = app.post_event(&intrusion_event()).await?;

    assert_eq!(status, 500);
    assert!(body["error"].as_str().unwrap_or_default().contains("RESEND_API_KEY"));
    assert_eq!(directory.query_count(), 0);

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_same_event_twice_sends_twice() -> Result<()> {
    let provider = Arc::new(MockProvider::new());
    let app = TestAppBuilder::new()
        .with_directory(Arc::new(MockDirectory::with_emails(&[Some("a@x.com")])))
        .with_provider(provider.clone())
        .build()
        .await?;

    let (first, _) = app.post_event(&intrusion_event()).await?;
    let (second, _) = app.post_event(&intrusion_event()).await?;

    // Invocations are not deduplicated.
    assert_eq!((first, second), (200, 200));
    assert_eq!(provider.sent_emails().len(), 2);

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_real_clients_against_mock_services() -> Result<()> {
    // Arrange: one server plays both the directory and the provider.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("select", "email"))
        .and(header("apikey", "service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "email": "a@x.com" },
            { "email": null },
            { "email": "b@x.com" }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "49a3999c" })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let app = TestAppBuilder::new()
        .with_config_modifier(move |config| {
            config.provider.api_key = Some("re_live".to_string());
            config.provider.api_url = uri.clone();
            config.provider.sender = "Alerts <alerts@example.com>".to_string();
            config.directory.url = uri;
            config.directory.service_key = "service-key".to_string();
        })
        .build()
        .await?;

    // Act
    let (status, body) = app.post_event(&intrusion_event()).await?;

    // Assert
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "data": { "id": "49a3999c" } }));

    let requests: Vec<Request> = server.received_requests().await.unwrap_or_default();
    let submission = requests
        .iter()
        .find(|r| r.url.path() == "/emails")
        .expect("no submission reached the provider");
    let sent: Value = serde_json::from_slice(&submission.body)?;
    assert_eq!(sent["to"], json!(["a@x.com", "b@x.com"]));
    assert_eq!(sent["from"], "Alerts <alerts@example.com>");

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_unreachable_directory_is_500() -> Result<()> {
    let app = TestAppBuilder::new()
        .with_config_modifier(|config| {
            // Nothing listens on port 9 locally.
            config.directory.url = "http://127.0.0.1:9".to_string();
            config.directory.timeout_seconds = 2;
        })
        .with_provider(Arc::new(MockProvider::new()))
        .build()
        .await?;

    let (status, body) = app.post_event(&intrusion_event()).await?;

    assert_eq!(status, 500);
    assert!(body["error"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Failed to fetch profiles:"));

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_recipient_cap_splits_submissions() -> Result<()> {
    let provider = Arc::new(MockProvider::new());
    let app = TestAppBuilder::new()
        .with_config_modifier(|config| config.provider.max_recipients_per_message = Some(2))
        .with_directory(Arc::new(MockDirectory::with_emails(&[
            Some("a@x.com"),
            Some("b@x.com"),
            Some("c@x.com"),
        ])))
        .with_provider(provider.clone())
        .build()
        .await?;

    let (status, body) = app.post_event(&intrusion_event()).await?;

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "data": [{ "id": "mock-1" }, { "id": "mock-2" }] }));
    let batches: Vec<Vec<String>> = provider.sent_emails().into_iter().map(|e| e.to).collect();
    assert_eq!(
        batches,
        vec![
            vec!["a@x.com".to_string(), "b@x.com".to_string()],
            vec!["c@x.com".to_string()]
        ]
    );

    app.shutdown(Duration::from_secs(1)).await
}

#[tokio::test]
async fn test_health_and_metrics_routes() -> Result<()> {
    let app = TestAppBuilder::new()
        .with_directory(Arc::new(MockDirectory::with_emails(&[])))
        .with_provider(Arc::new(MockProvider::new()))
        .build()
        .await?;

    let health = app.get("/healthz").await?;
    assert_eq!(health.status().as_u16(), 200);
    assert_eq!(health.text().await?, "ok");

    // Metrics are disabled by default, so the route is not mounted.
    let metrics = app.get("/metrics").await?;
    assert_eq!(metrics.status().as_u16(), 404);

    app.shutdown(Duration::from_secs(1)).await
}
