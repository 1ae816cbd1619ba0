//! SendGrid transport tests.

use bulkmail::transport::{Dispatcher, SendGridSender};
use bulkmail::{
    deliver, MailError, OutboundServer, OutgoingMessage, SendGridSettings, ServerKind, Transport,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

fn message() -> OutgoingMessage {
    OutgoingMessage {
        from: "tony.stark@example.com".into(),
        sender_name: "Tony Stark".into(),
        to: "steve.rogers@example.com".into(),
        subject: "Hello, Avengers!".into(),
        content: "<h1>Hello</h1>".into(),
    }
}

fn dispatcher(server: &MockServer) -> Dispatcher {
    Dispatcher::new().with_sendgrid(SendGridSender::new().base_url(server.uri()))
}

fn success_response() -> ResponseTemplate {
    ResponseTemplate::new(202).insert_header("X-Message-Id", "123-xyz")
}

// ============================================================================
// Delivery
// ============================================================================

#[tokio::test]
async fn successful_delivery_returns_message_id() {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .and(header("Authorization", "Bearer SG.test-api-key"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "personalizations": [{"to": [{"email": "steve.rogers@example.com"}]}],
            "from": {"email": "tony.stark@example.com", "name": "Tony Stark"},
            "subject": "Hello, Avengers!",
            "content": [{"type": "text/html", "value": "<h1>Hello</h1>"}]
        })))
        .respond_with(success_response())
        .expect(1)
        .mount(&mock)
        .await;

    let receipt = dispatcher(&mock)
        .send(&OutboundServer::sendgrid("SG.test-api-key"), &message())
        .await
        .unwrap();

    assert_eq!(receipt.message_id, "123-xyz");
    assert_eq!(receipt.provider, "sendgrid");
}

#[tokio::test]
async fn empty_api_key_makes_no_request() {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(success_response())
        .expect(0)
        .mount(&mock)
        .await;

    let server = OutboundServer::sendgrid("");
    let err = dispatcher(&mock).send(&server, &message()).await.unwrap_err();
    assert_eq!(err.to_string(), "SendGrid API key is required");

    let missing = OutboundServer {
        kind: ServerKind::SendGrid(SendGridSettings { api_key: None }),
        ..server
    };
    assert!(!deliver(&dispatcher(&mock), &missing, &message()).await);
}

#[tokio::test]
async fn provider_error_includes_status_and_messages() {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [
                {"message": "The provided authorization grant is invalid, expired, or revoked", "field": null}
            ]
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let err = dispatcher(&mock)
        .send(&OutboundServer::sendgrid("SG.bad"), &message())
        .await
        .unwrap_err();

    match err {
        MailError::ProviderError { provider, message, status } => {
            assert_eq!(provider, "sendgrid");
            assert_eq!(status, Some(401));
            assert!(message.contains("authorization grant is invalid"));
        }
        other => panic!("expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn unparseable_error_body_still_fails() {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&mock)
        .await;

    let delivered = deliver(
        &dispatcher(&mock),
        &OutboundServer::sendgrid("SG.key"),
        &message(),
    )
    .await;
    assert!(!delivered);
}

#[tokio::test]
async fn compressed_request_sets_content_encoding() {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .and(header("Content-Encoding", "gzip"))
        .respond_with(success_response())
        .expect(1)
        .mount(&mock)
        .await;

    let dispatcher = Dispatcher::new()
        .with_sendgrid(SendGridSender::new().base_url(mock.uri()).compress(true));
    assert!(dispatcher
        .send(&OutboundServer::sendgrid("SG.key"), &message())
        .await
        .is_ok());
}
