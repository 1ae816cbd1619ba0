//! SMTP transport tests that stop before any connection is made.

use std::time::Duration;

use bulkmail::transport::{Dispatcher, SmtpSender};
use bulkmail::{OutboundServer, OutgoingMessage, SmtpSettings, Transport};

fn message() -> OutgoingMessage {
    OutgoingMessage {
        from: "news@example.com".into(),
        sender_name: "Alice".into(),
        to: "bob@example.com".into(),
        subject: "Hi".into(),
        content: "<p>Hi</p>".into(),
    }
}

#[tokio::test]
async fn missing_port_is_a_configuration_error() {
    let settings = SmtpSettings {
        host: Some("smtp.example.com".into()),
        ..Default::default()
    };

    let err = SmtpSender::new()
        .timeout(Duration::from_secs(1))
        .send(&settings, &message())
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(err.to_string(), "SMTP host and port are required");
}

#[tokio::test]
async fn invalid_port_is_a_configuration_error() {
    let server = OutboundServer::smtp(SmtpSettings::new("smtp.example.com", "smtp"));

    let err = Dispatcher::new().send(&server, &message()).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid SMTP port: smtp");
}
