//! Assertion helpers for [`LocalTransport`].
//!
//! # Example
//!
//! ```rust,ignore
//! use bulkmail::transport::LocalTransport;
//! use bulkmail::testing::*;
//!
//! #[tokio::test]
//! async fn test_campaign() {
//!     let transport = LocalTransport::shared();
//!
//!     // ... run a campaign through the transport ...
//!
//!     assert_sent_count(&transport, 3);
//!     assert_sent_to(&transport, "a@example.com");
//!     assert_sender_names(&transport, &["Alice", "Bob", "Alice"]);
//!     refute_sent_to(&transport, "unsubscribed@example.com");
//! }
//! ```

use crate::transport::{LocalTransport, SentMessage};

fn format_summary(messages: &[SentMessage]) -> String {
    if messages.is_empty() {
        return "  (no messages sent)".to_string();
    }

    messages
        .iter()
        .enumerate()
        .map(|(i, sent)| {
            let m = &sent.message;
            format!(
                "  {}. To: {}, From: \"{}\" <{}>, Subject: \"{}\"",
                i + 1,
                m.to,
                m.sender_name,
                m.from,
                m.subject
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assert that exactly `expected` messages were sent.
///
/// # Panics
///
/// Panics if the count doesn't match.
pub fn assert_sent_count(transport: &LocalTransport, expected: usize) {
    let messages = transport.messages();
    assert!(
        messages.len() == expected,
        "Expected {} message(s) to be sent, but {} were sent.\n\nMessages sent:\n{}",
        expected,
        messages.len(),
        format_summary(&messages)
    );
}

/// Assert that nothing was sent.
pub fn assert_nothing_sent(transport: &LocalTransport) {
    assert_sent_count(transport, 0);
}

/// Assert that a message was sent to `recipient`.
///
/// # Panics
///
/// Panics if no message went to the address.
pub fn assert_sent_to(transport: &LocalTransport, recipient: &str) {
    let messages = transport.messages();
    assert!(
        messages
            .iter()
            .any(|s| s.message.to.eq_ignore_ascii_case(recipient)),
        "Expected a message to be sent to '{}'.\n\nMessages sent:\n{}",
        recipient,
        format_summary(&messages)
    );
}

/// Assert that no message was sent to `recipient`.
///
/// # Panics
///
/// Panics if a message went to the address.
pub fn refute_sent_to(transport: &LocalTransport, recipient: &str) {
    let messages = transport.messages();
    if let Some(found) = messages
        .iter()
        .find(|s| s.message.to.eq_ignore_ascii_case(recipient))
    {
        panic!(
            "Expected no message to be sent to '{}', but found one.\n\nMatching message:\n  Subject: \"{}\"\n\nAll messages:\n{}",
            recipient,
            found.message.subject,
            format_summary(&messages)
        );
    }
}

/// Assert the sender display names of all sent messages, in send order.
///
/// # Panics
///
/// Panics if the sequence differs.
pub fn assert_sender_names(transport: &LocalTransport, expected: &[&str]) {
    let messages = transport.messages();
    let actual: Vec<&str> = messages
        .iter()
        .map(|s| s.message.sender_name.as_str())
        .collect();
    assert!(
        actual == expected,
        "Expected sender names {:?}, but got {:?}.\n\nMessages sent:\n{}",
        expected,
        actual,
        format_summary(&messages)
    );
}

/// Assert the recipients of all sent messages, in send order.
pub fn assert_recipients(transport: &LocalTransport, expected: &[&str]) {
    let messages = transport.messages();
    let actual: Vec<&str> = messages.iter().map(|s| s.message.to.as_str()).collect();
    assert!(
        actual == expected,
        "Expected recipients {:?}, but got {:?}.",
        expected,
        actual
    );
}

/// Assert the last sent message's HTML content contains `text`.
///
/// # Panics
///
/// Panics if nothing was sent or the content doesn't match.
pub fn assert_content_contains(transport: &LocalTransport, text: &str) {
    let last = get_last_message(transport);
    let content = &last.message.content;
    assert!(
        content.contains(text),
        "Expected content to contain '{}'.\n\nContent (first 500 chars):\n{}",
        text,
        content.chars().take(500).collect::<String>()
    );
}

/// The last sent message.
///
/// # Panics
///
/// Panics if nothing was sent.
pub fn get_last_message(transport: &LocalTransport) -> SentMessage {
    match transport.last_message() {
        Some(message) => message,
        None => panic!("Expected at least one message to be sent, but none were sent"),
    }
}
