//! Single-message and bulk-run request types.

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// One message to one recipient.
///
/// Serialized with the field names the `/api/email` endpoint accepts:
/// `{"to", "from", "senderName", "subject", "content"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub from: String,
    #[serde(default)]
    pub sender_name: String,
    pub to: String,
    #[serde(default)]
    pub subject: String,
    /// HTML body.
    #[serde(default)]
    pub content: String,
}

impl OutgoingMessage {
    /// The sender as an address with display name.
    pub fn sender(&self) -> Address {
        Address::with_name(self.sender_name.as_str(), self.from.as_str())
    }

    /// The `From:` header value: `"<senderName>" <from>`.
    pub fn from_header(&self) -> String {
        self.sender().header_value()
    }
}

/// Input for one bulk run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub from: String,
    /// Display names rotated round-robin across recipients.
    pub sender_names: Vec<String>,
    pub to: Vec<String>,
    pub subject: String,
    pub content: String,
}

impl BulkRequest {
    /// Sender name for the recipient at `index`, or `None` when no names are set.
    pub fn sender_name_for(&self, index: usize) -> Option<&str> {
        if self.sender_names.is_empty() {
            return None;
        }
        Some(&self.sender_names[index % self.sender_names.len()])
    }

    /// Build the message for the recipient at `index`.
    pub fn message_for(&self, index: usize) -> Option<OutgoingMessage> {
        let to = self.to.get(index)?;
        let sender_name = self.sender_name_for(index)?;
        Some(OutgoingMessage {
            from: self.from.clone(),
            sender_name: sender_name.to_string(),
            to: to.clone(),
            subject: self.subject.clone(),
            content: self.content.clone(),
        })
    }
}

/// Split a comma-separated sender name field, trimming each name.
///
/// ```
/// use bulkmail::parse_sender_names;
///
/// assert_eq!(parse_sender_names("Alice, Bob ,Carol"), vec!["Alice", "Bob", "Carol"]);
/// assert!(parse_sender_names("   ").is_empty());
/// ```
pub fn parse_sender_names(input: &str) -> Vec<String> {
    if input.trim().is_empty() {
        return Vec::new();
    }
    input.split(',').map(|name| name.trim().to_string()).collect()
}

/// Split pasted recipient text into addresses: one per line, trimmed, blanks dropped.
///
/// Addresses are neither validated nor deduplicated.
pub fn parse_recipients(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(names: &[&str], to: &[&str]) -> BulkRequest {
        BulkRequest {
            from: "news@example.com".into(),
            sender_names: names.iter().map(|s| s.to_string()).collect(),
            to: to.iter().map(|s| s.to_string()).collect(),
            subject: "Hi".into(),
            content: "<p>Hi</p>".into(),
        }
    }

    #[test]
    fn test_round_robin_sender() {
        let req = request(&["A", "B", "C"], &[]);
        let names: Vec<_> = (0..7).map(|i| req.sender_name_for(i).unwrap()).collect();
        assert_eq!(names, ["A", "B", "C", "A", "B", "C", "A"]);
    }

    #[test]
    fn test_no_sender_names() {
        let req = request(&[], &["a@x.com"]);
        assert_eq!(req.sender_name_for(0), None);
        assert!(req.message_for(0).is_none());
    }

    #[test]
    fn test_message_for() {
        let req = request(&["Alice"], &["a@x.com", "b@x.com"]);
        let msg = req.message_for(1).unwrap();
        assert_eq!(msg.to, "b@x.com");
        assert_eq!(msg.sender_name, "Alice");
        assert_eq!(msg.from_header(), "\"Alice\" <news@example.com>");
        assert!(req.message_for(2).is_none());
    }

    #[test]
    fn test_parse_recipients() {
        let parsed = parse_recipients("a@x.com\n\n  b@x.com  \r\na@x.com\n   \n");
        assert_eq!(parsed, vec!["a@x.com", "b@x.com", "a@x.com"]);
    }

    #[test]
    fn test_parse_sender_names_keeps_inner_blanks() {
        assert_eq!(parse_sender_names("A,,B"), vec!["A", "", "B"]);
    }

    #[test]
    fn test_wire_names() {
        let msg: OutgoingMessage = serde_json::from_value(serde_json::json!({
            "to": "a@x.com",
            "from": "me@x.com",
            "senderName": "Me",
            "subject": "S",
            "content": "<b>x</b>"
        }))
        .unwrap();
        assert_eq!(msg.sender_name, "Me");
    }
}
