//! The `From:` identity of a campaign message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A sender mailbox: the rotated display name plus the campaign's from address.
///
/// ```
/// use bulkmail::Address;
///
/// let sender = Address::with_name("Alice", "news@example.com");
/// assert_eq!(sender.header_value(), "\"Alice\" <news@example.com>");
///
/// let bare = Address::with_name("", "news@example.com");
/// assert_eq!(bare.header_value(), "news@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: Option<String>,
    pub email: String,
}

impl Address {
    /// An empty name means no display name.
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: (!name.is_empty()).then_some(name),
            email: email.into(),
        }
    }

    /// Header form, quoting the display name.
    pub fn header_value(&self) -> String {
        match &self.name {
            Some(name) => format!("\"{}\" <{}>", quote(name), self.email),
            None => self.email.clone(),
        }
    }
}

fn quote(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_value())
    }
}
