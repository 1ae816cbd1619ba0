//! The campaign draft being composed.

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{read_state, write_state, KeyValueBackend, DRAFT_NAMESPACE};
use crate::error::MailError;

/// Draft fields as entered in the composer.
///
/// `sender_names` is the raw comma-separated text, `selected_list` a list id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftMessage {
    pub sender_names: String,
    pub from_email: String,
    pub subject: String,
    pub content: String,
    pub selected_list: String,
}

impl DraftMessage {
    /// Check the draft can start a campaign. Fields are checked in form order
    /// and the first failure is returned.
    pub fn validate(&self) -> Result<(), MailError> {
        let fail = |msg: &str| Err(MailError::Validation(msg.to_string()));

        if self.sender_names.is_empty() {
            return fail("At least one sender name is required");
        }
        if !EmailAddress::is_valid(&self.from_email) {
            return fail("Valid email is required");
        }
        if self.subject.is_empty() {
            return fail("Subject is required");
        }
        if self.content.is_empty() {
            return fail("Content is required");
        }
        if self.selected_list.is_empty() {
            return fail("Please select a recipient list");
        }
        Ok(())
    }
}

/// [`DraftMessage`] persisted under `email-storage`.
///
/// Unlike the other stores, the draft rehydrates when opened.
pub struct DraftStore {
    backend: Arc<dyn KeyValueBackend>,
    draft: DraftMessage,
}

impl DraftStore {
    /// Open the store, restoring any persisted draft.
    pub fn open(backend: Arc<dyn KeyValueBackend>) -> Result<Self, MailError> {
        let draft = read_state(&*backend, DRAFT_NAMESPACE)?.unwrap_or_default();
        Ok(Self { backend, draft })
    }

    pub fn draft(&self) -> &DraftMessage {
        &self.draft
    }

    pub fn set_sender_names(&mut self, names: impl Into<String>) -> Result<(), MailError> {
        self.update(DraftMessage {
            sender_names: names.into(),
            ..self.draft.clone()
        })
    }

    pub fn set_from_email(&mut self, email: impl Into<String>) -> Result<(), MailError> {
        self.update(DraftMessage {
            from_email: email.into(),
            ..self.draft.clone()
        })
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> Result<(), MailError> {
        self.update(DraftMessage {
            subject: subject.into(),
            ..self.draft.clone()
        })
    }

    pub fn set_content(&mut self, content: impl Into<String>) -> Result<(), MailError> {
        self.update(DraftMessage {
            content: content.into(),
            ..self.draft.clone()
        })
    }

    pub fn set_selected_list(&mut self, list_id: impl Into<String>) -> Result<(), MailError> {
        self.update(DraftMessage {
            selected_list: list_id.into(),
            ..self.draft.clone()
        })
    }

    /// Overwrite every field at once. Memory is only updated once the
    /// draft has been saved.
    pub fn update(&mut self, draft: DraftMessage) -> Result<(), MailError> {
        write_state(&*self.backend, DRAFT_NAMESPACE, &draft)?;
        self.draft = draft;
        Ok(())
    }

    /// Clear every field and drop the persisted draft.
    pub fn reset(&mut self) -> Result<(), MailError> {
        self.backend.remove(DRAFT_NAMESPACE)?;
        self.draft = DraftMessage::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;

    fn complete() -> DraftMessage {
        DraftMessage {
            sender_names: "Alice, Bob".into(),
            from_email: "news@example.com".into(),
            subject: "Launch".into(),
            content: "<p>Hello</p>".into(),
            selected_list: "list-1".into(),
        }
    }

    #[test]
    fn test_validate_messages() {
        assert!(complete().validate().is_ok());

        let cases = [
            (
                DraftMessage {
                    sender_names: String::new(),
                    ..complete()
                },
                "At least one sender name is required",
            ),
            (
                DraftMessage {
                    from_email: "nope".into(),
                    ..complete()
                },
                "Valid email is required",
            ),
            (
                DraftMessage {
                    subject: String::new(),
                    ..complete()
                },
                "Subject is required",
            ),
            (
                DraftMessage {
                    content: String::new(),
                    ..complete()
                },
                "Content is required",
            ),
            (
                DraftMessage {
                    selected_list: String::new(),
                    ..complete()
                },
                "Please select a recipient list",
            ),
        ];
        for (draft, expected) in cases {
            assert_eq!(draft.validate().unwrap_err().to_string(), expected);
        }
    }

    #[test]
    fn test_open_rehydrates() {
        let backend = MemoryBackend::shared();
        let mut store = DraftStore::open(backend.clone()).unwrap();
        assert_eq!(store.draft(), &DraftMessage::default());

        store.set_subject("Launch").unwrap();
        store.set_sender_names("Alice").unwrap();

        let reopened = DraftStore::open(backend.clone()).unwrap();
        assert_eq!(reopened.draft().subject, "Launch");
        assert_eq!(reopened.draft().sender_names, "Alice");

        store.reset().unwrap();
        assert_eq!(store.draft(), &DraftMessage::default());
        assert_eq!(backend.load(DRAFT_NAMESPACE).unwrap(), None);
        let reopened = DraftStore::open(backend).unwrap();
        assert_eq!(reopened.draft(), &DraftMessage::default());
    }

    #[test]
    fn test_wire_names() {
        let value = serde_json::to_value(complete()).unwrap();
        assert_eq!(value["senderNames"], "Alice, Bob");
        assert_eq!(value["fromEmail"], "news@example.com");
        assert_eq!(value["selectedList"], "list-1");
    }
}
