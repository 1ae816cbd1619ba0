//! Named recipient lists.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{read_state, write_state, KeyValueBackend, LISTS_NAMESPACE};
use crate::error::MailError;

/// A named list of recipient addresses.
///
/// Addresses are stored as entered: not validated, not deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientList {
    pub id: String,
    pub name: String,
    pub emails: Vec<String>,
    /// Day the list was created.
    pub created: NaiveDate,
}

#[derive(Serialize)]
struct StateRef<'a> {
    lists: &'a [RecipientList],
}

#[derive(Deserialize, Default)]
struct State {
    #[serde(default)]
    lists: Vec<RecipientList>,
}

/// Recipient lists in insertion order, persisted under `email-list-storage`.
///
/// Starts empty; call [`load`](Self::load) to rehydrate.
pub struct RecipientListStore {
    backend: Arc<dyn KeyValueBackend>,
    lists: Vec<RecipientList>,
}

impl RecipientListStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            backend,
            lists: Vec::new(),
        }
    }

    /// Replace in-memory state with the persisted one. Returns the list count.
    pub fn load(&mut self) -> Result<usize, MailError> {
        let state: State = read_state(&*self.backend, LISTS_NAMESPACE)?.unwrap_or_default();
        self.lists = state.lists;
        Ok(self.lists.len())
    }

    pub fn lists(&self) -> &[RecipientList] {
        &self.lists
    }

    pub fn get_list(&self, id: &str) -> Option<&RecipientList> {
        self.lists.iter().find(|l| l.id == id)
    }

    /// Add a list created today, by the same local calendar as analytics labels.
    pub fn add_list(
        &mut self,
        name: impl Into<String>,
        emails: Vec<String>,
    ) -> Result<&RecipientList, MailError> {
        let list = RecipientList {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            emails,
            created: Local::now().date_naive(),
        };
        tracing::info!(list_id = %list.id, recipients = list.emails.len(), "List added");
        let mut next = self.lists.clone();
        next.push(list);
        self.commit(next)?;
        let index = self.lists.len() - 1;
        Ok(&self.lists[index])
    }

    /// Replace a list's name and addresses. Returns false if no list matched.
    pub fn update_list(
        &mut self,
        id: &str,
        name: impl Into<String>,
        emails: Vec<String>,
    ) -> Result<bool, MailError> {
        let mut next = self.lists.clone();
        let Some(list) = next.iter_mut().find(|l| l.id == id) else {
            return Ok(false);
        };
        list.name = name.into();
        list.emails = emails;
        self.commit(next)?;
        Ok(true)
    }

    /// Remove by id. Returns false if no list matched.
    pub fn remove_list(&mut self, id: &str) -> Result<bool, MailError> {
        let mut next = self.lists.clone();
        next.retain(|l| l.id != id);
        if next.len() == self.lists.len() {
            return Ok(false);
        }
        self.commit(next)?;
        Ok(true)
    }

    /// Persist `next`, then make it the in-memory state.
    fn commit(&mut self, next: Vec<RecipientList>) -> Result<(), MailError> {
        write_state(&*self.backend, LISTS_NAMESPACE, &StateRef { lists: &next })?;
        self.lists = next;
        Ok(())
    }
}
