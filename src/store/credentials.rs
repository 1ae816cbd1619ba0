//! Configured outbound servers.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{read_state, write_state, KeyValueBackend, SERVERS_NAMESPACE};
use crate::error::MailError;
use crate::server::{OutboundServer, ServerStatus, SmtpSettings};

#[derive(Serialize)]
struct StateRef<'a> {
    servers: &'a [OutboundServer],
}

#[derive(Deserialize, Default)]
struct State {
    #[serde(default)]
    servers: Vec<OutboundServer>,
}

/// Servers in insertion order, persisted under `smtp-server-storage`.
///
/// Starts empty; call [`load`](Self::load) to rehydrate.
pub struct CredentialStore {
    backend: Arc<dyn KeyValueBackend>,
    servers: Vec<OutboundServer>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            backend,
            servers: Vec::new(),
        }
    }

    /// Replace in-memory state with the persisted one. Returns the server count.
    pub fn load(&mut self) -> Result<usize, MailError> {
        let state: State = read_state(&*self.backend, SERVERS_NAMESPACE)?.unwrap_or_default();
        self.servers = state.servers;
        Ok(self.servers.len())
    }

    pub fn servers(&self) -> &[OutboundServer] {
        &self.servers
    }

    pub fn get(&self, id: &str) -> Option<&OutboundServer> {
        self.servers.iter().find(|s| s.id == id)
    }

    /// Add an SMTP server. Root servers are forced onto port 25.
    pub fn add_smtp_server(
        &mut self,
        settings: SmtpSettings,
    ) -> Result<&OutboundServer, MailError> {
        let settings = if settings.is_root_server {
            settings.root_server()
        } else {
            settings
        };
        self.push(OutboundServer::smtp(settings))
    }

    pub fn add_sendgrid_server(
        &mut self,
        api_key: impl Into<String>,
    ) -> Result<&OutboundServer, MailError> {
        self.push(OutboundServer::sendgrid(api_key))
    }

    /// Remove by id. Returns false if no server matched.
    pub fn remove_server(&mut self, id: &str) -> Result<bool, MailError> {
        let mut next = self.servers.clone();
        next.retain(|s| s.id != id);
        if next.len() == self.servers.len() {
            return Ok(false);
        }
        self.commit(next)?;
        Ok(true)
    }

    /// Set a server's status. Returns false if no server matched.
    pub fn update_server_status(
        &mut self,
        id: &str,
        status: ServerStatus,
    ) -> Result<bool, MailError> {
        let mut next = self.servers.clone();
        let Some(server) = next.iter_mut().find(|s| s.id == id) else {
            return Ok(false);
        };
        server.status = status;
        self.commit(next)?;
        Ok(true)
    }

    /// The first `Active` server in insertion order.
    pub fn active_server(&self) -> Option<&OutboundServer> {
        let mut active = self.servers.iter().filter(|s| s.is_active());
        let first = active.next()?;
        let others = active.count();
        if others > 0 {
            tracing::warn!(
                server_id = %first.id,
                others,
                "Multiple active servers configured, using the first"
            );
        }
        Some(first)
    }

    fn push(&mut self, server: OutboundServer) -> Result<&OutboundServer, MailError> {
        tracing::info!(
            server_id = %server.id,
            provider = server.provider_name(),
            "Server added"
        );
        let mut next = self.servers.clone();
        next.push(server);
        self.commit(next)?;
        let index = self.servers.len() - 1;
        Ok(&self.servers[index])
    }

    /// Persist `next`, then make it the in-memory state.
    fn commit(&mut self, next: Vec<OutboundServer>) -> Result<(), MailError> {
        write_state(
            &*self.backend,
            SERVERS_NAMESPACE,
            &StateRef { servers: &next },
        )?;
        self.servers = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerKind;
    use crate::store::MemoryBackend;

    fn store() -> (Arc<MemoryBackend>, CredentialStore) {
        let backend = MemoryBackend::shared();
        (backend.clone(), CredentialStore::new(backend))
    }

    #[test]
    fn test_root_server_forces_port_25() {
        let (_, mut store) = store();
        let mut settings = SmtpSettings::new("relay.local", "2525");
        settings.is_root_server = true;

        let server = store.add_smtp_server(settings).unwrap();
        let ServerKind::Smtp(smtp) = &server.kind else {
            panic!("expected smtp");
        };
        assert_eq!(smtp.port.as_deref(), Some("25"));
        assert_eq!(server.status, ServerStatus::Active);
    }

    #[test]
    fn test_active_server_is_first_active() {
        let (_, mut store) = store();
        let first = store.add_sendgrid_server("SG.one").unwrap().id.clone();
        let second = store
            .add_smtp_server(SmtpSettings::new("smtp.x.com", "587"))
            .unwrap()
            .id
            .clone();

        assert_eq!(store.active_server().unwrap().id, first);

        store
            .update_server_status(&first, ServerStatus::Disabled)
            .unwrap();
        assert_eq!(store.active_server().unwrap().id, second);

        store
            .update_server_status(&second, ServerStatus::Failed)
            .unwrap();
        assert!(store.active_server().is_none());
    }

    #[test]
    fn test_unknown_ids() {
        let (_, mut store) = store();
        assert!(!store.remove_server("nope").unwrap());
        assert!(!store
            .update_server_status("nope", ServerStatus::Active)
            .unwrap());
    }

    #[test]
    fn test_write_through_and_explicit_load() {
        let (backend, mut store) = store();
        let id = store.add_sendgrid_server("SG.key").unwrap().id.clone();

        let mut reopened = CredentialStore::new(backend.clone());
        assert!(reopened.servers().is_empty());
        assert_eq!(reopened.load().unwrap(), 1);
        assert_eq!(reopened.servers()[0].id, id);

        assert!(store.remove_server(&id).unwrap());
        assert_eq!(reopened.load().unwrap(), 0);
    }
}
