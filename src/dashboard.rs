//! Campaign dashboard: the stores plus the compose-and-send flow.
//!
//! Sending a campaign from a draft goes through these checks in order, and the
//! first failure stops it before anything is sent:
//!
//! 1. draft validation ([`DraftMessage::validate`])
//! 2. an active server must exist ("Please configure an email server first")
//! 3. the selected list must exist ("Selected list not found")
//!
//! The draft is then saved, sender names are split on commas, the content is
//! wrapped in the HTML shell, and the run's counts are appended to analytics.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::analytics::AnalyticsEntry;
use crate::campaign::{BulkSender, SendResult};
use crate::error::MailError;
use crate::message::{parse_sender_names, BulkRequest};
use crate::server::OutboundServer;
use crate::store::{
    AnalyticsStore, CredentialStore, DraftMessage, DraftStore, KeyValueBackend,
    RecipientListStore,
};
use crate::template::render_campaign_html;

/// Everything needed to start a bulk run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignPlan {
    pub server: OutboundServer,
    pub request: BulkRequest,
}

/// The four persisted stores sharing one backend.
pub struct Dashboard {
    credentials: CredentialStore,
    lists: RecipientListStore,
    analytics: AnalyticsStore,
    draft: DraftStore,
}

impl Dashboard {
    /// Open on `backend`. Only the draft is restored here; call
    /// [`rehydrate`](Self::rehydrate) for the rest.
    pub fn open(backend: Arc<dyn KeyValueBackend>) -> Result<Self, MailError> {
        Ok(Self {
            credentials: CredentialStore::new(backend.clone()),
            lists: RecipientListStore::new(backend.clone()),
            analytics: AnalyticsStore::new(backend.clone()),
            draft: DraftStore::open(backend)?,
        })
    }

    /// Load servers, lists and analytics from the backend.
    pub fn rehydrate(&mut self) -> Result<(), MailError> {
        let servers = self.credentials.load()?;
        let lists = self.lists.load()?;
        let runs = self.analytics.load()?;
        tracing::info!(servers, lists, runs, "Dashboard state restored");
        Ok(())
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn credentials_mut(&mut self) -> &mut CredentialStore {
        &mut self.credentials
    }

    pub fn lists(&self) -> &RecipientListStore {
        &self.lists
    }

    pub fn lists_mut(&mut self) -> &mut RecipientListStore {
        &mut self.lists
    }

    pub fn analytics(&self) -> &AnalyticsStore {
        &self.analytics
    }

    pub fn analytics_mut(&mut self) -> &mut AnalyticsStore {
        &mut self.analytics
    }

    pub fn draft(&self) -> &DraftStore {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut DraftStore {
        &mut self.draft
    }

    /// Check `draft` and turn it into a run against the active server.
    ///
    /// The draft is saved only once it has passed every check.
    pub fn prepare_campaign(&mut self, draft: DraftMessage) -> Result<CampaignPlan, MailError> {
        draft.validate()?;

        let server = self
            .credentials
            .active_server()
            .cloned()
            .ok_or(MailError::NoActiveServer)?;

        let recipients = self
            .lists
            .get_list(&draft.selected_list)
            .map(|list| list.emails.clone())
            .ok_or_else(|| MailError::ListNotFound(draft.selected_list.clone()))?;

        self.draft.update(draft.clone())?;

        let sender_names = parse_sender_names(&draft.sender_names);
        if sender_names.is_empty() {
            return Err(MailError::NoSenderNames);
        }

        let request = BulkRequest {
            from: draft.from_email,
            sender_names,
            to: recipients,
            subject: draft.subject,
            content: render_campaign_html(&draft.content)?,
        };

        Ok(CampaignPlan { server, request })
    }

    /// Append a finished run to analytics.
    pub fn record(&mut self, result: &SendResult) -> Result<AnalyticsEntry, MailError> {
        self.analytics.record(result)
    }

    /// Prepare, run and record a campaign.
    pub async fn send_campaign<P>(
        &mut self,
        draft: DraftMessage,
        sender: &BulkSender,
        on_progress: P,
        cancel: &CancellationToken,
    ) -> Result<SendResult, MailError>
    where
        P: FnMut(f64) + Send,
    {
        let plan = self.prepare_campaign(draft)?;
        let result = sender
            .run_with(&plan.server, &plan.request, on_progress, cancel)
            .await?;
        self.record(&result)?;
        Ok(result)
    }
}
