//! HTTP API for the dashboard.
//!
//! `POST /api/email` is the single-message transport boundary: it always
//! answers `200 {"success": true}` or `500 {"error": …}`. Every other route
//! serves the persisted stores and campaign runs, with errors as
//! `{"error": …}` and a status derived from the [`MailError`] variant.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::analytics::{AnalyticsEntry, AnalyticsSummary};
use crate::campaign::{BulkSender, SendResult};
use crate::dashboard::{CampaignPlan, Dashboard};
use crate::error::MailError;
use crate::message::{parse_recipients, OutgoingMessage};
use crate::server::{OutboundServer, ServerStatus, SmtpSettings};
use crate::store::{DraftMessage, RecipientList};
use crate::throttle::Throttle;
use crate::transport::Transport;

/// Shared state for routes.
#[derive(Clone)]
pub struct AppState {
    dashboard: Arc<Mutex<Dashboard>>,
    transport: Arc<dyn Transport>,
    sender: Arc<BulkSender>,
    run: Arc<Mutex<Option<ActiveRun>>>,
}

struct ActiveRun {
    cancel: CancellationToken,
    progress: f64,
}

impl AppState {
    /// `transport` serves both `/api/email` and campaign runs.
    pub fn new(dashboard: Dashboard, transport: Arc<dyn Transport>, throttle: Throttle) -> Self {
        let sender = BulkSender::new(transport.clone()).throttle(throttle);
        Self {
            dashboard: Arc::new(Mutex::new(dashboard)),
            transport,
            sender: Arc::new(sender),
            run: Arc::new(Mutex::new(None)),
        }
    }

    /// True while a campaign run is in progress.
    pub fn is_sending(&self) -> bool {
        self.run.lock().is_some()
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/email", post(send_email))
        .route("/api/servers", get(list_servers))
        .route("/api/servers/smtp", post(add_smtp_server))
        .route("/api/servers/sendgrid", post(add_sendgrid_server))
        .route("/api/servers/{id}", delete(remove_server))
        .route("/api/servers/{id}/status", put(update_server_status))
        .route("/api/lists", get(list_lists).post(add_list))
        .route("/api/lists/{id}", put(update_list).delete(remove_list))
        .route("/api/draft", get(get_draft).put(put_draft))
        .route("/api/analytics", get(analytics))
        .route("/api/campaigns", post(run_campaign))
        .route("/api/campaigns/status", get(campaign_status))
        .route("/api/campaigns/cancel", post(cancel_campaign))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A [`MailError`] rendered as `{"error": msg}`.
#[derive(Debug)]
pub struct ApiError(MailError);

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            MailError::Validation(_)
            | MailError::NoActiveServer
            | MailError::ListNotFound(_)
            | MailError::NoSenderNames
            | MailError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            MailError::Busy => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn validation(message: &str) -> ApiError {
    ApiError(MailError::Validation(message.to_string()))
}

// ============================================================================
// Transport boundary
// ============================================================================

#[derive(Debug, Deserialize)]
struct SendEmailRequest {
    server: OutboundServer,
    options: OutgoingMessage,
}

/// POST /api/email - Send one message through the given server.
///
/// The body is decoded by hand so a malformed payload still gets the
/// `500 {"error": …}` shape rather than an extractor rejection.
async fn send_email(State(state): State<AppState>, body: Bytes) -> Response {
    let result = match serde_json::from_slice::<SendEmailRequest>(&body) {
        Ok(req) => state.transport.send(&req.server, &req.options).await,
        Err(e) => Err(MailError::from(e)),
    };

    match result {
        Ok(receipt) => {
            tracing::info!(
                provider = receipt.provider,
                message_id = %receipt.message_id,
                "Email sent"
            );
            Json(json!({ "success": true })).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to send email");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Servers
// ============================================================================

/// GET /api/servers
async fn list_servers(State(state): State<AppState>) -> Json<Vec<OutboundServer>> {
    Json(state.dashboard.lock().credentials().servers().to_vec())
}

/// POST /api/servers/smtp
async fn add_smtp_server(
    State(state): State<AppState>,
    Json(settings): Json<SmtpSettings>,
) -> ApiResult<(StatusCode, Json<OutboundServer>)> {
    if settings.host.as_deref().map_or(true, str::is_empty) {
        return Err(validation("Host is required"));
    }
    if settings.port.as_deref().map_or(true, str::is_empty) {
        return Err(validation("Port is required"));
    }
    let mut dashboard = state.dashboard.lock();
    let server = dashboard.credentials_mut().add_smtp_server(settings)?.clone();
    Ok((StatusCode::CREATED, Json(server)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendGridForm {
    #[serde(default)]
    api_key: String,
}

/// POST /api/servers/sendgrid
async fn add_sendgrid_server(
    State(state): State<AppState>,
    Json(form): Json<SendGridForm>,
) -> ApiResult<(StatusCode, Json<OutboundServer>)> {
    if form.api_key.is_empty() {
        return Err(validation("SendGrid API key is required"));
    }
    let mut dashboard = state.dashboard.lock();
    let server = dashboard
        .credentials_mut()
        .add_sendgrid_server(form.api_key)?
        .clone();
    Ok((StatusCode::CREATED, Json(server)))
}

/// DELETE /api/servers/{id}
async fn remove_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let removed = state.dashboard.lock().credentials_mut().remove_server(&id)?;
    Ok(found(removed))
}

#[derive(Debug, Deserialize)]
struct StatusForm {
    status: ServerStatus,
}

/// PUT /api/servers/{id}/status
async fn update_server_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<StatusForm>,
) -> ApiResult<StatusCode> {
    let updated = state
        .dashboard
        .lock()
        .credentials_mut()
        .update_server_status(&id, form.status)?;
    Ok(found(updated))
}

fn found(hit: bool) -> StatusCode {
    if hit {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// ============================================================================
// Lists
// ============================================================================

/// Addresses either as pasted text (one per line) or as an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmailsInput {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct ListForm {
    #[serde(default)]
    name: String,
    emails: EmailsInput,
}

impl ListForm {
    fn into_parts(self) -> ApiResult<(String, Vec<String>)> {
        if self.name.is_empty() {
            return Err(validation("List name is required"));
        }
        let emails = match self.emails {
            EmailsInput::Text(text) => parse_recipients(&text),
            EmailsInput::List(list) => parse_recipients(&list.join("\n")),
        };
        if emails.is_empty() {
            return Err(validation("Email list is required"));
        }
        Ok((self.name, emails))
    }
}

/// GET /api/lists
async fn list_lists(State(state): State<AppState>) -> Json<Vec<RecipientList>> {
    Json(state.dashboard.lock().lists().lists().to_vec())
}

/// POST /api/lists
async fn add_list(
    State(state): State<AppState>,
    Json(form): Json<ListForm>,
) -> ApiResult<(StatusCode, Json<RecipientList>)> {
    let (name, emails) = form.into_parts()?;
    let mut dashboard = state.dashboard.lock();
    let list = dashboard.lists_mut().add_list(name, emails)?.clone();
    Ok((StatusCode::CREATED, Json(list)))
}

/// PUT /api/lists/{id}
async fn update_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<ListForm>,
) -> ApiResult<StatusCode> {
    let (name, emails) = form.into_parts()?;
    let updated = state
        .dashboard
        .lock()
        .lists_mut()
        .update_list(&id, name, emails)?;
    Ok(found(updated))
}

/// DELETE /api/lists/{id}
async fn remove_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let removed = state.dashboard.lock().lists_mut().remove_list(&id)?;
    Ok(found(removed))
}

// ============================================================================
// Draft and analytics
// ============================================================================

/// GET /api/draft
async fn get_draft(State(state): State<AppState>) -> Json<DraftMessage> {
    Json(state.dashboard.lock().draft().draft().clone())
}

/// PUT /api/draft
async fn put_draft(
    State(state): State<AppState>,
    Json(draft): Json<DraftMessage>,
) -> ApiResult<StatusCode> {
    state.dashboard.lock().draft_mut().update(draft)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct AnalyticsResponse {
    entries: Vec<AnalyticsEntry>,
    summary: AnalyticsSummary,
}

/// GET /api/analytics
async fn analytics(State(state): State<AppState>) -> Json<AnalyticsResponse> {
    let dashboard = state.dashboard.lock();
    let store = dashboard.analytics();
    Json(AnalyticsResponse {
        entries: store.log().entries().cloned().collect(),
        summary: store.summarize(),
    })
}

// ============================================================================
// Campaigns
// ============================================================================

/// Clears the active run when the handler finishes, however it finishes.
struct RunSlot {
    run: Arc<Mutex<Option<ActiveRun>>>,
}

impl RunSlot {
    fn claim(run: &Arc<Mutex<Option<ActiveRun>>>) -> Result<(Self, CancellationToken), MailError> {
        let mut active = run.lock();
        if active.is_some() {
            return Err(MailError::Busy);
        }
        let cancel = CancellationToken::new();
        *active = Some(ActiveRun {
            cancel: cancel.clone(),
            progress: 0.0,
        });
        Ok((Self { run: run.clone() }, cancel))
    }
}

impl Drop for RunSlot {
    fn drop(&mut self) {
        *self.run.lock() = None;
    }
}

/// POST /api/campaigns - Run a campaign from the posted draft and return its counts.
///
/// The run itself is spawned: a client that disconnects does not stop it, and
/// its counts are still recorded. Only `/api/campaigns/cancel` ends it early.
async fn run_campaign(
    State(state): State<AppState>,
    Json(draft): Json<DraftMessage>,
) -> ApiResult<Json<SendResult>> {
    let (slot, cancel) = RunSlot::claim(&state.run)?;

    let plan = state.dashboard.lock().prepare_campaign(draft)?;

    let task = tokio::spawn(execute_campaign(state, slot, plan, cancel));
    let result = task
        .await
        .map_err(|e| MailError::SendError(format!("Campaign task failed: {e}")))??;

    Ok(Json(result))
}

/// Run `plan` and record its counts. The slot is released once recorded.
async fn execute_campaign(
    state: AppState,
    slot: RunSlot,
    plan: CampaignPlan,
    cancel: CancellationToken,
) -> Result<SendResult, MailError> {
    let run = slot.run.clone();
    let on_progress = move |progress: f64| {
        if let Some(active) = run.lock().as_mut() {
            active.progress = progress;
        }
    };
    let result = state
        .sender
        .run_with(&plan.server, &plan.request, on_progress, &cancel)
        .await?;

    state.dashboard.lock().record(&result)?;
    drop(slot);
    Ok(result)
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CampaignStatus {
    pub sending: bool,
    pub progress: f64,
}

/// GET /api/campaigns/status
async fn campaign_status(State(state): State<AppState>) -> Json<CampaignStatus> {
    let status = match state.run.lock().as_ref() {
        Some(active) => CampaignStatus {
            sending: true,
            progress: active.progress,
        },
        None => CampaignStatus {
            sending: false,
            progress: 0.0,
        },
    };
    Json(status)
}

/// POST /api/campaigns/cancel
async fn cancel_campaign(State(state): State<AppState>) -> StatusCode {
    match state.run.lock().as_ref() {
        Some(active) => {
            active.cancel.cancel();
            tracing::info!("Campaign cancellation requested");
            StatusCode::ACCEPTED
        }
        None => StatusCode::NOT_FOUND,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status() {
        assert_eq!(ApiError(MailError::NoActiveServer).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError(MailError::ListNotFound("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError(MailError::Busy).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError(MailError::Storage("disk".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_list_form() {
        let form: ListForm = serde_json::from_value(json!({
            "name": "All",
            "emails": "a@x.com\n\n b@x.com ",
        }))
        .unwrap();
        let (_, emails) = form.into_parts().unwrap();
        assert_eq!(emails, vec!["a@x.com", "b@x.com"]);

        let form: ListForm =
            serde_json::from_value(json!({"name": "All", "emails": ["a@x.com", " "]})).unwrap();
        assert_eq!(form.into_parts().unwrap().1, vec!["a@x.com"]);

        let form: ListForm =
            serde_json::from_value(json!({"name": "", "emails": "a@x.com"})).unwrap();
        assert_eq!(
            form.into_parts().unwrap_err().0.to_string(),
            "List name is required"
        );
    }
}
