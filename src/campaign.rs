//! Bulk send orchestration.
//!
//! A run walks the recipient list in order, one awaited send at a time:
//!
//! 1. pick the sender name round-robin (`sender_names[i % K]`)
//! 2. count the attempt as sent, then deliver
//! 3. count delivered or failed
//! 4. report progress `(i + 1) / N * 100`
//! 5. stop if cancelled, otherwise pause for the throttle interval
//!
//! A failed recipient never aborts the run.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::MailError;
use crate::message::BulkRequest;
use crate::server::OutboundServer;
use crate::throttle::Throttle;
use crate::transport::{self, Transport};

/// Counters for one bulk run.
///
/// `delivered + failed == sent` always holds. For a run that was not cancelled,
/// `sent` equals the number of recipients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResult {
    pub sent: u64,
    pub delivered: u64,
    pub failed: u64,
    /// Set when the run was stopped by its cancellation token.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl SendResult {
    pub fn new(sent: u64, delivered: u64, failed: u64) -> Self {
        Self {
            sent,
            delivered,
            failed,
            cancelled: false,
        }
    }
}

/// Progress as a percentage of recipients processed.
pub fn progress_percent(processed: usize, total: usize) -> f64 {
    processed as f64 / total as f64 * 100.0
}

/// Sends a [`BulkRequest`] through a transport, one recipient at a time.
pub struct BulkSender {
    transport: Arc<dyn Transport>,
    throttle: Throttle,
}

impl BulkSender {
    /// Create with the default 200 ms throttle.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            throttle: Throttle::default(),
        }
    }

    /// Set the pacing between sends.
    pub fn throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// The transport used for each send.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Run to completion without progress reporting.
    pub async fn run(
        &self,
        server: &OutboundServer,
        request: &BulkRequest,
    ) -> Result<SendResult, MailError> {
        self.run_with(server, request, |_| {}, &CancellationToken::new())
            .await
    }

    /// Run, reporting progress after each recipient and honoring `cancel`
    /// between recipients.
    ///
    /// Fails only when `request.sender_names` is empty; that check happens
    /// before anything is sent.
    pub async fn run_with<P>(
        &self,
        server: &OutboundServer,
        request: &BulkRequest,
        mut on_progress: P,
        cancel: &CancellationToken,
    ) -> Result<SendResult, MailError>
    where
        P: FnMut(f64) + Send,
    {
        if request.sender_names.is_empty() {
            return Err(MailError::NoSenderNames);
        }

        let provider = server.provider_name();
        let total = request.to.len();
        let span = tracing::info_span!("bulkmail.run", provider, recipients = total);

        async move {
            #[cfg(feature = "metrics")]
            metrics::counter!("bulkmail_runs_total", "provider" => provider).increment(1);

            let mut result = SendResult::default();

            for index in 0..total {
                let Some(message) = request.message_for(index) else {
                    break;
                };
                let last = index + 1 == total;

                result.sent += 1;

                if transport::deliver(&*self.transport, server, &message).await {
                    result.delivered += 1;
                } else {
                    result.failed += 1;
                }

                on_progress(progress_percent(index + 1, total));

                if !last && cancel.is_cancelled() {
                    result.cancelled = true;
                    break;
                }
                if self.throttle.pauses_after(index, total) && !self.throttle.pause(cancel).await {
                    result.cancelled = !last;
                    break;
                }
            }

            if result.cancelled {
                tracing::warn!(
                    sent = result.sent,
                    delivered = result.delivered,
                    failed = result.failed,
                    remaining = total as u64 - result.sent,
                    "Bulk run cancelled"
                );
            } else {
                tracing::info!(
                    sent = result.sent,
                    delivered = result.delivered,
                    failed = result.failed,
                    "Bulk run finished"
                );
            }

            Ok(result)
        }
        .instrument(span)
        .await
    }
}
