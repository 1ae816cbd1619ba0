//! Rolling delivery analytics.
//!
//! One entry per bulk run, capped at [`WINDOW`] entries. "Last 7 days" on the
//! dashboard really means the last 7 runs: entries are evicted FIFO, not by date.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;

use crate::campaign::SendResult;

/// Number of entries kept in the log and summarized.
pub const WINDOW: usize = 7;

/// Label format for entry dates, e.g. `Sat Oct 17`.
pub const DATE_LABEL_FORMAT: &str = "%a %b %d";

/// Counts from one bulk run, labelled with the day it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsEntry {
    pub sent: u64,
    pub delivered: u64,
    pub failed: u64,
    /// Day label in [`DATE_LABEL_FORMAT`].
    pub date: String,
}

/// Aggregates over the current window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_sent: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    /// Percentage of sent messages delivered; 0 when nothing was sent.
    pub delivery_rate: f64,
    /// Percentage of sent messages failed; 0 when nothing was sent.
    pub failure_rate: f64,
}

/// Append-only log capped to the most recent [`WINDOW`] entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsLog {
    #[serde(rename = "data", deserialize_with = "last_window")]
    entries: VecDeque<AnalyticsEntry>,
}

/// Keep only the newest [`WINDOW`] entries of a decoded log.
fn last_window<'de, D>(deserializer: D) -> Result<VecDeque<AnalyticsEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut entries = VecDeque::<AnalyticsEntry>::deserialize(deserializer)?;
    let excess = entries.len().saturating_sub(WINDOW);
    entries.drain(..excess);
    Ok(entries)
}

impl AnalyticsLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a run under today's local date.
    pub fn record(&mut self, counts: &SendResult) -> &AnalyticsEntry {
        self.record_on(counts, Local::now().date_naive())
    }

    /// Record a run under `date`, evicting the oldest entry beyond the window.
    pub fn record_on(&mut self, counts: &SendResult, date: NaiveDate) -> &AnalyticsEntry {
        self.entries.push_back(AnalyticsEntry {
            sent: counts.sent,
            delivered: counts.delivered,
            failed: counts.failed,
            date: date.format(DATE_LABEL_FORMAT).to_string(),
        });
        while self.entries.len() > WINDOW {
            self.entries.pop_front();
        }
        // Just pushed, so never empty.
        &self.entries[self.entries.len() - 1]
    }

    /// Entries oldest first.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &AnalyticsEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Totals and rates over the last [`WINDOW`] entries.
    pub fn summarize(&self) -> AnalyticsSummary {
        let skip = self.entries.len().saturating_sub(WINDOW);
        let window = self.entries.iter().skip(skip);

        let (total_sent, total_delivered, total_failed) =
            window.fold((0u64, 0u64, 0u64), |(s, d, f), e| {
                (s + e.sent, d + e.delivered, f + e.failed)
            });

        let rate = |part: u64| {
            if total_sent == 0 {
                0.0
            } else {
                part as f64 * 100.0 / total_sent as f64
            }
        };

        AnalyticsSummary {
            total_sent,
            total_delivered,
            total_failed,
            delivery_rate: rate(total_delivered),
            failure_rate: rate(total_failed),
        }
    }
}
