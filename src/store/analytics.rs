//! Persisted analytics log.

use chrono::NaiveDate;
use std::sync::Arc;

use super::{read_state, write_state, KeyValueBackend, ANALYTICS_NAMESPACE};
use crate::analytics::{AnalyticsEntry, AnalyticsLog, AnalyticsSummary};
use crate::campaign::SendResult;
use crate::error::MailError;

/// [`AnalyticsLog`] persisted under `analytics-storage`.
///
/// Starts empty; call [`load`](Self::load) to rehydrate.
pub struct AnalyticsStore {
    backend: Arc<dyn KeyValueBackend>,
    log: AnalyticsLog,
}

impl AnalyticsStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            backend,
            log: AnalyticsLog::new(),
        }
    }

    /// Replace in-memory state with the persisted one. Returns the entry count.
    pub fn load(&mut self) -> Result<usize, MailError> {
        self.log = read_state(&*self.backend, ANALYTICS_NAMESPACE)?.unwrap_or_default();
        Ok(self.log.len())
    }

    pub fn log(&self) -> &AnalyticsLog {
        &self.log
    }

    /// Append a run under today's date.
    pub fn record(&mut self, counts: &SendResult) -> Result<AnalyticsEntry, MailError> {
        let mut next = self.log.clone();
        let entry = next.record(counts).clone();
        self.commit(next)?;
        Ok(entry)
    }

    /// Append a run under `date`.
    pub fn record_on(
        &mut self,
        counts: &SendResult,
        date: NaiveDate,
    ) -> Result<AnalyticsEntry, MailError> {
        let mut next = self.log.clone();
        let entry = next.record_on(counts, date).clone();
        self.commit(next)?;
        Ok(entry)
    }

    pub fn summarize(&self) -> AnalyticsSummary {
        self.log.summarize()
    }

    /// Persist `next`, then make it the in-memory log.
    fn commit(&mut self, next: AnalyticsLog) -> Result<(), MailError> {
        write_state(&*self.backend, ANALYTICS_NAMESPACE, &next)?;
        self.log = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use serde_json::json;

    #[test]
    fn test_persisted_window() {
        let backend = MemoryBackend::shared();
        let mut store = AnalyticsStore::new(backend.clone());
        for day in 1..=9 {
            let date = NaiveDate::from_ymd_opt(2026, 10, day).unwrap();
            store.record_on(&SendResult::new(1, 1, 0), date).unwrap();
        }

        let mut reopened = AnalyticsStore::new(backend);
        assert_eq!(reopened.log().len(), 0);
        assert_eq!(reopened.load().unwrap(), 7);
        assert_eq!(reopened.log().entries().next().unwrap().date, "Sat Oct 03");
        assert_eq!(reopened.summarize().total_sent, 7);
    }

    #[test]
    fn test_oversized_persisted_log_is_trimmed() {
        let backend = MemoryBackend::shared();
        let data: Vec<_> = (1..=9)
            .map(|day| json!({"sent": day, "delivered": day, "failed": 0, "date": "Mon Oct 05"}))
            .collect();
        backend
            .save(
                ANALYTICS_NAMESPACE,
                &json!({"state": {"data": data}, "version": 0}).to_string(),
            )
            .unwrap();

        let mut store = AnalyticsStore::new(backend);
        assert_eq!(store.load().unwrap(), 7);
        assert_eq!(store.log().entries().next().unwrap().sent, 3);
        assert_eq!(store.summarize().total_sent, (3..=9).sum::<u64>());
    }
}
