//! Timed store access
//!
//! Store implementations block (sqlite, locks), so every call is moved to
//! the blocking pool and raced against `timeout`. A call that loses the
//! race keeps running on its worker thread; the caller gets
//! `StoreError::Timeout` and moves on.

use std::sync::Arc;
use std::time::Duration;

use super::{HistoryRecord, HistoryStore, StoreError, WindowSpec};
use crate::logic::ingest::Reading;
use crate::logic::model::RiskScore;

#[derive(Clone)]
pub struct TimedStore {
    inner: Arc<dyn HistoryStore>,
    timeout: Duration,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn HistoryStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn HistoryStore) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task = tokio::task::spawn_blocking(move || f(inner.as_ref()));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                log::error!("History store {} worker failed: {}", op, join_err);
                Err(StoreError::Worker(join_err.to_string()))
            }
            Err(_) => {
                log::warn!("History store {} timed out after {:?}", op, self.timeout);
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }

    pub async fn append(&self, record: HistoryRecord) -> Result<(), StoreError> {
        self.run("append", move |store| store.append(record)).await
    }

    pub async fn query_window(
        &self,
        equipment_id: &str,
        metric_name: &str,
        window: WindowSpec,
    ) -> Result<Vec<Reading>, StoreError> {
        let equipment_id = equipment_id.to_string();
        let metric_name = metric_name.to_string();
        self.run("query_window", move |store| {
            store.query_window(&equipment_id, &metric_name, &window)
        })
        .await
    }

    pub async fn latest_reading(
        &self,
        equipment_id: &str,
        metric_name: &str,
    ) -> Result<Option<Reading>, StoreError> {
        let equipment_id = equipment_id.to_string();
        let metric_name = metric_name.to_string();
        self.run("latest_reading", move |store| {
            store.latest_reading(&equipment_id, &metric_name)
        })
        .await
    }

    pub async fn recent_scores(&self, equipment_id: &str, limit: usize) -> Result<Vec<RiskScore>, StoreError> {
        let equipment_id = equipment_id.to_string();
        self.run("recent_scores", move |store| store.recent_scores(&equipment_id, limit))
            .await
    }
}
