//! In-memory history store
//!
//! Bounded per stream: once a stream holds `retention` readings the oldest
//! is evicted. Used by tests, the replay tool and servers without
//! `HISTORY_DB_PATH`.

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;

use super::{HistoryRecord, HistoryStore, StoreError, WindowSpec};
use crate::constants::DEFAULT_MEMORY_RETENTION;
use crate::logic::ingest::Reading;
use crate::logic::model::RiskScore;

type StreamKey = (String, String);

pub struct MemoryHistoryStore {
    readings: RwLock<HashMap<StreamKey, VecDeque<Reading>>>,
    scores: RwLock<HashMap<String, VecDeque<RiskScore>>>,
    retention: usize,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_MEMORY_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            readings: RwLock::new(HashMap::new()),
            scores: RwLock::new(HashMap::new()),
            retention: retention.max(1),
        }
    }

    /// Total readings held, across all streams
    pub fn reading_count(&self) -> usize {
        self.readings.read().values().map(VecDeque::len).sum()
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&self, record: HistoryRecord) -> Result<(), StoreError> {
        match record {
            HistoryRecord::Reading(reading) => {
                let mut readings = self.readings.write();
                let stream = readings
                    .entry((reading.equipment_id.clone(), reading.metric_name.clone()))
                    .or_default();

                // Keep ascending order even if a caller appends late
                let pos = stream.partition_point(|r| r.timestamp <= reading.timestamp);
                stream.insert(pos, reading);
                while stream.len() > self.retention {
                    stream.pop_front();
                }
            }
            HistoryRecord::Score(score) => {
                let mut scores = self.scores.write();
                let history = scores.entry(score.equipment_id.clone()).or_default();
                history.push_back(score);
                while history.len() > self.retention {
                    history.pop_front();
                }
            }
        }
        Ok(())
    }

    fn query_window(
        &self,
        equipment_id: &str,
        metric_name: &str,
        window: &WindowSpec,
    ) -> Result<Vec<Reading>, StoreError> {
        let readings = self.readings.read();
        let Some(stream) = readings.get(&(equipment_id.to_string(), metric_name.to_string())) else {
            return Ok(Vec::new());
        };

        let mut out: Vec<Reading> = stream
            .iter()
            .rev()
            .filter(|r| window.admits(r.timestamp))
            .take(window.max_count)
            .cloned()
            .collect();
        out.reverse();
        Ok(out)
    }

    fn latest_reading(&self, equipment_id: &str, metric_name: &str) -> Result<Option<Reading>, StoreError> {
        Ok(self
            .readings
            .read()
            .get(&(equipment_id.to_string(), metric_name.to_string()))
            .and_then(|stream| stream.back().cloned()))
    }

    fn recent_scores(&self, equipment_id: &str, limit: usize) -> Result<Vec<RiskScore>, StoreError> {
        Ok(self
            .scores
            .read()
            .get(equipment_id)
            .map(|history| history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
