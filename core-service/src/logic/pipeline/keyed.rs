//! Per-equipment serialization
//!
//! Every equipment gets one async mutex, held for the whole pipeline run of
//! a reading. The guarded `StreamCursor` caches the last accepted reading
//! of each of the equipment's streams so the order check does not need a
//! store round-trip per reading.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::logic::ingest::Reading;

#[derive(Debug, Default)]
pub struct StreamCursor {
    /// metric → last accepted reading; `Some(None)` means "seeded, empty"
    last: HashMap<String, Option<Reading>>,
}

impl StreamCursor {
    /// `None` when the stream has not been seeded from the store yet
    pub fn last(&self, metric_name: &str) -> Option<Option<&Reading>> {
        self.last.get(metric_name).map(Option::as_ref)
    }

    pub fn record(&mut self, reading: Reading) {
        self.last.insert(reading.metric_name.clone(), Some(reading));
    }

    /// Drop cached state; the next reading re-seeds from the store
    pub fn forget(&mut self, metric_name: &str) {
        self.last.remove(metric_name);
    }
}

#[derive(Default)]
pub struct EquipmentLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<StreamCursor>>>>,
}

impl EquipmentLocks {
    pub fn cursor(&self, equipment_id: &str) -> Arc<tokio::sync::Mutex<StreamCursor>> {
        let mut map = self.inner.lock();
        match map.get(equipment_id) {
            Some(cursor) => Arc::clone(cursor),
            None => {
                let cursor = Arc::new(tokio::sync::Mutex::new(StreamCursor::default()));
                map.insert(equipment_id.to_string(), Arc::clone(&cursor));
                cursor
            }
        }
    }
}
