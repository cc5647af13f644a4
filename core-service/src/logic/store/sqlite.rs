//! SQLite history store
//!
//! Timestamps are stored as epoch milliseconds. Rows are append-only; the
//! autoincrement id breaks ties between equal timestamps.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use super::{HistoryRecord, HistoryStore, StoreError, WindowSpec};
use crate::constants::{APP_NAME, HISTORY_DB_FILE};
use crate::logic::ingest::Reading;
use crate::logic::model::{RiskScore, ScoreStatus};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS readings (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        equipment_id  TEXT    NOT NULL,
        metric_name   TEXT    NOT NULL,
        ts_ms         INTEGER NOT NULL,
        value         REAL    NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_readings_stream
        ON readings (equipment_id, metric_name, ts_ms);

    CREATE TABLE IF NOT EXISTS risk_scores (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        equipment_id  TEXT    NOT NULL,
        metric_name   TEXT    NOT NULL,
        ts_ms         INTEGER NOT NULL,
        score         REAL    NOT NULL,
        confidence    REAL    NOT NULL,
        status        TEXT    NOT NULL,
        strategy      TEXT    NOT NULL,
        factors       TEXT    NOT NULL DEFAULT '[]',
        ttf_hours     INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_scores_equipment
        ON risk_scores (equipment_id, ts_ms);
";

/// `<data_local_dir>/maintai/history.db`
pub fn default_history_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME.to_lowercase())
        .join(HISTORY_DB_FILE)
}

pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        log::info!("Opened history database at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Backend(format!("invalid stored timestamp {}", ms)))
}

impl HistoryStore for SqliteHistoryStore {
    fn append(&self, record: HistoryRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        match record {
            HistoryRecord::Reading(r) => {
                conn.execute(
                    "INSERT INTO readings (equipment_id, metric_name, ts_ms, value) VALUES (?1, ?2, ?3, ?4)",
                    params![r.equipment_id, r.metric_name, r.timestamp.timestamp_millis(), r.value],
                )?;
            }
            HistoryRecord::Score(s) => {
                let factors = serde_json::to_string(&s.contributing_factors)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                conn.execute(
                    "INSERT INTO risk_scores
                        (equipment_id, metric_name, ts_ms, score, confidence, status, strategy, factors, ttf_hours)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        s.equipment_id,
                        s.metric_name,
                        s.timestamp.timestamp_millis(),
                        s.score,
                        s.confidence,
                        s.status.as_str(),
                        s.strategy,
                        factors,
                        s.time_to_failure_hours
                    ],
                )?;
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
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT ts_ms, value FROM readings
             WHERE equipment_id = ?1 AND metric_name = ?2 AND ts_ms >= ?3 AND ts_ms <= ?4
             ORDER BY ts_ms DESC, id DESC
             LIMIT ?5",
        )?;

        let not_before = window.not_before.map_or(i64::MIN, |nb| nb.timestamp_millis());
        let limit = i64::try_from(window.max_count).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(
                params![equipment_id, metric_name, not_before, window.until.timestamp_millis(), limit],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = rows
            .into_iter()
            .map(|(ts, value)| {
                Ok(Reading {
                    equipment_id: equipment_id.to_string(),
                    timestamp: from_millis(ts)?,
                    metric_name: metric_name.to_string(),
                    value,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        out.reverse();
        Ok(out)
    }

    fn latest_reading(&self, equipment_id: &str, metric_name: &str) -> Result<Option<Reading>, StoreError> {
        let window = WindowSpec::last(1, DateTime::<Utc>::MAX_UTC);
        Ok(self.query_window(equipment_id, metric_name, &window)?.pop())
    }

    fn recent_scores(&self, equipment_id: &str, limit: usize) -> Result<Vec<RiskScore>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT metric_name, ts_ms, score, confidence, status, strategy, factors, ttf_hours FROM risk_scores
             WHERE equipment_id = ?1
             ORDER BY ts_ms DESC, id DESC
             LIMIT ?2",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![equipment_id, limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<u32>>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(metric_name, ts, score, confidence, status, strategy, factors, ttf_hours)| {
                Ok(RiskScore {
                    equipment_id: equipment_id.to_string(),
                    metric_name,
                    timestamp: from_millis(ts)?,
                    score,
                    confidence,
                    status: ScoreStatus::parse(&status)
                        .ok_or_else(|| StoreError::Backend(format!("unknown score status '{}'", status)))?,
                    strategy,
                    contributing_factors: serde_json::from_str(&factors)
                        .map_err(|e| StoreError::Backend(format!("invalid stored factors: {}", e)))?,
                    time_to_failure_hours: ttf_hours,
                })
            })
            .collect()
    }
}
