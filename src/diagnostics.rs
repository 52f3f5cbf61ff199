//! Bounded in-memory log of pipeline failures, newest first.
//! Every record is mirrored to tracing; the buffer backs `GET /errors`.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::ERROR_LOG_CAPACITY;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
    Info,
}

impl Level {
    /// Validation failures are operator-data problems and log one step lower.
    pub fn for_error(e: &AppError) -> Self {
        match e {
            AppError::Validation(_) => Level::Warn,
            _ => Level::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub code: String,
    pub message: String,
    pub context: serde_json::Value,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LogFilter {
    pub level: Option<Level>,
    pub code: Option<String>,
}

pub struct Diagnostics {
    records: Mutex<VecDeque<ErrorRecord>>,
    capacity: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::with_capacity(ERROR_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
        }
    }

    /// Log `e` with free-form context and keep it for later inspection.
    pub fn record(&self, e: &AppError, context: serde_json::Value) -> ErrorRecord {
        let level = Level::for_error(e);
        let rec = ErrorRecord {
            timestamp: Utc::now(),
            level,
            code: e.code().to_string(),
            message: e.to_string(),
            context,
        };

        match level {
            Level::Error => error!(code = %rec.code, context = %rec.context, "{}", rec.message),
            Level::Warn => warn!(code = %rec.code, context = %rec.context, "{}", rec.message),
            Level::Info => info!(code = %rec.code, context = %rec.context, "{}", rec.message),
        }

        if let Ok(mut records) = self.records.lock() {
            records.push_front(rec.clone());
            records.truncate(self.capacity);
        }
        rec
    }

    /// Newest-first records matching `filter`, at most `limit`.
    pub fn records(&self, filter: &LogFilter, limit: usize) -> Vec<ErrorRecord> {
        let Ok(records) = self.records.lock() else {
            return Vec::new();
        };
        records
            .iter()
            .filter(|r| filter.level.map_or(true, |l| r.level == l))
            .filter(|r| filter.code.as_deref().map_or(true, |c| r.code == c))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}
