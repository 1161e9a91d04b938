//! Human-readable document numbers: `{PREFIX}-{YYYYMM}-{SEQ:06}`.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{Datelike, NaiveDate};

use crate::store::StoreError;

/// Monotonic per-month counter for one document prefix.
#[derive(Debug)]
pub struct DocumentNumberSequence {
    prefix: String,
    counters: Mutex<HashMap<(i32, u32), u64>>,
}

impl DocumentNumberSequence {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counters: Mutex::new(HashMap::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Next number for a document dated `on`. Counters restart every month.
    pub fn next(&self, on: NaiveDate) -> Result<String, StoreError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| StoreError::Poisoned("document number"))?;
        let seq = counters.entry((on.year(), on.month())).or_insert(0);
        *seq += 1;
        Ok(format!(
            "{}-{:04}{:02}-{:06}",
            self.prefix,
            on.year(),
            on.month(),
            seq
        ))
    }
}
