use crate::writer::BatchOutcome;
use serde::{Deserialize, Serialize};

/// Counters collected while importing one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    /// Rows read after the skipped prefix
    pub processed: u64,
    /// Rows the parser refused
    pub rejected: u64,
    /// Records the store accepted
    pub committed: u64,
    /// Parsed records the store refused
    pub store_failed: u64,
    /// Fields dropped or defaulted on accepted rows
    pub field_warnings: u64,
}

impl ImportStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_processed(&mut self) {
        self.processed += 1;
    }

    pub fn inc_rejected(&mut self) {
        self.rejected += 1;
    }

    pub fn add_field_warnings(&mut self, count: u64) {
        self.field_warnings += count;
    }

    pub fn add_outcome(&mut self, outcome: &BatchOutcome) {
        self.committed += outcome.succeeded();
        self.store_failed += outcome.failed();
    }

    pub fn succeeded(&self) -> u64 {
        self.committed
    }

    pub fn failed(&self) -> u64 {
        self.rejected + self.store_failed
    }

    /// Removes `rows` trailing rejected rows from the processed and rejected
    /// counts.
    pub fn without_trailing_rejects(&self, rows: u64) -> Self {
        Self {
            processed: self.processed.saturating_sub(rows),
            rejected: self.rejected.saturating_sub(rows),
            ..*self
        }
    }

    /// Sums two runs over the same file, e.g. a partial run and its resume.
    pub fn merge(&mut self, other: &ImportStats) {
        self.processed += other.processed;
        self.rejected += other.rejected;
        self.committed += other.committed;
        self.store_failed += other.store_failed;
        self.field_warnings += other.field_warnings;
    }
}
