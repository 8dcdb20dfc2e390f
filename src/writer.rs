use crate::models::ImportRecord;
use crate::store::ContentStore;
use tracing::{error, info, warn};

/// Result of committing one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The bulk insert went through in one piece.
    AllCommitted { count: u64 },
    /// The bulk insert failed and records were saved one at a time.
    PartiallyCommitted { succeeded: u64, failed: u64 },
}

impl BatchOutcome {
    pub fn succeeded(&self) -> u64 {
        match *self {
            BatchOutcome::AllCommitted { count } => count,
            BatchOutcome::PartiallyCommitted { succeeded, .. } => succeeded,
        }
    }

    pub fn failed(&self) -> u64 {
        match *self {
            BatchOutcome::AllCommitted { .. } => 0,
            BatchOutcome::PartiallyCommitted { failed, .. } => failed,
        }
    }
}

/// Commits batches with a bulk insert, degrading to single-row inserts when
/// the bulk insert is refused so one bad row only costs itself.
pub struct BatchWriter<S> {
    store: S,
}

impl<S: ContentStore> BatchWriter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn commit(&mut self, batch: &[ImportRecord]) -> BatchOutcome {
        if batch.is_empty() {
            return BatchOutcome::AllCommitted { count: 0 };
        }

        match self.store.insert_many(batch) {
            Ok(ids) => BatchOutcome::AllCommitted {
                count: ids.len() as u64,
            },
            Err(e) => {
                error!(rows = batch.len(), error = %format!("{e:#}"), "Failed to batch save data");
                self.commit_one_by_one(batch)
            }
        }
    }

    fn commit_one_by_one(&mut self, batch: &[ImportRecord]) -> BatchOutcome {
        let mut succeeded = 0u64;
        let mut failed = 0u64;

        for record in batch {
            match self.store.insert(record) {
                Ok(_) => succeeded += 1,
                Err(e) => {
                    failed += 1;
                    warn!(title = %record.title, error = %format!("{e:#}"), "Failed to save a single record");
                }
            }
        }

        info!(
            succeeded,
            total = batch.len(),
            "Saved records in single-save mode"
        );

        BatchOutcome::PartiallyCommitted { succeeded, failed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, SourceType};
    use crate::store::MemoryStore;
    use anyhow::{bail, Result};

    fn record(title: &str) -> ImportRecord {
        ImportRecord {
            title: title.to_string(),
            other_title: None,
            country: None,
            language: None,
            description: None,
            image: None,
            release_date: None,
            genre: None,
            category: Category::TvShow,
            source_type: SourceType::OfficialData,
            creator_id: None,
        }
    }

    /// Refuses any record titled "poison", the way a constraint would.
    #[derive(Default)]
    struct PickyStore {
        inner: MemoryStore,
        bulk_attempts: u32,
    }

    impl ContentStore for PickyStore {
        fn insert(&mut self, record: &ImportRecord) -> Result<i64> {
            if record.title == "poison" {
                bail!("constraint violated");
            }
            self.inner.insert(record)
        }

        fn insert_many(&mut self, records: &[ImportRecord]) -> Result<Vec<i64>> {
            self.bulk_attempts += 1;
            if records.iter().any(|r| r.title == "poison") {
                bail!("constraint violated");
            }
            self.inner.insert_many(records)
        }
    }

    #[test]
    fn clean_batch_commits_in_bulk() {
        let mut writer = BatchWriter::new(PickyStore::default());
        let batch: Vec<_> = (0..5).map(|i| record(&format!("show {i}"))).collect();

        let outcome = writer.commit(&batch);

        assert_eq!(outcome, BatchOutcome::AllCommitted { count: 5 });
        assert_eq!(writer.store().inner.len(), 5);
        assert_eq!(writer.store().bulk_attempts, 1);
    }

    #[test]
    fn one_bad_row_does_not_sink_the_batch() {
        let mut writer = BatchWriter::new(PickyStore::default());
        let mut batch: Vec<_> = (0..10).map(|i| record(&format!("show {i}"))).collect();
        batch.insert(4, record("poison"));

        let outcome = writer.commit(&batch);

        assert_eq!(
            outcome,
            BatchOutcome::PartiallyCommitted {
                succeeded: 10,
                failed: 1
            }
        );
        assert_eq!(outcome.succeeded(), 10);
        assert_eq!(outcome.failed(), 1);
        let store = writer.into_inner();
        assert_eq!(store.inner.len(), 10);
        assert!(store.inner.records().iter().all(|r| r.title != "poison"));
    }

    #[test]
    fn all_bad_rows_are_counted() {
        let mut writer = BatchWriter::new(PickyStore::default());
        let batch = vec![record("poison"), record("poison")];

        let outcome = writer.commit(&batch);

        assert_eq!(outcome.succeeded(), 0);
        assert_eq!(outcome.failed(), 2);
    }

    #[test]
    fn empty_batch_skips_the_store() {
        let mut writer = BatchWriter::new(PickyStore::default());
        assert_eq!(writer.commit(&[]), BatchOutcome::AllCommitted { count: 0 });
        assert_eq!(writer.store().bulk_attempts, 0);
    }
}
