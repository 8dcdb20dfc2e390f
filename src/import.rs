use crate::checkpoint::Checkpoint;
use crate::config::{BATCH_SIZE, PROGRESS_INTERVAL};
use crate::models::{Category, ImportRecord};
use crate::parser::{parse_record, RowRejection};
use crate::stats::ImportStats;
use crate::store::ContentStore;
use crate::writer::BatchWriter;
use csv::{ErrorKind, ReaderBuilder, StringRecord};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

/// One import run over one catalog file.
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub path: PathBuf,
    /// Used for rows whose category column is empty or unknown
    pub default_category: Category,
    /// Rows skipped before parsing starts; 1 skips just the header
    pub start_line: u64,
    pub batch_size: usize,
    /// Stop after this many rows have been processed
    pub limit: Option<u64>,
    pub show_progress: bool,
}

impl ImportJob {
    /// A job that skips the header row and uses the default batch size.
    pub fn new(path: impl Into<PathBuf>, default_category: Category) -> Self {
        Self {
            path: path.into(),
            default_category,
            start_line: 1,
            batch_size: BATCH_SIZE,
            limit: None,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub path: PathBuf,
    pub default_category: Category,
    pub start_line: u64,
    /// Last row read, accepted or not
    pub last_line: u64,
    pub checkpoint: Checkpoint,
    /// Rows rejected after the last accepted row; a resume reads them again
    pub rejected_after_checkpoint: u64,
    #[serde(flatten)]
    pub stats: ImportStats,
}

impl ImportReport {
    pub fn succeeded(&self) -> u64 {
        self.stats.succeeded()
    }

    pub fn failed(&self) -> u64 {
        self.stats.failed()
    }

    /// Counters for the rows a resume from `checkpoint` will not read again.
    pub fn stats_through_checkpoint(&self) -> ImportStats {
        self.stats.without_trailing_rejects(self.rejected_after_checkpoint)
    }
}

/// The file could not be read to the end. Everything before `line` was
/// processed; `checkpoint` is where a resume should start.
#[derive(Debug, Error)]
#[error(
    "import of {} aborted after row {line} (last checkpoint {})",
    .path.display(),
    .checkpoint.line()
)]
pub struct ImportAborted {
    pub path: PathBuf,
    pub line: u64,
    pub checkpoint: Checkpoint,
    pub rejected_after_checkpoint: u64,
    pub stats: ImportStats,
    #[source]
    pub source: csv::Error,
}

impl ImportAborted {
    /// Counters for the rows a resume from `checkpoint` will not read again.
    pub fn stats_through_checkpoint(&self) -> ImportStats {
        self.stats.without_trailing_rejects(self.rejected_after_checkpoint)
    }
}

/// Streams `job.path` into `store`.
///
/// Row problems are logged and counted, never returned. Only failing to open
/// or read the file ends the run early.
pub fn run_import<S: ContentStore>(
    job: &ImportJob,
    store: S,
) -> Result<ImportReport, ImportAborted> {
    run_import_with(job, store, |_, _| {})
}

/// Like [`run_import`], calling `on_row(line, checkpoint)` after every row
/// past the skipped prefix has been parsed.
pub fn run_import_with<S, F>(
    job: &ImportJob,
    store: S,
    mut on_row: F,
) -> Result<ImportReport, ImportAborted>
where
    S: ContentStore,
    F: FnMut(u64, Checkpoint),
{
    let start = Instant::now();
    let mut stats = ImportStats::new();
    let mut checkpoint = Checkpoint::new();
    let mut rejected_after_checkpoint = 0u64;
    let mut line = 0u64;

    info!(
        file = %job.path.display(),
        start_line = job.start_line,
        category = %job.default_category,
        "Starting to import the file"
    );

    let abort = |source: csv::Error,
                 line: u64,
                 checkpoint: Checkpoint,
                 rejected_after_checkpoint: u64,
                 stats: ImportStats| {
        error!(
            file = %job.path.display(),
            line,
            error = %source,
            "Error importing file"
        );
        info!(
            line = checkpoint.line(),
            "Last successfully processed line number"
        );
        ImportAborted {
            path: job.path.clone(),
            line,
            checkpoint,
            rejected_after_checkpoint,
            stats,
            source,
        }
    };

    let file = match File::open(&job.path) {
        Ok(f) => f,
        Err(e) => return Err(abort(e.into(), line, checkpoint, 0, stats)),
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(b',')
        .quote(b'"')
        .escape(Some(b'\\'))
        .from_reader(BufReader::with_capacity(256 * 1024, file));

    let batch_size = job.batch_size.max(1);
    let mut writer = BatchWriter::new(store);
    let mut batch: Vec<ImportRecord> = Vec::with_capacity(batch_size);
    let mut row = StringRecord::new();
    let pb = make_spinner(job.show_progress);

    loop {
        if job.limit.is_some_and(|limit| stats.processed >= limit) {
            info!(limit = stats.processed, "Row limit reached");
            break;
        }

        let parsed = match reader.read_record(&mut row) {
            Ok(true) => {
                line += 1;
                if line <= job.start_line {
                    continue;
                }
                stats.inc_processed();
                let fields: Vec<&str> = row.iter().map(str::trim_start).collect();
                parse_record(&fields, job.default_category)
            }
            Ok(false) => break,
            Err(e) if matches!(e.kind(), ErrorKind::Utf8 { .. }) => {
                line += 1;
                if line <= job.start_line {
                    continue;
                }
                stats.inc_processed();
                Err(RowRejection::InvalidEncoding)
            }
            Err(e) => {
                pb.finish_and_clear();
                return Err(abort(
                    e,
                    line,
                    checkpoint,
                    rejected_after_checkpoint,
                    stats,
                ));
            }
        };

        match parsed {
            Ok(parsed) => {
                for warning in &parsed.warnings {
                    warn!(line, %warning, "Field ignored");
                }
                stats.add_field_warnings(parsed.warnings.len() as u64);
                batch.push(parsed.record);
                // Advances on read, not on commit. Resuming from it after a
                // crash skips whatever the unflushed batch held.
                checkpoint.advance(line);
                rejected_after_checkpoint = 0;
            }
            Err(rejection) => {
                stats.inc_rejected();
                rejected_after_checkpoint += 1;
                warn!(line, reason = %rejection, "Row rejected");
            }
        }
        on_row(line, checkpoint);

        if batch.len() >= batch_size {
            let outcome = writer.commit(&batch);
            stats.add_outcome(&outcome);
            batch.clear();
            info!(
                committed = stats.committed,
                checkpoint = checkpoint.line(),
                "Records imported"
            );
        }

        if stats.processed % PROGRESS_INTERVAL == 0 {
            pb.set_message(format!(
                "{} rows read, {} committed",
                stats.processed, stats.committed
            ));
            pb.tick();
        }
    }

    if !batch.is_empty() {
        let outcome = writer.commit(&batch);
        stats.add_outcome(&outcome);
        batch.clear();
    }

    pb.finish_and_clear();

    info!(
        file = %job.path.display(),
        succeeded = stats.succeeded(),
        failed = stats.failed(),
        warnings = stats.field_warnings,
        checkpoint = checkpoint.line(),
        duration_secs = start.elapsed().as_secs_f64(),
        "File import completed"
    );

    Ok(ImportReport {
        path: job.path.clone(),
        default_category: job.default_category,
        start_line: job.start_line,
        last_line: line,
        checkpoint,
        rejected_after_checkpoint,
        stats,
    })
}

fn make_spinner(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb
}
