//! Import checkpoints.
//!
//! [`Checkpoint`] is the in-run value: the last row accepted by the parser.
//! It moves forward before the batch holding that row is committed, so after a
//! crash it can be a few rows ahead of what the store actually holds.
//!
//! [`ResumeState`] is the optional on-disk copy a runner keeps next to the
//! input file so a later `resume` knows where to start.

use crate::config::{RESUME_STATE_VERSION, RESUME_SUFFIX};
use crate::stats::ImportStats;
use anyhow::{Context, Result};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Last row number (1-based, header is row 1) accepted by the parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Checkpoint(u64);

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(line: u64) -> Self {
        Self(line)
    }

    pub fn line(&self) -> u64 {
        self.0
    }

    /// Moves to `line`. Never moves backwards.
    pub fn advance(&mut self, line: u64) {
        debug_assert!(line >= self.0, "checkpoint moved backwards");
        self.0 = self.0.max(line);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeState {
    pub version: u32,
    pub input_path: String,
    pub input_mtime: u64,
    pub checkpoint: Checkpoint,
    pub stats: ImportStats,
}

impl ResumeState {
    /// Rows a resumed run skips. The header is always skipped, even when no
    /// row was accepted before the interruption.
    pub fn start_line(&self) -> u64 {
        self.checkpoint.line().max(1)
    }
}

pub fn resume_state_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(RESUME_SUFFIX);
    PathBuf::from(name)
}

fn get_input_mtime(input: &Path) -> Result<u64> {
    let metadata = fs::metadata(input)
        .with_context(|| format!("Failed to get metadata for: {}", input.display()))?;
    let mtime = metadata
        .modified()
        .context("Failed to get modification time")?
        .duration_since(SystemTime::UNIX_EPOCH)
        .context("Invalid modification time")?
        .as_nanos();
    Ok(u64::try_from(mtime).unwrap_or(u64::MAX))
}

/// Loads the resume state for `input`, or `None` if missing, stale or corrupt.
pub fn load_if_valid(input: &Path) -> Result<Option<ResumeState>> {
    let path = resume_state_path(input);

    if !path.exists() {
        return Ok(None);
    }

    let file_size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    let file = File::open(&path).context("Failed to open resume state file")?;
    let reader = BufReader::new(file);

    let options = bincode::options().with_limit(file_size.saturating_add(1024));

    let state: ResumeState = match options.deserialize_from(reader) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "Resume state file is corrupt or unreadable");
            return Ok(None);
        }
    };

    if state.version != RESUME_STATE_VERSION {
        info!(
            cached = state.version,
            current = RESUME_STATE_VERSION,
            "Resume state version mismatch"
        );
        return Ok(None);
    }

    let input_path = input.to_string_lossy();
    if state.input_path != input_path {
        info!(
            cached = state.input_path,
            current = %input_path,
            "Resume state input path mismatch"
        );
        return Ok(None);
    }

    let current_mtime = get_input_mtime(input)?;
    if state.input_mtime != current_mtime {
        info!(
            cached_mtime = state.input_mtime,
            current_mtime = current_mtime,
            "Input file has changed since resume state was saved"
        );
        return Ok(None);
    }

    info!(
        line = state.checkpoint.line(),
        committed = state.stats.committed,
        "Loaded valid resume state"
    );

    Ok(Some(state))
}

/// Writes the resume state through a temp file and an atomic rename.
pub fn save(input: &Path, checkpoint: Checkpoint, stats: &ImportStats) -> Result<()> {
    let path = resume_state_path(input);
    let state = ResumeState {
        version: RESUME_STATE_VERSION,
        input_path: input.to_string_lossy().into_owned(),
        input_mtime: get_input_mtime(input)?,
        checkpoint,
        stats: *stats,
    };

    let tmp_path = path.with_extension("resume.tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp resume file: {:?}", tmp_path))?;
    let writer = BufWriter::new(file);

    bincode::options()
        .serialize_into(writer, &state)
        .context("Failed to serialize resume state")?;

    fs::rename(&tmp_path, &path)
        .with_context(|| format!("Failed to rename temp resume file: {:?}", path))?;

    debug!(line = checkpoint.line(), "Resume state saved");

    Ok(())
}

pub fn clear(input: &Path) -> Result<()> {
    let path = resume_state_path(input);
    if path.exists() {
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove resume state file: {:?}", path))?;
        info!("Resume state cleared");
    }
    Ok(())
}
