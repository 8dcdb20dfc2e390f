//! Quote repair pass for catalog files with broken quoting.
//!
//! Physical lines are glued back into logical CSV rows while a quoted span is
//! open, i.e. while the running count of `"` characters is odd. A file that
//! ends inside a quoted span gets a closing quote appended to its last row.
//! This is a structural repair only; it cannot tell a stray quote from a real
//! one.

use crate::config::REPAIRED_SUFFIX;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    Balanced,
    InsideQuotedSpan,
}

impl QuoteState {
    fn toggle(self) -> Self {
        match self {
            QuoteState::Balanced => QuoteState::InsideQuotedSpan,
            QuoteState::InsideQuotedSpan => QuoteState::Balanced,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairStats {
    pub physical_lines: u64,
    pub logical_lines: u64,
    /// Logical lines that were assembled from more than one physical line
    pub merged_lines: u64,
    /// Whether a closing quote had to be appended at end of file
    pub force_closed: bool,
}

/// Path the repaired copy of `input` is written to (`<input>.fixed`).
pub fn repaired_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(REPAIRED_SUFFIX);
    PathBuf::from(name)
}

/// Repairs `input` into `<input>.fixed` and returns the output path.
pub fn repair(input: &Path) -> Result<PathBuf> {
    let output = repaired_path(input);
    repair_to(input, &output)?;
    Ok(output)
}

/// Repairs `input` into `output`. The input is never modified.
///
/// Output is staged in a temporary sibling and renamed into place only after
/// everything was written, so a failed pass never leaves a file under
/// `output` that looks complete.
pub fn repair_to(input: &Path, output: &Path) -> Result<RepairStats> {
    let file = File::open(input)
        .with_context(|| format!("Failed to open file for repair: {}", input.display()))?;
    let reader = BufReader::with_capacity(256 * 1024, file);

    let tmp_path = tmp_path_for(output);
    let tmp = File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp output: {}", tmp_path.display()))?;
    let mut writer = BufWriter::with_capacity(256 * 1024, tmp);

    let stats = match repair_stream(reader, &mut writer).and_then(|stats| {
        writer
            .flush()
            .context("Failed to flush repaired output")?;
        Ok(stats)
    }) {
        Ok(stats) => stats,
        Err(e) => {
            drop(writer);
            let _ = fs::remove_file(&tmp_path);
            return Err(e.context(format!("CSV repair failed: {}", input.display())));
        }
    };
    drop(writer);

    fs::rename(&tmp_path, output)
        .with_context(|| format!("Failed to move repaired file into place: {}", output.display()))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        physical = stats.physical_lines,
        logical = stats.logical_lines,
        merged = stats.merged_lines,
        force_closed = stats.force_closed,
        "CSV file repair completed"
    );

    Ok(stats)
}

/// Runs the line reassembly state machine from `reader` into `writer`.
///
/// Works on raw bytes so rows with broken encoding pass through unchanged.
/// `\n` and `\r\n` both terminate a physical line; output always uses `\n`.
pub fn repair_stream<R: BufRead, W: Write>(mut reader: R, writer: &mut W) -> Result<RepairStats> {
    let mut stats = RepairStats::default();
    let mut state = QuoteState::Balanced;
    let mut pending: Vec<u8> = Vec::new();
    let mut pending_parts = 0u64;
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .context("Failed to read line")?;
        if read == 0 {
            break;
        }
        strip_terminator(&mut line);
        stats.physical_lines += 1;

        match state {
            QuoteState::Balanced => {
                pending.clear();
                pending.extend_from_slice(&line);
                pending_parts = 1;
            }
            QuoteState::InsideQuotedSpan => {
                pending.push(b'\n');
                pending.extend_from_slice(&line);
                pending_parts += 1;
            }
        }

        if count_quotes(&line) % 2 == 1 {
            state = state.toggle();
        }

        if state == QuoteState::Balanced {
            write_logical_line(writer, &pending, pending_parts, &mut stats)?;
        }
    }

    if state == QuoteState::InsideQuotedSpan {
        debug!(
            parts = pending_parts,
            "File ended inside a quoted span, closing it"
        );
        pending.push(b'"');
        stats.force_closed = true;
        write_logical_line(writer, &pending, pending_parts, &mut stats)?;
    }

    Ok(stats)
}

fn write_logical_line<W: Write>(
    writer: &mut W,
    line: &[u8],
    parts: u64,
    stats: &mut RepairStats,
) -> Result<()> {
    writer
        .write_all(line)
        .and_then(|_| writer.write_all(b"\n"))
        .context("Failed to write repaired line")?;
    stats.logical_lines += 1;
    if parts > 1 {
        stats.merged_lines += 1;
    }
    Ok(())
}

fn count_quotes(line: &[u8]) -> usize {
    memchr::memchr_iter(b'"', line).count()
}

fn strip_terminator(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}

fn tmp_path_for(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repair_bytes(input: &[u8]) -> (Vec<u8>, RepairStats) {
        let mut out = Vec::new();
        let stats = repair_stream(input, &mut out).unwrap();
        (out, stats)
    }

    #[test]
    fn balanced_lines_pass_through() {
        let input = b"title,genre\n\"Heat\",CRIME\nAlien,HORROR\n";
        let (out, stats) = repair_bytes(input);
        assert_eq!(out, input.to_vec());
        assert_eq!(stats.physical_lines, 3);
        assert_eq!(stats.logical_lines, 3);
        assert_eq!(stats.merged_lines, 0);
        assert!(!stats.force_closed);
    }

    #[test]
    fn quoted_newline_is_merged_into_one_logical_line() {
        // quote counts per line: 2, 1, 1, 2
        let input = b"\"a\",b\n\"multi\nline\",c\n\"d\",e\n";
        let (out, stats) = repair_bytes(input);
        assert_eq!(out, b"\"a\",b\n\"multi\nline\",c\n\"d\",e\n".to_vec());
        assert_eq!(stats.physical_lines, 4);
        assert_eq!(stats.logical_lines, 3);
        assert_eq!(stats.merged_lines, 1);
    }

    #[test]
    fn unterminated_quote_is_force_closed() {
        let input = b"ok,row\n\"never closed,x\nmore\n";
        let (out, stats) = repair_bytes(input);
        assert_eq!(out, b"ok,row\n\"never closed,x\nmore\"\n".to_vec());
        assert!(stats.force_closed);
        assert_eq!(stats.logical_lines, 2);
    }

    #[test]
    fn crlf_endings_are_normalised() {
        let (out, _) = repair_bytes(b"a,b\r\nc,d\r\n");
        assert_eq!(out, b"a,b\nc,d\n".to_vec());
    }

    #[test]
    fn missing_final_newline_is_added() {
        let (out, _) = repair_bytes(b"a,b\nc,d");
        assert_eq!(out, b"a,b\nc,d\n".to_vec());
    }

    #[test]
    fn invalid_utf8_passes_through() {
        let input = b"caf\xe9,x\n";
        let (out, _) = repair_bytes(input);
        assert_eq!(out, input.to_vec());
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let (out, stats) = repair_bytes(b"");
        assert!(out.is_empty());
        assert_eq!(stats, RepairStats::default());
    }

    #[test]
    fn repaired_path_appends_suffix() {
        assert_eq!(
            repaired_path(Path::new("metadata/movies.csv")),
            PathBuf::from("metadata/movies.csv.fixed")
        );
    }

    #[test]
    fn repair_writes_fixed_file_and_leaves_input_alone() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("movies.csv");
        let original = b"\"x\ny\",1\n";
        fs::write(&input, original).unwrap();

        let output = repair(&input).unwrap();

        assert_eq!(output, dir.path().join("movies.csv.fixed"));
        assert_eq!(fs::read(&input).unwrap(), original.to_vec());
        assert_eq!(fs::read(&output).unwrap(), original.to_vec());
        assert!(!tmp_path_for(&output).exists());
    }

    #[test]
    fn repair_missing_input_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = repair(&dir.path().join("nope.csv"));
        assert!(result.is_err());
        assert!(!dir.path().join("nope.csv.fixed").exists());
    }
}
