//! Reelvault import: batched, resumable loading of movie and TV catalog CSVs
//!
//! The pipeline streams a catalog file row by row into a content store:
//!
//! 1. **Parse** -- Each row becomes an [`ImportRecord`](models::ImportRecord).
//!    Rows without enough columns or without a title are rejected; bad dates
//!    and unknown enum codes only drop or default that one field
//! 2. **Batch** -- Accepted records are buffered up to a threshold (5000 by
//!    default) and committed with one bulk insert
//! 3. **Fallback** -- When the bulk insert is refused, the batch is saved one
//!    record at a time so a single bad row only costs itself
//! 4. **Checkpoint** -- The last accepted row number is tracked for the run and
//!    returned to the caller, who can resume from it later
//!
//! A separate quote repair pass rebuilds files whose quoted fields were broken
//! across lines, writing `<file>.fixed` for a later import.
//!
//! # Key Modules
//!
//! - [`parser`] -- Row to record conversion with tolerant field decoding
//! - [`repair`] -- Quote balancing line reassembly
//! - [`writer`] -- Bulk commit with per-row fallback
//! - [`import`] -- The import driver: skip offset, batching, counters
//! - [`checkpoint`] -- In-run checkpoint and optional on-disk resume state
//! - [`store`] -- Content store trait with SQLite and in-memory backends
//! - [`stats`] -- Per-file counters
//! - [`models`] -- Record and enum types
//! - [`config`] -- Constants for import and repair
//!
//! # Example Usage
//!
//! ```bash
//! # Import tv_shows.csv and movies.csv from ./metadata
//! reelvault-import import-all
//!
//! # Resume movies.csv from row 458087
//! reelvault-import resume movies.csv --start-line 458087
//!
//! # Repair broken quoting, then import the result as movies
//! reelvault-import repair movies.csv
//! reelvault-import import-file movies.csv.fixed --category MOVIE
//! ```

pub mod checkpoint;
pub mod config;
pub mod import;
pub mod models;
pub mod parser;
pub mod repair;
pub mod stats;
pub mod store;
pub mod writer;
