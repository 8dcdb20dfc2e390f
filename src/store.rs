//! Content store seam used by the importer, plus the SQLite and in-memory
//! implementations shipped with the binary.

use crate::models::ImportRecord;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use tracing::debug;

/// Destination for imported records.
///
/// `insert_many` is all-or-nothing: either every record is stored and one id
/// per record is returned, or nothing is stored and an error is returned.
pub trait ContentStore {
    fn insert(&mut self, record: &ImportRecord) -> Result<i64>;

    fn insert_many(&mut self, records: &[ImportRecord]) -> Result<Vec<i64>>;
}

impl<S: ContentStore + ?Sized> ContentStore for &mut S {
    fn insert(&mut self, record: &ImportRecord) -> Result<i64> {
        (**self).insert(record)
    }

    fn insert_many(&mut self, records: &[ImportRecord]) -> Result<Vec<i64>> {
        (**self).insert_many(records)
    }
}

/// Keeps records in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<ImportRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ImportRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ContentStore for MemoryStore {
    fn insert(&mut self, record: &ImportRecord) -> Result<i64> {
        self.records.push(record.clone());
        Ok(self.records.len() as i64)
    }

    fn insert_many(&mut self, records: &[ImportRecord]) -> Result<Vec<i64>> {
        let first = self.records.len() as i64 + 1;
        self.records.extend_from_slice(records);
        Ok((first..first + records.len() as i64).collect())
    }
}

// Column limits follow the catalogue schema.
const CREATE_CONTENTS: &str = "CREATE TABLE IF NOT EXISTS contents (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    title        TEXT NOT NULL CHECK (length(title) BETWEEN 1 AND 500),
    other_title  TEXT CHECK (other_title IS NULL OR length(other_title) <= 500),
    country      TEXT CHECK (country IS NULL OR length(country) <= 2),
    language     TEXT CHECK (language IS NULL OR length(language) <= 2),
    description  TEXT,
    image        TEXT CHECK (image IS NULL OR length(image) <= 500),
    release_date TEXT,
    genre        TEXT,
    category     TEXT,
    source_type  TEXT,
    creator_id   INTEGER
);";

const INSERT_CONTENT: &str = "INSERT INTO contents (
    title, other_title, country, language, description, image,
    release_date, genre, category, source_type, creator_id
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

/// `contents` table in a SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_CONTENTS)
            .context("Failed to prepare contents table")?;
        Ok(Self { conn })
    }

    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM contents", [], |row| row.get(0))
            .context("Failed to count contents")?;
        Ok(count as u64)
    }

    /// Titles in insertion order.
    pub fn titles(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT title FROM contents ORDER BY id")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(titles)
    }
}

fn insert_row(tx: &Transaction<'_>, record: &ImportRecord) -> Result<i64> {
    let mut stmt = tx.prepare_cached(INSERT_CONTENT)?;
    stmt.execute(params![
        record.title,
        record.other_title,
        record.country,
        record.language,
        record.description,
        record.image,
        record.release_date.map(|d| d.to_string()),
        record.genre.map(|g| g.code()),
        record.category.code(),
        record.source_type.code(),
        record.creator_id,
    ])
    .with_context(|| format!("Failed to insert '{}'", record.title))?;
    Ok(tx.last_insert_rowid())
}

impl ContentStore for SqliteStore {
    fn insert(&mut self, record: &ImportRecord) -> Result<i64> {
        let tx = self.conn.transaction()?;
        let id = insert_row(&tx, record)?;
        tx.commit().context("Failed to commit insert")?;
        Ok(id)
    }

    fn insert_many(&mut self, records: &[ImportRecord]) -> Result<Vec<i64>> {
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            // Dropping `tx` on error rolls the whole batch back.
            ids.push(insert_row(&tx, record)?);
        }
        tx.commit().context("Failed to commit batch")?;
        debug!(rows = ids.len(), "Batch committed");
        Ok(ids)
    }
}
