//! Row parsing: one raw catalog row into an [`ImportRecord`].
//!
//! Only structural problems (too few columns, no title) reject a row. Bad
//! values in optional fields are dropped or defaulted and reported back as
//! [`FieldWarning`]s so the caller can log them against a line number.

use crate::config::{DATE_FORMAT, MIN_COLUMNS};
use crate::models::{Category, Genre, ImportRecord, SourceType};
use chrono::NaiveDate;
use thiserror::Error;

const TITLE: usize = 0;
const OTHER_TITLE: usize = 1;
const COUNTRY: usize = 2;
const LANGUAGE: usize = 3;
const DESCRIPTION: usize = 4;
const IMAGE: usize = 5;
const RELEASE_DATE: usize = 6;
const GENRE: usize = 7;
const CATEGORY: usize = 8;
const SOURCE_TYPE: usize = 9;

/// Why a row never became a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowRejection {
    #[error("insufficient columns ({found}/10)")]
    InsufficientColumns { found: usize },
    #[error("title cannot be empty")]
    EmptyTitle,
    #[error("row is not valid UTF-8")]
    InvalidEncoding,
}

/// A field that was dropped or defaulted while the row itself was kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldWarning {
    #[error("incorrect date format: {0}")]
    InvalidDate(String),
    #[error("unknown genre: {0}")]
    UnknownGenre(String),
    #[error("unknown category: {0}, using default")]
    UnknownCategory(String),
    #[error("unknown source type: {0}, using default")]
    UnknownSourceType(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub record: ImportRecord,
    pub warnings: Vec<FieldWarning>,
}

pub fn parse_record(
    fields: &[&str],
    default_category: Category,
) -> Result<ParsedRecord, RowRejection> {
    if fields.len() < MIN_COLUMNS {
        return Err(RowRejection::InsufficientColumns {
            found: fields.len(),
        });
    }

    let title = non_empty(fields, TITLE).ok_or(RowRejection::EmptyTitle)?;
    let mut warnings = Vec::new();

    let release_date = non_empty(fields, RELEASE_DATE).and_then(|raw| {
        match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(_) => {
                warnings.push(FieldWarning::InvalidDate(raw.to_string()));
                None
            }
        }
    });

    let genre = non_empty(fields, GENRE).and_then(|raw| {
        let genre = Genre::from_code(raw);
        if genre.is_none() {
            warnings.push(FieldWarning::UnknownGenre(raw.to_string()));
        }
        genre
    });

    let category = match non_empty(fields, CATEGORY) {
        Some(raw) => Category::from_code(raw).unwrap_or_else(|| {
            warnings.push(FieldWarning::UnknownCategory(raw.to_string()));
            default_category
        }),
        None => default_category,
    };

    let source_type = match non_empty(fields, SOURCE_TYPE) {
        Some(raw) => SourceType::from_code(raw).unwrap_or_else(|| {
            warnings.push(FieldWarning::UnknownSourceType(raw.to_string()));
            SourceType::OfficialData
        }),
        None => SourceType::OfficialData,
    };

    let record = ImportRecord {
        title: title.to_string(),
        other_title: non_empty(fields, OTHER_TITLE).map(str::to_string),
        country: non_empty(fields, COUNTRY).map(str::to_string),
        language: non_empty(fields, LANGUAGE).map(str::to_string),
        description: non_empty(fields, DESCRIPTION).map(str::to_string),
        image: non_empty(fields, IMAGE).map(str::to_string),
        release_date,
        genre,
        category,
        source_type,
        creator_id: None,
    };

    Ok(ParsedRecord { record, warnings })
}

fn non_empty<'a>(fields: &[&'a str], index: usize) -> Option<&'a str> {
    fields.get(index).copied().filter(|s| !s.is_empty())
}
