use crate::models::Category;

/// Records buffered before a batch commit
pub const BATCH_SIZE: usize = 5000;

/// Positional columns every catalog row must carry
pub const MIN_COLUMNS: usize = 10;

/// Release date pattern (`yyyy-MM-dd`)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Directory the catalog files live in
pub const DEFAULT_DATA_DIR: &str = "metadata";

/// SQLite database used when no `--database` is given
pub const DEFAULT_DATABASE: &str = "contents.db";

/// Files loaded by a full import, in order, with their default category
pub const KNOWN_FILES: &[(&str, Category)] = &[
    ("tv_shows.csv", Category::TvShow),
    ("movies.csv", Category::Movie),
];

/// Suffix appended to the output of the quote repair pass
pub const REPAIRED_SUFFIX: &str = ".fixed";

/// Suffix of the persisted resume state written next to an input file
pub const RESUME_SUFFIX: &str = ".resume";

/// Progress update interval (tick every N rows)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Bump when the on-disk resume state layout changes
pub const RESUME_STATE_VERSION: u32 = 2;
