//! Tests for the quote repair pass on real files, and for importing its output.

use reelvault_import::import::{run_import, ImportJob};
use reelvault_import::models::Category;
use reelvault_import::repair::{repair, repair_to, repaired_path};
use reelvault_import::store::MemoryStore;
use std::fs;
use tempfile::TempDir;

#[test]
fn repair_is_idempotent_on_balanced_files() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("movies.csv");
    fs::write(
        &input,
        "title,genre\n\"Heat\",CRIME\n\"Two\nlines\",DRAMA\r\nAlien,HORROR",
    )
    .unwrap();

    let once = repair(&input).unwrap();
    let twice = repair(&once).unwrap();

    assert_eq!(twice, dir.path().join("movies.csv.fixed.fixed"));
    assert_eq!(fs::read(&once).unwrap(), fs::read(&twice).unwrap());
}

#[test]
fn odd_quote_lines_are_merged() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tv_shows.csv");
    // quote counts per line: 2, 1, 1, 2
    fs::write(
        &input,
        "\"Lost\",x\n\"The Wire\nSeason\",y\n\"Fargo\",z\n",
    )
    .unwrap();
    let output = dir.path().join("out.csv");

    let stats = repair_to(&input, &output).unwrap();

    let repaired = fs::read_to_string(&output).unwrap();
    assert_eq!(stats.physical_lines, 4);
    assert_eq!(stats.logical_lines, 3);
    assert_eq!(stats.merged_lines, 1);
    assert_eq!(repaired, "\"Lost\",x\n\"The Wire\nSeason\",y\n\"Fargo\",z\n");
}

#[test]
fn repaired_file_imports_cleanly() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("movies.csv");
    fs::write(
        &input,
        "title,other_title,country,language,description,image,release_date,genre,category,source_type\n\
         Heat,,US,en,Heist,,1995-12-15,CRIME,MOVIE,\n\
         Solaris,,SU,ru,,,1972-03-20,SCIENCE_FICTION,MOVIE,\"Open quote\n",
    )
    .unwrap();

    let output = repair(&input).unwrap();
    assert_eq!(output, repaired_path(&input));

    let mut store = MemoryStore::new();
    let report = run_import(&ImportJob::new(&output, Category::Movie), &mut store).unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(store.records()[1].title, "Solaris");
    assert!(fs::read_to_string(&output).unwrap().ends_with("\"\n"));
    assert!(!fs::read_to_string(&input).unwrap().ends_with("\"\n"));
}
