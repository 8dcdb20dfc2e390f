use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use reelvault_import::checkpoint::{self, Checkpoint};
use reelvault_import::config::{self, DEFAULT_DATA_DIR, DEFAULT_DATABASE, KNOWN_FILES};
use reelvault_import::import::{run_import, ImportJob, ImportReport};
use reelvault_import::models::Category;
use reelvault_import::repair;
use reelvault_import::stats::ImportStats;
use reelvault_import::store::{ContentStore, MemoryStore, SqliteStore};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "reelvault-import")]
#[command(about = "Import movie and TV catalog CSV files into the content store")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory containing the catalog CSV files
    #[arg(long, default_value = DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import every known catalog file (tv_shows.csv, movies.csv)
    ImportAll(StoreArgs),
    /// Import a single file, optionally forcing its default category
    ImportFile(ImportFileArgs),
    /// Resume importing a file after an interruption
    Resume(ResumeArgs),
    /// Repair broken quoting, writing <file>.fixed next to each input
    Repair(RepairArgs),
}

#[derive(Args)]
struct StoreArgs {
    /// SQLite database to import into
    #[arg(long, default_value = DEFAULT_DATABASE)]
    database: PathBuf,

    /// Records committed per batch
    #[arg(long, default_value_t = config::BATCH_SIZE)]
    batch_size: usize,

    /// Limit number of rows to process (for testing)
    #[arg(long)]
    limit: Option<u64>,

    /// Parse and count rows without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Hide the progress spinner
    #[arg(long)]
    no_progress: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ImportFileArgs {
    /// File name inside the data directory
    file: String,

    /// Default category (MOVIE or TV_SHOW); inferred from the file name if omitted
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args)]
struct ResumeArgs {
    /// File name inside the data directory
    file: String,

    /// Rows to skip; defaults to the checkpoint saved by the interrupted run
    #[arg(long)]
    start_line: Option<u64>,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args)]
struct RepairArgs {
    /// File names inside the data directory; every known file if omitted
    files: Vec<String>,
}

fn parse_category(value: &str) -> Result<Category, String> {
    Category::from_code(value).ok_or_else(|| format!("unknown category '{value}' (expected MOVIE or TV_SHOW)"))
}

fn open_store(args: &StoreArgs) -> Result<Box<dyn ContentStore>> {
    if args.dry_run {
        info!("Dry run, records are kept in memory only");
        return Ok(Box::new(MemoryStore::new()));
    }
    let store = SqliteStore::open(&args.database)?;
    Ok(Box::new(store))
}

/// Runs one job and keeps the on-disk resume state in step with the result.
fn import_one(
    job: &ImportJob,
    store: &mut dyn ContentStore,
    args: &StoreArgs,
    carried: ImportStats,
) -> Result<ImportReport> {
    match run_import(job, store) {
        Ok(report) => {
            if !args.dry_run {
                let finished = job.limit.is_none_or(|limit| report.stats.processed < limit);
                if finished {
                    checkpoint::clear(&job.path)?;
                } else {
                    let mut total = carried;
                    total.merge(&report.stats_through_checkpoint());
                    checkpoint::save(&job.path, resume_point(job, report.checkpoint), &total)?;
                }
            }
            Ok(report)
        }
        Err(aborted) => {
            if !args.dry_run {
                let mut total = carried;
                total.merge(&aborted.stats_through_checkpoint());
                let resume_from = resume_point(job, aborted.checkpoint);
                if let Err(e) = checkpoint::save(&job.path, resume_from, &total) {
                    warn!(error = %e, "Failed to save resume state");
                }
            }
            Err(aborted.into())
        }
    }
}

/// Rows skipped by the job count as done even when none was accepted.
fn resume_point(job: &ImportJob, reached: Checkpoint) -> Checkpoint {
    reached.max(Checkpoint::at(job.start_line))
}

fn build_job(path: PathBuf, category: Category, start_line: u64, args: &StoreArgs) -> ImportJob {
    let mut job = ImportJob::new(path, category);
    job.start_line = start_line;
    job.batch_size = args.batch_size;
    job.limit = args.limit;
    job.show_progress = !args.no_progress;
    job
}

fn print_summary(report: &ImportReport, elapsed_secs: f64, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(report).context("Failed to serialize summary")?;
        println!("{out}");
        return Ok(());
    }

    println!();
    println!("=== {} ===", report.path.display());
    println!("Import time:        {:.2}s", elapsed_secs);
    println!("Default category:   {}", report.default_category);
    println!("Start line:         {}", report.start_line);
    println!("Rows processed:     {}", report.stats.processed);
    println!("Succeeded:          {}", report.succeeded());
    println!("Failed:             {}", report.failed());
    println!("  Rejected rows:    {}", report.stats.rejected);
    println!("  Store failures:   {}", report.stats.store_failed);
    println!("Field warnings:     {}", report.stats.field_warnings);
    println!("Last checkpoint:    {}", report.checkpoint.line());
    Ok(())
}

fn run_job(job: ImportJob, args: &StoreArgs, carried: ImportStats) -> Result<()> {
    let mut store = open_store(args)?;
    let start = Instant::now();
    let report = import_one(&job, store.as_mut(), args, carried)?;
    print_summary(&report, start.elapsed().as_secs_f64(), args.json)
}

fn run_import_all(data_dir: &Path, args: StoreArgs) -> Result<()> {
    let mut store = open_store(&args)?;
    let mut failures = 0usize;

    for (file, category) in KNOWN_FILES {
        let job = build_job(data_dir.join(file), *category, 1, &args);
        let start = Instant::now();
        match import_one(&job, store.as_mut(), &args, ImportStats::new()) {
            Ok(report) => print_summary(&report, start.elapsed().as_secs_f64(), args.json)?,
            Err(e) => {
                failures += 1;
                error!("Error in the import process: {:#}", e);
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} files failed to import", KNOWN_FILES.len());
    }
    Ok(())
}

fn run_import_file(data_dir: &Path, args: ImportFileArgs) -> Result<()> {
    let category = args
        .category
        .unwrap_or_else(|| Category::infer_from_file_name(&args.file));
    info!(file = %args.file, %category, "Import specific file");
    let job = build_job(data_dir.join(&args.file), category, 1, &args.store);
    run_job(job, &args.store, ImportStats::new())
}

fn run_resume(data_dir: &Path, args: ResumeArgs) -> Result<()> {
    let path = data_dir.join(&args.file);
    let saved = checkpoint::load_if_valid(&path)?;

    let (start_line, carried) = match (args.start_line, saved) {
        (Some(line), saved) => (line, saved.map(|s| s.stats).unwrap_or_default()),
        (None, Some(state)) => (state.start_line(), state.stats),
        (None, None) => bail!(
            "No resume state found for {}. Pass --start-line to choose where to resume.",
            path.display()
        ),
    };

    info!(file = %args.file, start_line, "Resume import");
    let category = Category::infer_from_file_name(&args.file);
    let job = build_job(path, category, start_line, &args.store);
    run_job(job, &args.store, carried)
}

fn repair_targets(files: &[String]) -> Vec<&str> {
    if files.is_empty() {
        KNOWN_FILES.iter().map(|(file, _)| *file).collect()
    } else {
        files.iter().map(String::as_str).collect()
    }
}

fn run_repair(data_dir: &Path, args: RepairArgs) -> Result<()> {
    info!("Start CSV file repair mode");
    for file in repair_targets(&args.files) {
        let output = repair::repair(&data_dir.join(file))?;
        println!("{}", output.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }

    let result = match cli.command {
        Commands::ImportAll(args) => run_import_all(&cli.data_dir, args),
        Commands::ImportFile(args) => run_import_file(&cli.data_dir, args),
        Commands::Resume(args) => run_resume(&cli.data_dir, args),
        Commands::Repair(args) => run_repair(&cli.data_dir, args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
