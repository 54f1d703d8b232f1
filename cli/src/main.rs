use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wraeclast_core::config::EngineConfig;
use wraeclast_core::database::Database;
use wraeclast_core::models::SnapshotVersion;
use wraeclast_core::seeding;

#[derive(Parser)]
#[command(
    name = "wraeclast",
    version = "0.1.0",
    about = "Modifier normalization and stat-template resolution for game-data snapshots",
    long_about = None
)]
struct Cli {
    /// Path to SQLite database file
    #[arg(long, global = true, default_value = "./wraeclast.sqlite")]
    database: std::path::PathBuf,

    /// Path to log file
    #[arg(long, global = true, default_value = "/tmp/wraeclast.log")]
    log_file: std::path::PathBuf,

    /// Verbosity level (repeat for more verbose output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a snapshot version (idempotent on the tag)
    RegisterVersion {
        /// Version tag, e.g. "3.26"
        #[arg(long)]
        version_tag: String,
        /// Upstream source label
        #[arg(long, default_value = "")]
        source: String,
    },

    /// Seed stat definitions and overrides from CSV files
    SeedCatalog {
        /// Directory containing stat_definitions.csv / stat_overrides.csv
        #[arg(long)]
        input_dir: std::path::PathBuf,
        /// Version tag to seed under (default: latest registered)
        #[arg(long)]
        version_tag: Option<String>,
    },

    /// Seed raw modifier origin tables from CSV files
    SeedRaw {
        /// Directory containing the origin-table CSV files
        #[arg(long)]
        input_dir: std::path::PathBuf,
        /// Version tag to seed under (default: latest registered)
        #[arg(long)]
        version_tag: Option<String>,
    },

    /// Run one normalization pass over a version's raw modifiers
    ParseMods {
        /// Version tag to process (default: latest registered)
        #[arg(long)]
        version_tag: Option<String>,
        /// Engine configuration TOML (default: built-in defaults)
        #[arg(long)]
        config: Option<std::path::PathBuf>,
    },

    /// Print aggregate counts over stored records for a version
    ShowSummary {
        /// Version tag to summarize (default: latest registered)
        #[arg(long)]
        version_tag: Option<String>,
    },
}

fn setup_logging(verbose: u8, log_file: &std::path::Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let filter_level = match verbose {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(filter_level.into());

    let file_appender = tracing_appender::rolling::never(
        log_file.parent().unwrap_or(std::path::Path::new(".")),
        log_file.file_name().unwrap_or(std::ffi::OsStr::new("wraeclast.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::Layer::new().with_writer(std::io::stderr).with_ansi(true))
        .with(fmt::Layer::new().with_writer(non_blocking).with_ansi(false));

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(guard)
}

/// Resolve the version to operate on: an explicit tag, or the most
/// recently registered one.
fn resolve_version(db: &Database, version_tag: Option<&str>) -> Result<SnapshotVersion> {
    match version_tag {
        Some(tag) => db
            .get_version(tag)?
            .ok_or_else(|| anyhow::anyhow!("version '{}' is not registered", tag)),
        None => db
            .latest_version()?
            .ok_or_else(|| anyhow::anyhow!("no versions registered; run register-version first")),
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = setup_logging(cli.verbose, &cli.log_file)?;

    let db = Database::new(&cli.database)?;

    match cli.command {
        Commands::RegisterVersion { version_tag, source } => {
            let version_id = db.register_version(&version_tag, &source)?;
            info!(version_id, version_tag, "version registered");
            println!("Registered version '{}' (id {})", version_tag, version_id);
        }
        Commands::SeedCatalog { input_dir, version_tag } => {
            let version = resolve_version(&db, version_tag.as_deref())?;
            let report = seeding::seed_catalog_from_dir(&db, &input_dir, version.version_id)?;
            println!(
                "Seeded {} definitions and {} overrides for '{}'",
                report.definitions, report.overrides, version.version_tag
            );
        }
        Commands::SeedRaw { input_dir, version_tag } => {
            let version = resolve_version(&db, version_tag.as_deref())?;
            let report = seeding::seed_raw_from_dir(&db, &input_dir, version.version_id)?;
            println!(
                "Seeded {} item, {} gem, {} boss and {} tree rows for '{}'",
                report.unique_mods,
                report.gem_stats,
                report.boss_skill_stats,
                report.node_effects,
                version.version_tag
            );
        }
        Commands::ParseMods { version_tag, config } => {
            let version = resolve_version(&db, version_tag.as_deref())?;
            let engine_config = match config {
                Some(path) => EngineConfig::from_file(&path)?,
                None => EngineConfig::default(),
            };

            let bar = spinner("resolving modifiers");
            let summary = wraeclast_core::run_pass(&db, &engine_config, version.version_id)?;
            bar.finish_and_clear();

            println!("Pass complete for '{}':", version.version_tag);
            println!("  parsed:          {}", summary.parsed);
            println!("  ambiguous:       {}", summary.ambiguous);
            println!("  unresolved:      {}", summary.unresolved);
            println!("  failed:          {}", summary.failed);
            println!("  skipped blank:   {}", summary.skipped_blank);
            println!("  skipped invalid: {}", summary.skipped_invalid);
            if summary.unprocessed > 0 {
                println!("  unprocessed:     {}", summary.unprocessed);
            }
        }
        Commands::ShowSummary { version_tag } => {
            let version = resolve_version(&db, version_tag.as_deref())?;
            let counts = db.summarize_stored(version.version_id)?;
            println!("Stored records for '{}':", version.version_tag);
            println!("  total:      {}", counts.total);
            println!("  resolved:   {}", counts.resolved);
            println!("  ambiguous:  {}", counts.ambiguous);
            println!("  unresolved: {}", counts.unresolved);
        }
    }

    Ok(())
}
