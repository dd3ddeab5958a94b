mod config;
mod db;
mod error;
mod fetch;
mod harvest;
mod mirror;
mod model;
mod parser;
mod store;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};

use config::HarvestConfig;
use model::Record;
use store::RecordStore;

#[derive(Parser)]
#[command(name = "profile_harvester", about = "Harvest profiles from jewornotjew.com")]
struct Cli {
    /// Site root profile ids are appended to
    #[arg(long, env = "HARVEST_BASE_URL", default_value = config::BASE_URL, global = true)]
    base_url: String,

    /// Directory for the JSON mirror and run logs
    #[arg(long, env = "HARVEST_DATA_DIR", default_value = config::DATA_DIR, global = true)]
    data_dir: PathBuf,

    /// SQLite database file
    #[arg(long, env = "HARVEST_DB_PATH", default_value = config::DB_PATH, global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep profile ids and save what is found
    Scrape {
        /// Load saved profiles first and only write new or changed ones
        #[arg(long)]
        incremental: bool,
        /// First profile id
        #[arg(long, default_value_t = 1)]
        start: u32,
        /// Last profile id
        #[arg(long, default_value_t = config::MAX_ID)]
        end: u32,
        /// Stop once this many profiles were found (0 = no limit)
        #[arg(long, default_value_t = config::TARGET_PROFILES)]
        target: u64,
        /// Requests in flight at once
        #[arg(short, long, default_value_t = config::CONCURRENCY)]
        concurrency: usize,
        /// Minimum spacing between dispatches
        #[arg(long, default_value_t = config::DISPATCH_INTERVAL_MS)]
        interval_ms: u64,
        /// Per-request timeout
        #[arg(long, default_value_t = config::TIMEOUT_SECS)]
        timeout_secs: u64,
        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Load the JSON mirror into the database
    Load,
    /// List saved profiles
    List {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Search names and descriptions
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Show one profile
    Get {
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Profiles with a given verdict
    Verdict {
        verdict: String,
        #[arg(long)]
        json: bool,
    },
    /// Profiles in a given category
    Category {
        category: String,
        #[arg(long)]
        json: bool,
    },
    /// Show database statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape {
            incremental,
            start,
            end,
            target,
            concurrency,
            interval_ms,
            timeout_secs,
            no_progress,
        } => {
            let config = HarvestConfig {
                base_url: cli.base_url,
                data_dir: cli.data_dir,
                start_id: start,
                end_id: end,
                target,
                concurrency,
                dispatch_interval: Duration::from_millis(interval_ms),
                timeout: Duration::from_secs(timeout_secs),
                incremental,
                show_progress: !no_progress,
            };
            scrape(config, &cli.db).await
        }
        Commands::Load => {
            let store = open_db(&cli.db)?;
            let mirror = mirror::JsonMirror::open(&cli.data_dir)?;
            let records = mirror.read_all()?;
            if records.is_empty() {
                println!("No JSON files in {}.", cli.data_dir.display());
                return Ok(());
            }
            let n = db::upsert_records(store.conn(), &records)?;
            println!("Loaded {} profiles into {}", n, cli.db.display());
            Ok(())
        }
        Commands::List { limit, json } => {
            let store = open_db(&cli.db)?;
            let rows = db::list_records(store.conn(), limit)?;
            show(&rows, json)
        }
        Commands::Search { query, json } => {
            let store = open_db(&cli.db)?;
            let rows = db::search_records(store.conn(), &query)?;
            show(&rows, json)
        }
        Commands::Get { name, json } => {
            let store = open_db(&cli.db)?;
            match db::get_record(store.conn(), &name)? {
                Some(r) if json => {
                    println!("{}", serde_json::to_string_pretty(&r)?);
                    Ok(())
                }
                Some(r) => {
                    print_record(&r);
                    Ok(())
                }
                None => anyhow::bail!("No profile named {:?}", name),
            }
        }
        Commands::Verdict { verdict, json } => {
            let store = open_db(&cli.db)?;
            let rows = db::records_by_verdict(store.conn(), &verdict)?;
            show(&rows, json)
        }
        Commands::Category { category, json } => {
            let store = open_db(&cli.db)?;
            let rows = db::records_by_category(store.conn(), &category)?;
            show(&rows, json)
        }
        Commands::Stats => {
            let store = open_db(&cli.db)?;
            let s = db::get_stats(store.conn())?;
            println!("Profiles:     {}", s.profiles);
            println!("Described:    {}", s.with_description);
            println!("Pros / cons:  {} / {}", s.pros, s.cons);
            if !s.verdicts.is_empty() {
                println!("\n--- Verdicts ---");
                for (v, n) in &s.verdicts {
                    println!("{:>6}  {}", n, v);
                }
            }
            if !s.categories.is_empty() {
                println!("\n--- Categories ---");
                for (c, n) in &s.categories {
                    println!("{:>6}  {}", n, c);
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open_db(path: &Path) -> anyhow::Result<db::SqliteStore> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    db::SqliteStore::open(path)
}

async fn scrape(config: HarvestConfig, db_path: &Path) -> anyhow::Result<()> {
    let sqlite = open_db(db_path).map_err(error::HarvestError::init)?;
    let mirror = mirror::JsonMirror::open(&config.data_dir).map_err(error::HarvestError::init)?;
    let source = fetch::HttpSource::new(config.timeout).map_err(error::HarvestError::init)?;

    println!(
        "Harvesting ids {}..={} from {} ({} concurrent{})",
        config.start_id,
        config.end_id,
        config.base_url,
        config.concurrency,
        if config.incremental { ", incremental" } else { "" }
    );
    let stores: Vec<Box<dyn RecordStore + Send>> = vec![Box::new(sqlite), Box::new(mirror)];
    let report = harvest::Harvester::new(config, source, stores)?.run().await?;

    let c = report.counters;
    println!(
        "Done: {} dispatched, {} found ({} new, {} updated, {} unchanged), {} empty, {} errors.",
        report.dispatched, c.success, c.new, c.updated, c.unchanged, c.skipped, c.failed
    );
    if c.persist_errors > 0 {
        println!("{} writes failed; see the run log.", c.persist_errors);
    }
    println!(
        "{} profiles held after {}",
        report.records.len(),
        format_duration(report.elapsed)
    );
    Ok(())
}

fn show(rows: &[Record], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No profiles found.");
        return Ok(());
    }

    println!(
        "{:>4} | {:<28} | {:<14} | {:<14} | {:>4} | {:>4}",
        "#", "Name", "Verdict", "Category", "Pros", "Cons"
    );
    println!("{}", "-".repeat(82));
    for (i, r) in rows.iter().enumerate() {
        println!(
            "{:>4} | {:<28} | {:<14} | {:<14} | {:>4} | {:>4}",
            i + 1,
            truncate(&r.name, 28),
            truncate(&r.verdict, 14),
            truncate(&r.category, 14),
            r.pros.len(),
            r.cons.len()
        );
    }
    println!("\n{} profiles", rows.len());
    Ok(())
}

fn print_record(r: &Record) {
    println!("{}", r.name);
    println!("{}", "=".repeat(r.name.chars().count()));
    println!("Verdict:  {}", r.verdict);
    if !r.category.is_empty() {
        println!("Category: {}", r.category);
    }
    println!("URL:      {}", r.url);
    if !r.image_url.is_empty() {
        println!("Image:    {}", r.image_url);
    }
    println!("Saved:    {} (updated {})", r.created_at, r.updated_at);
    if !r.description.is_empty() {
        println!("\n{}", r.description);
    }
    for (label, items) in [("Pros", &r.pros), ("Cons", &r.cons)] {
        if !items.is_empty() {
            println!("\n{}:", label);
            for item in items {
                println!("  - {}", item);
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
