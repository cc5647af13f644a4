//! maintai-replay - push recorded or synthetic telemetry through the engine
//!
//! ```text
//! maintai-replay file --input readings.jsonl
//! maintai-replay --db history.db synthetic --count 2000 --degrade-after 1500
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use maintai_core::logic::ingest::parse_timestamp;
use maintai_core::logic::ingest::synthetic::SyntheticSeries;
use maintai_core::logic::pipeline::ManualClock;
use maintai_core::logic::store::sqlite::default_history_path;
use maintai_core::logic::store::{MemoryHistoryStore, SqliteHistoryStore};
use maintai_core::{Engine, EngineConfig, ErrorKind, HistoryStore, RawReading, SubmitOutcome};

#[derive(Parser)]
#[command(name = "maintai-replay")]
#[command(about = "Replay telemetry through the MaintAI scoring engine", long_about = None)]
struct Cli {
    /// Engine config (JSON); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite history database; in-memory history when omitted
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Use the history database under the user data directory
    #[arg(long, global = true, conflicts_with = "db")]
    persist: bool,

    /// Print every outcome as a JSON line
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSONL file, one raw reading per line
    File {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Generate and replay a synthetic four-sensor series
    Synthetic {
        /// Samples per sensor (one per minute)
        #[arg(short = 'n', long, default_value = "1440")]
        count: usize,

        #[arg(short, long, default_value = "press-01")]
        equipment: String,

        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Sample index where the simulated wear starts
        #[arg(short, long)]
        degrade_after: Option<usize>,
    },
}

#[derive(Default)]
struct Summary {
    submitted: usize,
    accepted: usize,
    rejected: usize,
    insufficient: usize,
    fallback: usize,
    store_errors: usize,
    transitions: usize,
}

impl Summary {
    fn record(&mut self, outcome: &SubmitOutcome) {
        self.submitted += 1;
        if outcome.accepted {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
        match outcome.error_kind() {
            Some(ErrorKind::InsufficientHistory) => self.insufficient += 1,
            Some(ErrorKind::ScoringUnavailable) => self.fallback += 1,
            Some(ErrorKind::StoreUnavailable) => self.store_errors += 1,
            _ => {}
        }
        if outcome.alert_event.is_some() {
            self.transitions += 1;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let db_path = match (&cli.db, cli.persist) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(default_history_path()),
        (None, false) => None,
    };
    let store: Arc<dyn HistoryStore> = match &db_path {
        Some(path) => Arc::new(
            SqliteHistoryStore::open(path).with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Arc::new(MemoryHistoryStore::new()),
    };

    let readings = match &cli.command {
        Commands::File { input } => read_jsonl(input)?,
        Commands::Synthetic {
            count,
            equipment,
            seed,
            degrade_after,
        } => {
            let mut series = SyntheticSeries::new(equipment.clone(), *count);
            series.seed = *seed;
            series.degrade_after = *degrade_after;
            series.generate(Utc::now())
        }
    };

    // Recorded data is old; the clock follows the data so it is not stale
    let start = readings
        .iter()
        .find_map(|r| r.timestamp.as_ref().and_then(|ts| parse_timestamp(ts).ok()))
        .unwrap_or_else(Utc::now);
    let clock = Arc::new(ManualClock::new(start));

    let engine = Engine::builder(config)
        .store(store)
        .clock(clock.clone())
        .build()
        .context("building engine")?;

    log::info!("Replaying {} readings with strategy {}", readings.len(), engine.strategy_name());

    let mut summary = Summary::default();
    for raw in readings {
        if let Some(ts) = raw.timestamp.as_ref().and_then(|ts| parse_timestamp(ts).ok()) {
            clock.advance_to(ts);
        }

        let outcome = engine.submit_reading(raw).await;
        summary.record(&outcome);

        if cli.json {
            println!("{}", serde_json::to_string(&outcome)?);
        } else if let Some(event) = &outcome.alert_event {
            println!("{} {}", event.timestamp.to_rfc3339(), event.summary());
        }
    }

    print_summary(&summary, &engine);
    Ok(())
}

fn read_jsonl(path: &Path) -> Result<Vec<RawReading>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut out = Vec::new();

    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RawReading>(&line) {
            Ok(raw) => out.push(raw),
            Err(e) => log::warn!("{}:{}: skipped, {}", path.display(), n + 1, e),
        }
    }

    Ok(out)
}

fn print_summary(summary: &Summary, engine: &Engine) {
    eprintln!();
    eprintln!("Submitted:            {}", summary.submitted);
    eprintln!("Accepted:             {}", summary.accepted);
    eprintln!("Rejected:             {}", summary.rejected);
    eprintln!("Insufficient history: {}", summary.insufficient);
    eprintln!("Fallback scores:      {}", summary.fallback);
    eprintln!("Store errors:         {}", summary.store_errors);
    eprintln!("Alert transitions:    {}", summary.transitions);
    eprintln!("Notifications lost:   {}", engine.notifications_dropped());
    eprintln!();

    for state in engine.alert_states() {
        let score = state
            .last_score
            .map(|s| format!("{:.3}", s))
            .unwrap_or_else(|| "-".to_string());
        eprintln!(
            "{} {:<20} {:<8} since {} (last score {})",
            state.level.emoji(),
            state.equipment_id,
            state.level.as_str(),
            state.since.to_rfc3339(),
            score
        );
    }
}
