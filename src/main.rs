//! Weiqi-Dataset command-line tool.
//!
//! ## Usage
//!
//! - `weiqi-dataset filter --out clean.jsonl.gz kgs.jsonl.gz ogs.jsonl.gz`
//!   runs archives of parsed records through the filtering pipeline
//! - `weiqi-dataset check --ruleset NZ Bdd Wpp Bdp` replays one move
//!   sequence and reports the first illegal move

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};

use weiqi_dataset::constants::{DEFAULT_SIZE, DEFAULT_WORKERS, QUEUE_CAPACITY_PER_WORKER};
use weiqi_dataset::error::StageError;
use weiqi_dataset::game::GameState;
use weiqi_dataset::history::SuperkoConfirm;
use weiqi_dataset::io::{self, JsonLinesWriter};
use weiqi_dataset::logging;
use weiqi_dataset::moves::parse_moves;
use weiqi_dataset::pipeline::filters::PlayerFrequency;
use weiqi_dataset::pipeline::report::PipelineReport;
use weiqi_dataset::pipeline::{PartialOutputPolicy, Pipeline, PipelineConfig};
use weiqi_dataset::rules::Ruleset;

/// Weiqi-Dataset: clean and validate Go game record archives
#[derive(Parser)]
#[command(name = "weiqi-dataset")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter JSON-lines archives of game records into one dataset
    Filter(FilterArgs),
    /// Check the legality of a single move sequence
    Check(CheckArgs),
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Input archives (.jsonl or .jsonl.gz)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output dataset (.jsonl or .jsonl.gz)
    #[arg(long)]
    out: PathBuf,

    /// Workers per pipeline stage
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Capacity of each queue between stages [default: 4096 per worker]
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Discard games with fewer than this many moves
    #[arg(long, default_value_t = 0)]
    min_length: usize,

    /// Remove duplicate games (same moves and winner)
    #[arg(long)]
    dedup: bool,

    /// Remove games containing an illegal move
    #[arg(long)]
    check_legal: bool,

    /// Ruleset for legality checking: "", NZ, AGA or TT
    #[arg(long, default_value = "")]
    ruleset: String,

    /// How repeated positions are confirmed after a fingerprint match
    #[arg(long, value_enum, default_value_t = Confirm::Snapshot)]
    superko_confirm: Confirm,

    /// File with one regular expression per line; games with a matching
    /// player are removed (case-insensitive)
    #[arg(long)]
    blacklist: Option<PathBuf>,

    /// Fraction of most frequent players to remove per source
    #[arg(long, default_value_t = 0.0)]
    top_cut: f64,

    /// Fraction of games to sample
    #[arg(long, default_value_t = 1.0)]
    sample: f64,

    /// Strip moves and setup to reduce size
    #[arg(long)]
    meta_only: bool,

    /// Replace player names with per-source player ids
    #[arg(long)]
    anonymize: bool,

    /// Add a unique game id to each game
    #[arg(long)]
    game_id: bool,

    /// Two-column CSV mapping archive file names to source names
    #[arg(long)]
    sources: Option<PathBuf>,

    /// What to do with accepted games of an archive that fails midway
    #[arg(long, value_enum, default_value_t = OnFailure::Discard)]
    on_failure: OnFailure,

    /// Also write debug logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log every rejected game
    #[arg(long, short)]
    verbose: bool,

    /// Seed for sampling and id generation
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(clap::Args)]
struct CheckArgs {
    #[arg(long, default_value_t = DEFAULT_SIZE)]
    rows: usize,

    #[arg(long, default_value_t = DEFAULT_SIZE)]
    cols: usize,

    /// Ruleset: "", NZ, AGA or TT
    #[arg(long, default_value = "")]
    ruleset: String,

    /// Setup stones, comma-separated (e.g. Bdd,Bpp)
    #[arg(long, value_delimiter = ',')]
    setup: Vec<String>,

    /// Moves, e.g. Bdd Wpp B
    moves: Vec<String>,
}

#[derive(Copy, Clone, ValueEnum)]
enum Confirm {
    Snapshot,
    Replay,
    Fingerprint,
}

impl From<Confirm> for SuperkoConfirm {
    fn from(c: Confirm) -> Self {
        match c {
            Confirm::Snapshot => SuperkoConfirm::Snapshot,
            Confirm::Replay => SuperkoConfirm::Replay,
            Confirm::Fingerprint => SuperkoConfirm::FingerprintOnly,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum OnFailure {
    Keep,
    Discard,
}

impl From<OnFailure> for PartialOutputPolicy {
    fn from(p: OnFailure) -> Self {
        match p {
            OnFailure::Keep => PartialOutputPolicy::Keep,
            OnFailure::Discard => PartialOutputPolicy::Discard,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Filter(args) => run_filter(args),
        Commands::Check(args) => run_check(args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_filter(args: FilterArgs) -> Result<ExitCode> {
    logging::init(args.verbose, args.log_file.as_deref())?;

    let blacklist = match &args.blacklist {
        Some(path) => io::load_blacklist(path)?,
        None => Vec::new(),
    };
    let source_names = match &args.sources {
        Some(path) => io::load_source_names(path)?,
        None => Default::default(),
    };
    let config = PipelineConfig {
        workers: args.workers,
        queue_capacity: args
            .queue_capacity
            .unwrap_or(QUEUE_CAPACITY_PER_WORKER * args.workers.max(1)),
        min_length: args.min_length,
        dedup: args.dedup,
        check_legal: args.check_legal,
        ruleset: args.ruleset,
        superko_confirm: args.superko_confirm.into(),
        blacklist,
        top_cut: args.top_cut,
        sample: args.sample,
        meta_only: args.meta_only,
        anonymize: args.anonymize,
        game_id: args.game_id,
        source_names,
        on_failure: args.on_failure.into(),
        seed: args.seed,
    };
    let mut pipeline = Pipeline::new(config).context("failed to start pipeline")?;

    if args.top_cut > 0.0 {
        let mut freq = PlayerFrequency::new();
        for path in &args.inputs {
            let records = io::open_records(path)?;
            pipeline.observe_players(&mut freq, &io::archive_name(path), records)?;
        }
        info!("counted players in {} games", freq.observed());
        pipeline.set_top_cut(freq.cut(args.top_cut));
    }

    let mut sink = JsonLinesWriter::create(&args.out)?;
    let mut total = PipelineReport::default();
    let mut failed = 0;
    for path in &args.inputs {
        let archive = io::archive_name(path);
        let result = io::open_records(path)
            .and_then(|records| pipeline.run_archive(&archive, records, &mut sink));
        match result {
            Ok(report) => total.merge(&report),
            Err(e) if e.downcast_ref::<StageError>().is_some() => return Err(e),
            Err(e) => {
                error!("{e:#}");
                failed += 1;
            }
        }
    }
    sink.finish()?;

    info!("total: {total}");
    if failed > 0 {
        bail!("{failed} of {} archives failed", args.inputs.len());
    }
    Ok(ExitCode::SUCCESS)
}

fn run_check(args: CheckArgs) -> Result<ExitCode> {
    let ruleset = Ruleset::from_name(&args.ruleset)?;
    let setup = parse_moves(&args.setup)?;
    let moves = parse_moves(&args.moves)?;
    let mut game = GameState::new(args.rows, args.cols, ruleset)?;

    for mv in &setup {
        if let Err(e) = game.setup(*mv) {
            println!("illegal setup stone: {e}");
            return Ok(ExitCode::FAILURE);
        }
    }
    if !setup.is_empty() {
        if let Some(first) = moves.first() {
            game.set_turn(first.color);
        }
    }
    for (i, mv) in moves.iter().enumerate() {
        if let Err(e) = game.play(*mv) {
            println!("{game}");
            println!("illegal at move {}: {e}", i + 1);
            return Ok(ExitCode::FAILURE);
        }
    }
    println!("{game}");
    println!("legal ({} moves)", moves.len());
    Ok(ExitCode::SUCCESS)
}
