//! The filtering pipeline.
//!
//! One archive at a time, records flow
//!
//! ```text
//! producer -> min_length -> dedup -> legality -> blacklist -> top_cut
//!          -> meta_only -> anonymize -> game_id -> collector
//! ```
//!
//! through bounded queues. Disabled stages are left out of the chain. The
//! producer normalizes and samples records on its own thread; each stage is
//! a worker pool; the collector runs on the calling thread, counts
//! rejections and hands accepted records to the sink.
//!
//! The dedup index and identity tables live in the [`Pipeline`] and are
//! shared by every archive it runs, so duplicates are caught across
//! archives and player identities stay stable.

pub mod cancel;
pub mod filters;
pub mod report;
pub mod stage;

use std::collections::HashMap;
use std::thread::{self, Scope};

use anyhow::{Context, Result};
use async_channel::{Receiver, Sender};
use log::{debug, info, warn};

use crate::constants::{DEFAULT_WORKERS, QUEUE_CAPACITY_PER_WORKER, TOP_CUT_SAMPLE_LIMIT};
use crate::dedup::DedupIndex;
use crate::error::{ConfigError, ReadError, StageError};
use crate::history::SuperkoConfirm;
use crate::identity::{IdentityAllocator, IdentityService, IdentityTable};
use crate::io::{RecordSink, RecordSource};
use crate::legality::Validator;
use crate::record::{GameRecord, PipelineRecord};
use crate::rules::Ruleset;

use self::cancel::CancelToken;
use self::filters::{Blacklist, PlayerFrequency, TopCut};
use self::report::{PipelineReport, RejectReason};
use self::stage::{Outcome, StageHandle, spawn_stage};

/// What happens to the accepted records of an archive whose run fails.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PartialOutputPolicy {
    /// Records already handed to the sink stay there.
    Keep,
    /// Accepted records are held back and only written once the archive
    /// completes cleanly.
    Discard,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Workers per stage.
    pub workers: usize,
    /// Capacity of each queue between stages.
    pub queue_capacity: usize,
    /// Reject games with fewer moves. Zero disables the stage.
    pub min_length: usize,
    pub dedup: bool,
    pub check_legal: bool,
    /// Ruleset name used by the legality stage.
    pub ruleset: String,
    pub superko_confirm: SuperkoConfirm,
    /// Case-insensitive regular expressions matched against player names.
    pub blacklist: Vec<String>,
    /// Fraction of most frequent players to exclude per source.
    pub top_cut: f64,
    /// Fraction of records to keep.
    pub sample: f64,
    pub meta_only: bool,
    pub anonymize: bool,
    pub game_id: bool,
    /// Archive file name to source name.
    pub source_names: HashMap<String, String>,
    pub on_failure: PartialOutputPolicy,
    /// Seed for sampling and identifier issuance.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: QUEUE_CAPACITY_PER_WORKER * DEFAULT_WORKERS,
            min_length: 0,
            dedup: false,
            check_legal: false,
            ruleset: String::new(),
            superko_confirm: SuperkoConfirm::default(),
            blacklist: Vec::new(),
            top_cut: 0.0,
            sample: 1.0,
            meta_only: false,
            anonymize: false,
            game_id: false,
            source_names: HashMap::new(),
            on_failure: PartialOutputPolicy::Discard,
            seed: None,
        }
    }
}

impl PipelineConfig {
    /// Reject configurations that cannot run, before any record is read.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity);
        }
        for (name, value) in [("top cut", self.top_cut), ("sample", self.sample)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidFraction { name, value });
            }
        }
        Ruleset::from_name(&self.ruleset)?;
        Blacklist::new(&self.blacklist)?;
        Ok(())
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    ruleset: Ruleset,
    blacklist: Blacklist,
    top_cut: Option<TopCut>,
    dedup: DedupIndex,
    players: IdentityTable,
    game_ids: Option<IdentityService>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, StageError> {
        config.validate()?;
        let ruleset = Ruleset::from_name(&config.ruleset)?;
        let blacklist = Blacklist::new(&config.blacklist)?;
        let allocator = |offset: u64| match config.seed {
            Some(seed) => IdentityAllocator::with_seed(seed.wrapping_add(offset)),
            None => IdentityAllocator::new(),
        };
        let players = IdentityTable::new(allocator(0));
        let game_ids = if config.game_id {
            Some(IdentityService::spawn(allocator(1))?)
        } else {
            None
        };
        Ok(Self {
            ruleset,
            blacklist,
            top_cut: None,
            dedup: DedupIndex::new(),
            players,
            game_ids,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Source name for records of `archive` that do not carry one.
    pub fn source_name(&self, archive: &str) -> String {
        self.config
            .source_names
            .get(archive)
            .cloned()
            .unwrap_or_else(|| archive.to_string())
    }

    /// Count player appearances in `records` for the top-cut filter.
    /// Stops once `freq` has seen the sample limit. Malformed records are
    /// skipped.
    pub fn observe_players<I>(
        &self,
        freq: &mut PlayerFrequency,
        archive: &str,
        records: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = Result<GameRecord, ReadError>>,
    {
        let source = self.source_name(archive);
        for item in records {
            if freq.observed() >= TOP_CUT_SAMPLE_LIMIT {
                break;
            }
            match item {
                Ok(mut game) => {
                    if game.source.is_empty() {
                        game.source.clone_from(&source);
                    }
                    freq.observe(&game);
                }
                Err(ReadError::Malformed { .. }) => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to read archive {archive}"));
                }
            }
        }
        Ok(())
    }

    /// Install the players excluded by the top-cut stage.
    pub fn set_top_cut(&mut self, cut: TopCut) {
        info!("top cut excludes {} players", cut.len());
        self.top_cut = Some(cut);
    }

    /// Run one archive with a fresh cancellation token.
    pub fn run_archive<S: RecordSource>(
        &self,
        archive: &str,
        source: S,
        sink: &mut dyn RecordSink,
    ) -> Result<PipelineReport> {
        self.run_archive_with(archive, source, sink, &CancelToken::new())
    }

    /// Run one archive through every enabled stage.
    ///
    /// Failing to read the source or write the sink, or a stage failure,
    /// raises `cancel` and stops the run; what happens to accepted records
    /// is then decided by the configured [`PartialOutputPolicy`]. A
    /// [`StageError`] in the returned error chain is fatal to the whole
    /// run, not just this archive. Raising `cancel` from outside stops the
    /// run and returns a report marked cancelled.
    pub fn run_archive_with<S: RecordSource>(
        &self,
        archive: &str,
        source: S,
        sink: &mut dyn RecordSink,
        cancel: &CancelToken,
    ) -> Result<PipelineReport> {
        let policy = self.config.on_failure;
        let mut report = PipelineReport::default();
        let mut held = Vec::new();

        let failure = thread::scope(|s| -> Option<anyhow::Error> {
            let (tx, rx) = async_channel::bounded(self.config.queue_capacity);
            cancel.close_on_cancel(&rx);

            let producer = thread::Builder::new()
                .name("producer".into())
                .spawn_scoped(s, move || self.produce(archive, source, tx, cancel));
            let producer = match producer {
                Ok(handle) => handle,
                Err(e) => {
                    cancel.cancel();
                    return Some(anyhow::Error::new(e).context("failed to start producer"));
                }
            };

            let (output, stages) = match self.spawn_stages(s, rx, cancel) {
                Ok(chain) => chain,
                Err(e) => return Some(e.into()),
            };

            let sink_error = self.collect(&output, sink, policy, &mut held, &mut report, cancel);

            let mut stage_error = None;
            for stage in stages {
                let name = stage.name();
                match stage.join() {
                    Ok(handled) => debug!("{archive}: {name} handled {handled} records"),
                    Err(e) => {
                        stage_error.get_or_insert(e);
                    }
                }
            }
            let produced = match producer.join() {
                Ok(result) => result,
                Err(_) => Err(StageError::Panicked { stage: "producer" }.into()),
            };
            let producer_error = match produced {
                Ok((read, sampled_out)) => {
                    report.read = read;
                    report.sampled_out = sampled_out;
                    None
                }
                Err(e) => Some(e),
            };

            // Stage failures are fatal to the run and take precedence.
            stage_error
                .map(anyhow::Error::new)
                .or(producer_error)
                .or(sink_error)
        });

        report.cancelled = failure.is_some() || cancel.is_cancelled();
        if report.cancelled {
            if policy == PartialOutputPolicy::Keep {
                if let Err(e) = sink.flush() {
                    warn!("{archive}: {e:#}");
                }
            }
            if policy == PartialOutputPolicy::Discard && !held.is_empty() {
                warn!("{archive}: discarding {} accepted records", held.len());
            }
            warn!("{archive}: {report}");
            return match failure {
                Some(e) => Err(e.context(format!("archive {archive} failed"))),
                None => Ok(report),
            };
        }

        for game in held.drain(..) {
            sink.write_record(&game)?;
            report.accepted += 1;
        }
        sink.flush()?;
        info!("{archive}: {report}");
        Ok(report)
    }

    fn produce<S: RecordSource>(
        &self,
        archive: &str,
        source: S,
        tx: Sender<PipelineRecord>,
        cancel: &CancelToken,
    ) -> Result<(usize, usize)> {
        let source_name = self.source_name(archive);
        let sample = self.config.sample;
        let mut rng = match self.config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let (mut read, mut sampled_out) = (0, 0);

        for item in source {
            if cancel.is_cancelled() {
                break;
            }
            let item = match item {
                Err(ReadError::Io(e)) => {
                    cancel.cancel();
                    return Err(e).with_context(|| format!("failed to read archive {archive}"));
                }
                other => other,
            };
            read += 1;
            if sample < 1.0 && rng.f64() >= sample {
                sampled_out += 1;
                continue;
            }
            let record = match item {
                Ok(game) => admit(game, archive, &source_name),
                Err(e) => PipelineRecord::unparsed(archive, RejectReason::ParseFailed(e.to_string())),
            };
            if tx.send_blocking(record).is_err() {
                break;
            }
        }
        Ok((read, sampled_out))
    }

    fn spawn_stages<'scope, 'env>(
        &'env self,
        s: &'scope Scope<'scope, 'env>,
        input: Receiver<PipelineRecord>,
        cancel: &CancelToken,
    ) -> Result<(Receiver<PipelineRecord>, Vec<StageHandle<'scope>>), StageError> {
        let (workers, capacity) = (self.config.workers, self.config.queue_capacity);
        let mut queue = input;
        let mut stages = Vec::new();

        if self.config.min_length > 0 {
            let min = self.config.min_length;
            let stage = spawn_stage(s, "min_length", workers, capacity, queue.clone(), cancel, || {
                move |r: &mut PipelineRecord| -> Result<Outcome, StageError> {
                    Ok(filters::min_length(&r.game, min))
                }
            })?;
            queue = stage.output();
            stages.push(stage);
        }
        if self.config.dedup {
            let index = &self.dedup;
            let stage = spawn_stage(s, "dedup", workers, capacity, queue.clone(), cancel, || {
                move |r: &mut PipelineRecord| -> Result<Outcome, StageError> {
                    Ok(filters::dedup(index, &r.game))
                }
            })?;
            queue = stage.output();
            stages.push(stage);
        }
        if self.config.check_legal {
            let (ruleset, confirm) = (self.ruleset, self.config.superko_confirm);
            let stage = spawn_stage(s, "legality", workers, capacity, queue.clone(), cancel, || {
                let mut validator = Validator::with_confirm(ruleset, confirm);
                move |r: &mut PipelineRecord| filters::legality(&mut validator, &r.game)
            })?;
            queue = stage.output();
            stages.push(stage);
        }
        if !self.blacklist.is_empty() {
            let blacklist = &self.blacklist;
            let stage = spawn_stage(s, "blacklist", workers, capacity, queue.clone(), cancel, || {
                move |r: &mut PipelineRecord| -> Result<Outcome, StageError> {
                    Ok(blacklist.check(&r.game))
                }
            })?;
            queue = stage.output();
            stages.push(stage);
        }
        if let Some(top_cut) = self.top_cut.as_ref().filter(|c| !c.is_empty()) {
            let stage = spawn_stage(s, "top_cut", workers, capacity, queue.clone(), cancel, || {
                move |r: &mut PipelineRecord| -> Result<Outcome, StageError> {
                    Ok(top_cut.check(&r.game))
                }
            })?;
            queue = stage.output();
            stages.push(stage);
        }
        if self.config.meta_only {
            let stage = spawn_stage(s, "meta_only", workers, capacity, queue.clone(), cancel, || {
                |r: &mut PipelineRecord| -> Result<Outcome, StageError> {
                    filters::meta_only(&mut r.game);
                    Ok(Outcome::Accept)
                }
            })?;
            queue = stage.output();
            stages.push(stage);
        }
        if self.config.anonymize {
            let players = &self.players;
            let stage = spawn_stage(s, "anonymize", workers, capacity, queue.clone(), cancel, || {
                move |r: &mut PipelineRecord| -> Result<Outcome, StageError> {
                    filters::anonymize(players, &mut r.game)?;
                    Ok(Outcome::Accept)
                }
            })?;
            queue = stage.output();
            stages.push(stage);
        }
        if let Some(service) = &self.game_ids {
            let stage = spawn_stage(s, "game_id", workers, capacity, queue.clone(), cancel, || {
                let ids = service.client();
                move |r: &mut PipelineRecord| -> Result<Outcome, StageError> {
                    filters::assign_game_id(&ids, &mut r.game)?;
                    Ok(Outcome::Accept)
                }
            })?;
            queue = stage.output();
            stages.push(stage);
        }

        Ok((queue, stages))
    }

    /// Drain the last queue. Returns the sink error that stopped it, if any.
    fn collect(
        &self,
        output: &Receiver<PipelineRecord>,
        sink: &mut dyn RecordSink,
        policy: PartialOutputPolicy,
        held: &mut Vec<GameRecord>,
        report: &mut PipelineReport,
        cancel: &CancelToken,
    ) -> Option<anyhow::Error> {
        while let Ok(record) = output.recv_blocking() {
            if cancel.is_cancelled() {
                break;
            }
            if let Some(reason) = &record.rejection {
                report.rejected.record(reason);
                continue;
            }
            match policy {
                PartialOutputPolicy::Discard => held.push(record.game),
                PartialOutputPolicy::Keep => match sink.write_record(&record.game) {
                    Ok(()) => report.accepted += 1,
                    Err(e) => {
                        cancel.cancel();
                        return Some(e);
                    }
                },
            }
        }
        None
    }
}

/// Fill in the source and normalize. A record that fails normalization
/// goes on as a parse failure so it is counted.
fn admit(mut game: GameRecord, archive: &str, source_name: &str) -> PipelineRecord {
    if game.source.is_empty() {
        game.source = source_name.to_string();
    }
    let mut record = PipelineRecord::new(game, archive);
    if let Err(e) = record.game.normalize() {
        record.rejection = Some(RejectReason::ParseFailed(e.to_string()));
    }
    record
}
