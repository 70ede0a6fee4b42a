//! Record filters and transforms run by the pipeline stages.
//!
//! Filters return an [`Outcome`]; transforms rewrite the record in place and
//! always accept. None of them know about threads or queues.

use std::collections::{HashMap, HashSet};

use regex::{Regex, RegexBuilder};

use crate::dedup::DedupIndex;
use crate::error::{ConfigError, StageError};
use crate::identity::{IdentityClient, IdentityTable};
use crate::legality::{Validator, Verdict};
use crate::pipeline::report::RejectReason;
use crate::pipeline::stage::Outcome;
use crate::record::GameRecord;

// =============================================================================
// Filters
// =============================================================================

pub fn min_length(game: &GameRecord, min: usize) -> Outcome {
    if game.moves.len() < min {
        Outcome::Reject(RejectReason::Short {
            length: game.moves.len(),
            min,
        })
    } else {
        Outcome::Accept
    }
}

pub fn dedup(index: &DedupIndex, game: &GameRecord) -> Outcome {
    if index.submit(&game.moves, &game.winner) {
        Outcome::Accept
    } else {
        Outcome::Reject(RejectReason::Duplicate)
    }
}

/// Replay the record. Move text that does not parse is a parse failure,
/// not an illegal game.
pub fn legality(validator: &mut Validator, game: &GameRecord) -> Result<Outcome, StageError> {
    let parsed = game
        .parsed_setup()
        .and_then(|setup| Ok((setup, game.parsed_moves()?)));
    let (setup, moves) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return Ok(Outcome::Reject(RejectReason::ParseFailed(e.to_string()))),
    };
    let (rows, cols) = game.dimensions();
    Ok(match validator.validate(rows, cols, &setup, &moves)? {
        Verdict::Legal => Outcome::Accept,
        Verdict::Illegal {
            phase,
            index,
            error,
        } => Outcome::Reject(RejectReason::Illegal {
            phase,
            index,
            error,
        }),
    })
}

/// Case-insensitive player name patterns.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    patterns: Vec<Regex>,
}

impl Blacklist {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p.as_ref())
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::InvalidBlacklist {
                        pattern: p.as_ref().to_string(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn check(&self, game: &GameRecord) -> Outcome {
        for re in &self.patterns {
            for player in [&game.black_player, &game.white_player] {
                if re.is_match(player) {
                    return Outcome::Reject(RejectReason::Blacklisted {
                        player: player.clone(),
                        pattern: re.as_str().to_string(),
                    });
                }
            }
        }
        Outcome::Accept
    }
}

/// Player appearance counts per source, gathered before filtering.
#[derive(Debug, Default)]
pub struct PlayerFrequency {
    counts: HashMap<String, HashMap<String, usize>>,
    observed: usize,
}

impl PlayerFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, game: &GameRecord) {
        self.observed += 1;
        let counts = self.counts.entry(game.source.clone()).or_default();
        for player in [&game.black_player, &game.white_player] {
            if !player.is_empty() {
                *counts.entry(player.clone()).or_default() += 1;
            }
        }
    }

    /// Number of records observed.
    pub fn observed(&self) -> usize {
        self.observed
    }

    /// Exclude, per source, the players above the `1 - fraction` quantile
    /// of appearance counts.
    pub fn cut(&self, fraction: f64) -> TopCut {
        let excluded = self
            .counts
            .iter()
            .filter(|(_, players)| !players.is_empty())
            .map(|(source, players)| {
                let mut counts: Vec<usize> = players.values().copied().collect();
                counts.sort_unstable();
                let at = ((counts.len() - 1) as f64 * (1.0 - fraction)) as usize;
                let cutoff = counts[at];
                let names = players
                    .iter()
                    .filter(|&(_, &c)| c > cutoff)
                    .map(|(name, _)| name.clone())
                    .collect();
                (source.clone(), names)
            })
            .collect();
        TopCut { excluded }
    }
}

/// Players excluded for appearing too often, per source.
#[derive(Debug, Clone, Default)]
pub struct TopCut {
    excluded: HashMap<String, HashSet<String>>,
}

impl TopCut {
    pub fn is_excluded(&self, source: &str, player: &str) -> bool {
        self.excluded
            .get(source)
            .is_some_and(|names| names.contains(player))
    }

    /// Total number of excluded players across sources.
    pub fn len(&self) -> usize {
        self.excluded.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn check(&self, game: &GameRecord) -> Outcome {
        for player in [&game.black_player, &game.white_player] {
            if self.is_excluded(&game.source, player) {
                return Outcome::Reject(RejectReason::TopCut {
                    player: player.clone(),
                });
            }
        }
        Outcome::Accept
    }
}

// =============================================================================
// Transforms
// =============================================================================

/// Drop move data, keeping only metadata.
pub fn meta_only(game: &mut GameRecord) {
    game.moves.clear();
    game.setup.clear();
}

/// Replace player names with identities unique within the source.
pub fn anonymize(table: &IdentityTable, game: &mut GameRecord) -> Result<(), StageError> {
    game.black_id = table.lookup(&game.source, &game.black_player)?;
    game.white_id = table.lookup(&game.source, &game.white_player)?;
    game.black_player.clear();
    game.white_player.clear();
    Ok(())
}

pub fn assign_game_id(ids: &IdentityClient, game: &mut GameRecord) -> Result<(), StageError> {
    game.game_id = ids.next_id()?;
    Ok(())
}
