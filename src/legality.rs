//! Whole-record legality checking.
//!
//! [`check_legal`] is the one-shot entry point: board size, setup stones,
//! moves and a ruleset name in; a [`Verdict`] out. [`Validator`] does the
//! same for a stream of records and reuses one [`GameState`] between them.

use crate::error::{ConfigError, MoveError};
use crate::game::GameState;
use crate::history::SuperkoConfirm;
use crate::moves::Move;
use crate::rules::Ruleset;

/// Where in a record an illegal move was found.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Moves,
}

/// Outcome of replaying a record. An illegal sequence is an ordinary
/// result, not an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Legal,
    Illegal {
        phase: Phase,
        index: usize,
        error: MoveError,
    },
}

impl Verdict {
    pub fn is_legal(&self) -> bool {
        matches!(self, Verdict::Legal)
    }
}

/// Replays records under a fixed ruleset.
#[derive(Debug)]
pub struct Validator {
    ruleset: Ruleset,
    confirm: SuperkoConfirm,
    game: Option<GameState>,
}

impl Validator {
    pub fn new(ruleset: Ruleset) -> Self {
        Self::with_confirm(ruleset, SuperkoConfirm::default())
    }

    pub fn with_confirm(ruleset: Ruleset, confirm: SuperkoConfirm) -> Self {
        Self {
            ruleset,
            confirm,
            game: None,
        }
    }

    /// Apply `setup` in setup mode, then play `moves` in order.
    ///
    /// When setup stones are present the first recorded move decides who
    /// plays first, since handicap games usually start with White.
    pub fn validate(
        &mut self,
        rows: usize,
        cols: usize,
        setup: &[Move],
        moves: &[Move],
    ) -> Result<Verdict, ConfigError> {
        let game = match self.game.take() {
            Some(mut game) if game.board().rows() == rows && game.board().cols() == cols => {
                game.reset();
                game
            }
            _ => GameState::with_confirm(rows, cols, self.ruleset, self.confirm)?,
        };
        let game = self.game.insert(game);

        for (index, &mv) in setup.iter().enumerate() {
            if let Err(error) = game.setup(mv) {
                return Ok(Verdict::Illegal {
                    phase: Phase::Setup,
                    index,
                    error,
                });
            }
        }
        if !setup.is_empty() {
            if let Some(first) = moves.first() {
                game.set_turn(first.color);
            }
        }

        for (index, &mv) in moves.iter().enumerate() {
            if let Err(error) = game.play(mv) {
                return Ok(Verdict::Illegal {
                    phase: Phase::Moves,
                    index,
                    error,
                });
            }
        }
        Ok(Verdict::Legal)
    }
}

/// Check a whole record under the named ruleset.
///
/// Fails only on caller defects: an unknown ruleset, or a dimension outside
/// 1 to 52.
pub fn check_legal(
    rows: usize,
    cols: usize,
    setup: &[Move],
    moves: &[Move],
    ruleset: &str,
) -> Result<Verdict, ConfigError> {
    let ruleset = Ruleset::from_name(ruleset)?;
    Validator::new(ruleset).validate(rows, cols, setup, moves)
}
