//! Game state and the move legality engine.
//!
//! One transition function implements all three entry points:
//!
//! - [`GameState::play`] checks a move and commits it.
//! - [`GameState::check`] checks a move and leaves the game untouched.
//! - [`GameState::setup`] places a stone outside the normal rules, for
//!   handicap stones or rebuilding a position. Only off-board vertices are
//!   rejected.
//!
//! Checks run in a fixed order and the first failure wins: turn, pass,
//! bounds, occupancy, captures, suicide, superko. Captures are resolved
//! before suicide, so filling your own last liberty is legal when it takes
//! an enclosing enemy group.

use std::fmt;

use crate::board::{Board, Color};
use crate::constants::MAX_SIZE;
use crate::error::{ConfigError, IllegalMove, MoveError};
use crate::group::Group;
use crate::history::{HistoryEntry, PositionHistory, SuperkoConfirm};
use crate::moves::Move;
use crate::rules::{Ruleset, Superko};

/// How the transition function treats a move.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Play,
    Check,
    Setup,
}

/// A game in progress: the board, the player to move and every position
/// reached so far.
///
/// A `GameState` is owned by one worker at a time; it is never shared.
#[derive(Debug)]
pub struct GameState {
    board: Board,
    /// Tentative next position, reused across moves.
    scratch: Board,
    group: Group,
    turn: Color,
    ruleset: Ruleset,
    history: Box<dyn PositionHistory>,
}

impl GameState {
    /// Start an empty `rows x cols` game, Black to move, keeping board
    /// snapshots for superko confirmation.
    pub fn new(rows: usize, cols: usize, ruleset: Ruleset) -> Result<Self, ConfigError> {
        Self::with_confirm(rows, cols, ruleset, SuperkoConfirm::default())
    }

    /// Like [`GameState::new`] with an explicit superko confirmation strategy.
    pub fn with_confirm(
        rows: usize,
        cols: usize,
        ruleset: Ruleset,
        confirm: SuperkoConfirm,
    ) -> Result<Self, ConfigError> {
        if !(1..=MAX_SIZE).contains(&rows) || !(1..=MAX_SIZE).contains(&cols) {
            return Err(ConfigError::InvalidDimensions { rows, cols });
        }
        Ok(Self::from_board(Board::new(rows, cols), ruleset, confirm))
    }

    /// Start a game from an existing board, which becomes the root position.
    pub fn from_board(board: Board, ruleset: Ruleset, confirm: SuperkoConfirm) -> Self {
        let history = confirm.build(&board);
        Self {
            scratch: board.clone(),
            board,
            group: Group::new(),
            turn: Color::Black,
            ruleset,
            history,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The player to move.
    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn set_turn(&mut self, color: Color) {
        self.turn = color;
    }

    pub fn ruleset(&self) -> Ruleset {
        self.ruleset
    }

    /// Switch rules; later moves are judged by the new ruleset.
    pub fn set_ruleset(&mut self, ruleset: Ruleset) {
        self.ruleset = ruleset;
    }

    /// Every position reached, starting with the root.
    pub fn history(&self) -> &[HistoryEntry] {
        self.history.entries()
    }

    /// Empty the board and history, Black to move. Keeps allocations so a
    /// validator can reuse one game for many records.
    pub fn reset(&mut self) {
        self.board.clear();
        self.scratch.clear();
        self.turn = Color::Black;
        self.history.reset(&self.board);
    }

    /// Play a move if it is legal.
    pub fn play(&mut self, mv: Move) -> Result<(), MoveError> {
        self.apply(mv, Mode::Play)
    }

    /// Check move legality without altering the game.
    ///
    /// Takes `&mut self` only to reuse scratch buffers; board, turn and
    /// history are unchanged afterwards. Always agrees with [`GameState::play`].
    pub fn check(&mut self, mv: Move) -> Result<(), MoveError> {
        self.apply(mv, Mode::Check)
    }

    /// Place a stone regardless of turn and occupancy. The turn does not
    /// change; a setup pass hands the move to the opponent.
    pub fn setup(&mut self, mv: Move) -> Result<(), MoveError> {
        self.apply(mv, Mode::Setup)
    }

    pub fn apply(&mut self, mv: Move, mode: Mode) -> Result<(), MoveError> {
        self.transition(mv, mode)
            .map_err(|kind| MoveError { kind, attempted: mv })
    }

    fn transition(&mut self, mv: Move, mode: Mode) -> Result<(), IllegalMove> {
        if mode != Mode::Setup && mv.color != self.turn {
            return Err(IllegalMove::WrongPlayer);
        }

        // A pass never changes the position
        let Some(v) = mv.vertex else {
            if mode != Mode::Check {
                self.turn = mv.color.opponent();
                self.record(mv);
            }
            return Ok(());
        };

        if !self.board.exists(v) {
            return Err(IllegalMove::OutsideBoard);
        }
        if mode != Mode::Setup && self.board.color_at(v).is_some() {
            return Err(IllegalMove::VertexNotEmpty);
        }

        self.scratch.copy_from(&self.board);
        if resolve_placement(&mut self.scratch, mv, &mut self.group) {
            if self.ruleset.suicide_forbidden && mode != Mode::Setup {
                return Err(IllegalMove::Suicide);
            }
            self.scratch.remove_group(&self.group);
        }

        if mode != Mode::Setup {
            self.check_superko(mv.color)?;
        }

        if mode != Mode::Check {
            std::mem::swap(&mut self.board, &mut self.scratch);
            if mode == Mode::Play {
                self.turn = mv.color.opponent();
            }
            self.record(mv);
        }
        Ok(())
    }

    /// Reject the tentative position if the ruleset forbids repeating it.
    fn check_superko(&mut self, mover: Color) -> Result<(), IllegalMove> {
        if self.ruleset.superko == Superko::None {
            return Ok(());
        }
        let fingerprint = self.scratch.fingerprint();
        for i in 0..self.history.len() {
            let entry = self.history.entries()[i];
            if entry.fingerprint != fingerprint {
                continue;
            }
            if !self.history.same_position(i, &self.scratch) {
                continue;
            }
            match self.ruleset.superko {
                Superko::Positional => return Err(IllegalMove::PositionalSuperko),
                Superko::Situational if entry.mover == mover => {
                    return Err(IllegalMove::SituationalSuperko);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn record(&mut self, mv: Move) {
        let entry = HistoryEntry {
            mv: Some(mv),
            fingerprint: self.board.fingerprint(),
            mover: mv.color,
        };
        self.history.push(entry, &self.board);
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.board)
    }
}

/// Place a stone and remove any opponent groups it leaves without
/// liberties.
///
/// Returns `true` when nothing was captured and the mover's own group is
/// left without liberties; `group` then holds that group, ready to be
/// removed or reported as suicide.
pub(crate) fn resolve_placement(board: &mut Board, mv: Move, group: &mut Group) -> bool {
    let Some(v) = mv.vertex else {
        return false;
    };
    board.place(mv);

    let opponent = mv.color.opponent();
    let mut captured = false;
    for adj in board.neighbors(v) {
        // Re-read: an earlier neighbor's removal may have taken this stone
        if board.color_at(adj) != Some(opponent) {
            continue;
        }
        group.expand_all_if_dead(board, adj);
        if !group.is_alive() {
            board.remove_group(group);
            captured = true;
        }
    }

    if captured {
        return false;
    }
    group.expand_all_if_dead(board, v);
    !group.is_alive()
}
