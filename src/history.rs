//! Move history and superko confirmation strategies.
//!
//! Every committed move is recorded with the fingerprint of the position it
//! produced. A fingerprint match is only a candidate repeat; the history
//! then confirms it by exact board comparison. How that comparison gets the
//! earlier board is the strategy:
//!
//! - [`SnapshotHistory`] keeps a full board per entry. O(moves * cells)
//!   memory, O(cells) per confirmation.
//! - [`ReplayHistory`] keeps only the moves and replays them from the root
//!   position. O(moves) memory, O(moves) per confirmation.
//! - [`FingerprintHistory`] trusts the fingerprint. Fastest, but a hash
//!   collision turns a legal move into a false superko rejection. Opt-in.

use std::fmt;

use crate::board::{Board, Color};
use crate::group::Group;
use crate::moves::Move;

/// One recorded position.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    /// The move that produced the position; `None` for the root.
    pub mv: Option<Move>,
    /// Fingerprint of the resulting position.
    pub fingerprint: u64,
    /// Player who produced the position. The root counts as White's, so
    /// Black may not recreate the empty board under situational superko.
    pub mover: Color,
}

impl HistoryEntry {
    fn root(board: &Board) -> Self {
        Self {
            mv: None,
            fingerprint: board.fingerprint(),
            mover: Color::White,
        }
    }
}

/// Selects the history strategy when a game is created.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SuperkoConfirm {
    /// Keep a board snapshot per move.
    #[default]
    Snapshot,
    /// Replay the move list to rebuild earlier positions.
    Replay,
    /// Trust fingerprints without exact comparison.
    FingerprintOnly,
}

impl SuperkoConfirm {
    /// Build an empty history rooted at `root`.
    pub fn build(self, root: &Board) -> Box<dyn PositionHistory> {
        let mut history: Box<dyn PositionHistory> = match self {
            SuperkoConfirm::Snapshot => Box::new(SnapshotHistory::default()),
            SuperkoConfirm::Replay => Box::new(ReplayHistory::new(root)),
            SuperkoConfirm::FingerprintOnly => Box::new(FingerprintHistory::default()),
        };
        history.reset(root);
        history
    }
}

/// Ordered record of positions reached in a game.
pub trait PositionHistory: Send + fmt::Debug {
    /// Forget everything and start again from `root`.
    fn reset(&mut self, root: &Board);

    /// Record a committed move and the board it produced.
    fn push(&mut self, entry: HistoryEntry, board: &Board);

    fn entries(&self) -> &[HistoryEntry];

    /// Whether the position at `index` is exactly `candidate`.
    ///
    /// Only called after the fingerprints matched.
    fn same_position(&mut self, index: usize, candidate: &Board) -> bool;

    fn len(&self) -> usize {
        self.entries().len()
    }

    fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

// =============================================================================
// Snapshots
// =============================================================================

#[derive(Debug, Default)]
pub struct SnapshotHistory {
    entries: Vec<HistoryEntry>,
    boards: Vec<Board>,
}

impl PositionHistory for SnapshotHistory {
    fn reset(&mut self, root: &Board) {
        self.entries.clear();
        self.boards.clear();
        self.entries.push(HistoryEntry::root(root));
        self.boards.push(root.clone());
    }

    fn push(&mut self, entry: HistoryEntry, board: &Board) {
        self.entries.push(entry);
        self.boards.push(board.clone());
    }

    fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    fn same_position(&mut self, index: usize, candidate: &Board) -> bool {
        self.boards[index] == *candidate
    }
}

// =============================================================================
// Replay
// =============================================================================

#[derive(Debug)]
pub struct ReplayHistory {
    entries: Vec<HistoryEntry>,
    root: Board,
    scratch: Board,
    group: Group,
}

impl ReplayHistory {
    pub fn new(root: &Board) -> Self {
        Self {
            entries: Vec::new(),
            root: root.clone(),
            scratch: root.clone(),
            group: Group::new(),
        }
    }
}

impl PositionHistory for ReplayHistory {
    fn reset(&mut self, root: &Board) {
        self.entries.clear();
        self.root.copy_from(root);
        self.entries.push(HistoryEntry::root(root));
    }

    fn push(&mut self, entry: HistoryEntry, _board: &Board) {
        self.entries.push(entry);
    }

    fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    fn same_position(&mut self, index: usize, candidate: &Board) -> bool {
        self.scratch.copy_from(&self.root);
        for entry in &self.entries[1..=index] {
            if let Some(mv) = entry.mv {
                replay_stone(&mut self.scratch, mv, &mut self.group);
            }
        }
        self.scratch == *candidate
    }
}

/// Re-apply a recorded move: place it, resolve captures, and remove the
/// mover's own group if it has no liberties. A recorded move was accepted
/// once, so no legality checks are needed.
fn replay_stone(board: &mut Board, mv: Move, group: &mut Group) {
    if mv.is_pass() {
        return;
    }
    if crate::game::resolve_placement(board, mv, group) {
        board.remove_group(group);
    }
}

// =============================================================================
// Fingerprint only
// =============================================================================

#[derive(Debug, Default)]
pub struct FingerprintHistory {
    entries: Vec<HistoryEntry>,
}

impl PositionHistory for FingerprintHistory {
    fn reset(&mut self, root: &Board) {
        self.entries.clear();
        self.entries.push(HistoryEntry::root(root));
    }

    fn push(&mut self, entry: HistoryEntry, _board: &Board) {
        self.entries.push(entry);
    }

    fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    fn same_position(&mut self, _index: usize, _candidate: &Board) -> bool {
        true
    }
}
