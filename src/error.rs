//! Error types shared across the engine and the pipeline.
//!
//! Illegal moves are ordinary outcomes of validation and are reported as
//! values ([`IllegalMove`], [`MoveError`]). The remaining errors are either
//! fatal to a single record ([`MoveSyntaxError`], [`RecordError`]) or fatal
//! to the whole run ([`ConfigError`], [`IdentityExhausted`]).

use thiserror::Error;

use crate::moves::Move;

/// Why a move was rejected by the legality engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum IllegalMove {
    /// It is the other player's turn
    #[error("wrong player")]
    WrongPlayer,
    /// The vertex lies outside the board
    #[error("outside board")]
    OutsideBoard,
    /// There is already a stone at the vertex
    #[error("vertex not empty")]
    VertexNotEmpty,
    /// The move leaves its own group without liberties and captures nothing
    #[error("suicide")]
    Suicide,
    /// The same position was created before with the same player to move
    #[error("violates situational superko")]
    SituationalSuperko,
    /// The same position was created before
    #[error("violates positional superko")]
    PositionalSuperko,
}

/// An [`IllegalMove`] together with the move that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("move \"{attempted}\" invalid: {kind}")]
pub struct MoveError {
    pub kind: IllegalMove,
    pub attempted: Move,
}

/// Malformed move text at the record boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveSyntaxError {
    #[error("invalid move string: {0:?}")]
    Length(String),
    #[error("invalid color in move: {0:?}")]
    Color(String),
    #[error("invalid coordinates in move: {0:?}")]
    Coordinates(String),
}

/// Caller or configuration defects, surfaced before any record is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("ruleset not supported: {0:?}")]
    UnknownRuleset(String),
    #[error("invalid board dimensions {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },
    #[error("fingerprint table has {actual} keys, board needs {expected}")]
    KeyTableSize { expected: usize, actual: usize },
    #[error("worker count must be at least 1")]
    InvalidWorkers,
    #[error("queue capacity must be at least 1")]
    InvalidQueueCapacity,
    #[error("{name} should be between 0 and 1, got {value}")]
    InvalidFraction { name: &'static str, value: f64 },
    #[error("failed to compile blacklist pattern {pattern:?}: {message}")]
    InvalidBlacklist { pattern: String, message: String },
}

/// The identifier generator kept colliding with issued identifiers.
///
/// The identifier space is far larger than any expected issuance volume, so
/// this indicates a broken generator rather than a full table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("random number cycle detected after {attempts} attempts")]
pub struct IdentityExhausted {
    pub attempts: usize,
}

/// A record that cannot be processed. Fatal to that record only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("unsupported board size {rows}x{cols}")]
    InvalidSize { rows: usize, cols: usize },
    #[error("handicap {handicap} has {setup} setup stones")]
    HandicapMismatch { handicap: usize, setup: usize },
    #[error("setup stone not black: {0:?}")]
    SetupNotBlack(String),
    #[error(transparent)]
    MoveSyntax(#[from] MoveSyntaxError),
}

/// Failure to read the next record from an archive.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The line was read but is not a record. Fatal to that record only.
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
    /// The archive itself is unreadable. Fatal to the archive.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A worker failure that stops the whole pipeline.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Identity(#[from] IdentityExhausted),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start {stage} worker")]
    Spawn {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} worker panicked")]
    Panicked { stage: &'static str },
}
