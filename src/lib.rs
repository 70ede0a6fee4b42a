//! Weiqi-Dataset: cleaning and validating archives of Go game records.
//!
//! The crate has two halves:
//!
//! - A legality engine that replays a game and enforces occupancy,
//!   captures, suicide and superko under a configurable ruleset.
//! - A concurrent pipeline that runs archives of parsed records through
//!   length, duplicate, legality and player filters, then anonymizes them,
//!   with bounded queues, cancellation and per-archive failure isolation.
//!
//! ## Modules
//!
//! - [`board`] - Grid of stones with an incremental position fingerprint
//! - [`group`] - Connected-group and liberty search
//! - [`moves`] - Moves and their text encoding
//! - [`rules`] - Ruleset presets
//! - [`history`] - Move history and superko confirmation strategies
//! - [`game`] - The game state machine
//! - [`legality`] - Whole-record legality checking
//! - [`record`] - Game records as stored in datasets
//! - [`dedup`] - Duplicate detection
//! - [`identity`] - Unique identifier issuance
//! - [`pipeline`] - Worker-pool stages, filters and the archive runner
//! - [`io`] - JSON-lines archives and side files
//!
//! ## Example
//!
//! ```
//! use weiqi_dataset::legality::{check_legal, Verdict};
//! use weiqi_dataset::moves::parse_moves;
//!
//! let moves = parse_moves(&["Bdd", "Wpp", "Bdp"]).unwrap();
//! let verdict = check_legal(19, 19, &[], &moves, "NZ").unwrap();
//! assert_eq!(verdict, Verdict::Legal);
//! ```

pub mod board;
pub mod constants;
pub mod dedup;
pub mod error;
pub mod game;
pub mod group;
pub mod history;
pub mod identity;
pub mod io;
pub mod legality;
pub mod logging;
pub mod moves;
pub mod pipeline;
pub mod record;
pub mod rules;
