//! Game records as stored in datasets.
//!
//! A [`GameRecord`] is one game parsed out of an archive. Its JSON field
//! names are those of the existing datasets (`Size`, `BlackPlayer`,
//! `GameID`, ...). Moves and setup stones are kept as text and only parsed
//! into [`Move`]s when a stage needs them.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SIZE, LEGACY_PASS, MAX_SIZE, PRECOMPUTED_MAX_SIZE};
use crate::error::{MoveSyntaxError, RecordError};
use crate::moves::{Move, parse_moves};
use crate::pipeline::report::RejectReason;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GameRecord {
    /// `[rows, cols]`
    pub size: [usize; 2],
    pub komi: f64,
    pub handicap: usize,
    /// `"B"`, `"W"`, or empty when there is no result.
    pub winner: String,
    pub score: f64,
    /// Empty for a scored game, otherwise `"Time"`, `"Resign"`,
    /// `"Forfeit"` or `"None"`.
    pub special: String,
    pub black_rank: String,
    pub white_rank: String,
    pub black_player: String,
    pub white_player: String,
    /// Main time in seconds.
    pub time: u32,
    pub overtime: String,
    pub date: String,
    pub moves: Vec<String>,
    pub setup: Vec<String>,
    pub length: usize,
    pub source: String,
    #[serde(rename = "GameID")]
    pub game_id: u32,
    #[serde(rename = "BlackID")]
    pub black_id: u32,
    #[serde(rename = "WhiteID")]
    pub white_id: u32,
}

impl Default for GameRecord {
    fn default() -> Self {
        Self {
            size: [DEFAULT_SIZE, DEFAULT_SIZE],
            komi: 0.0,
            handicap: 0,
            winner: String::new(),
            score: 0.0,
            special: String::new(),
            black_rank: String::new(),
            white_rank: String::new(),
            black_player: String::new(),
            white_player: String::new(),
            time: 0,
            overtime: String::new(),
            date: String::new(),
            moves: Vec::new(),
            setup: Vec::new(),
            length: 0,
            source: String::new(),
            game_id: 0,
            black_id: 0,
            white_id: 0,
        }
    }
}

impl GameRecord {
    /// `(rows, cols)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.size[0], self.size[1])
    }

    /// Check the record for consistency and fill in derived fields.
    ///
    /// - Each dimension must be within `1..=52`.
    /// - The handicap must equal the number of setup stones, all Black.
    ///   Missing setup stones are never inferred from the moves.
    /// - On boards up to 19x19, `tt` is the legacy encoding of a pass.
    /// - `length` is set from the move count when it is zero.
    pub fn normalize(&mut self) -> Result<(), RecordError> {
        let (rows, cols) = self.dimensions();
        if !(1..=MAX_SIZE).contains(&rows) || !(1..=MAX_SIZE).contains(&cols) {
            return Err(RecordError::InvalidSize { rows, cols });
        }
        if self.setup.len() != self.handicap {
            return Err(RecordError::HandicapMismatch {
                handicap: self.handicap,
                setup: self.setup.len(),
            });
        }
        if let Some(stone) = self.setup.iter().find(|s| !s.starts_with('B')) {
            return Err(RecordError::SetupNotBlack(stone.clone()));
        }

        if rows * cols <= PRECOMPUTED_MAX_SIZE * PRECOMPUTED_MAX_SIZE {
            for mv in self.setup.iter_mut().chain(self.moves.iter_mut()) {
                if mv.get(1..) == Some(LEGACY_PASS) {
                    mv.truncate(1);
                }
            }
        }

        if self.length == 0 {
            self.length = self.moves.len();
        }
        Ok(())
    }

    pub fn parsed_setup(&self) -> Result<Vec<Move>, MoveSyntaxError> {
        parse_moves(&self.setup)
    }

    pub fn parsed_moves(&self) -> Result<Vec<Move>, MoveSyntaxError> {
        parse_moves(&self.moves)
    }
}

/// A record on its way through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRecord {
    pub game: GameRecord,
    /// File name of the archive the record was read from.
    pub archive: String,
    /// Set by the first stage that rejects the record. Later stages pass
    /// rejected records through untouched.
    pub rejection: Option<RejectReason>,
}

impl PipelineRecord {
    pub fn new(game: GameRecord, archive: impl Into<String>) -> Self {
        Self {
            game,
            archive: archive.into(),
            rejection: None,
        }
    }

    /// A record rejected before it could be parsed.
    pub fn unparsed(archive: impl Into<String>, reason: RejectReason) -> Self {
        Self {
            game: GameRecord::default(),
            archive: archive.into(),
            rejection: Some(reason),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(size: usize, setup: &[&str], moves: &[&str]) -> GameRecord {
        GameRecord {
            size: [size, size],
            handicap: setup.len(),
            setup: setup.iter().map(|s| s.to_string()).collect(),
            moves: moves.iter().map(|s| s.to_string()).collect(),
            ..GameRecord::default()
        }
    }

    #[test]
    fn test_json_field_names() {
        let line = r#"{"Size":[9,9],"Komi":6.5,"Winner":"W","BlackPlayer":"alice",
            "Moves":["Bcc","Wgg"],"GameID":7,"Source":"kgs"}"#;
        let game: GameRecord = serde_json::from_str(line).unwrap();
        assert_eq!(game.dimensions(), (9, 9));
        assert_eq!(game.komi, 6.5);
        assert_eq!(game.black_player, "alice");
        assert_eq!(game.moves, vec!["Bcc", "Wgg"]);
        assert_eq!(game.game_id, 7);
        assert_eq!(game.handicap, 0, "missing fields take defaults");

        let json = serde_json::to_value(&game).unwrap();
        assert_eq!(json["WhiteID"], 0);
        assert_eq!(json["BlackRank"], "");
    }

    #[test]
    fn test_missing_size_defaults_to_19() {
        let game: GameRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(game.dimensions(), (19, 19));
    }

    #[test]
    fn test_normalize_sizes() {
        assert!(record(1, &[], &[]).normalize().is_ok());
        assert!(record(52, &[], &[]).normalize().is_ok());
        assert_eq!(
            record(0, &[], &[]).normalize(),
            Err(RecordError::InvalidSize { rows: 0, cols: 0 })
        );
        assert_eq!(
            record(53, &[], &[]).normalize(),
            Err(RecordError::InvalidSize { rows: 53, cols: 53 })
        );
    }

    #[test]
    fn test_normalize_handicap() {
        let mut game = record(19, &["Bdd", "Bpp"], &["Wdp"]);
        assert!(game.normalize().is_ok());

        game.handicap = 3;
        assert_eq!(
            game.normalize(),
            Err(RecordError::HandicapMismatch { handicap: 3, setup: 2 })
        );

        let mut game = record(19, &["Bdd", "Wpp"], &[]);
        assert_eq!(game.normalize(), Err(RecordError::SetupNotBlack("Wpp".into())));
    }

    #[test]
    fn test_normalize_does_not_backfill_setup() {
        let mut game = record(19, &[], &["Bdd", "Bpp", "Wdp"]);
        game.handicap = 2;
        assert!(game.normalize().is_err());
        assert!(game.setup.is_empty());
    }

    #[test]
    fn test_legacy_pass() {
        let mut game = record(19, &[], &["Bdd", "Wtt", "Btt"]);
        game.normalize().unwrap();
        assert_eq!(game.moves, vec!["Bdd", "W", "B"]);
        assert_eq!(game.length, 3);

        // On larger boards tt is a real vertex
        let mut game = record(21, &[], &["Btt"]);
        game.normalize().unwrap();
        assert_eq!(game.moves, vec!["Btt"]);
        assert_eq!(game.parsed_moves().unwrap(), vec![Move::play(crate::board::Color::Black, 19, 19)]);
    }

    #[test]
    fn test_length_kept_when_present() {
        let mut game = record(9, &[], &["Bcc"]);
        game.length = 120;
        game.normalize().unwrap();
        assert_eq!(game.length, 120);
    }
}
