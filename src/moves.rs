//! Moves and their text encoding.
//!
//! A move is written `<color><col><row>`, e.g. `Bcd`, where the color is
//! `B` or `W` and each coordinate letter comes from a 52-symbol alphabet
//! (`a`-`z` = 0-25, `A`-`Z` = 26-51). A bare `B` or `W` is a pass. This is
//! the encoding stored in datasets, so it must not change.

use std::fmt;
use std::str::FromStr;

use crate::board::{Color, Vertex};
use crate::constants::COORD_ALPHABET;
use crate::error::MoveSyntaxError;

/// A move by one player: a stone at a vertex, or a pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub color: Color,
    /// `None` for a pass.
    pub vertex: Option<Vertex>,
}

impl Move {
    /// A stone at `(row, col)`.
    pub fn play(color: Color, row: usize, col: usize) -> Self {
        Self {
            color,
            vertex: Some(Vertex::new(row, col)),
        }
    }

    /// A pass.
    pub fn pass(color: Color) -> Self {
        Self {
            color,
            vertex: None,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.vertex.is_none()
    }
}

/// Convert a coordinate letter to its index.
pub fn letter_to_coord(letter: u8) -> Option<usize> {
    match letter {
        b'a'..=b'z' => Some((letter - b'a') as usize),
        b'A'..=b'Z' => Some((letter - b'A') as usize + 26),
        _ => None,
    }
}

/// Convert an index to its coordinate letter, or `None` past the alphabet.
pub fn coord_to_letter(coord: usize) -> Option<char> {
    COORD_ALPHABET.get(coord).map(|&b| b as char)
}

impl FromStr for Move {
    type Err = MoveSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 1 && bytes.len() != 3 {
            return Err(MoveSyntaxError::Length(s.to_string()));
        }

        let color = match bytes[0] {
            b'B' => Color::Black,
            b'W' => Color::White,
            _ => return Err(MoveSyntaxError::Color(s.to_string())),
        };

        if bytes.len() == 1 {
            return Ok(Move::pass(color));
        }

        match (letter_to_coord(bytes[2]), letter_to_coord(bytes[1])) {
            (Some(row), Some(col)) => Ok(Move::play(color, row, col)),
            _ => Err(MoveSyntaxError::Coordinates(s.to_string())),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.color.letter())?;
        if let Some(v) = self.vertex {
            let col = coord_to_letter(v.col).unwrap_or('?');
            let row = coord_to_letter(v.row).unwrap_or('?');
            write!(f, "{col}{row}")?;
        }
        Ok(())
    }
}

/// Parse a list of move strings, stopping at the first malformed one.
pub fn parse_moves<S: AsRef<str>>(moves: &[S]) -> Result<Vec<Move>, MoveSyntaxError> {
    moves.iter().map(|m| m.as_ref().parse()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_parse() {
        let m: Move = "Wab".parse().unwrap();
        assert_eq!(m, Move::play(Color::White, 1, 0));

        let m: Move = "B".parse().unwrap();
        assert_eq!(m, Move::pass(Color::Black));
        assert!(m.is_pass());

        let m: Move = "BAZ".parse().unwrap();
        assert_eq!(m, Move::play(Color::Black, 51, 26));
    }

    #[test]
    fn test_malformed_moves() {
        assert_eq!(
            "Zab".parse::<Move>(),
            Err(MoveSyntaxError::Color("Zab".into()))
        );
        assert_eq!(
            "W~5".parse::<Move>(),
            Err(MoveSyntaxError::Coordinates("W~5".into()))
        );
        assert_eq!("Wa".parse::<Move>(), Err(MoveSyntaxError::Length("Wa".into())));
        assert_eq!("".parse::<Move>(), Err(MoveSyntaxError::Length("".into())));
    }

    #[test]
    fn test_move_print() {
        assert_eq!(Move::play(Color::Black, 5, 26).to_string(), "BAf");
        assert_eq!(Move::play(Color::White, 5, 100).to_string(), "W?f");
        assert_eq!(Move::pass(Color::White).to_string(), "W");
    }

    #[test]
    fn test_letters_cover_alphabet() {
        for coord in 0..52 {
            let letter = coord_to_letter(coord).unwrap();
            assert_eq!(letter_to_coord(letter as u8), Some(coord));
        }
        assert_eq!(coord_to_letter(52), None);
    }

    #[test]
    fn test_parse_moves_stops_at_first_error() {
        assert_eq!(parse_moves(&["Baa", "W"]).unwrap().len(), 2);
        assert_eq!(
            parse_moves(&["Baa", "Xbb", "W!!"]),
            Err(MoveSyntaxError::Color("Xbb".into()))
        );
    }
}
