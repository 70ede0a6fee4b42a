//! Fixed-size Go board with an incremental position fingerprint.
//!
//! Cells are stored row-major in a flat vector. The fingerprint is the XOR
//! of one random key per occupied (cell, color) pair, so placing or removing
//! a stone updates it in O(1). Fingerprints can collide; two boards are only
//! equal when every cell matches (see [`Board::eq`]).

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::constants::{COORD_ALPHABET, FINGERPRINT_SEED, PRECOMPUTED_MAX_SIZE};
use crate::error::ConfigError;
use crate::group::Group;
use crate::moves::Move;

/// Stone color. Black moves first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    /// The other color.
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// `+1` for Black, `-1` for White.
    pub fn sign(self) -> i8 {
        match self {
            Color::Black => 1,
            Color::White => -1,
        }
    }

    /// Letter used in the move text encoding.
    pub fn letter(self) -> char {
        match self {
            Color::Black => 'B',
            Color::White => 'W',
        }
    }

    fn key_slot(self) -> usize {
        match self {
            Color::Black => 0,
            Color::White => 1,
        }
    }
}

/// A board coordinate. Only meaningful relative to a board's dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Vertex {
    pub row: usize,
    pub col: usize,
}

impl Vertex {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Shared key table for every board up to 19x19.
fn shared_keys() -> Arc<[u64]> {
    static KEYS: OnceLock<Arc<[u64]>> = OnceLock::new();
    KEYS.get_or_init(|| {
        random_keys(
            PRECOMPUTED_MAX_SIZE * PRECOMPUTED_MAX_SIZE,
            FINGERPRINT_SEED,
        )
    })
    .clone()
}

fn random_keys(cells: usize, seed: u64) -> Arc<[u64]> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..cells * 2).map(|_| rng.u64(..)).collect()
}

/// A `rows x cols` Go board.
#[derive(Clone, Debug)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Option<Color>>,
    fingerprint: u64,
    keys: Arc<[u64]>,
}

impl Board {
    /// Create an empty board. Dimensions are validated by the caller
    /// ([`GameState::new`](crate::game::GameState::new) accepts 1 to 52).
    pub fn new(rows: usize, cols: usize) -> Self {
        let keys = if rows <= PRECOMPUTED_MAX_SIZE && cols <= PRECOMPUTED_MAX_SIZE {
            shared_keys()
        } else {
            random_keys(rows * cols, FINGERPRINT_SEED ^ (((rows as u64) << 32) | cols as u64))
        };
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
            fingerprint: 0,
            keys,
        }
    }

    /// Create an empty board with an explicit fingerprint key table.
    ///
    /// The table holds two keys per cell (Black, White), indexed by cell in
    /// row-major order. A table with repeated keys makes collisions easy to
    /// construct.
    pub fn with_keys(rows: usize, cols: usize, keys: Arc<[u64]>) -> Result<Self, ConfigError> {
        let expected = rows
            .checked_mul(cols)
            .and_then(|cells| cells.checked_mul(2))
            .ok_or(ConfigError::InvalidDimensions { rows, cols })?;
        if keys.len() < expected {
            return Err(ConfigError::KeyTableSize {
                expected,
                actual: keys.len(),
            });
        }
        Ok(Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
            fingerprint: 0,
            keys,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Current position fingerprint. Zero for an empty board.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    #[inline]
    fn idx(&self, v: Vertex) -> usize {
        v.row * self.cols + v.col
    }

    #[inline]
    fn key(&self, i: usize, color: Color) -> u64 {
        self.keys[i * 2 + color.key_slot()]
    }

    /// Check if the vertex is on the board.
    #[inline]
    pub fn exists(&self, v: Vertex) -> bool {
        v.row < self.rows && v.col < self.cols
    }

    /// Stone at a vertex, or `None` if the vertex is empty or off the board.
    #[inline]
    pub fn color_at(&self, v: Vertex) -> Option<Color> {
        if !self.exists(v) {
            return None;
        }
        self.cells[self.idx(v)]
    }

    /// Orthogonal neighbors of a vertex that lie on the board.
    pub fn neighbors(&self, v: Vertex) -> impl Iterator<Item = Vertex> + use<> {
        let (rows, cols) = (self.rows, self.cols);
        let candidates = [
            (v.row > 0).then(|| Vertex::new(v.row - 1, v.col)),
            (v.row + 1 < rows).then(|| Vertex::new(v.row + 1, v.col)),
            (v.col > 0).then(|| Vertex::new(v.row, v.col - 1)),
            (v.col + 1 < cols).then(|| Vertex::new(v.row, v.col + 1)),
        ];
        candidates.into_iter().flatten()
    }

    /// Put a stone on the board and update the fingerprint.
    ///
    /// Passes are ignored. Occupancy is not checked here: a stone placed on
    /// an occupied vertex replaces it, which is what setup moves need. The
    /// caller guarantees the vertex exists.
    pub fn place(&mut self, mv: Move) {
        let Some(v) = mv.vertex else {
            return;
        };
        let i = self.idx(v);
        if let Some(old) = self.cells[i] {
            self.fingerprint ^= self.key(i, old);
        }
        self.cells[i] = Some(mv.color);
        self.fingerprint ^= self.key(i, mv.color);
    }

    /// Remove every stone of a group and update the fingerprint.
    pub fn remove_group(&mut self, group: &Group) {
        for &v in group.interior() {
            let i = self.idx(v);
            if let Some(old) = self.cells[i].take() {
                self.fingerprint ^= self.key(i, old);
            }
        }
    }

    /// Remove all stones and reset the fingerprint.
    pub fn clear(&mut self) {
        self.cells.fill(None);
        self.fingerprint = 0;
    }

    /// Make this board an exact copy of `other`, reusing the allocation when
    /// the dimensions already match.
    pub fn copy_from(&mut self, other: &Board) {
        if self.cells.len() == other.cells.len() {
            self.cells.copy_from_slice(&other.cells);
        } else {
            self.cells.clone_from(&other.cells);
        }
        self.rows = other.rows;
        self.cols = other.cols;
        self.fingerprint = other.fingerprint;
        if !Arc::ptr_eq(&self.keys, &other.keys) {
            self.keys = other.keys.clone();
        }
    }

    /// Number of stones on the board.
    pub fn stone_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

impl PartialEq for Board {
    /// Exact comparison of dimensions and every cell. The fingerprint is
    /// deliberately not consulted.
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.cells == other.cells
    }
}

impl Eq for Board {}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = |i: usize| COORD_ALPHABET.get(i).map_or('?', |&b| b as char);
        write!(f, " ")?;
        for col in 0..self.cols {
            write!(f, " {}", label(col))?;
        }
        writeln!(f)?;
        for row in 0..self.rows {
            write!(f, "{}", label(row))?;
            for col in 0..self.cols {
                let ch = match self.color_at(Vertex::new(row, col)) {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                write!(f, " {ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
