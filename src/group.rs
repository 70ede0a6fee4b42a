//! Connected-component search over a [`Board`].
//!
//! A group grows breadth-first from a seed stone: each round moves the
//! frontier into the interior and collects the same-colored neighbors not
//! seen yet as the next frontier. Empty and opposite-colored neighbors are
//! recorded once each as the group's boundary.
//!
//! [`Group::expand_all_if_dead`] stops as soon as an empty neighbor is found
//! and discards the partial result. Most groups touch an empty point early,
//! so only fully surrounded groups pay for a complete expansion.

use crate::board::{Board, Vertex};

/// A group of connected stones, plus the scratch space to find it again.
///
/// The buffers are kept between searches so one `Group` can be reused in a
/// hot loop without reallocating.
#[derive(Debug, Default, Clone)]
pub struct Group {
    interior: Vec<Vertex>,
    frontier: Vec<Vertex>,
    boundary: Vec<Vertex>,
    seen: Vec<bool>,
    cols: usize,
    alive: bool,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the full group containing `seed`.
    pub fn find(board: &Board, seed: Vertex) -> Self {
        let mut group = Self::new();
        group.expand_all(board, seed);
        group
    }

    /// Find the group containing `seed`, unless it turns out to be alive.
    pub fn find_if_dead(board: &Board, seed: Vertex) -> Self {
        let mut group = Self::new();
        group.expand_all_if_dead(board, seed);
        group
    }

    /// Stones in the group. Empty after an `if_dead` search on a live group.
    pub fn interior(&self) -> &[Vertex] {
        &self.interior
    }

    /// Distinct empty or opposite-colored neighbors found so far.
    pub fn boundary(&self) -> &[Vertex] {
        &self.boundary
    }

    /// Whether the group has at least one liberty.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Number of distinct liberties. Only complete after [`Group::expand_all`].
    pub fn liberties(&self, board: &Board) -> usize {
        self.boundary
            .iter()
            .filter(|&&v| board.color_at(v).is_none())
            .count()
    }

    fn reset(&mut self, board: &Board, seed: Vertex) {
        self.interior.clear();
        self.frontier.clear();
        self.boundary.clear();
        self.alive = false;
        self.cols = board.cols();
        self.seen.clear();
        self.seen.resize(board.rows() * board.cols(), false);
        if board.color_at(seed).is_some() {
            self.mark(seed);
            self.frontier.push(seed);
        }
    }

    #[inline]
    fn mark(&mut self, v: Vertex) -> bool {
        let i = v.row * self.cols + v.col;
        !std::mem::replace(&mut self.seen[i], true)
    }

    /// Find all stones connected to `seed`.
    ///
    /// An empty or off-board seed yields an empty group that is not alive.
    pub fn expand_all(&mut self, board: &Board, seed: Vertex) {
        self.reset(board, seed);
        while self.expand(board) > 0 {}
    }

    /// Find all stones connected to `seed`, stopping early if the group has
    /// a liberty. A live group comes back with an empty interior.
    pub fn expand_all_if_dead(&mut self, board: &Board, seed: Vertex) {
        self.reset(board, seed);
        while self.expand(board) > 0 && !self.alive {}
        if self.alive {
            self.interior.clear();
            self.frontier.clear();
            self.boundary.clear();
        }
    }

    /// Grow the group by one ring. Returns the size of the new frontier;
    /// zero means the group is complete.
    fn expand(&mut self, board: &Board) -> usize {
        let start = self.interior.len();
        self.interior.append(&mut self.frontier);

        for k in start..self.interior.len() {
            let v = self.interior[k];
            let color = board.color_at(v);
            for adj in board.neighbors(v) {
                let adj_color = board.color_at(adj);
                if adj_color == color {
                    if self.mark(adj) {
                        self.frontier.push(adj);
                    }
                } else if self.mark(adj) {
                    if adj_color.is_none() {
                        self.alive = true;
                    }
                    self.boundary.push(adj);
                }
            }
        }
        self.frontier.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Color;
    use crate::moves::Move;

    /// X X .
    /// . X .
    /// X O X
    fn diagram() -> Board {
        let mut b = Board::new(3, 3);
        b.place(Move::play(Color::Black, 0, 0));
        b.place(Move::play(Color::Black, 0, 1));
        b.place(Move::play(Color::Black, 1, 1));
        b.place(Move::play(Color::Black, 2, 0));
        b.place(Move::play(Color::White, 2, 1));
        b.place(Move::play(Color::Black, 2, 2));
        b
    }

    #[test]
    fn test_basic_group_expansion() {
        let b = diagram();

        let g = Group::find(&b, Vertex::new(0, 1));
        assert_eq!(g.interior().len(), 3, "failed to find all connected vertices");
        assert!(g.frontier.is_empty(), "expansion left vertices in frontier");
        assert!(g.is_alive(), "group incorrectly marked as dead");
        assert_eq!(g.liberties(&b), 3);

        let g = Group::find(&b, Vertex::new(2, 1));
        assert!(!g.is_alive(), "group incorrectly marked as alive");
        assert_eq!(g.interior(), &[Vertex::new(2, 1)]);
        assert_eq!(g.liberties(&b), 0);
    }

    #[test]
    fn test_interior_is_order_independent() {
        let b = diagram();
        let mut expected = vec![Vertex::new(0, 0), Vertex::new(0, 1), Vertex::new(1, 1)];
        expected.sort_by_key(|v| (v.row, v.col));
        for seed in expected.clone() {
            let mut found = Group::find(&b, seed).interior().to_vec();
            found.sort_by_key(|v| (v.row, v.col));
            assert_eq!(found, expected, "seed {seed:?} found a different group");
        }
    }

    #[test]
    fn test_if_dead_discards_live_group() {
        let b = diagram();
        let g = Group::find_if_dead(&b, Vertex::new(0, 1));
        assert!(g.is_alive());
        assert!(g.interior().is_empty(), "partial result was kept");

        let g = Group::find_if_dead(&b, Vertex::new(2, 1));
        assert!(!g.is_alive());
        assert_eq!(g.interior().len(), 1);
    }

    #[test]
    fn test_surrounded_group_is_fully_expanded() {
        // . X X .
        // X O O X
        // . X X .
        let mut b = Board::new(3, 4);
        for (r, c) in [(0, 1), (0, 2), (1, 0), (1, 3), (2, 1), (2, 2)] {
            b.place(Move::play(Color::Black, r, c));
        }
        b.place(Move::play(Color::White, 1, 1));
        b.place(Move::play(Color::White, 1, 2));

        let g = Group::find_if_dead(&b, Vertex::new(1, 2));
        assert!(!g.is_alive());
        assert_eq!(g.interior().len(), 2);
        assert_eq!(g.boundary().len(), 6);
    }

    #[test]
    fn test_empty_seed() {
        let b = Board::new(3, 3);
        let g = Group::find(&b, Vertex::new(1, 1));
        assert!(g.interior().is_empty());
        assert!(!g.is_alive());
    }

    #[test]
    fn test_reuse_between_boards() {
        let mut g = Group::new();
        let big = diagram();
        g.expand_all(&big, Vertex::new(0, 0));
        assert_eq!(g.interior().len(), 3);

        let mut small = Board::new(1, 2);
        small.place(Move::play(Color::White, 0, 0));
        g.expand_all(&small, Vertex::new(0, 0));
        assert_eq!(g.interior().len(), 1);
        assert!(g.is_alive());
    }
}
