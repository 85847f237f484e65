//! Robot routes: unit moves and the searchable path type.

use serde::{Deserialize, Serialize};

use super::Point;

/// Fitness value of a path that has not been evaluated yet.
pub const UNEVALUATED: f64 = 0.0;

/// One of the six unit steps along the grid axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Move {
    /// All moves in canonical order.
    pub const ALL: [Move; 6] = [
        Move::PosX,
        Move::NegX,
        Move::PosY,
        Move::NegY,
        Move::PosZ,
        Move::NegZ,
    ];

    /// Coordinate delta of this move.
    #[inline]
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Move::PosX => (1, 0, 0),
            Move::NegX => (-1, 0, 0),
            Move::PosY => (0, 1, 0),
            Move::NegY => (0, -1, 0),
            Move::PosZ => (0, 0, 1),
            Move::NegZ => (0, 0, -1),
        }
    }

    /// The move that undoes this one.
    #[inline]
    pub fn opposite(self) -> Move {
        match self {
            Move::PosX => Move::NegX,
            Move::NegX => Move::PosX,
            Move::PosY => Move::NegY,
            Move::NegY => Move::PosY,
            Move::PosZ => Move::NegZ,
            Move::NegZ => Move::PosZ,
        }
    }

    /// Point reached by applying this move to `p`.
    #[inline]
    pub fn apply(self, p: Point) -> Point {
        let (dx, dy, dz) = self.delta();
        Point::new(p.x + dx, p.y + dy, p.z + dz)
    }
}

/// A candidate robot route: start cell, ordered moves and fitness.
///
/// The move buffer is owned; `Clone` copies it, so elites and best-path
/// records never share storage with the candidate they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub start: Point,
    pub moves: Vec<Move>,
    pub fitness: f64,
}

impl Path {
    /// Unevaluated path.
    pub fn new(start: Point, moves: Vec<Move>) -> Self {
        Self {
            start,
            moves,
            fitness: UNEVALUATED,
        }
    }

    /// Zero-length path at `start`.
    pub fn empty(start: Point) -> Self {
        Self::new(start, Vec::new())
    }

    /// Number of moves.
    #[inline]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Start followed by the position after each move.
    pub fn positions(&self) -> impl Iterator<Item = Point> + '_ {
        std::iter::once(self.start).chain(self.moves.iter().scan(self.start, |pos, m| {
            *pos = m.apply(*pos);
            Some(*pos)
        }))
    }

    /// Final position after replaying every move.
    pub fn end(&self) -> Point {
        self.moves.iter().fold(self.start, |pos, m| m.apply(pos))
    }

    /// Same length and same move sequence. Starts are not compared.
    pub fn same_route(&self, other: &Path) -> bool {
        self.moves == other.moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_undoes_move() {
        let p = Point::new(3, -2, 7);
        for m in Move::ALL {
            assert_eq!(m.opposite().apply(m.apply(p)), p);
            assert_ne!(m.opposite(), m);
        }
    }

    #[test]
    fn test_positions_follow_deltas() {
        let path = Path::new(
            Point::new(0, 0, 0),
            vec![Move::PosX, Move::PosX, Move::PosY, Move::NegZ],
        );
        let positions: Vec<_> = path.positions().collect();
        assert_eq!(
            positions,
            vec![
                Point::new(0, 0, 0),
                Point::new(1, 0, 0),
                Point::new(2, 0, 0),
                Point::new(2, 1, 0),
                Point::new(2, 1, -1),
            ]
        );
        assert_eq!(path.end(), Point::new(2, 1, -1));
        assert_eq!(positions.len(), path.len() + 1);
    }

    #[test]
    fn test_clone_owns_moves() {
        let original = Path::new(Point::default(), vec![Move::PosX, Move::PosY]);
        let mut copy = original.clone();
        copy.moves[0] = Move::NegZ;
        assert_eq!(original.moves[0], Move::PosX);
        assert!(!original.same_route(&copy));
    }

    #[test]
    fn test_same_route_ignores_start_and_fitness() {
        let mut a = Path::new(Point::new(0, 0, 0), vec![Move::PosX]);
        let b = Path::new(Point::new(5, 5, 5), vec![Move::PosX]);
        a.fitness = 12.0;
        assert!(a.same_route(&b));
        assert!(!a.same_route(&Path::empty(Point::default())));
    }
}
