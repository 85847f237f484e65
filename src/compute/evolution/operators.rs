//! Path manipulation utilities for evolutionary search.
//!
//! Provides random construction, parent selection, crossover, and mutation.

use rand::prelude::*;

use crate::schema::{Cell, Grid, Move, Path, Point, UNEVALUATED};

use super::SearchError;

/// Direction draws per step before a random path is cut short.
const STEP_ATTEMPTS: usize = 20;

/// Redraws of the second parent while it equals the first.
const PARENT_RETRIES: usize = 10;

/// Non-empty set of cells robots may start from: the open top layer.
#[derive(Debug, Clone)]
pub struct StartCells {
    cells: Vec<Point>,
}

impl StartCells {
    pub fn from_grid(grid: &Grid) -> Result<Self, SearchError> {
        let cells = grid.top_layer_openings();
        if cells.is_empty() {
            return Err(SearchError::NoStartCell);
        }
        Ok(Self { cells })
    }

    pub fn as_slice(&self) -> &[Point] {
        &self.cells
    }
}

/// Random number generator wrapper for path operations.
pub struct PathRng {
    rng: StdRng,
}

impl PathRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// True with probability `p`.
    #[inline]
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.r#gen::<f64>() < p
    }

    /// Uniform random move.
    #[inline]
    pub fn random_move(&mut self) -> Move {
        Move::ALL[self.rng.gen_range(0..Move::ALL.len())]
    }

    /// Build a valid random path.
    ///
    /// Starts on a uniformly chosen open top-layer cell and extends greedily
    /// with random moves that stay on passable cells, up to the grid volume.
    /// The path ends early when no direction works after a few draws or
    /// right after a survivor is reached.
    pub fn random_individual(&mut self, grid: &Grid, starts: &StartCells) -> Path {
        let start = starts.cells[self.rng.gen_range(0..starts.cells.len())];
        let max_len = grid.volume();
        let mut moves = Vec::new();
        let mut pos = start;

        while moves.len() < max_len {
            let Some((m, next)) = (0..STEP_ATTEMPTS)
                .map(|_| {
                    let m = self.random_move();
                    (m, m.apply(pos))
                })
                .find(|&(_, next)| grid.is_passable(next))
            else {
                break;
            };

            moves.push(m);
            pos = next;
            if grid.cell(pos) == Some(Cell::Survivor) {
                break;
            }
        }

        Path::new(start, moves)
    }

    /// Pick two parent indices from a population sorted by descending fitness.
    ///
    /// Both are drawn from the top fifth (at least two). The second parent
    /// is redrawn while it has the same route as the first, and falls back
    /// to the neighbour of the first if that keeps happening.
    pub fn select_parents(&mut self, population: &[Path]) -> (usize, usize) {
        let pool = (population.len() / 5).max(2).min(population.len());
        let first = self.rng.gen_range(0..pool);

        let mut second = first;
        for _ in 0..PARENT_RETRIES {
            second = self.rng.gen_range(0..pool);
            if !population[second].same_route(&population[first]) {
                return (first, second);
            }
        }

        if population[second].same_route(&population[first]) {
            second = (first + 1) % pool;
        }
        (first, second)
    }

    /// Single-point crossover.
    ///
    /// For a cut drawn in `0..=min_len - 2`, the child takes `p1`'s moves up
    /// to and including the cut and `p2`'s moves after it, with length
    /// `min_len`. Parents shorter than two moves give an unevaluated copy
    /// of `p1`.
    pub fn crossover(&mut self, p1: &Path, p2: &Path) -> Path {
        let min_len = p1.len().min(p2.len());
        if min_len < 2 {
            let mut child = p1.clone();
            child.fitness = UNEVALUATED;
            return child;
        }

        let cut = self.rng.gen_range(0..min_len - 1);
        let mut moves = Vec::with_capacity(min_len);
        moves.extend_from_slice(&p1.moves[..=cut]);
        moves.extend_from_slice(&p2.moves[cut + 1..min_len]);

        Path::new(p1.start, moves)
    }

    /// With probability `rate`, replace one random move of `child`.
    ///
    /// Paths of two moves or fewer are left alone. The new move is not
    /// checked against the grid. Returns whether a move was replaced.
    pub fn mutate(&mut self, child: &mut Path, rate: f64) -> bool {
        if child.len() <= 2 || !self.chance(rate) {
            return false;
        }
        let idx = self.rng.gen_range(0..child.len());
        child.moves[idx] = self.random_move();
        true
    }
}
