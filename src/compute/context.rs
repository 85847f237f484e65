//! Shared, read-mostly state of one run.

use crate::schema::{FitnessWeights, Grid};

use super::ExploredMap;

/// Grid, exploration record and weights shared by the engine, the
/// evaluator pool and the planner. Created once per run, usually behind an
/// `Arc` so evaluator threads can hold it.
#[derive(Debug)]
pub struct SearchContext {
    grid: Grid,
    explored: ExploredMap,
    weights: FitnessWeights,
}

impl SearchContext {
    pub fn new(grid: Grid, weights: FitnessWeights) -> Self {
        let explored = ExploredMap::new(&grid);
        Self {
            grid,
            explored,
            weights,
        }
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn explored(&self) -> &ExploredMap {
        &self.explored
    }

    #[inline]
    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }
}
