//! Team assembly, inter-robot collision analysis and team fitness.

use rayon::prelude::*;
use serde::Serialize;

use crate::schema::{FitnessWeights, Grid, Path, Point};

use super::{RouteTally, tally_route};

/// One path per worker slot, in slot order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Team {
    paths: Vec<Path>,
}

impl Team {
    pub fn new(paths: Vec<Path>) -> Self {
        Self { paths }
    }

    /// Build a team from per-slot best paths.
    ///
    /// A slot that never served an evaluation gets a zero-length path at the
    /// origin.
    pub fn assemble(best_per_slot: &[Option<Path>]) -> Self {
        let paths = best_per_slot
            .iter()
            .enumerate()
            .map(|(slot, best)| match best {
                Some(path) => path.clone(),
                None => {
                    log::warn!("slot {slot} has no evaluated path, using an empty one");
                    Path::empty(Point::default())
                }
            })
            .collect();
        Self { paths }
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn longest(&self) -> usize {
        self.paths.iter().map(Path::len).max().unwrap_or(0)
    }
}

/// Conflict counts across a team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollisionReport {
    /// Cells shared by robots over the whole run, one per extra robot.
    pub total_spatial_collisions: u32,
    /// Robot pairs in the same cell at the same time step.
    pub total_temporal_collisions: u32,
    /// Distinct cells visited by more than one robot.
    pub conflicted_cells_count: u32,
}

impl CollisionReport {
    pub fn is_clear(&self) -> bool {
        self.total_spatial_collisions == 0 && self.total_temporal_collisions == 0
    }
}

/// Collision report and penalized fitness of one team.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TeamAnalysis {
    pub collisions: CollisionReport,
    /// Summed route terms of every member.
    pub tally: RouteTally,
    /// Summed member score minus the collision penalty.
    pub fitness: f64,
}

/// Count temporal and spatial conflicts.
///
/// A robot occupies its start at `t = 0` and the cell after move `t` at
/// time `t`, and disappears once its route has ended. Cells off the grid
/// are ignored for spatial counting.
pub fn detect_collisions(grid: &Grid, team: &Team) -> CollisionReport {
    let trajectories: Vec<Vec<Point>> = team
        .paths
        .par_iter()
        .map(|path| path.positions().collect())
        .collect();

    let mut report = CollisionReport::default();

    for t in 0..=team.longest() {
        let present: Vec<Point> = trajectories
            .iter()
            .filter_map(|trajectory| trajectory.get(t).copied())
            .collect();
        for (i, a) in present.iter().enumerate() {
            report.total_temporal_collisions +=
                present[i + 1..].iter().filter(|b| *b == a).count() as u32;
        }
    }

    let visited: Vec<Vec<usize>> = trajectories
        .par_iter()
        .map(|trajectory| {
            let mut cells: Vec<usize> =
                trajectory.iter().filter_map(|&p| grid.index(p)).collect();
            cells.sort_unstable();
            cells.dedup();
            cells
        })
        .collect();

    let mut robots_per_cell = vec![0u32; grid.volume()];
    for cells in &visited {
        for &idx in cells {
            robots_per_cell[idx] += 1;
        }
    }
    for &count in &robots_per_cell {
        if count > 1 {
            report.total_spatial_collisions += count - 1;
            report.conflicted_cells_count += 1;
        }
    }

    report
}

/// Score a team: every member's route terms minus the collision penalty.
pub fn analyze_team(grid: &Grid, team: &Team, weights: &FitnessWeights) -> TeamAnalysis {
    let tally = team
        .paths
        .par_iter()
        .map(|path| tally_route(grid, path))
        .reduce(RouteTally::default, |mut acc, t| {
            acc.add(&t);
            acc
        });

    let collisions = detect_collisions(grid, team);
    let penalty = weights.collision_cost(
        collisions.total_temporal_collisions,
        collisions.total_spatial_collisions,
    );

    TeamAnalysis {
        collisions,
        tally,
        fitness: tally.score(weights) - penalty,
    }
}
