//! Route replay and scoring against the occupancy grid.

use serde::Serialize;

use crate::schema::{Cell, FitnessWeights, Grid, Move, Path, Point};

use super::SearchContext;

/// Score of a route that leaves the grid, hits an obstacle, or could not be
/// served by any worker.
pub const SENTINEL_FITNESS: f64 = -10000.0;

/// Counts accumulated while replaying a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteTally {
    pub survivors: u32,
    pub coverage: u32,
    pub length: u32,
    pub risk: u32,
}

impl RouteTally {
    #[inline]
    pub fn score(&self, weights: &FitnessWeights) -> f64 {
        weights.score(self.survivors, self.coverage, self.length, self.risk)
    }

    /// Component-wise sum.
    pub fn add(&mut self, other: &RouteTally) {
        self.survivors += other.survivors;
        self.coverage += other.coverage;
        self.length += other.length;
        self.risk += other.risk;
    }
}

/// Replay a route the way an evaluator worker does and return its fitness.
///
/// The start and every distinct stepped cell count as coverage, each step
/// adds one to the length. Replay stops right after the first survivor is
/// reached. Leaving the grid or stepping onto an obstacle aborts with
/// [`SENTINEL_FITNESS`]. Every cell replayed before that point is written
/// to the shared explored map.
pub fn evaluate_route(ctx: &SearchContext, start: Point, moves: &[Move]) -> f64 {
    match replay(ctx, start, moves) {
        Some(tally) => tally.score(ctx.weights()),
        None => SENTINEL_FITNESS,
    }
}

fn replay(ctx: &SearchContext, start: Point, moves: &[Move]) -> Option<RouteTally> {
    let grid = ctx.grid();
    let explored = ctx.explored();

    let start_idx = grid.index(start)?;
    let start_cell = grid.cell_at(start_idx);
    if start_cell == Cell::Obstacle {
        return None;
    }
    explored.record(start_idx, start_cell);

    let mut visited = vec![false; grid.volume()];
    visited[start_idx] = true;
    let mut tally = RouteTally {
        coverage: 1,
        ..Default::default()
    };

    let mut pos = start;
    for &m in moves {
        pos = m.apply(pos);
        let idx = grid.index(pos)?;
        let cell = grid.cell_at(idx);
        if cell == Cell::Obstacle {
            return None;
        }
        explored.record(idx, cell);

        tally.length += 1;
        if !visited[idx] {
            visited[idx] = true;
            tally.coverage += 1;
        }
        match cell {
            Cell::Survivor => {
                tally.survivors += 1;
                break;
            }
            Cell::Risk => tally.risk += 1,
            Cell::Free | Cell::Obstacle => {}
        }
    }

    Some(tally)
}

/// Tally every position of a route without stopping at survivors.
///
/// The start cell counts for coverage and survivors. Every move counts as
/// one step. Positions outside the grid add length only.
pub fn tally_route(grid: &Grid, path: &Path) -> RouteTally {
    let mut visited = vec![false; grid.volume()];
    let mut tally = RouteTally::default();

    for (step, pos) in path.positions().enumerate() {
        if step > 0 {
            tally.length += 1;
        }
        let Some(idx) = grid.index(pos) else {
            continue;
        };
        if !visited[idx] {
            visited[idx] = true;
            tally.coverage += 1;
        }
        match grid.cell_at(idx) {
            Cell::Survivor => tally.survivors += 1,
            Cell::Risk if step > 0 => tally.risk += 1,
            _ => {}
        }
    }

    tally
}

/// True if every position of the route is in bounds and not an obstacle.
pub fn route_is_valid(grid: &Grid, path: &Path) -> bool {
    path.positions().all(|p| grid.is_passable(p))
}

/// Full-route score: [`tally_route`] for valid routes, sentinel otherwise.
pub fn score_full_route(grid: &Grid, path: &Path, weights: &FitnessWeights) -> f64 {
    if route_is_valid(grid, path) {
        tally_route(grid, path).score(weights)
    } else {
        SENTINEL_FITNESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Move::*;

    /// 3x3x1, obstacle at (1,1,0), survivor at (2,2,0).
    fn corner_grid() -> Grid {
        Grid::parse("0 0 0\n0 1 0\n0 0 2\n").unwrap()
    }

    fn context(grid: Grid) -> SearchContext {
        SearchContext::new(grid, FitnessWeights::default())
    }

    #[test]
    fn test_route_to_survivor() {
        let ctx = context(corner_grid());
        let fitness = evaluate_route(&ctx, Point::new(0, 0, 0), &[PosX, PosX, PosY, PosY]);
        let w = FitnessWeights::default();
        assert_eq!(fitness, w.survivors * 1.0 + w.coverage * 5.0 - w.length * 4.0);
    }

    #[test]
    fn test_obstacle_aborts_with_sentinel() {
        let ctx = context(corner_grid());
        let fitness = evaluate_route(&ctx, Point::new(0, 0, 0), &[PosX, PosY, PosX]);
        assert_eq!(fitness, SENTINEL_FITNESS);

        // Only the start and (1,0,0) were replayed before the obstacle.
        assert_eq!(ctx.explored().known_count(), 2);
        assert_eq!(ctx.explored().observed(ctx.grid(), Point::new(1, 1, 0)), None);
    }

    #[test]
    fn test_leaving_grid_is_invalid() {
        let ctx = context(corner_grid());
        assert_eq!(
            evaluate_route(&ctx, Point::new(0, 0, 0), &[NegX]),
            SENTINEL_FITNESS
        );
        assert_eq!(
            evaluate_route(&ctx, Point::new(0, 0, 0), &[PosZ]),
            SENTINEL_FITNESS
        );
        assert_eq!(
            evaluate_route(&ctx, Point::new(5, 0, 0), &[]),
            SENTINEL_FITNESS
        );
    }

    #[test]
    fn test_replay_stops_at_survivor() {
        let ctx = context(corner_grid());
        let w = *ctx.weights();
        // Steps past the survivor, even invalid ones, are not scored.
        let fitness = evaluate_route(
            &ctx,
            Point::new(0, 0, 0),
            &[PosX, PosX, PosY, PosY, PosX, PosX],
        );
        assert_eq!(fitness, w.score(1, 5, 4, 0));
    }

    #[test]
    fn test_revisits_cost_length_not_coverage() {
        let grid = Grid::parse("0 3 0\n").unwrap();
        let ctx = context(grid);
        let w = *ctx.weights();
        let fitness = evaluate_route(&ctx, Point::new(0, 0, 0), &[PosX, NegX, PosX]);
        // coverage {0,1}, three steps, risk cell entered twice
        assert_eq!(fitness, w.score(0, 2, 3, 2));
    }

    #[test]
    fn test_empty_route_scores_start_only() {
        let ctx = context(corner_grid());
        let w = *ctx.weights();
        assert_eq!(evaluate_route(&ctx, Point::new(0, 0, 0), &[]), w.coverage);
    }

    #[test]
    fn test_tally_route_counts_everything() {
        let grid = Grid::parse("2 3 2\n").unwrap();
        let path = Path::new(Point::new(0, 0, 0), vec![PosX, PosX, NegX]);
        let tally = tally_route(&grid, &path);
        assert_eq!(
            tally,
            RouteTally {
                survivors: 2,
                coverage: 3,
                length: 3,
                risk: 2,
            }
        );
    }

    #[test]
    fn test_score_full_route_validity() {
        let grid = corner_grid();
        let w = FitnessWeights::default();
        let valid = Path::new(Point::new(0, 0, 0), vec![PosY, PosY, PosX, PosX]);
        assert_eq!(score_full_route(&grid, &valid, &w), w.score(1, 5, 4, 0));

        let blocked = Path::new(Point::new(0, 0, 0), vec![PosY, PosX]);
        assert!(!route_is_valid(&grid, &blocked));
        assert_eq!(score_full_route(&grid, &blocked, &w), SENTINEL_FITNESS);
    }
}
