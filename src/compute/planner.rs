//! Deterministic A* baseline planner.
//!
//! Plans a single route from a start cell toward the most valuable target on
//! the grid. Independent of the evaluator pool and of any randomness.

use crate::schema::{Cell, Grid, Move, Path, Point};

/// Bonus term of the survivor target estimate.
const SURVIVOR_BONUS: i64 = 6;

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    pos: Point,
    g: u32,
    f: u32,
}

/// Six-direction A* over the occupancy grid with a Manhattan heuristic.
pub struct AStarPlanner<'a> {
    grid: &'a Grid,
}

impl<'a> AStarPlanner<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        Self { grid }
    }

    /// Pick the cell to plan toward.
    ///
    /// Survivors are ranked by `6 + 2·d − d` for Manhattan distance `d`
    /// from `start`, first in scan order on ties. Without survivors the
    /// farthest non-obstacle cell is chosen instead.
    pub fn select_target(&self, start: Point) -> Option<Point> {
        let mut target = None;
        let mut best_potential = i64::MIN;

        for (p, cell) in self.grid.cells() {
            if cell != Cell::Survivor {
                continue;
            }
            let dist = i64::from(p.manhattan(start));
            let potential = SURVIVOR_BONUS + 2 * dist - dist;
            if potential > best_potential {
                best_potential = potential;
                target = Some(p);
            }
        }

        if target.is_none() {
            let mut best_dist = None;
            for (p, cell) in self.grid.cells() {
                if cell == Cell::Obstacle {
                    continue;
                }
                let dist = p.manhattan(start);
                if best_dist.is_none_or(|best| dist > best) {
                    best_dist = Some(dist);
                    target = Some(p);
                }
            }
        }

        target
    }

    /// Plan a route from `start`.
    ///
    /// Never fails: when the target cannot be reached the route ends at the
    /// explored cell closest to it, and a start with no way out yields a
    /// zero-length path.
    pub fn plan(&self, start: Point) -> Path {
        if !self.grid.is_passable(start) {
            log::debug!("planner start {start} is blocked");
            return Path::empty(start);
        }
        let Some(target) = self.select_target(start) else {
            return Path::empty(start);
        };
        log::debug!("planning from {start} toward {target}");

        let (goal, came_from) = self.search(start, target);
        if goal != target {
            log::debug!("target {target} unreachable from {start}, stopping at {goal}");
        }

        match self.reconstruct(start, goal, &came_from) {
            Some(moves) => Path::new(start, moves),
            None => {
                log::warn!("planner trace from {goal} did not return to {start}");
                Path::empty(start)
            }
        }
    }

    /// Run A*, returning the goal reached and the move that entered each cell.
    fn search(&self, start: Point, target: Point) -> (Point, Vec<Option<Move>>) {
        let grid = self.grid;
        let volume = grid.volume();
        let heuristic = |p: Point| p.manhattan(target);

        let mut closed = vec![false; volume];
        let mut came_from: Vec<Option<Move>> = vec![None; volume];
        let mut open = vec![OpenNode {
            pos: start,
            g: 0,
            f: heuristic(start),
        }];
        let mut nearest = (heuristic(start), start);

        while !open.is_empty() {
            let mut current_idx = 0;
            for (i, node) in open.iter().enumerate().skip(1) {
                if node.f < open[current_idx].f {
                    current_idx = i;
                }
            }
            let current = open.swap_remove(current_idx);

            if current.pos == target {
                return (target, came_from);
            }

            let Some(current_cell) = grid.index(current.pos) else {
                continue;
            };
            closed[current_cell] = true;

            let h = heuristic(current.pos);
            if h < nearest.0 {
                nearest = (h, current.pos);
            }

            for m in Move::ALL {
                let next = m.apply(current.pos);
                let Some(next_cell) = grid.index(next) else {
                    continue;
                };
                if closed[next_cell] || grid.cell_at(next_cell) == Cell::Obstacle {
                    continue;
                }

                let g = current.g + 1;
                let node = OpenNode {
                    pos: next,
                    g,
                    f: g + heuristic(next),
                };
                match open.iter().position(|n| n.pos == next) {
                    None => open.push(node),
                    Some(i) if g < open[i].g => open[i] = node,
                    Some(_) => continue,
                }
                came_from[next_cell] = Some(m);
            }
        }

        (nearest.1, came_from)
    }

    /// Walk back from `goal` to `start` and return the moves in travel order.
    fn reconstruct(
        &self,
        start: Point,
        goal: Point,
        came_from: &[Option<Move>],
    ) -> Option<Vec<Move>> {
        let mut moves = Vec::new();
        let mut current = goal;

        while current != start {
            if moves.len() >= self.grid.volume() {
                return None;
            }
            let m = self.grid.index(current).and_then(|idx| came_from[idx])?;
            moves.push(m);
            current = m.opposite().apply(current);
        }

        moves.reverse();
        Some(moves)
    }
}
