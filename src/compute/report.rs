//! Run summary: planner baseline per slot and a serializable report.

use std::fs;
use std::io;
use std::path::Path as FsPath;

use rayon::prelude::*;
use serde::Serialize;

use crate::schema::{EvolutionStats, FitnessWeights, Grid, Move, Path, Point};

use super::{AStarPlanner, CollisionReport, Team, TeamAnalysis, score_full_route};

/// Evolved path of one slot next to the A* route from the same start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotComparison {
    pub slot: usize,
    pub start: Point,
    pub ga_length: usize,
    pub ga_fitness: f64,
    pub astar_length: usize,
    pub astar_fitness: f64,
    /// `ga / astar · 100`, `None` when the A* route scored zero or less.
    pub ratio: Option<f64>,
}

impl SlotComparison {
    pub fn astar_failed(&self) -> bool {
        self.ratio.is_none()
    }
}

/// Plan from every team member's start and score both routes.
///
/// The evolved fitness is the one recorded during the search. The A* route
/// is scored over its whole length.
pub fn compare_with_planner(
    grid: &Grid,
    team: &Team,
    weights: &FitnessWeights,
) -> Vec<SlotComparison> {
    let planner = AStarPlanner::new(grid);
    team.paths()
        .par_iter()
        .enumerate()
        .map(|(slot, ga)| {
            let astar = planner.plan(ga.start);
            let astar_fitness = score_full_route(grid, &astar, weights);
            SlotComparison {
                slot,
                start: ga.start,
                ga_length: ga.len(),
                ga_fitness: ga.fitness,
                astar_length: astar.len(),
                astar_fitness,
                ratio: (astar_fitness > 0.0).then(|| ga.fitness / astar_fitness * 100.0),
            }
        })
        .collect()
}

/// One robot's route with every cell it passes through.
#[derive(Debug, Clone, Serialize)]
pub struct RobotReport {
    pub slot: usize,
    pub start: Point,
    pub moves: Vec<Move>,
    pub fitness: f64,
    pub cells: Vec<Point>,
}

impl RobotReport {
    fn from_path(slot: usize, path: &Path) -> Self {
        Self {
            slot,
            start: path.start,
            moves: path.moves.clone(),
            fitness: path.fitness,
            cells: path.positions().collect(),
        }
    }
}

/// Everything an external viewer needs about a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Grid size as `[x, y, z]`.
    pub grid_size: [usize; 3],
    pub survivors_on_map: usize,
    pub robots: Vec<RobotReport>,
    pub collisions: CollisionReport,
    pub team_fitness: f64,
    pub comparisons: Vec<SlotComparison>,
    pub search: EvolutionStats,
}

impl RunReport {
    pub fn new(
        grid: &Grid,
        team: &Team,
        analysis: &TeamAnalysis,
        comparisons: Vec<SlotComparison>,
        search: EvolutionStats,
    ) -> Self {
        let (x, y, z) = grid.dims();
        Self {
            grid_size: [x, y, z],
            survivors_on_map: grid.survivor_count(),
            robots: team
                .paths()
                .iter()
                .enumerate()
                .map(|(slot, path)| RobotReport::from_path(slot, path))
                .collect(),
            collisions: analysis.collisions,
            team_fitness: analysis.fitness,
            comparisons,
            search,
        }
    }

    /// Write the report as pretty JSON.
    pub fn write_json<P: AsRef<FsPath>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{SENTINEL_FITNESS, analyze_team};
    use crate::schema::Move::*;

    fn corner_grid() -> Grid {
        Grid::parse("0 0 0\n0 1 0\n0 0 2\n").unwrap()
    }

    fn stats() -> EvolutionStats {
        EvolutionStats {
            generations: 3,
            total_evaluations: 40,
            rejected_evaluations: 0,
            best_fitness: 12.0,
            elapsed_seconds: 0.5,
        }
    }

    #[test]
    fn test_comparison_ratio() {
        let grid = corner_grid();
        let w = FitnessWeights::default();
        let mut evolved = Path::new(Point::new(0, 0, 0), vec![PosX, PosX, PosY, PosY]);
        evolved.fitness = 8.0;
        let team = Team::new(vec![evolved]);

        let cmp = compare_with_planner(&grid, &team, &w);
        assert_eq!(cmp.len(), 1);
        let astar_fitness = w.score(1, 5, 4, 0);
        assert_eq!(cmp[0].astar_length, 4);
        assert_eq!(cmp[0].astar_fitness, astar_fitness);
        assert_eq!(cmp[0].ratio, Some(8.0 / astar_fitness * 100.0));
        assert!(!cmp[0].astar_failed());
    }

    #[test]
    fn test_failed_planner_has_no_ratio() {
        let grid = corner_grid();
        let w = FitnessWeights::default();
        // A start on the obstacle cannot be planned from.
        let mut stray = Path::empty(Point::new(1, 1, 0));
        stray.fitness = SENTINEL_FITNESS;
        let team = Team::new(vec![stray]);

        let cmp = compare_with_planner(&grid, &team, &w);
        assert_eq!(cmp[0].astar_length, 0);
        assert_eq!(cmp[0].astar_fitness, SENTINEL_FITNESS);
        assert!(cmp[0].astar_failed());
    }

    #[test]
    fn test_comparisons_keep_slot_order() {
        let grid = Grid::filled(4, 4, 1, crate::schema::Cell::Free).unwrap();
        let w = FitnessWeights::default();
        let team = Team::new(
            (0..4)
                .map(|i| Path::empty(Point::new(i, i, 0)))
                .collect(),
        );
        let cmp = compare_with_planner(&grid, &team, &w);
        for (i, c) in cmp.iter().enumerate() {
            assert_eq!(c.slot, i);
            assert_eq!(c.start, Point::new(i as i32, i as i32, 0));
        }
    }

    #[test]
    fn test_report_export() {
        let grid = corner_grid();
        let w = FitnessWeights::default();
        let team = Team::new(vec![
            Path::new(Point::new(0, 0, 0), vec![PosX, PosX]),
            Path::new(Point::new(0, 0, 0), vec![PosY]),
        ]);
        let analysis = analyze_team(&grid, &team, &w);
        let cmp = compare_with_planner(&grid, &team, &w);
        let report = RunReport::new(&grid, &team, &analysis, cmp, stats());

        assert_eq!(report.grid_size, [3, 3, 1]);
        assert_eq!(report.survivors_on_map, 1);
        assert_eq!(report.robots[0].cells.len(), 3);

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("run.json");
        report.write_json(&file).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(value["grid_size"], serde_json::json!([3, 3, 1]));
        assert_eq!(value["robots"].as_array().unwrap().len(), 2);
        assert_eq!(
            value["collisions"]["total_temporal_collisions"],
            serde_json::json!(1)
        );
        assert_eq!(value["search"]["total_evaluations"], serde_json::json!(40));
    }
}
