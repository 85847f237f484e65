//! Rescue Swarm - Multi-robot path search over a 3D disaster grid.
//!
//! A team of robots enters a voxel map from its top layer and should find
//! survivors while covering ground, keeping routes short and avoiding risky
//! cells. Routes are evolved with a genetic algorithm whose fitness calls
//! are served by a fixed pool of evaluator threads, one per robot slot.
//! An A* planner provides a deterministic baseline and the final team is
//! checked for inter-robot collisions.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Grid, path and configuration types
//! - `compute`: Route scoring, evaluator pool, evolution, planner and team analysis
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rescue_swarm::{
//!     compute::{EvaluatorPool, SearchContext, Team, analyze_team, evolution::{EvolutionEngine, PathRng}},
//!     schema::{Grid, RescueConfig},
//! };
//!
//! let config = RescueConfig::default();
//! let grid = Grid::load(&config.grid_file)?;
//! let ctx = Arc::new(SearchContext::new(grid, config.weights));
//! let pool = EvaluatorPool::new(Arc::clone(&ctx), config.num_robots)?;
//!
//! let mut engine = EvolutionEngine::new(config.evolution.clone(), &ctx, &pool, PathRng::new(1))?;
//! let result = engine.run();
//!
//! let team = Team::assemble(&result.best_per_slot);
//! let analysis = analyze_team(ctx.grid(), &team, ctx.weights());
//! println!("Team fitness: {:.2}", analysis.fitness);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{AStarPlanner, EvaluatorPool, SearchContext, Team};
pub use schema::{Grid, Path, RescueConfig};
