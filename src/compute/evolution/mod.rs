//! Evolutionary search for robot routes.
//!
//! A population of move sequences is refined over a fixed number of
//! generations. Every fitness evaluation goes through a [`RouteEvaluator`],
//! normally the worker pool, and the engine keeps the best path each worker
//! slot has served. Those per-slot bests form the robot team.
//!
//! - **Operators** (`operators`): random valid routes, parent selection,
//!   single-point crossover and point mutation
//! - **Engine** (`search`): elitism, random injection, history and results
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rescue_swarm::compute::evolution::{EvolutionEngine, PathRng};
//! use rescue_swarm::compute::{EvaluatorPool, SearchContext};
//! use rescue_swarm::schema::{EvolutionConfig, FitnessWeights, Grid};
//!
//! let grid = Grid::load("map3d.txt")?;
//! let ctx = Arc::new(SearchContext::new(grid, FitnessWeights::default()));
//! let pool = EvaluatorPool::new(Arc::clone(&ctx), 8)?;
//!
//! let mut engine = EvolutionEngine::new(EvolutionConfig::default(), &ctx, &pool, PathRng::new(7))?;
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: best fitness = {:.2}",
//!         progress.generation, progress.best_fitness);
//! });
//! println!("{} slots filled", result.best_per_slot.iter().flatten().count());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`RouteEvaluator`]: crate::compute::RouteEvaluator

mod operators;
mod search;

pub use operators::{PathRng, StartCells};
pub use search::{EvolutionEngine, EvolutionResult, SearchError};
