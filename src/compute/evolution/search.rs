//! Generational search over robot routes.

use std::time::Instant;

use crate::schema::{
    EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionProgress, EvolutionStats,
    Path,
};
use crate::compute::{RouteEvaluator, SearchContext};

use super::operators::{PathRng, StartCells};

/// Generations between `info` progress lines.
const LOG_INTERVAL: usize = 50;

/// Output of a finished search.
#[derive(Debug, Clone)]
pub struct EvolutionResult {
    /// Best path served by each worker slot, `None` if a slot never scored one.
    pub best_per_slot: Vec<Option<Path>>,
    /// Final population, sorted by descending fitness.
    pub population: Vec<Path>,
    pub stats: EvolutionStats,
    pub history: EvolutionHistory,
}

/// Genetic algorithm driving route evaluations through a [`RouteEvaluator`].
///
/// Runs on the caller's thread and issues one evaluation at a time.
pub struct EvolutionEngine<'a, E: RouteEvaluator> {
    config: EvolutionConfig,
    ctx: &'a SearchContext,
    evaluator: &'a E,
    rng: PathRng,
    starts: StartCells,
    population: Vec<Path>,
    best_per_slot: Vec<Option<Path>>,
    history: EvolutionHistory,
    generation: usize,
    evaluations: u64,
    rejected: u64,
}

impl<'a, E: RouteEvaluator> EvolutionEngine<'a, E> {
    /// Create an engine for the grid in `ctx`.
    ///
    /// Fails if the configuration is invalid or the top layer has no free
    /// cell to start from.
    pub fn new(
        config: EvolutionConfig,
        ctx: &'a SearchContext,
        evaluator: &'a E,
        rng: PathRng,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        let starts = StartCells::from_grid(ctx.grid())?;
        log::debug!(
            "{} start cells on the top layer, {} worker slots",
            starts.as_slice().len(),
            evaluator.slot_count()
        );

        Ok(Self {
            config,
            ctx,
            evaluator,
            rng,
            starts,
            population: Vec::new(),
            best_per_slot: vec![None; evaluator.slot_count()],
            history: EvolutionHistory::default(),
            generation: 0,
            evaluations: 0,
            rejected: 0,
        })
    }

    /// Build and evaluate a fresh random population.
    pub fn initialize(&mut self) {
        self.generation = 0;
        self.population.clear();

        let mut population = Vec::with_capacity(self.config.population_size);
        for _ in 0..self.config.population_size {
            let mut path = self.rng.random_individual(self.ctx.grid(), &self.starts);
            self.evaluate(&mut path);
            population.push(path);
        }
        self.population = population;
    }

    /// Score `path` and update the record of the slot that served it.
    fn evaluate(&mut self, path: &mut Path) {
        let evaluation = self.evaluator.evaluate(path.start, &path.moves);
        self.evaluations += 1;
        path.fitness = evaluation.fitness;

        let Some(slot) = evaluation.slot else {
            self.rejected += 1;
            return;
        };
        log::trace!("slot {slot} scored {:.2}", path.fitness);

        match self.best_per_slot.get_mut(slot) {
            Some(best) => {
                if best.as_ref().is_none_or(|b| path.fitness > b.fitness) {
                    *best = Some(path.clone());
                }
            }
            None => log::warn!("evaluator reported unknown slot {slot}"),
        }
    }

    /// Run a single generation step.
    fn step_generation(&mut self) {
        sort_population(&mut self.population);
        self.record_history();

        let size = self.config.population_size;
        let elites = self.config.elite_count().min(self.population.len());

        let mut next_gen = Vec::with_capacity(size);
        next_gen.extend_from_slice(&self.population[..elites]);

        while next_gen.len() < size {
            if self.rng.chance(self.config.inject_percent) {
                let mut fresh = self.rng.random_individual(self.ctx.grid(), &self.starts);
                self.evaluate(&mut fresh);
                next_gen.push(fresh);
                continue;
            }

            let (p1, p2) = self.rng.select_parents(&self.population);
            let mut child = self
                .rng
                .crossover(&self.population[p1], &self.population[p2]);
            self.rng.mutate(&mut child, self.config.mutation_rate);
            self.evaluate(&mut child);
            next_gen.push(child);
        }

        self.population = next_gen;
        self.generation += 1;
    }

    fn record_history(&mut self) {
        let (best, avg, std) = fitness_summary(&self.population);
        log::debug!(
            "generation {}: best {best:.2}, avg {avg:.2}, std {std:.2}",
            self.generation + 1
        );
        self.history.best_fitness.push(best);
        self.history.avg_fitness.push(avg);
        self.history.fitness_std.push(std);
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        let (best_fitness, avg_fitness, _) = fitness_summary(&self.population);
        EvolutionProgress {
            generation: self.generation,
            total_generations: self.config.generations,
            best_fitness,
            avg_fitness,
            evaluations: self.evaluations,
        }
    }

    /// Best path recorded per worker slot so far.
    pub fn best_per_slot(&self) -> &[Option<Path>] {
        &self.best_per_slot
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> EvolutionResult
    where
        F: FnMut(&EvolutionProgress),
    {
        let start_time = Instant::now();
        let total = self.config.generations;

        self.initialize();
        callback(&self.progress());

        while self.generation < total {
            self.step_generation();

            let progress = self.progress();
            if progress.generation == 1
                || progress.generation % LOG_INTERVAL == 0
                || progress.generation == total
            {
                log::info!(
                    "generation {}/{}: best {:.2}, avg {:.2}",
                    progress.generation,
                    total,
                    progress.best_fitness,
                    progress.avg_fitness
                );
            }
            callback(&progress);
        }

        sort_population(&mut self.population);
        let elapsed = start_time.elapsed().as_secs_f64();
        if self.rejected > 0 {
            log::warn!(
                "{} of {} evaluations found no idle worker",
                self.rejected,
                self.evaluations
            );
        }

        EvolutionResult {
            best_per_slot: self.best_per_slot.clone(),
            population: self.population.clone(),
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                rejected_evaluations: self.rejected,
                best_fitness: fitness_summary(&self.population).0,
                elapsed_seconds: elapsed,
            },
            history: self.history.clone(),
        }
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> EvolutionResult {
        self.run_with_callback(|_| {})
    }
}

/// Stable sort by descending fitness.
fn sort_population(population: &mut [Path]) {
    population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
}

/// Best, mean and standard deviation of fitness.
fn fitness_summary(population: &[Path]) -> (f64, f64, f64) {
    if population.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let n = population.len() as f64;
    let best = population
        .iter()
        .map(|p| p.fitness)
        .fold(f64::NEG_INFINITY, f64::max);
    let avg = population.iter().map(|p| p.fitness).sum::<f64>() / n;
    let variance = population
        .iter()
        .map(|p| (p.fitness - avg).powi(2))
        .sum::<f64>()
        / n;
    (best, avg, variance.sqrt())
}

/// Errors raised while setting up a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("No free cell on the top layer to start from")]
    NoStartCell,
    #[error("Invalid evolution config: {0}")]
    InvalidConfig(#[from] EvolutionConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{
        Evaluation, EvaluatorPool, SENTINEL_FITNESS, evaluate_route, route_is_valid,
    };
    use crate::schema::{FitnessWeights, Grid, Move, Point};
    use std::cell::{Cell, RefCell};
    use std::sync::Arc;

    /// Scores a route by its length, spreading calls over slots in turn.
    struct LengthEvaluator {
        slots: usize,
        calls: Cell<u64>,
        best_seen: RefCell<Vec<f64>>,
        reject: bool,
    }

    impl LengthEvaluator {
        fn new(slots: usize) -> Self {
            Self {
                slots,
                calls: Cell::new(0),
                best_seen: RefCell::new(vec![f64::NEG_INFINITY; slots]),
                reject: false,
            }
        }

        fn rejecting(slots: usize) -> Self {
            Self {
                reject: true,
                ..Self::new(slots)
            }
        }
    }

    impl RouteEvaluator for LengthEvaluator {
        fn slot_count(&self) -> usize {
            self.slots
        }

        fn evaluate(&self, _start: Point, moves: &[Move]) -> Evaluation {
            let n = self.calls.get();
            self.calls.set(n + 1);
            if self.reject {
                return Evaluation {
                    slot: None,
                    fitness: SENTINEL_FITNESS,
                };
            }
            let slot = n as usize % self.slots;
            let fitness = moves.len() as f64;
            let mut seen = self.best_seen.borrow_mut();
            seen[slot] = seen[slot].max(fitness);
            Evaluation {
                slot: Some(slot),
                fitness,
            }
        }
    }

    fn context() -> SearchContext {
        let grid = Grid::parse(
            "0 0 0 3\n0 1 0 0\n2 0 0 0\n\n0 0 1 0\n3 0 0 0\n0 0 1 2\n\n0 0 0 0\n0 1 0 0\n0 0 0 0\n",
        )
        .unwrap();
        SearchContext::new(grid, FitnessWeights::default())
    }

    fn small_config() -> EvolutionConfig {
        EvolutionConfig {
            population_size: 12,
            generations: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_initial_population_is_valid() {
        let ctx = context();
        let evaluator = LengthEvaluator::new(3);
        let mut engine =
            EvolutionEngine::new(small_config(), &ctx, &evaluator, PathRng::new(1)).unwrap();
        engine.initialize();

        assert_eq!(engine.population.len(), 12);
        assert_eq!(engine.evaluations, 12);
        for path in &engine.population {
            assert_eq!(path.start.z, 2);
            assert!(route_is_valid(ctx.grid(), path));
            assert_eq!(path.fitness, path.len() as f64);
        }
    }

    #[test]
    fn test_population_size_constant() {
        let ctx = context();
        let evaluator = LengthEvaluator::new(2);
        let mut engine =
            EvolutionEngine::new(small_config(), &ctx, &evaluator, PathRng::new(2)).unwrap();
        engine.initialize();
        for _ in 0..5 {
            engine.step_generation();
            assert_eq!(engine.population.len(), 12);
        }
        assert_eq!(engine.generation, 5);
    }

    #[test]
    fn test_elites_carried_unchanged() {
        let ctx = context();
        let evaluator = LengthEvaluator::new(4);
        let config = EvolutionConfig {
            population_size: 20,
            elite_percent: 0.2,
            ..Default::default()
        };
        let mut engine = EvolutionEngine::new(config, &ctx, &evaluator, PathRng::new(3)).unwrap();
        engine.initialize();

        let mut ranked = engine.population.clone();
        sort_population(&mut ranked);
        let before = engine.evaluations;

        engine.step_generation();
        assert_eq!(&engine.population[..4], &ranked[..4]);
        // Elites are not re-evaluated.
        assert_eq!(engine.evaluations - before, 16);
    }

    #[test]
    fn test_best_per_slot_tracks_maximum() {
        let ctx = context();
        let evaluator = LengthEvaluator::new(3);
        let mut engine =
            EvolutionEngine::new(small_config(), &ctx, &evaluator, PathRng::new(4)).unwrap();
        let result = engine.run();

        let seen = evaluator.best_seen.borrow();
        for (slot, best) in result.best_per_slot.iter().enumerate() {
            let best = best.as_ref().unwrap();
            assert_eq!(best.fitness, seen[slot]);
            assert_eq!(best.fitness, best.len() as f64);
        }
    }

    #[test]
    fn test_rejected_evaluations_counted() {
        let ctx = context();
        let evaluator = LengthEvaluator::rejecting(2);
        let mut engine =
            EvolutionEngine::new(small_config(), &ctx, &evaluator, PathRng::new(5)).unwrap();
        let result = engine.run();

        assert!(result.best_per_slot.iter().all(Option::is_none));
        assert_eq!(
            result.stats.rejected_evaluations,
            result.stats.total_evaluations
        );
        assert!(
            result
                .population
                .iter()
                .all(|p| p.fitness == SENTINEL_FITNESS)
        );
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let ctx = context();
        let run = |seed| {
            let evaluator = LengthEvaluator::new(3);
            let mut engine =
                EvolutionEngine::new(small_config(), &ctx, &evaluator, PathRng::new(seed))
                    .unwrap();
            engine.run().population
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn test_run_reports_progress_and_history() {
        let ctx = context();
        let evaluator = LengthEvaluator::new(3);
        let mut engine =
            EvolutionEngine::new(small_config(), &ctx, &evaluator, PathRng::new(6)).unwrap();

        let mut generations = Vec::new();
        let result = engine.run_with_callback(|p| generations.push(p.generation));

        assert_eq!(generations, (0..=8).collect::<Vec<_>>());
        assert_eq!(result.stats.generations, 8);
        assert_eq!(result.history.best_fitness.len(), 8);
        assert_eq!(result.history.fitness_std.len(), 8);
        assert_eq!(result.stats.total_evaluations, evaluator.calls.get());
        assert_eq!(result.stats.best_fitness, result.population[0].fitness);
        assert!(
            result
                .population
                .windows(2)
                .all(|w| w[0].fitness >= w[1].fitness)
        );
    }

    #[test]
    fn test_run_against_worker_pool() {
        let ctx = Arc::new(context());
        let mut pool = EvaluatorPool::new(Arc::clone(&ctx), 3).unwrap();
        let result = {
            let mut engine =
                EvolutionEngine::new(small_config(), &ctx, &pool, PathRng::new(7)).unwrap();
            engine.run()
        };

        assert_eq!(result.stats.rejected_evaluations, 0);
        assert_eq!(pool.served_count(), result.stats.total_evaluations);
        for best in &result.best_per_slot {
            let best = best.as_ref().unwrap();
            assert_eq!(evaluate_route(&ctx, best.start, &best.moves), best.fitness);
        }
        pool.shutdown();
    }

    #[test]
    fn test_setup_errors() {
        let blocked = SearchContext::new(
            Grid::parse("0 0\n\n1 1\n").unwrap(),
            FitnessWeights::default(),
        );
        let evaluator = LengthEvaluator::new(1);
        assert!(matches!(
            EvolutionEngine::new(small_config(), &blocked, &evaluator, PathRng::new(0)),
            Err(SearchError::NoStartCell)
        ));

        let ctx = context();
        let config = EvolutionConfig {
            mutation_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            EvolutionEngine::new(config, &ctx, &evaluator, PathRng::new(0)),
            Err(SearchError::InvalidConfig(_))
        ));
    }
}
