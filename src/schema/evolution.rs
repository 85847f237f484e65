//! Evolutionary search configuration and run statistics.

use serde::{Deserialize, Serialize};

/// Genetic algorithm parameters for the path search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Number of individuals per generation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Fixed number of generations to run.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Fraction of the sorted population copied unchanged (0.0-1.0).
    #[serde(default = "default_elite_percent")]
    pub elite_percent: f64,
    /// Probability that a child receives one random move (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Probability that a non-elite slot gets a fresh random path (0.0-1.0).
    #[serde(default = "default_inject_percent")]
    pub inject_percent: f64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            generations: default_generations(),
            elite_percent: default_elite_percent(),
            mutation_rate: default_mutation_rate(),
            inject_percent: default_inject_percent(),
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_generations() -> usize {
    200
}
fn default_elite_percent() -> f64 {
    0.10
}
fn default_mutation_rate() -> f64 {
    0.10
}
fn default_inject_percent() -> f64 {
    0.30
}

impl EvolutionConfig {
    /// Number of elites carried into each generation, at least one.
    pub fn elite_count(&self) -> usize {
        let count = (self.population_size as f64 * self.elite_percent).round() as usize;
        count.max(1).min(self.population_size)
    }

    /// Validate search parameters.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        if self.population_size == 0 {
            return Err(EvolutionConfigError::EmptyPopulation);
        }

        let check_rate = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(EvolutionConfigError::InvalidRate { name, value })
            }
        };

        check_rate(self.elite_percent, "elite_percent")?;
        check_rate(self.mutation_rate, "mutation_rate")?;
        check_rate(self.inject_percent, "inject_percent")?;

        Ok(())
    }
}

/// Progress update emitted after each generation.
#[derive(Debug, Clone, Serialize)]
pub struct EvolutionProgress {
    /// Generations completed so far.
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Best fitness in the current population.
    pub best_fitness: f64,
    /// Average fitness of the current population.
    pub avg_fitness: f64,
    /// Fitness evaluations requested so far.
    pub evaluations: u64,
}

/// Per-generation statistics for analysis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f64>,
    /// Average fitness per generation.
    pub avg_fitness: Vec<f64>,
    /// Standard deviation per generation.
    pub fitness_std: Vec<f64>,
}

/// Summary statistics of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct EvolutionStats {
    /// Total generations run.
    pub generations: usize,
    /// Fitness evaluations requested, including rejected ones.
    pub total_evaluations: u64,
    /// Evaluations that found no idle worker.
    pub rejected_evaluations: u64,
    /// Best fitness in the final population.
    pub best_fitness: f64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
}

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 1")]
    EmptyPopulation,
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },
}
