//! Run configuration: search parameters, fitness weights and team size.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{EvolutionConfig, EvolutionConfigError};

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescueConfig {
    /// Genetic algorithm parameters.
    #[serde(default)]
    pub evolution: EvolutionConfig,
    /// Fitness weights shared by path and team scoring.
    #[serde(default)]
    pub weights: FitnessWeights,
    /// Number of evaluator workers, which is also the team size.
    #[serde(default = "default_num_robots")]
    pub num_robots: usize,
    /// Map file to load when none is given on the command line.
    #[serde(default = "default_grid_file")]
    pub grid_file: PathBuf,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for RescueConfig {
    fn default() -> Self {
        Self {
            evolution: EvolutionConfig::default(),
            weights: FitnessWeights::default(),
            num_robots: default_num_robots(),
            grid_file: default_grid_file(),
            random_seed: None,
        }
    }
}

fn default_num_robots() -> usize {
    8
}
fn default_grid_file() -> PathBuf {
    PathBuf::from("map3d.txt")
}

/// Weights of the linear fitness terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessWeights {
    /// Reward per survivor reached.
    #[serde(default = "default_w_survivors")]
    pub survivors: f64,
    /// Reward per distinct cell visited.
    #[serde(default = "default_w_coverage")]
    pub coverage: f64,
    /// Cost per step taken.
    #[serde(default = "default_w_length")]
    pub length: f64,
    /// Cost per risk cell traversed.
    #[serde(default = "default_w_risk")]
    pub risk: f64,
    /// Team penalty per weighted collision.
    #[serde(default = "default_collision_penalty")]
    pub collision_penalty: f64,
    /// How many spatial collisions one temporal collision is worth.
    #[serde(default = "default_temporal_collision_factor")]
    pub temporal_collision_factor: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            survivors: default_w_survivors(),
            coverage: default_w_coverage(),
            length: default_w_length(),
            risk: default_w_risk(),
            collision_penalty: default_collision_penalty(),
            temporal_collision_factor: default_temporal_collision_factor(),
        }
    }
}

fn default_w_survivors() -> f64 {
    6.0
}
fn default_w_coverage() -> f64 {
    2.0
}
fn default_w_length() -> f64 {
    1.0
}
fn default_w_risk() -> f64 {
    5.0
}
fn default_collision_penalty() -> f64 {
    50.0
}
fn default_temporal_collision_factor() -> f64 {
    10.0
}

impl FitnessWeights {
    /// Linear combination of the four path terms.
    #[inline]
    pub fn score(&self, survivors: u32, coverage: u32, length: u32, risk: u32) -> f64 {
        self.survivors * f64::from(survivors) + self.coverage * f64::from(coverage)
            - self.length * f64::from(length)
            - self.risk * f64::from(risk)
    }

    /// Team collision penalty.
    #[inline]
    pub fn collision_cost(&self, temporal: u32, spatial: u32) -> f64 {
        self.collision_penalty
            * (self.temporal_collision_factor * f64::from(temporal) + f64::from(spatial))
    }
}

impl RescueConfig {
    /// Parse a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the `KEY=VALUE` configuration format.
    ///
    /// Lines starting with `#` and blank lines are skipped. Unknown keys are
    /// ignored with a warning.
    pub fn from_key_value_str(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                log::warn!("config line {} has no '=', skipping", line_no + 1);
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "POPULATION_SIZE" => config.evolution.population_size = parse_value(key, value)?,
                "MAX_GENERATIONS" => config.evolution.generations = parse_value(key, value)?,
                "ELITE_PERCENT" => config.evolution.elite_percent = parse_value(key, value)?,
                "MUTATION_RATE" => config.evolution.mutation_rate = parse_value(key, value)?,
                "INJECT_PERCENT" => config.evolution.inject_percent = parse_value(key, value)?,
                "W_SURVIVORS" => config.weights.survivors = parse_value(key, value)?,
                "W_COVERAGE" => config.weights.coverage = parse_value(key, value)?,
                "W_LENGTH" => config.weights.length = parse_value(key, value)?,
                "W_RISK" => config.weights.risk = parse_value(key, value)?,
                "NUM_ROBOTS" => config.num_robots = parse_value(key, value)?,
                "GRID_FILE" => config.grid_file = PathBuf::from(value),
                "RANDOM_SEED" => config.random_seed = Some(parse_value(key, value)?),
                other => log::warn!("unknown config key '{other}' ignored"),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a file: JSON for `.json` paths, `KEY=VALUE` otherwise.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::warn!(
                    "config file '{}' not found, using default values",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(err) => return Err(ConfigError::Io(err)),
        };

        let config = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&text)?
        } else {
            Self::from_key_value_str(&text)?
        };
        log::info!("configuration loaded from '{}'", path.display());
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evolution.validate()?;

        if self.num_robots == 0 {
            return Err(ConfigError::NoRobots);
        }

        let w = &self.weights;
        let named = [
            ("survivors", w.survivors),
            ("coverage", w.coverage),
            ("length", w.length),
            ("risk", w.risk),
            ("collision_penalty", w.collision_penalty),
            ("temporal_collision_factor", w.temporal_collision_factor),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }

        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
    #[error("Robot count must be at least 1")]
    NoRobots,
    #[error("Weight {name} must be finite, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("Evolution config validation failed: {0}")]
    Evolution(#[from] EvolutionConfigError),
}
