use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub trainer: TrainerConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    /// Optional JSON-lines dataset of logged transitions to pre-load
    /// into the transition store before training.
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from a TOML file, layered with environment
    /// variables prefixed `KOLRL_` (e.g. `KOLRL_TRAINER__ALGORITHM=cql`).
    pub fn load<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let cfg = Config::builder()
            .add_source(File::from(path.as_ref().to_path_buf()))
            .add_source(
                Environment::with_prefix("KOLRL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(cfg.try_deserialize()?)
    }
}

/// Offline-RL algorithm selector
///
/// Resolved to a concrete training strategy once, at trainer
/// construction. An unknown selector fails deserialization, before any
/// store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Conservative Q-learning: one `run()` processes a full epoch over
    /// the store with a pessimistic penalty on out-of-distribution actions.
    Cql,
    /// Implicit Q-learning: one `run()` processes exactly one batch via
    /// expectile value regression; callers loop for multi-step training.
    Iql,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Cql => write!(f, "cql"),
            Algorithm::Iql => write!(f, "iql"),
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = crate::error::KolrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cql" => Ok(Algorithm::Cql),
            "iql" => Ok(Algorithm::Iql),
            other => Err(crate::error::KolrlError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Training configuration
///
/// Immutable for the duration of a training run.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainerConfig {
    /// Which training strategy to bind at construction
    pub algorithm: Algorithm,
    /// Destination for the exported checkpoint artifact
    pub checkpoint_path: PathBuf,
    /// Discount factor
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Mini-batch size per sampled batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Actor learning rate
    #[serde(default = "default_actor_lr")]
    pub actor_lr: f64,
    /// Critic learning rate
    #[serde(default = "default_critic_lr")]
    pub critic_lr: f64,
    /// CQL conservative penalty weight
    #[serde(default = "default_cql_alpha")]
    pub cql_alpha: f64,
    /// IQL expectile (0.5 = symmetric regression)
    #[serde(default = "default_iql_tau")]
    pub iql_tau: f64,
    /// IQL advantage-weighting inverse temperature
    #[serde(default = "default_iql_beta")]
    pub iql_beta: f64,
}

fn default_gamma() -> f64 {
    0.99
}

fn default_batch_size() -> usize {
    64
}

fn default_actor_lr() -> f64 {
    3e-4
}

fn default_critic_lr() -> f64 {
    3e-4
}

fn default_cql_alpha() -> f64 {
    1.0
}

fn default_iql_tau() -> f64 {
    0.7
}

fn default_iql_beta() -> f64 {
    3.0
}

impl TrainerConfig {
    /// Minimal config for a given algorithm and destination, with
    /// default hyperparameters.
    pub fn new(algorithm: Algorithm, checkpoint_path: impl Into<PathBuf>) -> Self {
        Self {
            algorithm,
            checkpoint_path: checkpoint_path.into(),
            gamma: default_gamma(),
            batch_size: default_batch_size(),
            actor_lr: default_actor_lr(),
            critic_lr: default_critic_lr(),
            cql_alpha: default_cql_alpha(),
            iql_tau: default_iql_tau(),
            iql_beta: default_iql_beta(),
        }
    }
}

/// Transition store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BufferConfig {
    /// Maximum number of retained transitions (FIFO eviction beyond this)
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    100_000
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_parses_known_selectors() {
        assert_eq!("cql".parse::<Algorithm>().unwrap(), Algorithm::Cql);
        assert_eq!("IQL".parse::<Algorithm>().unwrap(), Algorithm::Iql);
    }

    #[test]
    fn unknown_selector_is_rejected() {
        assert!("ppo".parse::<Algorithm>().is_err());
    }

    #[test]
    fn trainer_config_defaults() {
        let cfg = TrainerConfig::new(Algorithm::Iql, "/tmp/policy.json");
        assert_eq!(cfg.gamma, 0.99);
        assert_eq!(cfg.batch_size, 64);
        assert!(cfg.iql_tau > 0.5);
    }
}
