//! Training Strategies
//!
//! Two interchangeable offline-RL algorithms behind one tagged enum.
//! They share a capability set (one unit of training work, artifact
//! export) but differ in unit granularity: CQL processes a full epoch
//! per call, IQL exactly one batch. The orchestrator dispatches on the
//! variant once per run.

pub mod cql;
pub mod iql;

pub use cql::CqlTrainer;
pub use iql::IqlTrainer;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::buffer::SharedReplayBuffer;
use crate::config::{Algorithm, TrainerConfig};
use crate::error::Result;
use crate::policy::Actor;

/// Cooperative cancellation signal, checked between batches.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Summary of one training call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainReport {
    /// Batches processed this call
    pub batches: usize,
    /// Transitions consumed across those batches
    pub transitions_seen: usize,
}

/// Concrete training strategy, selected once from configuration.
#[derive(Debug)]
pub enum Strategy {
    Cql(CqlTrainer),
    Iql(IqlTrainer),
}

impl Strategy {
    pub fn from_config(config: &TrainerConfig) -> Self {
        match config.algorithm {
            Algorithm::Cql => Strategy::Cql(CqlTrainer::new(config.clone())),
            Algorithm::Iql => Strategy::Iql(IqlTrainer::new(config.clone())),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Strategy::Cql(_) => Algorithm::Cql,
            Strategy::Iql(_) => Algorithm::Iql,
        }
    }

    /// Run one unit of training work: a full epoch for CQL, a single
    /// batch for IQL. An empty store is a no-op, not an error.
    pub fn train(&mut self, buffer: &SharedReplayBuffer, cancel: &CancelToken) -> Result<TrainReport> {
        match self {
            Strategy::Cql(t) => t.train_epoch(buffer, cancel),
            Strategy::Iql(t) => t.train_step(buffer, cancel),
        }
    }

    /// Export the trained policy as a checkpoint artifact.
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        match self {
            Strategy::Cql(t) => t.export(path),
            Strategy::Iql(t) => t.export(path),
        }
    }

    pub fn actor(&self) -> &Actor {
        match self {
            Strategy::Cql(t) => t.actor(),
            Strategy::Iql(t) => t.actor(),
        }
    }
}
