//! Training Orchestrator
//!
//! Binds one configuration and one transition store, resolves the
//! algorithm selector to a concrete strategy exactly once at
//! construction, and drives it through `Idle -> Running -> Checkpointed`
//! (or `Failed` on an unrecoverable error such as an artifact write
//! failure). Each run executes inside its own tracing span.

use std::fmt;
use tracing::{error, info, info_span};
use uuid::Uuid;

use crate::algo::{CancelToken, Strategy, TrainReport};
use crate::buffer::SharedReplayBuffer;
use crate::config::TrainerConfig;
use crate::error::{KolrlError, Result};
use crate::policy::Actor;

/// Orchestrator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Idle,
    Running,
    Checkpointed,
    Failed,
}

impl fmt::Display for TrainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrainerState::Idle => "Idle",
            TrainerState::Running => "Running",
            TrainerState::Checkpointed => "Checkpointed",
            TrainerState::Failed => "Failed",
        };
        write!(f, "{s}")
    }
}

/// Offline-RL training orchestrator.
///
/// How much work one `run()` does is the bound strategy's contract: a
/// full epoch for CQL, a single batch for IQL. Multi-step IQL training
/// therefore calls `run()` repeatedly; each successful run re-arms the
/// orchestrator from `Checkpointed`.
pub struct RlTrainer {
    config: TrainerConfig,
    buffer: SharedReplayBuffer,
    strategy: Strategy,
    state: TrainerState,
    cancel: CancelToken,
}

impl RlTrainer {
    /// Bind a configuration and a transition store.
    ///
    /// The algorithm selector is resolved here, once; it is never
    /// re-resolved mid-run. Unknown selectors are rejected earlier, at
    /// configuration deserialization, before any store mutation.
    pub fn new(config: TrainerConfig, buffer: SharedReplayBuffer) -> Self {
        let strategy = Strategy::from_config(&config);
        Self {
            config,
            buffer,
            strategy,
            state: TrainerState::Idle,
            cancel: CancelToken::new(),
        }
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    /// Token for cooperative cancellation of the in-flight run.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Trained policy evaluator (untrained defaults before any run).
    pub fn actor(&self) -> &Actor {
        self.strategy.actor()
    }

    /// Drive the bound strategy through one unit of work, then export
    /// the checkpoint artifact.
    ///
    /// An empty store still checkpoints the (untrained) policy. A
    /// cancelled run writes no artifact and returns the orchestrator to
    /// `Idle` with parameters in their pre-run state.
    pub fn run(&mut self) -> Result<TrainReport> {
        match self.state {
            TrainerState::Idle | TrainerState::Checkpointed => {}
            from => {
                return Err(KolrlError::InvalidStateTransition {
                    from: from.to_string(),
                    to: TrainerState::Running.to_string(),
                })
            }
        }
        self.state = TrainerState::Running;

        let run_id = Uuid::new_v4();
        let span = info_span!(
            "training_run",
            run_id = %run_id,
            algorithm = %self.strategy.algorithm(),
        );
        let _guard = span.enter();

        info!(transitions = self.buffer.len(), "training run started");

        let report = match self.strategy.train(&self.buffer, &self.cancel) {
            Ok(report) => report,
            Err(KolrlError::Cancelled) => {
                info!("training run cancelled, no artifact written");
                self.state = TrainerState::Idle;
                self.cancel = CancelToken::new();
                return Err(KolrlError::Cancelled);
            }
            Err(e) => {
                error!(error = %e, "training run failed");
                self.state = TrainerState::Failed;
                return Err(e);
            }
        };

        if let Err(e) = self.strategy.export(&self.config.checkpoint_path) {
            error!(error = %e, "checkpoint export failed");
            self.state = TrainerState::Failed;
            return Err(e);
        }

        self.state = TrainerState::Checkpointed;
        info!(
            batches = report.batches,
            transitions = report.transitions_seen,
            checkpoint = %self.config.checkpoint_path.display(),
            "training run checkpointed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Transition;
    use crate::config::Algorithm;
    use std::env::temp_dir;
    use std::path::PathBuf;

    fn scratch_checkpoint(name: &str) -> PathBuf {
        temp_dir()
            .join(format!("kolrl_trainer_{}_{}", name, Uuid::new_v4()))
            .join("policy.json")
    }

    fn config_for(algorithm: Algorithm, path: PathBuf) -> TrainerConfig {
        let mut cfg = TrainerConfig::new(algorithm, path);
        cfg.batch_size = 4;
        cfg
    }

    fn filled_buffer(n: usize) -> SharedReplayBuffer {
        let buffer = SharedReplayBuffer::with_capacity(n.max(1));
        for i in 0..n {
            let x = i as f64 / n.max(1) as f64;
            buffer.push(Transition::new(vec![x, -x], 0.1, x, vec![x, -x], false));
        }
        buffer
    }

    #[test]
    fn run_checkpoints_on_success() {
        let path = scratch_checkpoint("success");
        let mut trainer = RlTrainer::new(
            config_for(Algorithm::Cql, path.clone()),
            filled_buffer(8),
        );

        assert_eq!(trainer.state(), TrainerState::Idle);
        trainer.run().unwrap();
        assert_eq!(trainer.state(), TrainerState::Checkpointed);
        assert!(path.exists());
    }

    #[test]
    fn empty_store_still_checkpoints_default_policy() {
        for algorithm in [Algorithm::Cql, Algorithm::Iql] {
            let path = scratch_checkpoint("empty");
            let mut trainer =
                RlTrainer::new(config_for(algorithm, path.clone()), filled_buffer(0));

            let report = trainer.run().unwrap();
            assert_eq!(report.batches, 0);
            assert_eq!(trainer.state(), TrainerState::Checkpointed);
            assert!(path.exists());
        }
    }

    #[test]
    fn unwritable_destination_fails_the_run() {
        // A path under an existing *file* cannot be created.
        let blocker = temp_dir().join(format!("kolrl_blocker_{}", Uuid::new_v4()));
        std::fs::write(&blocker, b"x").unwrap();
        let path = blocker.join("policy.json");

        let mut trainer = RlTrainer::new(config_for(Algorithm::Iql, path), filled_buffer(4));
        assert!(matches!(trainer.run(), Err(KolrlError::Checkpoint(_))));
        assert_eq!(trainer.state(), TrainerState::Failed);

        // Terminal: a failed trainer refuses further runs.
        assert!(matches!(
            trainer.run(),
            Err(KolrlError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn repeated_runs_rearm_for_incremental_training() {
        let path = scratch_checkpoint("rearm");
        let mut trainer = RlTrainer::new(
            config_for(Algorithm::Iql, path.clone()),
            filled_buffer(16),
        );

        for _ in 0..3 {
            let report = trainer.run().unwrap();
            assert_eq!(report.batches, 1);
        }
        assert_eq!(trainer.state(), TrainerState::Checkpointed);
    }

    #[test]
    fn pre_cancelled_run_writes_no_artifact_and_returns_to_idle() {
        let path = scratch_checkpoint("cancel");
        let mut trainer = RlTrainer::new(
            config_for(Algorithm::Cql, path.clone()),
            filled_buffer(8),
        );

        trainer.cancel_token().cancel();
        assert!(matches!(trainer.run(), Err(KolrlError::Cancelled)));
        assert_eq!(trainer.state(), TrainerState::Idle);
        assert!(!path.exists());

        // A fresh token is armed; the next run proceeds normally.
        trainer.run().unwrap();
        assert_eq!(trainer.state(), TrainerState::Checkpointed);
    }
}
