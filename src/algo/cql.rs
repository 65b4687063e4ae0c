//! Conservative Q-Learning
//!
//! Offline-RL strategy that under-estimates value on purpose: alongside
//! the usual TD regression it pushes Q down on actor-proposed actions
//! and up on logged actions, penalizing out-of-distribution behavior the
//! dataset cannot vouch for.

use std::path::Path;
use tracing::debug;

use super::{CancelToken, TrainReport};
use crate::buffer::{SharedReplayBuffer, Transition};
use crate::checkpoint::PolicyCheckpoint;
use crate::config::{Algorithm, TrainerConfig};
use crate::error::{KolrlError, Result};
use crate::policy::{Actor, Critic};

#[derive(Debug)]
pub struct CqlTrainer {
    actor: Actor,
    critic: Critic,
    config: TrainerConfig,
    /// Total gradient steps taken across calls
    steps: u64,
}

impl CqlTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            actor: Actor::new(),
            critic: Critic::new(),
            config,
            steps: 0,
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn critic(&self) -> &Critic {
        &self.critic
    }

    /// One call = one epoch: as many sampled batches as the store holds
    /// transitions. Empty store is a no-op. On cancellation the
    /// parameters are restored to their pre-call state.
    pub fn train_epoch(
        &mut self,
        buffer: &SharedReplayBuffer,
        cancel: &CancelToken,
    ) -> Result<TrainReport> {
        let epoch_batches = buffer.len();
        if epoch_batches == 0 {
            debug!("transition store empty, skipping epoch");
            return Ok(TrainReport::default());
        }

        let snapshot = (self.actor.clone(), self.critic.clone(), self.steps);
        let mut report = TrainReport::default();

        for _ in 0..epoch_batches {
            if cancel.is_cancelled() {
                (self.actor, self.critic, self.steps) = snapshot;
                return Err(KolrlError::Cancelled);
            }

            let batch = buffer.sample(self.config.batch_size);
            if batch.is_empty() {
                break;
            }
            report.transitions_seen += batch.len();
            report.batches += 1;
            self.train_batch(&batch);
        }

        debug!(
            batches = report.batches,
            transitions = report.transitions_seen,
            "cql epoch complete"
        );
        Ok(report)
    }

    fn train_batch(&mut self, batch: &[Transition]) {
        let alpha = self.config.cql_alpha;
        let gamma = self.config.gamma;
        let critic_lr = self.config.critic_lr;
        let actor_lr = self.config.actor_lr;

        for t in batch {
            self.actor.ensure_dim(t.state.len());
            self.critic.ensure_dim(t.state.len());

            // TD regression toward the bootstrapped target.
            let next_action = self.actor.act(&t.next_state).target_position;
            let not_done = if t.done { 0.0 } else { 1.0 };
            let target = t.reward
                + gamma * not_done * self.critic.evaluate(&t.next_state, next_action);
            self.critic.update_towards(&t.state, t.action, target, critic_lr);

            // Conservative penalty: value of the policy's own action
            // shrinks, value of the logged action grows.
            let policy_action = self.actor.act(&t.state).target_position;
            self.critic
                .penalize(&t.state, policy_action, critic_lr * alpha);
            self.critic.penalize(&t.state, t.action, -critic_lr * alpha);

            // Deterministic policy-gradient step through the linear Q.
            let head = (self.steps % 2) as usize;
            self.actor
                .nudge_head(head, &t.state, actor_lr * self.critic.action_grad());
            self.steps += 1;
        }
    }

    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        PolicyCheckpoint::new(Algorithm::Cql, self.actor.clone(), self.critic.clone())
            .with_metadata(serde_json::json!({
                "gradient_steps": self.steps,
                "gamma": self.config.gamma,
                "cql_alpha": self.config.cql_alpha,
            }))
            .save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TrainerConfig {
        let mut cfg = TrainerConfig::new(Algorithm::Cql, "/tmp/unused.json");
        cfg.batch_size = 4;
        cfg
    }

    fn filled_buffer(n: usize) -> SharedReplayBuffer {
        let buffer = SharedReplayBuffer::with_capacity(n.max(1));
        for i in 0..n {
            let x = i as f64 / n as f64;
            buffer.push(Transition::new(
                vec![x, 1.0 - x],
                if x > 0.5 { 0.5 } else { -0.5 },
                x - 0.5,
                vec![x, 1.0 - x],
                i == n - 1,
            ));
        }
        buffer
    }

    #[test]
    fn empty_store_is_a_noop() {
        let mut trainer = CqlTrainer::new(test_config());
        let before = trainer.actor().clone();

        let report = trainer
            .train_epoch(&SharedReplayBuffer::with_capacity(8), &CancelToken::new())
            .unwrap();

        assert_eq!(report.batches, 0);
        assert_eq!(trainer.actor(), &before);
    }

    #[test]
    fn epoch_processes_one_batch_per_stored_transition() {
        let mut trainer = CqlTrainer::new(test_config());
        let buffer = filled_buffer(10);

        let report = trainer.train_epoch(&buffer, &CancelToken::new()).unwrap();
        assert_eq!(report.batches, 10);
        assert_eq!(report.transitions_seen, 40);
    }

    #[test]
    fn cancellation_restores_pre_call_parameters() {
        let mut trainer = CqlTrainer::new(test_config());
        let buffer = filled_buffer(10);

        // Warm up so parameters are shaped and non-trivial.
        trainer.train_epoch(&buffer, &CancelToken::new()).unwrap();
        let before = (trainer.actor().clone(), trainer.critic().clone());

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = trainer.train_epoch(&buffer, &cancel).unwrap_err();
        assert!(matches!(err, KolrlError::Cancelled));
        assert_eq!(trainer.actor(), &before.0);
        assert_eq!(trainer.critic(), &before.1);
    }

    #[test]
    fn training_moves_parameters() {
        let mut trainer = CqlTrainer::new(test_config());
        let buffer = filled_buffer(10);
        let before = trainer.actor().clone();

        trainer.train_epoch(&buffer, &CancelToken::new()).unwrap();
        assert_ne!(trainer.actor(), &before);
    }
}
