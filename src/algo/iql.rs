//! Implicit Q-Learning
//!
//! Offline-RL strategy that avoids explicit out-of-distribution
//! penalties: a separate state-value head is fit by expectile regression
//! against Q, Q regresses toward the value bootstrap, and the actor is
//! pulled toward logged actions weighted by their advantage. One call
//! processes exactly one sampled batch, so multi-step training loops at
//! the caller.

use std::path::Path;
use tracing::debug;

use super::{CancelToken, TrainReport};
use crate::buffer::{SharedReplayBuffer, Transition};
use crate::checkpoint::PolicyCheckpoint;
use crate::config::{Algorithm, TrainerConfig};
use crate::error::{KolrlError, Result};
use crate::policy::{Actor, Critic, LinearHead};

/// Cap on the advantage weight so a single outlier transition cannot
/// dominate an actor step.
const MAX_ADVANTAGE_WEIGHT: f64 = 100.0;

#[derive(Debug)]
pub struct IqlTrainer {
    actor: Actor,
    critic: Critic,
    /// State-value head fit by expectile regression; training-internal.
    value: LinearHead,
    config: TrainerConfig,
    steps: u64,
}

impl IqlTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            actor: Actor::new(),
            critic: Critic::new(),
            value: LinearHead::default(),
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

    /// One call = one sampled batch. Empty store is a no-op; the
    /// cancellation token is honored before any parameter is touched.
    pub fn train_step(
        &mut self,
        buffer: &SharedReplayBuffer,
        cancel: &CancelToken,
    ) -> Result<TrainReport> {
        if cancel.is_cancelled() {
            return Err(KolrlError::Cancelled);
        }

        let batch = buffer.sample(self.config.batch_size);
        if batch.is_empty() {
            debug!("transition store empty, skipping step");
            return Ok(TrainReport::default());
        }

        let transitions_seen = batch.len();
        for t in &batch {
            self.train_transition(t);
        }

        debug!(transitions = transitions_seen, "iql step complete");
        Ok(TrainReport {
            batches: 1,
            transitions_seen,
        })
    }

    fn train_transition(&mut self, t: &Transition) {
        let tau = self.config.iql_tau;
        let beta = self.config.iql_beta;
        let gamma = self.config.gamma;
        let critic_lr = self.config.critic_lr;
        let actor_lr = self.config.actor_lr;

        self.actor.ensure_dim(t.state.len());
        self.critic.ensure_dim(t.state.len());
        if self.value.weights.len() != t.state.len() {
            self.value = LinearHead::zeros(t.state.len());
        }

        // Expectile regression of V toward Q: errors above V count with
        // weight tau, errors below with 1 - tau.
        let q = self.critic.evaluate(&t.state, t.action);
        let v = self.value.score(&t.state);
        let residual = q - v;
        let expectile_weight = if residual < 0.0 { 1.0 - tau } else { tau };
        self.value
            .nudge(&t.state, critic_lr * expectile_weight * residual);

        // Q regresses toward the value bootstrap; no action penalty.
        let not_done = if t.done { 0.0 } else { 1.0 };
        let target = t.reward + gamma * not_done * self.value.score(&t.next_state);
        self.critic.update_towards(&t.state, t.action, target, critic_lr);

        // Advantage-weighted regression of the actor toward the logged
        // action.
        let advantage = q - v;
        let weight = (beta * advantage).exp().min(MAX_ADVANTAGE_WEIGHT);
        let error = t.action - self.actor.raw_score(&t.state);
        let head = (self.steps % 2) as usize;
        self.actor
            .nudge_head(head, &t.state, actor_lr * weight * error);
        self.steps += 1;
    }

    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        PolicyCheckpoint::new(Algorithm::Iql, self.actor.clone(), self.critic.clone())
            .with_metadata(serde_json::json!({
                "gradient_steps": self.steps,
                "gamma": self.config.gamma,
                "iql_tau": self.config.iql_tau,
                "iql_beta": self.config.iql_beta,
            }))
            .save(path)
    }
}
