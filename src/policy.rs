//! Policy and Value Evaluators
//!
//! CPU-only linear function approximators with explicit weight vectors,
//! deterministic and dependency-light. The actor carries twin heads so
//! confidence can be derived from ensemble disagreement; the critic is a
//! twin-Q pair and never crosses the inference boundary.

use serde::{Deserialize, Serialize};

/// Output of one policy evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyOutput {
    /// Target position in [-1, 1]
    pub target_position: f64,
    /// Certainty estimate in [0, 1]
    pub confidence: f64,
}

/// One linear scoring head: `w . x + b`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearHead {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LinearHead {
    pub fn zeros(dim: usize) -> Self {
        Self {
            weights: vec![0.0; dim],
            bias: 0.0,
        }
    }

    /// Uniform averaging prior: untrained heads score a state by its mean.
    fn uniform_prior(dim: usize) -> Self {
        Self {
            weights: vec![1.0 / dim.max(1) as f64; dim],
            bias: 0.0,
        }
    }

    pub fn score(&self, x: &[f64]) -> f64 {
        if self.weights.len() == x.len() && !x.is_empty() {
            self.weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + self.bias
        } else {
            // Dim mismatch or unshaped head: fall back to the averaging
            // prior so evaluation stays total and deterministic.
            x.iter().sum::<f64>() / x.len().max(1) as f64 + self.bias
        }
    }

    /// Gradient step: `w += scale * x`, `b += scale`.
    pub fn nudge(&mut self, x: &[f64], scale: f64) {
        for (w, v) in self.weights.iter_mut().zip(x) {
            *w += scale * v;
        }
        self.bias += scale;
    }
}

/// Policy evaluator mapping a state vector to a bounded action.
///
/// Pure function of its input for a fixed parameter set. The output
/// clamp to [-1, 1] is a safety invariant for downstream position
/// sizing and is applied unconditionally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    head_a: LinearHead,
    head_b: LinearHead,
}

impl Actor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heads(&self) -> (&LinearHead, &LinearHead) {
        (&self.head_a, &self.head_b)
    }

    /// Shape both heads for the given state dimension if not already.
    pub fn ensure_dim(&mut self, dim: usize) {
        if self.head_a.weights.len() != dim {
            self.head_a = LinearHead::uniform_prior(dim);
            self.head_b = LinearHead::uniform_prior(dim);
        }
    }

    /// Unclamped policy score at a state (mean of the twin heads).
    pub fn raw_score(&self, state: &[f64]) -> f64 {
        (self.head_a.score(state) + self.head_b.score(state)) / 2.0
    }

    /// Evaluate the policy at a state.
    pub fn act(&self, state: &[f64]) -> PolicyOutput {
        let score_a = self.head_a.score(state);
        let score_b = self.head_b.score(state);

        let target_position = ((score_a + score_b) / 2.0).clamp(-1.0, 1.0);
        // Monotone in head agreement: identical heads give 1.0,
        // disagreement decays toward 0.
        let confidence = (1.0 / (1.0 + (score_a - score_b).abs())).clamp(0.0, 1.0);

        PolicyOutput {
            target_position,
            confidence,
        }
    }

    /// Gradient step on one head (0 or 1); trainers alternate heads so
    /// the ensemble decorrelates.
    pub fn nudge_head(&mut self, head: usize, state: &[f64], scale: f64) {
        if head % 2 == 0 {
            self.head_a.nudge(state, scale);
        } else {
            self.head_b.nudge(state, scale);
        }
    }
}

/// One Q head: `w_s . s + w_a * a + b`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QHead {
    pub state_weights: Vec<f64>,
    pub action_weight: f64,
    pub bias: f64,
}

impl QHead {
    fn zeros(dim: usize) -> Self {
        Self {
            state_weights: vec![0.0; dim],
            action_weight: 0.0,
            bias: 0.0,
        }
    }

    fn q(&self, state: &[f64], action: f64) -> f64 {
        let dot: f64 = self
            .state_weights
            .iter()
            .zip(state)
            .map(|(w, v)| w * v)
            .sum();
        dot + self.action_weight * action + self.bias
    }

    /// Gradient step toward reducing squared error by `scale * error`.
    fn nudge(&mut self, state: &[f64], action: f64, scale: f64) {
        for (w, v) in self.state_weights.iter_mut().zip(state) {
            *w += scale * v;
        }
        self.action_weight += scale * action;
        self.bias += scale;
    }

    /// Sensitivity of Q to the action input.
    pub fn action_grad(&self) -> f64 {
        self.action_weight
    }
}

/// Value evaluator over (state, action) pairs.
///
/// Twin-Q: `evaluate` returns the pessimistic minimum of the pair, the
/// standard guard against value over-estimation in offline training.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Critic {
    q1: QHead,
    q2: QHead,
}

impl Critic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_heads(q1: QHead, q2: QHead) -> Self {
        Self { q1, q2 }
    }

    pub fn heads(&self) -> (&QHead, &QHead) {
        (&self.q1, &self.q2)
    }

    pub fn ensure_dim(&mut self, dim: usize) {
        if self.q1.state_weights.len() != dim {
            self.q1 = QHead::zeros(dim);
            self.q2 = QHead::zeros(dim);
        }
    }

    /// Pessimistic value estimate: `min(q1, q2)`.
    pub fn evaluate(&self, state: &[f64], action: f64) -> f64 {
        self.q1.q(state, action).min(self.q2.q(state, action))
    }

    /// TD step on both heads toward `target` at `(state, action)`.
    pub fn update_towards(&mut self, state: &[f64], action: f64, target: f64, lr: f64) {
        let err1 = target - self.q1.q(state, action);
        self.q1.nudge(state, action, lr * err1);
        let err2 = target - self.q2.q(state, action);
        self.q2.nudge(state, action, lr * err2);
    }

    /// Push the pair's value at `(state, action)` down (or up, negative
    /// `amount`) without a regression target. Used by the conservative
    /// penalty.
    pub fn penalize(&mut self, state: &[f64], action: f64, amount: f64) {
        self.q1.nudge(state, action, -amount);
        self.q2.nudge(state, action, -amount);
    }

    /// Mean action-sensitivity of the pair, the policy-gradient signal
    /// for a linear-Q critic.
    pub fn action_grad(&self) -> f64 {
        (self.q1.action_grad() + self.q2.action_grad()) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untrained_actor_clamps_mean_score() {
        let actor = Actor::new();
        let out = actor.act(&[2.0, 3.0]);
        assert_eq!(out.target_position, 1.0);
    }

    #[test]
    fn clamp_holds_for_adversarial_states() {
        let mut actor = Actor::new();
        actor.ensure_dim(3);
        for state in [
            vec![1e12, 1e12, 1e12],
            vec![-1e12, -1e12, -1e12],
            vec![f64::MAX / 4.0, 0.0, 0.0],
        ] {
            let out = actor.act(&state);
            assert!((-1.0..=1.0).contains(&out.target_position));
            assert!((0.0..=1.0).contains(&out.confidence));
        }
    }

    #[test]
    fn act_is_deterministic() {
        let mut actor = Actor::new();
        actor.ensure_dim(4);
        actor.nudge_head(0, &[1.0, 2.0, 3.0, 4.0], 0.01);
        let state = [0.1, -0.2, 0.3, -0.4];
        assert_eq!(actor.act(&state), actor.act(&state));
    }

    #[test]
    fn confidence_decays_with_head_disagreement() {
        let mut actor = Actor::new();
        actor.ensure_dim(2);
        let agreed = actor.act(&[0.1, 0.1]).confidence;
        actor.nudge_head(0, &[1.0, 1.0], 0.5);
        let disagreed = actor.act(&[0.1, 0.1]).confidence;
        assert!(disagreed < agreed);
    }

    #[test]
    fn critic_update_moves_estimate_toward_target() {
        let mut critic = Critic::new();
        critic.ensure_dim(2);
        let state = [1.0, -1.0];
        let before = critic.evaluate(&state, 0.5);
        for _ in 0..200 {
            critic.update_towards(&state, 0.5, 2.0, 0.05);
        }
        let after = critic.evaluate(&state, 0.5);
        assert!((after - 2.0).abs() < (before - 2.0).abs());
    }

    #[test]
    fn evaluate_is_min_of_pair() {
        let q1 = QHead {
            state_weights: vec![1.0],
            action_weight: 0.0,
            bias: 0.0,
        };
        let q2 = QHead {
            state_weights: vec![2.0],
            action_weight: 0.0,
            bias: 0.0,
        };
        let critic = Critic::from_heads(q1, q2);
        assert_eq!(critic.evaluate(&[1.0], 0.0), 1.0);
    }
}
