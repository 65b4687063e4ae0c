//! Inference Agent
//!
//! Wires the text pipeline, state assembler, and policy evaluator into
//! the `predict` boundary. The critic never appears here; inference is
//! actor-only.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use crate::checkpoint::PolicyCheckpoint;
use crate::error::Result;
use crate::policy::Actor;
use crate::state::{MarketFeatures, StateBuilder};
use crate::text::{KolTextEncoder, TextChunker, TextCleaner};

/// One inference response
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// Recommended position in [-1, 1]
    pub target_position: f64,
    /// Policy certainty in [0, 1]
    pub confidence: f64,
    /// When the prediction was made (RFC 3339)
    pub timestamp: DateTime<Utc>,
}

/// KOL trading agent: text plus market features in, position out.
pub struct KolAgent {
    cleaner: TextCleaner,
    chunker: TextChunker,
    encoder: KolTextEncoder,
    state_builder: StateBuilder,
    actor: Actor,
    last_position: f64,
}

impl KolAgent {
    /// Agent with an untrained (default) policy.
    pub fn new() -> Self {
        Self::with_actor(Actor::new())
    }

    pub fn with_actor(actor: Actor) -> Self {
        Self {
            cleaner: TextCleaner::default(),
            chunker: TextChunker::default(),
            encoder: KolTextEncoder::new(),
            state_builder: StateBuilder::new(),
            actor,
            last_position: 0.0,
        }
    }

    /// Load the policy from a checkpoint artifact.
    pub fn from_checkpoint<P: AsRef<Path>>(path: P) -> Result<Self> {
        let checkpoint = PolicyCheckpoint::load(path)?;
        Ok(Self::with_actor(checkpoint.into_actor()))
    }

    /// Position carried into the next state vector.
    pub fn last_position(&self) -> f64 {
        self.last_position
    }

    /// Produce a trading recommendation for one piece of KOL text and a
    /// snapshot of market features.
    pub fn predict(&mut self, kol_text: &str, market: &MarketFeatures) -> Prediction {
        let cleaned = self.cleaner.clean(kol_text);
        let chunks = self.chunker.chunk(&cleaned);
        let kol_features = self.encoder.encode(&chunks);

        let state = self
            .state_builder
            .build(market, &kol_features, self.last_position);
        debug!(state_dim = state.len(), "assembled state vector");

        let output = self.actor.act(&state);
        self.last_position = output.target_position;

        Prediction {
            target_position: output.target_position,
            confidence: output.confidence,
            timestamp: Utc::now(),
        }
    }
}

impl Default for KolAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_is_bounded() {
        let mut agent = KolAgent::new();
        let market: MarketFeatures = [("price", 1e9), ("volume", 1e9)].into_iter().collect();

        let prediction = agent.predict("TO THE MOON!!!", &market);
        assert!((-1.0..=1.0).contains(&prediction.target_position));
        assert!((0.0..=1.0).contains(&prediction.confidence));
    }

    #[test]
    fn last_position_feeds_the_next_state() {
        let mut agent = KolAgent::new();
        let market: MarketFeatures = [("price", 10.0)].into_iter().collect();

        assert_eq!(agent.last_position(), 0.0);
        let prediction = agent.predict("buy", &market);
        assert_eq!(agent.last_position(), prediction.target_position);
    }

    #[test]
    fn empty_text_degrades_to_market_features_only() {
        let mut agent = KolAgent::new();
        let market: MarketFeatures = [("price", 0.2)].into_iter().collect();

        // State is [0.2, last_position]; the untrained prior averages it.
        let prediction = agent.predict("", &market);
        assert!((prediction.target_position - 0.1).abs() < 1e-12);
    }
}
