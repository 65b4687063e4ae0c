//! KOL offline-RL trading agent.
//!
//! Turns influencer ("KOL") text and market features into a bounded
//! trading-position recommendation. Training is fully offline: logged
//! transitions flow into a bounded FIFO store, an interchangeable
//! strategy (conservative or implicit Q-learning) samples and updates
//! the policy, and the orchestrator persists an atomic checkpoint
//! artifact.

pub mod agent;
pub mod algo;
pub mod buffer;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod logging;
pub mod policy;
pub mod state;
pub mod text;
pub mod trainer;

pub use agent::{KolAgent, Prediction};
pub use algo::{CancelToken, Strategy, TrainReport};
pub use buffer::{ReplayBuffer, SharedReplayBuffer, Transition};
pub use checkpoint::{PolicyCheckpoint, CHECKPOINT_FORMAT_VERSION};
pub use config::{Algorithm, AppConfig, BufferConfig, TrainerConfig};
pub use error::{KolrlError, Result};
pub use policy::{Actor, Critic, PolicyOutput};
pub use state::{MarketFeatures, StateBuilder};
pub use trainer::{RlTrainer, TrainerState};
