//! Transition Store
//!
//! Capacity-bounded store of logged transitions with strict FIFO
//! eviction, backed by a fixed ring buffer with a write cursor so
//! sustained ingestion never reallocates. Sampling is a uniform random
//! draw without replacement; insertion order only matters for eviction.

use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// A single logged decision step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// State features before the action
    pub state: Vec<f64>,
    /// Target position taken, in [-1, 1]
    pub action: f64,
    /// Reward received
    pub reward: f64,
    /// State features after the action
    pub next_state: Vec<f64>,
    /// Whether the episode terminated
    pub done: bool,
}

impl Transition {
    pub fn new(state: Vec<f64>, action: f64, reward: f64, next_state: Vec<f64>, done: bool) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }

    /// Check the transition is well-formed before it is admitted to the
    /// store: non-empty state, matching next-state length, finite numbers.
    pub fn validate(&self) -> Result<(), String> {
        if self.state.is_empty() {
            return Err("state must not be empty".to_string());
        }
        if self.next_state.len() != self.state.len() {
            return Err(format!(
                "next_state length {} != state length {}",
                self.next_state.len(),
                self.state.len()
            ));
        }
        if self.state.iter().chain(self.next_state.iter()).any(|v| !v.is_finite()) {
            return Err("state contains non-finite values".to_string());
        }
        if !self.action.is_finite() || !self.reward.is_finite() {
            return Err("action and reward must be finite".to_string());
        }
        Ok(())
    }
}

/// Ring-buffered transition store with FIFO eviction
#[derive(Debug)]
pub struct ReplayBuffer {
    /// Backing storage; grows to capacity once, then slots are reused
    slots: Vec<Transition>,
    /// Overwrite cursor, pointing at the oldest slot once full
    write: usize,
    /// Maximum retained transitions
    capacity: usize,
}

impl ReplayBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            write: 0,
            capacity,
        }
    }

    /// Add a transition, evicting the oldest at capacity.
    ///
    /// Malformed transitions are rejected here, logged, and never
    /// stored; the producer keeps running. Returns whether the
    /// transition was admitted.
    pub fn push(&mut self, transition: Transition) -> bool {
        if let Err(reason) = transition.validate() {
            warn!(%reason, "rejecting malformed transition");
            return false;
        }
        if self.slots.len() < self.capacity {
            self.slots.push(transition);
        } else {
            self.slots[self.write] = transition;
            self.write = (self.write + 1) % self.capacity;
        }
        true
    }

    /// Uniform random sample without replacement.
    ///
    /// Returns at most `min(batch_size, len)` transitions; an empty
    /// store yields an empty batch, which callers treat as "nothing to
    /// train on", not an error.
    pub fn sample(&self, batch_size: usize) -> Vec<Transition> {
        let mut indices: Vec<usize> = (0..self.slots.len()).collect();
        indices.shuffle(&mut thread_rng());
        indices
            .into_iter()
            .take(batch_size.min(self.slots.len()))
            .map(|i| self.slots[i].clone())
            .collect()
    }

    /// Stored transitions in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        // Once full, `write` points at the oldest slot.
        let (newest, oldest) = self.slots.split_at(self.write.min(self.slots.len()));
        oldest.iter().chain(newest.iter())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn fill_ratio(&self) -> f64 {
        self.slots.len() as f64 / self.capacity as f64
    }

    pub fn has_enough_samples(&self, min_samples: usize) -> bool {
        self.slots.len() >= min_samples
    }

    /// Wrap into a shareable handle for concurrent producers.
    pub fn into_shared(self) -> SharedReplayBuffer {
        SharedReplayBuffer(Arc::new(Mutex::new(self)))
    }
}

/// Shared handle over the transition store.
///
/// `push` and `sample` are serialized behind one lock; FIFO eviction and
/// batch sampling are not safely composable without ordering protection.
/// Producers at capacity drop-oldest rather than block.
#[derive(Debug, Clone)]
pub struct SharedReplayBuffer(Arc<Mutex<ReplayBuffer>>);

impl SharedReplayBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        ReplayBuffer::with_capacity(capacity).into_shared()
    }

    fn lock(&self) -> MutexGuard<'_, ReplayBuffer> {
        // A poisoning panic cannot leave the ring in an inconsistent
        // state (all mutation is a single slot write), so recover.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, transition: Transition) -> bool {
        self.lock().push(transition)
    }

    pub fn sample(&self, batch_size: usize) -> Vec<Transition> {
        self.lock().sample(batch_size)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn fill_ratio(&self) -> f64 {
        self.lock().fill_ratio()
    }

    /// Stored transitions in insertion order, oldest first.
    pub fn contents(&self) -> Vec<Transition> {
        self.lock().iter().cloned().collect()
    }
}

/// Load transitions from a JSON-lines dataset into the store.
///
/// Malformed lines are logged and skipped; returns (admitted, rejected).
pub fn load_jsonl<P: AsRef<Path>>(
    buffer: &SharedReplayBuffer,
    path: P,
) -> crate::error::Result<(usize, usize)> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);

    let mut admitted = 0;
    let mut rejected = 0;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Transition>(&line) {
            Ok(transition) => {
                if buffer.push(transition) {
                    admitted += 1;
                } else {
                    rejected += 1;
                }
            }
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "skipping unparseable transition");
                rejected += 1;
            }
        }
    }
    Ok((admitted, rejected))
}
