//! Checkpoint Artifact
//!
//! Self-describing JSON snapshot of trained policy/value parameters,
//! version-tagged so loads against a mismatched layout fail early.
//! Writes are all-or-nothing: serialize to a sibling temp file, then
//! rename over the destination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::Algorithm;
use crate::error::{KolrlError, Result};
use crate::policy::{Actor, Critic};

/// Current artifact format version
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// Persisted snapshot of a trained policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyCheckpoint {
    /// Artifact format tag, checked on load
    pub format_version: u32,
    /// Algorithm that produced the artifact
    pub algorithm: Algorithm,
    /// State dimension the parameters are shaped for (0 if untrained)
    pub state_dim: usize,
    pub actor: Actor,
    pub critic: Critic,
    pub created_at: DateTime<Utc>,
    /// Free-form training info (batches seen, hyperparameters, ...)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl PolicyCheckpoint {
    pub fn new(algorithm: Algorithm, actor: Actor, critic: Critic) -> Self {
        let state_dim = actor.heads().0.weights.len();
        Self {
            format_version: CHECKPOINT_FORMAT_VERSION,
            algorithm,
            state_dim,
            actor,
            critic,
            created_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Write the artifact atomically to `path`.
    ///
    /// The destination never holds a partial artifact: content lands in
    /// `<file>.tmp` first and is renamed into place only once fully
    /// written. Any failure surfaces as a checkpoint error.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    KolrlError::Checkpoint(format!(
                        "cannot create checkpoint directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let file_name = path
            .file_name()
            .ok_or_else(|| {
                KolrlError::Checkpoint(format!("invalid checkpoint path: {}", path.display()))
            })?
            .to_os_string();
        let mut tmp_name = file_name;
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| KolrlError::Checkpoint(format!("serialize failed: {e}")))?;

        if let Err(e) = fs::write(&tmp_path, &bytes) {
            let _ = fs::remove_file(&tmp_path);
            return Err(KolrlError::Checkpoint(format!(
                "write to {} failed: {e}",
                tmp_path.display()
            )));
        }

        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(KolrlError::Checkpoint(format!(
                "rename into {} failed: {e}",
                path.display()
            )));
        }

        info!(path = %path.display(), algorithm = %self.algorithm, "checkpoint saved");
        Ok(())
    }

    /// Load and validate an artifact.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(KolrlError::CheckpointNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;
        let checkpoint: Self = serde_json::from_str(&content)?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    /// Check the version tag and that parameter shapes match the
    /// declared state dimension.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(KolrlError::Checkpoint(format!(
                "unsupported checkpoint format version {} (expected {})",
                self.format_version, CHECKPOINT_FORMAT_VERSION
            )));
        }
        let (head_a, head_b) = self.actor.heads();
        if head_a.weights.len() != self.state_dim || head_b.weights.len() != self.state_dim {
            return Err(KolrlError::Checkpoint(format!(
                "actor shape {}/{} does not match state_dim {}",
                head_a.weights.len(),
                head_b.weights.len(),
                self.state_dim
            )));
        }
        let (q1, q2) = self.critic.heads();
        if q1.state_weights.len() != self.state_dim || q2.state_weights.len() != self.state_dim {
            return Err(KolrlError::Checkpoint(format!(
                "critic shape {}/{} does not match state_dim {}",
                q1.state_weights.len(),
                q2.state_weights.len(),
                self.state_dim
            )));
        }
        Ok(())
    }

    /// Rebuild an actor of matching architecture for inference.
    pub fn into_actor(self) -> Actor {
        self.actor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    fn scratch_path(name: &str) -> std::path::PathBuf {
        temp_dir().join(format!("kolrl_{}_{}", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut actor = Actor::new();
        actor.ensure_dim(3);
        let mut critic = Critic::new();
        critic.ensure_dim(3);

        let path = scratch_path("ckpt").join("policy.json");
        let checkpoint = PolicyCheckpoint::new(Algorithm::Iql, actor.clone(), critic);
        checkpoint.save(&path).unwrap();

        let loaded = PolicyCheckpoint::load(&path).unwrap();
        assert_eq!(loaded.format_version, CHECKPOINT_FORMAT_VERSION);
        assert_eq!(loaded.state_dim, 3);
        assert_eq!(loaded.into_actor(), actor);
    }

    #[test]
    fn no_temp_file_remains_after_save() {
        let dir = scratch_path("tmpfree");
        let path = dir.join("policy.json");
        PolicyCheckpoint::new(Algorithm::Cql, Actor::new(), Critic::new())
            .save(&path)
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["policy.json".to_string()]);
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let path = scratch_path("ver").join("policy.json");
        let mut checkpoint = PolicyCheckpoint::new(Algorithm::Cql, Actor::new(), Critic::new());
        checkpoint.format_version = 99;
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_vec(&checkpoint).unwrap()).unwrap();

        assert!(matches!(
            PolicyCheckpoint::load(&path),
            Err(KolrlError::Checkpoint(_))
        ));
    }

    #[test]
    fn missing_artifact_is_distinguishable() {
        let path = scratch_path("missing").join("policy.json");
        assert!(matches!(
            PolicyCheckpoint::load(&path),
            Err(KolrlError::CheckpointNotFound(_))
        ));
    }
}
