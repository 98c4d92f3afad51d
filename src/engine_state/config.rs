//! # Engine Configuration
//!
//! Tunables for streaming, loadable from JSON. Every field has a default, so
//! a partial document only overrides what it names.
//!
//! All distances are measured in regions. Generation and rendering use the
//! Euclidean distance from the observer to a region's bounds; unloading uses
//! the per-axis (Chebyshev) distance between region positions.

use std::path::Path;

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::error::ConfigError;

use super::voxels::region_index::MAX_DEPTH;

/// Settings for an [`EngineState`](super::EngineState).
///
/// # Examples
///
/// ```
/// use voxel_world::engine_state::config::EngineConfig;
///
/// let config = EngineConfig::from_json_str(r#"{ "render_distance": 3 }"#).unwrap();
/// assert_eq!(config.render_distance, 3);
/// assert_eq!(config.generation_distance, 7);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Octree depth of the region index; super-regions span `2^depth` regions.
    pub octree_depth: u32,
    /// Regions within this distance are created and generated.
    pub generation_distance: u32,
    /// Regions within this distance get meshes and collision shapes.
    pub render_distance: u32,
    /// Regions farther than this are unloaded.
    pub keep_distance: u32,
    pub generation_workers: usize,
    /// Nearest candidates a worker considers per pass.
    pub candidates_per_pass: usize,
    /// Longest sleep of an idle worker, in milliseconds.
    pub idle_wait_ms: u64,
    /// Terrain seed; a random one is drawn when absent.
    pub seed: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            octree_depth: 5,
            generation_distance: 7,
            render_distance: 5,
            keep_distance: 9,
            generation_workers: 1,
            candidates_per_pass: 8,
            idle_wait_ms: 10,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    /// [`ConfigError::Parse`] for malformed JSON, [`ConfigError::Invalid`]
    /// when [`validate`](Self::validate) rejects the values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON file and parses it like [`from_json_str`](Self::from_json_str).
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as `from_json_str`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the relationships between the distances.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid(message));

        if !(1..=MAX_DEPTH).contains(&self.octree_depth) {
            return invalid(format!(
                "octree_depth must be between 1 and {MAX_DEPTH}, got {}",
                self.octree_depth
            ));
        }
        if self.render_distance + 2 > self.generation_distance {
            return invalid(format!(
                "render_distance ({}) must be at least 2 below generation_distance ({})",
                self.render_distance, self.generation_distance
            ));
        }
        if self.keep_distance < self.generation_distance + 2 {
            return invalid(format!(
                "keep_distance ({}) must be at least generation_distance + 2 ({})",
                self.keep_distance,
                self.generation_distance + 2
            ));
        }
        // The search only covers the 3x3x3 super-regions around the observer.
        if self.generation_distance + 1 > 1 << self.octree_depth {
            return invalid(format!(
                "generation_distance ({}) does not fit an octree of depth {}",
                self.generation_distance, self.octree_depth
            ));
        }
        if self.generation_workers == 0 {
            return invalid("generation_workers must be at least 1".to_owned());
        }
        if self.candidates_per_pass == 0 {
            return invalid("candidates_per_pass must be at least 1".to_owned());
        }
        Ok(())
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    /// The configured seed, or a fresh random one.
    pub fn seed_or_random(&self) -> u32 {
        self.seed.unwrap_or_else(|| fastrand::u32(..))
    }
}
