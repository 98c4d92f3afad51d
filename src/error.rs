//! # Error Types
//!
//! Every fallible operation in the crate reports one of the enums below.
//! Dependency gaps during generation are not errors; they surface as
//! [`GenerationStep::Blocked`](crate::engine_state::voxels::generation::GenerationStep).

use crate::engine_state::voxels::region::RegionPos;

/// A coordinate did not fit the 21-bit signed lane of a Morton key.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{axis} coordinate {value} is outside the Morton range [-1048576, 1048575]")]
pub struct MortonRangeError {
    /// The axis that overflowed (`'x'`, `'y'` or `'z'`).
    pub axis: char,
    /// The offending value.
    pub value: i32,
}

/// Invariant violations on the region graph.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("a region already exists at {0}")]
    RegionAlreadyExists(RegionPos),
    #[error("no region exists at {0}")]
    RegionNotFound(RegionPos),
    #[error(transparent)]
    OutOfRange(#[from] MortonRangeError),
}

/// Errors raised by the region index.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("octree depth {0} is outside 1..=10")]
    InvalidDepth(u32),
    #[error("level {level} exceeds octree depth {depth}")]
    InvalidLevel { level: u32, depth: u32 },
    #[error(transparent)]
    OutOfRange(#[from] MortonRangeError),
}

/// A generator list that cannot form a valid pipeline.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("generator `{0}` is registered more than once")]
    DuplicateIdentifier(String),
    #[error("generator `{generator}` depends on unknown generator `{dependency}`")]
    UnknownDependency { generator: String, dependency: String },
    #[error("generator `{generator}` must be registered after its dependency `{dependency}`")]
    DependencyOrder { generator: String, dependency: String },
}

/// Configuration could not be parsed or failed validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read engine configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse engine configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid engine configuration: {0}")]
    Invalid(String),
}

/// Failures while assembling an engine.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Failures a background scheduler pass logs and skips past.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Worker management failures.
#[derive(thiserror::Error, Debug)]
pub enum TaskError {
    #[error("failed to spawn worker thread `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Main-thread queue misuse.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("main-thread actions may only be drained on the thread that owns the queue")]
    WrongThread,
}
