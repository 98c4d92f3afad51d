//! Built-in geometry builders.
//!
//! - [`CulledMeshBuilder`]: one quad per visible block face, bucketed by side
//! - [`BoxShapeBuilder`]: axis-aligned boxes covering runs of solid blocks

pub mod culled;
pub mod shape;

pub use culled::{CulledMeshBuilder, FaceInstance, MeshSide, RegionMesh};
pub use shape::{BoxShapeBuilder, CollisionBox, CollisionShape};
