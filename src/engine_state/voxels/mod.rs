//! # Voxel Engine Core
//!
//! This module contains the core voxel engine functionality, providing the foundation
//! for representing, manipulating, and streaming a voxel-based world.
//!
//! ## Architecture
//!
//! The voxel system is organized into several key components:
//!
//! * **Block**: Defines individual voxel types, properties, and behaviors
//! * **Region**: A 16x16x16 block of cells in palette-compressed storage, linked to its neighbours
//! * **Region Index**: A chunked octree of aggregated region states used for nearest-first search
//! * **Generation**: Ordered generators that fill regions, possibly reading their neighbours
//! * **World**: Owns every loaded region and maintains the neighbour graph
//! * **Events**: Ready and unloaded notifications
//! * **Tasks**: Background scheduling of generation, meshing and shaping
//!
//! ## Performance Considerations
//!
//! * Regions are loaded/unloaded dynamically based on observer position
//! * Uniform regions cost no cell storage until a non-default block is written
//! * The index lets workers skip whole finished subtrees without visiting them
//! * Geometry is built from snapshots so no lock is held while building
//!
//! ## Data Flow
//!
//! 1. A worker finds the nearest region that still needs work in the index
//! 2. The world creates the region if necessary and the pipeline generates it
//! 3. Once a region and its neighbours are generated it is ready and gets meshed
//! 4. Completed meshes are handed to the main thread
//!
//! ## Thread Safety
//!
//! * Regions sit behind per-region read-write locks
//! * Locks are taken in the order in-flight set, world, region, index
//! * At most one worker works on a region at a time

pub mod block;
pub mod events;
pub mod generation;
pub mod region;
pub mod region_index;
pub mod tasks;
pub mod world;
