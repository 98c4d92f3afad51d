//! # Region Module
//!
//! A region is a 16x16x16 cube of blocks and the unit of storage, generation
//! and indexing in the voxel world.
//!
//! ## Ownership
//!
//! Regions are owned exclusively by the [`World`](super::world::World) map.
//! Each region keeps weak links to its 26 neighbours; the world is the only
//! place that creates or breaks those links, always in both directions.
//!
//! ## Cell Addressing
//!
//! Local cells are packed as `x | y << 4 | z << 8`, so consecutive indices
//! walk along X first.

use std::collections::HashSet;

use crate::core::{MtResource, WeakMtResource};

use super::block::Block;

pub mod neighbors;
pub mod palette_storage;
pub mod region_pos;

pub use neighbors::Neighbor;
pub use palette_storage::{PaletteEntry, PaletteStorage};
pub use region_pos::RegionPos;

/// The dimension (width, height, depth) of a region in blocks.
pub const REGION_DIMENSION: i32 = 16;
/// The number of blocks in a single 2D plane of a region.
pub const REGION_PLANE_SIZE: usize = (REGION_DIMENSION * REGION_DIMENSION) as usize;
/// The total number of blocks in a region.
pub const REGION_VOLUME: usize = REGION_PLANE_SIZE * REGION_DIMENSION as usize;

/// Storage type for the blocks of a region.
pub type BlockStorage = PaletteStorage<Block>;

/// Packs local cell coordinates into a storage index.
///
/// # Panics
/// Panics if any coordinate is 16 or more; such a cell would otherwise alias
/// one in the next row or layer.
#[inline]
pub fn cell_index(x: usize, y: usize, z: usize) -> usize {
    assert!(x < 16 && y < 16 && z < 16, "local cell ({x}, {y}, {z}) out of bounds");
    x | y << 4 | z << 8
}

/// Owned voxel data for one region plus its lifecycle bookkeeping.
pub struct Region {
    position: RegionPos,
    storage: BlockStorage,
    neighbors: [Option<WeakMtResource<Region>>; Neighbor::SLOTS],
    applied_generators: HashSet<String>,
    generated: bool,
    mesh_built: bool,
    shape_built: bool,
}

impl Region {
    /// Creates an all-air region with no neighbour links.
    pub fn new(position: RegionPos) -> Self {
        Self {
            position,
            storage: BlockStorage::new(),
            neighbors: std::array::from_fn(|_| None),
            applied_generators: HashSet::new(),
            generated: false,
            mesh_built: false,
            shape_built: false,
        }
    }

    pub fn position(&self) -> RegionPos {
        self.position
    }

    pub fn storage(&self) -> &BlockStorage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut BlockStorage {
        &mut self.storage
    }

    /// Reads the block at local coordinates.
    ///
    /// # Panics
    /// Panics if a coordinate is outside `0..16`, like [`PaletteStorage::get`].
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> Block {
        self.storage.get(cell_index(x, y, z))
    }

    /// Writes the block at local coordinates.
    ///
    /// # Panics
    /// Panics if a coordinate is outside `0..16`.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: Block) {
        self.storage.set(cell_index(x, y, z), block);
    }

    /// The live neighbour in the given direction, if one is loaded.
    pub fn neighbor(&self, neighbor: Neighbor) -> Option<MtResource<Region>> {
        self.neighbors[neighbor.index()]
            .as_ref()
            .and_then(WeakMtResource::upgrade)
    }

    /// Whether a link is recorded for `neighbor`, alive or not.
    pub fn has_neighbor_link(&self, neighbor: Neighbor) -> bool {
        self.neighbors[neighbor.index()].is_some()
    }

    /// Number of live neighbour links.
    pub fn neighbor_count(&self) -> usize {
        Neighbor::ALL
            .iter()
            .filter(|neighbor| self.neighbor(**neighbor).is_some())
            .count()
    }

    pub(crate) fn link_neighbor(&mut self, neighbor: Neighbor, region: WeakMtResource<Region>) {
        self.neighbors[neighbor.index()] = Some(region);
    }

    pub(crate) fn unlink_neighbor(&mut self, neighbor: Neighbor) {
        self.neighbors[neighbor.index()] = None;
    }

    pub(crate) fn unlink_all(&mut self) {
        self.neighbors.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn has_applied(&self, generator: &str) -> bool {
        self.applied_generators.contains(generator)
    }

    pub fn applied_generators(&self) -> impl Iterator<Item = &str> {
        self.applied_generators.iter().map(String::as_str)
    }

    pub(crate) fn mark_applied(&mut self, generator: &str) {
        self.applied_generators.insert(generator.to_owned());
    }

    /// Whether every generator of the pipeline has been applied.
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub(crate) fn set_generated(&mut self) {
        self.generated = true;
    }

    pub fn is_mesh_built(&self) -> bool {
        self.mesh_built
    }

    pub fn is_shape_built(&self) -> bool {
        self.shape_built
    }

    pub(crate) fn set_mesh_built(&mut self, built: bool) {
        self.mesh_built = built;
    }

    pub(crate) fn set_shape_built(&mut self, built: bool) {
        self.shape_built = built;
    }
}
