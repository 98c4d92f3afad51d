//! # World Module
//!
//! This module provides the `World` struct, which owns every loaded region and
//! maintains the neighbour graph between them.
//!
//! ## Architecture
//!
//! The world uses a sparse storage approach: regions are created the first
//! time something asks for them and dropped again once they fall outside the
//! keep distance. This allows for effectively unbounded worlds while keeping
//! memory proportional to the area around the observer.
//!
//! ## Neighbour Links
//!
//! Every region holds weak links to its up to 26 loaded neighbours. Creating
//! a region links it to each existing neighbour in both directions; removing
//! it clears its own links and every back-reference pointing at it. Nothing
//! else in the crate edits these links.
//!
//! ## Performance Considerations
//!
//! - Regions are stored in thread-safe containers to enable concurrent access
//! - Region lookup is O(1) using a hash map
//! - Linking and unlinking touch at most 26 neighbours, one lock at a time

use std::collections::HashMap;

use cgmath::Point3;

use super::block::Block;
use super::generation::{GenerationStep, GeneratorPipeline};
use super::region::{Neighbor, Region, RegionPos};
use crate::core::MtResource;
use crate::error::WorldError;

/// Represents a voxel world composed of multiple regions.
///
/// # Examples
///
/// ```
/// use voxel_world::engine_state::voxels::region::RegionPos;
/// use voxel_world::engine_state::voxels::world::World;
///
/// let mut world = World::new();
/// world.get_or_create(RegionPos::new(0, 0, 0)).unwrap();
/// world.get_or_create(RegionPos::new(1, 0, 0)).unwrap();
///
/// let origin = world.get(RegionPos::new(0, 0, 0)).unwrap();
/// assert_eq!(origin.get().neighbor_count(), 1);
/// ```
#[derive(Default)]
pub struct World {
    /// A mapping from region coordinates to region data.
    regions: HashMap<RegionPos, MtResource<Region>>,
}

impl World {
    /// Creates a new, empty world.
    pub fn new() -> Self {
        World {
            regions: HashMap::new(),
        }
    }

    /// Number of loaded regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn contains(&self, pos: RegionPos) -> bool {
        self.regions.contains_key(&pos)
    }

    /// Retrieves the region at the specified coordinates.
    ///
    /// # Returns
    /// A clone of the `MtResource<Region>` if the region is loaded, or `None` if not.
    pub fn get(&self, pos: RegionPos) -> Option<MtResource<Region>> {
        self.regions.get(&pos).cloned()
    }

    /// Positions of all loaded regions, in no particular order.
    pub fn positions(&self) -> impl Iterator<Item = RegionPos> + '_ {
        self.regions.keys().copied()
    }

    /// Creates an empty region and links it to its loaded neighbours.
    ///
    /// # Errors
    /// - [`WorldError::RegionAlreadyExists`] if the position is occupied
    /// - [`WorldError::OutOfRange`] if the position cannot be indexed
    pub fn create(&mut self, pos: RegionPos) -> Result<MtResource<Region>, WorldError> {
        if self.regions.contains_key(&pos) {
            return Err(WorldError::RegionAlreadyExists(pos));
        }
        pos.to_morton()?;

        let region = MtResource::new(Region::new(pos));
        for neighbor in Neighbor::ALL {
            if let Some(other) = self.regions.get(&pos.neighbor(neighbor)) {
                region.get_mut().link_neighbor(neighbor, other.downgrade());
                other
                    .get_mut()
                    .link_neighbor(neighbor.opposite(), region.downgrade());
            }
        }

        self.regions.insert(pos, region.clone());
        log::debug!("created region {pos}");
        Ok(region)
    }

    /// Returns the region at `pos`, creating it first if necessary.
    ///
    /// # Errors
    /// [`WorldError::OutOfRange`] if the position cannot be indexed.
    pub fn get_or_create(&mut self, pos: RegionPos) -> Result<MtResource<Region>, WorldError> {
        match self.get(pos) {
            Some(region) => Ok(region),
            None => self.create(pos),
        }
    }

    /// Removes a region after unlinking it from all of its neighbours.
    ///
    /// # Errors
    /// [`WorldError::RegionNotFound`] if no region is loaded at `pos`.
    pub fn remove(&mut self, pos: RegionPos) -> Result<MtResource<Region>, WorldError> {
        let region = self
            .regions
            .remove(&pos)
            .ok_or(WorldError::RegionNotFound(pos))?;

        for neighbor in Neighbor::ALL {
            if let Some(other) = self.regions.get(&pos.neighbor(neighbor)) {
                other.get_mut().unlink_neighbor(neighbor.opposite());
            }
        }
        region.get_mut().unlink_all();

        log::debug!("removed region {pos}");
        Ok(region)
    }

    /// Like [`remove`](Self::remove), but a missing region is not an error.
    pub fn try_remove(&mut self, pos: RegionPos) -> Option<MtResource<Region>> {
        self.remove(pos).ok()
    }

    /// Loaded regions farther than `keep_distance` regions from `center`
    /// along any axis.
    pub fn regions_beyond(&self, center: RegionPos, keep_distance: u32) -> Vec<RegionPos> {
        self.regions
            .keys()
            .copied()
            .filter(|pos| pos.chebyshev_distance(center) > keep_distance)
            .collect()
    }

    /// Reads a block by world cell coordinates, `None` if its region is not loaded.
    pub fn get_block(&self, cell: Point3<i32>) -> Option<Block> {
        let region = self.regions.get(&RegionPos::containing(cell))?;
        let (x, y, z) = RegionPos::local_cell(cell);
        let block = region.get().get_block(x, y, z);
        Some(block)
    }

    /// Writes a block by world cell coordinates.
    ///
    /// # Returns
    /// The loaded regions whose meshes can see the edited cell: its own
    /// region plus every neighbour across a region boundary it touches.
    ///
    /// # Errors
    /// [`WorldError::RegionNotFound`] if the cell's region is not loaded.
    pub fn set_block(&mut self, cell: Point3<i32>, block: Block) -> Result<Vec<RegionPos>, WorldError> {
        let pos = RegionPos::containing(cell);
        let region = self.regions.get(&pos).ok_or(WorldError::RegionNotFound(pos))?;
        let (x, y, z) = RegionPos::local_cell(cell);
        region.get_mut().set_block(x, y, z, block);

        let edge = |local: usize| -> &'static [i32] {
            match local {
                0 => &[0, -1],
                15 => &[0, 1],
                _ => &[0],
            }
        };

        let mut affected = Vec::new();
        for &dz in edge(z) {
            for &dy in edge(y) {
                for &dx in edge(x) {
                    let other = pos.offset(dx, dy, dz);
                    if self.regions.contains_key(&other) {
                        affected.push(other);
                    }
                }
            }
        }
        Ok(affected)
    }

    /// Creates the region if needed and runs one generation step on it.
    ///
    /// Convenience for single-threaded drivers; workers call
    /// [`GeneratorPipeline::advance`] directly so they never hold the world
    /// while generating.
    pub fn advance_generation(
        &mut self,
        pipeline: &GeneratorPipeline,
        pos: RegionPos,
    ) -> Result<GenerationStep, WorldError> {
        let region = self.get_or_create(pos)?;
        Ok(pipeline.advance(&region))
    }
}
