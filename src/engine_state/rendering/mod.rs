//! Rendering seam for the voxel engine.
//!
//! Geometry is built on worker threads from a [`RegionSnapshot`], a frozen
//! copy of a region's blocks plus those of its 26 neighbours, so builders
//! never hold a lock while they run. Builders are pluggable through the
//! [`MeshBuilder`] and [`ShapeBuilder`] traits; the engine hands their output
//! to a sink on the main thread.
//!
//! The crate ships a face-culling mesher and a run-merging box shape builder
//! in [`meshing`]. Uploading the result to a GPU or a physics scene is left
//! to the embedding application.

use crate::core::MtResource;

use super::voxels::block::Block;
use super::voxels::region::{cell_index, BlockStorage, Neighbor, Region, RegionPos, REGION_DIMENSION};

pub mod meshing;

pub use meshing::{BoxShapeBuilder, CollisionBox, CollisionShape, CulledMeshBuilder, FaceInstance, RegionMesh};

/// Immutable copy of a region and the storages of its loaded neighbours.
#[derive(Clone, Debug)]
pub struct RegionSnapshot {
    position: RegionPos,
    center: BlockStorage,
    /// Indexed by [`Neighbor::index`]; the centre slot stays empty.
    neighbors: [Option<BlockStorage>; Neighbor::SLOTS],
}

impl RegionSnapshot {
    /// Wraps an already copied storage. Neighbours start out missing.
    pub fn new(position: RegionPos, center: BlockStorage) -> Self {
        Self {
            position,
            center,
            neighbors: Default::default(),
        }
    }

    /// Adds the storage of one neighbour.
    pub fn with_neighbor(mut self, neighbor: Neighbor, storage: BlockStorage) -> Self {
        if neighbor != Neighbor::CENTER {
            self.neighbors[neighbor.index()] = Some(storage);
        }
        self
    }

    /// Copies `region` and every neighbour it is linked to.
    ///
    /// Each region is locked on its own and only for the duration of the
    /// copy; the centre lock is released before any neighbour is touched.
    pub fn capture(region: &MtResource<Region>) -> Self {
        let (position, center, linked) = {
            let region = region.get();
            let linked: Vec<_> = Neighbor::ALL
                .iter()
                .filter_map(|&neighbor| region.neighbor(neighbor).map(|other| (neighbor, other)))
                .collect();
            (region.position(), region.storage().clone(), linked)
        };

        linked
            .into_iter()
            .fold(Self::new(position, center), |snapshot, (neighbor, other)| {
                let storage = other.get().storage().clone();
                snapshot.with_neighbor(neighbor, storage)
            })
    }

    pub fn position(&self) -> RegionPos {
        self.position
    }

    pub fn center(&self) -> &BlockStorage {
        &self.center
    }

    pub fn neighbor(&self, neighbor: Neighbor) -> Option<&BlockStorage> {
        if neighbor == Neighbor::CENTER {
            return Some(&self.center);
        }
        self.neighbors[neighbor.index()].as_ref()
    }

    /// Reads a block relative to the region's origin.
    ///
    /// Coordinates may reach one region past each face, edge and corner
    /// (`-16..32` per axis). Returns `None` for a neighbour that was not
    /// loaded or a coordinate outside that range.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Option<Block> {
        let neighbor = Neighbor::from_offset(
            x.div_euclid(REGION_DIMENSION),
            y.div_euclid(REGION_DIMENSION),
            z.div_euclid(REGION_DIMENSION),
        )?;
        let storage = self.neighbor(neighbor)?;
        let index = cell_index(
            x.rem_euclid(REGION_DIMENSION) as usize,
            y.rem_euclid(REGION_DIMENSION) as usize,
            z.rem_euclid(REGION_DIMENSION) as usize,
        );
        Some(storage.get(index))
    }
}

/// Builds renderable geometry for one region.
pub trait MeshBuilder: Send + Sync + 'static {
    type Mesh: Send + 'static;

    /// Returns `None` when the region has nothing to draw.
    fn build_mesh(&self, snapshot: &RegionSnapshot) -> Option<Self::Mesh>;
}

/// Builds collision geometry for one region.
pub trait ShapeBuilder: Send + Sync + 'static {
    type Shape: Send + 'static;

    /// Returns `None` when the region has nothing to collide with.
    fn build_shape(&self, snapshot: &RegionSnapshot) -> Option<Self::Shape>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::world::World;

    #[test]
    fn capture_copies_center_and_linked_neighbors() {
        let mut world = World::new();
        let center = world.create(RegionPos::ORIGIN).unwrap();
        let east = world.create(RegionPos::new(1, 0, 0)).unwrap();
        center.get_mut().set_block(3, 4, 5, Block::new(BlockType::DIRT));
        east.get_mut().set_block(0, 4, 5, Block::new(BlockType::STONE));

        let snapshot = RegionSnapshot::capture(&center);
        assert_eq!(snapshot.position(), RegionPos::ORIGIN);
        assert_eq!(snapshot.get_block(3, 4, 5), Some(Block::new(BlockType::DIRT)));
        assert_eq!(snapshot.get_block(16, 4, 5), Some(Block::new(BlockType::STONE)));
        assert_eq!(snapshot.get_block(-1, 4, 5), None);
        assert!(snapshot.neighbor(Neighbor::EAST).is_some());
        assert!(snapshot.neighbor(Neighbor::WEST).is_none());

        // Later edits do not leak into the copy.
        center.get_mut().set_block(3, 4, 5, Block::AIR);
        assert_eq!(snapshot.get_block(3, 4, 5), Some(Block::new(BlockType::DIRT)));
    }

    #[test]
    fn coordinates_beyond_one_region_are_rejected() {
        let snapshot = RegionSnapshot::new(RegionPos::ORIGIN, BlockStorage::new());
        assert_eq!(snapshot.get_block(0, 0, 0), Some(Block::AIR));
        assert_eq!(snapshot.get_block(32, 0, 0), None);
        assert_eq!(snapshot.get_block(0, -17, 0), None);
    }
}
