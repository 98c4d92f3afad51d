//! Face-culling mesher.
//!
//! A face is emitted for every solid block side whose neighbouring cell is
//! transparent. Cells across the region boundary are read from the
//! snapshot's neighbours; a neighbour that was not loaded counts as air so
//! the region stays closed.

use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::region::{RegionPos, REGION_DIMENSION};

use super::super::{MeshBuilder, RegionSnapshot};

/// One visible block face, laid out for direct upload as instance data.
///
/// # Memory Layout
/// - Position: 3x u8, region-local cell (3 bytes)
/// - Side: u8, index into [`BlockSide::all`] (1 byte)
/// - Texture Index: u32 (4 bytes)
///
/// Total size: 8 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FaceInstance {
    pub x: u8,
    pub y: u8,
    pub z: u8,
    pub side: u8,
    pub texture_index: u32,
}

/// All faces of a mesh pointing in one direction.
#[derive(Clone, Debug)]
pub struct MeshSide {
    pub side: BlockSide,
    pub faces: Vec<FaceInstance>,
}

impl MeshSide {
    pub fn new(side: BlockSide) -> Self {
        MeshSide {
            side,
            faces: Vec::new(),
        }
    }

    /// The raw instance buffer for this side.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.faces)
    }
}

/// Renderable geometry for one region, split by face direction so a
/// renderer can skip sides facing away from the camera.
#[derive(Clone, Debug)]
pub struct RegionMesh {
    pub position: RegionPos,
    /// In [`BlockSide::all`] order.
    pub sides: [MeshSide; 6],
}

impl RegionMesh {
    pub fn new(position: RegionPos) -> Self {
        RegionMesh {
            position,
            sides: BlockSide::all().map(MeshSide::new),
        }
    }

    pub fn side(&self, side: BlockSide) -> &MeshSide {
        &self.sides[side as usize]
    }

    pub fn face_count(&self) -> usize {
        self.sides.iter().map(|side| side.faces.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.face_count() == 0
    }
}

/// Emits one [`FaceInstance`] per exposed block face.
#[derive(Clone, Copy, Debug, Default)]
pub struct CulledMeshBuilder;

impl MeshBuilder for CulledMeshBuilder {
    type Mesh = RegionMesh;

    fn build_mesh(&self, snapshot: &RegionSnapshot) -> Option<RegionMesh> {
        if snapshot.center().is_uniform_default() {
            return None;
        }

        let mut mesh = RegionMesh::new(snapshot.position());
        for z in 0..REGION_DIMENSION {
            for y in 0..REGION_DIMENSION {
                for x in 0..REGION_DIMENSION {
                    let Some(block) = snapshot.get_block(x, y, z) else {
                        continue;
                    };
                    if !block.is_solid() {
                        continue;
                    }

                    for side in BlockSide::all() {
                        let normal = side.normal();
                        let exposed = snapshot
                            .get_block(x + normal.x, y + normal.y, z + normal.z)
                            .map_or(true, |other| other.is_transparent());
                        if exposed {
                            mesh.sides[side as usize].faces.push(FaceInstance {
                                x: x as u8,
                                y: y as u8,
                                z: z as u8,
                                side: side as u8,
                                texture_index: block.texture_index(side) as u32,
                            });
                        }
                    }
                }
            }
        }

        (!mesh.is_empty()).then_some(mesh)
    }
}
