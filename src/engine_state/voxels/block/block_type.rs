//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world.
//! It provides conversion from the compact stored form and the per-type
//! properties the mesh and shape builders rely on.

use num_derive::FromPrimitive;

use super::BlockTypeSize;

/// Enumerates all possible block types in the voxel world.
///
/// The `FromPrimitive` derive allows conversion from the compact integer
/// stored in a [`Block`](super::Block).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// An air block, which is non-solid and transparent.
    AIR = 0,

    /// A basic dirt block, the bulk of generated terrain.
    DIRT = 1,

    /// A grass block with different textures on top and sides.
    /// The top is green, sides have grass on dirt, and bottom is plain dirt.
    GRASS = 2,

    /// A wooden block with a bark texture on all sides.
    WOOD = 3,

    /// A plain white block, often used for testing.
    WHITE = 4,

    /// Deep terrain rock.
    STONE = 5,
}

impl BlockType {
    /// Converts a `BlockTypeSize` to a `BlockType`.
    ///
    /// # Returns
    /// `None` if the value doesn't correspond to a known `BlockType`.
    pub fn from_int(btype: BlockTypeSize) -> Option<Self> {
        num::FromPrimitive::from_u8(btype)
    }

    /// Whether the block lets neighboring faces show through.
    pub fn is_transparent(self) -> bool {
        matches!(self, BlockType::AIR)
    }
}
