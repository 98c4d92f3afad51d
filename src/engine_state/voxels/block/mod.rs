//! # Block Module
//!
//! This module provides the cell content stored in every region: block type
//! definitions, block face handling and the compact block value itself.

use block_side::BlockSide;
use block_type::BlockType;

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block types in memory.
pub type BlockTypeSize = u8;

/// Maps each block type to its texture index for each face.
///
/// The outer array is indexed by `BlockType` as a `usize`.
/// The inner array follows the `BlockSide` order:
/// [Front, Back, Bottom, Top, Left, Right]
pub static BLOCK_TYPE_TO_TEXTURE_INDICES: [[usize; 6]; 6] = [
    [0, 0, 0, 0, 0, 0], // AIR (never meshed)
    [1, 1, 1, 1, 1, 1], // DIRT
    [2, 2, 1, 3, 2, 2], // GRASS (top: 3, bottom: dirt, sides: 2)
    [0, 0, 0, 0, 0, 0], // WOOD
    [4, 4, 4, 4, 4, 4], // WHITE
    [5, 5, 5, 5, 5, 5], // STONE
];

/// Represents a single voxel block in the world.
///
/// This is a lightweight structure that stores only the essential block data.
/// The actual block properties are looked up from the block type.
///
/// # Memory Layout
/// The `#[repr(C)]` attribute keeps a byte-sized, plain-old-data layout so
/// storages and snapshots can be copied around cheaply. The all-zero value
/// is air, which is also the default.
#[repr(C)]
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct Block {
    /// The type of this block, encoded as a `BlockTypeSize` for compact storage.
    pub block_type: BlockTypeSize,
}

impl Block {
    /// The empty block.
    pub const AIR: Block = Block { block_type: BlockType::AIR as BlockTypeSize };

    /// Creates a new block of the specified type.
    pub fn new(block_type: BlockType) -> Self {
        Block {
            block_type: block_type as BlockTypeSize,
        }
    }

    /// The decoded type. Unknown encodings read as air.
    pub fn block_type(&self) -> BlockType {
        BlockType::from_int(self.block_type).unwrap_or(BlockType::AIR)
    }

    /// Whether faces behind this block are visible, i.e. the block is air-like.
    pub fn is_transparent(&self) -> bool {
        self.block_type().is_transparent()
    }

    /// Whether this block takes part in meshing and collision.
    pub fn is_solid(&self) -> bool {
        !self.is_transparent()
    }

    /// Gets the texture indices for all faces of this block.
    pub fn texture_indices(&self) -> [usize; 6] {
        BLOCK_TYPE_TO_TEXTURE_INDICES[self.block_type() as usize]
    }

    /// Gets the texture index of a single face.
    pub fn texture_index(&self, side: BlockSide) -> usize {
        self.texture_indices()[side as usize]
    }
}

impl From<BlockType> for Block {
    fn from(block_type: BlockType) -> Self {
        Block::new(block_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_block_is_air() {
        assert_eq!(Block::default(), Block::AIR);
        assert!(Block::default().is_transparent());
    }

    #[test]
    fn grass_uses_distinct_top_texture() {
        let grass = Block::new(BlockType::GRASS);
        assert!(grass.is_solid());
        assert_eq!(grass.texture_index(BlockSide::TOP), 3);
        assert_eq!(grass.texture_index(BlockSide::BOTTOM), 1);
    }

    #[test]
    fn unknown_encoding_reads_as_air() {
        let block = Block { block_type: 200 };
        assert_eq!(block.block_type(), BlockType::AIR);
    }
}
