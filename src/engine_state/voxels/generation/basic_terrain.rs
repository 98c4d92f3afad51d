//! # Basic Terrain
//!
//! Fills regions with stone using 3-D fractal Perlin noise. A height bias
//! makes solid cells rarer the higher they are, producing ground with caves
//! and overhangs below and open air above.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use super::{GenerationContext, Generator};
use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::block::Block;
use crate::engine_state::voxels::region::REGION_DIMENSION;

/// Scaling factor applied to world coordinates when sampling Perlin noise.
pub const PERLIN_SCALE_FACTOR: f64 = 0.02;
/// World height, in cells, over which the bias rises by one.
const BIAS_HEIGHT: f64 = 64.0;

/// Stone-and-air terrain from seeded noise.
pub struct BasicTerrainGenerator {
    noise: Fbm<Perlin>,
}

impl BasicTerrainGenerator {
    pub const IDENTIFIER: &'static str = "basic_terrain";

    pub fn new(seed: u32) -> Self {
        Self {
            noise: Fbm::<Perlin>::new(seed)
                .set_octaves(4)
                .set_persistence(0.6),
        }
    }

    /// Whether the cell at world coordinates is solid.
    pub fn is_solid_at(&self, x: i32, y: i32, z: i32) -> bool {
        let bias = (y as f64 / BIAS_HEIGHT - 0.5).clamp(-0.25, 1.0);
        let sample = self.noise.get([
            x as f64 * PERLIN_SCALE_FACTOR,
            y as f64 * PERLIN_SCALE_FACTOR,
            z as f64 * PERLIN_SCALE_FACTOR,
        ]);
        sample > bias
    }
}

impl Generator for BasicTerrainGenerator {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn populate(&self, context: &mut GenerationContext<'_>) {
        let origin = context.position().origin();
        let stone = Block::new(BlockType::STONE);

        for z in 0..REGION_DIMENSION {
            for y in 0..REGION_DIMENSION {
                for x in 0..REGION_DIMENSION {
                    if self.is_solid_at(origin.x + x, origin.y + y, origin.z + z) {
                        context.set_block(x as usize, y as usize, z as usize, stone);
                    }
                }
            }
        }
    }
}
