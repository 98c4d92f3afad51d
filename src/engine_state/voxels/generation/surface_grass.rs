//! # Surface Grass
//!
//! Turns the exposed top of the terrain into a grass layer with a few cells
//! of dirt beneath. A cell counts as exposed when enough air sits directly
//! above it, which near a region's top edge means looking into the region
//! above; that region must have run basic terrain first.

use super::basic_terrain::BasicTerrainGenerator;
use super::{GenerationContext, Generator};
use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::block::Block;
use crate::engine_state::voxels::region::{cell_index, Neighbor};

/// Consecutive air cells required above a surface cell.
pub const AIR_BLOCKS_NEEDED: usize = 12;
/// Dirt cells placed under each grass cell.
pub const DIRT_BLOCKS_BENEATH: usize = 3;

const DIMENSION: usize = 16;

/// Grass and dirt on top of basic terrain.
pub struct SurfaceGrassGenerator;

impl SurfaceGrassGenerator {
    pub const IDENTIFIER: &'static str = "surface_grass";
}

impl Generator for SurfaceGrassGenerator {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn dependencies(&self) -> &[&'static str] {
        &[BasicTerrainGenerator::IDENTIFIER]
    }

    fn neighbor_dependencies(&self) -> &[(Neighbor, &'static str)] {
        &[(Neighbor::UP, BasicTerrainGenerator::IDENTIFIER)]
    }

    fn populate(&self, context: &mut GenerationContext<'_>) {
        let Some(above) = context.neighbor(Neighbor::UP).cloned() else {
            log::warn!("surface grass ran without the region above {}", context.position());
            return;
        };
        let grass = Block::new(BlockType::GRASS);
        let dirt = Block::new(BlockType::DIRT);

        for z in 0..DIMENSION {
            for x in 0..DIMENSION {
                let mut air_run = 0;
                // Depth below the current surface; 0 while not under one.
                let mut depth = 0;

                for y in (0..DIMENSION + AIR_BLOCKS_NEEDED).rev() {
                    let block = if y >= DIMENSION {
                        above.get(cell_index(x, y - DIMENSION, z))
                    } else {
                        context.get_block(x, y, z)
                    };

                    if block.is_transparent() {
                        air_run += 1;
                        depth = 0;
                        continue;
                    }

                    if air_run >= AIR_BLOCKS_NEEDED || depth > 0 {
                        if y < DIMENSION {
                            if depth == 0 {
                                context.set_block(x, y, z, grass);
                            } else if depth <= DIRT_BLOCKS_BENEATH {
                                context.set_block(x, y, z, dirt);
                            }
                        }
                        depth += 1;
                    }
                    air_run = 0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::generation::{BlockedOn, GenerationStep, GeneratorPipeline};
    use crate::engine_state::voxels::region::RegionPos;
    use crate::engine_state::voxels::world::World;
    use std::sync::Arc;

    /// Solid below y = 8 (in region 0), air everywhere else.
    struct FlatGround;

    impl Generator for FlatGround {
        fn identifier(&self) -> &'static str {
            BasicTerrainGenerator::IDENTIFIER
        }

        fn populate(&self, context: &mut GenerationContext<'_>) {
            if context.position().y != 0 {
                return;
            }
            for z in 0..DIMENSION {
                for y in 0..8 {
                    for x in 0..DIMENSION {
                        context.set_block(x, y, z, Block::new(BlockType::STONE));
                    }
                }
            }
        }
    }

    fn pipeline() -> GeneratorPipeline {
        let ground: Arc<dyn Generator> = Arc::new(FlatGround);
        let grass: Arc<dyn Generator> = Arc::new(SurfaceGrassGenerator);
        GeneratorPipeline::new(vec![ground, grass]).unwrap()
    }

    #[test]
    fn waits_for_the_region_above() {
        let pipeline = pipeline();
        let mut world = World::new();
        let below = RegionPos::ORIGIN;

        assert!(matches!(
            world.advance_generation(&pipeline, below),
            Ok(GenerationStep::Applied(_))
        ));
        assert_eq!(
            world.advance_generation(&pipeline, below),
            Ok(GenerationStep::Blocked(BlockedOn::MissingNeighbor {
                generator: SurfaceGrassGenerator::IDENTIFIER,
                neighbor: Neighbor::UP
            }))
        );

        world.get_or_create(below.neighbor(Neighbor::UP)).unwrap();
        assert_eq!(
            world.advance_generation(&pipeline, below),
            Ok(GenerationStep::Blocked(BlockedOn::NeighborPending {
                generator: SurfaceGrassGenerator::IDENTIFIER,
                neighbor: Neighbor::UP,
                dependency: BasicTerrainGenerator::IDENTIFIER
            }))
        );
    }

    #[test]
    fn grass_tops_dirt_over_stone() {
        let pipeline = pipeline();
        let mut world = World::new();
        let below = RegionPos::ORIGIN;
        let above = below.neighbor(Neighbor::UP);

        world.advance_generation(&pipeline, above).unwrap();
        world.advance_generation(&pipeline, below).unwrap();
        assert_eq!(
            world.advance_generation(&pipeline, below),
            Ok(GenerationStep::Applied(SurfaceGrassGenerator::IDENTIFIER))
        );

        let region = world.get(below).unwrap();
        let region = region.get();
        for (x, z) in [(0, 0), (7, 3), (15, 15)] {
            assert_eq!(region.get_block(x, 7, z).block_type(), BlockType::GRASS);
            for y in 4..7 {
                assert_eq!(region.get_block(x, y, z).block_type(), BlockType::DIRT);
            }
            assert_eq!(region.get_block(x, 3, z).block_type(), BlockType::STONE);
            assert_eq!(region.get_block(x, 8, z), Block::AIR);
        }
    }
}
