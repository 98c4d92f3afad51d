//! Collision shapes built from runs of solid blocks.
//!
//! Each row along X is scanned for maximal runs of solid cells; a run becomes
//! one box. Runs with identical extents in consecutive rows along Y are then
//! folded into a single taller box.

use crate::engine_state::voxels::region::{RegionPos, REGION_DIMENSION};

use super::super::{RegionSnapshot, ShapeBuilder};

/// Axis-aligned box in region-local cells, `max` exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CollisionBox {
    pub min: [u8; 3],
    pub max: [u8; 3],
}

impl CollisionBox {
    /// Number of cells covered.
    pub fn volume(&self) -> usize {
        (0..3)
            .map(|axis| (self.max[axis] - self.min[axis]) as usize)
            .product()
    }
}

/// Compound collision shape for one region.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionShape {
    pub position: RegionPos,
    pub boxes: Vec<CollisionBox>,
}

impl CollisionShape {
    pub fn solid_cells(&self) -> usize {
        self.boxes.iter().map(CollisionBox::volume).sum()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BoxShapeBuilder;

impl BoxShapeBuilder {
    fn row_runs(snapshot: &RegionSnapshot, y: i32, z: i32) -> Vec<(u8, u8)> {
        let mut runs = Vec::new();
        let mut start = None;
        for x in 0..=REGION_DIMENSION {
            let solid = x < REGION_DIMENSION
                && snapshot
                    .get_block(x, y, z)
                    .is_some_and(|block| block.is_solid());
            match (solid, start) {
                (true, None) => start = Some(x),
                (false, Some(begin)) => {
                    runs.push((begin as u8, x as u8));
                    start = None;
                }
                _ => {}
            }
        }
        runs
    }
}

impl ShapeBuilder for BoxShapeBuilder {
    type Shape = CollisionShape;

    fn build_shape(&self, snapshot: &RegionSnapshot) -> Option<CollisionShape> {
        if snapshot.center().is_uniform_default() {
            return None;
        }

        let mut boxes = Vec::new();
        for z in 0..REGION_DIMENSION {
            // Boxes still open in the previous row, extended while a run repeats.
            let mut open: Vec<CollisionBox> = Vec::new();
            for y in 0..REGION_DIMENSION {
                let runs = Self::row_runs(snapshot, y, z);
                let mut next = Vec::with_capacity(runs.len());
                for (begin, end) in runs {
                    match open.iter().position(|b| b.min[0] == begin && b.max[0] == end) {
                        Some(found) => {
                            let mut grown = open.swap_remove(found);
                            grown.max[1] = y as u8 + 1;
                            next.push(grown);
                        }
                        None => next.push(CollisionBox {
                            min: [begin, y as u8, z as u8],
                            max: [end, y as u8 + 1, z as u8 + 1],
                        }),
                    }
                }
                boxes.append(&mut open);
                open = next;
            }
            boxes.append(&mut open);
        }

        (!boxes.is_empty()).then(|| CollisionShape {
            position: snapshot.position(),
            boxes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::block::Block;
    use crate::engine_state::voxels::region::{cell_index, BlockStorage};

    fn snapshot_with(cells: impl IntoIterator<Item = (usize, usize, usize)>) -> RegionSnapshot {
        let mut storage = BlockStorage::new();
        for (x, y, z) in cells {
            storage.set(cell_index(x, y, z), Block::new(BlockType::STONE));
        }
        RegionSnapshot::new(RegionPos::ORIGIN, storage)
    }

    #[test]
    fn empty_region_has_no_shape() {
        assert!(BoxShapeBuilder.build_shape(&snapshot_with([])).is_none());
    }

    #[test]
    fn row_becomes_one_box() {
        let shape = BoxShapeBuilder
            .build_shape(&snapshot_with((2..7).map(|x| (x, 3, 4))))
            .unwrap();
        assert_eq!(
            shape.boxes,
            vec![CollisionBox {
                min: [2, 3, 4],
                max: [7, 4, 5]
            }]
        );
    }

    #[test]
    fn matching_rows_stack_vertically() {
        let cells = (0..4).flat_map(|y| (0..16).map(move |x| (x, y, 0)));
        let shape = BoxShapeBuilder.build_shape(&snapshot_with(cells)).unwrap();
        assert_eq!(shape.boxes.len(), 1);
        assert_eq!(shape.boxes[0].max, [16, 4, 1]);
        assert_eq!(shape.solid_cells(), 64);
    }

    #[test]
    fn gaps_split_runs() {
        let shape = BoxShapeBuilder
            .build_shape(&snapshot_with([(0, 0, 0), (1, 0, 0), (3, 0, 0), (0, 1, 0)]))
            .unwrap();
        assert_eq!(shape.solid_cells(), 4);
        assert_eq!(shape.boxes.len(), 3);
    }
}
