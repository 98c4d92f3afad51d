//! # Region State
//!
//! Per-node progress flags. Every tracked concern owns two bits: a `SOME`
//! bit (at least one descendant leaf has the condition) and an `ALL` bit
//! (every descendant leaf has it). Leaves always set or clear both bits of
//! a concern together, so the `_ALL` constants below include their `_SOME`
//! bit.

use bitflags::bitflags;

use super::NodeState;

bitflags! {
    /// Aggregated lifecycle state of a region or octree node.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct RegionState: u8 {
        /// Some descendant region is loaded.
        const EXISTS_SOME = 0b0000_0001;
        /// Every descendant region is loaded.
        const EXISTS_ALL = 0b0000_0011;
        const GENERATED_SOME = 0b0000_0100;
        const GENERATED_ALL = 0b0000_1100;
        const MESH_UPDATED_SOME = 0b0001_0000;
        const MESH_UPDATED_ALL = 0b0011_0000;
        const SHAPE_UPDATED_SOME = 0b0100_0000;
        const SHAPE_UPDATED_ALL = 0b1100_0000;
    }
}

impl RegionState {
    /// The `SOME` bit of every concern.
    pub const SOME_BITS: u8 = 0b0101_0101;
    /// The high (`ALL`-only) bit of every concern.
    pub const ALL_BITS: u8 = 0b1010_1010;

    pub const EXISTS: RegionState = RegionState::EXISTS_ALL;
    pub const GENERATED: RegionState = RegionState::GENERATED_ALL;
    pub const MESH_UPDATED: RegionState = RegionState::MESH_UPDATED_ALL;
    pub const SHAPE_UPDATED: RegionState = RegionState::SHAPE_UPDATED_ALL;
}

impl Default for RegionState {
    fn default() -> Self {
        RegionState::empty()
    }
}

impl NodeState for RegionState {
    fn aggregate(children: &[Self]) -> Self {
        let mut all = Self::ALL_BITS;
        let mut some = 0;
        for child in children {
            all &= child.bits();
            some |= child.bits();
        }
        RegionState::from_bits_retain((all & Self::ALL_BITS) | (some & Self::SOME_BITS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_requires_every_child_for_all() {
        let mut children = [RegionState::GENERATED; 8];
        assert_eq!(RegionState::aggregate(&children), RegionState::GENERATED);

        children[3] = RegionState::empty();
        assert_eq!(RegionState::aggregate(&children), RegionState::GENERATED_SOME);
    }

    #[test]
    fn aggregate_tracks_concerns_independently() {
        let mut children = [RegionState::EXISTS | RegionState::GENERATED; 8];
        children[0] |= RegionState::MESH_UPDATED;
        let parent = RegionState::aggregate(&children);
        assert!(parent.contains(RegionState::EXISTS_ALL | RegionState::GENERATED_ALL));
        assert!(parent.contains(RegionState::MESH_UPDATED_SOME));
        assert!(!parent.contains(RegionState::MESH_UPDATED_ALL));
        assert!(!parent.intersects(RegionState::SHAPE_UPDATED_SOME));
    }

    #[test]
    fn empty_children_aggregate_to_default() {
        assert_eq!(RegionState::aggregate(&[RegionState::default(); 8]), RegionState::default());
    }
}
