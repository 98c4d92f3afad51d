//! # Region Index
//!
//! A chunked octree holding one aggregated state value per octree node.
//!
//! ## Architecture
//!
//! The region grid is split into aligned "super-regions" of
//! `2^depth` regions per axis. Each touched super-region owns a flat array
//! with every node of its octree, root first:
//!
//! ```text
//! level depth     (root)   : [0]
//! level depth - 1          : [1 .. 9)
//! ...
//! level 0         (leaves) : [LEVEL_START[depth] .. LEVEL_START[depth + 1])
//! ```
//!
//! Within a level, nodes are ordered by the Morton key of their position
//! relative to the super-region, so the eight children of a node are
//! contiguous and a parent index is the child index shifted right by three.
//!
//! ## Updates
//!
//! A leaf write re-derives each ancestor from its eight immediate children,
//! stopping at the first level whose value does not change.
//!
//! ## Search
//!
//! [`RegionIndex::find`] walks the tree best-first, see [`Find`].

use std::collections::HashMap;

use crate::core::MortonIndex;
use crate::error::IndexError;

use super::region::RegionPos;

pub mod find;
pub mod state;


pub use find::{distance_weight, Find, FoundRegion};
pub use state::RegionState;

/// Maximum supported octree depth.
pub const MAX_DEPTH: u32 = 10;

/// Index of the first node of each level, counted from the root:
/// `LEVEL_START[n] = (8^n - 1) / 7`.
pub const LEVEL_START: [usize; 12] = [
    0,
    1,
    9,
    73,
    585,
    4681,
    37449,
    299593,
    2396745,
    19173961,
    153391689,
    1227133513,
];

/// A value stored at every octree node.
///
/// `aggregate` derives a parent from exactly eight children. The aggregate of
/// eight default values must be the default value.
pub trait NodeState: Copy + Default + PartialEq + Send + Sync + 'static {
    fn aggregate(children: &[Self]) -> Self;
}

impl NodeState for bool {
    fn aggregate(children: &[Self]) -> Self {
        children.iter().any(|child| *child)
    }
}

/// Sparse octree of node states keyed by super-region.
#[derive(Clone, Debug)]
pub struct RegionIndex<T: NodeState = RegionState> {
    depth: u32,
    super_regions: HashMap<MortonIndex, Box<[T]>>,
}

impl<T: NodeState> RegionIndex<T> {
    /// Creates an empty index whose super-regions span `2^depth` regions per axis.
    ///
    /// # Errors
    /// [`IndexError::InvalidDepth`] unless `1 <= depth <= MAX_DEPTH`.
    pub fn new(depth: u32) -> Result<Self, IndexError> {
        if !(1..=MAX_DEPTH).contains(&depth) {
            return Err(IndexError::InvalidDepth(depth));
        }
        Ok(Self {
            depth,
            super_regions: HashMap::new(),
        })
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of super-regions with allocated storage.
    pub fn super_region_count(&self) -> usize {
        self.super_regions.len()
    }

    /// The state of the node at `level` whose position (in level-`level`
    /// node units) is `node`.
    ///
    /// Untouched super-regions report the default state.
    ///
    /// # Errors
    /// [`IndexError::InvalidLevel`] if `level` exceeds the depth.
    pub fn get(&self, level: u32, node: MortonIndex) -> Result<T, IndexError> {
        if level > self.depth {
            return Err(IndexError::InvalidLevel {
                level,
                depth: self.depth,
            });
        }
        Ok(self.node(level, node))
    }

    /// The state of the level-`level` node containing region `pos`.
    pub fn get_containing(&self, level: u32, pos: RegionPos) -> Result<T, IndexError> {
        let key = pos.to_morton()?;
        self.get(level, key >> level)
    }

    /// The leaf state of region `pos`.
    pub fn leaf(&self, pos: RegionPos) -> Result<T, IndexError> {
        self.get_containing(0, pos)
    }

    pub(crate) fn node(&self, level: u32, node: MortonIndex) -> T {
        let levels_below_root = self.depth - level;
        let super_region = node >> levels_below_root;
        let local = node.low_bits(levels_below_root) as usize;
        self.super_regions
            .get(&super_region)
            .map_or_else(T::default, |nodes| nodes[LEVEL_START[levels_below_root as usize] + local])
    }

    /// Applies `mutate` to the leaf of `pos` and bubbles the change upward.
    ///
    /// # Returns
    /// The new leaf state.
    ///
    /// # Errors
    /// [`IndexError::OutOfRange`] if `pos` cannot be Morton encoded.
    pub fn update<F>(&mut self, pos: RegionPos, mutate: F) -> Result<T, IndexError>
    where
        F: FnOnce(&mut T),
    {
        let depth = self.depth as usize;
        let key = pos.to_morton()?;
        let super_region = key >> self.depth;
        let mut local = key.low_bits(self.depth) as usize;

        let nodes = self
            .super_regions
            .entry(super_region)
            .or_insert_with(|| vec![T::default(); LEVEL_START[depth + 1]].into_boxed_slice());

        let leaf = LEVEL_START[depth] + local;
        mutate(&mut nodes[leaf]);
        let updated = nodes[leaf];

        for level in 1..=depth {
            let children = LEVEL_START[depth - (level - 1)] + (local & !7);
            local >>= 3;
            let parent = LEVEL_START[depth - level] + local;

            let derived = T::aggregate(&nodes[children..children + 8]);
            if nodes[parent] == derived {
                break;
            }
            nodes[parent] = derived;
        }

        Ok(updated)
    }

    /// Drops super-regions in which every node holds the default state.
    pub fn prune_empty(&mut self) -> usize {
        let before = self.super_regions.len();
        self.super_regions
            .retain(|_, nodes| nodes.iter().any(|state| *state != T::default()));
        before - self.super_regions.len()
    }

    /// Starts a best-first search from the given regions.
    ///
    /// `weight(level, node, state)` scores a node; `None` prunes the node
    /// and its whole subtree. Leaves are yielded in non-decreasing weight
    /// order, ties in insertion order.
    ///
    /// # Errors
    /// [`IndexError::OutOfRange`] if a starting position cannot be encoded.
    pub fn find<W, I>(&self, weight: W, from: I) -> Result<Find<'_, T, W>, IndexError>
    where
        W: FnMut(u32, MortonIndex, T) -> Option<f32>,
        I: IntoIterator<Item = RegionPos>,
    {
        let mut search = Find::new(self, weight);
        for pos in from {
            search.search_from(pos)?;
        }
        Ok(search)
    }
}
