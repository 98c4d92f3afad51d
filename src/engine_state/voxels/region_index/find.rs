//! # Nearest-First Search
//!
//! Best-first traversal of a [`RegionIndex`].
//!
//! Each starting region seeds the priority queue with the 3x3x3 block of
//! super-region roots around it. Popping an inner node pushes its eight
//! children; popping a leaf yields it. Nodes whose weight is `None` are
//! never queued, so a satisfied subtree is skipped without being visited.
//!
//! With a weight that never exceeds the weight of any descendant (such as
//! the distance to a node's bounding box, see [`distance_weight`]) the
//! leaves come out in non-decreasing weight order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use cgmath::Point3;

use super::{NodeState, RegionIndex};
use crate::core::MortonIndex;
use crate::engine_state::voxels::region::{RegionPos, REGION_DIMENSION};
use crate::error::IndexError;

/// A leaf yielded by [`Find`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FoundRegion<T> {
    pub position: RegionPos,
    pub state: T,
    pub weight: f32,
}

struct QueuedNode<T> {
    weight: f32,
    seq: u64,
    level: u32,
    node: MortonIndex,
    state: T,
}

impl<T> PartialEq for QueuedNode<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for QueuedNode<T> {}

impl<T> PartialOrd for QueuedNode<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for QueuedNode<T> {
    // BinaryHeap is a max-heap: lighter nodes and older entries rank higher.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Lazy nearest-first enumeration over a [`RegionIndex`].
///
/// More starting regions can be added at any point with
/// [`search_from`](Find::search_from).
pub struct Find<'a, T: NodeState, W> {
    index: &'a RegionIndex<T>,
    weight: W,
    queue: BinaryHeap<QueuedNode<T>>,
    checked: HashSet<MortonIndex>,
    next_seq: u64,
}

impl<'a, T, W> Find<'a, T, W>
where
    T: NodeState,
    W: FnMut(u32, MortonIndex, T) -> Option<f32>,
{
    pub(super) fn new(index: &'a RegionIndex<T>, weight: W) -> Self {
        Self {
            index,
            weight,
            queue: BinaryHeap::new(),
            checked: HashSet::new(),
            next_seq: 0,
        }
    }

    /// Queues the super-regions around `pos` that have not been queued yet.
    ///
    /// # Errors
    /// [`IndexError::OutOfRange`] if `pos` cannot be Morton encoded.
    pub fn search_from(&mut self, pos: RegionPos) -> Result<(), IndexError> {
        let depth = self.index.depth();
        let center = pos.to_morton()? >> depth;

        for z in -1..=1 {
            for y in -1..=1 {
                for x in -1..=1 {
                    let root = center + MortonIndex::encode(x, y, z)?;
                    if self.checked.insert(root) {
                        let state = self.index.node(depth, root);
                        self.push(depth, root, state);
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of nodes waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn push(&mut self, level: u32, node: MortonIndex, state: T) {
        if let Some(weight) = (self.weight)(level, node, state) {
            self.queue.push(QueuedNode {
                weight,
                seq: self.next_seq,
                level,
                node,
                state,
            });
            self.next_seq += 1;
        }
    }
}

impl<'a, T, W> Iterator for Find<'a, T, W>
where
    T: NodeState,
    W: FnMut(u32, MortonIndex, T) -> Option<f32>,
{
    type Item = FoundRegion<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(queued) = self.queue.pop() {
            if queued.level == 0 {
                return Some(FoundRegion {
                    position: RegionPos::from_morton(queued.node),
                    state: queued.state,
                    weight: queued.weight,
                });
            }

            let level = queued.level - 1;
            let first_child = queued.node << 1;
            for octant in 0..8 {
                let child = first_child | MortonIndex::from_raw(octant);
                let state = self.index.node(level, child);
                self.push(level, child, state);
            }
        }
        None
    }
}

/// Squared distance from `observer` (in cells) to the bounding box of the
/// level-`level` node at `node`.
pub fn distance_weight(observer: Point3<f32>, level: u32, node: MortonIndex) -> f32 {
    let size = (REGION_DIMENSION << level) as f32;
    let (x, y, z) = node.decode();

    let axis = |coordinate: i32, point: f32| {
        let min = coordinate as f32 * size;
        let max = min + size;
        if point < min {
            min - point
        } else if point > max {
            point - max
        } else {
            0.0
        }
    };

    let dx = axis(x, observer.x);
    let dy = axis(y, observer.y);
    let dz = axis(z, observer.z);
    dx * dx + dy * dy + dz * dz
}
