//! # Region Positions
//!
//! Region coordinates and their conversions to and from world cells and
//! Morton keys.

use std::fmt;

use cgmath::Point3;

use super::neighbors::Neighbor;
use super::REGION_DIMENSION;
use crate::core::MortonIndex;
use crate::error::MortonRangeError;

/// The position of a region on the region grid (not in cells).
///
/// Any `i32` triple is a valid value, but only positions inside the 21-bit
/// Morton range can be loaded or indexed. Arithmetic on positions wraps, so
/// stepping off the `i32` edge yields a position `to_morton` rejects rather
/// than a panic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RegionPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl RegionPos {
    pub const ORIGIN: RegionPos = RegionPos::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The region holding a world cell.
    pub fn containing(cell: Point3<i32>) -> Self {
        Self::new(
            cell.x.div_euclid(REGION_DIMENSION),
            cell.y.div_euclid(REGION_DIMENSION),
            cell.z.div_euclid(REGION_DIMENSION),
        )
    }

    /// The region holding a continuous world position.
    pub fn containing_point(point: Point3<f32>) -> Self {
        Self::containing(Point3::new(
            point.x.floor() as i32,
            point.y.floor() as i32,
            point.z.floor() as i32,
        ))
    }

    /// Local cell coordinates of a world cell inside its region.
    pub fn local_cell(cell: Point3<i32>) -> (usize, usize, usize) {
        (
            cell.x.rem_euclid(REGION_DIMENSION) as usize,
            cell.y.rem_euclid(REGION_DIMENSION) as usize,
            cell.z.rem_euclid(REGION_DIMENSION) as usize,
        )
    }

    /// The world cell at this region's minimum corner.
    pub fn origin(self) -> Point3<i32> {
        Point3::new(
            self.x.wrapping_mul(REGION_DIMENSION),
            self.y.wrapping_mul(REGION_DIMENSION),
            self.z.wrapping_mul(REGION_DIMENSION),
        )
    }

    pub fn offset(self, x: i32, y: i32, z: i32) -> Self {
        Self::new(
            self.x.wrapping_add(x),
            self.y.wrapping_add(y),
            self.z.wrapping_add(z),
        )
    }

    pub fn neighbor(self, neighbor: Neighbor) -> Self {
        let (x, y, z) = neighbor.offset();
        self.offset(x, y, z)
    }

    /// The largest per-axis distance to `other`, in regions.
    pub fn chebyshev_distance(self, other: RegionPos) -> u32 {
        self.x
            .abs_diff(other.x)
            .max(self.y.abs_diff(other.y))
            .max(self.z.abs_diff(other.z))
    }

    pub fn to_morton(self) -> Result<MortonIndex, MortonRangeError> {
        MortonIndex::encode(self.x, self.y, self.z)
    }

    pub fn from_morton(index: MortonIndex) -> Self {
        let (x, y, z) = index.decode();
        Self::new(x, y, z)
    }
}

impl From<Point3<i32>> for RegionPos {
    fn from(point: Point3<i32>) -> Self {
        Self::new(point.x, point.y, point.z)
    }
}

impl fmt::Display for RegionPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
