//! # Morton Index
//!
//! Bit-interleaved (Z-order) keys for signed 3-D coordinates.
//!
//! Each axis owns a 21-bit two's-complement lane inside a single `i64`:
//! `x` occupies bits 0, 3, 6, ..., 60, `y` bits 1, 4, ..., 61 and `z` bits
//! 2, 5, ..., 62. Bit 63 is always clear.
//!
//! ## Lane Arithmetic
//!
//! Addition, subtraction, single-step increments and level shifts all work
//! directly on the interleaved form. The trick for addition is to fill the
//! bits of the other two lanes with ones so that a carry ripples straight
//! through them into the next bit of the same lane, then mask the lane back
//! out. Results wrap modulo 2^21 per axis.
//!
//! Shifting by `n` levels moves every lane by `n` bits, i.e. multiplies or
//! floor-divides each coordinate by `2^n`. A plain arithmetic shift of the
//! combined integer is wrong for negative lanes, so right shifts refill the
//! vacated high bit triplets from the three sign bits.

use std::fmt;
use std::ops::{Add, AddAssign, BitAnd, BitOr, Shl, Shr, Sub, SubAssign};

use crate::error::MortonRangeError;

/// Smallest coordinate representable on any axis.
pub const MIN_COORDINATE: i32 = -(1 << 20);
/// Largest coordinate representable on any axis.
pub const MAX_COORDINATE: i32 = (1 << 20) - 1;
/// Number of bits each axis lane occupies.
pub const BITS_PER_AXIS: u32 = 21;

const X_MASK: i64 = 0x1249_2492_4924_9249;
const Y_MASK: i64 = X_MASK << 1;
const Z_MASK: i64 = X_MASK << 2;
const XY_MASK: i64 = X_MASK | Y_MASK;
const XZ_MASK: i64 = X_MASK | Z_MASK;
const YZ_MASK: i64 = Y_MASK | Z_MASK;
const USED_MASK: i64 = i64::MAX;
/// Flips the three lane sign bits so negative coordinates order first.
const COMPARE_MASK: i64 = 0b111 << 60;

/// A 3-D coordinate packed into a single interleaved key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MortonIndex(i64);

impl MortonIndex {
    /// The key of the origin.
    pub const ZERO: MortonIndex = MortonIndex(0);

    /// Interleaves three coordinates into one key.
    ///
    /// # Errors
    /// Returns [`MortonRangeError`] when any axis lies outside
    /// `[MIN_COORDINATE, MAX_COORDINATE]`.
    pub fn encode(x: i32, y: i32, z: i32) -> Result<Self, MortonRangeError> {
        check_range('x', x)?;
        check_range('y', y)?;
        check_range('z', z)?;
        Ok(Self(split(x) | split(y) << 1 | split(z) << 2))
    }

    /// Recovers the three coordinates.
    pub fn decode(self) -> (i32, i32, i32) {
        (self.x(), self.y(), self.z())
    }

    /// Wraps an already interleaved value. Bit 63 is discarded.
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw & USED_MASK)
    }

    /// The interleaved value.
    pub const fn raw(self) -> i64 {
        self.0
    }

    pub fn x(self) -> i32 {
        compact(self.0)
    }

    pub fn y(self) -> i32 {
        compact(self.0 >> 1)
    }

    pub fn z(self) -> i32 {
        compact(self.0 >> 2)
    }

    /// The low `levels` bit triplets, i.e. the position of this key inside
    /// an aligned cube of `2^levels` cells per axis.
    pub fn low_bits(self, levels: u32) -> i64 {
        if levels >= BITS_PER_AXIS {
            return self.0;
        }
        self.0 & ((1i64 << (levels * 3)) - 1)
    }

    pub fn inc_x(self) -> Self {
        Self((((self.0 | YZ_MASK).wrapping_add(1)) & X_MASK) | (self.0 & YZ_MASK))
    }

    pub fn dec_x(self) -> Self {
        Self((((self.0 & X_MASK).wrapping_sub(1)) & X_MASK) | (self.0 & YZ_MASK))
    }

    pub fn inc_y(self) -> Self {
        Self((((self.0 | XZ_MASK).wrapping_add(2)) & Y_MASK) | (self.0 & XZ_MASK))
    }

    pub fn dec_y(self) -> Self {
        Self((((self.0 & Y_MASK).wrapping_sub(2)) & Y_MASK) | (self.0 & XZ_MASK))
    }

    pub fn inc_z(self) -> Self {
        Self((((self.0 | XY_MASK).wrapping_add(4)) & Z_MASK) | (self.0 & XY_MASK))
    }

    pub fn dec_z(self) -> Self {
        Self((((self.0 & Z_MASK).wrapping_sub(4)) & Z_MASK) | (self.0 & XY_MASK))
    }

    /// Multiplies every axis by `2^levels`. Lanes wrap modulo 2^21.
    pub fn shift_up(self, levels: u32) -> Self {
        if levels >= BITS_PER_AXIS {
            return Self::ZERO;
        }
        Self((self.0 << (levels * 3)) & USED_MASK)
    }

    /// Floor-divides every axis by `2^levels`, sign-extending each lane.
    ///
    /// Shifting by 21 or more levels leaves only the signs: every axis
    /// becomes `0` or `-1`.
    pub fn shift_down(self, levels: u32) -> Self {
        let levels = levels.min(BITS_PER_AXIS);
        if levels == 0 {
            return self;
        }

        let value = self.0 as u64;
        let bits = levels * 3;
        let mut result = value >> bits;
        let mut signs = (value >> 60) << (63 - bits);
        for _ in 0..levels {
            result |= signs;
            signs <<= 3;
        }

        Self(result as i64 & USED_MASK)
    }
}

fn check_range(axis: char, value: i32) -> Result<(), MortonRangeError> {
    if (MIN_COORDINATE..=MAX_COORDINATE).contains(&value) {
        Ok(())
    } else {
        Err(MortonRangeError { axis, value })
    }
}

/// Spreads the low 21 bits of `value` so that two zero bits follow each bit.
fn split(value: i32) -> i64 {
    let mut x = (value as u32 as u64) & 0x1f_ffff;
    x = (x | x << 32) & 0x001f_0000_0000_ffff;
    x = (x | x << 16) & 0x001f_0000_ff00_00ff;
    x = (x | x << 8) & 0x100f_00f0_0f00_f00f;
    x = (x | x << 4) & 0x10c3_0c30_c30c_30c3;
    x = (x | x << 2) & 0x1249_2492_4924_9249;
    x as i64
}

/// Inverse of [`split`], followed by a 21-bit sign extension.
fn compact(value: i64) -> i32 {
    let mut x = (value as u64) & 0x1249_2492_4924_9249;
    x = (x ^ (x >> 2)) & 0x10c3_0c30_c30c_30c3;
    x = (x ^ (x >> 4)) & 0x100f_00f0_0f00_f00f;
    x = (x ^ (x >> 8)) & 0x001f_0000_ff00_00ff;
    x = (x ^ (x >> 16)) & 0x001f_0000_0000_ffff;
    x = (x ^ (x >> 32)) & 0x1f_ffff;
    ((x as i32) << 11) >> 11
}

impl Add for MortonIndex {
    type Output = MortonIndex;

    fn add(self, rhs: Self) -> Self {
        let x = ((self.0 | YZ_MASK).wrapping_add(rhs.0 & X_MASK)) & X_MASK;
        let y = ((self.0 | XZ_MASK).wrapping_add(rhs.0 & Y_MASK)) & Y_MASK;
        let z = ((self.0 | XY_MASK).wrapping_add(rhs.0 & Z_MASK)) & Z_MASK;
        Self(x | y | z)
    }
}

impl Sub for MortonIndex {
    type Output = MortonIndex;

    fn sub(self, rhs: Self) -> Self {
        let x = ((self.0 & X_MASK).wrapping_sub(rhs.0 & X_MASK)) & X_MASK;
        let y = ((self.0 & Y_MASK).wrapping_sub(rhs.0 & Y_MASK)) & Y_MASK;
        let z = ((self.0 & Z_MASK).wrapping_sub(rhs.0 & Z_MASK)) & Z_MASK;
        Self(x | y | z)
    }
}

impl AddAssign for MortonIndex {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for MortonIndex {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Shl<u32> for MortonIndex {
    type Output = MortonIndex;

    fn shl(self, levels: u32) -> Self {
        self.shift_up(levels)
    }
}

impl Shr<u32> for MortonIndex {
    type Output = MortonIndex;

    fn shr(self, levels: u32) -> Self {
        self.shift_down(levels)
    }
}

impl BitOr for MortonIndex {
    type Output = MortonIndex;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for MortonIndex {
    type Output = MortonIndex;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl PartialOrd for MortonIndex {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MortonIndex {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.0 ^ COMPARE_MASK).cmp(&(other.0 ^ COMPARE_MASK))
    }
}

impl fmt::Debug for MortonIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y, z) = self.decode();
        write!(f, "MortonIndex({x}, {y}, {z})")
    }
}

impl fmt::Display for MortonIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y, z) = self.decode();
        write!(f, "({x}, {y}, {z})")
    }
}
