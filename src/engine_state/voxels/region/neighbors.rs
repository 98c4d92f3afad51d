//! # Region Neighbors
//!
//! The 26 regions around a region, plus the region itself, are addressed by
//! a slot index `(x + 1) + (y + 1) * 3 + (z + 1) * 9` over offsets in
//! `-1..=1`. The centre slot is 13 and the opposite of slot `i` is `26 - i`.

use std::fmt;

/// One of the 27 slots of a 3x3x3 neighbourhood.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Neighbor(u8);

impl Neighbor {
    /// Number of slots including the centre.
    pub const SLOTS: usize = 27;

    pub const CENTER: Neighbor = Neighbor(13);
    /// +Y
    pub const UP: Neighbor = Neighbor(16);
    /// -Y
    pub const DOWN: Neighbor = Neighbor(10);
    /// +X
    pub const EAST: Neighbor = Neighbor(14);
    /// -X
    pub const WEST: Neighbor = Neighbor(12);
    /// +Z
    pub const NORTH: Neighbor = Neighbor(22);
    /// -Z
    pub const SOUTH: Neighbor = Neighbor(4);

    /// The six face-sharing neighbours.
    pub const FACES: [Neighbor; 6] = [
        Neighbor::EAST,
        Neighbor::WEST,
        Neighbor::UP,
        Neighbor::DOWN,
        Neighbor::NORTH,
        Neighbor::SOUTH,
    ];

    /// Every neighbour, excluding the centre, in slot order.
    pub const ALL: [Neighbor; 26] = {
        let mut all = [Neighbor(0); 26];
        let mut slot = 0;
        let mut next = 0;
        while slot < Self::SLOTS {
            if slot != Self::CENTER.0 as usize {
                all[next] = Neighbor(slot as u8);
                next += 1;
            }
            slot += 1;
        }
        all
    };

    /// The slot for an offset, or `None` if any component is outside `-1..=1`.
    pub fn from_offset(x: i32, y: i32, z: i32) -> Option<Neighbor> {
        let range = -1..=1;
        if range.contains(&x) && range.contains(&y) && range.contains(&z) {
            Some(Neighbor(((x + 1) + (y + 1) * 3 + (z + 1) * 9) as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn offset(self) -> (i32, i32, i32) {
        let slot = self.0 as i32;
        (slot % 3 - 1, (slot / 3) % 3 - 1, slot / 9 - 1)
    }

    pub fn opposite(self) -> Neighbor {
        Neighbor(26 - self.0)
    }
}

impl fmt::Debug for Neighbor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y, z) = self.offset();
        write!(f, "Neighbor({x}, {y}, {z})")
    }
}
