//! # Palette Storage
//!
//! Dense, compressed storage for the cells of one region.
//!
//! ## Layout
//!
//! - `palette`: reference-counted entries, one per distinct value, sized as a
//!   power of two
//! - `indices`: a bit-packed array of `REGION_VOLUME` fixed-width indices into
//!   the palette
//!
//! A storage that has only ever held the default value allocates nothing.
//! The first differing write allocates a two-entry palette with 1-bit
//! indices. When every palette slot is referenced, the index width doubles
//! (1, 2, 4, 8, 16 bits) and all indices are repacked.
//!
//! ## Invariants
//!
//! - The ref counts of all entries sum to `REGION_VOLUME`
//! - Every index references an entry with a ref count above zero
//! - At most one referenced entry holds any given value
//!
//! ### Performance Characteristics
//! - **Read**: O(1)
//! - **Write**: O(palette) to find the value, O(`REGION_VOLUME`) when growing
//! - **Memory**: `index_bits * REGION_VOLUME / 8` bytes plus the palette

use bitvec::prelude::*;

use super::REGION_VOLUME;

/// A palette slot: a value and the number of cells that reference it.
///
/// A slot with a ref count of zero is free and its value is meaningless.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaletteEntry<T> {
    pub value: T,
    pub ref_count: usize,
}

#[derive(Clone, Debug)]
struct PackedCells<T> {
    palette: Vec<PaletteEntry<T>>,
    indices: BitVec<u64, Lsb0>,
    index_bits: usize,
    used: usize,
}

/// Palette-compressed storage for `REGION_VOLUME` cells.
#[derive(Clone, Debug)]
pub struct PaletteStorage<T> {
    data: Option<PackedCells<T>>,
}

impl<T: Copy + Eq + Default> PaletteStorage<T> {
    /// Creates a storage in which every cell holds `T::default()`.
    pub fn new() -> Self {
        Self { data: None }
    }

    /// Reads one cell.
    ///
    /// # Panics
    /// Panics if `index >= REGION_VOLUME`.
    pub fn get(&self, index: usize) -> T {
        assert!(index < REGION_VOLUME, "cell index {index} out of bounds");
        match &self.data {
            Some(data) => data.palette[data.read_index(index)].value,
            None => T::default(),
        }
    }

    /// Writes one cell. Writing the value a cell already holds is a no-op.
    ///
    /// # Panics
    /// Panics if `index >= REGION_VOLUME`.
    pub fn set(&mut self, index: usize, value: T) {
        assert!(index < REGION_VOLUME, "cell index {index} out of bounds");
        if self.data.is_none() && value == T::default() {
            return;
        }
        self.data.get_or_insert_with(PackedCells::new).set(index, value);
    }

    /// Distinct values other than the default that at least one cell holds.
    pub fn values(&self) -> impl Iterator<Item = T> + '_ {
        self.entries()
            .iter()
            .filter(|entry| entry.ref_count > 0 && entry.value != T::default())
            .map(|entry| entry.value)
    }

    /// The raw palette. Empty while nothing has been allocated.
    pub fn entries(&self) -> &[PaletteEntry<T>] {
        match &self.data {
            Some(data) => &data.palette,
            None => &[],
        }
    }

    /// Number of palette entries currently referenced by at least one cell.
    pub fn distinct_count(&self) -> usize {
        self.data.as_ref().map_or(1, |data| data.used)
    }

    /// Width in bits of each packed index, `0` while unallocated.
    pub fn index_bits(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.index_bits)
    }

    /// Whether every cell holds the default value.
    pub fn is_uniform_default(&self) -> bool {
        self.values().next().is_none()
    }
}

impl<T: Copy + Eq + Default> Default for PaletteStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Eq + Default> PackedCells<T> {
    fn new() -> Self {
        let free = PaletteEntry { value: T::default(), ref_count: 0 };
        Self {
            palette: vec![PaletteEntry { value: T::default(), ref_count: REGION_VOLUME }, free],
            indices: bitvec![u64, Lsb0; 0; REGION_VOLUME],
            index_bits: 1,
            used: 1,
        }
    }

    fn read_index(&self, cell: usize) -> usize {
        let start = cell * self.index_bits;
        self.indices[start..start + self.index_bits].load_le::<usize>()
    }

    fn write_index(&mut self, cell: usize, slot: usize) {
        let start = cell * self.index_bits;
        self.indices[start..start + self.index_bits].store_le::<usize>(slot);
    }

    fn set(&mut self, cell: usize, value: T) {
        let current = self.read_index(cell);
        if self.palette[current].value == value {
            return;
        }

        self.palette[current].ref_count -= 1;
        let current_freed = self.palette[current].ref_count == 0;

        let existing = self
            .palette
            .iter()
            .position(|entry| entry.ref_count > 0 && entry.value == value);
        if let Some(slot) = existing {
            self.palette[slot].ref_count += 1;
            self.write_index(cell, slot);
            if current_freed {
                self.used -= 1;
            }
            return;
        }

        // The old value vanished entirely, so its slot can take the new one.
        if current_freed {
            self.palette[current] = PaletteEntry { value, ref_count: 1 };
            return;
        }

        let slot = match self.palette.iter().position(|entry| entry.ref_count == 0) {
            Some(slot) => slot,
            None => self.grow(),
        };
        self.palette[slot] = PaletteEntry { value, ref_count: 1 };
        self.used += 1;
        self.write_index(cell, slot);
    }

    /// Doubles the index width and returns the first new free slot.
    fn grow(&mut self) -> usize {
        let old_bits = self.index_bits;
        let new_bits = old_bits * 2;
        let mut indices = bitvec![u64, Lsb0; 0; REGION_VOLUME * new_bits];
        for cell in 0..REGION_VOLUME {
            let slot = self.indices[cell * old_bits..(cell + 1) * old_bits].load_le::<usize>();
            indices[cell * new_bits..(cell + 1) * new_bits].store_le::<usize>(slot);
        }

        let first_free = self.palette.len();
        self.palette.resize(
            1 << new_bits,
            PaletteEntry { value: T::default(), ref_count: 0 },
        );
        self.indices = indices;
        self.index_bits = new_bits;
        log::trace!("palette grew to {new_bits}-bit indices");
        first_free
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ref_total<T: Copy + Eq + Default>(storage: &PaletteStorage<T>) -> usize {
        storage.entries().iter().map(|entry| entry.ref_count).sum()
    }

    #[test]
    fn unallocated_storage_reads_default() {
        let mut storage = PaletteStorage::<u16>::new();
        assert_eq!(storage.get(0), 0);
        assert_eq!(storage.get(REGION_VOLUME - 1), 0);

        storage.set(10, 0);
        assert_eq!(storage.index_bits(), 0);
        assert!(storage.entries().is_empty());
        assert!(storage.is_uniform_default());
    }

    #[test]
    fn write_then_read_returns_value() {
        let mut storage = PaletteStorage::<u16>::new();
        storage.set(17, 9);
        assert_eq!(storage.get(17), 9);
        assert_eq!(storage.get(16), 0);
        assert_eq!(storage.index_bits(), 1);
        assert_eq!(ref_total(&storage), REGION_VOLUME);
    }

    #[test]
    fn every_cell_distinct_reads_back() {
        let mut storage = PaletteStorage::<u32>::new();
        for cell in 0..REGION_VOLUME {
            storage.set(cell, cell as u32 + 1);
        }
        for cell in 0..REGION_VOLUME {
            assert_eq!(storage.get(cell), cell as u32 + 1);
        }
        assert_eq!(storage.index_bits(), 16);
        assert_eq!(storage.distinct_count(), REGION_VOLUME);
        assert_eq!(storage.values().count(), REGION_VOLUME);
        assert_eq!(ref_total(&storage), REGION_VOLUME);
    }

    #[test]
    fn index_width_doubles_as_palette_fills() {
        let mut storage = PaletteStorage::<u16>::new();
        let mut widths = Vec::new();
        for value in 1..=300u16 {
            storage.set(value as usize, value);
            if widths.last() != Some(&storage.index_bits()) {
                widths.push(storage.index_bits());
            }
        }
        assert_eq!(widths, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn freed_slots_are_reused_without_growth() {
        let mut storage = PaletteStorage::<u16>::new();
        storage.set(0, 1);
        storage.set(1, 2);
        storage.set(2, 3);
        assert_eq!(storage.index_bits(), 2);

        storage.set(1, 0);
        storage.set(3, 4);
        assert_eq!(storage.index_bits(), 2);
        assert_eq!(storage.values().collect::<Vec<_>>().len(), 3);
        assert_eq!(ref_total(&storage), REGION_VOLUME);
    }

    #[test]
    fn overwriting_last_reference_reuses_slot_in_place() {
        let mut storage = PaletteStorage::<u16>::new();
        storage.set(5, 1);
        storage.set(5, 2);
        assert_eq!(storage.index_bits(), 1);
        assert_eq!(storage.get(5), 2);
        assert_eq!(storage.distinct_count(), 2);
    }

    #[test]
    fn equal_values_share_one_entry() {
        let mut storage = PaletteStorage::<u16>::new();
        for cell in 0..100 {
            storage.set(cell, 7);
        }
        let entry = storage.entries().iter().find(|entry| entry.value == 7).unwrap();
        assert_eq!(entry.ref_count, 100);
        assert_eq!(storage.distinct_count(), 2);

        for cell in 0..100 {
            storage.set(cell, 0);
        }
        assert!(storage.is_uniform_default());
        assert_eq!(storage.distinct_count(), 1);
    }

    #[test]
    fn random_writes_keep_ref_counts_consistent() {
        let mut rng = fastrand::Rng::with_seed(42);
        let mut storage = PaletteStorage::<u8>::new();
        let mut mirror = vec![0u8; REGION_VOLUME];

        for _ in 0..20_000 {
            let cell = rng.usize(0..REGION_VOLUME);
            let value = rng.u8(0..24);
            storage.set(cell, value);
            mirror[cell] = value;
        }

        for (cell, &expected) in mirror.iter().enumerate() {
            assert_eq!(storage.get(cell), expected);
        }
        assert_eq!(ref_total(&storage), REGION_VOLUME);

        let referenced = storage.entries().iter().filter(|entry| entry.ref_count > 0).count();
        assert_eq!(referenced, storage.distinct_count());

        let mut distinct: Vec<u8> = mirror.iter().copied().filter(|&v| v != 0).collect();
        distinct.sort_unstable();
        distinct.dedup();
        let mut values: Vec<u8> = storage.values().collect();
        values.sort_unstable();
        assert_eq!(values, distinct);
    }
}
