use std::cmp::min;
use std::ops::Index;

use crate::utils::MyHash;

/// Hash-consing table: every distinct value is stored once and addressed by a stable index.
///
/// Collisions are chained through `next` links; bucket heads and links use `0` as "none",
/// so slot `0` is reserved and never holds a value.
pub struct Table<T> {
    values: Vec<T>,
    next: Vec<usize>,
    buckets: Vec<usize>,
    bitmask: u64,
    capacity: usize,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table able to hold `2^bits - 1` values.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let buckets_size = 1 << min(bits, 16);
        Self {
            values: vec![T::default()],
            next: vec![0],
            buckets: vec![0; buckets_size],
            bitmask: (buckets_size - 1) as u64,
            capacity: 1 << bits,
        }
    }
}

impl<T> Table<T> {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored values.
    pub fn size(&self) -> usize {
        self.values.len() - 1
    }

    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.values[index]
    }

    pub fn is_full(&self) -> bool {
        self.values.len() >= self.capacity
    }

    /// Append a value without interning it and return its index.
    pub fn add(&mut self, value: T) -> usize {
        match self.try_add(value) {
            Some(index) => index,
            None => panic!("Storage is full"),
        }
    }

    /// Like [`add`][Self::add], but returns `None` when the table is full.
    pub fn try_add(&mut self, value: T) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        let index = self.values.len();
        self.values.push(value);
        self.next.push(0);
        Some(index)
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Return the index of `value`, inserting it first if it is not yet present.
    ///
    /// Returns `None` if `value` is new and the table is full.
    pub fn put(&mut self, value: T) -> Option<usize> {
        let bucket = self.bucket_index(&value);
        let mut index = self.buckets[bucket];

        if index == 0 {
            let i = self.try_add(value)?;
            self.buckets[bucket] = i;
            return Some(i);
        }

        loop {
            if self.values[index] == value {
                return Some(index);
            }
            match self.next[index] {
                0 => {
                    let i = self.try_add(value)?;
                    self.next[index] = i;
                    return Some(i);
                }
                next => index = next,
            }
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}
