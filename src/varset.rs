//! Sets of formula variables.
//!
//! A [`VarSet`] is what a property transformer produces when evaluated: the set of
//! subformula variables satisfied at a state. Backed by `u64` words.

use std::fmt::{Debug, Formatter};

#[derive(Clone, Default)]
pub struct VarSet {
    words: Vec<u64>,
    count: usize,
}

impl VarSet {
    const BITS_PER_WORD: usize = 64;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(Self::BITS_PER_WORD)],
            count: 0,
        }
    }

    /// The set containing every `i` with `values[i] == true`.
    pub fn from_bools(values: &[bool]) -> Self {
        let mut set = Self::with_capacity(values.len());
        set.extend(values.iter().enumerate().filter(|(_, &b)| b).map(|(i, _)| i));
        set
    }

    /// Characteristic vector of length `len`.
    pub fn to_bools(&self, len: usize) -> Vec<bool> {
        (0..len).map(|i| self.contains(i)).collect()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn word_and_bit(index: usize) -> (usize, u64) {
        (index / Self::BITS_PER_WORD, 1u64 << (index % Self::BITS_PER_WORD))
    }

    pub fn contains(&self, index: usize) -> bool {
        let (word, mask) = Self::word_and_bit(index);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Returns true if `index` was not present.
    pub fn insert(&mut self, index: usize) -> bool {
        let (word, mask) = Self::word_and_bit(index);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let was_clear = self.words[word] & mask == 0;
        if was_clear {
            self.words[word] |= mask;
            self.count += 1;
        }
        was_clear
    }

    /// Returns true if `index` was present.
    pub fn remove(&mut self, index: usize) -> bool {
        let (word, mask) = Self::word_and_bit(index);
        let was_set = self.contains(index);
        if was_set {
            self.words[word] &= !mask;
            self.count -= 1;
        }
        was_set
    }

    pub fn extend(&mut self, iter: impl IntoIterator<Item = usize>) {
        for index in iter {
            self.insert(index);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut word = word;
            std::iter::from_fn(move || {
                if word == 0 {
                    return None;
                }
                let bit = word.trailing_zeros() as usize;
                word &= word - 1;
                Some(i * Self::BITS_PER_WORD + bit)
            })
        })
    }
}

// Trailing zero words must not affect equality.
impl PartialEq for VarSet {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.iter().eq(other.iter())
    }
}

impl Eq for VarSet {}

impl Debug for VarSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<usize> for VarSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let set = VarSet::new();
        assert!(set.is_empty());
        assert!(!set.contains(0));
        assert!(!set.contains(1000));
    }

    #[test]
    fn test_insert_remove() {
        let mut set = VarSet::with_capacity(8);
        assert!(set.insert(3));
        assert!(!set.insert(3));
        assert!(set.insert(130));
        assert_eq!(set.len(), 2);
        assert!(set.remove(3));
        assert!(!set.remove(3));
        assert!(!set.remove(4000));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![130]);
    }

    #[test]
    fn test_equality_ignores_capacity() {
        let a: VarSet = [1, 5].into_iter().collect();
        let mut b = VarSet::with_capacity(500);
        b.insert(5);
        b.insert(1);
        assert_eq!(a, b);
        b.insert(300);
        b.remove(300);
        assert_eq!(a, b);
    }

    #[test]
    fn test_bools() {
        let set = VarSet::from_bools(&[true, false, true, false]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(set.to_bools(4), vec![true, false, true, false]);
        assert_eq!(format!("{:?}", set), "{0, 2}");
    }
}
