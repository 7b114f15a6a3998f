use std::fmt::{Display, Formatter};
use std::ops::Neg;

/// Handle to a node of the [`Bdd`][crate::bdd::Bdd] manager.
///
/// The sign carries the complement bit: `-f` is the negation of `f`
/// and costs nothing. Index `1` is the single terminal node, so
/// `one = +1` and `zero = -1`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Ref(i32);

impl Ref {
    pub const fn positive(index: u32) -> Self {
        Self(index as i32)
    }

    pub const fn negative(index: u32) -> Self {
        Self(-(index as i32))
    }

    pub const fn is_negated(self) -> bool {
        self.0 < 0
    }

    /// Index of the referenced node in the storage.
    pub const fn index(self) -> u32 {
        self.0.unsigned_abs()
    }

    /// Literal-style encoding `2 * index + sign`, unique per handle and non-negative.
    pub(crate) const fn as_lit(self) -> u64 {
        ((self.0.unsigned_abs() as u64) << 1) + self.is_negated() as u64
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation() {
        let r = Ref::positive(5);
        assert!(!r.is_negated());
        assert!((-r).is_negated());
        assert_eq!(-(-r), r);
        assert_eq!((-r).index(), 5);
        assert_eq!(-r, Ref::negative(5));
    }

    #[test]
    fn test_lit_is_unique() {
        let a = Ref::positive(3);
        assert_ne!(a.as_lit(), (-a).as_lit());
        assert_eq!(a.as_lit(), 6);
        assert_eq!((-a).as_lit(), 7);
    }

    #[test]
    fn test_display() {
        assert_eq!(Ref::positive(4).to_string(), "@4");
        assert_eq!(Ref::negative(4).to_string(), "~@4");
    }
}
