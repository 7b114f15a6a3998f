//! # Decision-diagram kernel
//!
//! A small, manager-centric BDD package backing the concrete property transformers
//! of [`bdd_transformer`][crate::bdd_transformer].
//!
//! All nodes live in one [`Bdd`] manager and are addressed through [`Ref`] handles.
//! The manager hash-conses nodes in a unique [`Table`], so for a fixed variable order
//! every boolean function has exactly one handle: equality of functions is equality of
//! handles. This is what makes the solver's "did this node change?" test an `O(n)`
//! comparison of `Ref`s.
//!
//! ## Complement edges
//!
//! There is a single terminal node (index `1`). The constant `1` is `+1` and the
//! constant `0` is `-1`; negating any function just flips the sign of its handle.
//! Canonicity is kept by never storing a negated high edge: [`Bdd::mk_node`] pushes
//! the negation up to the handle instead.
//!
//! ## Variables
//!
//! Variables are 1-based, `0` marks the terminal. Smaller variables are closer to the root.
//!
//! ## Capacity
//!
//! The unique table holds at most `2^storage_bits` nodes. Once it is full, new nodes are
//! replaced by the constant `0` and the manager stays [`full`][Bdd::is_full]: every result
//! computed from then on is meaningless, and the manager should be discarded.
//!
//! ## Operations
//!
//! Everything is built on [`Bdd::apply_ite`], memoised in a direct-mapped [`Cache`].
//! On top of that the kernel offers [`Bdd::vector_compose`] (simultaneous substitution of
//! all variables, the heart of transformer composition), [`Bdd::eval`] and a textual
//! [`serialize`][Bdd::serialize]/[`deserialize`][Bdd::deserialize] pair that is independent
//! of the manager the diagram was built in.
//!
//! ```
//! use m3c_rs::bdd::Bdd;
//!
//! let bdd = Bdd::default();
//! let x1 = bdd.mk_var(1);
//! let x2 = bdd.mk_var(2);
//! let f = bdd.apply_and(x1, -x2);
//!
//! assert!(bdd.eval(f, &[true, false]));
//! assert!(!bdd.eval(f, &[true, true]));
//!
//! // Substitute x1 := x2: x2 & ~x2 = 0
//! let g = bdd.vector_compose(f, &[x2, x2]);
//! assert!(bdd.is_zero(g));
//! ```

use std::cell::{Cell, RefCell};
use std::cmp::min;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;

use log::{debug, warn};

use crate::cache::Cache;
use crate::error::DeserializeError;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing3, MyHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            variable: 0,
            low: Ref::positive(1),
            high: Ref::positive(1),
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(self.variable as u64, self.low.as_lit(), self.high.as_lit())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct IteKey(Ref, Ref, Ref);

impl MyHash for IteKey {
    fn hash(&self) -> u64 {
        pairing3(self.0.as_lit(), self.1.as_lit(), self.2.as_lit())
    }
}

pub struct Bdd {
    storage: RefCell<Table<Node>>,
    cache: RefCell<Cache<IteKey, Ref>>,
    full: Cell<bool>,
    pub zero: Ref,
    pub one: Ref,
}

impl Bdd {
    pub fn new(storage_bits: usize) -> Self {
        assert!(
            (1..=31).contains(&storage_bits),
            "Storage bits should be in the range 1..=31"
        );

        let mut storage = Table::new(storage_bits);
        let one = storage.add(Node::default());
        assert_eq!(one, 1, "Terminal node must be (1)");
        let one = Ref::positive(one as u32);

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(min(storage_bits, 16))),
            full: Cell::new(false),
            zero: -one,
            one,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(20)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        let cache = self.cache.borrow();
        f.debug_struct("Bdd")
            .field("capacity", &storage.capacity())
            .field("size", &storage.size())
            .field("cache_hits", &cache.hits())
            .field("cache_misses", &cache.misses())
            .finish()
    }
}

impl Bdd {
    pub fn variable(&self, index: u32) -> u32 {
        self.storage.borrow()[index as usize].variable
    }
    pub fn low(&self, index: u32) -> Ref {
        self.storage.borrow()[index as usize].low
    }
    pub fn high(&self, index: u32) -> Ref {
        self.storage.borrow()[index as usize].high
    }

    /// Low child of `node`, with the complement bit of `node` applied.
    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    /// High child of `node`, with the complement bit of `node` applied.
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == self.one.index()
    }

    /// Number of nodes allocated in the manager, terminal included.
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().size()
    }

    pub fn capacity(&self) -> usize {
        self.storage.borrow().capacity()
    }

    /// Whether a node could not be allocated because the unique table was full.
    pub fn is_full(&self) -> bool {
        self.full.get()
    }

    pub fn constant(&self, value: bool) -> Ref {
        if value {
            self.one
        } else {
            self.zero
        }
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        debug!("mk(v = {}, low = {}, high = {})", v, low, high);
        assert_ne!(v, 0, "Variable index should not be zero");

        if low == high {
            return low;
        }
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        let i = self.storage.borrow_mut().put(Node { variable: v, low, high });
        match i {
            Some(i) => Ref::positive(i as u32),
            None => {
                if !self.full.replace(true) {
                    warn!("Storage is full ({} nodes)", self.capacity());
                }
                self.zero
            }
        }
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.mk_node(v, self.zero, self.one)
    }

    fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        if self.is_terminal(node) || v < self.variable(node.index()) {
            return (node, node);
        }
        assert_eq!(v, self.variable(node.index()));
        (self.low_node(node), self.high_node(node))
    }

    /// If-then-else: `(f ∧ g) ∨ (¬f ∧ h)`.
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        debug!("apply_ite(f = {}, g = {}, h = {})", f, g, h);

        // ite(1,G,H) => G
        // ite(0,G,H) => H
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }

        // ite(F,G,G) => G
        // ite(F,1,0) => F
        // ite(F,0,1) => ~F
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,G,~F) => ite(F,G,1)
        if g == f {
            return self.apply_ite(f, self.one, h);
        }
        if g == -f {
            return self.apply_ite(f, self.zero, h);
        }
        if h == f {
            return self.apply_ite(f, g, self.zero);
        }
        if h == -f {
            return self.apply_ite(f, g, self.one);
        }

        // ite(~F,G,H) => ite(F,H,G)
        let (f, g, h) = if f.is_negated() { (-f, h, g) } else { (f, g, h) };
        // ite(F,~G,H) => ~ite(F,G,~H)
        let (g, h, negate) = if g.is_negated() { (-g, -h, true) } else { (g, h, false) };

        let key = IteKey(f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            debug!("cache: apply_ite(f = {}, g = {}, h = {}) -> {}", f, g, h, res);
            return if negate { -res } else { res };
        }

        // Top variable; `f` is never terminal here.
        let mut m = self.variable(f.index());
        for r in [g, h] {
            if !self.is_terminal(r) {
                m = m.min(self.variable(r.index()));
            }
        }

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);
        let res = self.mk_node(m, e, t);
        debug!("computed: apply_ite(f = {}, g = {}, h = {}) -> {}", f, g, h, res);
        self.cache.borrow_mut().insert(key, res);

        if negate {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.zero)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, self.one, v)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.one;
        for node in nodes {
            res = self.apply_and(res, node);
            if self.is_zero(res) {
                break;
            }
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.zero;
        for node in nodes {
            res = self.apply_or(res, node);
            if self.is_one(res) {
                break;
            }
        }
        res
    }

    /// Simultaneous substitution `f[x1 := subst[0], x2 := subst[1], ...]`.
    ///
    /// Variables beyond `subst.len()` are left in place.
    pub fn vector_compose(&self, f: Ref, subst: &[Ref]) -> Ref {
        let mut memo = HashMap::new();
        self.vector_compose_(f, subst, &mut memo)
    }

    fn vector_compose_(&self, f: Ref, subst: &[Ref], memo: &mut HashMap<u32, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }
        if f.is_negated() {
            return -self.vector_compose_(-f, subst, memo);
        }
        if let Some(&res) = memo.get(&f.index()) {
            return res;
        }

        let v = self.variable(f.index());
        let low = self.vector_compose_(self.low(f.index()), subst, memo);
        let high = self.vector_compose_(self.high(f.index()), subst, memo);
        let g = match subst.get(v as usize - 1) {
            Some(&g) => g,
            None => self.mk_var(v),
        };
        let res = self.apply_ite(g, high, low);
        memo.insert(f.index(), res);
        res
    }

    /// Evaluate `f` under `assignment`, where `assignment[i]` is the value of variable `i + 1`.
    /// Missing variables are `false`.
    pub fn eval(&self, f: Ref, assignment: &[bool]) -> bool {
        let mut node = f;
        while !self.is_terminal(node) {
            let v = self.variable(node.index());
            node = if assignment.get(v as usize - 1).copied().unwrap_or(false) {
                self.high_node(node)
            } else {
                self.low_node(node)
            };
        }
        self.is_one(node)
    }

    /// Indices of all non-terminal nodes reachable from `roots`.
    pub fn descendants(&self, roots: impl IntoIterator<Item = Ref>) -> HashSet<u32> {
        let mut visited = HashSet::new();
        let mut stack: Vec<Ref> = roots.into_iter().collect();
        while let Some(node) = stack.pop() {
            if self.is_terminal(node) || !visited.insert(node.index()) {
                continue;
            }
            stack.push(self.low(node.index()));
            stack.push(self.high(node.index()));
        }
        visited
    }

    /// Number of non-terminal nodes of `f`.
    pub fn size(&self, f: Ref) -> usize {
        self.descendants([f]).len()
    }

    pub fn to_bracket_string(&self, node: Ref) -> String {
        if self.is_zero(node) {
            return "(0)".to_string();
        } else if self.is_one(node) {
            return "(1)".to_string();
        }

        let v = self.variable(node.index());
        format!(
            "{}:(x{}, {}, {})",
            node,
            v,
            self.to_bracket_string(self.high_node(node)),
            self.to_bracket_string(self.low_node(node))
        )
    }

    /// Manager-independent text form of `f`.
    ///
    /// Nodes are listed children-first as `var,low,high` separated by `;`, followed by `|` and
    /// the root. Node references are signed local ids: `1` is the terminal, `k >= 2` is the
    /// `(k-1)`-th listed node, a minus sign marks a complemented edge.
    /// The constants are `|1` and `|-1`.
    pub fn serialize(&self, f: Ref) -> String {
        let mut ids = HashMap::new();
        let mut out = String::new();
        self.serialize_(f, &mut ids, &mut out);
        out.push_str(&format!("|{}", Self::local_ref(f, &ids)));
        out
    }

    fn local_ref(f: Ref, ids: &HashMap<u32, i64>) -> i64 {
        let id = if f.index() == 1 { 1 } else { ids[&f.index()] };
        if f.is_negated() {
            -id
        } else {
            id
        }
    }

    fn serialize_(&self, f: Ref, ids: &mut HashMap<u32, i64>, out: &mut String) {
        if self.is_terminal(f) || ids.contains_key(&f.index()) {
            return;
        }
        let i = f.index();
        let (low, high) = (self.low(i), self.high(i));
        self.serialize_(low, ids, out);
        self.serialize_(high, ids, out);

        let id = ids.len() as i64 + 2;
        ids.insert(i, id);
        if id > 2 {
            out.push(';');
        }
        out.push_str(&format!(
            "{},{},{}",
            self.variable(i),
            Self::local_ref(low, ids),
            Self::local_ref(high, ids)
        ));
    }

    /// Rebuild a diagram produced by [`serialize`][Bdd::serialize] in this manager.
    pub fn deserialize(&self, input: &str) -> Result<Ref, DeserializeError> {
        let malformed = |reason: &str| DeserializeError::Malformed {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (body, root) = input.split_once('|').ok_or_else(|| malformed("missing '|'"))?;
        let mut nodes = vec![self.one];
        let resolve = |nodes: &Vec<Ref>, s: &str| -> Result<Ref, DeserializeError> {
            let id: i64 = s.trim().parse().map_err(|_| malformed("bad node reference"))?;
            if id == 0 {
                return Err(malformed("node reference 0 is reserved"));
            }
            let r = nodes
                .get(id.unsigned_abs() as usize - 1)
                .copied()
                .ok_or_else(|| malformed("dangling node reference"))?;
            Ok(if id < 0 { -r } else { r })
        };

        for entry in body.split(';').filter(|s| !s.is_empty()) {
            let parts: Vec<&str> = entry.split(',').collect();
            let [v, low, high] = parts.as_slice() else {
                return Err(malformed("node must have three fields"));
            };
            let v: u32 = v.trim().parse().map_err(|_| malformed("bad variable"))?;
            if v == 0 {
                return Err(malformed("variable 0 is reserved"));
            }
            let low = resolve(&nodes, *low)?;
            let high = resolve(&nodes, *high)?;
            if [low, high].iter().any(|&c| !self.is_terminal(c) && self.variable(c.index()) <= v) {
                return Err(malformed("variable order violated"));
            }
            nodes.push(self.mk_node(v, low, high));
        }

        resolve(&nodes, root)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_var() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(1);
        assert_eq!(bdd.variable(x.index()), 1);
        assert_eq!(bdd.high_node(x), bdd.one);
        assert_eq!(bdd.low_node(x), bdd.zero);
        assert_eq!(bdd.high_node(-x), bdd.zero);
        assert_eq!(bdd.low_node(-x), bdd.one);
    }

    #[test]
    fn test_terminal() {
        let bdd = Bdd::default();
        assert!(bdd.is_terminal(bdd.zero));
        assert!(bdd.is_terminal(bdd.one));
        assert!(bdd.is_zero(-bdd.one));
        assert_eq!(bdd.constant(true), bdd.one);
        assert_eq!(bdd.constant(false), bdd.zero);
    }

    #[test]
    fn test_full_storage() {
        let bdd = Bdd::new(2);
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        assert!(!bdd.is_full());
        assert_eq!(bdd.num_nodes(), 3);

        // The table has room for the terminal and three nodes.
        bdd.apply_and(x, y);
        assert!(bdd.is_full());
        assert_eq!(bdd.mk_var(1), x);
        assert_eq!(bdd.num_nodes(), bdd.capacity() - 1);
    }

    #[test]
    fn test_hash_consing() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_and(x, y);
        let g = bdd.apply_and(y, x);
        assert_eq!(f, g);
        assert_eq!(bdd.mk_var(1), x);
    }

    #[test]
    fn test_de_morgan() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        assert_eq!(-bdd.apply_and(x, y), bdd.apply_or(-x, -y));
        assert_eq!(-bdd.apply_or(x, y), bdd.apply_and(-x, -y));
    }

    #[test]
    fn test_many() {
        let bdd = Bdd::default();
        let xs: Vec<Ref> = (1..=3).map(|v| bdd.mk_var(v)).collect();
        let all = bdd.apply_and_many(xs.iter().copied());
        let any = bdd.apply_or_many(xs.iter().copied());
        assert!(bdd.eval(all, &[true, true, true]));
        assert!(!bdd.eval(all, &[true, false, true]));
        assert!(bdd.eval(any, &[false, false, true]));
        assert!(!bdd.eval(any, &[false, false, false]));
        assert_eq!(bdd.apply_and_many(std::iter::empty()), bdd.one);
        assert_eq!(bdd.apply_or_many(std::iter::empty()), bdd.zero);
    }

    #[test]
    fn test_ite_is_mux() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let z = bdd.mk_var(3);
        let f = bdd.apply_ite(x, y, z);
        let expected = bdd.apply_or(bdd.apply_and(x, y), bdd.apply_and(-x, z));
        assert_eq!(f, expected);
        assert_eq!(f, bdd.mk_node(1, z, y));
    }

    #[test]
    fn test_vector_compose() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        // (x1 | x2)[x1 := x3, x2 := 0] = x3
        let f = bdd.apply_or(x1, x2);
        assert_eq!(bdd.vector_compose(f, &[x3, bdd.zero]), x3);

        // Swap x1 and x2 in x1 & ~x2
        let g = bdd.apply_and(x1, -x2);
        assert_eq!(bdd.vector_compose(g, &[x2, x1]), bdd.apply_and(x2, -x1));

        // Identity substitution
        assert_eq!(bdd.vector_compose(g, &[x1, x2, x3]), g);
        // Short substitution leaves the rest untouched
        assert_eq!(bdd.vector_compose(bdd.apply_and(x1, x3), &[bdd.one]), x3);
    }

    #[test]
    fn test_eval() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let f = bdd.apply_or(x1, -x2);
        assert!(bdd.eval(f, &[false, false]));
        assert!(!bdd.eval(f, &[false, true]));
        assert!(bdd.eval(f, &[true, true]));
        assert!(bdd.eval(f, &[]));
    }

    #[test]
    fn test_size() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        assert_eq!(bdd.size(bdd.one), 0);
        assert_eq!(bdd.size(x1), 1);
        assert_eq!(bdd.size(bdd.apply_and(x1, x2)), 2);
    }

    #[test]
    fn test_bracket_string() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(1);
        assert_eq!(bdd.to_bracket_string(bdd.one), "(1)");
        assert_eq!(bdd.to_bracket_string(x), format!("{}:(x1, (1), (0))", x));
    }

    #[test]
    fn test_serialize_constants() {
        let bdd = Bdd::default();
        assert_eq!(bdd.serialize(bdd.one), "|1");
        assert_eq!(bdd.serialize(bdd.zero), "|-1");
        assert_eq!(bdd.serialize(bdd.mk_var(3)), "3,-1,1|2");
    }

    #[test]
    fn test_serialize_across_managers() {
        let a = Bdd::default();
        let b = Bdd::default();

        // Allocate junk in `b` so that indices differ between managers.
        b.apply_and(b.mk_var(7), b.mk_var(8));

        let f = a.apply_or(a.apply_and(a.mk_var(1), -a.mk_var(2)), a.mk_var(3));
        let text = a.serialize(f);
        let g = b.deserialize(&text).unwrap();

        let expected = b.apply_or(b.apply_and(b.mk_var(1), -b.mk_var(2)), b.mk_var(3));
        assert_eq!(g, expected);
        assert_eq!(b.serialize(g), text);
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        let bdd = Bdd::default();
        assert!(bdd.deserialize("nonsense").is_err());
        assert!(bdd.deserialize("1,2|2").is_err());
        assert!(bdd.deserialize("1,-1,5|2").is_err());
        assert!(bdd.deserialize("0,-1,1|2").is_err());
        assert!(bdd.deserialize("|0").is_err());
        assert!(bdd.deserialize("2,-1,1;1,2,1|3").is_ok());
        assert!(bdd.deserialize("1,-1,1;2,2,1|3").is_err());
    }
}
