//! Quantum-number indices and the index-sequence table.
//!
//! A [`Table`] fixes the row/column ordering of every matrix built from a
//! model: the `n`-th key inserted receives sequence number `n`, and the
//! numbers always form the contiguous range `[0, len)`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

/// Nambu component of a single-particle index.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Nambu {
    /// Annihilation operator `c`.
    Annihilation,
    /// Creation operator `c†`.
    Creation,
}

impl Nambu {
    /// The opposite component.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Annihilation => Self::Creation,
            Self::Creation => Self::Annihilation,
        }
    }
}

/// Spin label used for spin-1/2 points: `0` is down, `1` is up.
pub const SPIN_DOWN: usize = 0;
/// Spin label used for spin-1/2 points.
pub const SPIN_UP: usize = 1;

/// Single-particle quantum numbers of one fermionic leg.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Index {
    /// Lattice site.
    pub site: usize,
    /// Orbital on the site.
    pub orbital: usize,
    /// Spin component.
    pub spin: usize,
    /// Creation or annihilation.
    pub nambu: Nambu,
}

impl Index {
    /// Creates an annihilation-type index.
    #[must_use]
    pub const fn new(site: usize, orbital: usize, spin: usize) -> Self {
        Self {
            site,
            orbital,
            spin,
            nambu: Nambu::Annihilation,
        }
    }

    /// Hermitian conjugate of the leg.
    #[must_use]
    pub const fn dagger(self) -> Self {
        Self {
            nambu: self.nambu.flip(),
            ..self
        }
    }

    /// The same mode with an explicit nambu component.
    #[must_use]
    pub const fn with_nambu(self, nambu: Nambu) -> Self {
        Self { nambu, ..self }
    }

    /// The mode this leg acts on, independent of creation/annihilation.
    #[must_use]
    pub const fn mode(self) -> Self {
        self.with_nambu(Nambu::Annihilation)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dagger = match self.nambu {
            Nambu::Annihilation => "",
            Nambu::Creation => "†",
        };
        write!(
            f,
            "c{dagger}(site={}, orbital={}, spin={})",
            self.site, self.orbital, self.spin
        )
    }
}

/// Bidirectional map between keys and dense sequence numbers.
#[derive(Debug, Clone)]
pub struct Table<K = Index> {
    keys: Vec<K>,
    lookup: HashMap<K, usize>,
    parts: BTreeMap<String, Table<K>>,
}

impl<K: Clone + Eq + Hash> Default for Table<K> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            lookup: HashMap::new(),
            parts: BTreeMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> Table<K> {
    /// Builds a table in insertion order. Repeated keys keep their first sequence number.
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = K>) -> Self {
        let mut table = Self::default();
        for key in keys {
            table.push(key);
        }
        table
    }

    fn push(&mut self, key: K) {
        if self.lookup.contains_key(&key) {
            return;
        }
        self.lookup.insert(key.clone(), self.keys.len());
        self.keys.push(key);
    }

    /// Concatenates named tables. The merged numbering follows operand order, and
    /// every operand stays reachable through [`Table::part`] with its own numbering.
    #[must_use]
    pub fn union<S: Into<String>>(tables: impl IntoIterator<Item = (S, Self)>) -> Self {
        let mut merged = Self::default();
        let mut parts = BTreeMap::new();
        for (name, table) in tables {
            for key in &table.keys {
                merged.push(key.clone());
            }
            parts.insert(name.into(), table);
        }
        merged.parts = parts;
        merged
    }

    /// Keeps the keys accepted by `mask`, in their original relative order,
    /// renumbered to a contiguous range.
    #[must_use]
    pub fn subset(&self, mask: impl Fn(&K) -> bool) -> Self {
        Self::new(self.keys.iter().filter(|key| mask(key)).cloned())
    }

    /// Sequence number of `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<usize> {
        self.lookup.get(key).copied()
    }

    /// Key stored at sequence number `seq` (the reverse table).
    #[must_use]
    pub fn key(&self, seq: usize) -> Option<&K> {
        self.keys.get(seq)
    }

    /// The reverse table as a seq → key map.
    #[must_use]
    pub fn reversed(&self) -> BTreeMap<usize, K> {
        self.keys.iter().cloned().enumerate().collect()
    }

    /// True when `key` is present.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.lookup.contains_key(key)
    }

    /// Named operand of a [`Table::union`].
    #[must_use]
    pub fn part(&self, name: &str) -> Option<&Self> {
        self.parts.get(name)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates `(key, seq)` in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, usize)> + '_ {
        self.keys.iter().enumerate().map(|(seq, key)| (key, seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_follow_insertion_order() {
        let table = Table::new([Index::new(0, 0, 0), Index::new(0, 0, 1), Index::new(0, 0, 2)]);
        assert_eq!(table.len(), 3);
        for (seq, spin) in (0..3).enumerate() {
            assert_eq!(table.get(&Index::new(0, 0, spin)), Some(seq));
        }
        assert!(Table::<Index>::default().is_empty());
    }

    #[test]
    fn union_keeps_operand_numbering() {
        let a = Table::new([Index::new(0, 0, 0), Index::new(0, 0, 1)]);
        let b = Table::new([Index::new(0, 0, 2), Index::new(0, 0, 3)]);
        let c = Table::union([("a", a), ("b", b)]);
        let key = Index::new(0, 0, 2);
        assert_eq!(c.get(&key), Some(2));
        assert_eq!(c.part("b").and_then(|b| b.get(&key)), Some(0));
        assert_eq!(c.reversed().get(&3), Some(&Index::new(0, 0, 3)));
    }

    #[test]
    fn subset_renumbers_contiguously() {
        let a = Table::new([Index::new(0, 0, 0), Index::new(0, 0, 1)]);
        let b = Table::new([Index::new(0, 0, 2), Index::new(0, 0, 3)]);
        let c = Table::union([("a", a), ("b", b)]);
        let sub = c.subset(|index| matches!(index.spin, 0 | 3));
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.get(&Index::new(0, 0, 0)), Some(0));
        assert_eq!(sub.get(&Index::new(0, 0, 3)), Some(1));
        assert!(!sub.contains(&Index::new(0, 0, 1)));
    }

    #[test]
    fn string_keys_are_supported() {
        let a = Table::new(["i1", "i2"]);
        let b = Table::new(["i3", "i4"]);
        let c = Table::union([("a", a), ("b", b)]);
        assert_eq!(c.part("b").and_then(|b| b.get(&"i4")), Some(1));
        assert_eq!(c.get(&"i4"), Some(3));
        let sub = c.subset(|key| *key != "i1");
        assert_eq!(sub.key(0), Some(&"i2"));
    }

    #[test]
    fn dagger_flips_only_nambu() {
        let index = Index::new(1, 2, 1);
        assert_eq!(index.dagger().nambu, Nambu::Creation);
        assert_eq!(index.dagger().dagger(), index);
        assert_eq!(index.dagger().mode(), index);
    }
}
