//! Elementary fermionic operator monomials.

use std::cmp::Ordering;

use crate::math::{CScalar, Coord};

use super::index::{Index, Nambu};

/// Category of a monomial, fixed by the term that generated it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperatorKind {
    /// One leg: `c` or `c†`.
    Linear,
    /// Two legs: hopping, on-site energy or pairing.
    Quadratic,
    /// Four legs: density-density interaction.
    Hubbard,
}

/// A product of creation/annihilation legs with a complex coefficient.
///
/// Legs are read left to right as written; acting on a state applies the
/// rightmost leg first. `seqs[k]` is the table position of the mode of leg `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    /// Category.
    pub kind: OperatorKind,
    /// Coefficient.
    pub value: CScalar,
    /// Leg indices.
    pub indices: Vec<Index>,
    /// Real-space coordinate per leg.
    pub rcoords: Vec<Coord>,
    /// Lattice-vector coordinate per leg.
    pub icoords: Vec<Coord>,
    /// Sequence number per leg.
    pub seqs: Vec<usize>,
}

/// Ordered collection of operators.
pub type OperatorList = Vec<Operator>;

impl Operator {
    /// Single-leg operator.
    #[must_use]
    pub fn linear(value: CScalar, index: Index, rcoord: Coord, icoord: Coord, seq: usize) -> Self {
        Self {
            kind: OperatorKind::Linear,
            value,
            indices: vec![index],
            rcoords: vec![rcoord],
            icoords: vec![icoord],
            seqs: vec![seq],
        }
    }

    /// Number of legs.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.indices.len()
    }

    /// Iterates `(seq, nambu)` per leg, left to right.
    pub fn legs(&self) -> impl DoubleEndedIterator<Item = (usize, Nambu)> + '_ {
        self.seqs.iter().zip(&self.indices).map(|(&seq, index)| (seq, index.nambu))
    }

    /// Hermitian conjugate: legs reversed and flipped, coefficient conjugated.
    #[must_use]
    pub fn dagger(&self) -> Self {
        Self {
            kind: self.kind,
            value: self.value.conj(),
            indices: self.indices.iter().rev().map(|i| i.dagger()).collect(),
            rcoords: self.rcoords.iter().rev().cloned().collect(),
            icoords: self.icoords.iter().rev().cloned().collect(),
            seqs: self.seqs.iter().rev().copied().collect(),
        }
    }

    /// True when the leg string equals that of its Hermitian conjugate.
    #[must_use]
    pub fn is_self_conjugate(&self) -> bool {
        self.indices
            .iter()
            .zip(self.indices.iter().rev())
            .all(|(a, b)| *a == b.dagger())
            && self.icoords.iter().all(|c| c.norm() == 0.0)
    }

    /// Identity key: the sequence tuple, then the leg actions.
    #[must_use]
    pub fn id(&self) -> (Vec<usize>, Vec<Nambu>) {
        (self.seqs.clone(), self.indices.iter().map(|i| i.nambu).collect())
    }

    /// Ordering by identity key.
    #[must_use]
    pub fn cmp_id(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }

    /// Copy with the coefficient multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: CScalar) -> Self {
        Self {
            value: self.value * factor,
            ..self.clone()
        }
    }
}
