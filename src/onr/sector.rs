//! A symmetry sector: a basis together with its assembled Hamiltonian.

use crate::math::SparseMatrix;
use crate::model::operator::Operator;

use super::basis::{Basis, SectorKey};
use super::representation::hamiltonian;

/// Basis plus Hamiltonian matrix, read-only once built.
#[derive(Debug, Clone)]
pub struct Sector {
    basis: Basis,
    matrix: SparseMatrix,
}

impl Sector {
    /// Assembles the Hamiltonian of the half operator list `operators` on `basis`.
    #[must_use]
    pub fn new<'a>(basis: Basis, operators: impl IntoIterator<Item = &'a Operator>) -> Self {
        Self {
            basis,
            matrix: hamiltonian(basis, operators),
        }
    }

    /// Sector reached along `key`, with a freshly assembled matrix.
    ///
    /// `None` when the target sector is empty.
    #[must_use]
    pub fn transition<'a>(&self, key: SectorKey, operators: impl IntoIterator<Item = &'a Operator>) -> Option<Self> {
        let basis = self.basis.shifted(key)?;
        if basis == self.basis {
            return Some(self.clone());
        }
        Some(Self::new(basis, operators))
    }

    /// Basis.
    #[must_use]
    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    /// Hamiltonian matrix.
    #[must_use]
    pub fn matrix(&self) -> &SparseMatrix {
        &self.matrix
    }

    /// Number of basis states.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.basis.dimension()
    }
}
