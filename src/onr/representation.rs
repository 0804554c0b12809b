//! Sparse matrix representations of operators on occupation-number bases.

use nalgebra_sparse::coo::CooMatrix;
use num_complex::Complex;
use rayon::prelude::*;

use crate::math::{CScalar, CVector, SparseMatrix, CZERO};
use crate::model::index::Nambu;
use crate::model::operator::Operator;

use super::basis::Basis;

/// Applies the legs of `operator` (rightmost first) to the state `bits`.
///
/// Returns the resulting state and the fermionic sign, or `None` when a leg
/// annihilates the state. Each leg picks up `(-1)^n` with `n` the number of
/// occupied modes below its own.
#[must_use]
pub fn apply(operator: &Operator, mut bits: u64) -> Option<(u64, f64)> {
    let mut sign = 1.0;
    for (seq, nambu) in operator.legs().rev() {
        let mode = 1u64 << seq;
        let occupied = bits & mode != 0;
        match nambu {
            Nambu::Creation if occupied => return None,
            Nambu::Annihilation if !occupied => return None,
            _ => {}
        }
        if (bits & (mode - 1)).count_ones() % 2 == 1 {
            sign = -sign;
        }
        bits ^= mode;
    }
    Some((bits, sign))
}

/// Matrix of `operator` from `from` into `to`, rows indexing the target basis.
#[must_use]
pub fn operator_matrix(operator: &Operator, from: &Basis, to: &Basis) -> SparseMatrix {
    let mut coo = CooMatrix::new(to.dimension(), from.dimension());
    for (col, bits) in from.states().enumerate() {
        if let Some((target, sign)) = apply(operator, bits) {
            if let Some(row) = to.index_of(target) {
                coo.push(row, col, operator.value * sign);
            }
        }
    }
    SparseMatrix::from(&coo)
}

/// Applies `operator` to the vector `state` of `from`, producing a vector of `to`.
///
/// This is the action of [`operator_matrix`] without materializing the matrix.
#[must_use]
pub fn apply_to_vector(operator: &Operator, state: &CVector, from: &Basis, to: &Basis) -> CVector {
    let mut out = CVector::zeros(to.dimension());
    for (col, bits) in from.states().enumerate() {
        let amplitude = state[col];
        if amplitude == CZERO {
            continue;
        }
        if let Some((target, sign)) = apply(operator, bits) {
            if let Some(row) = to.index_of(target) {
                out[row] += operator.value * sign * amplitude;
            }
        }
    }
    out
}

/// Accumulates a Hermitian matrix from one member of each conjugate pair.
///
/// Every entry `(r, c, v)` contributed by a half operator is pushed together
/// with its mirror `(c, r, conj v)`, so the finished matrix is `H_half + H_half†`
/// and exactly Hermitian; duplicate entries are summed on conversion.
pub struct HamiltonianBuilder {
    basis: Basis,
    coo: CooMatrix<CScalar>,
}

impl HamiltonianBuilder {
    /// Creates an empty builder for `basis`.
    #[must_use]
    pub fn new(basis: Basis) -> Self {
        let n = basis.dimension();
        Self {
            basis,
            coo: CooMatrix::new(n, n),
        }
    }

    /// Adds a list of half operators, enumerating the basis in parallel.
    pub fn add_half_all<'a>(&mut self, operators: impl IntoIterator<Item = &'a Operator>) {
        let operators: Vec<&Operator> = operators.into_iter().collect();
        let states: Vec<u64> = self.basis.states().collect();
        let basis = self.basis;
        let entries: Vec<(usize, usize, CScalar)> = states
            .par_iter()
            .enumerate()
            .flat_map_iter(|(col, &bits)| {
                operators
                    .iter()
                    .filter_map(move |op| half_entry(&basis, op, col, bits))
            })
            .collect();
        for entry in entries {
            self.push_pair(entry);
        }
    }

    fn push_pair(&mut self, (row, col, value): (usize, usize, CScalar)) {
        self.coo.push(row, col, value);
        self.coo.push(col, row, value.conj());
    }

    /// Finalizes into a CSC matrix.
    #[must_use]
    pub fn finish(self) -> SparseMatrix {
        SparseMatrix::from(&self.coo)
    }
}

fn half_entry(basis: &Basis, operator: &Operator, col: usize, bits: u64) -> Option<(usize, usize, CScalar)> {
    let (target, sign) = apply(operator, bits)?;
    let row = basis.index_of(target)?;
    Some((row, col, operator.value * Complex::new(sign, 0.0)))
}

/// Assembles the Hermitian matrix of a half operator list on `basis`.
#[must_use]
pub fn hamiltonian<'a>(basis: Basis, operators: impl IntoIterator<Item = &'a Operator>) -> SparseMatrix {
    let mut builder = HamiltonianBuilder::new(basis);
    builder.add_half_all(operators);
    builder.finish()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    use super::*;
    use crate::math::to_dense;
    use crate::model::index::Index;
    use crate::model::operator::OperatorKind;

    fn op(value: f64, legs: &[(usize, Nambu)]) -> Operator {
        let origin = DVector::zeros(1);
        Operator {
            kind: OperatorKind::Quadratic,
            value: Complex::new(value, 0.0),
            indices: legs.iter().map(|&(s, n)| Index::new(s, 0, 0).with_nambu(n)).collect(),
            rcoords: vec![origin.clone(); legs.len()],
            icoords: vec![origin; legs.len()],
            seqs: legs.iter().map(|&(s, _)| s).collect(),
        }
    }

    #[test]
    fn legs_act_right_to_left_with_fermionic_sign() {
        let hop = op(1.0, &[(2, Nambu::Creation), (0, Nambu::Annihilation)]);
        // c2† c0 |011> : c0 gives +|010>, c2† passes one occupied mode
        assert_eq!(apply(&hop, 0b011), Some((0b110, -1.0)));
        assert_eq!(apply(&hop, 0b010), None);
        assert_eq!(apply(&hop, 0b101), None);
    }

    #[test]
    fn half_hopping_completes_to_hermitian_matrix() {
        let basis = Basis::particle(2, 1).expect("valid basis");
        let hop = op(-1.0, &[(1, Nambu::Creation), (0, Nambu::Annihilation)]);
        let dense = to_dense(&hamiltonian(basis, [&hop]));
        assert_relative_eq!(dense[(1, 0)].re, -1.0, epsilon = 1.0e-15);
        assert_relative_eq!(dense[(0, 1)].re, -1.0, epsilon = 1.0e-15);
        assert_eq!(dense[(0, 0)], CZERO);
        assert_eq!(dense.adjoint(), dense);
    }

    #[test]
    fn half_density_restores_full_diagonal() {
        let basis = Basis::grand(1).expect("valid basis");
        let n = op(0.5 * 0.3, &[(0, Nambu::Creation), (0, Nambu::Annihilation)]);
        let dense = to_dense(&hamiltonian(basis, [&n]));
        assert_relative_eq!(dense[(1, 1)].re, 0.3, epsilon = 1.0e-15);
        assert_eq!(dense[(0, 0)], CZERO);
    }

    #[test]
    fn vector_action_matches_matrix() {
        let from = Basis::particle(3, 1).expect("valid basis");
        let to = Basis::particle(3, 2).expect("valid basis");
        let create = op(1.0, &[(1, Nambu::Creation)]);
        let state = CVector::from_vec(vec![Complex::new(1.0, 0.0), Complex::new(2.0, 0.0), Complex::new(3.0, 0.0)]);
        let direct = apply_to_vector(&create, &state, &from, &to);
        let via_matrix = to_dense(&operator_matrix(&create, &from, &to)) * &state;
        assert_relative_eq!((direct - via_matrix).norm(), 0.0, epsilon = 1.0e-15);
    }
}
