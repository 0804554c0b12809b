//! Shared numerical primitives anchored on `nalgebra` and `nalgebra-sparse`.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CscMatrix;
use num_complex::Complex;

/// Primary scalar type used across the crate.
pub type Scalar = f64;
/// Primary complex scalar type for amplitudes and couplings.
pub type CScalar = Complex<Scalar>;
/// Real-space or lattice coordinate.
pub type Coord = DVector<Scalar>;
/// Dense complex state vector.
pub type CVector = DVector<CScalar>;
/// Dense complex matrix.
pub type CMatrix = DMatrix<CScalar>;
/// Compressed sparse column matrix used for Hamiltonians and operator representations.
pub type SparseMatrix = CscMatrix<CScalar>;

/// Complex zero.
pub const CZERO: CScalar = Complex::new(0.0, 0.0);
/// Complex one.
pub const CONE: CScalar = Complex::new(1.0, 0.0);

/// Sparse matrix-vector product `y = A x` over the CSC column structure.
#[must_use]
pub fn matvec(matrix: &SparseMatrix, x: &CVector) -> CVector {
    let mut y = CVector::zeros(matrix.nrows());
    for (col, column) in matrix.col_iter().enumerate() {
        let xc = x[col];
        if xc == CZERO {
            continue;
        }
        for (&row, &val) in column.row_indices().iter().zip(column.values()) {
            y[row] += val * xc;
        }
    }
    y
}

/// Computes complex inner product: ⟨x, y⟩ = Σᵢ conj(xᵢ) * yᵢ
#[must_use]
pub fn complex_dot(x: &CVector, y: &CVector) -> CScalar {
    x.iter().zip(y.iter()).map(|(xi, yi)| xi.conj() * yi).sum()
}

/// Expands a sparse matrix into a dense one (small systems and tests only).
#[must_use]
pub fn to_dense(matrix: &SparseMatrix) -> CMatrix {
    let mut dense = CMatrix::zeros(matrix.nrows(), matrix.ncols());
    for (row, col, &value) in matrix.triplet_iter() {
        dense[(row, col)] += value;
    }
    dense
}

/// Euclidean distance between two coordinates of equal dimension.
#[must_use]
pub fn distance(a: &Coord, b: &Coord) -> Scalar {
    (a - b).norm()
}
