//! Tridiagonal kernels.

use nalgebra::{DMatrix, DVector};

use crate::math::{CScalar, CVector, Scalar, CZERO};

use super::SolverError;

/// Solves `T x = rhs` for a complex tridiagonal `T`.
///
/// `sub[k]` is `T[k+1, k]`, `diag[k]` is `T[k, k]` and `sup[k]` is `T[k, k+1]`.
/// Gaussian elimination with partial pivoting, as in LAPACK's `gtsv`: row
/// interchanges introduce a second super-diagonal, stored in place of the
/// eliminated sub-diagonal.
pub fn solve_tridiagonal(
    sub: &[CScalar],
    diag: &[CScalar],
    sup: &[CScalar],
    rhs: &[CScalar],
) -> Result<CVector, SolverError> {
    let n = diag.len();
    if rhs.len() != n {
        return Err(SolverError::DimensionMismatch {
            expected: n,
            found: rhs.len(),
        });
    }
    if n > 0 && (sub.len() + 1 < n || sup.len() + 1 < n) {
        return Err(SolverError::DimensionMismatch {
            expected: n.saturating_sub(1),
            found: sub.len().min(sup.len()),
        });
    }

    let mut dl: Vec<CScalar> = sub.iter().take(n.saturating_sub(1)).copied().collect();
    let mut d = diag.to_vec();
    let mut du: Vec<CScalar> = sup.iter().take(n.saturating_sub(1)).copied().collect();
    let mut b = rhs.to_vec();

    for k in 0..n.saturating_sub(1) {
        if d[k].norm_sqr() >= dl[k].norm_sqr() {
            if d[k] == CZERO {
                return Err(SolverError::SingularMatrix { pivot: k });
            }
            let fact = dl[k] / d[k];
            d[k + 1] -= fact * du[k];
            let bk = b[k];
            b[k + 1] -= fact * bk;
            dl[k] = CZERO;
        } else {
            let fact = d[k] / dl[k];
            d[k] = dl[k];
            let temp = d[k + 1];
            d[k + 1] = du[k] - fact * temp;
            if k + 1 < n - 1 {
                dl[k] = du[k + 1];
                du[k + 1] = -fact * dl[k];
            }
            du[k] = temp;
            b.swap(k, k + 1);
            let bk = b[k];
            b[k + 1] -= fact * bk;
        }
    }
    if n > 0 && d[n - 1] == CZERO {
        return Err(SolverError::SingularMatrix { pivot: n - 1 });
    }

    // dl now holds the second super-diagonal
    let mut x = CVector::zeros(n);
    for k in (0..n).rev() {
        let mut acc = b[k];
        if k + 1 < n {
            acc -= du[k] * x[k + 1];
        }
        if k + 2 < n {
            acc -= dl[k] * x[k + 2];
        }
        x[k] = acc / d[k];
    }
    if x.iter().all(|v| v.re.is_finite() && v.im.is_finite()) {
        Ok(x)
    } else {
        Err(SolverError::SingularMatrix { pivot: n.saturating_sub(1) })
    }
}

/// Real symmetric tridiagonal matrix with diagonal `a` and off-diagonal `b`.
#[must_use]
pub fn symmetric_tridiagonal(a: &[Scalar], b: &[Scalar]) -> DMatrix<Scalar> {
    let m = a.len();
    let mut t = DMatrix::zeros(m, m);
    for (k, &ak) in a.iter().enumerate() {
        t[(k, k)] = ak;
        if k + 1 < m {
            t[(k, k + 1)] = b[k];
            t[(k + 1, k)] = b[k];
        }
    }
    t
}

/// Lowest eigenvalue of the symmetric tridiagonal `(a, b)` and its eigenvector.
///
/// Only the first `a.len() - 1` entries of `b` are used.
pub fn lowest_eigenpair(a: &[Scalar], b: &[Scalar]) -> Result<(Scalar, DVector<Scalar>), SolverError> {
    if a.is_empty() {
        return Err(SolverError::EmptySubspace);
    }
    if b.len() + 1 < a.len() {
        return Err(SolverError::DimensionMismatch {
            expected: a.len() - 1,
            found: b.len(),
        });
    }
    let eigen = symmetric_tridiagonal(a, b).symmetric_eigen();
    let (k, &value) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|x, y| x.1.total_cmp(y.1))
        .ok_or(SolverError::Eigensolver)?;
    Ok((value, eigen.eigenvectors.column(k).into_owned()))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use num_complex::Complex;

    use super::*;
    use crate::math::CONE;

    fn c(re: Scalar, im: Scalar) -> CScalar {
        Complex::new(re, im)
    }

    fn dense_product(sub: &[CScalar], diag: &[CScalar], sup: &[CScalar], x: &CVector) -> Vec<CScalar> {
        let n = diag.len();
        (0..n)
            .map(|k| {
                let mut acc = diag[k] * x[k];
                if k > 0 {
                    acc += sub[k - 1] * x[k - 1];
                }
                if k + 1 < n {
                    acc += sup[k] * x[k + 1];
                }
                acc
            })
            .collect()
    }

    #[test]
    fn solves_diagonally_dominant_system() {
        let sub = [c(1.0, 0.5), c(-0.3, 0.0), c(0.2, 0.1)];
        let diag = [c(4.0, 1.0), c(3.0, -0.5), c(5.0, 0.0), c(2.5, 0.2)];
        let sup = [c(0.5, 0.0), c(1.0, -1.0), c(-0.7, 0.3)];
        let rhs = [CONE, c(0.0, 1.0), c(2.0, 0.0), c(-1.0, 0.5)];
        let x = solve_tridiagonal(&sub, &diag, &sup, &rhs).expect("regular system");
        for (lhs, r) in dense_product(&sub, &diag, &sup, &x).iter().zip(rhs) {
            assert_relative_eq!((lhs - r).norm(), 0.0, epsilon = 1.0e-12);
        }
    }

    #[test]
    fn pivots_on_small_diagonal() {
        let sub = [c(2.0, 0.0), c(1.0, 0.0)];
        let diag = [c(1.0e-14, 0.0), c(1.0e-14, 0.0), c(3.0, 0.0)];
        let sup = [c(1.0, 0.0), c(4.0, 0.0)];
        let rhs = [CONE, c(2.0, 0.0), c(3.0, 0.0)];
        let x = solve_tridiagonal(&sub, &diag, &sup, &rhs).expect("regular system");
        for (lhs, r) in dense_product(&sub, &diag, &sup, &x).iter().zip(rhs) {
            assert_relative_eq!((lhs - r).norm(), 0.0, epsilon = 1.0e-10);
        }
    }

    #[test]
    fn singular_system_is_reported() {
        let sub = [c(1.0, 0.0)];
        let diag = [c(1.0, 0.0), c(1.0, 0.0)];
        let sup = [c(1.0, 0.0)];
        let err = solve_tridiagonal(&sub, &diag, &sup, &[CONE, CONE]);
        assert!(matches!(err, Err(SolverError::SingularMatrix { .. })));
    }

    #[test]
    fn single_row_system() {
        let x = solve_tridiagonal(&[], &[c(2.0, 0.0)], &[], &[c(1.0, 1.0)]).expect("regular system");
        assert_relative_eq!(x[0].re, 0.5, epsilon = 1.0e-15);
        assert_relative_eq!(x[0].im, 0.5, epsilon = 1.0e-15);
    }

    #[test]
    fn lowest_eigenpair_of_dimer() {
        let (value, vector) = lowest_eigenpair(&[0.0, 0.0], &[1.0]).expect("nonempty");
        assert_relative_eq!(value, -1.0, epsilon = 1.0e-12);
        assert_relative_eq!(vector[0].abs(), std::f64::consts::FRAC_1_SQRT_2, epsilon = 1.0e-12);
        assert_relative_eq!(vector[0] + vector[1], 0.0, epsilon = 1.0e-12);
    }
}
