//! Three-term Lanczos recursion on a Hermitian sparse matrix.
//!
//! Starting from a normalized seed `q_0`, each step computes
//!
//! ```text
//! a_k = Re <q_k | H q_k>
//! r_k = H q_k - a_k q_k - b_{k-1} q_{k-1}
//! b_k = |r_k|,  q_{k+1} = r_k / b_k
//! ```
//!
//! A residual below [`LANCZOS_ZERO`] means the Krylov space is invariant:
//! the recursion is `cut`, `b_k` is recorded as zero and no further
//! coefficient is produced. No reorthogonalization is done; ghost copies of
//! converged Ritz values may appear but do not affect the lowest one.
//!
//! Ground states use two passes: the first accumulates `(a, b)` only, the
//! second regenerates the Krylov vectors from the stored seed to build the
//! eigenvector, so at most three vectors are alive at any time.
//!
//! A deflated recursion projects a set of orthonormal vectors out of the seed
//! and of every residual, so [`Lanczos::eig`] returns the lowest eigenpair of
//! their orthogonal complement. Excited levels follow by deflating the
//! eigenvectors already found.

use tracing::debug;

use crate::constants::{EIGEN_TOLERANCE, LANCZOS_ZERO};
use crate::math::{complex_dot, matvec, CScalar, CVector, Scalar, SparseMatrix, CZERO};

use super::tridiag::lowest_eigenpair;
use super::SolverError;

/// Steps between convergence checks of [`Lanczos::eig`] on short recursions;
/// longer ones are checked every `m / CHECK_STRIDE` steps.
const CHECK_STRIDE: usize = 8;

/// What [`Lanczos::eig`] returns.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// Eigenvalue only; the second pass is skipped.
    Value,
    /// Eigenvalue and eigenvector.
    Vector,
}

/// Lifecycle of a recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanczosStatus {
    /// No step taken yet.
    Idle,
    /// At least one step taken; more may follow.
    Running,
    /// The lowest Ritz pair met [`EIGEN_TOLERANCE`].
    Converged,
    /// The Krylov space became invariant.
    Cut,
    /// The step limit was reached.
    StepLimit,
}

/// Lowest eigenpair found by [`Lanczos::eig`].
#[derive(Debug, Clone)]
pub struct Eigenpair {
    /// Lowest Ritz value.
    pub value: Scalar,
    /// Normalized Ritz vector, present for [`Job::Vector`].
    pub vector: Option<CVector>,
    /// Number of Lanczos steps taken.
    pub steps: usize,
    /// Final residual estimate `b_m |s_m|`.
    pub residual: Scalar,
}

/// Lanczos recursion bound to one matrix.
#[derive(Debug, Clone)]
pub struct Lanczos<'a> {
    matrix: &'a SparseMatrix,
    deflation: &'a [CVector],
    seed: CVector,
    norm: Scalar,
    previous: CVector,
    current: CVector,
    a: Vec<Scalar>,
    b: Vec<Scalar>,
    status: LanczosStatus,
    max_steps: usize,
}

impl<'a> Lanczos<'a> {
    /// Starts a recursion from `seed`; the seed is normalized and its norm kept.
    ///
    /// A zero seed gives a recursion that is cut from the start.
    pub fn new(matrix: &'a SparseMatrix, seed: CVector) -> Result<Self, SolverError> {
        Self::deflated(matrix, seed, &[])
    }

    /// Starts a recursion confined to the orthogonal complement of `deflation`.
    ///
    /// The vectors must be orthonormal. The recorded norm is that of the
    /// projected seed; a seed inside their span gives a cut recursion.
    pub fn deflated(matrix: &'a SparseMatrix, mut seed: CVector, deflation: &'a [CVector]) -> Result<Self, SolverError> {
        if matrix.nrows() != matrix.ncols() || seed.len() != matrix.nrows() {
            return Err(SolverError::DimensionMismatch {
                expected: matrix.nrows(),
                found: seed.len(),
            });
        }
        if let Some(bad) = deflation.iter().find(|v| v.len() != matrix.nrows()) {
            return Err(SolverError::DimensionMismatch {
                expected: matrix.nrows(),
                found: bad.len(),
            });
        }
        project_out(&mut seed, deflation);
        let norm = seed.norm();
        let zero = norm < LANCZOS_ZERO;
        let seed = if zero { seed } else { seed.unscale(norm) };
        Ok(Self {
            matrix,
            deflation,
            previous: CVector::zeros(seed.len()),
            current: seed.clone(),
            seed,
            norm: if zero { 0.0 } else { norm },
            a: Vec::new(),
            b: Vec::new(),
            status: if zero { LanczosStatus::Cut } else { LanczosStatus::Idle },
            max_steps: matrix.nrows(),
        })
    }

    /// Starts a recursion from a fixed quasi-random seed (golden-ratio sequence).
    pub fn with_default_seed(matrix: &'a SparseMatrix) -> Result<Self, SolverError> {
        Self::new(matrix, default_seed(matrix.nrows()))
    }

    /// Caps the number of steps [`Lanczos::eig`] may take (default: matrix dimension).
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// One recursion step. No-op once cut.
    pub fn iter(&mut self) {
        if self.is_cut() {
            return;
        }
        let k = self.a.len();
        let mut r = matvec(self.matrix, &self.current);
        let a = complex_dot(&self.current, &r).re;
        r.axpy(CScalar::new(-a, 0.0), &self.current, CScalar::new(1.0, 0.0));
        if let Some(&b) = self.b.last() {
            r.axpy(CScalar::new(-b, 0.0), &self.previous, CScalar::new(1.0, 0.0));
        }
        project_out(&mut r, self.deflation);
        let b = r.norm();
        self.a.push(a);
        if b < LANCZOS_ZERO {
            self.b.push(0.0);
            self.status = LanczosStatus::Cut;
            debug!(step = k, "lanczos recursion cut");
            return;
        }
        self.b.push(b);
        r.unscale_mut(b);
        self.previous = std::mem::replace(&mut self.current, r);
        self.status = LanczosStatus::Running;
    }

    /// True once the recursion has broken down.
    #[must_use]
    pub fn is_cut(&self) -> bool {
        self.status == LanczosStatus::Cut
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> LanczosStatus {
        self.status
    }

    /// Norm of the seed before normalization.
    #[must_use]
    pub fn norm(&self) -> Scalar {
        self.norm
    }

    /// Current Krylov vector `q_k`.
    #[must_use]
    pub fn vector(&self) -> &CVector {
        &self.current
    }

    /// Diagonal coefficients recorded so far.
    #[must_use]
    pub fn a(&self) -> &[Scalar] {
        &self.a
    }

    /// Off-diagonal coefficients recorded so far; zero after a cut.
    #[must_use]
    pub fn b(&self) -> &[Scalar] {
        &self.b
    }

    /// Number of steps taken.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.a.len()
    }

    /// Runs the recursion until the lowest Ritz pair converges, a cut, or the step limit.
    ///
    /// The Ritz pair is only evaluated at spaced checkpoints, so a converged
    /// recursion may run a few steps past the point of convergence.
    pub fn eig(&mut self, job: Job) -> Result<Eigenpair, SolverError> {
        if self.norm == 0.0 || self.seed.is_empty() {
            return Err(SolverError::EmptySubspace);
        }
        let mut check = CHECK_STRIDE;
        let (value, ritz, residual) = loop {
            self.iter();
            let m = self.a.len();
            let limit = m >= self.max_steps;
            if !(self.is_cut() || limit || m >= check) {
                continue;
            }
            let (value, ritz) = lowest_eigenpair(&self.a, &self.b)?;
            let residual = self.b[m - 1] * ritz[m - 1].abs();
            if self.is_cut() {
                break (value, ritz, residual);
            }
            if residual < EIGEN_TOLERANCE {
                self.status = LanczosStatus::Converged;
                break (value, ritz, residual);
            }
            if limit {
                self.status = LanczosStatus::StepLimit;
                break (value, ritz, residual);
            }
            check = next_check(m);
        };
        debug!(steps = self.a.len(), value, residual, status = ?self.status, "lanczos eigensolve finished");

        let vector = match job {
            Job::Value => None,
            Job::Vector => Some(self.ritz_vector(ritz.as_slice())),
        };
        Ok(Eigenpair {
            value,
            vector,
            steps: self.a.len(),
            residual,
        })
    }

    fn ritz_vector(&self, ritz: &[Scalar]) -> CVector {
        let mut previous = CVector::zeros(self.seed.len());
        let mut current = self.seed.clone();
        let mut out = CVector::from_element(self.seed.len(), CZERO);
        for (k, &s) in ritz.iter().enumerate() {
            out.axpy(CScalar::new(s, 0.0), &current, CScalar::new(1.0, 0.0));
            if k + 1 == ritz.len() {
                break;
            }
            let mut r = matvec(self.matrix, &current);
            r.axpy(CScalar::new(-self.a[k], 0.0), &current, CScalar::new(1.0, 0.0));
            if k > 0 {
                r.axpy(CScalar::new(-self.b[k - 1], 0.0), &previous, CScalar::new(1.0, 0.0));
            }
            project_out(&mut r, self.deflation);
            r.unscale_mut(self.b[k]);
            previous = std::mem::replace(&mut current, r);
        }
        let norm = out.norm();
        if norm > 0.0 {
            out.unscale_mut(norm);
        }
        out
    }
}

/// Fixed quasi-random seed of length `n` (golden-ratio sequence).
#[must_use]
pub fn default_seed(n: usize) -> CVector {
    CVector::from_iterator(
        n,
        (0..n).map(|i| CScalar::new(((i as Scalar + 1.0) * 0.618_033_988_749_895).fract() - 0.5, 0.0)),
    )
}

fn project_out(v: &mut CVector, basis: &[CVector]) {
    for u in basis {
        let overlap = complex_dot(u, v);
        v.axpy(-overlap, u, CScalar::new(1.0, 0.0));
    }
}

fn next_check(m: usize) -> usize {
    m + (m / CHECK_STRIDE).max(CHECK_STRIDE)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra_sparse::coo::CooMatrix;
    use num_complex::Complex;

    use super::*;

    fn sparse(n: usize, entries: &[(usize, usize, Scalar)]) -> SparseMatrix {
        let mut coo = CooMatrix::new(n, n);
        for &(r, c, v) in entries {
            coo.push(r, c, Complex::new(v, 0.0));
        }
        SparseMatrix::from(&coo)
    }

    fn chain(n: usize) -> SparseMatrix {
        let mut entries = Vec::new();
        for i in 0..n - 1 {
            entries.push((i, i + 1, -1.0));
            entries.push((i + 1, i, -1.0));
        }
        sparse(n, &entries)
    }

    #[test]
    fn diagonal_matrix_gives_exact_minimum() {
        let matrix = sparse(4, &[(0, 0, 3.0), (1, 1, -2.0), (2, 2, 0.5), (3, 3, 1.0)]);
        let mut lanczos = Lanczos::with_default_seed(&matrix).expect("square");
        let pair = lanczos.eig(Job::Vector).expect("nonempty");
        assert_relative_eq!(pair.value, -2.0, epsilon = 1.0e-10);
        let v = pair.vector.expect("vector requested");
        assert_relative_eq!(v[1].norm(), 1.0, epsilon = 1.0e-8);
    }

    #[test]
    fn tight_binding_chain_ground_state() {
        let n = 12;
        let matrix = chain(n);
        let mut lanczos = Lanczos::with_default_seed(&matrix).expect("square");
        let pair = lanczos.eig(Job::Vector).expect("nonempty");
        let exact = -2.0 * (std::f64::consts::PI / (n as Scalar + 1.0)).cos();
        assert_relative_eq!(pair.value, exact, epsilon = 1.0e-9);

        let v = pair.vector.expect("vector requested");
        let hv = matvec(&matrix, &v);
        let residual = (hv - v.map(|x| x * pair.value)).norm();
        assert!(residual < 1.0e-6, "residual {residual}");
    }

    #[test]
    fn value_job_skips_vector() {
        let matrix = chain(5);
        let mut lanczos = Lanczos::with_default_seed(&matrix).expect("square");
        assert!(lanczos.eig(Job::Value).expect("nonempty").vector.is_none());
    }

    #[test]
    fn eigenvector_of_one_dimensional_subspace() {
        let matrix = sparse(3, &[(0, 0, 2.0), (1, 1, 5.0), (2, 2, 7.0)]);
        let seed = CVector::from_vec(vec![Complex::new(0.0, 0.0), Complex::new(3.0, 0.0), Complex::new(0.0, 0.0)]);
        let mut lanczos = Lanczos::new(&matrix, seed).expect("square");
        let pair = lanczos.eig(Job::Vector).expect("nonempty");
        assert_eq!(lanczos.status(), LanczosStatus::Cut);
        assert_relative_eq!(pair.value, 5.0, epsilon = 1.0e-12);
        assert_relative_eq!(pair.vector.expect("vector requested")[1].norm(), 1.0, epsilon = 1.0e-12);
    }

    #[test]
    fn iter_after_cut_is_a_no_op() {
        let matrix = chain(2);
        let seed = CVector::from_vec(vec![Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)]);
        let mut lanczos = Lanczos::new(&matrix, seed).expect("square");
        for _ in 0..5 {
            lanczos.iter();
        }
        assert!(lanczos.is_cut());
        assert_eq!(lanczos.steps(), 2);
        assert_relative_eq!(lanczos.a()[0], 0.0, epsilon = 1.0e-15);
        assert_relative_eq!(lanczos.b()[0], 1.0, epsilon = 1.0e-15);
        assert_eq!(lanczos.b()[1], 0.0);
    }

    #[test]
    fn zero_seed_is_cut_from_the_start() {
        let matrix = chain(3);
        let mut lanczos = Lanczos::new(&matrix, CVector::zeros(3)).expect("square");
        assert!(lanczos.is_cut());
        assert_eq!(lanczos.norm(), 0.0);
        lanczos.iter();
        assert_eq!(lanczos.steps(), 0);
        assert!(matches!(lanczos.eig(Job::Value), Err(SolverError::EmptySubspace)));
    }

    #[test]
    fn seed_norm_is_recorded() {
        let matrix = chain(3);
        let seed = CVector::from_vec(vec![Complex::new(3.0, 0.0), Complex::new(0.0, 4.0), Complex::new(0.0, 0.0)]);
        let lanczos = Lanczos::new(&matrix, seed).expect("square");
        assert_relative_eq!(lanczos.norm(), 5.0, epsilon = 1.0e-15);
        assert_relative_eq!(lanczos.vector().norm(), 1.0, epsilon = 1.0e-15);
        assert_eq!(lanczos.status(), LanczosStatus::Idle);
    }

    #[test]
    fn convergence_checks_are_spaced_geometrically() {
        assert_eq!(next_check(8), 16);
        assert_eq!(next_check(56), 64);
        assert_eq!(next_check(64), 72);
        assert_eq!(next_check(800), 900);
    }

    #[test]
    fn gapped_spectrum_converges_well_before_the_dimension() {
        let n = 300;
        let mut entries = vec![(0, 0, -10.0)];
        entries.extend((1..n).map(|i| (i, i, 0.01 * i as Scalar)));
        let matrix = sparse(n, &entries);
        let mut lanczos = Lanczos::with_default_seed(&matrix).expect("square");
        let pair = lanczos.eig(Job::Value).expect("nonempty");
        assert_eq!(lanczos.status(), LanczosStatus::Converged);
        assert!(pair.steps < 50, "steps {}", pair.steps);
        assert!(pair.residual < EIGEN_TOLERANCE);
        assert_relative_eq!(pair.value, -10.0, epsilon = 1.0e-10);
    }

    #[test]
    fn deflation_exposes_the_next_level() {
        let matrix = sparse(3, &[(0, 0, 1.0), (1, 1, -2.0), (2, 2, 4.0)]);
        let ground = vec![CVector::from_vec(vec![CZERO, Complex::new(1.0, 0.0), CZERO])];
        let mut lanczos = Lanczos::deflated(&matrix, default_seed(3), &ground).expect("square");
        let pair = lanczos.eig(Job::Vector).expect("nonempty");
        assert_relative_eq!(pair.value, 1.0, epsilon = 1.0e-12);
        let v = pair.vector.expect("vector requested");
        assert_relative_eq!(v[0].norm(), 1.0, epsilon = 1.0e-10);
        assert_relative_eq!(v[1].norm(), 0.0, epsilon = 1.0e-12);
    }

    #[test]
    fn seed_inside_the_deflated_span_is_empty() {
        let matrix = chain(2);
        let span = vec![CVector::from_vec(vec![Complex::new(1.0, 0.0), CZERO])];
        let seed = CVector::from_vec(vec![Complex::new(2.0, 0.0), CZERO]);
        let mut lanczos = Lanczos::deflated(&matrix, seed, &span).expect("square");
        assert!(lanczos.is_cut());
        assert!(matches!(lanczos.eig(Job::Value), Err(SolverError::EmptySubspace)));
    }

    #[test]
    fn mismatched_seed_is_rejected() {
        let matrix = chain(3);
        assert!(matches!(
            Lanczos::new(&matrix, CVector::zeros(2)),
            Err(SolverError::DimensionMismatch { expected: 3, found: 2 })
        ));
    }
}
