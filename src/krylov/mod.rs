//! Krylov-subspace machinery: the Lanczos recursion and tridiagonal kernels.
//!
//! The Hamiltonians handled here are Hermitian, so the recursion produces a
//! real symmetric tridiagonal matrix `T` whose diagonal `a_k` and
//! off-diagonal `b_k` fully describe the projected operator. Ground states
//! come from diagonalizing `T`; resolvents come from solving `(z - T) x = e_0`.

/// Three-term Lanczos recursion and ground-state search.
pub mod lanczos;
/// Tridiagonal solves and eigenpairs.
pub mod tridiag;

use thiserror::Error;

pub use lanczos::{default_seed, Eigenpair, Job, Lanczos, LanczosStatus};
pub use tridiag::{lowest_eigenpair, solve_tridiagonal};

/// Failures of the Krylov kernels.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// A tridiagonal system has a vanishing pivot or a non-finite solution.
    #[error("singular tridiagonal system (pivot {pivot})")]
    SingularMatrix {
        /// Row at which elimination failed.
        pivot: usize,
    },
    /// Matrix and vector sizes disagree.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Matrix dimension.
        expected: usize,
        /// Vector length.
        found: usize,
    },
    /// The recursion has no vector to work on (empty space or zero seed).
    #[error("empty Krylov space")]
    EmptySubspace,
    /// The dense tridiagonal eigensolver returned no eigenvalue.
    #[error("tridiagonal eigensolver failed")]
    Eigensolver,
}
