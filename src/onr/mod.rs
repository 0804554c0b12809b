//! Occupation-number representation: bases, sparse Hamiltonians and the
//! Lanczos Green's-function engine built on them.

/// Occupation-number bases of symmetry sectors.
pub mod basis;
/// Operator matrices and Hermitian assembly.
pub mod representation;
/// Basis plus Hamiltonian of one sector.
pub mod sector;
/// Continued-fraction Green's-function coefficients.
pub mod green;
/// The exact-diagonalization engine.
pub mod engine;

pub use basis::{Basis, Channel, SectorKey};
pub use engine::{GroundState, ModelName, Onr};
pub use green::{Branch, GreenCoefficients};
pub use representation::{apply, hamiltonian, operator_matrix, HamiltonianBuilder};
pub use sector::Sector;
