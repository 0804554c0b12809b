//! Shared error types used across submodules.

use thiserror::Error;

use crate::krylov::SolverError;
use crate::model::ConfigurationError;
use crate::simulation::SimulationError;

/// Top-level error type for the crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EdPhysicsError {
    /// Malformed model description.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// Krylov or tridiagonal kernel failure.
    #[error(transparent)]
    Solver(#[from] SolverError),
    /// Wraps simulation-related errors.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}
