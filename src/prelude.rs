//! Convenience re-exports for building exact-diagonalization calculations.

pub use crate::constants::*;
pub use crate::errors::EdPhysicsError;
pub use crate::krylov::{Eigenpair, Job, Lanczos, LanczosStatus, SolverError};
pub use crate::math::{CMatrix, CScalar, CVector, Coord, Scalar, SparseMatrix};
pub use crate::model::{
    Bond, ConfigurationError, Coupling, Generator, Index, IndexPack, Lattice, Modulation, Nambu, Operator,
    OperatorKind, OperatorList, Parameters, Point, Table, Term, TermCategory, TermKind,
};
pub use crate::onr::{Basis, Branch, GreenCoefficients, ModelName, Onr, Sector};
pub use crate::simulation::{Ensemble, SimulationConfig, SimulationError};
pub use crate::sweep::{broadened, density_of_states, linspace, sweep_map, GfPoint, SolveReport};
