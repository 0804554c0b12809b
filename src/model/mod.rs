//! Model description: indices, lattices, terms and the operator generator.

/// Quantum-number indices and the index-sequence table.
pub mod index;
/// Lattice points, bonds and neighbour shells.
pub mod lattice;
/// Elementary operator monomials.
pub mod operator;
/// Interaction terms and their bond expansion rules.
pub mod term;
/// Operator generation with incremental updates.
pub mod generator;

use thiserror::Error;

pub use generator::{Generator, OperatorCache, ParameterGroups};
pub use index::{Index, Nambu, Table};
pub use lattice::{Bond, Lattice, Point};
pub use operator::{Operator, OperatorKind, OperatorList};
pub use term::{Coupling, IndexPack, Modulation, Parameters, Term, TermCategory, TermKind};

/// Malformed term/bond/table combinations, reported when a generator is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Two terms of the same group share a tag.
    #[error("duplicate term tag `{tag}`")]
    DuplicateTag {
        /// Offending tag.
        tag: String,
    },
    /// Coupling value has the wrong number of components for its term kind.
    #[error("term `{tag}` has a coupling with {found} components")]
    CouplingDimension {
        /// Offending tag.
        tag: String,
        /// Number of components supplied.
        found: usize,
    },
    /// An index pack names an orbital or spin the point does not carry.
    #[error("term `{tag}` refers to an orbital/spin absent on site {site}")]
    PackOutOfRange {
        /// Offending tag.
        tag: String,
        /// Site lacking the degree of freedom.
        site: usize,
    },
    /// A generated leg is not present in the index table.
    #[error("term `{tag}` produced {index}, which is missing from the table")]
    MissingIndex {
        /// Offending tag.
        tag: String,
        /// Missing index.
        index: Index,
    },
    /// Pairing terms need the Nambu space.
    #[error("pairing term `{tag}` requires nambu space")]
    PairingWithoutNambu {
        /// Offending tag.
        tag: String,
    },
    /// Hubbard terms need spin-1/2 points.
    #[error("hubbard term `{tag}` on spinless site {site}")]
    SpinlessHubbard {
        /// Offending tag.
        tag: String,
        /// Spinless site.
        site: usize,
    },
    /// The term does not act on any bond of the lattice.
    #[error("term `{tag}` produces no operators on the given bonds")]
    EmptyExpansion {
        /// Offending tag.
        tag: String,
    },
}
