//! Run configuration for exact-diagonalization engines.

use std::path::PathBuf;

use crate::constants::DEFAULT_NSTEP;
use crate::math::Scalar;

/// Statistical ensemble of a calculation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ensemble {
    /// Fixed particle number; the filling enters the model identity.
    Canonical {
        /// Filling factor.
        filling: Scalar,
    },
    /// Fixed chemical potential; `mu` enters the model identity and shifts
    /// the density-of-states energy axis.
    Grand {
        /// Chemical potential.
        mu: Scalar,
    },
}

impl Ensemble {
    /// Chemical potential used to shift spectra (zero for the canonical ensemble).
    #[must_use]
    pub fn mu(&self) -> Scalar {
        match *self {
            Self::Canonical { .. } => 0.0,
            Self::Grand { mu } => mu,
        }
    }
}

/// Metadata describing an exact-diagonalization run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Prefix of the model identity.
    pub name: String,
    /// Ensemble.
    pub ensemble: Ensemble,
    /// Lanczos steps recorded per Green's-function pair.
    pub nstep: usize,
    /// 1 when the ground state has equal up/down occupation and only
    /// spin-down single-particle operators are needed, 2 otherwise.
    pub nspin: usize,
    /// True when single-particle operators span the Nambu space.
    pub nambu: bool,
    /// Directory of the persisted coefficient cache; `None` disables persistence.
    pub cache_dir: Option<PathBuf>,
    /// Write freshly computed coefficients to `cache_dir`.
    pub save_data: bool,
    /// Step cap for the ground-state Lanczos run (default: sector dimension).
    pub max_lanczos_steps: Option<usize>,
}

impl SimulationConfig {
    /// Canonical-ensemble configuration.
    #[must_use]
    pub fn canonical(name: impl Into<String>, filling: Scalar) -> Self {
        Self::new(name, Ensemble::Canonical { filling })
    }

    /// Grand-canonical configuration.
    #[must_use]
    pub fn grand(name: impl Into<String>, mu: Scalar) -> Self {
        Self::new(name, Ensemble::Grand { mu })
    }

    fn new(name: impl Into<String>, ensemble: Ensemble) -> Self {
        Self {
            name: name.into(),
            ensemble,
            nstep: DEFAULT_NSTEP,
            nspin: 2,
            nambu: false,
            cache_dir: None,
            save_data: false,
            max_lanczos_steps: None,
        }
    }

    /// Sets the number of recorded Lanczos steps.
    #[must_use]
    pub fn with_nstep(mut self, nstep: usize) -> Self {
        self.nstep = nstep;
        self
    }

    /// Sets the spin-symmetry flag.
    #[must_use]
    pub fn with_nspin(mut self, nspin: usize) -> Self {
        self.nspin = nspin;
        self
    }

    /// Enables Nambu-space single-particle operators.
    #[must_use]
    pub fn with_nambu(mut self, nambu: bool) -> Self {
        self.nambu = nambu;
        self
    }

    /// Enables the persisted coefficient cache in `dir`.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>, save_data: bool) -> Self {
        self.cache_dir = Some(dir.into());
        self.save_data = save_data;
        self
    }

    /// Caps the ground-state Lanczos run.
    #[must_use]
    pub fn with_max_lanczos_steps(mut self, steps: usize) -> Self {
        self.max_lanczos_steps = Some(steps);
        self
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.nstep == 0 {
            return Err(SimulationError::InvalidConfig("nstep must be positive".into()));
        }
        if !matches!(self.nspin, 1 | 2) {
            return Err(SimulationError::InvalidNspin(self.nspin));
        }
        if self.save_data && self.cache_dir.is_none() {
            return Err(SimulationError::MissingParameter("cache_dir"));
        }
        Ok(())
    }
}

/// Errors that can occur while configuring an engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// Raised when a required parameter is missing.
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),
    /// Raised when the configuration is internally inconsistent.
    #[error("configuration error: {0}")]
    InvalidConfig(String),
    /// `nspin` outside `{1, 2}`.
    #[error("nspin must be 1 or 2, got {0}")]
    InvalidNspin(usize),
    /// More single-particle modes than fit in an occupation bit string.
    #[error("{nmodes} modes exceed the occupation bit-string capacity")]
    TooManyModes {
        /// Requested modes.
        nmodes: usize,
    },
    /// Particle number outside `0..=nstate`.
    #[error("{nparticle} particles do not fit into {nstate} states")]
    InvalidParticleNumber {
        /// States of the sector.
        nstate: usize,
        /// Requested particles.
        nparticle: usize,
    },
    /// Basis and index table disagree on the number of modes.
    #[error("basis has {basis} modes but the lattice table has {table}")]
    ModeMismatch {
        /// Modes of the basis.
        basis: usize,
        /// Modes of the table.
        table: usize,
    },
    /// Nambu-space operators requested on a sector of fixed particle number,
    /// which pairing monomials always leave.
    #[error("nambu space requires a grand-canonical basis")]
    NambuOutsideGrand,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimulationConfig::canonical("H2", 0.5);
        assert_eq!(config.nstep, DEFAULT_NSTEP);
        assert!(config.validate().is_ok());
        assert_eq!(config.ensemble.mu(), 0.0);
    }

    #[test]
    fn save_without_directory_is_rejected() {
        let mut config = SimulationConfig::grand("H2", 1.5);
        config.save_data = true;
        assert_eq!(config.validate(), Err(SimulationError::MissingParameter("cache_dir")));
        assert_eq!(config.ensemble.mu(), 1.5);
    }

    #[test]
    fn invalid_nspin_is_rejected() {
        let config = SimulationConfig::canonical("H2", 0.5).with_nspin(3);
        assert_eq!(config.validate(), Err(SimulationError::InvalidNspin(3)));
    }
}
