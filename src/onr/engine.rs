//! Exact-diagonalization engine on the occupation-number representation.
//!
//! [`Onr`] owns a model (lattice, terms, generator), a working sector and
//! three lazily filled caches:
//!
//! - the working-sector Hamiltonian and its ground state;
//! - the Green's-function coefficients, optionally persisted on disk;
//! - the memoized frequency mesh of the last [`Onr::gf_mesh`] call.
//!
//! [`Onr::update`] regenerates the alterable operators and drops all three.

use std::fmt;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::errors::EdPhysicsError;
use crate::io::CoefficientStore;
use crate::krylov::{default_seed, Job, Lanczos, SolverError};
use crate::math::{CMatrix, CScalar, CVector, Scalar, CONE};
use crate::model::generator::Generator;
use crate::model::index::SPIN_DOWN;
use crate::model::lattice::Lattice;
use crate::model::operator::{Operator, OperatorList};
use crate::model::term::{Parameters, Term};
use crate::simulation::{Ensemble, SimulationConfig, SimulationError};
use crate::sweep::{broadened, density_of_states, linspace, GfPoint, SolveReport};

use super::basis::Basis;
use super::green::{self, GreenCoefficients};
use super::sector::Sector;

/// Model identity: a prefix followed by `tag_value` pairs of the constant and
/// then the alterable parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelName {
    prefix: String,
    constant: Vec<(String, String)>,
    alter: Vec<(String, String)>,
    suffix: Option<String>,
}

impl ModelName {
    /// Empty name with `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Appends `suffix` to the full name.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Sets or replaces a constant part.
    pub fn set_constant(&mut self, tag: &str, value: impl fmt::Display) {
        upsert(&mut self.constant, tag, value.to_string());
    }

    /// Sets or replaces an alterable part.
    pub fn set_alter(&mut self, tag: &str, value: impl fmt::Display) {
        upsert(&mut self.alter, tag, value.to_string());
    }

    /// Prefix and constant parts only.
    #[must_use]
    pub fn constant(&self) -> String {
        let mut out = self.prefix.clone();
        for (tag, value) in &self.constant {
            out.push_str(&format!("_{tag}_{value}"));
        }
        out
    }

    /// Full identity used as the cache key.
    #[must_use]
    pub fn full(&self) -> String {
        let mut out = self.constant();
        for (tag, value) in &self.alter {
            out.push_str(&format!("_{tag}_{value}"));
        }
        if let Some(suffix) = &self.suffix {
            out.push('_');
            out.push_str(suffix);
        }
        out
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full())
    }
}

fn upsert(parts: &mut Vec<(String, String)>, tag: &str, value: String) {
    match parts.iter_mut().find(|(t, _)| t == tag) {
        Some(slot) => slot.1 = value,
        None => parts.push((tag.to_owned(), value)),
    }
}

/// Ground state of the working sector.
#[derive(Debug, Clone)]
pub struct GroundState {
    /// Ground-state energy.
    pub energy: Scalar,
    /// Normalized ground-state vector.
    pub vector: CVector,
    /// Lanczos steps taken.
    pub steps: usize,
}

#[derive(Debug, Clone)]
struct MeshMemo {
    omegas: Vec<CScalar>,
    points: Vec<GfPoint>,
}

/// Occupation-number-representation engine.
#[derive(Debug, Clone)]
pub struct Onr {
    config: SimulationConfig,
    lattice: Lattice,
    basis: Basis,
    generator: Generator,
    name: ModelName,
    single: OperatorList,
    sector: Option<Sector>,
    ground: Option<GroundState>,
    coefficients: Option<GreenCoefficients>,
    mesh: Option<MeshMemo>,
}

impl Onr {
    /// Builds the engine and its half-Hamiltonian generator.
    ///
    /// `basis` is the working sector; its mode count must match the lattice
    /// table, and Nambu space (hence any pairing term) needs a grand basis.
    pub fn new(config: SimulationConfig, lattice: Lattice, terms: Vec<Term>, basis: Basis) -> Result<Self, EdPhysicsError> {
        config.validate()?;
        let table = lattice.table(false);
        if basis.nstate() != table.len() {
            return Err(SimulationError::ModeMismatch {
                basis: basis.nstate(),
                table: table.len(),
            }
            .into());
        }
        if config.nambu && !matches!(basis, Basis::Grand { .. }) {
            return Err(SimulationError::NambuOutsideGrand.into());
        }
        let generator = Generator::new(lattice.bonds().to_vec(), table, terms, config.nambu, true)?;

        let mut name = ModelName::new(config.name.clone());
        match config.ensemble {
            Ensemble::Canonical { filling } => name.set_constant("filling", filling),
            Ensemble::Grand { mu } => name.set_alter("mu", mu),
        }
        for (tag, value) in &generator.parameters().constant {
            name.set_constant(tag, value);
        }
        for (tag, value) in &generator.parameters().alter {
            name.set_alter(tag, value);
        }

        let nspin = if matches!(basis, Basis::Spin { .. }) { config.nspin } else { 2 };
        let single = single_particle_operators(&lattice, config.nambu, nspin);
        Ok(Self {
            config,
            lattice,
            basis,
            generator,
            name,
            single,
            sector: None,
            ground: None,
            coefficients: None,
            mesh: None,
        })
    }

    /// Model identity.
    #[must_use]
    pub fn name(&self) -> &ModelName {
        &self.name
    }

    /// Run configuration.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Lattice.
    #[must_use]
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Working basis.
    #[must_use]
    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    /// Half-Hamiltonian generator.
    #[must_use]
    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Single-particle operators, in the row/column order of `G`.
    #[must_use]
    pub fn single_particle_operators(&self) -> &[Operator] {
        &self.single
    }

    /// Applies parameter overrides and drops every derived cache.
    ///
    /// In the grand-canonical ensemble an override named `mu` also moves the
    /// chemical potential.
    pub fn update(&mut self, parameters: &Parameters) {
        self.generator.update(parameters);
        if let (Ensemble::Grand { mu }, Some(value)) = (&mut self.config.ensemble, parameters.get("mu")) {
            *mu = value.re;
            self.name.set_alter("mu", value.re);
        }
        for (tag, value) in &self.generator.parameters().alter {
            self.name.set_alter(tag, value);
        }
        self.sector = None;
        self.ground = None;
        self.coefficients = None;
        self.mesh = None;
    }

    /// Assembles the working-sector Hamiltonian.
    pub fn set_matrix(&mut self) -> &Sector {
        self.sector
            .get_or_insert_with(|| Sector::new(self.basis, self.generator.iter_operators()))
    }

    /// Ground state of the working sector, computed once per model state.
    pub fn ground_state(&mut self) -> Result<&GroundState, EdPhysicsError> {
        if self.ground.is_none() {
            let max_steps = self.config.max_lanczos_steps;
            let sector = self.set_matrix();
            let mut lanczos = Lanczos::with_default_seed(sector.matrix())?;
            if let Some(steps) = max_steps {
                lanczos = lanczos.with_max_steps(steps);
            }
            let pair = lanczos.eig(Job::Vector)?;
            let vector = pair.vector.ok_or(SolverError::EmptySubspace)?;
            info!(name = %self.name, gse = pair.value, steps = pair.steps, "ground state");
            self.ground = Some(GroundState {
                energy: pair.value,
                vector,
                steps: pair.steps,
            });
        }
        self.ground.as_ref().ok_or_else(|| SolverError::EmptySubspace.into())
    }

    /// Green's-function coefficients, loaded from disk when a valid file exists.
    pub fn coefficients(&mut self) -> Result<&GreenCoefficients, EdPhysicsError> {
        if self.coefficients.is_none() {
            let coefficients = match self.load_coefficients() {
                Some(coefficients) => coefficients,
                None => self.compute_coefficients()?,
            };
            self.coefficients = Some(coefficients);
        }
        self.coefficients.as_ref().ok_or_else(|| SolverError::EmptySubspace.into())
    }

    fn store(&self) -> Option<CoefficientStore> {
        self.config
            .cache_dir
            .as_ref()
            .map(|dir| CoefficientStore::new(dir, &self.name.full()))
    }

    fn load_coefficients(&self) -> Option<GreenCoefficients> {
        let store = self.store()?;
        let nopt = self.single.len();
        let expected = GreenCoefficients::expected_len(nopt, self.config.nstep);
        match store.load(expected) {
            Ok(Some((gse, data))) => GreenCoefficients::from_raw(nopt, self.config.nstep, gse, data),
            Ok(None) => None,
            Err(err) => {
                warn!(path = %store.path().display(), %err, "unreadable coefficient file, recomputing");
                None
            }
        }
    }

    fn compute_coefficients(&mut self) -> Result<GreenCoefficients, EdPhysicsError> {
        self.ground_state()?;
        let (Some(sector), Some(ground)) = (self.sector.as_ref(), self.ground.as_ref()) else {
            return Err(SolverError::EmptySubspace.into());
        };
        let operators = self.generator.operators();
        let coefficients = green::compute(
            sector,
            &ground.vector,
            ground.energy,
            &operators,
            &self.single,
            self.config.nstep,
        )?;
        if self.config.save_data {
            if let Some(store) = self.store() {
                if let Err(err) = store.save(coefficients.gse(), coefficients.as_slice()) {
                    warn!(path = %store.path().display(), %err, "failed to persist coefficients");
                }
            }
        }
        Ok(coefficients)
    }

    /// `G(omega)` over the single-particle operators.
    pub fn gf(&mut self, omega: CScalar) -> Result<CMatrix, EdPhysicsError> {
        Ok(self.coefficients()?.evaluate(omega)?)
    }

    /// `G` on every frequency of `omegas`, memoized until the next update.
    ///
    /// A point whose continued fraction is singular is reported with a
    /// NaN-filled matrix and `success == false`; its neighbours are unaffected.
    pub fn gf_mesh(&mut self, omegas: &[CScalar]) -> Result<&[GfPoint], EdPhysicsError> {
        let fresh = self.mesh.as_ref().map_or(true, |memo| memo.omegas != omegas);
        if fresh {
            let coefficients = self.coefficients()?;
            let nopt = coefficients.nopt();
            let points: Vec<GfPoint> = omegas
                .par_iter()
                .map(|&omega| match coefficients.evaluate(omega) {
                    Ok(gf) => GfPoint {
                        omega,
                        gf,
                        report: SolveReport {
                            success: true,
                            ..Default::default()
                        },
                    },
                    Err(err) => {
                        warn!(%omega, %err, "green function point failed");
                        GfPoint {
                            omega,
                            gf: CMatrix::from_element(nopt, nopt, CScalar::new(Scalar::NAN, Scalar::NAN)),
                            report: SolveReport {
                                success: false,
                                notes: vec![format!("continued fraction failed: {err}")],
                            },
                        }
                    }
                })
                .collect();
            self.mesh = Some(MeshMemo {
                omegas: omegas.to_vec(),
                points,
            });
        }
        Ok(self.mesh.as_ref().map_or(&[][..], |memo| memo.points.as_slice()))
    }

    /// Density of states `-2 Im Tr G(E + mu + i eta)` on `ne` energies in `[emin, emax]`.
    pub fn dos(&mut self, emin: Scalar, emax: Scalar, ne: usize, eta: Scalar) -> Result<Vec<(Scalar, Scalar)>, EdPhysicsError> {
        let energies = linspace(emin, emax, ne);
        let omegas = broadened(&energies, self.config.ensemble.mu(), eta);
        let points = self.gf_mesh(&omegas)?;
        Ok(density_of_states(&energies, points))
    }

    /// Lowest `k` eigenvalues of the working sector, in ascending order.
    ///
    /// Each level is the ground state of a Lanczos recursion deflated against
    /// the eigenvectors found before it, so degenerate levels are all listed.
    /// Fewer than `k` values are returned when the sector is smaller.
    pub fn levels(&mut self, k: usize) -> Result<Vec<Scalar>, EdPhysicsError> {
        let max_steps = self.config.max_lanczos_steps;
        let matrix = self.set_matrix().matrix();
        let k = k.min(matrix.nrows());
        let mut values = Vec::with_capacity(k);
        let mut vectors: Vec<CVector> = Vec::with_capacity(k);
        while values.len() < k {
            let found = {
                let mut lanczos = Lanczos::deflated(matrix, default_seed(matrix.nrows()), &vectors)?;
                if let Some(steps) = max_steps {
                    lanczos = lanczos.with_max_steps(steps);
                }
                lanczos.eig(Job::Vector)
            };
            let pair = match found {
                Ok(pair) => pair,
                Err(SolverError::EmptySubspace) => break,
                Err(err) => return Err(err.into()),
            };
            debug!(level = values.len(), value = pair.value, steps = pair.steps, "energy level");
            values.push(pair.value);
            vectors.push(pair.vector.ok_or(SolverError::EmptySubspace)?);
        }
        values.sort_by(Scalar::total_cmp);
        Ok(values)
    }

    /// Lowest `k` levels along a sequence of parameter sets.
    pub fn energy_bands(&mut self, path: &[Parameters], k: usize) -> Result<Vec<Vec<Scalar>>, EdPhysicsError> {
        path.iter()
            .map(|parameters| {
                self.update(parameters);
                self.levels(k)
            })
            .collect()
    }
}

/// Single-particle operators `c` (and `c†` in Nambu space) ordered by table sequence.
///
/// With `nspin == 1` only spin-down modes are kept. Each operator's sequence
/// number is its mode position, so it acts on occupation bits directly.
fn single_particle_operators(lattice: &Lattice, nambu: bool, nspin: usize) -> OperatorList {
    let modes = lattice.table(false);
    let table = lattice.table(nambu);
    let table = if nspin == 1 {
        table.subset(|index| index.spin == SPIN_DOWN)
    } else {
        table
    };
    let mut entries: Vec<_> = table.iter().collect();
    entries.sort_by_key(|&(_, seq)| seq);
    entries
        .into_iter()
        .filter_map(|(index, _)| {
            let point = lattice.point(index.site)?;
            let seq = modes.get(&index.mode())?;
            Some(Operator::linear(CONE, *index, point.rcoord.clone(), point.icoord.clone(), seq))
        })
        .collect()
}
