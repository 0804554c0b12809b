//! Interaction terms and their expansion into operators on a bond.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use num_complex::Complex;

use crate::math::{CScalar, Scalar};

use super::index::{Index, Table, SPIN_DOWN, SPIN_UP};
use super::lattice::{Bond, Point};
use super::operator::{Operator, OperatorKind, OperatorList};
use super::ConfigurationError;

/// Named parameter overrides broadcast to every alterable term.
pub type Parameters = BTreeMap<String, CScalar>;

/// Per-bond amplitude multiplying a term's coupling (decay or range function).
pub type Amplitude = Arc<dyn Fn(&Bond) -> Scalar + Send + Sync>;

type ModulationFn = Arc<dyn Fn(&Parameters) -> Option<Coupling> + Send + Sync>;

/// Scalar or tensor coupling value of a term.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Coupling(Vec<CScalar>);

impl Coupling {
    /// Single-component coupling.
    #[must_use]
    pub fn scalar(value: impl Into<CScalar>) -> Self {
        Self(vec![value.into()])
    }

    /// Multi-component coupling.
    #[must_use]
    pub fn tensor(values: impl IntoIterator<Item = CScalar>) -> Self {
        Self(values.into_iter().collect())
    }

    /// Components.
    #[must_use]
    pub fn components(&self) -> &[CScalar] {
        &self.0
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Norm of the component-wise difference; infinite when shapes differ.
    #[must_use]
    pub fn distance(&self, other: &Self) -> Scalar {
        if self.len() != other.len() {
            return Scalar::INFINITY;
        }
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b).norm_sqr())
            .sum::<Scalar>()
            .sqrt()
    }

    fn component(&self, k: usize) -> CScalar {
        self.0.get(k).copied().unwrap_or_default()
    }
}

impl From<Scalar> for Coupling {
    fn from(value: Scalar) -> Self {
        Self::scalar(value)
    }
}

impl From<CScalar> for Coupling {
    fn from(value: CScalar) -> Self {
        Self::scalar(value)
    }
}

impl fmt::Display for Coupling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.0.iter().enumerate() {
            if k > 0 {
                f.write_str(",")?;
            }
            if v.im == 0.0 {
                write!(f, "{}", v.re)?;
            } else {
                write!(f, "{}{:+}j", v.re, v.im)?;
            }
        }
        Ok(())
    }
}

/// Maps parameter overrides to a new coupling value.
///
/// A modulation declares the parameter names it reads. It returns `None`
/// ("no change") unless at least one of them is present in the overrides.
#[derive(Clone)]
pub struct Modulation {
    reads: Vec<String>,
    func: ModulationFn,
}

impl Modulation {
    /// Creates a modulation reading `reads` and evaluating `func`.
    pub fn new<F>(reads: impl IntoIterator<Item = impl Into<String>>, func: F) -> Self
    where
        F: Fn(&Parameters) -> Option<Coupling> + Send + Sync + 'static,
    {
        Self {
            reads: reads.into_iter().map(Into::into).collect(),
            func: Arc::new(func),
        }
    }

    /// The coupling follows the single parameter `name` directly.
    pub fn scalar(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.clone();
        Self::new([name], move |parameters| parameters.get(&key).copied().map(Coupling::scalar))
    }

    /// Parameter names this modulation reads.
    #[must_use]
    pub fn reads(&self) -> &[String] {
        &self.reads
    }

    /// Evaluates the modulation; `None` means "no change".
    #[must_use]
    pub fn apply(&self, parameters: &Parameters) -> Option<Coupling> {
        if !self.reads.iter().any(|name| parameters.contains_key(name)) {
            return None;
        }
        (self.func)(parameters)
    }
}

impl fmt::Debug for Modulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modulation").field("reads", &self.reads).finish_non_exhaustive()
    }
}

/// Orbital/spin structure of a quadratic term: `factor · c†(o0, s0) c(o1, s1)`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexPack {
    /// Orbitals of the end and start legs.
    pub orbitals: [usize; 2],
    /// Spins of the end and start legs.
    pub spins: [usize; 2],
    /// Multiplicative factor.
    pub factor: CScalar,
}

impl IndexPack {
    /// Creates a pack.
    #[must_use]
    pub fn new(orbitals: [usize; 2], spins: [usize; 2], factor: impl Into<CScalar>) -> Self {
        Self {
            orbitals,
            spins,
            factor: factor.into(),
        }
    }

    /// Singlet pairing `c(↑) c(↓) - c(↓) c(↑)` on orbital `orbital`.
    #[must_use]
    pub fn singlet(orbital: usize) -> Vec<Self> {
        vec![
            Self::new([orbital, orbital], [SPIN_UP, SPIN_DOWN], 1.0),
            Self::new([orbital, orbital], [SPIN_DOWN, SPIN_UP], -1.0),
        ]
    }
}

/// Physical category of a term.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// `t c†(end) c(start)` on bonds of the given neighbour order.
    Hopping {
        /// Neighbour order.
        neighbour: usize,
    },
    /// On-site energy `ε c† c` (chemical potential, crystal field).
    Onsite,
    /// `Δ c(end) c(start)` on bonds of the given neighbour order; needs Nambu space.
    Pairing {
        /// Neighbour order.
        neighbour: usize,
    },
    /// `U n(↑) n(↓)` per orbital, plus `U' n(α) n(β)` between orbitals when a
    /// second component is given.
    Hubbard,
}

/// Groups of term kinds whose constant members share one merged expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermCategory {
    /// Two-leg terms.
    Quadratic,
    /// Four-leg terms.
    Hubbard,
}

impl TermKind {
    /// Category used to merge constant terms.
    #[must_use]
    pub const fn category(self) -> TermCategory {
        match self {
            Self::Hopping { .. } | Self::Onsite | Self::Pairing { .. } => TermCategory::Quadratic,
            Self::Hubbard => TermCategory::Hubbard,
        }
    }

    const fn neighbour(self) -> usize {
        match self {
            Self::Hopping { neighbour } | Self::Pairing { neighbour } => neighbour,
            Self::Onsite | Self::Hubbard => 0,
        }
    }
}

/// One interaction rule of a model.
#[derive(Clone)]
pub struct Term {
    tag: String,
    kind: TermKind,
    value: Coupling,
    packs: Option<Vec<IndexPack>>,
    amplitude: Option<Amplitude>,
    modulate: Option<Modulation>,
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Term")
            .field("tag", &self.tag)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("packs", &self.packs)
            .field("amplitude", &self.amplitude.is_some())
            .field("modulate", &self.modulate)
            .finish()
    }
}

impl Term {
    /// Creates a term of any kind.
    #[must_use]
    pub fn new(tag: impl Into<String>, kind: TermKind, value: impl Into<Coupling>) -> Self {
        Self {
            tag: tag.into(),
            kind,
            value: value.into(),
            packs: None,
            amplitude: None,
            modulate: None,
        }
    }

    /// Hopping term on bonds of neighbour order `neighbour`.
    #[must_use]
    pub fn hopping(tag: impl Into<String>, value: impl Into<Coupling>, neighbour: usize) -> Self {
        Self::new(tag, TermKind::Hopping { neighbour }, value)
    }

    /// On-site energy term.
    #[must_use]
    pub fn onsite(tag: impl Into<String>, value: impl Into<Coupling>) -> Self {
        Self::new(tag, TermKind::Onsite, value)
    }

    /// Pairing term with an explicit pack structure.
    #[must_use]
    pub fn pairing(
        tag: impl Into<String>,
        value: impl Into<Coupling>,
        neighbour: usize,
        packs: Vec<IndexPack>,
    ) -> Self {
        Self::new(tag, TermKind::Pairing { neighbour }, value).with_packs(packs)
    }

    /// Hubbard interaction; `value` is `U` or `[U, U']`.
    #[must_use]
    pub fn hubbard(tag: impl Into<String>, value: impl Into<Coupling>) -> Self {
        Self::new(tag, TermKind::Hubbard, value)
    }

    /// Replaces the default orbital/spin-diagonal structure.
    #[must_use]
    pub fn with_packs(mut self, packs: Vec<IndexPack>) -> Self {
        self.packs = Some(packs);
        self
    }

    /// Multiplies the coupling by `amplitude(bond)` on every bond.
    #[must_use]
    pub fn with_amplitude<F>(mut self, amplitude: F) -> Self
    where
        F: Fn(&Bond) -> Scalar + Send + Sync + 'static,
    {
        self.amplitude = Some(Arc::new(amplitude));
        self
    }

    /// Makes the term alterable through `modulation`.
    #[must_use]
    pub fn with_modulation(mut self, modulation: Modulation) -> Self {
        self.modulate = Some(modulation);
        self
    }

    /// Makes the term alterable through the parameter named after its tag.
    #[must_use]
    pub fn modulated(self) -> Self {
        let modulation = Modulation::scalar(self.tag.clone());
        self.with_modulation(modulation)
    }

    /// Tag, unique within the term's group.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Kind.
    #[must_use]
    pub fn kind(&self) -> TermKind {
        self.kind
    }

    /// Current coupling value.
    #[must_use]
    pub fn value(&self) -> &Coupling {
        &self.value
    }

    pub(crate) fn set_value(&mut self, value: Coupling) {
        self.value = value;
    }

    /// Modulation, present for alterable terms.
    #[must_use]
    pub fn modulation(&self) -> Option<&Modulation> {
        self.modulate.as_ref()
    }

    /// True when the term carries a modulation.
    #[must_use]
    pub fn is_alterable(&self) -> bool {
        self.modulate.is_some()
    }

    /// Checks the coupling shape against the term kind.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let ok = match self.kind {
            TermKind::Hubbard => matches!(self.value.len(), 1 | 2),
            _ => self.value.len() == 1,
        };
        if ok {
            Ok(())
        } else {
            Err(ConfigurationError::CouplingDimension {
                tag: self.tag.clone(),
                found: self.value.len(),
            })
        }
    }

    /// Expands the term on one bond.
    ///
    /// With `half`, only one member of each Hermitian-conjugate pair is
    /// produced and self-conjugate monomials carry half their coefficient, so
    /// that adding the conjugate transpose restores the full term.
    pub fn operators(&self, bond: &Bond, table: &Table, half: bool) -> Result<OperatorList, ConfigurationError> {
        self.validate()?;
        if bond.neighbour != self.kind.neighbour() {
            return Ok(OperatorList::new());
        }
        let amplitude = self.amplitude.as_ref().map_or(1.0, |f| f(bond));
        match self.kind {
            TermKind::Hopping { .. } | TermKind::Onsite => {
                self.quadratic(bond, table, half, amplitude, false)
            }
            TermKind::Pairing { .. } => self.quadratic(bond, table, half, amplitude, true),
            TermKind::Hubbard => self.hubbard_operators(bond, table, half, amplitude),
        }
    }

    fn default_packs(bond: &Bond) -> Vec<IndexPack> {
        let norbital = bond.spoint.norbital.min(bond.epoint.norbital);
        let nspin = bond.spoint.nspin.min(bond.epoint.nspin);
        (0..nspin)
            .flat_map(|s| (0..norbital).map(move |o| IndexPack::new([o, o], [s, s], 1.0)))
            .collect()
    }

    fn quadratic(
        &self,
        bond: &Bond,
        table: &Table,
        half: bool,
        amplitude: Scalar,
        pairing: bool,
    ) -> Result<OperatorList, ConfigurationError> {
        let packs = self.packs.clone().unwrap_or_else(|| Self::default_packs(bond));
        let coupling = self.value.component(0) * amplitude;
        let mut out = OperatorList::new();
        for pack in packs {
            self.check_point(&bond.epoint, pack.orbitals[0], pack.spins[0])?;
            self.check_point(&bond.spoint, pack.orbitals[1], pack.spins[1])?;
            let end = Index::new(bond.epoint.site, pack.orbitals[0], pack.spins[0]);
            let start = Index::new(bond.spoint.site, pack.orbitals[1], pack.spins[1]);
            if pairing && end == start && bond.is_intra_cell() {
                continue;
            }
            let end = if pairing { end } else { end.dagger() };
            let op = self.build(
                OperatorKind::Quadratic,
                coupling * pack.factor,
                &[(end, &bond.epoint), (start, &bond.spoint)],
                table,
            )?;
            push_hermitian(&mut out, op, half);
        }
        Ok(out)
    }

    fn hubbard_operators(
        &self,
        bond: &Bond,
        table: &Table,
        half: bool,
        amplitude: Scalar,
    ) -> Result<OperatorList, ConfigurationError> {
        let point = &bond.spoint;
        if point.nspin != 2 {
            return Err(ConfigurationError::SpinlessHubbard {
                tag: self.tag.clone(),
                site: point.site,
            });
        }
        let scale = amplitude * if half { 0.5 } else { 1.0 };
        let density = |orbital, spin| {
            let index = Index::new(point.site, orbital, spin);
            [(index.dagger(), point), (index, point)]
        };
        let mut out = OperatorList::new();
        let u = self.value.component(0) * scale;
        for orbital in 0..point.norbital {
            let [a, b] = density(orbital, SPIN_UP);
            let [c, d] = density(orbital, SPIN_DOWN);
            out.push(self.build(OperatorKind::Hubbard, u, &[a, b, c, d], table)?);
        }
        if self.value.len() > 1 {
            let up = self.value.component(1) * scale;
            for alpha in 0..point.norbital {
                for beta in (alpha + 1)..point.norbital {
                    for s1 in [SPIN_DOWN, SPIN_UP] {
                        for s2 in [SPIN_DOWN, SPIN_UP] {
                            let [a, b] = density(alpha, s1);
                            let [c, d] = density(beta, s2);
                            out.push(self.build(OperatorKind::Hubbard, up, &[a, b, c, d], table)?);
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    fn check_point(&self, point: &Point, orbital: usize, spin: usize) -> Result<(), ConfigurationError> {
        if orbital < point.norbital && spin < point.nspin {
            Ok(())
        } else {
            Err(ConfigurationError::PackOutOfRange {
                tag: self.tag.clone(),
                site: point.site,
            })
        }
    }

    fn build(
        &self,
        kind: OperatorKind,
        value: CScalar,
        legs: &[(Index, &Point)],
        table: &Table,
    ) -> Result<Operator, ConfigurationError> {
        let mut seqs = Vec::with_capacity(legs.len());
        for (index, _) in legs {
            let seq = table.get(&index.mode()).ok_or_else(|| ConfigurationError::MissingIndex {
                tag: self.tag.clone(),
                index: *index,
            })?;
            seqs.push(seq);
        }
        Ok(Operator {
            kind,
            value,
            indices: legs.iter().map(|(index, _)| *index).collect(),
            rcoords: legs.iter().map(|(_, p)| p.rcoord.clone()).collect(),
            icoords: legs.iter().map(|(_, p)| p.icoord.clone()).collect(),
            seqs,
        })
    }
}

fn push_hermitian(out: &mut OperatorList, op: Operator, half: bool) {
    let conjugate = op.is_self_conjugate();
    match (half, conjugate) {
        (true, true) => out.push(op.scaled(Complex::new(0.5, 0.0))),
        (true, false) | (false, true) => out.push(op),
        (false, false) => {
            let adjoint = op.dagger();
            out.push(op);
            out.push(adjoint);
        }
    }
}
