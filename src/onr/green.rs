//! Continued-fraction single-particle Green's functions.
//!
//! For every ordered operator pair `(i, j)` two Lanczos recursions are run
//! from the ground state `|psi0>`:
//!
//! - electron branch: seed `c_j† |psi0>`, projected on `c_i† |psi0>`;
//! - hole branch: seed `c_i |psi0>`, projected on `c_j |psi0>`.
//!
//! Each records `c_k = <bra | q_k> |seed|`, `a_k` and `b_k`. At a frequency
//! `omega` the branch contributes `c · x` with `x` solving the tridiagonal
//! system `(omega ∓ (T - E0)) x = e_0`.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::debug;

use crate::krylov::{solve_tridiagonal, Lanczos, SolverError};
use crate::math::{complex_dot, CMatrix, CScalar, CVector, Scalar, CONE, CZERO};
use crate::model::operator::Operator;

use super::basis::SectorKey;
use super::representation::apply_to_vector;
use super::sector::Sector;

/// Branch of a Green's-function pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Branch {
    /// Particle added to the ground state.
    Electron,
    /// Particle removed from the ground state.
    Hole,
}

impl Branch {
    /// Both branches in storage order.
    pub const ALL: [Self; 2] = [Self::Electron, Self::Hole];

    const fn slot(self) -> usize {
        match self {
            Self::Electron => 0,
            Self::Hole => 1,
        }
    }

    /// `(-1)^h`.
    const fn sign(self) -> Scalar {
        match self {
            Self::Electron => 1.0,
            Self::Hole => -1.0,
        }
    }
}

/// Recorded `(c, a, b)` triples of every pair and branch, plus the ground energy.
///
/// Storage is one flat complex array in `(i, j, h, {c, a, b}, step)` order.
#[derive(Debug, Clone, PartialEq)]
pub struct GreenCoefficients {
    nopt: usize,
    nstep: usize,
    gse: Scalar,
    data: Vec<CScalar>,
}

impl GreenCoefficients {
    /// Number of complex entries for `nopt` operators and `nstep` steps.
    #[must_use]
    pub const fn expected_len(nopt: usize, nstep: usize) -> usize {
        nopt * nopt * 2 * 3 * nstep
    }

    /// All-zero coefficients.
    #[must_use]
    pub fn zeros(nopt: usize, nstep: usize, gse: Scalar) -> Self {
        Self {
            nopt,
            nstep,
            gse,
            data: vec![CZERO; Self::expected_len(nopt, nstep)],
        }
    }

    /// Wraps a flat array; `None` on a length mismatch.
    #[must_use]
    pub fn from_raw(nopt: usize, nstep: usize, gse: Scalar, data: Vec<CScalar>) -> Option<Self> {
        (data.len() == Self::expected_len(nopt, nstep)).then_some(Self { nopt, nstep, gse, data })
    }

    /// Ground-state energy.
    #[must_use]
    pub fn gse(&self) -> Scalar {
        self.gse
    }

    /// Number of single-particle operators.
    #[must_use]
    pub fn nopt(&self) -> usize {
        self.nopt
    }

    /// Recorded steps per recursion.
    #[must_use]
    pub fn nstep(&self) -> usize {
        self.nstep
    }

    /// Flat storage.
    #[must_use]
    pub fn as_slice(&self) -> &[CScalar] {
        &self.data
    }

    fn offset(&self, i: usize, j: usize, branch: Branch, slot: usize) -> usize {
        ((((i * self.nopt) + j) * 2 + branch.slot()) * 3 + slot) * self.nstep
    }

    fn row(&self, i: usize, j: usize, branch: Branch, slot: usize) -> &[CScalar] {
        let start = self.offset(i, j, branch, slot);
        &self.data[start..start + self.nstep]
    }

    /// Overlaps `c_k` of pair `(i, j)`.
    #[must_use]
    pub fn c(&self, i: usize, j: usize, branch: Branch) -> &[CScalar] {
        self.row(i, j, branch, 0)
    }

    /// Lanczos diagonal `a_k` of pair `(i, j)`.
    #[must_use]
    pub fn a(&self, i: usize, j: usize, branch: Branch) -> &[CScalar] {
        self.row(i, j, branch, 1)
    }

    /// Lanczos off-diagonal `b_k` of pair `(i, j)`.
    #[must_use]
    pub fn b(&self, i: usize, j: usize, branch: Branch) -> &[CScalar] {
        self.row(i, j, branch, 2)
    }

    fn store(&mut self, record: PairRecord) {
        let PairRecord { i, j, branch, c, a, b } = record;
        for (slot, values) in [(0, c), (1, a), (2, b)] {
            let start = self.offset(i, j, branch, slot);
            let n = values.len().min(self.nstep);
            self.data[start..start + n].copy_from_slice(&values[..n]);
        }
    }

    /// `G(omega)`, summing both branches of every pair.
    pub fn evaluate(&self, omega: CScalar) -> Result<CMatrix, SolverError> {
        let mut gf = CMatrix::zeros(self.nopt, self.nopt);
        for i in 0..self.nopt {
            for j in 0..self.nopt {
                for branch in Branch::ALL {
                    gf[(i, j)] += self.branch_value(i, j, branch, omega)?;
                }
            }
        }
        Ok(gf)
    }

    fn branch_value(&self, i: usize, j: usize, branch: Branch, omega: CScalar) -> Result<CScalar, SolverError> {
        let c = self.c(i, j, branch);
        if c.iter().all(|v| *v == CZERO) {
            return Ok(CZERO);
        }
        let a = self.a(i, j, branch);
        let b = self.b(i, j, branch);
        // rows past the first vanishing b_k are decoupled from e_0
        let m = b.iter().position(|v| *v == CZERO).map_or(self.nstep, |k| k + 1);
        let sign = branch.sign();
        let diag: Vec<CScalar> = a[..m].iter().map(|ak| omega - (ak - self.gse) * sign).collect();
        let off: Vec<CScalar> = b[..m - 1].iter().map(|bk| -bk * sign).collect();
        let mut rhs = vec![CZERO; m];
        rhs[0] = CONE;
        let x = solve_tridiagonal(&off, &diag, &off, &rhs)?;
        Ok(c[..m].iter().zip(x.iter()).map(|(ck, xk)| ck * xk).sum())
    }
}

/// One Green's-function pair: the seed operator and the projection operator.
struct Pair {
    i: usize,
    j: usize,
    branch: Branch,
    seed: Operator,
    bra: Operator,
}

struct PairRecord {
    i: usize,
    j: usize,
    branch: Branch,
    c: Vec<CScalar>,
    a: Vec<CScalar>,
    b: Vec<CScalar>,
}

/// Records the coefficients of every pair from the ground state of `ground`.
///
/// `operators` is the half Hamiltonian used to assemble the shifted sectors,
/// `single` the single-particle operators in table order. Pairs are grouped
/// by target sector; each group assembles its matrix once and runs its
/// recursions in parallel.
pub fn compute(
    ground: &Sector,
    psi0: &CVector,
    gse: Scalar,
    operators: &[Operator],
    single: &[Operator],
    nstep: usize,
) -> Result<GreenCoefficients, SolverError> {
    let nopt = single.len();
    let mut out = GreenCoefficients::zeros(nopt, nstep, gse);
    let basis = ground.basis();

    let mut groups: BTreeMap<(Branch, SectorKey), Vec<Pair>> = BTreeMap::new();
    for branch in Branch::ALL {
        for (j, opj) in single.iter().enumerate() {
            for (i, opi) in single.iter().enumerate() {
                let (seed, bra) = match branch {
                    Branch::Electron => (opj.dagger(), opi.dagger()),
                    Branch::Hole => (opi.clone(), opj.clone()),
                };
                let key = basis.sector_key(&seed.indices[0]);
                if basis.sector_key(&bra.indices[0]) != key {
                    continue;
                }
                groups.entry((branch, key)).or_default().push(Pair { i, j, branch, seed, bra });
            }
        }
    }

    for ((branch, key), pairs) in groups {
        let Some(target) = ground.transition(key, operators) else {
            debug!(?branch, ?key, "target sector is empty");
            continue;
        };
        debug!(?branch, ?key, pairs = pairs.len(), dimension = target.dimension(), "sector group");
        let records = pairs
            .par_iter()
            .map(|pair| record_pair(pair, ground, &target, psi0, nstep))
            .collect::<Result<Vec<_>, _>>()?;
        for record in records {
            out.store(record);
        }
    }
    Ok(out)
}

fn record_pair(pair: &Pair, ground: &Sector, target: &Sector, psi0: &CVector, nstep: usize) -> Result<PairRecord, SolverError> {
    let seed = apply_to_vector(&pair.seed, psi0, ground.basis(), target.basis());
    let bra = apply_to_vector(&pair.bra, psi0, ground.basis(), target.basis());
    let mut lanczos = Lanczos::new(target.matrix(), seed)?;
    let norm = lanczos.norm();
    let mut c = Vec::with_capacity(nstep);
    for _ in 0..nstep {
        if lanczos.is_cut() {
            break;
        }
        c.push(complex_dot(&bra, lanczos.vector()) * norm);
        lanczos.iter();
    }
    let real = |values: &[Scalar]| values.iter().map(|&v| CScalar::new(v, 0.0)).collect::<Vec<_>>();
    Ok(PairRecord {
        i: pair.i,
        j: pair.j,
        branch: pair.branch,
        c,
        a: real(lanczos.a()),
        b: real(lanczos.b()),
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use num_complex::Complex;

    use super::*;

    fn single_pole(weight: Scalar, energy: Scalar, gse: Scalar, branch: Branch) -> GreenCoefficients {
        let mut coeff = GreenCoefficients::zeros(1, 3, gse);
        coeff.store(PairRecord {
            i: 0,
            j: 0,
            branch,
            c: vec![Complex::new(weight, 0.0)],
            a: vec![Complex::new(energy, 0.0)],
            b: vec![CZERO],
        });
        coeff
    }

    #[test]
    fn electron_pole_sits_at_excitation_energy() {
        let coeff = single_pole(0.5, 0.0, -1.0, Branch::Electron);
        let omega = Complex::new(0.3, 0.01);
        let g = coeff.evaluate(omega).expect("regular");
        let expected = Complex::new(0.5, 0.0) / (omega - 1.0);
        assert_relative_eq!((g[(0, 0)] - expected).norm(), 0.0, epsilon = 1.0e-14);
    }

    #[test]
    fn hole_pole_is_mirrored() {
        let coeff = single_pole(0.5, 0.0, -1.0, Branch::Hole);
        let omega = Complex::new(0.3, 0.01);
        let g = coeff.evaluate(omega).expect("regular");
        let expected = Complex::new(0.5, 0.0) / (omega + 1.0);
        assert_relative_eq!((g[(0, 0)] - expected).norm(), 0.0, epsilon = 1.0e-14);
    }

    #[test]
    fn two_level_continued_fraction() {
        let mut coeff = GreenCoefficients::zeros(1, 4, 0.0);
        coeff.store(PairRecord {
            i: 0,
            j: 0,
            branch: Branch::Electron,
            c: vec![CONE, CZERO],
            a: vec![Complex::new(1.0, 0.0), Complex::new(2.0, 0.0)],
            b: vec![Complex::new(0.5, 0.0), CZERO],
        });
        let z = Complex::new(0.7, 0.05);
        let expected = CONE / (z - 1.0 - 0.25 / (z - 2.0));
        let g = coeff.evaluate(z).expect("regular");
        assert_relative_eq!((g[(0, 0)] - expected).norm(), 0.0, epsilon = 1.0e-12);
    }

    #[test]
    fn pole_on_the_real_axis_is_singular() {
        let coeff = single_pole(1.0, 0.0, 0.0, Branch::Electron);
        assert!(matches!(coeff.evaluate(CZERO), Err(SolverError::SingularMatrix { .. })));
    }

    #[test]
    fn raw_length_is_checked() {
        assert!(GreenCoefficients::from_raw(2, 3, 0.0, vec![CZERO; 72]).is_some());
        assert!(GreenCoefficients::from_raw(2, 3, 0.0, vec![CZERO; 71]).is_none());
    }
}
