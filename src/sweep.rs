//! Frequency sweep utilities and spectral post-processing helpers.

use num_complex::Complex;

use crate::math::{CMatrix, CScalar, Scalar};

/// Generates `n` linearly spaced samples in [start, stop].
#[must_use]
pub fn linspace(start: Scalar, stop: Scalar, n: usize) -> Vec<Scalar> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as Scalar - 1.0);
            (0..n).map(|i| start + step * i as Scalar).collect()
        }
    }
}

/// Complex frequencies `e + shift + i eta` for each real energy `e`.
#[must_use]
pub fn broadened(energies: &[Scalar], shift: Scalar, eta: Scalar) -> Vec<CScalar> {
    energies.iter().map(|&e| Complex::new(e + shift, eta)).collect()
}

/// Applies `f` to each frequency and collects results.
#[must_use]
pub fn sweep_map<I, F, T>(omegas: I, f: F) -> Vec<T>
where
    I: IntoIterator<Item = CScalar>,
    F: FnMut(CScalar) -> T,
{
    omegas.into_iter().map(f).collect()
}

/// Diagnostics of one frequency point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveReport {
    /// True if every continued fraction at this point was solved.
    pub success: bool,
    /// Additional human-readable notes.
    pub notes: Vec<String>,
}

/// Green's function at one complex frequency.
#[derive(Debug, Clone)]
pub struct GfPoint {
    /// Complex frequency.
    pub omega: CScalar,
    /// `G(omega)`; NaN-filled when the point failed.
    pub gf: CMatrix,
    /// Diagnostics gathered during the solve.
    pub report: SolveReport,
}

impl GfPoint {
    /// Spectral trace `-2 Im Tr G(omega)`.
    #[must_use]
    pub fn spectral_weight(&self) -> Scalar {
        -2.0 * self.gf.trace().im
    }
}

/// Density of states `(E, -2 Im Tr G)` from a mesh evaluated at `E + shift + i eta`.
#[must_use]
pub fn density_of_states(energies: &[Scalar], points: &[GfPoint]) -> Vec<(Scalar, Scalar)> {
    energies
        .iter()
        .zip(points)
        .map(|(&e, p)| (e, p.spectral_weight()))
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn linspace_includes_endpoints() {
        let v = linspace(-2.0, 2.0, 5);
        assert_eq!(v.len(), 5);
        assert_relative_eq!(v[0], -2.0);
        assert_relative_eq!(v[4], 2.0);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn broadened_shifts_and_adds_imaginary_part() {
        let w = broadened(&[0.0, 1.0], 0.5, 0.05);
        assert_eq!(w[1], Complex::new(1.5, 0.05));
    }

    #[test]
    fn spectral_weight_of_a_lorentzian() {
        let eta = 0.1;
        let omega = Complex::new(0.0, eta);
        let gf = CMatrix::from_element(1, 1, Complex::new(1.0, 0.0) / omega);
        let point = GfPoint {
            omega,
            gf,
            report: SolveReport {
                success: true,
                ..Default::default()
            },
        };
        assert_relative_eq!(point.spectral_weight(), 2.0 / eta, epsilon = 1.0e-12);
        let dos = density_of_states(&[0.0], &[point]);
        assert_relative_eq!(dos[0].1, 20.0, epsilon = 1.0e-12);
    }
}
