//! Numerical thresholds and default run parameters.
//!
//! ## Thresholds
//!
//! All comparisons of floating-point model data go through these constants
//! rather than exact equality. Coupling values, coordinates and Krylov
//! residuals are real or complex `f64` quantities accumulated through long
//! sums, so equality is always "within a fixed absolute tolerance".

/// Absolute tolerance for comparing coupling values and coordinates.
/// A modulated coupling whose change has a norm below this is treated as unchanged.
pub const RZERO: f64 = 1.0e-10;
/// Residual norm below which a Lanczos recursion is declared broken down (`cut`).
pub const LANCZOS_ZERO: f64 = 1.0e-10;
/// Residual bound `b_m |s_m|` at which the lowest Ritz pair counts as converged.
pub const EIGEN_TOLERANCE: f64 = 1.0e-12;
/// Default number of Lanczos steps recorded per Green's-function pair.
pub const DEFAULT_NSTEP: usize = 200;
/// Largest number of single-particle modes representable in an occupation bit string.
pub const MAX_MODES: usize = 63;

/// Binomial coefficient `C(n, k)`, zero when `k > n`.
///
/// Products are formed in `u128`, exact for every `n <= MAX_MODES`; a result
/// beyond `usize` saturates.
#[inline]
#[must_use]
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let exact = (0..k).try_fold(1u128, |acc, i| Some(acc.checked_mul((n - i) as u128)? / (i as u128 + 1)));
    exact.and_then(|value| usize::try_from(value).ok()).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binomial_matches_pascal_triangle() {
        assert_eq!(binomial(4, 2), 6);
        assert_eq!(binomial(10, 0), 1);
        assert_eq!(binomial(10, 10), 1);
        assert_eq!(binomial(3, 5), 0);
        assert_eq!(binomial(20, 10), 184_756);
    }

    #[test]
    fn binomial_is_exact_at_the_mode_limit() {
        assert_eq!(binomial(MAX_MODES, 31), 916_312_070_471_295_267);
        assert_eq!(binomial(62, 31), 465_428_353_255_261_088);
        assert_eq!(binomial(MAX_MODES, MAX_MODES), 1);
    }
}
