#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(clippy::all, clippy::cargo, clippy::nursery, missing_docs)]
#![doc = include_str!("../README.md")]

/// Numerical thresholds and default run parameters.
pub mod constants;
/// Shared mathematical utilities (aliases, sparse kernels).
pub mod math;
/// Lattices, terms and the operator generator.
pub mod model;
/// Lanczos recursion and tridiagonal kernels.
pub mod krylov;
/// Occupation-number bases and the Green's-function engine.
pub mod onr;
/// Persisted engine data.
pub mod io;
/// Frequency sweep builders and post-processing helpers.
pub mod sweep;
/// Run configuration.
pub mod simulation;
/// Error types shared between modules.
pub mod errors;

/// Common exports for downstream crates.
pub mod prelude;
