//! I/O helpers for persisting engine results.

pub mod coeff;

pub use coeff::CoefficientStore;
