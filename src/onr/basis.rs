//! Occupation-number bases of symmetry sectors.
//!
//! A state is a bit string: bit `p` is set when the mode with table sequence
//! `p` is occupied. Within a fixed-particle sector the states are ranked by
//! the combinatorial number system,
//!
//! ```text
//! rank(bits) = sum_k C(p_k, k + 1),   p_0 < p_1 < ... the set bits
//! ```
//!
//! which orders them exactly as their numeric values. The spin-resolved basis
//! keeps the spin-down modes in the low bits and composes the two ranks as
//! `rank_up * dim_down + rank_down`.

use crate::constants::{binomial, MAX_MODES};
use crate::model::index::{Index, Nambu, SPIN_DOWN};
use crate::simulation::SimulationError;

/// Symmetry channel a single-particle operator moves the sector along.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// Total particle number.
    Total,
    /// Spin-up particle number.
    Up,
    /// Spin-down particle number.
    Down,
    /// No conserved number: the sector maps onto itself.
    Identity,
}

/// Target-sector key of a single-particle operator: channel and particle delta.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectorKey {
    /// Channel.
    pub channel: Channel,
    /// `+1` for creation, `-1` for annihilation, `0` on the identity channel.
    pub delta: i8,
}

/// Occupation-number basis of one sector.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Basis {
    /// `nparticle` particles in `nstate` modes.
    Particle {
        /// Modes.
        nstate: usize,
        /// Particles.
        nparticle: usize,
    },
    /// Independent particle numbers per spin; down modes in the low bits.
    Spin {
        /// `(nstate, nparticle)` of the spin-up modes.
        up: (usize, usize),
        /// `(nstate, nparticle)` of the spin-down modes.
        down: (usize, usize),
    },
    /// Every occupation of `nstate` modes (grand-canonical or Nambu).
    Grand {
        /// Modes.
        nstate: usize,
    },
}

impl Basis {
    /// Fixed-particle basis.
    pub fn particle(nstate: usize, nparticle: usize) -> Result<Self, SimulationError> {
        check_modes(nstate)?;
        check_particles(nstate, nparticle)?;
        Ok(Self::Particle { nstate, nparticle })
    }

    /// Spin-resolved basis from `(nstate, nparticle)` per spin.
    pub fn spin(up: (usize, usize), down: (usize, usize)) -> Result<Self, SimulationError> {
        check_modes(up.0 + down.0)?;
        check_particles(up.0, up.1)?;
        check_particles(down.0, down.1)?;
        Ok(Self::Spin { up, down })
    }

    /// Grand-canonical basis.
    pub fn grand(nstate: usize) -> Result<Self, SimulationError> {
        check_modes(nstate)?;
        Ok(Self::Grand { nstate })
    }

    /// Total number of modes.
    #[must_use]
    pub fn nstate(&self) -> usize {
        match *self {
            Self::Particle { nstate, .. } | Self::Grand { nstate } => nstate,
            Self::Spin { up, down } => up.0 + down.0,
        }
    }

    /// Number of basis states.
    #[must_use]
    pub fn dimension(&self) -> usize {
        match *self {
            Self::Particle { nstate, nparticle } => binomial(nstate, nparticle),
            Self::Spin { up, down } => binomial(up.0, up.1) * binomial(down.0, down.1),
            Self::Grand { nstate } => 1usize << nstate,
        }
    }

    /// Iterates the states in index order.
    pub fn states(&self) -> Box<dyn Iterator<Item = u64> + Send + '_> {
        match *self {
            Self::Particle { nstate, nparticle } => Box::new(Combinations::new(nstate, nparticle)),
            Self::Spin { up, down } => {
                let shift = down.0;
                Box::new(Combinations::new(up.0, up.1).flat_map(move |u| {
                    Combinations::new(down.0, down.1).map(move |d| (u << shift) | d)
                }))
            }
            Self::Grand { nstate } => Box::new(0..(1u64 << nstate)),
        }
    }

    /// Index of `bits` in this basis, `None` if the state lies outside the sector.
    #[must_use]
    pub fn index_of(&self, bits: u64) -> Option<usize> {
        match *self {
            Self::Particle { nstate, nparticle } => {
                (fits(bits, nstate) && bits.count_ones() as usize == nparticle).then(|| rank(bits))
            }
            Self::Spin { up, down } => {
                if !fits(bits, up.0 + down.0) {
                    return None;
                }
                let low = bits & mask(down.0);
                let high = bits >> down.0;
                if low.count_ones() as usize != down.1 || high.count_ones() as usize != up.1 {
                    return None;
                }
                Some(rank(high) * binomial(down.0, down.1) + rank(low))
            }
            Self::Grand { nstate } => fits(bits, nstate).then_some(bits as usize),
        }
    }

    /// Target-sector key of the single-particle operator `index`.
    #[must_use]
    pub fn sector_key(&self, index: &Index) -> SectorKey {
        let delta = match index.nambu {
            Nambu::Creation => 1,
            Nambu::Annihilation => -1,
        };
        match self {
            Self::Particle { .. } => SectorKey {
                channel: Channel::Total,
                delta,
            },
            Self::Spin { .. } => SectorKey {
                channel: if index.spin == SPIN_DOWN { Channel::Down } else { Channel::Up },
                delta,
            },
            Self::Grand { .. } => SectorKey {
                channel: Channel::Identity,
                delta: 0,
            },
        }
    }

    /// Basis reached by moving along `key`; `None` when that sector is empty.
    #[must_use]
    pub fn shifted(&self, key: SectorKey) -> Option<Self> {
        let shift = |(nstate, nparticle): (usize, usize)| -> Option<(usize, usize)> {
            let n = nparticle.checked_add_signed(isize::from(key.delta))?;
            (n <= nstate).then_some((nstate, n))
        };
        match (*self, key.channel) {
            (Self::Grand { .. }, _) | (_, Channel::Identity) => Some(*self),
            (Self::Particle { nstate, nparticle }, Channel::Total) => {
                shift((nstate, nparticle)).map(|(nstate, nparticle)| Self::Particle { nstate, nparticle })
            }
            (Self::Spin { up, down }, Channel::Up) => shift(up).map(|up| Self::Spin { up, down }),
            (Self::Spin { up, down }, Channel::Down) => shift(down).map(|down| Self::Spin { up, down }),
            _ => None,
        }
    }
}

fn check_modes(nmodes: usize) -> Result<(), SimulationError> {
    if nmodes > MAX_MODES {
        Err(SimulationError::TooManyModes { nmodes })
    } else {
        Ok(())
    }
}

fn check_particles(nstate: usize, nparticle: usize) -> Result<(), SimulationError> {
    if nparticle > nstate {
        Err(SimulationError::InvalidParticleNumber { nstate, nparticle })
    } else {
        Ok(())
    }
}

const fn mask(n: usize) -> u64 {
    (1u64 << n) - 1
}

const fn fits(bits: u64, nstate: usize) -> bool {
    bits >> nstate == 0
}

/// Combinatorial rank of a bit string among strings of equal popcount.
#[must_use]
pub fn rank(mut bits: u64) -> usize {
    let mut k = 0;
    let mut out = 0;
    while bits != 0 {
        let p = bits.trailing_zeros() as usize;
        k += 1;
        out += binomial(p, k);
        bits &= bits - 1;
    }
    out
}

/// All `k`-subsets of `n` bits in increasing numeric order (Gosper's hack).
#[derive(Debug, Clone)]
struct Combinations {
    next: Option<u64>,
    limit: u64,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            next: (k <= n).then(|| mask(k)),
            limit: 1u64 << n,
        }
    }
}

impl Iterator for Combinations {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let current = self.next?;
        if current >= self.limit {
            self.next = None;
            return None;
        }
        self.next = if current == 0 {
            None
        } else {
            let c = current & current.wrapping_neg();
            let r = current + c;
            Some((((r ^ current) >> 2) / c) | r)
        };
        Some(current)
    }
}
