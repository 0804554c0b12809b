//! Lattice points, bonds and neighbour shells.

use nalgebra::DVector;

use crate::constants::RZERO;
use crate::math::{distance, Coord, Scalar};

use super::index::{Index, Nambu, Table};

/// A site of a cluster with its internal degrees of freedom.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Site label, unique within a lattice.
    pub site: usize,
    /// Real-space coordinate.
    pub rcoord: Coord,
    /// Lattice-vector offset of the unit cell containing the point.
    pub icoord: Coord,
    /// Orbitals per site.
    pub norbital: usize,
    /// Spin components per orbital (1 for spinless, 2 for spin-1/2).
    pub nspin: usize,
}

impl Point {
    /// Creates a point in the home cell.
    #[must_use]
    pub fn new(site: usize, rcoord: &[Scalar], norbital: usize, nspin: usize) -> Self {
        Self {
            site,
            rcoord: DVector::from_column_slice(rcoord),
            icoord: DVector::zeros(rcoord.len()),
            norbital,
            nspin,
        }
    }

    /// The same point translated by the lattice vector `shift`.
    #[must_use]
    pub fn translated(&self, shift: &Coord) -> Self {
        Self {
            rcoord: &self.rcoord + shift,
            icoord: &self.icoord + shift,
            ..self.clone()
        }
    }

    /// All annihilation-type indices carried by this point, orbital fastest.
    pub fn indices(&self) -> impl Iterator<Item = Index> + '_ {
        (0..self.nspin).flat_map(move |spin| {
            (0..self.norbital).map(move |orbital| Index::new(self.site, orbital, spin))
        })
    }
}

/// An ordered pair of points (a single point for on-site bonds).
#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    /// Neighbour order: 0 on-site, 1 nearest neighbour, ...
    pub neighbour: usize,
    /// Start point.
    pub spoint: Point,
    /// End point (possibly a translated image).
    pub epoint: Point,
}

impl Bond {
    /// Real-space displacement from start to end.
    #[must_use]
    pub fn rcoord(&self) -> Coord {
        &self.epoint.rcoord - &self.spoint.rcoord
    }

    /// Lattice-vector displacement from start to end.
    #[must_use]
    pub fn icoord(&self) -> Coord {
        &self.epoint.icoord - &self.spoint.icoord
    }

    /// True when both ends lie in the same cell.
    #[must_use]
    pub fn is_intra_cell(&self) -> bool {
        self.icoord().norm() < RZERO
    }
}

/// A finite cluster, optionally tiled by translation vectors.
#[derive(Debug, Clone)]
pub struct Lattice {
    name: String,
    points: Vec<Point>,
    vectors: Vec<Coord>,
    bonds: Vec<Bond>,
    shells: Vec<Scalar>,
}

impl Lattice {
    /// Builds the lattice and all bonds up to neighbour order `nneighbour`.
    ///
    /// Bonds across cell boundaries connect to images translated by a single
    /// combination of `vectors` with coefficients in `{-1, 0, 1}`; each
    /// undirected bond appears once.
    #[must_use]
    pub fn new(name: impl Into<String>, points: Vec<Point>, vectors: Vec<Coord>, nneighbour: usize) -> Self {
        let translations = translations(&vectors, points.first().map_or(0, |p| p.rcoord.len()));
        let mut shells = vec![0.0];
        for a in &points {
            for b in &points {
                for (_, shift) in &translations {
                    let d = distance(&a.rcoord, &(&b.rcoord + shift));
                    if d > RZERO && shells.iter().all(|s| (s - d).abs() > RZERO) {
                        shells.push(d);
                    }
                }
            }
        }
        shells.sort_by(Scalar::total_cmp);
        shells.truncate(nneighbour + 1);

        let mut bonds: Vec<Bond> = points
            .iter()
            .map(|p| Bond {
                neighbour: 0,
                spoint: p.clone(),
                epoint: p.clone(),
            })
            .collect();
        for (i, a) in points.iter().enumerate() {
            for (j, b) in points.iter().enumerate() {
                for (coefficients, shift) in &translations {
                    let keep = match first_nonzero(coefficients) {
                        None => i < j,
                        Some(sign) => sign > 0,
                    };
                    if !keep {
                        continue;
                    }
                    let d = distance(&a.rcoord, &(&b.rcoord + shift));
                    if let Some(neighbour) = shells.iter().skip(1).position(|s| (s - d).abs() < RZERO) {
                        bonds.push(Bond {
                            neighbour: neighbour + 1,
                            spoint: a.clone(),
                            epoint: b.translated(shift),
                        });
                    }
                }
            }
        }

        Self {
            name: name.into(),
            points,
            vectors,
            bonds,
            shells,
        }
    }

    /// Lattice name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Points of the home cell.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Point carrying `site`.
    #[must_use]
    pub fn point(&self, site: usize) -> Option<&Point> {
        self.points.iter().find(|p| p.site == site)
    }

    /// Translation vectors.
    #[must_use]
    pub fn vectors(&self) -> &[Coord] {
        &self.vectors
    }

    /// All bonds, on-site bonds first.
    #[must_use]
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Distances of the neighbour shells, starting with 0 for on-site.
    #[must_use]
    pub fn shells(&self) -> &[Scalar] {
        &self.shells
    }

    /// Index table ordered by nambu, spin, site, orbital (slowest first).
    ///
    /// With `nambu` the annihilation block is followed by the creation block.
    #[must_use]
    pub fn table(&self, nambu: bool) -> Table {
        let components: &[Nambu] = if nambu {
            &[Nambu::Annihilation, Nambu::Creation]
        } else {
            &[Nambu::Annihilation]
        };
        let nspin = self.points.iter().map(|p| p.nspin).max().unwrap_or(0);
        let mut keys = Vec::new();
        for &component in components {
            for spin in 0..nspin {
                for point in &self.points {
                    if spin >= point.nspin {
                        continue;
                    }
                    for orbital in 0..point.norbital {
                        keys.push(Index::new(point.site, orbital, spin).with_nambu(component));
                    }
                }
            }
        }
        Table::new(keys)
    }
}

fn first_nonzero(coefficients: &[i32]) -> Option<i32> {
    coefficients.iter().copied().find(|&c| c != 0)
}

fn translations(vectors: &[Coord], dim: usize) -> Vec<(Vec<i32>, Coord)> {
    let mut out = vec![(vec![0; vectors.len()], DVector::zeros(dim))];
    for (k, vector) in vectors.iter().enumerate() {
        let mut next = Vec::with_capacity(out.len() * 3);
        for (coefficients, shift) in &out {
            for step in [-1, 0, 1] {
                let mut c = coefficients.clone();
                c[k] = step;
                next.push((c, shift + vector * Scalar::from(step)));
            }
        }
        out = next;
    }
    out
}
