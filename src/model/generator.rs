//! Operator generation with incremental updates of alterable terms.
//!
//! The generator keeps two caches:
//!
//! - the constant cache, the expansion of every constant term over every bond;
//! - one entry per alterable term, the expansion of that term alone at its
//!   current coupling value.
//!
//! [`Generator::update`] re-expands only the alterable terms whose value
//! actually changed, so its cost scales with the affected terms rather than
//! with the whole model.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::constants::RZERO;

use super::index::Table;
use super::lattice::Bond;
use super::operator::{Operator, OperatorList};
use super::term::{Coupling, Parameters, Term, TermCategory, TermKind};
use super::ConfigurationError;

/// Coupling values of the model, split like the terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterGroups {
    /// Values of constant terms.
    pub constant: BTreeMap<String, Coupling>,
    /// Current values of alterable terms.
    pub alter: BTreeMap<String, Coupling>,
}

/// Cached expansion of one alterable term.
#[derive(Debug, Clone)]
pub struct AlterEntry {
    tag: String,
    operators: OperatorList,
    revision: u64,
}

impl AlterEntry {
    /// Tag of the term.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Operators of the term.
    #[must_use]
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Number of times this entry has been regenerated since construction.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Operator lists owned by a [`Generator`].
#[derive(Debug, Clone, Default)]
pub struct OperatorCache {
    constant: OperatorList,
    alter: Vec<AlterEntry>,
}

impl OperatorCache {
    /// Expansion of all constant terms.
    #[must_use]
    pub fn constant(&self) -> &[Operator] {
        &self.constant
    }

    /// Entries of the alterable terms, in term order.
    #[must_use]
    pub fn alter(&self) -> &[AlterEntry] {
        &self.alter
    }

    /// Entry of the alterable term `tag`.
    #[must_use]
    pub fn alter_entry(&self, tag: &str) -> Option<&AlterEntry> {
        self.alter.iter().find(|entry| entry.tag == tag)
    }

    /// Total number of cached operators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constant.len() + self.alter.iter().map(|e| e.operators.len()).sum::<usize>()
    }

    /// True if no operator is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Expands model terms over lattice bonds into operator lists.
#[derive(Debug, Clone)]
pub struct Generator {
    bonds: Vec<Bond>,
    table: Table,
    nambu: bool,
    half: bool,
    constant_terms: BTreeMap<TermCategory, Vec<Term>>,
    alter_terms: Vec<Term>,
    parameters: ParameterGroups,
    cache: OperatorCache,
}

impl Generator {
    /// Partitions `terms` into constant and alterable groups and expands both caches.
    pub fn new(
        bonds: Vec<Bond>,
        table: Table,
        terms: Vec<Term>,
        nambu: bool,
        half: bool,
    ) -> Result<Self, ConfigurationError> {
        let mut constant_terms: BTreeMap<TermCategory, Vec<Term>> = BTreeMap::new();
        let mut alter_terms = Vec::new();
        let mut parameters = ParameterGroups::default();
        let mut constant_tags = HashSet::new();
        let mut alter_tags = HashSet::new();

        for term in terms {
            term.validate()?;
            if matches!(term.kind(), TermKind::Pairing { .. }) && !nambu {
                return Err(ConfigurationError::PairingWithoutNambu {
                    tag: term.tag().to_owned(),
                });
            }
            let (tags, group) = if term.is_alterable() {
                (&mut alter_tags, &mut parameters.alter)
            } else {
                (&mut constant_tags, &mut parameters.constant)
            };
            if !tags.insert(term.tag().to_owned()) {
                return Err(ConfigurationError::DuplicateTag {
                    tag: term.tag().to_owned(),
                });
            }
            group.insert(term.tag().to_owned(), term.value().clone());
            if term.is_alterable() {
                alter_terms.push(term);
            } else {
                constant_terms.entry(term.kind().category()).or_default().push(term);
            }
        }

        let mut generator = Self {
            bonds,
            table,
            nambu,
            half,
            constant_terms,
            alter_terms,
            parameters,
            cache: OperatorCache::default(),
        };
        generator.set_cache()?;
        Ok(generator)
    }

    fn set_cache(&mut self) -> Result<(), ConfigurationError> {
        let mut constant = OperatorList::new();
        let mut produced: BTreeMap<&str, usize> = BTreeMap::new();
        for bond in &self.bonds {
            for terms in self.constant_terms.values() {
                for term in terms {
                    let ops = term.operators(bond, &self.table, self.half)?;
                    *produced.entry(term.tag()).or_default() += ops.len();
                    constant.extend(ops);
                }
            }
        }
        for terms in self.constant_terms.values() {
            for term in terms {
                if produced.get(term.tag()).copied().unwrap_or(0) == 0 {
                    return Err(ConfigurationError::EmptyExpansion {
                        tag: term.tag().to_owned(),
                    });
                }
            }
        }

        let mut alter = Vec::with_capacity(self.alter_terms.len());
        for term in &self.alter_terms {
            let operators = expand(term, &self.bonds, &self.table, self.half)?;
            if operators.is_empty() {
                return Err(ConfigurationError::EmptyExpansion {
                    tag: term.tag().to_owned(),
                });
            }
            alter.push(AlterEntry {
                tag: term.tag().to_owned(),
                operators,
                revision: 0,
            });
        }
        self.cache = OperatorCache { constant, alter };
        Ok(())
    }

    /// Merged operator list: the constant group first, then each alterable term.
    #[must_use]
    pub fn operators(&self) -> OperatorList {
        self.iter_operators().cloned().collect()
    }

    /// Iterates the merged operator list without copying.
    pub fn iter_operators(&self) -> impl Iterator<Item = &Operator> + '_ {
        self.cache
            .constant
            .iter()
            .chain(self.cache.alter.iter().flat_map(|entry| entry.operators.iter()))
    }

    /// Applies parameter overrides to the alterable terms.
    ///
    /// Overrides that no modulation reads are ignored. A term is regenerated
    /// only when its new value differs from the stored one by more than
    /// [`RZERO`]; all other cache entries are left untouched. A modulation
    /// that yields a coupling of the wrong shape is logged and skipped.
    pub fn update(&mut self, parameters: &Parameters) {
        for (k, term) in self.alter_terms.iter_mut().enumerate() {
            let Some(value) = term.modulation().and_then(|m| m.apply(parameters)) else {
                continue;
            };
            if value.distance(term.value()) <= RZERO {
                continue;
            }
            let previous = term.value().clone();
            term.set_value(value.clone());
            let operators = match term.validate().and_then(|()| expand(term, &self.bonds, &self.table, self.half)) {
                Ok(operators) => operators,
                Err(err) => {
                    warn!(tag = term.tag(), %err, "ignoring modulated value");
                    term.set_value(previous);
                    continue;
                }
            };
            self.parameters.alter.insert(term.tag().to_owned(), value);
            let entry = &mut self.cache.alter[k];
            entry.operators = operators;
            entry.revision += 1;
            debug!(tag = %entry.tag, revision = entry.revision, "regenerated alterable term");
        }
    }

    /// Coupling values of the model.
    #[must_use]
    pub fn parameters(&self) -> &ParameterGroups {
        &self.parameters
    }

    /// Cached operator lists.
    #[must_use]
    pub fn cache(&self) -> &OperatorCache {
        &self.cache
    }

    /// Index table used for sequence numbers.
    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Bonds the terms are expanded on.
    #[must_use]
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// True when the Nambu space takes part.
    #[must_use]
    pub fn nambu(&self) -> bool {
        self.nambu
    }

    /// True when only one member of each Hermitian-conjugate pair is generated.
    #[must_use]
    pub fn half(&self) -> bool {
        self.half
    }
}

fn expand(term: &Term, bonds: &[Bond], table: &Table, half: bool) -> Result<OperatorList, ConfigurationError> {
    let mut out = OperatorList::new();
    for bond in bonds {
        out.extend(term.operators(bond, table, half)?);
    }
    Ok(out)
}
