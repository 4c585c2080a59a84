//! Grouping datasets that share a coordinate lattice
//!
//! The [`CollectionBuilder`] folds a stream of `(dataset name, descriptor)`
//! pairs into collections. Every collection keeps one representative
//! descriptor, the [combination](GridDescriptor::combine) of everything placed
//! in it so far, plus the set of member names.
//!
//! The default [`GroupingStrategy::Greedy`] is single-pass and order
//! sensitive: a dataset joins the first collection whose current representative
//! is consistent with it and is never moved afterwards. Because consistency is
//! only approximately transitive, a representative whose origin shifted after a
//! merge may stop matching datasets that would have matched it earlier.
//! [`GroupingStrategy::Strict`] avoids that order dependence by grouping the
//! connected components of the consistency relation over the unmerged
//! descriptors.

use crate::errors::{GridFoldError, Result};
use crate::grid::GridDescriptor;
use log::debug;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeSet;

/// A set of datasets believed to lie on one lattice
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    descriptor: GridDescriptor,
    names: BTreeSet<String>,
}

impl Collection {
    /// Collection holding a single dataset
    pub fn new(name: impl Into<String>, descriptor: GridDescriptor) -> Self {
        Self {
            descriptor,
            names: BTreeSet::from([name.into()]),
        }
    }

    /// Combined descriptor of all members
    #[must_use]
    pub const fn descriptor(&self) -> &GridDescriptor {
        &self.descriptor
    }

    /// Member dataset names, sorted
    #[must_use]
    pub const fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Merge a dataset into this collection, replacing the representative
    fn absorb(&mut self, name: String, descriptor: &GridDescriptor) -> Result<()> {
        self.descriptor = self.descriptor.combine(descriptor)?;
        self.names.insert(name);
        Ok(())
    }
}

/// How datasets are assigned to collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupingStrategy {
    /// First consistent collection wins, no reassignment
    #[default]
    Greedy,
    /// Connected components of the consistency relation, order independent
    Strict,
}

/// Incremental builder of [`Collection`]s
#[derive(Debug, Clone, Default)]
pub struct CollectionBuilder {
    strategy: GroupingStrategy,
    collections: Vec<Collection>,
    pending: Vec<(String, GridDescriptor)>,
}

impl CollectionBuilder {
    /// Builder using the greedy strategy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_strategy(strategy: GroupingStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn strategy(&self) -> GroupingStrategy {
        self.strategy
    }

    /// Add one dataset
    ///
    /// With the greedy strategy the dataset is placed immediately; the strict
    /// strategy defers all placement to [`build`](Self::build).
    ///
    /// # Errors
    ///
    /// [`GridFoldError::IncompatibleOrigin`] when the dataset matches a
    /// collection's lattice but not its index origin. The builder should be
    /// discarded after an error.
    pub fn insert(&mut self, name: impl Into<String>, descriptor: GridDescriptor) -> Result<()> {
        let name = name.into();
        match self.strategy {
            GroupingStrategy::Greedy => self.place(name, descriptor),
            GroupingStrategy::Strict => {
                self.pending.push((name, descriptor));
                Ok(())
            }
        }
    }

    fn place(&mut self, name: String, descriptor: GridDescriptor) -> Result<()> {
        let target = self
            .collections
            .iter()
            .position(|c| c.descriptor.is_consistent_with(&descriptor));

        match target {
            Some(index) => {
                debug!("'{name}' joins collection {index}");
                self.collections[index].absorb(name, &descriptor)
            }
            None => {
                debug!("'{name}' starts collection {}", self.collections.len());
                self.collections.push(Collection::new(name, descriptor));
                Ok(())
            }
        }
    }

    /// Finish grouping and return collections in first-seen order
    ///
    /// # Errors
    ///
    /// With the strict strategy, [`GridFoldError::IncompatibleOrigin`] as for
    /// [`insert`](Self::insert), or [`GridFoldError::PreconditionViolation`]
    /// when a component is connected only through intermediate datasets and
    /// its members cannot be merged pairwise.
    pub fn build(self) -> Result<Vec<Collection>> {
        match self.strategy {
            GroupingStrategy::Greedy => Ok(self.collections),
            GroupingStrategy::Strict => connected_collections(self.pending),
        }
    }
}

/// Group `items` in one call
///
/// # Errors
///
/// See [`CollectionBuilder::insert`] and [`CollectionBuilder::build`].
pub fn group_datasets<I, S>(items: I, strategy: GroupingStrategy) -> Result<Vec<Collection>>
where
    I: IntoIterator<Item = (S, GridDescriptor)>,
    S: Into<String>,
{
    let mut builder = CollectionBuilder::with_strategy(strategy);
    for (name, descriptor) in items {
        builder.insert(name, descriptor)?;
    }
    builder.build()
}

/// Disjoint-set forest over item indices
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Join the sets of `a` and `b`, the smaller root index wins
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[drop] = keep;
        }
    }
}

fn connected_collections(items: Vec<(String, GridDescriptor)>) -> Result<Vec<Collection>> {
    let mut sets = UnionFind::new(items.len());
    for i in 0..items.len() {
        for j in 0..i {
            if items[i].1.is_consistent_with(&items[j].1) {
                sets.union(i, j);
            }
        }
    }

    // roots are the smallest member index, so first-seen order falls out
    let mut collections: Vec<Collection> = Vec::new();
    let mut slot_of_root = vec![usize::MAX; items.len()];
    for (i, (name, descriptor)) in items.into_iter().enumerate() {
        let root = sets.find(i);
        if slot_of_root[root] == usize::MAX {
            debug!("'{name}' starts collection {}", collections.len());
            slot_of_root[root] = collections.len();
            collections.push(Collection::new(name, descriptor));
        } else {
            let slot = slot_of_root[root];
            debug!("'{name}' joins collection {slot}");
            collections[slot].absorb(name, &descriptor).map_err(|e| match e {
                GridFoldError::PreconditionViolation(msg) => GridFoldError::PreconditionViolation(
                    format!("{msg} (connected only through other datasets)"),
                ),
                other => other,
            })?;
        }
    }
    Ok(collections)
}

/// Human-readable listing of collections and their members
#[must_use]
pub fn collections_report(collections: &[Collection]) -> String {
    let mut out = format!("{} grid collection(s)\n", collections.len());
    for (k, collection) in collections.iter().enumerate() {
        out.push_str(&format!("\n[{k}] {}", collection.descriptor));
        out.push_str(&format!("  datasets ({}):\n", collection.len()));
        for name in &collection.names {
            out.push_str(&format!("    - {name}\n"));
        }
    }
    out
}

/// Collections as a JSON array
#[must_use]
pub fn collections_json(collections: &[Collection]) -> JsonValue {
    JsonValue::Array(
        collections
            .iter()
            .map(|c| {
                json!({
                    "name": c.descriptor.name(),
                    "origin": c.descriptor.origin(),
                    "delta": c.descriptor.scale(),
                    "iorigin": c.descriptor.iorigin(),
                    "datasets": c.names.iter().collect::<Vec<_>>(),
                })
            })
            .collect(),
    )
}
