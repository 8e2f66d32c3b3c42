//! Downstream accumulation engine.
//!
//! Computes, for every site in the forest, the total demand and total build
//! cost of its entire downstream subtree:
//!
//! ```text
//! demand(n) = nodal_demand(n) + Σ demand(children of n)
//! cost(n)   = incoming span length (0 for roots) + Σ cost(children of n)
//! ```
//!
//! The traversal is an iterative post-order walk over an explicit stack, so
//! arbitrarily deep trees never hit recursion limits. Values depend only on
//! the static forest structure and site metrics; they are computed once per
//! sequencing run and are independent of any build-order decision.
//!
//! Root subtrees share no state, so with the `parallel` feature (default)
//! they are accumulated concurrently via rayon. The result is a mapping, so
//! ordering across roots is irrelevant.

use crate::model::{MissingMetric, ObjectiveModel};
use hashbrown::HashMap;
use rollout_core::{NodeIndex, PlanError, RootedForest, SiteId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Error type for the accumulation engine.
///
/// Both variants are precondition failures: the engine refuses to run on
/// malformed input and returns no partial results.
#[derive(Debug, Error)]
pub enum AccumulateError {
    /// The traversal detected a violation of the rooted-forest invariant
    /// that slipped past construction (cycle, shared subtree, orphan site).
    #[error("forest structure invariant violated: {0}")]
    Structure(String),

    /// A site lacks a metric field required by the model's demand function.
    #[error(transparent)]
    MissingMetric(#[from] MissingMetric),
}

impl From<AccumulateError> for PlanError {
    fn from(err: AccumulateError) -> Self {
        match err {
            AccumulateError::Structure(msg) => PlanError::Structure(msg),
            AccumulateError::MissingMetric(inner) => PlanError::MissingMetric(inner.to_string()),
        }
    }
}

/// Total downstream demand and build cost of one site's subtree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccumulatedValue {
    /// Site's own demand plus the accumulated demand of all descendants.
    pub demand: f64,
    /// Incoming span length (0 for roots) plus the accumulated cost of all
    /// descendants.
    pub cost: f64,
}

/// Mapping of every site in the forest to its [`AccumulatedValue`].
///
/// Immutable once computed; the sequencer reads it through the dense
/// per-node storage, external consumers through [`get`](Self::get).
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedValues {
    by_site: HashMap<SiteId, AccumulatedValue>,
    dense: Vec<Option<AccumulatedValue>>,
}

impl AccumulatedValues {
    /// Look up a site's accumulated value by id.
    pub fn get(&self, id: SiteId) -> Option<AccumulatedValue> {
        self.by_site.get(&id).copied()
    }

    pub(crate) fn get_index(&self, idx: NodeIndex) -> Option<AccumulatedValue> {
        self.dense.get(idx.index()).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.by_site.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_site.is_empty()
    }

    /// Iterate over `(site, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (SiteId, AccumulatedValue)> + '_ {
        self.by_site.iter().map(|(id, value)| (*id, *value))
    }
}

/// Accumulate downstream demand and cost for every site in the forest.
///
/// Every site, roots included, receives exactly one value. Fails with
/// [`AccumulateError::Structure`] if the traversal revisits a site or leaves
/// one unreached, and with [`AccumulateError::MissingMetric`] if the model's
/// demand function finds a metric field absent.
pub fn accumulate<M: ObjectiveModel + Sync>(
    forest: &RootedForest,
    model: &M,
) -> Result<AccumulatedValues, AccumulateError> {
    let n = forest.site_count();
    debug!(
        sites = n,
        roots = forest.roots().len(),
        "accumulating downstream demand and cost"
    );

    let roots: Vec<NodeIndex> = forest.roots().to_vec();

    #[cfg(feature = "parallel")]
    let per_root: Result<Vec<_>, AccumulateError> = roots
        .par_iter()
        .map(|&root| accumulate_subtree(forest, model, root))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let per_root: Result<Vec<_>, AccumulateError> = roots
        .iter()
        .map(|&root| accumulate_subtree(forest, model, root))
        .collect();

    let mut dense = vec![None; n];
    let mut by_site = HashMap::with_capacity(n);
    let mut filled = 0usize;
    for subtree in per_root? {
        for (idx, value) in subtree {
            if dense[idx.index()].replace(value).is_some() {
                return Err(AccumulateError::Structure(format!(
                    "site {} is reachable from more than one root",
                    forest.site(idx).id
                )));
            }
            by_site.insert(forest.site(idx).id, value);
            filled += 1;
        }
    }
    if filled < n {
        return Err(AccumulateError::Structure(format!(
            "{} sites were never reached during accumulation",
            n - filled
        )));
    }

    Ok(AccumulatedValues { by_site, dense })
}

/// Post-order accumulation of a single root's subtree.
fn accumulate_subtree<M: ObjectiveModel>(
    forest: &RootedForest,
    model: &M,
    root: NodeIndex,
) -> Result<Vec<(NodeIndex, AccumulatedValue)>, AccumulateError> {
    let mut out = Vec::new();
    let mut computed: HashMap<NodeIndex, AccumulatedValue> = HashMap::new();

    // Entries carry an expanded flag: first pop schedules the children,
    // second pop folds their already-computed values (parent after children).
    let mut stack = vec![(root, false)];
    let mut expansions = 0usize;

    while let Some((node, expanded)) = stack.pop() {
        if !expanded {
            expansions += 1;
            if expansions > forest.site_count() {
                return Err(AccumulateError::Structure(format!(
                    "traversal from root {} revisited a site; forest contains a cycle",
                    forest.site(root).id
                )));
            }
            stack.push((node, true));
            for child in forest.children(node) {
                stack.push((child, false));
            }
            continue;
        }

        let mut demand = model.nodal_demand(forest.site(node))?;
        let mut cost = forest
            .parent_span(node)
            .map(|(_, length)| length)
            .unwrap_or(0.0);
        for child in forest.children(node) {
            let child_value = computed.get(&child).ok_or_else(|| {
                AccumulateError::Structure(format!(
                    "child {} of site {} was not accumulated before its parent",
                    forest.site(child).id,
                    forest.site(node).id
                ))
            })?;
            demand += child_value.demand;
            cost += child_value.cost;
        }

        let value = AccumulatedValue { demand, cost };
        computed.insert(node, value);
        out.push((node, value));
    }

    Ok(out)
}
