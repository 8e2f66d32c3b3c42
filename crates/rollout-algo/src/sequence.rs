//! Far-sighted greedy build-order sequencing.
//!
//! Consumes the per-site accumulated values and emits the order in which
//! sites should be physically connected, never building a span before its
//! upstream connection exists.
//!
//! ## State machine
//!
//! The engine's state is the **frontier**: the set of not-yet-sequenced
//! sites whose parent has already been sequenced (or is a root). Each step
//! selects the frontier site with the highest model score, emits a
//! [`SequenceRecord`] for it, and admits its children to the frontier. The
//! run terminates when the frontier is empty, having emitted exactly one
//! record per non-root site.
//!
//! Because scores are computed from the *entire downstream subtree's*
//! accumulated demand and cost, a cheap site that unlocks a large
//! high-return branch beats a site with better immediate values — the
//! selection looks ahead through the whole branch. Scores are fixed once
//! accumulation is done, so the frontier lives in a plain binary max-heap:
//! sites are pushed when their parent is sequenced and popped in score
//! order, giving linearithmic total work on large networks. Ties break by
//! ascending site id, so repeated runs over identical input are
//! bit-identical.
//!
//! Records are produced lazily through an [`Iterator`]; a run is consumed
//! by iteration and is not restartable.

use crate::accumulate::{AccumulatedValue, AccumulatedValues};
use crate::model::ObjectiveModel;
use rollout_core::{NodeIndex, PlanError, RootedForest, SiteId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use thiserror::Error;
use tracing::{debug, trace};

/// Error type for the sequencing engine.
#[derive(Debug, Error)]
pub enum SequenceError {
    /// A frontier site has no accumulated value; the value mapping does not
    /// cover the forest it was computed from.
    #[error("frontier site {0} has no accumulated value")]
    MissingValue(SiteId),

    /// The frontier failed to shrink after a selection. Unreachable on a
    /// valid forest; indicates an engine bug rather than bad input, and the
    /// run aborts instead of looping.
    #[error("sequencing frontier failed to make progress: {0}")]
    ProgressInvariant(String),
}

impl From<SequenceError> for PlanError {
    fn from(err: SequenceError) -> Self {
        match err {
            SequenceError::MissingValue(_) => PlanError::Structure(err.to_string()),
            SequenceError::ProgressInvariant(msg) => PlanError::Progress(msg),
        }
    }
}

/// One emitted build step.
///
/// The first four fields are the stable machine-readable surface consumed
/// by reporting/export tooling; their semantics do not change even if the
/// internal scoring does. The remaining fields carry the decision inputs
/// for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRecord {
    /// 1-based position in the global build order.
    pub order_index: usize,
    /// The site connected by this step.
    pub site: SiteId,
    /// The site's parent (already sequenced, or a root).
    pub upstream: SiteId,
    /// The root of the tree containing this site.
    pub root: SiteId,
    /// Accumulated downstream demand at selection time.
    pub demand: f64,
    /// Accumulated downstream build cost at selection time.
    pub cost: f64,
    /// The model score the selection was made on.
    pub score: f64,
}

/// Frontier entry ordered by score, then by ascending site id.
#[derive(Debug, Clone, Copy)]
struct FrontierEntry {
    score: f64,
    site: SiteId,
    node: NodeIndex,
    value: AccumulatedValue,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // total_cmp gives NaN a fixed position, keeping runs deterministic
        // even on degenerate scores. Reversed id comparison makes the
        // smaller site id win among equal scores in the max-heap.
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.site.cmp(&self.site))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Start a far-sighted sequencing run.
///
/// The initial frontier is the direct children of every root. Fails
/// immediately if a frontier site is missing from `values`; the same check
/// applies to every site admitted later, surfaced as an `Err` item.
pub fn sequence<'a, M: ObjectiveModel>(
    forest: &'a RootedForest,
    values: &'a AccumulatedValues,
    model: &'a M,
) -> Result<BuildSequence<'a, M>, SequenceError> {
    let remaining = forest.site_count() - forest.roots().len();
    debug!(candidates = remaining, "starting far-sighted sequencing run");

    let mut run = BuildSequence {
        forest,
        values,
        model,
        frontier: BinaryHeap::new(),
        sequenced: vec![false; forest.site_count()],
        remaining,
        emitted: 0,
        failed: false,
    };
    for &root in forest.roots() {
        for child in forest.children(root) {
            run.admit(child)?;
        }
    }
    Ok(run)
}

/// Convenience wrapper collecting a full run into a vector.
pub fn sequence_to_vec<M: ObjectiveModel>(
    forest: &RootedForest,
    values: &AccumulatedValues,
    model: &M,
) -> Result<Vec<SequenceRecord>, SequenceError> {
    sequence(forest, values, model)?.collect()
}

/// A lazy sequencing run. Yields one record per non-root site.
pub struct BuildSequence<'a, M> {
    forest: &'a RootedForest,
    values: &'a AccumulatedValues,
    model: &'a M,
    frontier: BinaryHeap<FrontierEntry>,
    sequenced: Vec<bool>,
    remaining: usize,
    emitted: usize,
    failed: bool,
}

impl<M: ObjectiveModel> BuildSequence<'_, M> {
    /// Number of records already emitted.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn admit(&mut self, node: NodeIndex) -> Result<(), SequenceError> {
        let site = self.forest.site(node).id;
        let value = self
            .values
            .get_index(node)
            .ok_or(SequenceError::MissingValue(site))?;
        let score = self.model.score(value.demand, value.cost);
        self.frontier.push(FrontierEntry {
            score,
            site,
            node,
            value,
        });
        Ok(())
    }

    fn fail(&mut self, err: SequenceError) -> Option<Result<SequenceRecord, SequenceError>> {
        self.failed = true;
        Some(Err(err))
    }
}

impl<M: ObjectiveModel> Iterator for BuildSequence<'_, M> {
    type Item = Result<SequenceRecord, SequenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let entry = match self.frontier.pop() {
            Some(entry) => entry,
            None => {
                if self.remaining > 0 {
                    let remaining = self.remaining;
                    return self.fail(SequenceError::ProgressInvariant(format!(
                        "frontier drained with {remaining} sites unsequenced"
                    )));
                }
                return None;
            }
        };

        if self.sequenced[entry.node.index()] {
            let site = entry.site;
            return self.fail(SequenceError::ProgressInvariant(format!(
                "site {site} selected twice"
            )));
        }
        self.sequenced[entry.node.index()] = true;
        self.remaining -= 1;
        self.emitted += 1;

        for child in self.forest.children(entry.node) {
            if let Err(err) = self.admit(child) {
                return self.fail(err);
            }
        }

        let upstream = match self.forest.parent_span(entry.node) {
            Some((parent, _)) => self.forest.site(parent).id,
            None => {
                let site = entry.site;
                return self.fail(SequenceError::ProgressInvariant(format!(
                    "frontier contained root site {site}"
                )));
            }
        };

        let record = SequenceRecord {
            order_index: self.emitted,
            site: entry.site,
            upstream,
            root: self.forest.site(self.forest.root_of(entry.node)).id,
            demand: entry.value.demand,
            cost: entry.value.cost,
            score: entry.score,
        };
        trace!(
            order = record.order_index,
            site = %record.site,
            score = record.score,
            "sequenced site"
        );
        Some(Ok(record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (self.remaining, Some(self.remaining))
        }
    }
}
