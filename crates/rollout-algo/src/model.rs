//! Objective models for build-out sequencing.
//!
//! An objective model supplies the two pure functions the engines are
//! polymorphic over: the demand a single site contributes on its own, and
//! the ranking score derived from a subtree's accumulated demand and cost.
//! Variants differ only in these two functions; the engines themselves are
//! generic over any [`ObjectiveModel`] selected at construction time.

use rollout_core::{Site, SiteId};
use thiserror::Error;

/// A site lacks a metric field required by the active objective model.
///
/// Surfaced immediately rather than treated as zero, so that upstream
/// data-preparation bugs are not masked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("site '{name}' (id {id}) is missing metric field '{field}'")]
pub struct MissingMetric {
    pub id: SiteId,
    pub name: String,
    pub field: String,
}

/// Pluggable objective capability: demand definition plus ranking score.
///
/// Both functions are pure; implementations must not carry mutable state.
pub trait ObjectiveModel {
    /// Demand contributed by this site alone, excluding descendants.
    ///
    /// Must be defined for every site including roots (the upstream metric
    /// table fills root demand with 0 when roots contribute none).
    fn nodal_demand(&self, site: &Site) -> Result<f64, MissingMetric>;

    /// Ranking value used to choose the next site to build; higher is better.
    ///
    /// Inputs are the *accumulated* demand and cost of the candidate's
    /// entire downstream subtree, which is what makes the greedy selection
    /// far-sighted.
    fn score(&self, demand: f64, cost: f64) -> f64;
}

/// Maximize-return model: rank candidates by accumulated demand per unit of
/// accumulated build cost.
///
/// The demand metric field is configurable so the same model can prioritize
/// e.g. population instead of energy demand.
///
/// A subtree with zero accumulated cost scores `f64::INFINITY`: a free link
/// should always be built before any costed one. Ties among infinite scores
/// still resolve deterministically by ascending site id in the sequencer.
#[derive(Debug, Clone)]
pub struct MaximizeReturn {
    demand_field: String,
}

impl MaximizeReturn {
    /// Rank by the given metric field.
    pub fn new(demand_field: impl Into<String>) -> Self {
        Self {
            demand_field: demand_field.into(),
        }
    }

    /// The metric field this model reads as nodal demand.
    pub fn demand_field(&self) -> &str {
        &self.demand_field
    }
}

impl Default for MaximizeReturn {
    fn default() -> Self {
        Self::new("demand")
    }
}

impl ObjectiveModel for MaximizeReturn {
    fn nodal_demand(&self, site: &Site) -> Result<f64, MissingMetric> {
        site.metrics
            .get(&self.demand_field)
            .ok_or_else(|| MissingMetric {
                id: site.id,
                name: site.name.clone(),
                field: self.demand_field.clone(),
            })
    }

    fn score(&self, demand: f64, cost: f64) -> f64 {
        if cost <= 0.0 {
            f64::INFINITY
        } else {
            demand / cost
        }
    }
}
