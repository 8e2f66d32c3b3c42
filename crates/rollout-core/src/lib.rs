//! # rollout-core: Candidate Network Modeling Core
//!
//! Provides the data structures for build-out planning over candidate
//! electrification networks.
//!
//! ## Design Philosophy
//!
//! A candidate network is modeled as a **directed rooted forest** where:
//! - **Nodes**: Sites (demand points awaiting connection) and roots
//!   (already-built infrastructure such as an existing grid connection)
//! - **Edges**: Spans (candidate links directed away from the roots, weighted
//!   by build length/cost)
//!
//! This graph-based approach enables:
//! - Fast topological queries (parent, children, owning root)
//! - Iterative subtree traversal without recursion-depth limits
//! - Type-safe site access with newtype IDs
//!
//! ## Quick Start
//!
//! ```rust
//! use rollout_core::{ForestBuilder, Site, SiteId};
//!
//! let forest = ForestBuilder::new()
//!     .site(Site::new(SiteId::new(0), "substation"))
//!     .site(Site::new(SiteId::new(1), "village-a").with_metric("demand", 100.0))
//!     .site(Site::new(SiteId::new(2), "village-b").with_metric("demand", 50.0))
//!     .span(SiteId::new(0), SiteId::new(1), 1.2)
//!     .span(SiteId::new(1), SiteId::new(2), 0.8)
//!     .root(SiteId::new(0))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(forest.stats().num_sites, 3);
//! ```
//!
//! ## Core Data Structures
//!
//! - [`RootedForest`] - The validated forest (petgraph `DiGraph<Site, Span>`)
//! - [`ForestBuilder`] - Validating constructor for [`RootedForest`]
//! - [`Site`] - A demand point with a [`SiteMetrics`] attribute table
//! - [`Span`] - A candidate link with a non-negative build length
//! - [`SiteId`] - Type-safe site identifier
//!
//! ## Modules
//!
//! - [`error`] - Unified error type for uniform handling at API boundaries
//! - [`forest`] - Forest construction and validation
//!
//! ## Integration with rollout-algo
//!
//! The rollout-algo crate consumes [`RootedForest`] read-only: it aggregates
//! downstream demand and cost per site and emits the far-sighted build
//! sequence. Ingest of geographic data and export of results are the
//! responsibility of external collaborators.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod error;
pub mod forest;

pub use error::{PlanError, PlanResult};
pub use forest::{ForestBuilder, ForestError, ForestStats, RootedForest};
pub use petgraph::graph::NodeIndex;

/// Type-safe identifier for a site (newtype over `usize`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(usize);

impl SiteId {
    #[inline]
    pub fn new(value: usize) -> Self {
        SiteId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SiteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-site numeric attribute table.
///
/// Metrics are filled upstream by the data-preparation collaborator; a field
/// required by the active objective model but absent here is surfaced as a
/// hard error by the accumulation engine, never silently treated as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteMetrics {
    fields: HashMap<String, f64>,
}

impl SiteMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a metric field by name.
    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }

    /// Set a metric field, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: f64) {
        self.fields.insert(field.into(), value);
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, field: impl Into<String>, value: f64) -> Self {
        self.set(field, value);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(field, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// A demand point in the candidate network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub metrics: SiteMetrics,
}

impl Site {
    /// Create a site with an empty metric table.
    pub fn new(id: SiteId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            metrics: SiteMetrics::new(),
        }
    }

    /// Attach a metric field.
    pub fn with_metric(mut self, field: impl Into<String>, value: f64) -> Self {
        self.metrics.set(field, value);
        self
    }
}

/// A candidate link directed from an upstream site to a downstream site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Build length (distance/cost to construct this link); non-negative.
    pub length: f64,
}

impl Span {
    pub fn new(length: f64) -> Self {
        Self { length }
    }
}
