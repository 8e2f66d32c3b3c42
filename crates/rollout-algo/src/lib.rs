//! # rollout-algo: Build-Out Sequencing for Candidate Networks
//!
//! This crate provides the planning algorithms for candidate electrification
//! networks: given a validated rooted forest of demand sites
//! ([`rollout_core::RootedForest`]), it determines the economically optimal
//! order in which to physically connect them, spending capital on the
//! highest-return segments first while never building a span before its
//! upstream connection exists.
//!
//! ## Pipeline
//!
//! ```text
//! RootedForest ──▶ accumulate ──▶ AccumulatedValues ──▶ sequence ──▶ SequenceRecords
//!                     ▲                                    ▲
//!                     └──────── ObjectiveModel ────────────┘
//! ```
//!
//! 1. **Accumulation** ([`accumulate`]): an iterative post-order pass
//!    computes, for every site, the total demand and build cost of its
//!    entire downstream subtree. Independent root subtrees are processed in
//!    parallel with the `parallel` feature (default).
//! 2. **Sequencing** ([`sequence`]): a frontier-based greedy loop repeatedly
//!    selects the buildable site whose subtree has the best model score,
//!    yielding a lazy, deterministic, connectivity-respecting build order.
//!
//! ## Objective models
//!
//! Both engines are generic over [`ObjectiveModel`], which supplies the two
//! pure functions the variants differ in:
//!
//! | Model | `nodal_demand` | `score` |
//! |-------|----------------|---------|
//! | [`MaximizeReturn`] | configurable metric field | accumulated demand / accumulated cost |
//!
//! ## Example
//!
//! ```rust
//! use rollout_algo::{accumulate, sequence_to_vec, MaximizeReturn};
//! use rollout_core::{ForestBuilder, Site, SiteId};
//!
//! let forest = ForestBuilder::new()
//!     .site(Site::new(SiteId::new(0), "grid").with_metric("demand", 0.0))
//!     .site(Site::new(SiteId::new(1), "village").with_metric("demand", 120.0))
//!     .site(Site::new(SiteId::new(2), "hamlet").with_metric("demand", 15.0))
//!     .span(SiteId::new(0), SiteId::new(1), 2.0)
//!     .span(SiteId::new(1), SiteId::new(2), 1.5)
//!     .root(SiteId::new(0))
//!     .build()?;
//!
//! let model = MaximizeReturn::default();
//! let values = accumulate(&forest, &model)?;
//! let records = sequence_to_vec(&forest, &values, &model)?;
//!
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[0].site, SiteId::new(1));
//! # Ok::<(), rollout_core::PlanError>(())
//! ```
//!
//! The core performs no I/O: ingest of geographic network data and export of
//! the ordered records are the responsibility of external collaborators,
//! which receive [`SequenceRecord`]s as serde-serializable values.

pub mod accumulate;
pub mod model;
pub mod sequence;

pub use accumulate::{accumulate, AccumulateError, AccumulatedValue, AccumulatedValues};
pub use model::{MaximizeReturn, MissingMetric, ObjectiveModel};
pub use sequence::{sequence, sequence_to_vec, BuildSequence, SequenceError, SequenceRecord};
