//! Forest construction and validation.
//!
//! The core algorithms assume a **validated rooted forest**: edges directed
//! away from the roots, every non-root site with exactly one incoming span,
//! every site reachable from exactly one root. This module enforces that
//! contract at construction time through [`ForestBuilder`]; downstream
//! engines fail fast instead of repairing malformed input.
//!
//! Validation covers cycles indirectly: a cycle whose members each have a
//! single parent is unreachable from any root, and a cycle reachable from a
//! root implies a site with two incoming spans. Both cases are rejected.
//!
//! # Example
//!
//! ```rust
//! use rollout_core::{ForestBuilder, Site, SiteId};
//!
//! let forest = ForestBuilder::new()
//!     .site(Site::new(SiteId::new(0), "grid"))
//!     .site(Site::new(SiteId::new(1), "village").with_metric("demand", 40.0))
//!     .span(SiteId::new(0), SiteId::new(1), 2.5)
//!     .root(SiteId::new(0))
//!     .build()
//!     .unwrap();
//!
//! let idx = forest.site_index(SiteId::new(1)).unwrap();
//! assert_eq!(forest.parent_span(idx).unwrap().1, 2.5);
//! ```

use crate::{Site, SiteId, Span};
use hashbrown::HashMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::VecDeque;
use thiserror::Error;

/// Error type for forest construction.
#[derive(Debug, Error)]
pub enum ForestError {
    /// Two sites were declared with the same id
    #[error("duplicate site id {0}")]
    DuplicateSite(SiteId),

    /// A span references a site id that was never declared
    #[error("span endpoint references unknown site id {0}")]
    UnknownSite(SiteId),

    /// A root id does not correspond to any declared site
    #[error("root id {0} is not a site in the forest")]
    UnknownRoot(SiteId),

    /// The same root was declared twice
    #[error("duplicate root id {0}")]
    DuplicateRoot(SiteId),

    /// No roots were declared
    #[error("forest has no roots")]
    NoRoots,

    /// A span carries a negative (or NaN) build length
    #[error("span {parent} -> {child} has invalid length {length}")]
    InvalidLength {
        parent: SiteId,
        child: SiteId,
        length: f64,
    },

    /// A root has an incoming span; roots represent existing infrastructure
    #[error("root {0} has an incoming span")]
    RootHasParent(SiteId),

    /// A non-root site has more than one incoming span
    #[error("site {site} has {parents} incoming spans; a non-root site must have exactly one")]
    MultiParent { site: SiteId, parents: usize },

    /// Sites exist that no root can reach (disconnected component or cycle)
    #[error("{count} sites are unreachable from any root")]
    Unreachable { count: usize },
}

/// A validated directed rooted forest over candidate sites.
///
/// The petgraph node arena doubles as the integer-indexed storage the
/// traversal engines operate on; [`SiteId`] lookup goes through an internal
/// index map. The forest is read-only once built.
#[derive(Debug)]
pub struct RootedForest {
    /// Underlying graph; edges point away from the roots.
    pub graph: DiGraph<Site, Span>,
    roots: Vec<NodeIndex>,
    index: HashMap<SiteId, NodeIndex>,
    root_of: Vec<NodeIndex>,
}

impl RootedForest {
    /// Root node indices, in declaration order.
    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    /// The site stored at a node index.
    pub fn site(&self, idx: NodeIndex) -> &Site {
        &self.graph[idx]
    }

    /// Resolve a site id to its node index.
    pub fn site_index(&self, id: SiteId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    /// The upstream site and incoming span length, or `None` for a root.
    pub fn parent_span(&self, idx: NodeIndex) -> Option<(NodeIndex, f64)> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .next()
            .map(|edge| (edge.source(), edge.weight().length))
    }

    /// Downstream children of a site.
    pub fn children(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Outgoing)
    }

    /// The root of the tree containing this site (a root maps to itself).
    pub fn root_of(&self, idx: NodeIndex) -> NodeIndex {
        self.root_of[idx.index()]
    }

    /// Whether this node is a root.
    pub fn is_root(&self, idx: NodeIndex) -> bool {
        self.root_of[idx.index()] == idx
    }

    /// All node indices in the forest.
    pub fn site_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn site_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn span_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Compute basic statistics about the forest.
    pub fn stats(&self) -> ForestStats {
        let total_length = self
            .graph
            .edge_weights()
            .map(|span| span.length)
            .sum::<f64>();
        ForestStats {
            num_sites: self.graph.node_count(),
            num_roots: self.roots.len(),
            num_spans: self.graph.edge_count(),
            total_length,
        }
    }
}

/// Statistics about a forest's size and extent.
#[derive(Debug, Clone, Default)]
pub struct ForestStats {
    pub num_sites: usize,
    pub num_roots: usize,
    pub num_spans: usize,
    pub total_length: f64,
}

impl std::fmt::Display for ForestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} sites ({} roots), {} spans ({:.1} total length)",
            self.num_sites, self.num_roots, self.num_spans, self.total_length
        )
    }
}

/// Builder for constructing validated rooted forests.
///
/// Declaration order does not matter: spans may reference sites declared
/// later. All validation happens in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct ForestBuilder {
    sites: Vec<Site>,
    spans: Vec<(SiteId, SiteId, f64)>,
    roots: Vec<SiteId>,
}

impl ForestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a site.
    pub fn site(mut self, site: Site) -> Self {
        self.sites.push(site);
        self
    }

    /// Declare a directed span from an upstream site to a downstream site.
    pub fn span(mut self, parent: SiteId, child: SiteId, length: f64) -> Self {
        self.spans.push((parent, child, length));
        self
    }

    /// Mark a site as a root (already-built infrastructure).
    pub fn root(mut self, id: SiteId) -> Self {
        self.roots.push(id);
        self
    }

    /// Validate and build the forest.
    pub fn build(self) -> Result<RootedForest, ForestError> {
        let mut graph = DiGraph::with_capacity(self.sites.len(), self.spans.len());
        let mut index: HashMap<SiteId, NodeIndex> = HashMap::with_capacity(self.sites.len());

        for site in self.sites {
            let id = site.id;
            let idx = graph.add_node(site);
            if index.insert(id, idx).is_some() {
                return Err(ForestError::DuplicateSite(id));
            }
        }

        if self.roots.is_empty() {
            return Err(ForestError::NoRoots);
        }
        let mut roots = Vec::with_capacity(self.roots.len());
        for id in &self.roots {
            let idx = *index.get(id).ok_or(ForestError::UnknownRoot(*id))?;
            if roots.contains(&idx) {
                return Err(ForestError::DuplicateRoot(*id));
            }
            roots.push(idx);
        }

        for (parent, child, length) in &self.spans {
            let from = *index.get(parent).ok_or(ForestError::UnknownSite(*parent))?;
            let to = *index.get(child).ok_or(ForestError::UnknownSite(*child))?;
            if length.is_nan() || *length < 0.0 {
                return Err(ForestError::InvalidLength {
                    parent: *parent,
                    child: *child,
                    length: *length,
                });
            }
            graph.add_edge(from, to, Span::new(*length));
        }

        // In-degree invariants: roots take no incoming span, everything else
        // exactly one. Zero-parent non-roots fall out of the reachability
        // check below.
        for idx in graph.node_indices() {
            let parents = graph.edges_directed(idx, Direction::Incoming).count();
            if roots.contains(&idx) {
                if parents > 0 {
                    return Err(ForestError::RootHasParent(graph[idx].id));
                }
            } else if parents > 1 {
                return Err(ForestError::MultiParent {
                    site: graph[idx].id,
                    parents,
                });
            }
        }

        // Breadth-first sweep from every root, tagging each site with its
        // owning root. With in-degrees validated above, each site is reached
        // at most once.
        let mut root_of = vec![NodeIndex::end(); graph.node_count()];
        let mut visited = 0usize;
        for &root in &roots {
            let mut queue = VecDeque::new();
            queue.push_back(root);
            root_of[root.index()] = root;
            visited += 1;
            while let Some(node) = queue.pop_front() {
                for child in graph.neighbors_directed(node, Direction::Outgoing) {
                    if root_of[child.index()] == NodeIndex::end() {
                        root_of[child.index()] = root;
                        visited += 1;
                        queue.push_back(child);
                    }
                }
            }
        }
        if visited < graph.node_count() {
            return Err(ForestError::Unreachable {
                count: graph.node_count() - visited,
            });
        }

        Ok(RootedForest {
            graph,
            roots,
            index,
            root_of,
        })
    }
}
