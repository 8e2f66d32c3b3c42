//! End-to-end tests for the accumulation and sequencing engines over the
//! canonical balanced-tree network: height 2, branching factor 2, root 0,
//! with per-site demands `[0, 100, 50, 25, 12, 6, 3]` and span lengths
//! taken from euclidean distances between the fixture coordinates.

use rollout_algo::{accumulate, sequence, sequence_to_vec, MaximizeReturn, SequenceRecord};
use rollout_core::{ForestBuilder, RootedForest, Site, SiteId};

const COORDS: [(f64, f64); 7] = [
    (125.0, 10.0),  // 0 (root)
    (124.5, 9.75),  // 1
    (125.5, 9.75),  // 2
    (124.25, 9.5),  // 3
    (124.75, 9.5),  // 4
    (125.25, 9.5),  // 5
    (125.75, 9.5),  // 6
];

const DEMANDS: [f64; 7] = [0.0, 100.0, 50.0, 25.0, 12.0, 6.0, 3.0];

const EDGES: [(usize, usize); 6] = [(0, 1), (0, 2), (1, 3), (1, 4), (2, 5), (2, 6)];

fn distance(a: usize, b: usize) -> f64 {
    let (ax, ay) = COORDS[a];
    let (bx, by) = COORDS[b];
    ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
}

fn balanced_tree() -> RootedForest {
    let mut builder = ForestBuilder::new();
    for (i, demand) in DEMANDS.iter().enumerate() {
        builder = builder.site(
            Site::new(SiteId::new(i), format!("site-{i}")).with_metric("demand", *demand),
        );
    }
    for (parent, child) in EDGES {
        builder = builder.span(
            SiteId::new(parent),
            SiteId::new(child),
            distance(parent, child),
        );
    }
    builder.root(SiteId::new(0)).build().unwrap()
}

fn run_sequence(forest: &RootedForest) -> Vec<SequenceRecord> {
    let model = MaximizeReturn::default();
    let values = accumulate(forest, &model).unwrap();
    sequence_to_vec(forest, &values, &model).unwrap()
}

fn approx_eq(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "expected {b}, got {a}");
}

/// Roots have zero incoming spans, every other site exactly one.
#[test]
fn test_forest_validity() {
    let forest = balanced_tree();
    for idx in forest.site_indices() {
        if forest.is_root(idx) {
            assert!(forest.parent_span(idx).is_none());
        } else {
            assert!(forest.parent_span(idx).is_some());
        }
    }
}

#[test]
fn test_accumulated_demand() {
    let forest = balanced_tree();
    let values = accumulate(&forest, &MaximizeReturn::default()).unwrap();

    assert_eq!(values.get(SiteId::new(1)).unwrap().demand, 137.0); // 100+25+12
    assert_eq!(values.get(SiteId::new(2)).unwrap().demand, 59.0); // 50+6+3
    assert_eq!(values.get(SiteId::new(0)).unwrap().demand, 196.0);

    // Leaves accumulate only their own demand.
    for leaf in [3, 4, 5, 6] {
        assert_eq!(values.get(SiteId::new(leaf)).unwrap().demand, DEMANDS[leaf]);
    }
}

#[test]
fn test_accumulated_cost() {
    let forest = balanced_tree();
    let values = accumulate(&forest, &MaximizeReturn::default()).unwrap();

    approx_eq(
        values.get(SiteId::new(1)).unwrap().cost,
        distance(0, 1) + distance(1, 3) + distance(1, 4),
    );
    approx_eq(
        values.get(SiteId::new(2)).unwrap().cost,
        distance(0, 2) + distance(2, 5) + distance(2, 6),
    );
    approx_eq(
        values.get(SiteId::new(0)).unwrap().cost,
        EDGES.iter().map(|&(a, b)| distance(a, b)).sum(),
    );

    // A leaf's cost is exactly its incoming span length.
    for &(parent, child) in &EDGES[2..] {
        approx_eq(
            values.get(SiteId::new(child)).unwrap().cost,
            distance(parent, child),
        );
    }
}

/// Every emitted record's upstream is either a root or a previously emitted
/// site; the sequencer never skips ahead of the topology.
#[test]
fn test_sequence_follows_topology() {
    let forest = balanced_tree();
    let records = run_sequence(&forest);

    let root = SiteId::new(0);
    for (i, record) in records.iter().enumerate() {
        let upstream_seen = record.upstream == root
            || records[..i].iter().any(|prior| prior.site == record.upstream);
        assert!(
            upstream_seen,
            "record {} connected site {} before its upstream {}",
            record.order_index, record.site, record.upstream
        );
    }
}

/// One record per non-root site, each exactly once, indices contiguous.
#[test]
fn test_sequence_completeness() {
    let forest = balanced_tree();
    let records = run_sequence(&forest);

    assert_eq!(records.len(), forest.site_count() - forest.roots().len());
    for site in 1..=6 {
        assert_eq!(
            records.iter().filter(|r| r.site == SiteId::new(site)).count(),
            1,
            "site {site} not emitted exactly once"
        );
    }
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.order_index, i + 1);
        assert_eq!(record.root, SiteId::new(0));
    }
}

/// The far-sighted order on the fixture: branch 1 first (densest subtree),
/// but branch 2 overtakes the weaker leaves under site 1.
#[test]
fn test_expected_build_order() {
    let forest = balanced_tree();
    let order: Vec<usize> = run_sequence(&forest).iter().map(|r| r.site.value()).collect();
    assert_eq!(order, vec![1, 3, 2, 4, 5, 6]);
}

#[test]
fn test_sequence_is_deterministic() {
    let forest = balanced_tree();
    let first = run_sequence(&forest);
    let second = run_sequence(&forest);
    assert_eq!(first, second);
}

/// Accumulation is a pure function of the forest: sequencing runs neither
/// depend on nor disturb it.
#[test]
fn test_accumulation_is_idempotent_across_runs() {
    let forest = balanced_tree();
    let model = MaximizeReturn::default();

    let before = accumulate(&forest, &model).unwrap();
    let _ = sequence_to_vec(&forest, &before, &model).unwrap();
    let after = accumulate(&forest, &model).unwrap();

    assert_eq!(before, after);
    let _ = sequence_to_vec(&forest, &after, &model).unwrap();
    let again = accumulate(&forest, &model).unwrap();
    assert_eq!(after, again);
}

/// The record is the machine-readable surface other tooling depends on:
/// the exported field names must stay stable.
#[test]
fn test_record_serialized_field_names() {
    let forest = balanced_tree();
    let records = run_sequence(&forest);

    let json = serde_json::to_value(&records[0]).unwrap();
    let object = json.as_object().unwrap();
    for field in ["order_index", "site", "upstream", "root", "demand", "cost", "score"] {
        assert!(object.contains_key(field), "missing field '{field}'");
    }
    assert_eq!(json["order_index"], 1);
    assert_eq!(json["site"], 1);
    assert_eq!(json["upstream"], 0);
    assert_eq!(json["root"], 0);
}

/// A lazy run emits the best candidate first without draining the frontier.
#[test]
fn test_lazy_first_record() {
    let forest = balanced_tree();
    let model = MaximizeReturn::default();
    let values = accumulate(&forest, &model).unwrap();

    let mut run = sequence(&forest, &values, &model).unwrap();
    let first = run.next().unwrap().unwrap();
    assert_eq!(first.site, SiteId::new(1));
    assert_eq!(first.upstream, SiteId::new(0));
    approx_eq(first.demand, 137.0);
}
