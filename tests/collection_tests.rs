//! Tests for grouping descriptors into collections

use gridfold::collection::{
    collections_json, collections_report, group_datasets, CollectionBuilder, GroupingStrategy,
};
use gridfold::errors::{GridFoldError, Result};
use gridfold::grid::GridDescriptor;
use serde_json::json;

fn three_datasets() -> Vec<(&'static str, GridDescriptor)> {
    vec![
        ("a", GridDescriptor::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [0, 0, 0])),
        ("b", GridDescriptor::new([5.0, 0.0, 0.0], [1.0, 1.0, 1.0], [5, 0, 0])),
        ("c", GridDescriptor::new([0.0, 0.0, 0.0], [2.0, 2.0, 2.0], [0, 0, 0])),
    ]
}

#[test]
fn test_greedy_grouping() -> Result<()> {
    let collections = group_datasets(three_datasets(), GroupingStrategy::Greedy)?;
    assert_eq!(collections.len(), 2);

    let first = &collections[0];
    assert_eq!(first.len(), 2);
    assert!(first.contains("a") && first.contains("b"));
    assert_eq!(first.descriptor().origin(), [0.0, 0.0, 0.0]);
    assert_eq!(first.descriptor().iorigin(), [0, 0, 0]);
    assert_eq!(first.descriptor().scale(), [1.0, 1.0, 1.0]);

    let second = &collections[1];
    assert_eq!(second.names().iter().collect::<Vec<_>>(), ["c"]);
    assert_eq!(second.descriptor().scale(), [2.0, 2.0, 2.0]);
    Ok(())
}

#[test]
fn test_builder_is_incremental() -> Result<()> {
    let mut builder = CollectionBuilder::new();
    assert_eq!(builder.strategy(), GroupingStrategy::Greedy);

    for (name, descriptor) in three_datasets() {
        builder.insert(name, descriptor)?;
    }
    // a later block extends the first collection towards negative indices
    builder.insert(
        "d",
        GridDescriptor::new([-3.0, 1.0, 0.0], [1.0, 1.0, 1.0], [-3, 1, 0]),
    )?;

    let collections = builder.build()?;
    assert_eq!(collections.len(), 2);
    assert_eq!(collections[0].len(), 3);
    assert_eq!(collections[0].descriptor().origin(), [-3.0, 0.0, 0.0]);
    assert_eq!(collections[0].descriptor().iorigin(), [-3, 0, 0]);
    Ok(())
}

#[test]
fn test_empty_input_gives_no_collections() -> Result<()> {
    let items: Vec<(String, GridDescriptor)> = Vec::new();
    assert!(group_datasets(items.clone(), GroupingStrategy::Greedy)?.is_empty());
    assert!(group_datasets(items, GroupingStrategy::Strict)?.is_empty());
    Ok(())
}

#[test]
fn test_duplicate_names_collapse() -> Result<()> {
    let d = GridDescriptor::new([0.0; 3], [1.0; 3], [0; 3]);
    let collections = group_datasets([("a", d.clone()), ("a", d)], GroupingStrategy::Greedy)?;
    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].len(), 1);
    Ok(())
}

#[test]
fn test_incompatible_origin_aborts_grouping() {
    let items = [
        ("a", GridDescriptor::new([0.0, 0.0, 0.0], [1.0; 3], [0, 0, 0])),
        ("shifted", GridDescriptor::new([0.0, 2.0, 0.0], [1.0; 3], [0, 0, 0])),
    ];

    for strategy in [GroupingStrategy::Greedy, GroupingStrategy::Strict] {
        match group_datasets(items.clone(), strategy) {
            Err(GridFoldError::IncompatibleOrigin { axis, .. }) => assert_eq!(axis, 1),
            other => panic!("Expected IncompatibleOrigin error, got {other:?}"),
        }
    }
}

#[test]
fn test_strict_matches_greedy_on_aligned_input() -> Result<()> {
    let greedy = group_datasets(three_datasets(), GroupingStrategy::Greedy)?;
    let strict = group_datasets(three_datasets(), GroupingStrategy::Strict)?;
    assert_eq!(greedy, strict);
    Ok(())
}

#[test]
fn test_strict_partition_is_order_independent() -> Result<()> {
    let forward = three_datasets();
    let mut backward = three_datasets();
    backward.reverse();

    let a = group_datasets(forward, GroupingStrategy::Strict)?;
    let b = group_datasets(backward, GroupingStrategy::Strict)?;

    // same members and frames, collections ordered by first occurrence
    assert_eq!(a.len(), b.len());
    assert_eq!(a[0], b[1]);
    assert_eq!(a[1], b[0]);
    Ok(())
}

#[test]
fn test_strict_defers_until_build() -> Result<()> {
    let mut builder = CollectionBuilder::with_strategy(GroupingStrategy::Strict);
    builder.insert("a", GridDescriptor::new([0.0; 3], [1.0; 3], [0; 3]))?;
    // would fail a greedy insert right away
    builder.insert("bad", GridDescriptor::new([1.0, 0.0, 0.0], [1.0; 3], [0; 3]))?;
    assert!(builder.build().is_err());
    Ok(())
}

#[test]
fn test_report() -> Result<()> {
    let collections = group_datasets(three_datasets(), GroupingStrategy::Greedy)?;
    let report = collections_report(&collections);

    assert!(report.starts_with("2 grid collection(s)\n"));
    assert!(report.contains("[0] :\n  origin = 0 0 0\n  delta = 1 1 1\n  iorigin = 0 0 0\n"));
    assert!(report.contains("  datasets (2):\n    - a\n    - b\n"));
    assert!(report.contains("[1] :\n  origin = 0 0 0\n  delta = 2 2 2\n"));
    assert!(report.contains("  datasets (1):\n    - c\n"));
    Ok(())
}

#[test]
fn test_json_report() -> Result<()> {
    let items = [
        (
            "a",
            GridDescriptor::with_label([0.0; 3], [1.0; 3], [0; 3], "level 0"),
        ),
        (
            "b",
            GridDescriptor::with_label([2.0, 0.0, 0.0], [1.0; 3], [2, 0, 0], "level 0"),
        ),
    ];
    let collections = group_datasets(items, GroupingStrategy::Greedy)?;
    let report = collections_json(&collections);

    assert_eq!(
        report,
        json!([{
            "name": "level 0",
            "origin": [0.0, 0.0, 0.0],
            "delta": [1.0, 1.0, 1.0],
            "iorigin": [0, 0, 0],
            "datasets": ["a", "b"],
        }])
    );
    Ok(())
}

/// Three unit grids whose lattice starts agree exactly but whose in-cell
/// offsets form a chain: `a ~ c` and `c ~ b`, while `a` and `b` are
/// 1.2e-5 apart and therefore not consistent
fn tolerance_chain() -> [(&'static str, GridDescriptor); 3] {
    let s = 3e-6;
    [
        ("a", GridDescriptor::new([s, s, 0.0], [1.0; 3], [0; 3])),
        ("b", GridDescriptor::new([-s, -s, 0.0], [1.0; 3], [0; 3])),
        ("c", GridDescriptor::new([-s, s, 0.0], [1.0; 3], [0; 3])),
    ]
}

#[test]
fn test_greedy_joins_first_matching_collection() -> Result<()> {
    let [a, b, c] = tolerance_chain();
    assert!(!a.1.is_consistent_with(&b.1));
    assert!(c.1.is_consistent_with(&a.1));
    assert!(c.1.is_consistent_with(&b.1));

    // `c` matches both existing collections and goes to the earlier one
    let collections = group_datasets([a, b, c], GroupingStrategy::Greedy)?;
    assert_eq!(collections.len(), 2);
    assert_eq!(collections[0].names().iter().collect::<Vec<_>>(), ["a", "c"]);
    assert_eq!(collections[1].names().iter().collect::<Vec<_>>(), ["b"]);
    assert_eq!(collections[0].descriptor().origin(), [-3e-6, 3e-6, 0.0]);
    Ok(())
}

#[test]
fn test_greedy_result_depends_on_input_order() -> Result<()> {
    let [a, b, c] = tolerance_chain();

    let split = group_datasets([a.clone(), b.clone(), c.clone()], GroupingStrategy::Greedy)?;
    assert_eq!(split.len(), 2);

    // once `c` has shifted the representative, `b` matches it as well
    let merged = group_datasets([a.clone(), c.clone(), b.clone()], GroupingStrategy::Greedy)?;
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].len(), 3);
    assert_eq!(merged[0].descriptor().origin(), [-3e-6, -3e-6, 0.0]);

    // the strict strategy sees one component either way, but can only fold
    // it when every member matches the running representative
    let strict = group_datasets([a.clone(), c.clone(), b.clone()], GroupingStrategy::Strict)?;
    assert_eq!(strict, merged);
    assert!(matches!(
        group_datasets([a, b, c], GroupingStrategy::Strict),
        Err(GridFoldError::PreconditionViolation(_))
    ));
    Ok(())
}
