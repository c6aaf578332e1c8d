use scatterforge::optimizer::update::{is_in_flatzone, update_reference_set, UpdatePolicy};
use scatterforge::{Individual, ReferenceSet};

fn flat_set(n: usize, cost: f64) -> ReferenceSet {
    let members = (0..n)
        .map(|i| Individual::with_cost(vec![i as f64, 0.0], cost))
        .collect();
    ReferenceSet::new(members).unwrap()
}

fn policy(flatzone: bool) -> UpdatePolicy {
    UpdatePolicy {
        dist_epsilon: 1e-6,
        fitness_epsilon: 0.05,
        flatzone_detection: flatzone,
    }
}

#[test]
fn flatzone_band_filters_after_first_slot() {
    let mut rs = flat_set(4, 10.0);
    // The first candidate beats the best and is installed unconditionally.
    // The next two only beat the worst: 9.3 lies outside 10 ± 0.5, 9.8 inside.
    let candidates = vec![
        Individual::with_cost(vec![0.5, 1.0], 1.0),
        Individual::with_cost(vec![1.5, 1.0], 9.3),
        Individual::with_cost(vec![2.5, 1.0], 9.8),
    ];
    let out = update_reference_set(&mut rs, candidates, &policy(true));

    assert_eq!(out.replacements, 2);
    assert_eq!(out.flatzones, 1);
    let costs: Vec<f64> = rs.members().iter().map(|m| m.cost).collect();
    assert_eq!(costs, vec![1.0, 9.3, 10.0, 10.0]);
}

#[test]
fn flatzone_off_accepts_close_costs() {
    let mut rs = flat_set(4, 10.0);
    let candidates = vec![
        Individual::with_cost(vec![0.5, 1.0], 1.0),
        Individual::with_cost(vec![2.5, 1.0], 9.8),
    ];
    let out = update_reference_set(&mut rs, candidates, &policy(false));
    assert_eq!(out.replacements, 2);
    assert_eq!(out.flatzones, 0);
}

#[test]
fn negative_costs_never_count_as_flatzone() {
    let rs = flat_set(4, -10.0);
    assert!(!is_in_flatzone(&rs, -10.2, 0.05));
    assert!(!is_in_flatzone(&rs, -9.8, 0.05));

    // A candidate that only beats the worst is installed, not discarded.
    let mut rs = flat_set(4, -10.0);
    let candidates = vec![
        Individual::with_cost(vec![0.5, 1.0], -20.0),
        Individual::with_cost(vec![1.5, 1.0], -10.2),
    ];
    let out = update_reference_set(&mut rs, candidates, &policy(true));
    assert_eq!(out.flatzones, 0);
    assert_eq!(out.replacements, 2);
}

#[test]
fn empty_candidate_set_changes_nothing() {
    let mut rs = flat_set(6, 3.0);
    let before = rs.clone();
    let out = update_reference_set(&mut rs, Vec::new(), &policy(true));
    assert_eq!(rs, before);
    assert_eq!(out.replacements, 0);
    assert!(out.installed.is_empty());
}

#[test]
fn worse_duplicate_keeps_the_member() {
    let members = vec![
        Individual::with_cost(vec![0.0], 1.0),
        Individual::with_cost(vec![1.0], 2.0),
        Individual::with_cost(vec![2.0], 3.0),
        Individual::with_cost(vec![3.0], 4.0),
    ];
    let mut rs = ReferenceSet::new(members).unwrap();
    let before = rs.clone();

    // Same point as the cost-2 member, better than the worst but worse than
    // the member it duplicates.
    let out = update_reference_set(
        &mut rs,
        vec![Individual::with_cost(vec![1.0], 2.5)],
        &policy(false),
    );
    assert_eq!(out.duplicates, 1);
    assert_eq!(out.duplicates_replaced, 0);
    assert_eq!(rs, before);
}

#[test]
fn better_duplicate_replaces_in_place() {
    let members = vec![
        Individual::with_cost(vec![0.0], 1.0),
        Individual::with_cost(vec![1.0], 2.0),
        Individual::with_cost(vec![2.0], 3.0),
        Individual::with_cost(vec![3.0], 4.0),
    ];
    let mut rs = ReferenceSet::new(members).unwrap();

    let out = update_reference_set(
        &mut rs,
        vec![Individual::with_cost(vec![2.0], 1.5)],
        &policy(false),
    );
    assert_eq!(out.duplicates_replaced, 1);
    let costs: Vec<f64> = rs.members().iter().map(|m| m.cost).collect();
    assert_eq!(costs, vec![1.0, 1.5, 2.0, 4.0]);
    assert_eq!(rs.get(1).params, vec![2.0]);
}
