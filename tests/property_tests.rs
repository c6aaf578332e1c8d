use proptest::prelude::*;
use scatterforge::config::Config;
use scatterforge::grid::SubRegionGrid;
use scatterforge::optimizer::recombination::{generate_candidates, select_pairs};
use scatterforge::rng::FastRandom;
use scatterforge::{Individual, ReferenceSet, ScatterSearch, SearchSpace};

// --- STRATEGIES ---

prop_compose! {
    fn arb_space(dim: usize)(
        lows in prop::collection::vec(-100.0..0.0f64, dim),
        widths in prop::collection::vec(0.01..50.0f64, dim)
    ) -> SearchSpace {
        let highs = lows.iter().zip(&widths).map(|(l, w)| l + w).collect();
        SearchSpace::new(lows, highs).unwrap()
    }
}

prop_compose! {
    fn arb_ref_set(dim: usize)(
        space in arb_space(dim),
        unit in prop::collection::vec(prop::collection::vec(0.0..=1.0f64, dim), 6),
        costs in prop::collection::vec(-1e3..1e3f64, 6)
    ) -> (SearchSpace, ReferenceSet) {
        let members = unit
            .into_iter()
            .zip(costs)
            .map(|(u, c)| {
                let params = u
                    .iter()
                    .enumerate()
                    .map(|(i, t)| {
                        let (lo, hi) = space.bounds(i);
                        lo + t * (hi - lo)
                    })
                    .collect();
                Individual::with_cost(params, c)
            })
            .collect();
        (space, ReferenceSet::new(members).unwrap())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn candidates_stay_in_bounds((space, rs) in arb_ref_set(3), seed in any::<u64>()) {
        let pairs = select_pairs(&rs, 1e-9);
        let mut rng = FastRandom::seeded(seed);
        for c in generate_candidates(&rs, &pairs, 3, &space, &mut rng) {
            prop_assert!(space.contains(&c.params));
        }
    }

    #[test]
    fn probabilities_stay_normalized(
        visits in prop::collection::vec((0usize..2, 0usize..5), 0..50)
    ) {
        let space = SearchSpace::uniform(2, 0.0, 1.0).unwrap();
        let mut grid = SubRegionGrid::new(&space, 5).unwrap();
        for (i, k) in visits {
            grid.record_visit(i, k);
        }
        for row in grid.probabilities() {
            let sum: f64 = row.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
            prop_assert!(row.iter().all(|&p| p > 0.0));
        }
    }

    #[test]
    fn located_region_contains_point(x in 0.0..=10.0f64, p in 1usize..9) {
        let space = SearchSpace::uniform(1, 0.0, 10.0).unwrap();
        let grid = SubRegionGrid::new(&space, p).unwrap();
        let k = grid.locate(0, x).unwrap();
        let (lo, hi) = grid.sub_region(0, k);
        prop_assert!(lo <= x && x <= hi);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn iterations_keep_set_sorted_and_sized(seed in any::<u64>(), shift in -2.0..2.0f64) {
        let space = SearchSpace::uniform(2, -3.0, 3.0).unwrap();
        let objective = move |x: &[f64]| (x[0] - shift).powi(2) + x[1].abs();

        let mut c = Config::default();
        c.sets.ref_set_size = Some(8);
        c.sets.scatter_set_size = Some(16);
        c.search.max_iter = 30;
        c.search.seed = Some(seed);
        c.search.perform_stop_criteria = false;
        c.search.track_frequencies = true;
        c.update.perform_flatzone_detection = true;

        let mut search = ScatterSearch::new(space.clone(), objective, c).unwrap();
        search.initialize().unwrap();
        let mut best = f64::INFINITY;
        for _ in 0..10 {
            search.iterate().unwrap();
            let rs = search.reference_set().unwrap();
            prop_assert_eq!(rs.len(), 8);
            prop_assert!(rs.is_sorted());
            prop_assert!(rs.best().cost <= best);
            prop_assert!(rs.members().iter().all(|m| space.contains(&m.params)));
            best = rs.best().cost;
        }
    }

    #[test]
    fn close_members_never_tie_on_cost(seed in any::<u64>(), eps in 1e-4..0.2f64) {
        // Wide duplicate radius so candidates regularly land next to members.
        let space = SearchSpace::uniform(2, -1.0, 1.0).unwrap();
        let objective = |x: &[f64]| (x[0] - 0.3).powi(2) + (x[1] + 0.2).powi(2);

        let mut c = Config::default();
        c.sets.ref_set_size = Some(8);
        c.sets.scatter_set_size = Some(16);
        c.search.seed = Some(seed);
        c.search.perform_stop_criteria = false;
        c.search.max_iter = 30;
        c.update.dist_epsilon = eps;

        let mut search = ScatterSearch::new(space, objective, c).unwrap();
        search.initialize().unwrap();
        for _ in 0..10 {
            search.iterate().unwrap();
            let members = search.reference_set().unwrap().members();
            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    if a.distance_to(b) < eps {
                        // Only a strictly better point may sit inside
                        // another member's duplicate radius.
                        prop_assert!(a.cost < b.cost, "{:?} vs {:?}", a, b);
                    }
                }
            }
        }
    }
}
