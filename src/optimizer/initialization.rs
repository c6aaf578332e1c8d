use crate::grid::SubRegionGrid;
use crate::rng::RandomSource;
use crate::set::{sort_by_cost, Individual};

/// Draws an unevaluated Scatter Set of `size` points.
///
/// The first `p` members are stratified: member `k` takes every coordinate
/// from sub-region `k` of its dimension. The rest pick a sub-region per
/// dimension by walking the probability row, recording the visit before
/// sampling inside it, so later draws drift toward rarely visited
/// sub-regions.
pub fn build_scatter_set(
    grid: &mut SubRegionGrid,
    size: usize,
    rng: &mut dyn RandomSource,
) -> Vec<Individual> {
    let dim = grid.dim();
    let stratified = grid.sub_regions().min(size);
    let mut set = Vec::with_capacity(size);

    // 1. Stratified members
    for k in 0..stratified {
        let params = (0..dim).map(|i| grid.sample_in(i, k, rng)).collect();
        set.push(Individual::new(params));
    }

    // 2. Frequency-biased members
    for _ in stratified..size {
        let mut params = Vec::with_capacity(dim);
        for i in 0..dim {
            let r = rng.next_f64();
            let a = grid.pick_sub_region(i, r);
            grid.record_visit(i, a);
            params.push(grid.sample_in(i, a, rng));
        }
        set.push(Individual::new(params));
    }

    set
}

/// Builds the Reference Set from an evaluated Scatter Set.
///
/// The best half is copied as is. Every further slot takes the pool member
/// farthest from everything chosen so far (maximin), first index winning
/// ties. Nearest-chosen distances are kept per pool member and refreshed
/// with each new pick instead of being recomputed from scratch.
pub fn build_reference_set(mut scatter: Vec<Individual>, ref_set_size: usize) -> Vec<Individual> {
    sort_by_cost(&mut scatter);

    let elite = (ref_set_size / 2).min(scatter.len());
    let mut chosen: Vec<Individual> = scatter.drain(..elite).collect();
    let mut pool = scatter;

    let mut nearest: Vec<f64> = pool
        .iter()
        .map(|cand| {
            chosen
                .iter()
                .map(|c| cand.distance_to(c))
                .fold(f64::INFINITY, f64::min)
        })
        .collect();

    while chosen.len() < ref_set_size && !pool.is_empty() {
        let mut pick = 0;
        for (idx, &d) in nearest.iter().enumerate() {
            if d > nearest[pick] {
                pick = idx;
            }
        }

        // Order-preserving removal: tie-breaking depends on pool order.
        let member = pool.remove(pick);
        nearest.remove(pick);

        for (cand, d) in pool.iter().zip(nearest.iter_mut()) {
            *d = d.min(cand.distance_to(&member));
        }
        chosen.push(member);
    }

    chosen
}
