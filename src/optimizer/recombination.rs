use crate::rng::RandomSource;
use crate::set::{euclidean_distance, Individual, ReferenceSet};
use crate::space::SearchSpace;

/// Two Reference Set indices, `first < second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsetPair {
    pub first: usize,
    pub second: usize,
}

/// Perturbation formula applied to a pair `(x1, x2)` with half-difference
/// `d = (x2 - x1) / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// `x1 - r·d` or `x1 + r·d`, one `r` shared by all dimensions and a
    /// random sign.
    Shared,
    /// `x1 - r_i·d_i`
    Inward,
    /// `x1 + r_i·d_i`
    Outward,
    /// `x2 + r_i·d_i`
    Beyond,
}

impl CandidateKind {
    /// Unclamped candidate coordinates.
    pub fn perturb(
        self,
        x1: &[f64],
        x2: &[f64],
        half_diff: &[f64],
        rng: &mut dyn RandomSource,
    ) -> Vec<f64> {
        match self {
            CandidateKind::Shared => {
                let r = rng.next_f64();
                let sign = if rng.coin() { -1.0 } else { 1.0 };
                x1.iter()
                    .zip(half_diff)
                    .map(|(x, d)| x + sign * r * d)
                    .collect()
            }
            CandidateKind::Inward => x1
                .iter()
                .zip(half_diff)
                .map(|(x, d)| x - rng.next_f64() * d)
                .collect(),
            CandidateKind::Outward => x1
                .iter()
                .zip(half_diff)
                .map(|(x, d)| x + rng.next_f64() * d)
                .collect(),
            CandidateKind::Beyond => x2
                .iter()
                .zip(half_diff)
                .map(|(x, d)| x + rng.next_f64() * d)
                .collect(),
        }
    }
}

/// Elite status of a pair relative to the cost of member `maxElite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairClass {
    BothElite,
    Mixed,
    NeitherElite,
}

impl PairClass {
    pub fn of(cost1: f64, cost2: f64, mid_cost: f64) -> Self {
        match (cost1 < mid_cost, cost2 < mid_cost) {
            (true, true) => PairClass::BothElite,
            (false, false) => PairClass::NeitherElite,
            _ => PairClass::Mixed,
        }
    }

    /// Elite pairs are exploited harder (6 candidates) than mixed (4) or
    /// non-elite (2) ones.
    pub fn kinds(self, rng: &mut dyn RandomSource) -> Vec<CandidateKind> {
        use CandidateKind::*;
        match self {
            PairClass::BothElite => vec![Shared, Shared, Inward, Outward, Beyond, Beyond],
            PairClass::Mixed => vec![Shared, Inward, Outward, Beyond],
            PairClass::NeitherElite => {
                let first = if rng.coin() { Inward } else { Beyond };
                vec![first, Outward]
            }
        }
    }
}

/// All `(i, j)`, `i < j`, whose members are not duplicates of each other and
/// whose member contents do not repeat an already selected pair.
pub fn select_pairs(ref_set: &ReferenceSet, dist_epsilon: f64) -> Vec<SubsetPair> {
    let members = ref_set.members();
    let same = |a: usize, b: usize| {
        euclidean_distance(&members[a].params, &members[b].params) < dist_epsilon
    };

    let mut pairs: Vec<SubsetPair> = Vec::new();
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            if same(i, j) {
                continue;
            }
            let repeated = pairs.iter().any(|p| {
                (same(p.first, i) && same(p.second, j)) || (same(p.first, j) && same(p.second, i))
            });
            if !repeated {
                pairs.push(SubsetPair { first: i, second: j });
            }
        }
    }
    pairs
}

/// Generates the unevaluated Candidate Set for one iteration. Every
/// coordinate is clamped into the search space.
pub fn generate_candidates(
    ref_set: &ReferenceSet,
    pairs: &[SubsetPair],
    max_elite: usize,
    space: &SearchSpace,
    rng: &mut dyn RandomSource,
) -> Vec<Individual> {
    let mid_cost = ref_set.get(max_elite).cost;
    let mut candidates = Vec::with_capacity(pairs.len() * 6);

    for pair in pairs {
        let mut x1 = ref_set.get(pair.first);
        let mut x2 = ref_set.get(pair.second);
        let class = PairClass::of(x1.cost, x2.cost, mid_cost);
        if class == PairClass::Mixed && x1.cost >= mid_cost {
            std::mem::swap(&mut x1, &mut x2);
        }

        let half_diff: Vec<f64> = x1
            .params
            .iter()
            .zip(&x2.params)
            .map(|(a, b)| (b - a) / 2.0)
            .collect();

        for kind in class.kinds(rng) {
            let mut params = kind.perturb(&x1.params, &x2.params, &half_diff, rng);
            space.clamp(&mut params);
            candidates.push(Individual::new(params));
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{FastRandom, SequenceRandom};

    fn line_set(costs: &[f64]) -> ReferenceSet {
        let members = costs
            .iter()
            .enumerate()
            .map(|(i, &c)| Individual::with_cost(vec![i as f64, -(i as f64)], c))
            .collect();
        ReferenceSet::new(members).unwrap()
    }

    #[test]
    fn shared_kind_uses_one_scalar() {
        // r = 0.25, then coin 0.75 -> add
        let mut rng = SequenceRandom::new(vec![0.25, 0.75]);
        let out = CandidateKind::Shared.perturb(&[0.0, 0.0], &[4.0, 8.0], &[2.0, 4.0], &mut rng);
        assert_eq!(out, vec![0.5, 1.0]);
    }

    #[test]
    fn beyond_starts_from_second_point() {
        let mut rng = SequenceRandom::constant(0.5);
        let out = CandidateKind::Beyond.perturb(&[1.0, 1.0], &[3.0, 5.0], &[1.0, 2.0], &mut rng);
        assert_eq!(out, vec![3.5, 6.0]);
    }

    #[test]
    fn classification() {
        assert_eq!(PairClass::of(1.0, 2.0, 3.0), PairClass::BothElite);
        assert_eq!(PairClass::of(1.0, 3.0, 3.0), PairClass::Mixed);
        assert_eq!(PairClass::of(3.0, 4.0, 3.0), PairClass::NeitherElite);
    }

    #[test]
    fn pairs_skip_duplicates() {
        let members = vec![
            Individual::with_cost(vec![0.0], 1.0),
            Individual::with_cost(vec![0.0], 2.0),
            Individual::with_cost(vec![1.0], 3.0),
        ];
        let set = ReferenceSet::new(members).unwrap();
        let pairs = select_pairs(&set, 1e-6);
        // (0,1) identical; (1,2) repeats the contents of (0,2)
        assert_eq!(pairs, vec![SubsetPair { first: 0, second: 2 }]);
    }

    #[test]
    fn candidate_counts_follow_elite_status() {
        // max_elite = 2 -> mid cost 3.0; members 0,1 elite
        let set = line_set(&[1.0, 2.0, 3.0, 4.0]);
        let space = SearchSpace::uniform(2, -10.0, 10.0).unwrap();
        let mut rng = FastRandom::seeded(11);

        let pair = |first, second| [SubsetPair { first, second }];
        let both = generate_candidates(&set, &pair(0, 1), 2, &space, &mut rng);
        let mixed = generate_candidates(&set, &pair(0, 3), 2, &space, &mut rng);
        let neither = generate_candidates(&set, &pair(2, 3), 2, &space, &mut rng);
        assert_eq!((both.len(), mixed.len(), neither.len()), (6, 4, 2));
        assert!(both.iter().all(|c| c.cost.is_infinite()));
    }

    #[test]
    fn candidates_are_clamped() {
        let set = line_set(&[1.0, 2.0, 3.0, 4.0]);
        let space = SearchSpace::uniform(2, -0.5, 0.5).unwrap();
        let mut rng = FastRandom::seeded(5);
        let pairs = select_pairs(&set, 1e-9);
        for cand in generate_candidates(&set, &pairs, 2, &space, &mut rng) {
            assert!(space.contains(&cand.params));
        }
    }
}
