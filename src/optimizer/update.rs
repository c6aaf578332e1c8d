use crate::config::UpdateParams;
use crate::set::{sort_by_cost, Individual, ReferenceSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdatePolicy {
    pub dist_epsilon: f64,
    pub fitness_epsilon: f64,
    pub flatzone_detection: bool,
}

impl From<&UpdateParams> for UpdatePolicy {
    fn from(params: &UpdateParams) -> Self {
        Self {
            dist_epsilon: params.dist_epsilon,
            fitness_epsilon: params.fitness_epsilon,
            flatzone_detection: params.perform_flatzone_detection,
        }
    }
}

/// What one update did to the Reference Set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    pub replacements: u64,
    pub duplicates: u64,
    pub duplicates_replaced: u64,
    pub flatzones: u64,
    /// Parameters of every point that entered the set, in order.
    pub installed: Vec<Vec<f64>>,
}

/// True when `c - c·epsilon < cost < c + c·epsilon` for any member cost
/// `c`. The band is empty for `c <= 0`.
pub fn is_in_flatzone(ref_set: &ReferenceSet, cost: f64, epsilon: f64) -> bool {
    ref_set.members().iter().any(|m| {
        let band = m.cost * epsilon;
        cost < m.cost + band && cost > m.cost - band
    })
}

/// Greedy replacement of Reference Set members by evaluated candidates.
///
/// Candidates are consumed best first. One that beats the current best takes
/// index 0 outright. After that, each candidate better than the current
/// worst either replaces a duplicate it improves on, is dropped as a
/// duplicate or flatzone point, or replaces the worst member. The set keeps
/// its size and stays sorted after every replacement.
pub fn update_reference_set(
    ref_set: &mut ReferenceSet,
    mut candidates: Vec<Individual>,
    policy: &UpdatePolicy,
) -> UpdateOutcome {
    let mut outcome = UpdateOutcome::default();
    if candidates.is_empty() {
        return outcome;
    }
    sort_by_cost(&mut candidates);
    let mut queue = candidates.into_iter().peekable();

    if let Some(best) = queue.next_if(|c| c.cost < ref_set.best().cost) {
        outcome.installed.push(best.params.clone());
        ref_set.replace(0, best);
        outcome.replacements += 1;
    }

    // next_if stops on an exhausted queue as well as on a losing candidate.
    while let Some(cand) = queue.next_if(|c| c.cost < ref_set.worst().cost) {
        match ref_set.find_duplicate(&cand.params, policy.dist_epsilon) {
            None => {
                if policy.flatzone_detection
                    && is_in_flatzone(ref_set, cand.cost, policy.fitness_epsilon)
                {
                    outcome.flatzones += 1;
                    continue;
                }
                let worst = ref_set.len() - 1;
                outcome.installed.push(cand.params.clone());
                ref_set.replace(worst, cand);
                outcome.replacements += 1;
            }
            Some(index) => {
                outcome.duplicates += 1;
                if cand.cost < ref_set.get(index).cost {
                    outcome.installed.push(cand.params.clone());
                    ref_set.replace(index, cand);
                    outcome.duplicates_replaced += 1;
                    outcome.replacements += 1;
                }
            }
        }
    }

    outcome
}
