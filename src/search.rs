use std::collections::HashMap;

use crate::ciphers::heys::ROUNDS;
use crate::dispatcher::{DispatchHandle, WorkDispatcher};
use crate::mask::Mask;
use crate::transition::{Branch, RoundTransition};

/// Propagation steps taken by the search: every data round except the
/// one absorbed by the seed.
pub const SEARCH_ROUNDS: usize = ROUNDS - 1;

/// Masks below the round's quantile are dropped before the next round.
#[allow(dead_code)]
#[derive(Clone, Copy)]
pub struct QuantileSchedule(pub [f64; SEARCH_ROUNDS]);

impl QuantileSchedule {
    #[allow(dead_code)]
    pub fn differential() -> QuantileSchedule {
        QuantileSchedule([0.125, 0.000195, 0.00004, 0.0000005, 0.00000002])
    }

    #[allow(dead_code)]
    pub fn linear() -> QuantileSchedule {
        QuantileSchedule([0.00015, 0.00015, 0.00015, 0.00015, 0.00012])
    }
}

/// Final branch reached from each seed mask. An empty branch records a
/// trail that died under pruning; it is a result, not an error.
pub type TrailTable = HashMap<Mask, Branch>;

type WorkItem = (usize, Mask, f64);
type Response = (Mask, f64, Branch);

#[allow(dead_code)]
pub struct TrailSearchEngine<'t, T: RoundTransition> {
    transition: &'t T,
    quantiles: QuantileSchedule,
    dispatcher: WorkDispatcher,
}

#[allow(dead_code)]
impl<'t, T: RoundTransition> TrailSearchEngine<'t, T> {
    pub fn new(
        transition: &'t T,
        quantiles: QuantileSchedule,
        dispatcher: WorkDispatcher,
    ) -> TrailSearchEngine<'t, T> {
        assert!(quantiles.0.iter().all(|q| *q > 0.0 && *q <= 1.0));
        TrailSearchEngine { transition, quantiles, dispatcher }
    }

    pub fn search(&self, seeds: &[Mask]) -> TrailTable {
        let transition = self.transition;
        self.dispatcher.run(
            |(round, mask, weight): WorkItem| (mask, weight, transition.branch(round, mask)),
            |handle| {
                seeds
                    .iter()
                    .map(|&seed| (seed, self.propagate(seed, handle)))
                    .collect()
            },
        )
    }

    fn propagate(&self, seed: Mask, handle: &DispatchHandle<WorkItem, Response>) -> Branch {
        if seed.is_zero() {
            // The zero difference never leaves zero; reporting the seed
            // itself would only mislead the attack stage.
            return Branch::new();
        }
        let mut frontier = vec![(seed, 1.0f64)];
        for round in 1..=SEARCH_ROUNDS {
            let work = frontier.iter().map(|&(mask, weight)| (round, mask, weight)).collect();
            let mut responses = handle.dispatch(work);
            // Responses arrive in pool order; accumulating in mask order
            // keeps the sums identical for every worker count.
            responses.sort_by_key(|&(mask, _, _)| mask);
            let mut accumulated = Branch::new();
            for (_, weight, branch) in responses {
                for (mask, transition_weight) in branch {
                    *accumulated.entry(mask).or_insert(0.0) += weight * transition_weight;
                }
            }
            let quantile = self.quantiles.0[round - 1];
            accumulated.retain(|mask, weight| !mask.is_zero() && *weight >= quantile);
            if accumulated.is_empty() {
                return Branch::new();
            }
            frontier = accumulated.into_iter().collect();
            frontier.sort_by_key(|&(mask, _)| mask);
        }
        frontier.into_iter().collect()
    }
}

/// The default seed set: every mask touching exactly one S-box.
#[allow(dead_code)]
pub fn single_nibble_seeds() -> Vec<Mask> {
    let mut seeds = Vec::with_capacity(60);
    for position in 0..4 {
        for value in 1..16u16 {
            seeds.push(Mask(value << (4 * position)));
        }
    }
    seeds
}

#[cfg(test)]
mod tests {
    use crate::ciphers::heys::{Heys, DEFAULT_ROUND_KEYS};
    use crate::dispatcher::{DispatcherConfig, WorkDispatcher};
    use crate::mask::Mask;
    use crate::search::{single_nibble_seeds, QuantileSchedule, TrailSearchEngine, TrailTable};
    use crate::transition::DifferentialTransition;

    fn run_search(quantiles: QuantileSchedule, workers: usize, seeds: &[Mask]) -> TrailTable {
        let cipher = Heys::new();
        let transition = DifferentialTransition::new(&cipher, DEFAULT_ROUND_KEYS);
        let dispatcher =
            WorkDispatcher::new(DispatcherConfig { workers, queue_capacity: 1 << 16 });
        let engine = TrailSearchEngine::new(&transition, quantiles, dispatcher);
        engine.search(seeds)
    }

    // Pruned hard enough to keep the frontier tiny; the structural
    // properties under test do not depend on the schedule.
    fn tight() -> QuantileSchedule {
        QuantileSchedule([0.125, 0.01, 0.0005, 0.0005, 0.0005])
    }

    #[test]
    fn zero_seed_yields_an_empty_trail() {
        let table = run_search(tight(), 2, &[Mask(0)]);
        assert_eq!(table.len(), 1);
        assert!(table[&Mask(0)].is_empty());
    }

    #[test]
    fn worker_count_does_not_change_the_table() {
        let seeds = [Mask(0x0c00), Mask(0x0004)];
        let alone = run_search(tight(), 1, &seeds);
        let pooled = run_search(tight(), 6, &seeds);
        assert_eq!(alone, pooled);
    }

    #[test]
    fn stricter_schedule_keeps_a_subset_with_smaller_weights() {
        let loose = run_search(tight(), 4, &[Mask(0x0c00)]);
        let strict =
            run_search(QuantileSchedule([0.25, 0.02, 0.001, 0.001, 0.001]), 4, &[Mask(0x0c00)]);
        assert!(!strict[&Mask(0x0c00)].is_empty());
        for (mask, weight) in &strict[&Mask(0x0c00)] {
            let loose_weight = loose[&Mask(0x0c00)]
                .get(mask)
                .unwrap_or_else(|| panic!("{mask} missing from looser run"));
            assert!(weight <= loose_weight);
        }
    }

    #[test]
    fn trail_dies_under_an_impossible_schedule() {
        // No single transition of the cipher carries weight 0.9.
        let table = run_search(QuantileSchedule([0.9; 5]), 2, &[Mask(0x0c00)]);
        assert!(table[&Mask(0x0c00)].is_empty());
    }

    #[test]
    fn surviving_masks_never_include_zero() {
        let table = run_search(tight(), 4, &single_nibble_seeds()[..8].to_vec());
        for branch in table.values() {
            assert!(!branch.contains_key(&Mask(0)));
        }
    }

    #[test]
    fn seed_catalog_covers_every_single_nibble_mask() {
        let seeds = single_nibble_seeds();
        assert_eq!(seeds.len(), 60);
        let mut sorted: Vec<u16> = seeds.iter().map(|seed| seed.0).collect();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 60);
        assert!(seeds.iter().all(|seed| !seed.is_zero()));
        assert!(seeds.contains(&Mask(0x0c00)));
        assert!(seeds.contains(&Mask(0xf000)));
        assert!(seeds.contains(&Mask(0x0001)));
    }

    #[test]
    fn documented_differential_reaches_the_checkerboard_mask() {
        let table = run_search(QuantileSchedule::differential(), 4, &[Mask(0x0c00)]);
        let branch = &table[&Mask(0x0c00)];
        let weight = branch.get(&Mask(0x1111)).copied().unwrap_or(0.0);
        assert!(
            (0.0008..0.0030).contains(&weight),
            "0x1111 carries weight {weight:e}"
        );
    }
}
