use std::collections::HashMap;
use std::ops::Range;

use crate::ciphers::heys::{Block, Heys};
use crate::corpus::Corpus;
use crate::dispatcher::WorkDispatcher;
use crate::mask::{parity, KeyGuess, Mask};
use crate::search::TrailTable;

pub const KEY_SPACE: usize = 1 << 16;
const GUESS_RANGES: u32 = 256;

/// Aggregated evidence per surviving key guess.
pub type CandidateKeys = HashMap<KeyGuess, u64>;

pub struct DifferentialAttackConfig {
    /// Ciphertext pairs examined per key guess and trail.
    pub pair_cap: usize,
    /// Minimum number of matching pairs before a guess is reported. A
    /// wrong guess matches a 16-bit difference about `pair_cap / 65536`
    /// times, so a small constant is already far outside noise.
    pub hit_threshold: u64,
}

impl Default for DifferentialAttackConfig {
    fn default() -> DifferentialAttackConfig {
        DifferentialAttackConfig { pair_cap: 16384, hit_threshold: 5 }
    }
}

/// Scores every 16-bit guess for the whitening key: strip the guess off
/// both ciphertexts, undo the last substitution layer, and count how
/// often the predicted difference appears.
pub struct DifferentialKeyRecovery<'c> {
    cipher: &'c Heys,
    config: DifferentialAttackConfig,
    dispatcher: WorkDispatcher,
}

impl<'c> DifferentialKeyRecovery<'c> {
    pub fn new(
        cipher: &'c Heys,
        config: DifferentialAttackConfig,
        dispatcher: WorkDispatcher,
    ) -> DifferentialKeyRecovery<'c> {
        assert!(config.pair_cap > 0);
        DifferentialKeyRecovery { cipher, config, dispatcher }
    }

    pub fn recover(&self, trails: &[(Mask, Mask)], corpus: &Corpus) -> CandidateKeys {
        let mut candidates = CandidateKeys::new();
        for &(difference, predicted) in trails {
            let pairs = corpus.difference_pairs(difference, self.config.pair_cap);
            if pairs.is_empty() {
                continue;
            }
            let counts = self.score_guesses(&pairs, predicted);
            for (guess, count) in counts.into_iter().enumerate() {
                if count > self.config.hit_threshold {
                    *candidates.entry(KeyGuess(guess as u16)).or_insert(0) += count;
                }
            }
        }
        candidates
    }

    fn score_guesses(&self, pairs: &[(Block, Block)], predicted: Mask) -> Vec<u64> {
        let cipher = self.cipher;
        self.dispatcher.run(
            |range: Range<u32>| {
                let mut counts = vec![0u64; range.len()];
                for guess in range.clone() {
                    let key = guess as u16;
                    let mut hits = 0u64;
                    for &(left, right) in pairs {
                        let difference = cipher.invert_substitute_permute(left ^ key)
                            ^ cipher.invert_substitute_permute(right ^ key)
                            ^ 0xffff;
                        if difference == predicted.0 {
                            hits += 1;
                        }
                    }
                    counts[(guess - range.start) as usize] = hits;
                }
                (range.start, counts)
            },
            |handle| {
                let mut scores = vec![0u64; KEY_SPACE];
                for (start, counts) in handle.dispatch(guess_ranges()) {
                    let start = start as usize;
                    scores[start..start + counts.len()].copy_from_slice(&counts);
                }
                scores
            },
        )
    }
}

pub struct LinearAttackConfig {
    /// Multiple of the strongest deviation a guess must reach to collect
    /// votes from one approximation.
    pub outlier_factor: f64,
    /// Total votes required across approximations before a guess is
    /// reported.
    pub vote_threshold: u64,
}

impl Default for LinearAttackConfig {
    fn default() -> LinearAttackConfig {
        LinearAttackConfig { outlier_factor: 0.7, vote_threshold: 12000 }
    }
}

/// Scores every 16-bit guess for the first round key: push sampled
/// plaintexts one round forward under the guess and measure how far the
/// parity agreement with the ciphertext mask deviates from balance.
pub struct LinearKeyRecovery<'c> {
    cipher: &'c Heys,
    config: LinearAttackConfig,
    dispatcher: WorkDispatcher,
}

impl<'c> LinearKeyRecovery<'c> {
    pub fn new(
        cipher: &'c Heys,
        config: LinearAttackConfig,
        dispatcher: WorkDispatcher,
    ) -> LinearKeyRecovery<'c> {
        assert!((0.0..1.0).contains(&config.outlier_factor));
        LinearKeyRecovery { cipher, config, dispatcher }
    }

    pub fn recover(
        &self,
        approximations: &[(Mask, Mask)],
        texts: &[(Block, Block)],
    ) -> CandidateKeys {
        assert!(!texts.is_empty());
        let mut votes = vec![0u64; KEY_SPACE];
        for &(input, output) in approximations {
            let deviations = self.score_guesses(input, output, texts);
            let strongest = deviations.iter().copied().max().unwrap_or(0);
            if strongest == 0 {
                continue;
            }
            let cutoff = self.config.outlier_factor * strongest as f64;
            for (guess, deviation) in deviations.into_iter().enumerate() {
                if deviation as f64 > cutoff {
                    votes[guess] += deviation;
                }
            }
        }
        votes
            .into_iter()
            .enumerate()
            .filter(|&(_, vote)| vote > self.config.vote_threshold)
            .map(|(guess, vote)| (KeyGuess(guess as u16), vote))
            .collect()
    }

    fn score_guesses(&self, input: Mask, output: Mask, texts: &[(Block, Block)]) -> Vec<u64> {
        let cipher = self.cipher;
        self.dispatcher.run(
            |range: Range<u32>| {
                let mut deviations = vec![0u64; range.len()];
                for guess in range.clone() {
                    let key = guess as u16;
                    let mut disagreements = 0i64;
                    for &(plaintext, ciphertext) in texts {
                        let forward = cipher.substitute_permute(plaintext ^ key);
                        if parity(input.0 & forward) != parity(output.0 & ciphertext) {
                            disagreements += 1;
                        }
                    }
                    let deviation = (texts.len() as i64 - 2 * disagreements).unsigned_abs();
                    deviations[(guess - range.start) as usize] = deviation;
                }
                (range.start, deviations)
            },
            |handle| {
                let mut scores = vec![0u64; KEY_SPACE];
                for (start, deviations) in handle.dispatch(guess_ranges()) {
                    let start = start as usize;
                    scores[start..start + deviations.len()].copy_from_slice(&deviations);
                }
                scores
            },
        )
    }
}

fn guess_ranges() -> Vec<Range<u32>> {
    let span = KEY_SPACE as u32 / GUESS_RANGES;
    (0..GUESS_RANGES).map(|i| (i * span)..((i + 1) * span)).collect()
}

/// Trails worth attacking in differential mode: the predicted difference
/// must touch all four S-boxes, otherwise part of the guessed key never
/// influences the comparison.
pub fn select_differential_trails(table: &TrailTable, min_weight: f64) -> Vec<(Mask, Mask)> {
    let mut trails: Vec<(Mask, Mask, f64)> = Vec::new();
    for (&seed, branch) in table {
        for (&mask, &weight) in branch {
            if mask.all_nibbles_active() && weight >= min_weight {
                trails.push((seed, mask, weight));
            }
        }
    }
    trails.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));
    trails.into_iter().map(|(seed, mask, _)| (seed, mask)).collect()
}

/// Strongest linear approximations first, truncated to `limit`.
pub fn select_linear_approximations(table: &TrailTable, limit: usize) -> Vec<(Mask, Mask)> {
    let mut approximations: Vec<(Mask, Mask, f64)> = Vec::new();
    for (&seed, branch) in table {
        for (&mask, &weight) in branch {
            approximations.push((seed, mask, weight));
        }
    }
    approximations.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));
    approximations.truncate(limit);
    approximations.into_iter().map(|(seed, mask, _)| (seed, mask)).collect()
}
