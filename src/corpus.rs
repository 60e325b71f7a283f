use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ciphers::heys::{Block, RoundKeys};
use crate::ciphers::SymmetricCipher;
use crate::mask::Mask;

/// Known plaintext/ciphertext material for the attacks, keyed by
/// plaintext. A full codebook holds all 2^16 blocks.
#[derive(Serialize, Deserialize, Clone)]
pub struct Corpus {
    pub entries: HashMap<Block, Block>,
}

impl Corpus {
    #[allow(dead_code)]
    pub fn collect<C: SymmetricCipher<RoundKeys, Block>>(cipher: &C, keys: &RoundKeys) -> Corpus {
        let mut entries = HashMap::with_capacity(1 << 16);
        for plaintext in 0..=u16::MAX {
            let mut block = plaintext;
            cipher.cipher(keys, &mut block);
            entries.insert(plaintext, block);
        }
        Corpus { entries }
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ciphertext pairs whose plaintexts differ by `difference`, each
    /// unordered pair reported once, in plaintext order.
    #[allow(dead_code)]
    pub fn difference_pairs(&self, difference: Mask, cap: usize) -> Vec<(Block, Block)> {
        let mut pairs = Vec::new();
        if difference.is_zero() || cap == 0 {
            return pairs;
        }
        for plaintext in 0..=u16::MAX {
            let partner = plaintext ^ difference.0;
            if plaintext > partner {
                continue;
            }
            if let (Some(&left), Some(&right)) =
                (self.entries.get(&plaintext), self.entries.get(&partner))
            {
                pairs.push((left, right));
                if pairs.len() == cap {
                    break;
                }
            }
        }
        pairs
    }

    /// A reproducible sample of known pairs, without replacement.
    #[allow(dead_code)]
    pub fn sample<R: Rng>(&self, rand: &mut R, count: usize) -> Vec<(Block, Block)> {
        let mut plaintexts: Vec<Block> = self.entries.keys().copied().collect();
        plaintexts.sort_unstable();
        plaintexts
            .choose_multiple(rand, count)
            .map(|&plaintext| (plaintext, self.entries[&plaintext]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    use crate::ciphers::heys::{Heys, DEFAULT_ROUND_KEYS};
    use crate::corpus::Corpus;
    use crate::mask::Mask;

    #[test]
    fn full_codebook_covers_the_block_space() {
        let cipher = Heys::new();
        let corpus = Corpus::collect(&cipher, &DEFAULT_ROUND_KEYS);
        assert_eq!(corpus.len(), 1 << 16);
        let mut images: Vec<u16> = corpus.entries.values().copied().collect();
        images.sort_unstable();
        images.dedup();
        assert_eq!(images.len(), 1 << 16, "encryption must be a permutation");
    }

    #[test]
    fn difference_pairs_enumerate_each_pair_once() {
        let cipher = Heys::new();
        let corpus = Corpus::collect(&cipher, &DEFAULT_ROUND_KEYS);
        let pairs = corpus.difference_pairs(Mask(0x0c00), usize::MAX);
        assert_eq!(pairs.len(), 1 << 15);
        let capped = corpus.difference_pairs(Mask(0x0c00), 100);
        assert_eq!(capped.len(), 100);
        assert_eq!(&pairs[..100], &capped[..]);
        assert!(corpus.difference_pairs(Mask(0), usize::MAX).is_empty());
    }

    #[test]
    fn sampling_is_reproducible() {
        let cipher = Heys::new();
        let corpus = Corpus::collect(&cipher, &DEFAULT_ROUND_KEYS);
        let first = corpus.sample(&mut Xoshiro256StarStar::seed_from_u64(11), 500);
        let second = corpus.sample(&mut Xoshiro256StarStar::seed_from_u64(11), 500);
        assert_eq!(first, second);
        assert_eq!(first.len(), 500);
        for (plaintext, ciphertext) in first {
            assert_eq!(corpus.entries[&plaintext], ciphertext);
        }
    }
}
