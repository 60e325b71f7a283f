use std::collections::HashMap;

use crate::ciphers::heys::{permute, sbox, Heys, RoundKeys};
use crate::mask::{parity, Mask};

/// One-round reachability of a single mask: every mask it can turn into,
/// with the weight of the transition.
pub type Branch = HashMap<Mask, f64>;

pub trait RoundTransition: Sync {
    fn branch(&self, round: usize, mask: Mask) -> Branch;
}

/// Differential transitions, measured exhaustively: the full 2^16 input
/// space is run through the keyed round function for each queried mask.
/// The round keys cancel in the XOR, so the result is key independent;
/// keeping the keyed form makes that cancellation observable in tests.
#[allow(dead_code)]
pub struct DifferentialTransition<'c> {
    cipher: &'c Heys,
    keys: RoundKeys,
}

impl<'c> DifferentialTransition<'c> {
    #[allow(dead_code)]
    pub fn new(cipher: &'c Heys, keys: RoundKeys) -> DifferentialTransition<'c> {
        DifferentialTransition { cipher, keys }
    }
}

impl RoundTransition for DifferentialTransition<'_> {
    fn branch(&self, round: usize, mask: Mask) -> Branch {
        let mut counts = vec![0u32; 1 << 16];
        for x in 0..=u16::MAX {
            let image = self.cipher.round_transform(x ^ mask.0, &self.keys, round)
                ^ self.cipher.round_transform(x, &self.keys, round)
                ^ 0xffff;
            counts[image as usize] += 1;
        }
        let mut branch = Branch::new();
        for (image, count) in counts.into_iter().enumerate() {
            if count > 0 {
                branch.insert(Mask(image as u16), f64::from(count) / 65536.0);
            }
        }
        branch
    }
}

/// Linear transitions built from the 16x16 nibble approximation table.
/// The four nibble agreements are combined with the piling-up expansion
/// and the output mask is carried through the bit permutation.
#[allow(dead_code)]
pub struct LinearTransition {
    agreements: [[i64; 16]; 16],
}

impl LinearTransition {
    #[allow(dead_code)]
    pub fn new() -> LinearTransition {
        let mut agreements = [[0i64; 16]; 16];
        for (input, row) in agreements.iter_mut().enumerate() {
            for (output, cell) in row.iter_mut().enumerate() {
                for x in 0..16u16 {
                    if parity(input as u16 & x) == parity(output as u16 & sbox(x)) {
                        *cell += 1;
                    }
                }
            }
        }
        LinearTransition { agreements }
    }
}

impl Default for LinearTransition {
    fn default() -> LinearTransition {
        LinearTransition::new()
    }
}

impl RoundTransition for LinearTransition {
    fn branch(&self, _round: usize, mask: Mask) -> Branch {
        let rows = [
            &self.agreements[mask.nibble(0)],
            &self.agreements[mask.nibble(1)],
            &self.agreements[mask.nibble(2)],
            &self.agreements[mask.nibble(3)],
        ];
        let mut branch = Branch::new();
        for output in 0..=u16::MAX as usize {
            let e = [
                rows[0][output & 0xF],
                rows[1][(output >> 4) & 0xF],
                rows[2][(output >> 8) & 0xF],
                rows[3][(output >> 12) & 0xF],
            ];
            let z = [16 - e[0], 16 - e[1], 16 - e[2], 16 - e[3]];
            // Number of the 16^4 nibble combinations on which the two
            // parities disagree: the terms with an odd number of
            // per-nibble disagreements.
            let disagreements = z[0] * e[1] * e[2] * e[3]
                + e[0] * z[1] * e[2] * e[3]
                + e[0] * e[1] * z[2] * e[3]
                + e[0] * e[1] * e[2] * z[3]
                + z[0] * z[1] * z[2] * e[3]
                + z[0] * z[1] * e[2] * z[3]
                + z[0] * e[1] * z[2] * z[3]
                + e[0] * z[1] * z[2] * z[3];
            if disagreements == 0x8000 {
                continue;
            }
            let correlation = 1.0 - disagreements as f64 / 32768.0;
            branch.insert(Mask(permute(output as u16)), correlation * correlation);
        }
        branch
    }
}
