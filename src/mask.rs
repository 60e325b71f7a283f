use std::fmt;

use serde::{Deserialize, Serialize};

/// A 16-bit difference or linear mask over the cipher state.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mask(pub u16);

impl Mask {
    #[allow(dead_code)]
    #[inline]
    pub fn nibble(self, index: usize) -> usize {
        ((self.0 >> (4 * index)) & 0xF) as usize
    }

    #[allow(dead_code)]
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[allow(dead_code)]
    pub fn all_nibbles_active(self) -> bool {
        (0..4).all(|i| self.nibble(i) != 0)
    }
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// A candidate value for one 16-bit round key.
#[allow(dead_code)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyGuess(pub u16);

impl fmt::Display for KeyGuess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

#[allow(dead_code)]
#[inline]
pub fn parity(word: u16) -> u16 {
    (word.count_ones() & 1) as u16
}

#[cfg(test)]
mod tests {
    use crate::mask::{parity, Mask};

    #[test]
    fn nibbles_are_least_significant_first() {
        let mask = Mask(0xabcd);
        assert_eq!(mask.nibble(0), 0xd);
        assert_eq!(mask.nibble(1), 0xc);
        assert_eq!(mask.nibble(2), 0xb);
        assert_eq!(mask.nibble(3), 0xa);
    }

    #[test]
    fn active_nibble_detection() {
        assert!(Mask(0x1111).all_nibbles_active());
        assert!(Mask(0xf63a).all_nibbles_active());
        assert!(!Mask(0x1011).all_nibbles_active());
        assert!(!Mask(0x0c00).all_nibbles_active());
    }

    #[test]
    fn parity_counts_set_bits_mod_two() {
        assert_eq!(parity(0x0000), 0);
        assert_eq!(parity(0x0001), 1);
        assert_eq!(parity(0x0003), 0);
        assert_eq!(parity(0x8f42), parity(0x8f40) ^ parity(0x0002));
        assert_eq!(parity(0xffff), 0);
    }
}
