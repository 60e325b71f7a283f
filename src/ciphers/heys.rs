use rand::RngCore;
use rand_chacha::ChaCha8Rng;

use crate::ciphers::SymmetricCipher;

pub type Block = u16;

/// Keyed data rounds; a final whitening key follows them.
pub const ROUNDS: usize = 6;
pub const ROUND_KEY_COUNT: usize = ROUNDS + 1;

pub type RoundKeys = [Block; ROUND_KEY_COUNT];

#[allow(dead_code)]
pub const DEFAULT_ROUND_KEYS: RoundKeys =
    [0x391a, 0xd01e, 0x1cc9, 0x467f, 0x0553, 0xc131, 0x8f42];

const HEYS_SBOX: [u8; 16] = [
    0x1, 0xa, 0xd, 0x9, 0xb, 0x0, 0x3, 0x7, 0x8, 0xc, 0xf, 0x4, 0x6, 0x2, 0x5, 0xe,
];

const HEYS_SBOX_INV: [u8; 16] = [
    0x5, 0x0, 0xd, 0x6, 0xb, 0xe, 0xc, 0x7, 0x8, 0x3, 0x1, 0x4, 0x9, 0x2, 0xf, 0xa,
];

#[inline]
pub fn sbox(nibble: u16) -> u16 {
    HEYS_SBOX[(nibble & 0xF) as usize] as u16
}

#[allow(dead_code)]
#[inline]
pub fn sbox_inv(nibble: u16) -> u16 {
    HEYS_SBOX_INV[(nibble & 0xF) as usize] as u16
}

#[inline]
pub fn substitute(block: Block) -> Block {
    sbox(block & 0xF)
        | sbox(block >> 4 & 0xF) << 4
        | sbox(block >> 8 & 0xF) << 8
        | sbox(block >> 12) << 12
}

#[allow(dead_code)]
#[inline]
pub fn substitute_inv(block: Block) -> Block {
    sbox_inv(block & 0xF)
        | sbox_inv(block >> 4 & 0xF) << 4
        | sbox_inv(block >> 8 & 0xF) << 8
        | sbox_inv(block >> 12) << 12
}

/// Transpose of the state seen as a 4x4 bit matrix: bit `i` of nibble
/// `n` moves to bit `n` of nibble `i`. Its own inverse.
#[inline]
pub fn permute(block: Block) -> Block {
    let mut out = 0;
    for nibble in 0..4 {
        for bit in 0..4 {
            if block >> (4 * nibble + bit) & 1 != 0 {
                out |= 1 << (4 * bit + nibble);
            }
        }
    }
    out
}

#[allow(dead_code)]
pub fn random_round_keys(rand: &mut ChaCha8Rng) -> RoundKeys {
    let mut keys = [0; ROUND_KEY_COUNT];
    for key in keys.iter_mut() {
        *key = rand.next_u32() as Block;
    }
    keys
}

/// The cipher with its substitution/permutation layer flattened into
/// 2^16-entry lookup tables, shared read-only by the engines.
pub struct Heys {
    forward: Vec<Block>,
    inverse: Vec<Block>,
}

impl Heys {
    pub fn new() -> Heys {
        let forward: Vec<Block> = (0..=u16::MAX).map(|block| permute(substitute(block))).collect();
        let mut inverse = vec![0; 1 << 16];
        for (input, &output) in forward.iter().enumerate() {
            inverse[output as usize] = input as Block;
        }
        Heys { forward, inverse }
    }

    #[inline]
    pub fn substitute_permute(&self, block: Block) -> Block {
        self.forward[block as usize]
    }

    #[allow(dead_code)]
    #[inline]
    pub fn invert_substitute_permute(&self, block: Block) -> Block {
        self.inverse[block as usize]
    }

    #[allow(dead_code)]
    pub fn round_transform(&self, block: Block, keys: &RoundKeys, round: usize) -> Block {
        assert!(round < ROUND_KEY_COUNT);
        if round == ROUNDS {
            block ^ keys[ROUNDS]
        } else {
            self.substitute_permute(block ^ keys[round])
        }
    }

    #[allow(dead_code)]
    pub fn round_transform_inv(&self, block: Block, keys: &RoundKeys, round: usize) -> Block {
        assert!(round < ROUND_KEY_COUNT);
        if round == ROUNDS {
            block ^ keys[ROUNDS]
        } else {
            self.invert_substitute_permute(block) ^ keys[round]
        }
    }

    #[allow(dead_code)]
    pub fn encrypt_block(&self, block: Block, keys: &RoundKeys) -> Block {
        (0..ROUND_KEY_COUNT).fold(block, |state, round| self.round_transform(state, keys, round))
    }

    #[allow(dead_code)]
    pub fn decrypt_block(&self, block: Block, keys: &RoundKeys) -> Block {
        (0..ROUND_KEY_COUNT)
            .rev()
            .fold(block, |state, round| self.round_transform_inv(state, keys, round))
    }
}

impl Default for Heys {
    fn default() -> Heys {
        Heys::new()
    }
}

impl SymmetricCipher<RoundKeys, Block> for Heys {
    fn cipher(&self, key: &RoundKeys, block: &mut Block) {
        *block = self.encrypt_block(*block, key);
    }

    fn decipher(&self, key: &RoundKeys, block: &mut Block) {
        *block = self.decrypt_block(*block, key);
    }
}

#[cfg(test)]
mod tests {
    use rand::{RngCore, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;

    use crate::ciphers::heys::{
        permute, sbox, sbox_inv, substitute, substitute_inv, Heys, DEFAULT_ROUND_KEYS,
    };
    use crate::ciphers::SymmetricCipher;

    #[test]
    fn sbox_is_a_bijection() {
        let mut images: Vec<u16> = (0..16).map(sbox).collect();
        images.sort_unstable();
        assert_eq!(images, (0..16).collect::<Vec<_>>());
        for nibble in 0..16 {
            assert_eq!(sbox_inv(sbox(nibble)), nibble);
        }
    }

    #[test]
    fn permutation_is_an_involution() {
        for block in [0x0001, 0x8000, 0x0c00, 0x1111, 0xffff, 0x5a5a] {
            assert_eq!(permute(permute(block)), block);
        }
        assert_eq!(permute(0x000f), 0x1111);
        assert_eq!(permute(0xf000), 0x8888);
    }

    #[test]
    fn substitution_layers_invert_each_other() {
        for block in (0..=u16::MAX).step_by(97) {
            assert_eq!(substitute_inv(substitute(block)), block);
        }
    }

    #[test]
    fn encrypt_then_decrypt_is_identity() {
        let cipher = Heys::new();
        let mut rand = Xoshiro256StarStar::seed_from_u64(42);
        let mut keys = DEFAULT_ROUND_KEYS;
        for _ in 0..8 {
            for block in [0x0000, 0xffff, rand.next_u32() as u16, rand.next_u32() as u16] {
                let encrypted = cipher.encrypt_block(block, &keys);
                assert_eq!(cipher.decrypt_block(encrypted, &keys), block);
            }
            for key in keys.iter_mut() {
                *key = rand.next_u32() as u16;
            }
        }
    }

    #[test]
    fn cipher_trait_mutates_in_place() {
        let cipher = Heys::new();
        let mut block = 0x1234;
        cipher.cipher(&DEFAULT_ROUND_KEYS, &mut block);
        assert_eq!(block, cipher.encrypt_block(0x1234, &DEFAULT_ROUND_KEYS));
        cipher.decipher(&DEFAULT_ROUND_KEYS, &mut block);
        assert_eq!(block, 0x1234);
    }

    #[test]
    fn known_answer_vectors() {
        let cipher = Heys::new();
        for (plaintext, ciphertext) in [
            (0x0000, 0xae67),
            (0x0c00, 0x6e4b),
            (0x1234, 0xd59e),
            (0xbeef, 0x2f56),
            (0xffff, 0x5198),
        ] {
            assert_eq!(cipher.encrypt_block(plaintext, &DEFAULT_ROUND_KEYS), ciphertext);
            assert_eq!(cipher.decrypt_block(ciphertext, &DEFAULT_ROUND_KEYS), plaintext);
        }
    }

    #[test]
    fn all_ones_block_does_not_map_to_itself() {
        let cipher = Heys::new();
        assert_ne!(cipher.encrypt_block(0xffff, &DEFAULT_ROUND_KEYS), 0xffff);
    }

    #[test]
    fn round_transforms_compose_to_the_full_cipher() {
        let cipher = Heys::new();
        let mut state = 0xbeef;
        for round in 0..7 {
            state = cipher.round_transform(state, &DEFAULT_ROUND_KEYS, round);
        }
        assert_eq!(state, cipher.encrypt_block(0xbeef, &DEFAULT_ROUND_KEYS));
    }
}
