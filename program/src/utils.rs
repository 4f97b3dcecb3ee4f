// Raffle Engine - Utility Functions
use solana_program::pubkey::Pubkey;

use crate::raffle_state::RAFFLE_SEED;

/// A random word as delivered by the coordinator: a 256-bit big-endian unsigned integer
pub type RandomWord = [u8; 32];

/// Widen a u64 into a random word
pub fn random_word_from_u64(value: u64) -> RandomWord {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// `word mod modulus`, computed over the full 256 bits
pub fn random_word_mod(word: &RandomWord, modulus: u64) -> u64 {
    if modulus == 0 {
        return 0;
    }
    let modulus = modulus as u128;
    word.iter()
        .fold(0u128, |remainder, byte| ((remainder << 8) | *byte as u128) % modulus) as u64
}

/// Find the program derived address of the raffle
pub fn find_raffle_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[RAFFLE_SEED], program_id)
}
