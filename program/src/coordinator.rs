// Raffle Engine - Resolution Coordinator
use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError};

use crate::{
    raffle_error::RaffleError,
    raffle_event::RaffleEvent,
    raffle_state::{PendingRequest, Raffle, RoundStatus},
};

/// Random words asked for per round
pub const NUM_WORDS: u32 = 1;

/// Confirmations the coordinator waits for before answering
pub const REQUEST_CONFIRMATIONS: u16 = 3;

/// A request for random words, as submitted to the coordinator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomnessRequest {
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
    /// Raffle-side sequence number of the request
    pub nonce: u64,
}

/// Source of randomness. `request` returns immediately with the id the random words will
/// later be delivered under.
pub trait RandomnessOracle {
    fn request(&mut self, request: &RandomnessRequest) -> Result<u64, ProgramError>;
}

impl Raffle {
    pub fn num_words(&self) -> u32 {
        NUM_WORDS
    }

    pub fn request_confirmations(&self) -> u16 {
        REQUEST_CONFIRMATIONS
    }

    /// Close the open round and request randomness for it. Eligibility is re-checked here no
    /// matter what an earlier probe said.
    pub fn try_close_round<O: RandomnessOracle>(
        &mut self,
        now: UnixTimestamp,
        oracle: &mut O,
    ) -> Result<RaffleEvent, ProgramError> {
        if !self.log_upkeep(now) {
            return Err(RaffleError::UpkeepNotNeeded.into());
        }

        let request = RandomnessRequest {
            key_hash: self.config.oracle.gas_lane,
            subscription_id: self.config.oracle.subscription_id,
            request_confirmations: REQUEST_CONFIRMATIONS,
            callback_gas_limit: self.config.oracle.callback_gas_limit,
            num_words: NUM_WORDS,
            nonce: self.request_nonce,
        };
        let next_nonce = self
            .request_nonce
            .checked_add(1)
            .ok_or(RaffleError::ArithmeticOverflow)?;

        let request_id = oracle.request(&request)?;

        self.request_nonce = next_nonce;
        self.status = RoundStatus::AwaitingRandomness(PendingRequest {
            request_id,
            issued_at: now,
        });
        msg!(
            "Round closed with {} entries and {} lamports",
            self.pool.participant_count(),
            self.pool.balance
        );

        Ok(RaffleEvent::RoundClosing { request_id })
    }
}
