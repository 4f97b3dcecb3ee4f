// Raffle Engine - Pool Ledger
use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    raffle_error::RaffleError,
    raffle_event::RaffleEvent,
    raffle_state::{Pool, Raffle, RoundState},
};

impl Pool {
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn current_balance(&self) -> u64 {
        self.balance
    }

    pub fn participant_at(&self, index: usize) -> Result<Pubkey, ProgramError> {
        self.participants.get(index).copied().ok_or_else(|| {
            msg!("Participant index {} out of range ({} entries)", index, self.participants.len());
            RaffleError::IndexOutOfRange.into()
        })
    }

    /// Whether the balance accounts for exactly one fee per entry
    pub fn is_consistent(&self, entry_fee: u64) -> bool {
        (self.participants.len() as u64)
            .checked_mul(entry_fee)
            .map_or(false, |expected| expected == self.balance)
    }

    fn admit(&mut self, participant: Pubkey, fee: u64) -> Result<(), ProgramError> {
        let balance = self
            .balance
            .checked_add(fee)
            .ok_or(RaffleError::ArithmeticOverflow)?;
        self.participants.push(participant);
        self.balance = balance;
        Ok(())
    }

    /// Empty the ledger for a new round starting at `now`
    pub(crate) fn clear(&mut self, now: UnixTimestamp) {
        self.participants.clear();
        self.balance = 0;
        self.last_close_timestamp = now;
    }
}

impl Raffle {
    /// Admit `participant` for one entry. `fee_paid` is what the participant offers; only the
    /// configured entry fee is pooled.
    pub fn enter(
        &mut self,
        participant: Pubkey,
        fee_paid: u64,
    ) -> Result<RaffleEvent, ProgramError> {
        if self.round_state() != RoundState::Open {
            msg!("Raffle is not open for entries ({:?})", self.round_state());
            return Err(RaffleError::RoundNotOpen.into());
        }
        if fee_paid < self.config.entry_fee {
            msg!(
                "Fee {} is below the entry fee of {} lamports",
                fee_paid,
                self.config.entry_fee
            );
            return Err(RaffleError::InsufficientFee.into());
        }
        if self.pool.participant_count() >= self.config.max_participants as usize {
            msg!("Raffle is full with {} entries", self.pool.participant_count());
            return Err(RaffleError::PoolFull.into());
        }

        self.pool.admit(participant, self.config.entry_fee)?;

        Ok(RaffleEvent::RaffleEntered {
            participant,
            pool_size: self.pool.participant_count() as u64,
        })
    }

    pub fn participant_at(&self, index: usize) -> Result<Pubkey, ProgramError> {
        self.pool.participant_at(index)
    }

    pub fn participant_count(&self) -> usize {
        self.pool.participant_count()
    }

    pub fn current_balance(&self) -> u64 {
        self.pool.current_balance()
    }
}
