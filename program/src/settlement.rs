// Raffle Engine - Settlement
use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    raffle_error::RaffleError,
    raffle_event::RaffleEvent,
    raffle_state::{FailedPayout, Raffle, RoundHistory, RoundStatus},
    utils::{random_word_mod, RandomWord},
};

/// Moves pool funds to a recipient. An error means the recipient could not be paid and no
/// funds moved.
pub trait FundsTransfer {
    fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), RaffleError>;
}

/// Index of the winning entry: the random word modulo the entry count. Counts that do not
/// divide 2^256 carry a slight bias toward low indices.
///
/// Callers must never pass an empty pool: the `0` returned for a count of zero is not an
/// index into anything.
pub fn select_winner_index(random_word: &RandomWord, participant_count: usize) -> usize {
    if participant_count == 0 {
        return 0;
    }
    random_word_mod(random_word, participant_count as u64) as usize
}

impl Raffle {
    /// Resolve the winner for a delivery of `random_word` under `request_id`
    pub fn winner_for(
        &self,
        request_id: u64,
        random_word: &RandomWord,
    ) -> Result<Pubkey, ProgramError> {
        match self.pending_request() {
            Some(pending) if pending.request_id == request_id => {}
            Some(pending) => {
                msg!("Request {} is not pending (expected {})", request_id, pending.request_id);
                return Err(RaffleError::UnknownRequest.into());
            }
            None => {
                msg!("No randomness request pending, got {}", request_id);
                return Err(RaffleError::UnknownRequest.into());
            }
        }
        let index = select_winner_index(random_word, self.pool.participant_count());
        msg!("Winner index {} of {}", index, self.pool.participant_count());
        self.pool.participant_at(index)
    }

    /// Pick the winner, pay out the pool and reopen. If the payout is rejected the round halts
    /// in `PayoutFailed` with the funds still in the pool and `PayoutTransferFailed` is returned.
    pub fn on_randomness_ready<T: FundsTransfer>(
        &mut self,
        request_id: u64,
        random_word: &RandomWord,
        now: UnixTimestamp,
        payout: &mut T,
    ) -> Result<RaffleEvent, ProgramError> {
        let winner = self.winner_for(request_id, random_word)?;
        let amount = self.pool.balance;

        if let Err(err) = payout.transfer(&winner, amount) {
            msg!("Payout of {} lamports to {} rejected: {}", amount, winner, err);
            self.status = RoundStatus::PayoutFailed(FailedPayout { winner, amount });
            return Err(RaffleError::PayoutTransferFailed.into());
        }

        self.finish_round(winner, amount, now);
        Ok(RaffleEvent::WinnerPicked { winner, amount })
    }

    /// Pay a held-back payout to the drawn winner
    pub fn retry_payout<T: FundsTransfer>(
        &mut self,
        now: UnixTimestamp,
        payout: &mut T,
    ) -> Result<RaffleEvent, ProgramError> {
        let FailedPayout { winner, amount } = *self
            .failed_payout()
            .ok_or(RaffleError::NoFailedPayout)?;

        if let Err(err) = payout.transfer(&winner, amount) {
            msg!("Retried payout to {} rejected: {}", winner, err);
            return Err(RaffleError::PayoutTransferFailed.into());
        }

        self.finish_round(winner, amount, now);
        Ok(RaffleEvent::WinnerPicked { winner, amount })
    }

    /// Send a held-back payout to `destination` on the authority's instruction
    pub fn drain_failed_payout<T: FundsTransfer>(
        &mut self,
        authority: &Pubkey,
        destination: &Pubkey,
        now: UnixTimestamp,
        payout: &mut T,
    ) -> Result<RaffleEvent, ProgramError> {
        if *authority != self.authority {
            msg!("Only the raffle authority {} can drain a payout", self.authority);
            return Err(RaffleError::NotRaffleAuthority.into());
        }
        let FailedPayout { winner, amount } = *self
            .failed_payout()
            .ok_or(RaffleError::NoFailedPayout)?;

        if let Err(err) = payout.transfer(destination, amount) {
            msg!("Drain to {} rejected: {}", destination, err);
            return Err(RaffleError::PayoutTransferFailed.into());
        }

        self.finish_round(winner, amount, now);
        Ok(RaffleEvent::PayoutDrained {
            winner,
            destination: *destination,
            amount,
        })
    }

    /// Bookkeeping after funds have left the pool; must not fail
    fn finish_round(&mut self, winner: Pubkey, amount: u64, now: UnixTimestamp) {
        self.history = RoundHistory {
            recent_winner: winner,
            last_payout: amount,
            last_close_timestamp: now,
            rounds_completed: self.history.rounds_completed.saturating_add(1),
        };
        self.pool.clear(now);
        self.status = RoundStatus::Open;
    }
}
