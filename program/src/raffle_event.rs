use borsh::BorshSerialize;
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

/// Observations published for indexers. Nothing in the program reads them back.
#[derive(BorshSerialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    RaffleEntered { participant: Pubkey, pool_size: u64 },
    RoundClosing { request_id: u64 },
    WinnerPicked { winner: Pubkey, amount: u64 },
    PayoutHalted { winner: Pubkey, amount: u64 },
    PayoutDrained { winner: Pubkey, destination: Pubkey, amount: u64 },
}

impl RaffleEvent {
    /// Log a readable line plus the borsh-encoded event
    pub fn emit(&self) {
        match self {
            RaffleEvent::RaffleEntered { participant, pool_size } => {
                msg!("Raffle entered: {} ({} entries)", participant, pool_size)
            }
            RaffleEvent::RoundClosing { request_id } => {
                msg!("Round closing, requested randomness: {}", request_id)
            }
            RaffleEvent::WinnerPicked { winner, amount } => {
                msg!("Winner picked: {} won {} lamports", winner, amount)
            }
            RaffleEvent::PayoutHalted { winner, amount } => {
                msg!("Payout of {} lamports to {} halted", amount, winner)
            }
            RaffleEvent::PayoutDrained { winner, destination, amount } => {
                msg!("Payout of {} lamports for {} drained to {}", amount, winner, destination)
            }
        }
        if let Ok(data) = borsh::to_vec(self) {
            sol_log_data(&[&data]);
        }
    }
}
