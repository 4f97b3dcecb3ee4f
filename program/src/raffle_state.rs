use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};

use crate::raffle_error::RaffleError;

/// Seed of the raffle PDA. There is exactly one raffle per program.
pub const RAFFLE_SEED: &[u8] = b"raffle";

/// Upper bound on entries per round, keeps the account under the CPI allocation limit
pub const MAX_PARTICIPANTS: u32 = 300;

/// Lifecycle of a round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundState {
    /// Accepting entries
    Open,
    /// Closed, one randomness request outstanding
    AwaitingRandomness,
    /// Winner drawn but the payout was rejected; funds are held until recovered
    PayoutFailed,
}

/// Correlation record for the single outstanding randomness request
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    /// Id handed back by the coordinator
    pub request_id: u64,
    /// When the round was closed
    pub issued_at: UnixTimestamp,
}

/// Payout held back after the winner's account rejected it
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailedPayout {
    pub winner: Pubkey,
    pub amount: u64,
}

/// Round status as stored on chain. The pending request and the held-back payout only exist
/// in the state that owns them.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundStatus {
    Open,
    AwaitingRandomness(PendingRequest),
    PayoutFailed(FailedPayout),
}

impl RoundStatus {
    pub fn state(&self) -> RoundState {
        match self {
            RoundStatus::Open => RoundState::Open,
            RoundStatus::AwaitingRandomness(_) => RoundState::AwaitingRandomness,
            RoundStatus::PayoutFailed(_) => RoundState::PayoutFailed,
        }
    }
}

/// Participants and funds of the current round
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Pool {
    /// Entrants in entry order; the order drives winner selection
    pub participants: Vec<Pubkey>,
    /// Lamports pooled by this round's entries
    pub balance: u64,
    /// When the previous round closed (or the raffle was created)
    pub last_close_timestamp: UnixTimestamp,
}

/// Outcome of the last settled round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundHistory {
    pub recent_winner: Pubkey,
    pub last_payout: u64,
    pub last_close_timestamp: UnixTimestamp,
    pub rounds_completed: u64,
}

/// Connection parameters of the randomness coordinator
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OracleConfig {
    /// Program that accepts randomness requests
    pub coordinator_program: Pubkey,
    /// The only key allowed to deliver random words
    pub coordinator_authority: Pubkey,
    /// Funding subscription billed for requests
    pub subscription_id: u64,
    /// Key hash selecting the coordinator's gas lane
    pub gas_lane: [u8; 32],
    /// Compute budget the coordinator grants the fulfilment
    pub callback_gas_limit: u32,
}

/// Raffle configuration, fixed at initialization
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Lamports debited per entry
    pub entry_fee: u64,
    /// Minimum time between round closes
    pub interval_seconds: u64,
    /// Entries a single round can hold
    pub max_participants: u32,
    pub oracle: OracleConfig,
}

impl RaffleConfig {
    pub fn validate(&self) -> ProgramResult {
        if self.entry_fee == 0 {
            msg!("Entry fee must be greater than zero");
            return Err(RaffleError::InvalidConfig.into());
        }
        if self.max_participants == 0 || self.max_participants > MAX_PARTICIPANTS {
            msg!(
                "Max participants must be between 1 and {}, got {}",
                MAX_PARTICIPANTS,
                self.max_participants
            );
            return Err(RaffleError::InvalidConfig.into());
        }
        if self.oracle.callback_gas_limit == 0 {
            msg!("Callback gas limit must be greater than zero");
            return Err(RaffleError::InvalidConfig.into());
        }
        Ok(())
    }
}

impl Sealed for RaffleConfig {}

impl Pack for RaffleConfig {
    const LEN: usize = 8 + 8 + 4 + 32 + 32 + 8 + 32 + 4;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, RaffleConfig::LEN];
        let (
            entry_fee,
            interval_seconds,
            max_participants,
            coordinator_program,
            coordinator_authority,
            subscription_id,
            gas_lane,
            callback_gas_limit,
        ) = array_refs![src, 8, 8, 4, 32, 32, 8, 32, 4];

        Ok(RaffleConfig {
            entry_fee: u64::from_le_bytes(*entry_fee),
            interval_seconds: u64::from_le_bytes(*interval_seconds),
            max_participants: u32::from_le_bytes(*max_participants),
            oracle: OracleConfig {
                coordinator_program: Pubkey::new_from_array(*coordinator_program),
                coordinator_authority: Pubkey::new_from_array(*coordinator_authority),
                subscription_id: u64::from_le_bytes(*subscription_id),
                gas_lane: *gas_lane,
                callback_gas_limit: u32::from_le_bytes(*callback_gas_limit),
            },
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, RaffleConfig::LEN];
        let (
            entry_fee_dst,
            interval_seconds_dst,
            max_participants_dst,
            coordinator_program_dst,
            coordinator_authority_dst,
            subscription_id_dst,
            gas_lane_dst,
            callback_gas_limit_dst,
        ) = mut_array_refs![dst, 8, 8, 4, 32, 32, 8, 32, 4];

        *entry_fee_dst = self.entry_fee.to_le_bytes();
        *interval_seconds_dst = self.interval_seconds.to_le_bytes();
        *max_participants_dst = self.max_participants.to_le_bytes();
        coordinator_program_dst.copy_from_slice(self.oracle.coordinator_program.as_ref());
        coordinator_authority_dst.copy_from_slice(self.oracle.coordinator_authority.as_ref());
        *subscription_id_dst = self.oracle.subscription_id.to_le_bytes();
        *gas_lane_dst = self.oracle.gas_lane;
        *callback_gas_limit_dst = self.oracle.callback_gas_limit.to_le_bytes();
    }
}

/// Raffle account data. Owns the pool and the pending request of the one live round.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Raffle {
    pub is_initialized: bool,
    /// Creator; the only key allowed to drain a failed payout
    pub authority: Pubkey,
    /// Bump of the raffle PDA
    pub bump: u8,
    pub config: RaffleConfig,
    pub status: RoundStatus,
    pub pool: Pool,
    pub history: RoundHistory,
    /// Incremented on every randomness request
    pub request_nonce: u64,
}

impl Sealed for Raffle {}

impl IsInitialized for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Raffle {
    /// Borsh size of everything except the participant list
    const FIXED_LEN: usize = 1 // is_initialized
        + 32 // authority
        + 1 // bump
        + RaffleConfig::LEN
        + 1 + 40 // largest RoundStatus variant
        + 4 + 8 + 8 // pool without participants
        + 32 + 8 + 8 + 8 // history
        + 8; // request_nonce

    pub fn new(authority: Pubkey, bump: u8, config: RaffleConfig, now: UnixTimestamp) -> Self {
        Self {
            is_initialized: true,
            authority,
            bump,
            config,
            status: RoundStatus::Open,
            pool: Pool {
                participants: Vec::new(),
                balance: 0,
                last_close_timestamp: now,
            },
            history: RoundHistory::default(),
            request_nonce: 0,
        }
    }

    /// Account size needed for a raffle holding `max_participants` entries
    pub fn space(max_participants: u32) -> usize {
        Self::FIXED_LEN + 32 * max_participants as usize
    }

    /// Decode the raffle from account data, ignoring the unused tail
    pub fn unpack_account(data: &[u8]) -> Result<Self, ProgramError> {
        let raffle =
            Self::deserialize(&mut &data[..]).map_err(|_| ProgramError::InvalidAccountData)?;
        if !raffle.is_initialized() {
            return Err(RaffleError::RaffleNotInitialized.into());
        }
        Ok(raffle)
    }

    pub fn pack_into_account(&self, dst: &mut [u8]) -> ProgramResult {
        let bytes = borsh::to_vec(self).map_err(|_| ProgramError::InvalidAccountData)?;
        if bytes.len() > dst.len() {
            msg!("Raffle needs {} bytes, account has {}", bytes.len(), dst.len());
            return Err(ProgramError::AccountDataTooSmall);
        }
        dst[..bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }

    pub fn round_state(&self) -> RoundState {
        self.status.state()
    }

    pub fn pending_request(&self) -> Option<&PendingRequest> {
        match &self.status {
            RoundStatus::AwaitingRandomness(request) => Some(request),
            _ => None,
        }
    }

    pub fn failed_payout(&self) -> Option<&FailedPayout> {
        match &self.status {
            RoundStatus::PayoutFailed(payout) => Some(payout),
            _ => None,
        }
    }

    pub fn entry_fee(&self) -> u64 {
        self.config.entry_fee
    }

    pub fn interval(&self) -> u64 {
        self.config.interval_seconds
    }

    pub fn recent_winner(&self) -> Pubkey {
        self.history.recent_winner
    }

    pub fn last_close_timestamp(&self) -> UnixTimestamp {
        self.pool.last_close_timestamp
    }
}
