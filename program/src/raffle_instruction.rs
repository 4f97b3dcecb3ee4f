use solana_program::{
    instruction::{AccountMeta, Instruction},
    msg,
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;

use crate::{raffle_error::RaffleError, raffle_state::RaffleConfig, utils::RandomWord};

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create the raffle account and fix its configuration
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The authority, pays for the raffle account
    /// 1. `[writable]` The raffle account (PDA of `b"raffle"`)
    /// 2. `[]` The system program
    InitializeRaffle {
        config: RaffleConfig,
    },

    /// Enter the open round, paying the entry fee into the pool
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The participant, pays the fee
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle {
        /// Most the participant is willing to pay; only the entry fee is debited
        fee: u64,
    },

    /// Report whether the round can be closed. Writes one byte of return data (1 = needed).
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep {},

    /// Close the round and request randomness (anyone may call)
    ///
    /// Accounts expected:
    /// 0. `[signer]` The caller
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The coordinator program
    /// Remaining accounts are forwarded to the coordinator
    PerformUpkeep {},

    /// Deliver the random word for the pending request, paying the winner
    ///
    /// Accounts expected:
    /// 0. `[signer]` The coordinator authority
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The winner
    FulfillRandomness {
        request_id: u64,
        random_word: RandomWord,
    },

    /// Retry a halted payout to the drawn winner (anyone may call)
    ///
    /// Accounts expected:
    /// 0. `[signer]` The caller
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The winner
    RetryPayout {},

    /// Send a halted payout to another account (authority only)
    ///
    /// Accounts expected:
    /// 0. `[signer]` The raffle authority
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The destination
    DrainFailedPayout {},
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input.split_first().ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let config = rest
                    .get(..RaffleConfig::LEN)
                    .ok_or(ProgramError::InvalidInstructionData)?;
                Self::InitializeRaffle {
                    config: RaffleConfig::unpack_from_slice(config)?,
                }
            }
            1 => {
                let (fee, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { fee }
            }
            2 => Self::CheckUpkeep {},
            3 => Self::PerformUpkeep {},
            4 => {
                let (request_id, rest) = Self::unpack_u64(rest)?;
                let (random_word, _) = Self::unpack_fixed_bytes::<32>(rest)?;
                Self::FulfillRandomness {
                    request_id,
                    random_word,
                }
            }
            5 => Self::RetryPayout {},
            6 => Self::DrainFailedPayout {},
            _ => {
                msg!("Unknown raffle instruction tag {}", tag);
                return Err(RaffleError::InvalidInstructionData.into());
            }
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Self::InitializeRaffle { config } => {
                buf.push(0);
                let mut packed = [0u8; RaffleConfig::LEN];
                config.pack_into_slice(&mut packed);
                buf.extend_from_slice(&packed);
            }
            Self::EnterRaffle { fee } => {
                buf.push(1);
                buf.extend_from_slice(&fee.to_le_bytes());
            }
            Self::CheckUpkeep {} => buf.push(2),
            Self::PerformUpkeep {} => buf.push(3),
            Self::FulfillRandomness {
                request_id,
                random_word,
            } => {
                buf.push(4);
                buf.extend_from_slice(&request_id.to_le_bytes());
                buf.extend_from_slice(random_word);
            }
            Self::RetryPayout {} => buf.push(5),
            Self::DrainFailedPayout {} => buf.push(6),
        }
        buf
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<8>(input)?;
        Ok((u64::from_le_bytes(bytes), rest))
    }

    fn unpack_fixed_bytes<const N: usize>(input: &[u8]) -> Result<([u8; N], &[u8]), ProgramError> {
        if input.len() < N {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (bytes, rest) = input.split_at(N);
        let bytes: [u8; N] = bytes
            .try_into()
            .map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok((bytes, rest))
    }
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    authority: &Pubkey,
    raffle_account: &Pubkey,
    config: RaffleConfig,
) -> Instruction {
    let data = RaffleInstruction::InitializeRaffle { config }.pack();

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create enter_raffle instruction
pub fn enter_raffle(
    program_id: &Pubkey,
    participant: &Pubkey,
    raffle_account: &Pubkey,
    fee: u64,
) -> Instruction {
    let data = RaffleInstruction::EnterRaffle { fee }.pack();

    let accounts = vec![
        AccountMeta::new(*participant, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, raffle_account: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*raffle_account, false)],
        data: RaffleInstruction::CheckUpkeep {}.pack(),
    }
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    caller: &Pubkey,
    raffle_account: &Pubkey,
    coordinator_program: &Pubkey,
    remaining_accounts: &[AccountMeta],
) -> Instruction {
    let data = RaffleInstruction::PerformUpkeep {}.pack();

    let mut accounts = vec![
        AccountMeta::new_readonly(*caller, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(*coordinator_program, false),
    ];
    accounts.extend_from_slice(remaining_accounts);

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create fulfill_randomness instruction
pub fn fulfill_randomness(
    program_id: &Pubkey,
    coordinator_authority: &Pubkey,
    raffle_account: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_word: RandomWord,
) -> Instruction {
    let data = RaffleInstruction::FulfillRandomness {
        request_id,
        random_word,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new_readonly(*coordinator_authority, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new(*winner, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create retry_payout instruction
pub fn retry_payout(
    program_id: &Pubkey,
    caller: &Pubkey,
    raffle_account: &Pubkey,
    winner: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*caller, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new(*winner, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: RaffleInstruction::RetryPayout {}.pack(),
    }
}

/// Create drain_failed_payout instruction
pub fn drain_failed_payout(
    program_id: &Pubkey,
    authority: &Pubkey,
    raffle_account: &Pubkey,
    destination: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new(*destination, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: RaffleInstruction::DrainFailedPayout {}.pack(),
    }
}
