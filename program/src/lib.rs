// Raffle Engine
// A single-round raffle settled with oracle randomness: entries pool a fixed fee, upkeep closes
// the round and requests a random word, fulfilment pays the whole pool to one winner.

// Raffle engine state machine
pub mod raffle_state;
pub mod pool;
pub mod eligibility;
pub mod coordinator;
pub mod settlement;
pub mod raffle_event;
pub mod raffle_error;
pub mod utils;

// On-chain surface
pub mod raffle_instruction;
pub mod raffle_processor;
pub mod raffle_entrypoint;

// VRF coordinator client
pub mod vrf;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    raffle_processor::Processor::process(program_id, accounts, instruction_data)
}
