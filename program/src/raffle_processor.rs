use crate::raffle_error::RaffleError;
use crate::raffle_event::RaffleEvent;
use crate::raffle_instruction::RaffleInstruction;
use crate::raffle_state::{Raffle, RaffleConfig, RAFFLE_SEED};
use crate::settlement::FundsTransfer;
use crate::utils::{find_raffle_address, RandomWord};
use crate::vrf::CoordinatorCpi;

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

/// Pays out of the program-owned raffle account by moving lamports directly. The recipient
/// is rejected when the runtime would refuse the credit: executable or read-only accounts, or
/// a balance that ends below rent exemption.
pub struct LamportPayout<'a, 'b> {
    pub pool: &'a AccountInfo<'b>,
    pub recipient: &'a AccountInfo<'b>,
    pub rent: Rent,
}

impl<'a, 'b> FundsTransfer for LamportPayout<'a, 'b> {
    fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), RaffleError> {
        if self.recipient.key != recipient {
            return Err(RaffleError::WinnerAccountMismatch);
        }
        if self.recipient.executable || !self.recipient.is_writable {
            msg!("Recipient {} cannot receive lamports", recipient);
            return Err(RaffleError::PayoutTransferFailed);
        }

        let recipient_balance = self
            .recipient
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleError::ArithmeticOverflow)?;
        if !self.rent.is_exempt(recipient_balance, self.recipient.data_len()) {
            msg!(
                "Recipient {} would hold {} lamports, below rent exemption",
                recipient,
                recipient_balance
            );
            return Err(RaffleError::PayoutTransferFailed);
        }

        let pool_balance = self
            .pool
            .lamports()
            .checked_sub(amount)
            .ok_or(RaffleError::PayoutTransferFailed)?;
        if !self.rent.is_exempt(pool_balance, self.pool.data_len()) {
            msg!("Raffle account would drop below rent exemption");
            return Err(RaffleError::PayoutTransferFailed);
        }

        **self
            .pool
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::PayoutTransferFailed)? = pool_balance;
        **self
            .recipient
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::PayoutTransferFailed)? = recipient_balance;
        Ok(())
    }
}

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle { config } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(accounts, config, program_id)
            }
            RaffleInstruction::EnterRaffle { fee } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(accounts, fee, program_id)
            }
            RaffleInstruction::CheckUpkeep {} => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(accounts, program_id)
            }
            RaffleInstruction::PerformUpkeep {} => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, program_id)
            }
            RaffleInstruction::FulfillRandomness {
                request_id,
                random_word,
            } => {
                msg!("Instruction: Fulfill Randomness");
                Self::process_fulfill_randomness(accounts, request_id, random_word, program_id)
            }
            RaffleInstruction::RetryPayout {} => {
                msg!("Instruction: Retry Payout");
                Self::process_retry_payout(accounts, program_id)
            }
            RaffleInstruction::DrainFailedPayout {} => {
                msg!("Instruction: Drain Failed Payout");
                Self::process_drain_failed_payout(accounts, program_id)
            }
        }
    }

    fn load_raffle(raffle_info: &AccountInfo, program_id: &Pubkey) -> Result<Raffle, ProgramError> {
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by the program");
            return Err(ProgramError::IncorrectProgramId);
        }
        let data = raffle_info.try_borrow_data()?;
        Raffle::unpack_account(&data)
    }

    fn save_raffle(raffle: &Raffle, raffle_info: &AccountInfo) -> ProgramResult {
        let mut data = raffle_info.try_borrow_mut_data()?;
        raffle.pack_into_account(&mut data)
    }

    fn process_initialize_raffle(
        accounts: &[AccountInfo],
        config: RaffleConfig,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected_raffle_pubkey, bump_seed) = find_raffle_address(program_id);
        if *raffle_info.key != expected_raffle_pubkey {
            msg!("Invalid raffle account address");
            return Err(ProgramError::InvalidArgument);
        }
        if raffle_info.owner == program_id {
            msg!("Raffle account is already initialized");
            return Err(RaffleError::RaffleAlreadyInitialized.into());
        }

        config.validate()?;

        let space = Raffle::space(config.max_participants);
        let rent = Rent::get()?;
        invoke_signed(
            &system_instruction::create_account(
                authority_info.key,
                raffle_info.key,
                rent.minimum_balance(space),
                space as u64,
                program_id,
            ),
            &[
                authority_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
            &[&[RAFFLE_SEED, &[bump_seed]]],
        )?;

        let clock = Clock::get()?;
        let raffle = Raffle::new(*authority_info.key, bump_seed, config, clock.unix_timestamp);
        Self::save_raffle(&raffle, raffle_info)?;

        msg!(
            "Raffle initialized: Authority={}, EntryFee={}, Interval={}s, Coordinator={}",
            authority_info.key,
            config.entry_fee,
            config.interval_seconds,
            config.oracle.coordinator_program
        );
        Ok(())
    }

    fn process_enter_raffle(
        accounts: &[AccountInfo],
        fee: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let participant_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !participant_info.is_signer {
            msg!("Participant must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = Self::load_raffle(raffle_info, program_id)?;
        let event = raffle.enter(*participant_info.key, fee)?;

        invoke(
            &system_instruction::transfer(
                participant_info.key,
                raffle_info.key,
                raffle.entry_fee(),
            ),
            &[
                participant_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        Self::save_raffle(&raffle, raffle_info)?;
        event.emit();
        Ok(())
    }

    fn process_check_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        let raffle = Self::load_raffle(raffle_info, program_id)?;
        let clock = Clock::get()?;
        let upkeep_needed = raffle.log_upkeep(clock.unix_timestamp);

        set_return_data(&[upkeep_needed as u8]);
        Ok(())
    }

    fn process_perform_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_program_info = next_account_info(account_info_iter)?;
        let remaining_accounts = account_info_iter.as_slice();

        // Anyone can trigger upkeep; the eligibility check is the only gate
        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = Self::load_raffle(raffle_info, program_id)?;
        if *coordinator_program_info.key != raffle.config.oracle.coordinator_program {
            msg!(
                "Coordinator {} does not match the configured {}",
                coordinator_program_info.key,
                raffle.config.oracle.coordinator_program
            );
            return Err(RaffleError::UnknownCoordinator.into());
        }

        let mut oracle = CoordinatorCpi {
            coordinator_program: coordinator_program_info,
            raffle: raffle_info,
            raffle_bump: raffle.bump,
            remaining_accounts,
        };
        let clock = Clock::get()?;
        let event = raffle.try_close_round(clock.unix_timestamp, &mut oracle)?;

        Self::save_raffle(&raffle, raffle_info)?;
        event.emit();
        Ok(())
    }

    fn process_fulfill_randomness(
        accounts: &[AccountInfo],
        request_id: u64,
        random_word: RandomWord,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let oracle_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        let mut raffle = Self::load_raffle(raffle_info, program_id)?;
        if !oracle_info.is_signer
            || *oracle_info.key != raffle.config.oracle.coordinator_authority
        {
            msg!("Randomness must be signed by {}", raffle.config.oracle.coordinator_authority);
            return Err(RaffleError::UnauthorizedOracle.into());
        }

        let winner = raffle.winner_for(request_id, &random_word)?;
        if winner != *winner_info.key {
            msg!("Winner is {}, got account {}", winner, winner_info.key);
            return Err(RaffleError::WinnerAccountMismatch.into());
        }

        let mut payout = LamportPayout {
            pool: raffle_info,
            recipient: winner_info,
            rent: Rent::get()?,
        };
        let clock = Clock::get()?;
        let event = match raffle.on_randomness_ready(
            request_id,
            &random_word,
            clock.unix_timestamp,
            &mut payout,
        ) {
            Ok(event) => event,
            // Commit the halt so the funds stay recoverable and the request cannot be replayed
            Err(err) if err == ProgramError::from(RaffleError::PayoutTransferFailed) => {
                let failed = raffle.failed_payout().copied().ok_or(RaffleError::NoFailedPayout)?;
                RaffleEvent::PayoutHalted {
                    winner: failed.winner,
                    amount: failed.amount,
                }
            }
            Err(err) => return Err(err),
        };

        Self::save_raffle(&raffle, raffle_info)?;
        event.emit();
        Ok(())
    }

    fn process_retry_payout(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = Self::load_raffle(raffle_info, program_id)?;
        if let Some(failed) = raffle.failed_payout() {
            if failed.winner != *winner_info.key {
                msg!("Winner is {}, got account {}", failed.winner, winner_info.key);
                return Err(RaffleError::WinnerAccountMismatch.into());
            }
        }

        let mut payout = LamportPayout {
            pool: raffle_info,
            recipient: winner_info,
            rent: Rent::get()?,
        };
        let clock = Clock::get()?;
        let event = raffle.retry_payout(clock.unix_timestamp, &mut payout)?;

        Self::save_raffle(&raffle, raffle_info)?;
        event.emit();
        Ok(())
    }

    fn process_drain_failed_payout(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let destination_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = Self::load_raffle(raffle_info, program_id)?;
        let mut payout = LamportPayout {
            pool: raffle_info,
            recipient: destination_info,
            rent: Rent::get()?,
        };
        let clock = Clock::get()?;
        let event = raffle.drain_failed_payout(
            authority_info.key,
            destination_info.key,
            clock.unix_timestamp,
            &mut payout,
        )?;

        Self::save_raffle(&raffle, raffle_info)?;
        event.emit();
        Ok(())
    }
}
