// VRF coordinator integration for the raffle engine
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    account_info::AccountInfo,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{get_return_data, invoke_signed},
    program_error::ProgramError,
};

use crate::{
    coordinator::{RandomnessOracle, RandomnessRequest},
    raffle_error::RaffleError,
    raffle_state::RAFFLE_SEED,
};

/// Coordinator instruction tag for a random words request
pub const REQUEST_RANDOM_WORDS_TAG: u8 = 0;

impl RandomnessRequest {
    pub const LEN: usize = 32 + 8 + 2 + 4 + 4 + 8;

    /// Encode as coordinator instruction data
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 1 + Self::LEN];
        buf[0] = REQUEST_RANDOM_WORDS_TAG;
        let dst = array_mut_ref![buf, 1, RandomnessRequest::LEN];
        let (
            key_hash_dst,
            subscription_id_dst,
            confirmations_dst,
            gas_limit_dst,
            num_words_dst,
            nonce_dst,
        ) = mut_array_refs![dst, 32, 8, 2, 4, 4, 8];

        *key_hash_dst = self.key_hash;
        *subscription_id_dst = self.subscription_id.to_le_bytes();
        *confirmations_dst = self.request_confirmations.to_le_bytes();
        *gas_limit_dst = self.callback_gas_limit.to_le_bytes();
        *num_words_dst = self.num_words.to_le_bytes();
        *nonce_dst = self.nonce.to_le_bytes();
        buf
    }

    /// Decode coordinator instruction data
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input.split_first().ok_or(ProgramError::InvalidInstructionData)?;
        if *tag != REQUEST_RANDOM_WORDS_TAG || rest.len() < Self::LEN {
            return Err(ProgramError::InvalidInstructionData);
        }
        let src = array_ref![rest, 0, RandomnessRequest::LEN];
        let (key_hash, subscription_id, confirmations, gas_limit, num_words, nonce) =
            array_refs![src, 32, 8, 2, 4, 4, 8];

        Ok(RandomnessRequest {
            key_hash: *key_hash,
            subscription_id: u64::from_le_bytes(*subscription_id),
            request_confirmations: u16::from_le_bytes(*confirmations),
            callback_gas_limit: u32::from_le_bytes(*gas_limit),
            num_words: u32::from_le_bytes(*num_words),
            nonce: u64::from_le_bytes(*nonce),
        })
    }
}

/// Submits randomness requests to the coordinator program by CPI, signing as the raffle PDA.
/// The coordinator answers with the request id in its return data.
pub struct CoordinatorCpi<'a, 'b> {
    pub coordinator_program: &'a AccountInfo<'b>,
    pub raffle: &'a AccountInfo<'b>,
    pub raffle_bump: u8,
    /// Extra accounts the coordinator needs (subscription, billing), forwarded as given
    pub remaining_accounts: &'a [AccountInfo<'b>],
}

impl<'a, 'b> RandomnessOracle for CoordinatorCpi<'a, 'b> {
    fn request(&mut self, request: &RandomnessRequest) -> Result<u64, ProgramError> {
        let mut accounts = vec![AccountMeta::new_readonly(*self.raffle.key, true)];
        accounts.extend(self.remaining_accounts.iter().map(|account| AccountMeta {
            pubkey: *account.key,
            is_signer: account.is_signer,
            is_writable: account.is_writable,
        }));

        let mut account_infos = vec![self.raffle.clone(), self.coordinator_program.clone()];
        account_infos.extend_from_slice(self.remaining_accounts);

        invoke_signed(
            &Instruction {
                program_id: *self.coordinator_program.key,
                accounts,
                data: request.pack(),
            },
            &account_infos,
            &[&[RAFFLE_SEED, &[self.raffle_bump]]],
        )?;

        let (program_id, data) = get_return_data().ok_or_else(|| {
            msg!("Coordinator did not return a request id");
            RaffleError::MissingRequestId
        })?;
        if program_id != *self.coordinator_program.key || data.len() > 8 {
            msg!("Unexpected return data from {}", program_id);
            return Err(RaffleError::MissingRequestId.into());
        }

        // Trailing zero bytes may be trimmed from return data
        let mut request_id = [0u8; 8];
        request_id[..data.len()].copy_from_slice(&data);
        let request_id = u64::from_le_bytes(request_id);

        msg!("Randomness request {} submitted to {}", request_id, program_id);
        Ok(request_id)
    }
}
