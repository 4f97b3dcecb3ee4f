use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

/// Errors that may be returned by the Raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    /// Offered fee is below the entry fee
    #[error("Fee paid is below the entry fee")]
    InsufficientFee,

    /// Entry attempted while the round is closed
    #[error("Raffle round is not open")]
    RoundNotOpen,

    /// Round cannot be closed yet, or is already closing
    #[error("Upkeep not needed")]
    UpkeepNotNeeded,

    /// Randomness delivered for a request that is not pending
    #[error("Unknown or stale randomness request")]
    UnknownRequest,

    /// Winner could not be paid
    #[error("Payout transfer failed")]
    PayoutTransferFailed,

    /// Participant index past the end of the pool
    #[error("Participant index out of range")]
    IndexOutOfRange,

    /// No room left in the raffle account for another entry
    #[error("Raffle pool is full")]
    PoolFull,

    #[error("Raffle not initialized")]
    RaffleNotInitialized,

    #[error("Raffle already initialized")]
    RaffleAlreadyInitialized,

    /// Configuration rejected at initialization
    #[error("Invalid raffle configuration")]
    InvalidConfig,

    /// Randomness was not delivered by the configured coordinator authority
    #[error("Randomness must be delivered by the coordinator authority")]
    UnauthorizedOracle,

    /// Coordinator program account does not match the configuration
    #[error("Unknown coordinator program")]
    UnknownCoordinator,

    /// Coordinator did not hand back a request id
    #[error("Coordinator returned no request id")]
    MissingRequestId,

    /// Payout account is not the drawn winner
    #[error("Payout account does not match the winner")]
    WinnerAccountMismatch,

    /// Only the raffle authority can perform this action
    #[error("Only the raffle authority can perform this action")]
    NotRaffleAuthority,

    /// Recovery attempted while no payout is held back
    #[error("No failed payout to recover")]
    NoFailedPayout,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
