use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    instruction::{Instruction, InstructionError},
    program::set_return_data,
    pubkey::Pubkey,
};
use solana_program_test::*;
use solana_sdk::{
    signature::{Keypair, Signer},
    system_instruction,
    transaction::{Transaction, TransactionError},
};

use raffle_engine::{
    coordinator::RandomnessRequest,
    process_instruction,
    raffle_error::RaffleError,
    raffle_instruction,
    raffle_state::{OracleConfig, Raffle, RaffleConfig, RoundState},
    settlement::select_winner_index,
    utils::{find_raffle_address, random_word_from_u64},
};

const ENTRY_FEE: u64 = 10_000_000; // 0.01 SOL
const PLAYER_FUNDS: u64 = 1_000_000_000; // 1 SOL

// Stand-in coordinator: answers every request with id = nonce + 1
fn mock_coordinator(_program_id: &Pubkey, _accounts: &[AccountInfo], instruction_data: &[u8]) -> ProgramResult {
    let request = RandomnessRequest::unpack(instruction_data)?;
    set_return_data(&(request.nonce + 1).to_le_bytes());
    Ok(())
}

struct TestRaffle {
    context: ProgramTestContext,
    program_id: Pubkey,
    coordinator_program: Pubkey,
    oracle: Keypair,
    raffle: Pubkey,
}

impl TestRaffle {
    async fn process(&mut self, instructions: &[Instruction], signers: &[&Keypair]) -> Result<(), BanksClientError> {
        let mut all_signers = vec![&self.context.payer];
        all_signers.extend_from_slice(signers);
        let transaction = Transaction::new_signed_with_payer(
            instructions,
            Some(&self.context.payer.pubkey()),
            &all_signers,
            self.context.last_blockhash,
        );
        self.context.banks_client.process_transaction(transaction).await
    }

    async fn raffle_state(&mut self) -> Raffle {
        let account = self
            .context
            .banks_client
            .get_account(self.raffle)
            .await
            .unwrap()
            .unwrap();
        Raffle::unpack_account(&account.data).unwrap()
    }

    async fn balance(&mut self, pubkey: Pubkey) -> u64 {
        self.context.banks_client.get_balance(pubkey).await.unwrap()
    }

    async fn funded_player(&mut self) -> Keypair {
        let player = Keypair::new();
        let fund_ix = system_instruction::transfer(&self.context.payer.pubkey(), &player.pubkey(), PLAYER_FUNDS);
        self.process(&[fund_ix], &[]).await.unwrap();
        player
    }

    async fn enter(&mut self, player: &Keypair, fee: u64) -> Result<(), BanksClientError> {
        let ix = raffle_instruction::enter_raffle(&self.program_id, &player.pubkey(), &self.raffle, fee);
        self.process(&[ix], &[player]).await
    }

    // A fresh keeper per call keeps repeated upkeep transactions distinct
    async fn perform_upkeep(&mut self) -> Result<(), BanksClientError> {
        let keeper = Keypair::new();
        let ix = raffle_instruction::perform_upkeep(
            &self.program_id,
            &keeper.pubkey(),
            &self.raffle,
            &self.coordinator_program,
            &[],
        );
        self.process(&[ix], &[&keeper]).await
    }

    async fn fulfill(&mut self, signer: &Keypair, winner: &Pubkey, request_id: u64, random_value: u64) -> Result<(), BanksClientError> {
        let ix = raffle_instruction::fulfill_randomness(
            &self.program_id,
            &signer.pubkey(),
            &self.raffle,
            winner,
            request_id,
            random_word_from_u64(random_value),
        );
        self.process(&[ix], &[signer]).await
    }
}

async fn setup(interval_seconds: u64) -> TestRaffle {
    let program_id = Pubkey::new_unique();
    let coordinator_program = Pubkey::new_unique();
    let oracle = Keypair::new();

    let mut program_test = ProgramTest::new("raffle_engine", program_id, processor!(process_instruction));
    program_test.add_program("mock_coordinator", coordinator_program, processor!(mock_coordinator));

    let context = program_test.start_with_context().await;
    let (raffle, _) = find_raffle_address(&program_id);

    let mut test = TestRaffle {
        context,
        program_id,
        coordinator_program,
        oracle,
        raffle,
    };

    let config = RaffleConfig {
        entry_fee: ENTRY_FEE,
        interval_seconds,
        max_participants: 16,
        oracle: OracleConfig {
            coordinator_program,
            coordinator_authority: test.oracle.pubkey(),
            subscription_id: 1,
            gas_lane: [1u8; 32],
            callback_gas_limit: 500_000,
        },
    };
    let ix = raffle_instruction::initialize_raffle(&program_id, &test.context.payer.pubkey(), &raffle, config);
    test.process(&[ix], &[]).await.unwrap();
    test
}

fn custom_error(error: RaffleError) -> TransactionError {
    TransactionError::InstructionError(0, InstructionError::Custom(error as u32))
}

#[tokio::test]
async fn test_initialize_raffle() {
    let mut test = setup(30).await;

    let raffle = test.raffle_state().await;
    assert!(raffle.is_initialized);
    assert_eq!(raffle.authority, test.context.payer.pubkey());
    assert_eq!(raffle.entry_fee(), ENTRY_FEE);
    assert_eq!(raffle.interval(), 30);
    assert_eq!(raffle.round_state(), RoundState::Open);
    assert_eq!(raffle.participant_count(), 0);
    assert_eq!(raffle.config.oracle.coordinator_authority, test.oracle.pubkey());
}

#[tokio::test]
async fn test_initialize_twice_fails() {
    let mut test = setup(30).await;

    let config = test.raffle_state().await.config;
    let ix = raffle_instruction::initialize_raffle(
        &test.program_id,
        &test.context.payer.pubkey(),
        &test.raffle,
        RaffleConfig {
            entry_fee: ENTRY_FEE * 2,
            ..config
        },
    );
    let err = test.process(&[ix], &[]).await.unwrap_err().unwrap();
    assert_eq!(err, custom_error(RaffleError::RaffleAlreadyInitialized));
}

#[tokio::test]
async fn test_enter_raffle_pools_entry_fee() {
    let mut test = setup(30).await;
    let player = test.funded_player().await;
    let raffle_lamports = test.balance(test.raffle).await;

    // Offering more than the fee only debits the fee
    test.enter(&player, ENTRY_FEE * 3).await.unwrap();

    let raffle = test.raffle_state().await;
    assert_eq!(raffle.participant_count(), 1);
    assert_eq!(raffle.participant_at(0).unwrap(), player.pubkey());
    assert_eq!(raffle.current_balance(), ENTRY_FEE);
    assert_eq!(test.balance(test.raffle).await, raffle_lamports + ENTRY_FEE);
    assert_eq!(test.balance(player.pubkey()).await, PLAYER_FUNDS - ENTRY_FEE);
}

#[tokio::test]
async fn test_enter_with_insufficient_fee_fails() {
    let mut test = setup(30).await;
    let player = test.funded_player().await;

    let err = test.enter(&player, ENTRY_FEE - 1).await.unwrap_err().unwrap();
    assert_eq!(err, custom_error(RaffleError::InsufficientFee));
    assert_eq!(test.raffle_state().await.participant_count(), 0);
}

#[tokio::test]
async fn test_check_upkeep_is_read_only() {
    let mut test = setup(0).await;
    let player = test.funded_player().await;
    test.enter(&player, ENTRY_FEE).await.unwrap();
    let before = test.raffle_state().await;

    let ix = raffle_instruction::check_upkeep(&test.program_id, &test.raffle);
    test.process(&[ix], &[]).await.unwrap();

    assert_eq!(test.raffle_state().await, before);
}

#[tokio::test]
async fn test_perform_upkeep_without_players_fails() {
    let mut test = setup(0).await;

    let err = test.perform_upkeep().await.unwrap_err().unwrap();
    assert_eq!(err, custom_error(RaffleError::UpkeepNotNeeded));
}

#[tokio::test]
async fn test_perform_upkeep_before_interval_fails() {
    let mut test = setup(3600).await;
    let player = test.funded_player().await;
    test.enter(&player, ENTRY_FEE).await.unwrap();

    let err = test.perform_upkeep().await.unwrap_err().unwrap();
    assert_eq!(err, custom_error(RaffleError::UpkeepNotNeeded));
    assert_eq!(test.raffle_state().await.round_state(), RoundState::Open);
}

#[tokio::test]
async fn test_perform_upkeep_with_wrong_coordinator_fails() {
    let mut test = setup(0).await;
    let player = test.funded_player().await;
    test.enter(&player, ENTRY_FEE).await.unwrap();

    let keeper = Keypair::new();
    let ix = raffle_instruction::perform_upkeep(
        &test.program_id,
        &keeper.pubkey(),
        &test.raffle,
        &Pubkey::new_unique(),
        &[],
    );
    let err = test.process(&[ix], &[&keeper]).await.unwrap_err().unwrap();
    assert_eq!(err, custom_error(RaffleError::UnknownCoordinator));
}

#[tokio::test]
async fn test_perform_upkeep_closes_round() {
    let mut test = setup(0).await;
    let player = test.funded_player().await;
    test.enter(&player, ENTRY_FEE).await.unwrap();

    test.perform_upkeep().await.unwrap();

    let raffle = test.raffle_state().await;
    assert_eq!(raffle.round_state(), RoundState::AwaitingRandomness);
    // First request carries nonce 0, the mock coordinator answers with 1
    assert_eq!(raffle.pending_request().unwrap().request_id, 1);
    assert_eq!(raffle.request_nonce, 1);

    // No entries and no second request while waiting
    let late_player = test.funded_player().await;
    let err = test.enter(&late_player, ENTRY_FEE).await.unwrap_err().unwrap();
    assert_eq!(err, custom_error(RaffleError::RoundNotOpen));

    let err = test.perform_upkeep().await.unwrap_err().unwrap();
    assert_eq!(err, custom_error(RaffleError::UpkeepNotNeeded));
}

#[tokio::test]
async fn test_fulfill_with_unknown_request_fails() {
    let mut test = setup(0).await;
    let player = test.funded_player().await;
    test.enter(&player, ENTRY_FEE).await.unwrap();
    test.perform_upkeep().await.unwrap();
    let before = test.raffle_state().await;

    let oracle = Keypair::from_bytes(&test.oracle.to_bytes()).unwrap();
    let err = test
        .fulfill(&oracle, &player.pubkey(), 99, 7)
        .await
        .unwrap_err()
        .unwrap();
    assert_eq!(err, custom_error(RaffleError::UnknownRequest));
    assert_eq!(test.raffle_state().await, before);
}

#[tokio::test]
async fn test_fulfill_from_unauthorized_signer_fails() {
    let mut test = setup(0).await;
    let player = test.funded_player().await;
    test.enter(&player, ENTRY_FEE).await.unwrap();
    test.perform_upkeep().await.unwrap();
    let request_id = test.raffle_state().await.pending_request().unwrap().request_id;

    let impostor = Keypair::new();
    let err = test
        .fulfill(&impostor, &player.pubkey(), request_id, 7)
        .await
        .unwrap_err()
        .unwrap();
    assert_eq!(err, custom_error(RaffleError::UnauthorizedOracle));
}

#[tokio::test]
async fn test_fulfill_with_wrong_winner_account_fails() {
    let mut test = setup(0).await;
    let first = test.funded_player().await;
    let second = test.funded_player().await;
    test.enter(&first, ENTRY_FEE).await.unwrap();
    test.enter(&second, ENTRY_FEE).await.unwrap();
    test.perform_upkeep().await.unwrap();
    let request_id = test.raffle_state().await.pending_request().unwrap().request_id;

    // 7 mod 2 selects the second entrant
    let oracle = Keypair::from_bytes(&test.oracle.to_bytes()).unwrap();
    let err = test
        .fulfill(&oracle, &first.pubkey(), request_id, 7)
        .await
        .unwrap_err()
        .unwrap();
    assert_eq!(err, custom_error(RaffleError::WinnerAccountMismatch));
    assert_eq!(test.raffle_state().await.round_state(), RoundState::AwaitingRandomness);
}

#[tokio::test]
async fn test_single_player_round_pays_out() {
    let mut test = setup(0).await;
    let player = test.funded_player().await;
    test.enter(&player, ENTRY_FEE).await.unwrap();
    test.perform_upkeep().await.unwrap();
    let request_id = test.raffle_state().await.pending_request().unwrap().request_id;
    let starting_balance = test.balance(player.pubkey()).await;

    let oracle = Keypair::from_bytes(&test.oracle.to_bytes()).unwrap();
    test.fulfill(&oracle, &player.pubkey(), request_id, 7).await.unwrap();

    let raffle = test.raffle_state().await;
    assert_eq!(raffle.round_state(), RoundState::Open);
    assert_eq!(raffle.participant_count(), 0);
    assert_eq!(raffle.current_balance(), 0);
    assert_eq!(raffle.recent_winner(), player.pubkey());
    assert_eq!(test.balance(player.pubkey()).await, starting_balance + ENTRY_FEE);
}

#[tokio::test]
async fn test_picks_winner_resets_raffle_and_sends_money() {
    let mut test = setup(0).await;
    let mut players = Vec::new();
    for _ in 0..4 {
        let player = test.funded_player().await;
        test.enter(&player, ENTRY_FEE).await.unwrap();
        players.push(player);
    }
    let raffle_lamports = test.balance(test.raffle).await;
    test.perform_upkeep().await.unwrap();

    let raffle = test.raffle_state().await;
    assert_eq!(raffle.current_balance(), 4 * ENTRY_FEE);
    let request_id = raffle.pending_request().unwrap().request_id;

    let random_value = 7;
    let winner_index = select_winner_index(&random_word_from_u64(random_value), 4);
    assert_eq!(winner_index, 3);
    let winner = players[winner_index].pubkey();
    let starting_balance = test.balance(winner).await;

    let oracle = Keypair::from_bytes(&test.oracle.to_bytes()).unwrap();
    test.fulfill(&oracle, &winner, request_id, random_value).await.unwrap();

    let raffle = test.raffle_state().await;
    assert_eq!(raffle.round_state(), RoundState::Open);
    assert_eq!(raffle.participant_count(), 0);
    assert_eq!(raffle.current_balance(), 0);
    assert_eq!(raffle.recent_winner(), winner);
    assert_eq!(raffle.history.last_payout, 4 * ENTRY_FEE);
    assert_eq!(raffle.history.rounds_completed, 1);
    assert_eq!(test.balance(winner).await, starting_balance + 4 * ENTRY_FEE);
    assert_eq!(test.balance(test.raffle).await, raffle_lamports - 4 * ENTRY_FEE);

    // The raffle reopens for the next round
    let next_player = test.funded_player().await;
    test.enter(&next_player, ENTRY_FEE).await.unwrap();
    assert_eq!(test.raffle_state().await.participant_count(), 1);
}

#[tokio::test]
async fn test_retry_payout_requires_failed_payout() {
    let mut test = setup(0).await;
    let player = test.funded_player().await;
    test.enter(&player, ENTRY_FEE).await.unwrap();

    let ix = raffle_instruction::retry_payout(
        &test.program_id,
        &test.context.payer.pubkey(),
        &test.raffle,
        &player.pubkey(),
    );
    let err = test.process(&[ix], &[]).await.unwrap_err().unwrap();
    assert_eq!(err, custom_error(RaffleError::NoFailedPayout));
}

// Settles a one-player round with the winner passed read-only, so the payout is rejected
async fn halt_single_player_round(test: &mut TestRaffle) -> (Keypair, u64) {
    let player = test.funded_player().await;
    test.enter(&player, ENTRY_FEE).await.unwrap();
    test.perform_upkeep().await.unwrap();
    let request_id = test.raffle_state().await.pending_request().unwrap().request_id;

    let mut ix = raffle_instruction::fulfill_randomness(
        &test.program_id,
        &test.oracle.pubkey(),
        &test.raffle,
        &player.pubkey(),
        request_id,
        random_word_from_u64(7),
    );
    ix.accounts[2].is_writable = false;
    let oracle = Keypair::from_bytes(&test.oracle.to_bytes()).unwrap();
    test.process(&[ix], &[&oracle]).await.unwrap();

    (player, request_id)
}

#[tokio::test]
async fn test_rejected_payout_is_committed_and_retried() {
    let mut test = setup(0).await;
    let raffle_lamports = test.balance(test.raffle).await;

    let (player, request_id) = halt_single_player_round(&mut test).await;

    let raffle = test.raffle_state().await;
    assert_eq!(raffle.round_state(), RoundState::PayoutFailed);
    let failed = *raffle.failed_payout().unwrap();
    assert_eq!(failed.winner, player.pubkey());
    assert_eq!(failed.amount, ENTRY_FEE);
    assert_eq!(raffle.participant_count(), 1);
    assert_eq!(raffle.current_balance(), ENTRY_FEE);
    assert_eq!(test.balance(test.raffle).await, raffle_lamports + ENTRY_FEE);

    // The consumed request cannot be delivered again
    let oracle = Keypair::from_bytes(&test.oracle.to_bytes()).unwrap();
    let err = test
        .fulfill(&oracle, &player.pubkey(), request_id, 7)
        .await
        .unwrap_err()
        .unwrap();
    assert_eq!(err, custom_error(RaffleError::UnknownRequest));

    let starting_balance = test.balance(player.pubkey()).await;
    let ix = raffle_instruction::retry_payout(
        &test.program_id,
        &test.context.payer.pubkey(),
        &test.raffle,
        &player.pubkey(),
    );
    test.process(&[ix], &[]).await.unwrap();

    let raffle = test.raffle_state().await;
    assert_eq!(raffle.round_state(), RoundState::Open);
    assert_eq!(raffle.participant_count(), 0);
    assert_eq!(raffle.current_balance(), 0);
    assert_eq!(raffle.recent_winner(), player.pubkey());
    assert_eq!(raffle.history.last_payout, ENTRY_FEE);
    assert_eq!(test.balance(player.pubkey()).await, starting_balance + ENTRY_FEE);
    assert_eq!(test.balance(test.raffle).await, raffle_lamports);
}

#[tokio::test]
async fn test_drain_failed_payout_by_authority() {
    let mut test = setup(0).await;
    let raffle_lamports = test.balance(test.raffle).await;
    let (player, _) = halt_single_player_round(&mut test).await;
    let destination = Pubkey::new_unique();

    let intruder = Keypair::new();
    let ix = raffle_instruction::drain_failed_payout(
        &test.program_id,
        &intruder.pubkey(),
        &test.raffle,
        &destination,
    );
    let err = test.process(&[ix], &[&intruder]).await.unwrap_err().unwrap();
    assert_eq!(err, custom_error(RaffleError::NotRaffleAuthority));
    assert_eq!(test.raffle_state().await.round_state(), RoundState::PayoutFailed);

    let ix = raffle_instruction::drain_failed_payout(
        &test.program_id,
        &test.context.payer.pubkey(),
        &test.raffle,
        &destination,
    );
    test.process(&[ix], &[]).await.unwrap();

    let raffle = test.raffle_state().await;
    assert_eq!(raffle.round_state(), RoundState::Open);
    assert_eq!(raffle.participant_count(), 0);
    assert_eq!(raffle.current_balance(), 0);
    // History still names the drawn winner
    assert_eq!(raffle.recent_winner(), player.pubkey());
    assert_eq!(test.balance(destination).await, ENTRY_FEE);
    assert_eq!(test.balance(test.raffle).await, raffle_lamports);
}
