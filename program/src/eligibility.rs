// Raffle Engine - Eligibility Checker
use solana_program::{clock::UnixTimestamp, msg};

use crate::raffle_state::{Pool, Raffle, RaffleConfig, RoundState};

/// Each condition of the eligibility check, for logging
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepStatus {
    pub is_open: bool,
    pub interval_elapsed: bool,
    pub has_participants: bool,
    pub has_balance: bool,
}

impl UpkeepStatus {
    pub fn evaluate(
        pool: &Pool,
        config: &RaffleConfig,
        state: RoundState,
        now: UnixTimestamp,
    ) -> Self {
        let interval_elapsed = now
            .checked_sub(pool.last_close_timestamp)
            .and_then(|elapsed| u64::try_from(elapsed).ok())
            .map_or(false, |elapsed| elapsed >= config.interval_seconds);

        Self {
            is_open: state == RoundState::Open,
            interval_elapsed,
            has_participants: !pool.participants.is_empty(),
            has_balance: pool.balance > 0,
        }
    }

    pub fn upkeep_needed(&self) -> bool {
        self.is_open && self.interval_elapsed && self.has_participants && self.has_balance
    }
}

/// True when the round is open, has paid entries, and the interval since the last close
/// has elapsed. A clock reading earlier than the last close is never eligible.
pub fn is_eligible(
    pool: &Pool,
    config: &RaffleConfig,
    state: RoundState,
    now: UnixTimestamp,
) -> bool {
    UpkeepStatus::evaluate(pool, config, state, now).upkeep_needed()
}

impl Raffle {
    pub fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepStatus {
        UpkeepStatus::evaluate(&self.pool, &self.config, self.round_state(), now)
    }

    pub fn is_eligible(&self, now: UnixTimestamp) -> bool {
        is_eligible(&self.pool, &self.config, self.round_state(), now)
    }

    pub(crate) fn log_upkeep(&self, now: UnixTimestamp) -> bool {
        let status = self.check_upkeep(now);
        msg!(
            "Upkeep needed: {} (open: {}, interval elapsed: {}, participants: {}, balance: {})",
            status.upkeep_needed(),
            status.is_open,
            status.interval_elapsed,
            self.pool.participant_count(),
            self.pool.balance
        );
        status.upkeep_needed()
    }
}
