use anchor_lang::prelude::Pubkey;

use crate::codec::{AccountRecord, Field, FieldKind, Layout, RecordKind, RecordReader, RecordWriter, StakeDuration};
use crate::constants::{BPS_DENOMINATOR, SECONDS_PER_DAY, SECONDS_PER_YEAR};
use crate::errors::{DecodeError, EconomicError, EncodeError};

const STAKING_FIELDS: &[Field] = &[
    Field::new("user", 8, FieldKind::Pubkey),
    Field::new("amount_staked", 40, FieldKind::U64),
    Field::new("duration", 48, FieldKind::U8),
    Field::new("apy_rate", 49, FieldKind::U64),
    Field::new("stake_start_time", 57, FieldKind::I64),
    Field::new("lock_end_time", 65, FieldKind::I64),
    Field::new("last_reward_claim_time", 73, FieldKind::I64),
    Field::new("total_rewards_earned", 81, FieldKind::U64),
    Field::new("total_rewards_claimed", 89, FieldKind::U64),
    Field::new("pending_rewards", 97, FieldKind::U64),
    Field::new("is_active", 105, FieldKind::Bool),
    Field::new("is_locked", 106, FieldKind::Bool),
    Field::new("auto_compound", 107, FieldKind::Bool),
    Field::new("dao_eligible", 108, FieldKind::Bool),
];

pub static STAKING_RECORD: Layout = Layout {
    kind: RecordKind::StakingRecord,
    account_name: "StakingData",
    discriminator: Some([66, 164, 234, 202, 189, 107, 3, 93]),
    size: 109,
    fields: STAKING_FIELDS,
};

const POOL_FIELDS: &[Field] = &[
    Field::new("authority", 8, FieldKind::Pubkey),
    Field::new("token_mint", 40, FieldKind::Pubkey),
    Field::new("staking_vault", 72, FieldKind::Pubkey),
];

/// Only the address prefix of the pool account is mirrored.
pub static STAKING_POOL: Layout = Layout {
    kind: RecordKind::StakingPool,
    account_name: "StakingPool",
    discriminator: Some([203, 19, 214, 220, 220, 154, 24, 102]),
    size: 104,
    fields: POOL_FIELDS,
};

impl StakeDuration {
    pub const ALL: [StakeDuration; 4] = [
        StakeDuration::SixMonths,
        StakeDuration::OneYear,
        StakeDuration::TwoYears,
        StakeDuration::ThreeYears,
    ];

    /// Default APY of the lock class, in basis points.
    pub fn apy_bps(self) -> u64 {
        match self {
            StakeDuration::SixMonths => 500,
            StakeDuration::OneYear => 1_000,
            StakeDuration::TwoYears => 1_500,
            StakeDuration::ThreeYears => 2_000,
        }
    }

    pub fn lock_days(self) -> i64 {
        match self {
            StakeDuration::SixMonths => 182,
            StakeDuration::OneYear => 365,
            StakeDuration::TwoYears => 730,
            StakeDuration::ThreeYears => 1_095,
        }
    }

    pub fn lock_secs(self) -> i64 {
        self.lock_days() * SECONDS_PER_DAY
    }

    /// Classes of a year or longer carry double governance weight.
    pub fn is_long_term(self) -> bool {
        self != StakeDuration::SixMonths
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingRecord {
    pub user: Pubkey,
    pub amount_staked: u64,
    pub duration: StakeDuration,
    /// Basis points
    pub apy_rate: u64,
    pub stake_start_time: i64,
    pub lock_end_time: i64,
    pub last_reward_claim_time: i64,
    pub total_rewards_earned: u64,
    pub total_rewards_claimed: u64,
    pub pending_rewards: u64,
    pub is_active: bool,
    pub is_locked: bool,
    pub auto_compound: bool,
    pub dao_eligible: bool,
}

impl StakingRecord {
    /// Rewards claimable at `now`: the stored pending amount plus simple interest
    /// since the last claim. Never decreases as `now` advances.
    pub fn accrued_rewards(&self, now: i64) -> Result<u64, EconomicError> {
        if !self.is_active {
            return Ok(self.pending_rewards);
        }
        let elapsed = now.saturating_sub(self.last_reward_claim_time).max(0) as u128;
        let accrued = (self.amount_staked as u128)
            .checked_mul(self.apy_rate as u128)
            .and_then(|v| v.checked_mul(elapsed))
            .ok_or(EconomicError::Overflow)?
            / (BPS_DENOMINATOR as u128 * SECONDS_PER_YEAR as u128);
        let total = accrued
            .checked_add(self.pending_rewards as u128)
            .ok_or(EconomicError::Overflow)?;
        u64::try_from(total).map_err(|_| EconomicError::Overflow)
    }

    pub fn is_unlocked(&self, now: i64) -> bool {
        now >= self.lock_end_time
    }

    pub fn early_unstake_eligible(&self) -> bool {
        self.is_active && !self.is_locked
    }

    /// Checks whether the stake may be withdrawn at `now`.
    pub fn ensure_unstakable(&self, now: i64) -> Result<(), EconomicError> {
        if !self.is_active || self.amount_staked == 0 {
            return Err(EconomicError::NothingStaked);
        }
        if self.is_unlocked(now) || self.early_unstake_eligible() {
            return Ok(());
        }
        Err(EconomicError::StakeLocked {
            unlocks_in_secs: self.lock_end_time.saturating_sub(now).max(0) as u64,
        })
    }
}

impl AccountRecord for StakingRecord {
    fn layout() -> &'static Layout {
        &STAKING_RECORD
    }

    fn read(r: &RecordReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            user: r.pubkey("user")?,
            amount_staked: r.u64("amount_staked")?,
            duration: r.tag("duration")?,
            apy_rate: r.u64("apy_rate")?,
            stake_start_time: r.i64("stake_start_time")?,
            lock_end_time: r.i64("lock_end_time")?,
            last_reward_claim_time: r.i64("last_reward_claim_time")?,
            total_rewards_earned: r.u64("total_rewards_earned")?,
            total_rewards_claimed: r.u64("total_rewards_claimed")?,
            pending_rewards: r.u64("pending_rewards")?,
            is_active: r.bool("is_active")?,
            is_locked: r.bool("is_locked")?,
            auto_compound: r.bool("auto_compound")?,
            dao_eligible: r.bool("dao_eligible")?,
        })
    }

    fn write(&self, w: &mut RecordWriter) -> Result<(), EncodeError> {
        w.put_pubkey("user", &self.user)?;
        w.put_u64("amount_staked", self.amount_staked)?;
        w.put_tag("duration", self.duration)?;
        w.put_u64("apy_rate", self.apy_rate)?;
        w.put_i64("stake_start_time", self.stake_start_time)?;
        w.put_i64("lock_end_time", self.lock_end_time)?;
        w.put_i64("last_reward_claim_time", self.last_reward_claim_time)?;
        w.put_u64("total_rewards_earned", self.total_rewards_earned)?;
        w.put_u64("total_rewards_claimed", self.total_rewards_claimed)?;
        w.put_u64("pending_rewards", self.pending_rewards)?;
        w.put_bool("is_active", self.is_active)?;
        w.put_bool("is_locked", self.is_locked)?;
        w.put_bool("auto_compound", self.auto_compound)?;
        w.put_bool("dao_eligible", self.dao_eligible)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StakingPool {
    pub authority: Pubkey,
    pub token_mint: Pubkey,
    pub staking_vault: Pubkey,
}

impl AccountRecord for StakingPool {
    fn layout() -> &'static Layout {
        &STAKING_POOL
    }

    fn read(r: &RecordReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            authority: r.pubkey("authority")?,
            token_mint: r.pubkey("token_mint")?,
            staking_vault: r.pubkey("staking_vault")?,
        })
    }

    fn write(&self, w: &mut RecordWriter) -> Result<(), EncodeError> {
        w.put_pubkey("authority", &self.authority)?;
        w.put_pubkey("token_mint", &self.token_mint)?;
        w.put_pubkey("staking_vault", &self.staking_vault)
    }
}
