use anchor_lang::prelude::Pubkey;

use super::Anomaly;
use crate::codec::{AccountRecord, Field, FieldKind, Layout, RecordKind, RecordReader, RecordWriter};
use crate::constants::NUM_PHASES;
use crate::errors::{DecodeError, EncodeError};
use crate::phase::PhaseSchedule;

const FIELDS: &[Field] = &[
    Field::new("authority", 8, FieldKind::Pubkey),
    Field::new("token_mint", 40, FieldKind::Pubkey),
    Field::new("usdc_mint", 72, FieldKind::Pubkey),
    Field::new("usdt_mint", 104, FieldKind::Pubkey),
    Field::new("token_vault", 136, FieldKind::Pubkey),
    Field::new("usdc_vault", 168, FieldKind::Pubkey),
    Field::new("vip_start_time", 200, FieldKind::I64),
    Field::new("vip_price", 208, FieldKind::U64),
    Field::new("vip_min_purchase_usd", 216, FieldKind::U64),
    Field::new("vip_max_buyers", 224, FieldKind::U64),
    Field::new("vip_buyers_count", 232, FieldKind::U64),
    Field::new("vip_duration", 240, FieldKind::I64),
    Field::new("vip_tokens_sold", 248, FieldKind::U64),
    Field::new("start_time", 256, FieldKind::I64),
    Field::new("phase_duration", 264, FieldKind::I64),
    Field::new("phase_prices", 272, FieldKind::U64x3),
    Field::new("max_tokens_per_phase", 296, FieldKind::U64x3),
    Field::new("tokens_sold", 320, FieldKind::U64x3),
    Field::new("total_raised", 344, FieldKind::U64),
    Field::new("total_withdrawn", 352, FieldKind::U64),
    Field::new("withdrawal_limit_percentage", 360, FieldKind::U8),
    Field::new("team_allocation", 361, FieldKind::U64),
    Field::new("team_vesting_start", 369, FieldKind::I64),
    Field::new("team_vesting_duration", 377, FieldKind::I64),
    Field::new("team_tokens_claimed", 385, FieldKind::U64),
    Field::new("is_paused", 393, FieldKind::Bool),
    Field::new("is_cancelled", 394, FieldKind::Bool),
    Field::new("presale_ended", 395, FieldKind::Bool),
];

pub static PRESALE_STATE: Layout = Layout {
    kind: RecordKind::PresaleState,
    account_name: "PresaleState",
    discriminator: Some([32, 18, 85, 188, 213, 180, 10, 241]),
    size: 396,
    fields: FIELDS,
};

/// Global sale configuration and counters.
///
/// Prices are micro-dollars per whole token, amounts are token minor units,
/// `total_raised` and `total_withdrawn` are micro-dollars.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PresaleState {
    pub authority: Pubkey,
    pub token_mint: Pubkey,
    pub usdc_mint: Pubkey,
    pub usdt_mint: Pubkey,
    pub token_vault: Pubkey,
    pub usdc_vault: Pubkey,
    pub vip_start_time: i64,
    pub vip_price: u64,
    pub vip_min_purchase_usd: u64,
    pub vip_max_buyers: u64,
    pub vip_buyers_count: u64,
    pub vip_duration: i64,
    pub vip_tokens_sold: u64,
    pub start_time: i64,
    pub phase_duration: i64,
    pub phase_prices: [u64; NUM_PHASES],
    pub max_tokens_per_phase: [u64; NUM_PHASES],
    pub tokens_sold: [u64; NUM_PHASES],
    pub total_raised: u64,
    pub total_withdrawn: u64,
    pub withdrawal_limit_percentage: u8,
    pub team_allocation: u64,
    pub team_vesting_start: i64,
    pub team_vesting_duration: i64,
    pub team_tokens_claimed: u64,
    pub is_paused: bool,
    pub is_cancelled: bool,
    pub presale_ended: bool,
}

impl PresaleState {
    pub fn schedule(&self) -> PhaseSchedule {
        PhaseSchedule {
            vip_start: self.vip_start_time,
            vip_duration: self.vip_duration,
            vip_buyers_count: self.vip_buyers_count,
            vip_max_buyers: self.vip_max_buyers,
            vip_price: self.vip_price,
            phase1_start: self.start_time,
            phase_duration: self.phase_duration,
            phase_prices: self.phase_prices,
        }
    }

    /// Tokens still available in numbered phase `index` (0-based).
    pub fn remaining_in_phase(&self, index: usize) -> u64 {
        match (self.max_tokens_per_phase.get(index), self.tokens_sold.get(index)) {
            (Some(cap), Some(sold)) => cap.saturating_sub(*sold),
            _ => 0,
        }
    }

    /// Invariant checks on a decoded snapshot. An empty list means the snapshot is trusted.
    pub fn validate(&self) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        for (phase, (sold, cap)) in self.tokens_sold.iter().zip(&self.max_tokens_per_phase).enumerate() {
            if sold > cap {
                anomalies.push(Anomaly::PhaseOversold {
                    phase,
                    sold: *sold,
                    cap: *cap,
                });
            }
        }
        if self.vip_buyers_count > self.vip_max_buyers {
            anomalies.push(Anomaly::VipOverfilled {
                count: self.vip_buyers_count,
                max: self.vip_max_buyers,
            });
        }
        if self.withdrawal_limit_percentage > 100 {
            anomalies.push(Anomaly::WithdrawalLimitOutOfRange(self.withdrawal_limit_percentage));
        }
        if self.total_withdrawn > self.total_raised {
            anomalies.push(Anomaly::OverWithdrawn {
                withdrawn: self.total_withdrawn,
                raised: self.total_raised,
            });
        }
        anomalies
    }
}

impl AccountRecord for PresaleState {
    fn layout() -> &'static Layout {
        &PRESALE_STATE
    }

    fn read(r: &RecordReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            authority: r.pubkey("authority")?,
            token_mint: r.pubkey("token_mint")?,
            usdc_mint: r.pubkey("usdc_mint")?,
            usdt_mint: r.pubkey("usdt_mint")?,
            token_vault: r.pubkey("token_vault")?,
            usdc_vault: r.pubkey("usdc_vault")?,
            vip_start_time: r.i64("vip_start_time")?,
            vip_price: r.u64("vip_price")?,
            vip_min_purchase_usd: r.u64("vip_min_purchase_usd")?,
            vip_max_buyers: r.u64("vip_max_buyers")?,
            vip_buyers_count: r.u64("vip_buyers_count")?,
            vip_duration: r.i64("vip_duration")?,
            vip_tokens_sold: r.u64("vip_tokens_sold")?,
            start_time: r.i64("start_time")?,
            phase_duration: r.i64("phase_duration")?,
            phase_prices: r.u64x3("phase_prices")?,
            max_tokens_per_phase: r.u64x3("max_tokens_per_phase")?,
            tokens_sold: r.u64x3("tokens_sold")?,
            total_raised: r.u64("total_raised")?,
            total_withdrawn: r.u64("total_withdrawn")?,
            withdrawal_limit_percentage: r.u8("withdrawal_limit_percentage")?,
            team_allocation: r.u64("team_allocation")?,
            team_vesting_start: r.i64("team_vesting_start")?,
            team_vesting_duration: r.i64("team_vesting_duration")?,
            team_tokens_claimed: r.u64("team_tokens_claimed")?,
            is_paused: r.bool("is_paused")?,
            is_cancelled: r.bool("is_cancelled")?,
            presale_ended: r.bool("presale_ended")?,
        })
    }

    fn write(&self, w: &mut RecordWriter) -> Result<(), EncodeError> {
        w.put_pubkey("authority", &self.authority)?;
        w.put_pubkey("token_mint", &self.token_mint)?;
        w.put_pubkey("usdc_mint", &self.usdc_mint)?;
        w.put_pubkey("usdt_mint", &self.usdt_mint)?;
        w.put_pubkey("token_vault", &self.token_vault)?;
        w.put_pubkey("usdc_vault", &self.usdc_vault)?;
        w.put_i64("vip_start_time", self.vip_start_time)?;
        w.put_u64("vip_price", self.vip_price)?;
        w.put_u64("vip_min_purchase_usd", self.vip_min_purchase_usd)?;
        w.put_u64("vip_max_buyers", self.vip_max_buyers)?;
        w.put_u64("vip_buyers_count", self.vip_buyers_count)?;
        w.put_i64("vip_duration", self.vip_duration)?;
        w.put_u64("vip_tokens_sold", self.vip_tokens_sold)?;
        w.put_i64("start_time", self.start_time)?;
        w.put_i64("phase_duration", self.phase_duration)?;
        w.put_u64x3("phase_prices", &self.phase_prices)?;
        w.put_u64x3("max_tokens_per_phase", &self.max_tokens_per_phase)?;
        w.put_u64x3("tokens_sold", &self.tokens_sold)?;
        w.put_u64("total_raised", self.total_raised)?;
        w.put_u64("total_withdrawn", self.total_withdrawn)?;
        w.put_u8("withdrawal_limit_percentage", self.withdrawal_limit_percentage)?;
        w.put_u64("team_allocation", self.team_allocation)?;
        w.put_i64("team_vesting_start", self.team_vesting_start)?;
        w.put_i64("team_vesting_duration", self.team_vesting_duration)?;
        w.put_u64("team_tokens_claimed", self.team_tokens_claimed)?;
        w.put_bool("is_paused", self.is_paused)?;
        w.put_bool("is_cancelled", self.is_cancelled)?;
        w.put_bool("presale_ended", self.presale_ended)
    }
}
