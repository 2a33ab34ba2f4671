use anchor_lang::prelude::Pubkey;

use super::{Anomaly, TreasuryToken};
use crate::codec::instruction::tag_conversions;
use crate::codec::{AccountRecord, Field, FieldKind, Layout, RecordKind, RecordReader, RecordWriter};
use crate::constants::DISTRIBUTION_EPOCH_YEAR;
use crate::errors::{DecodeError, EconomicError, EncodeError};

const REGISTRY_FIELDS: &[Field] = &[
    Field::new("authority", 8, FieldKind::Pubkey),
    Field::new("total_cycles", 40, FieldKind::U64),
    Field::new("total_distributed", 48, FieldKind::U64),
    Field::new("is_active", 56, FieldKind::Bool),
];

pub static DISTRIBUTION_REGISTRY: Layout = Layout {
    kind: RecordKind::DistributionRegistry,
    account_name: "DistributionRegistry",
    discriminator: Some([66, 9, 149, 147, 156, 177, 222, 170]),
    size: 57,
    fields: REGISTRY_FIELDS,
};

const CYCLE_FIELDS: &[Field] = &[
    Field::new("cycle_id", 8, FieldKind::U64),
    Field::new("quarter_index", 16, FieldKind::U64),
    Field::new("total_profit_gross", 24, FieldKind::U64),
    Field::new("total_distributable_amount", 32, FieldKind::U64),
    Field::new("total_claimed", 40, FieldKind::U64),
    Field::new("total_claimants", 48, FieldKind::U64),
    Field::new("token_type", 56, FieldKind::U8),
    Field::new("status", 57, FieldKind::U8),
    Field::new("snapshot_timestamp", 58, FieldKind::I64),
    Field::new("claim_start_time", 66, FieldKind::I64),
    Field::new("claim_end_time", 74, FieldKind::I64),
    Field::new("merkle_root", 82, FieldKind::Bytes32),
    Field::new("has_property", 114, FieldKind::Bool),
    Field::new("property_value", 115, FieldKind::U64),
    Field::new("rental_yield_bps", 123, FieldKind::U16),
];

pub static DISTRIBUTION_CYCLE: Layout = Layout {
    kind: RecordKind::DistributionCycle,
    account_name: "DistributionCycle",
    discriminator: Some([157, 156, 197, 205, 125, 166, 171, 48]),
    size: 125,
    fields: CYCLE_FIELDS,
};

const CLAIM_FIELDS: &[Field] = &[
    Field::new("cycle_id", 8, FieldKind::U64),
    Field::new("claimed_amount", 16, FieldKind::U64),
    Field::new("claimed_at", 24, FieldKind::I64),
];

pub static CLAIM_RECORD: Layout = Layout {
    kind: RecordKind::ClaimRecord,
    account_name: "ClaimRecord",
    discriminator: Some([57, 229, 0, 9, 65, 62, 96, 7]),
    size: 32,
    fields: CLAIM_FIELDS,
};

/// Cycle lifecycle. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DistributionStatus {
    Pending,
    Active,
    Finalized,
}

tag_conversions!(DistributionStatus {
    Pending = 0,
    Active = 1,
    Finalized = 2,
});

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DistributionRegistry {
    pub authority: Pubkey,
    pub total_cycles: u64,
    pub total_distributed: u64,
    pub is_active: bool,
}

impl AccountRecord for DistributionRegistry {
    fn layout() -> &'static Layout {
        &DISTRIBUTION_REGISTRY
    }

    fn read(r: &RecordReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            authority: r.pubkey("authority")?,
            total_cycles: r.u64("total_cycles")?,
            total_distributed: r.u64("total_distributed")?,
            is_active: r.bool("is_active")?,
        })
    }

    fn write(&self, w: &mut RecordWriter) -> Result<(), EncodeError> {
        w.put_pubkey("authority", &self.authority)?;
        w.put_u64("total_cycles", self.total_cycles)?;
        w.put_u64("total_distributed", self.total_distributed)?;
        w.put_bool("is_active", self.is_active)
    }
}

/// Property backing a distribution cycle, when there is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    pub value: u64,
    pub rental_yield_bps: u16,
}

/// One quarterly profit distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionCycle {
    pub cycle_id: u64,
    /// Quarters since Q1 2024
    pub quarter_index: u64,
    pub total_profit_gross: u64,
    pub total_distributable_amount: u64,
    pub total_claimed: u64,
    pub total_claimants: u64,
    pub token_type: TreasuryToken,
    pub status: DistributionStatus,
    pub snapshot_timestamp: i64,
    pub claim_start_time: i64,
    pub claim_end_time: i64,
    pub merkle_root: [u8; 32],
    pub property: Option<PropertyInfo>,
}

impl DistributionCycle {
    pub fn year(&self) -> u64 {
        self.quarter_index / 4 + DISTRIBUTION_EPOCH_YEAR
    }

    /// 1 through 4
    pub fn quarter(&self) -> u8 {
        (self.quarter_index % 4) as u8 + 1
    }

    pub fn remaining(&self) -> u64 {
        self.total_distributable_amount.saturating_sub(self.total_claimed)
    }

    pub fn is_claim_window_open(&self, now: i64) -> bool {
        self.status == DistributionStatus::Active && self.claim_start_time <= now && now < self.claim_end_time
    }

    pub fn ensure_claimable(&self, now: i64, amount: u64, already_claimed: bool) -> Result<(), EconomicError> {
        if amount == 0 {
            return Err(EconomicError::InvalidAmount);
        }
        if already_claimed {
            return Err(EconomicError::AlreadyClaimed {
                cycle_id: self.cycle_id,
            });
        }
        if !self.is_claim_window_open(now) {
            return Err(EconomicError::ClaimWindowClosed {
                cycle_id: self.cycle_id,
            });
        }
        let remaining = self.remaining();
        if amount > remaining {
            return Err(EconomicError::DistributionExhausted {
                remaining,
                requested: amount,
            });
        }
        Ok(())
    }

    pub fn validate(&self) -> Vec<Anomaly> {
        if self.total_claimed > self.total_distributable_amount {
            vec![Anomaly::DistributionOverClaimed {
                claimed: self.total_claimed,
                distributable: self.total_distributable_amount,
            }]
        } else {
            Vec::new()
        }
    }

    /// Compares with an earlier snapshot of the same cycle.
    pub fn check_progression(&self, previous: &DistributionCycle) -> Vec<Anomaly> {
        let mut anomalies = self.validate();
        if self.status < previous.status {
            anomalies.push(Anomaly::StatusRegressed {
                from: format!("{:?}", previous.status),
                to: format!("{:?}", self.status),
            });
        }
        anomalies
    }
}

impl AccountRecord for DistributionCycle {
    fn layout() -> &'static Layout {
        &DISTRIBUTION_CYCLE
    }

    fn read(r: &RecordReader<'_>) -> Result<Self, DecodeError> {
        let property = if r.bool("has_property")? {
            Some(PropertyInfo {
                value: r.u64("property_value")?,
                rental_yield_bps: r.u16("rental_yield_bps")?,
            })
        } else {
            None
        };
        Ok(Self {
            cycle_id: r.u64("cycle_id")?,
            quarter_index: r.u64("quarter_index")?,
            total_profit_gross: r.u64("total_profit_gross")?,
            total_distributable_amount: r.u64("total_distributable_amount")?,
            total_claimed: r.u64("total_claimed")?,
            total_claimants: r.u64("total_claimants")?,
            token_type: r.tag("token_type")?,
            status: r.tag("status")?,
            snapshot_timestamp: r.i64("snapshot_timestamp")?,
            claim_start_time: r.i64("claim_start_time")?,
            claim_end_time: r.i64("claim_end_time")?,
            merkle_root: r.bytes32("merkle_root")?,
            property,
        })
    }

    fn write(&self, w: &mut RecordWriter) -> Result<(), EncodeError> {
        w.put_u64("cycle_id", self.cycle_id)?;
        w.put_u64("quarter_index", self.quarter_index)?;
        w.put_u64("total_profit_gross", self.total_profit_gross)?;
        w.put_u64("total_distributable_amount", self.total_distributable_amount)?;
        w.put_u64("total_claimed", self.total_claimed)?;
        w.put_u64("total_claimants", self.total_claimants)?;
        w.put_tag("token_type", self.token_type)?;
        w.put_tag("status", self.status)?;
        w.put_i64("snapshot_timestamp", self.snapshot_timestamp)?;
        w.put_i64("claim_start_time", self.claim_start_time)?;
        w.put_i64("claim_end_time", self.claim_end_time)?;
        w.put_bytes32("merkle_root", &self.merkle_root)?;
        w.put_bool("has_property", self.property.is_some())?;
        if let Some(property) = &self.property {
            w.put_u64("property_value", property.value)?;
            w.put_u16("rental_yield_bps", property.rental_yield_bps)?;
        }
        Ok(())
    }
}

/// Marks a wallet's claim on one cycle. Its existence alone means "already claimed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClaimRecord {
    pub cycle_id: u64,
    pub claimed_amount: u64,
    pub claimed_at: i64,
}

impl AccountRecord for ClaimRecord {
    fn layout() -> &'static Layout {
        &CLAIM_RECORD
    }

    fn read(r: &RecordReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            cycle_id: r.u64("cycle_id")?,
            claimed_amount: r.u64("claimed_amount")?,
            claimed_at: r.i64("claimed_at")?,
        })
    }

    fn write(&self, w: &mut RecordWriter) -> Result<(), EncodeError> {
        w.put_u64("cycle_id", self.cycle_id)?;
        w.put_u64("claimed_amount", self.claimed_amount)?;
        w.put_i64("claimed_at", self.claimed_at)
    }
}

/// Pro-rata share of `distributable` for a holder of `balance` out of `supply`.
pub fn estimate_share(balance: u64, supply: u64, distributable: u64) -> u64 {
    if supply == 0 {
        return 0;
    }
    (balance as u128 * distributable as u128 / supply as u128) as u64
}
