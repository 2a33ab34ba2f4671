use anchor_lang::prelude::Pubkey;

use super::Anomaly;
use crate::codec::{AccountRecord, Field, FieldKind, Layout, RecordKind, RecordReader, RecordWriter};
use crate::errors::{DecodeError, EncodeError};

const BUYER_FIELDS: &[Field] = &[
    Field::new("buyer", 8, FieldKind::Pubkey),
    Field::new("total_purchased", 40, FieldKind::U64),
    Field::new("total_paid_usd", 48, FieldKind::U64),
    Field::new("total_claimed", 56, FieldKind::U64),
    Field::new("bonus_received", 64, FieldKind::U64),
    Field::new("is_vip", 72, FieldKind::Bool),
    Field::new("refunded", 73, FieldKind::Bool),
];

pub static BUYER_RECORD: Layout = Layout {
    kind: RecordKind::BuyerRecord,
    account_name: "BuyerData",
    discriminator: Some([237, 107, 147, 115, 15, 254, 79, 234]),
    size: 74,
    fields: BUYER_FIELDS,
};

const WHITELIST_FIELDS: &[Field] = &[
    Field::new("user", 8, FieldKind::Pubkey),
    Field::new("is_whitelisted", 40, FieldKind::Bool),
    Field::new("is_vip", 41, FieldKind::Bool),
    Field::new("total_purchased", 42, FieldKind::U64),
];

pub static WHITELIST_ENTRY: Layout = Layout {
    kind: RecordKind::WhitelistEntry,
    account_name: "WhitelistEntry",
    discriminator: Some([51, 70, 173, 81, 219, 192, 234, 62]),
    size: 50,
    fields: WHITELIST_FIELDS,
};

/// Per-buyer purchase totals
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuyerRecord {
    pub buyer: Pubkey,
    pub total_purchased: u64,
    pub total_paid_usd: u64,
    pub total_claimed: u64,
    pub bonus_received: u64,
    pub is_vip: bool,
    pub refunded: bool,
}

impl BuyerRecord {
    pub fn claimable(&self) -> u64 {
        if self.refunded {
            return 0;
        }
        self.total_purchased.saturating_sub(self.total_claimed)
    }

    pub fn validate(&self) -> Vec<Anomaly> {
        if self.total_claimed > self.total_purchased {
            vec![Anomaly::OverClaimed {
                claimed: self.total_claimed,
                purchased: self.total_purchased,
            }]
        } else {
            Vec::new()
        }
    }
}

impl AccountRecord for BuyerRecord {
    fn layout() -> &'static Layout {
        &BUYER_RECORD
    }

    fn read(r: &RecordReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            buyer: r.pubkey("buyer")?,
            total_purchased: r.u64("total_purchased")?,
            total_paid_usd: r.u64("total_paid_usd")?,
            total_claimed: r.u64("total_claimed")?,
            bonus_received: r.u64("bonus_received")?,
            is_vip: r.bool("is_vip")?,
            refunded: r.bool("refunded")?,
        })
    }

    fn write(&self, w: &mut RecordWriter) -> Result<(), EncodeError> {
        w.put_pubkey("buyer", &self.buyer)?;
        w.put_u64("total_purchased", self.total_purchased)?;
        w.put_u64("total_paid_usd", self.total_paid_usd)?;
        w.put_u64("total_claimed", self.total_claimed)?;
        w.put_u64("bonus_received", self.bonus_received)?;
        w.put_bool("is_vip", self.is_vip)?;
        w.put_bool("refunded", self.refunded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WhitelistEntry {
    pub user: Pubkey,
    pub is_whitelisted: bool,
    pub is_vip: bool,
    pub total_purchased: u64,
}

impl AccountRecord for WhitelistEntry {
    fn layout() -> &'static Layout {
        &WHITELIST_ENTRY
    }

    fn read(r: &RecordReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            user: r.pubkey("user")?,
            is_whitelisted: r.bool("is_whitelisted")?,
            is_vip: r.bool("is_vip")?,
            total_purchased: r.u64("total_purchased")?,
        })
    }

    fn write(&self, w: &mut RecordWriter) -> Result<(), EncodeError> {
        w.put_pubkey("user", &self.user)?;
        w.put_bool("is_whitelisted", self.is_whitelisted)?;
        w.put_bool("is_vip", self.is_vip)?;
        w.put_u64("total_purchased", self.total_purchased)
    }
}
