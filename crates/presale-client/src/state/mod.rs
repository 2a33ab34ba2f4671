//! Mirrors of the program's accounts. Snapshots are decoded wholesale and never patched.

mod buyer;
mod distribution;
mod governance;
mod presale;
mod staking;

pub use buyer::*;
pub use distribution::*;
pub use governance::*;
pub use presale::*;
pub use staking::*;

use crate::codec::instruction::tag_conversions;

/// Layout tables, one per record kind.
pub mod layouts {
    pub use super::buyer::{BUYER_RECORD, WHITELIST_ENTRY};
    pub use super::distribution::{CLAIM_RECORD, DISTRIBUTION_CYCLE, DISTRIBUTION_REGISTRY};
    pub use super::governance::{GOVERNANCE_PROPOSAL, PROPOSAL_COUNTER};
    pub use super::presale::PRESALE_STATE;
    pub use super::staking::{STAKING_POOL, STAKING_RECORD};
}

/// Asset held by the treasury or paid out by a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreasuryToken {
    Usdc,
    Usdt,
    Sol,
}

tag_conversions!(TreasuryToken { Usdc = 0, Usdt = 1, Sol = 2 });

/// A decoded value that breaks an invariant the program is supposed to uphold.
/// The record is still returned; the caller decides whether to trust it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    PhaseOversold { phase: usize, sold: u64, cap: u64 },
    VipOverfilled { count: u64, max: u64 },
    WithdrawalLimitOutOfRange(u8),
    OverWithdrawn { withdrawn: u64, raised: u64 },
    OverClaimed { claimed: u64, purchased: u64 },
    DistributionOverClaimed { claimed: u64, distributable: u64 },
    StatusRegressed { from: String, to: String },
    TallyDecreased { proposal_id: u64 },
    VotesOutsideActive { proposal_id: u64 },
    OutcomeBeforeVotingEnd { proposal_id: u64, status: String },
}
