//! Binary codecs for program accounts and instruction payloads.

pub mod instruction;
pub mod layout;

pub use instruction::{
    discriminator_for, encode_instruction, selector_for, InstructionArgs, PaymentToken, ProposalAction, StakeDuration,
    VoteChoice,
};
pub use layout::{AccountRecord, Field, FieldKind, Layout, RecordKind, RecordReader, RecordWriter};

use crate::errors::DecodeError;
use crate::state::{
    BuyerRecord, ClaimRecord, DistributionCycle, DistributionRegistry, GovernanceProposal, PresaleState,
    ProposalCounter, StakingPool, StakingRecord, WhitelistEntry,
};

/// Any decoded program account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedRecord {
    PresaleState(Box<PresaleState>),
    BuyerRecord(BuyerRecord),
    WhitelistEntry(WhitelistEntry),
    StakingRecord(StakingRecord),
    StakingPool(StakingPool),
    GovernanceProposal(Box<GovernanceProposal>),
    ProposalCounter(ProposalCounter),
    DistributionRegistry(DistributionRegistry),
    DistributionCycle(DistributionCycle),
    ClaimRecord(ClaimRecord),
}

impl TypedRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            TypedRecord::PresaleState(_) => RecordKind::PresaleState,
            TypedRecord::BuyerRecord(_) => RecordKind::BuyerRecord,
            TypedRecord::WhitelistEntry(_) => RecordKind::WhitelistEntry,
            TypedRecord::StakingRecord(_) => RecordKind::StakingRecord,
            TypedRecord::StakingPool(_) => RecordKind::StakingPool,
            TypedRecord::GovernanceProposal(_) => RecordKind::GovernanceProposal,
            TypedRecord::ProposalCounter(_) => RecordKind::ProposalCounter,
            TypedRecord::DistributionRegistry(_) => RecordKind::DistributionRegistry,
            TypedRecord::DistributionCycle(_) => RecordKind::DistributionCycle,
            TypedRecord::ClaimRecord(_) => RecordKind::ClaimRecord,
        }
    }
}

/// Decodes `data` as the given record kind.
pub fn decode(data: &[u8], kind: RecordKind) -> Result<TypedRecord, DecodeError> {
    let record = match kind {
        RecordKind::PresaleState => TypedRecord::PresaleState(Box::new(PresaleState::decode(data)?)),
        RecordKind::BuyerRecord => TypedRecord::BuyerRecord(BuyerRecord::decode(data)?),
        RecordKind::WhitelistEntry => TypedRecord::WhitelistEntry(WhitelistEntry::decode(data)?),
        RecordKind::StakingRecord => TypedRecord::StakingRecord(StakingRecord::decode(data)?),
        RecordKind::StakingPool => TypedRecord::StakingPool(StakingPool::decode(data)?),
        RecordKind::GovernanceProposal => {
            TypedRecord::GovernanceProposal(Box::new(GovernanceProposal::decode(data)?))
        }
        RecordKind::ProposalCounter => TypedRecord::ProposalCounter(ProposalCounter::decode(data)?),
        RecordKind::DistributionRegistry => {
            TypedRecord::DistributionRegistry(DistributionRegistry::decode(data)?)
        }
        RecordKind::DistributionCycle => TypedRecord::DistributionCycle(DistributionCycle::decode(data)?),
        RecordKind::ClaimRecord => TypedRecord::ClaimRecord(ClaimRecord::decode(data)?),
    };
    Ok(record)
}

/// Decodes an account whose kind is only known from its discriminator.
pub fn decode_any(data: &[u8]) -> Result<TypedRecord, DecodeError> {
    decode(data, RecordKind::sniff(data)?)
}
