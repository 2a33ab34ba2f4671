use anchor_lang::prelude::Pubkey;

use super::{Anomaly, TreasuryToken};
use crate::codec::instruction::tag_conversions;
use crate::codec::{
    AccountRecord, Field, FieldKind, Layout, ProposalAction, RecordKind, RecordReader, RecordWriter,
};
use crate::constants::{
    BPS_DENOMINATOR, MIN_PROPOSAL_POWER, PROPERTY_ADDRESS_CAP, PROPOSAL_DESCRIPTION_CAP, PROPOSAL_TITLE_CAP,
};
use crate::errors::{DecodeError, EconomicError, EncodeError};
use crate::state::StakingRecord;

const PROPOSAL_FIELDS: &[Field] = &[
    Field::new("proposal_id", 8, FieldKind::U64),
    Field::new("proposer", 16, FieldKind::Pubkey),
    Field::new("action", 48, FieldKind::U8),
    Field::new("status", 49, FieldKind::U8),
    Field::new("title", 50, FieldKind::Str { len_width: 1, cap: PROPOSAL_TITLE_CAP }),
    Field::new(
        "description",
        115,
        FieldKind::Str {
            len_width: 2,
            cap: PROPOSAL_DESCRIPTION_CAP,
        },
    ),
    Field::new(
        "property_address",
        373,
        FieldKind::Str {
            len_width: 2,
            cap: PROPERTY_ADDRESS_CAP,
        },
    ),
    Field::new("property_value", 439, FieldKind::U64),
    Field::new("property_id", 447, FieldKind::Bytes32),
    Field::new("transfer_amount", 479, FieldKind::U64),
    Field::new("transfer_token_type", 487, FieldKind::U8),
    Field::new("transfer_recipient", 488, FieldKind::Pubkey),
    Field::new("voting_start", 520, FieldKind::I64),
    Field::new("voting_end", 528, FieldKind::I64),
    Field::new("quorum_required", 536, FieldKind::U64),
    Field::new("approval_threshold", 544, FieldKind::U16),
    Field::new("created_at", 546, FieldKind::I64),
    Field::new("votes_yes", 554, FieldKind::U64),
    Field::new("votes_no", 562, FieldKind::U64),
    Field::new("votes_abstain", 570, FieldKind::U64),
    Field::new("total_voters", 578, FieldKind::U64),
    Field::new("executed_at", 586, FieldKind::I64),
    Field::new("quorum_reached", 594, FieldKind::Bool),
    Field::new("can_execute", 595, FieldKind::Bool),
    Field::new("is_executed", 596, FieldKind::Bool),
];

pub static GOVERNANCE_PROPOSAL: Layout = Layout {
    kind: RecordKind::GovernanceProposal,
    account_name: "Proposal",
    discriminator: Some([26, 94, 189, 187, 116, 136, 53, 33]),
    size: 597,
    fields: PROPOSAL_FIELDS,
};

const COUNTER_FIELDS: &[Field] = &[Field::new("next_id", 8, FieldKind::U64)];

pub static PROPOSAL_COUNTER: Layout = Layout {
    kind: RecordKind::ProposalCounter,
    account_name: "ProposalCounter",
    discriminator: Some([110, 92, 147, 182, 142, 28, 182, 5]),
    size: 16,
    fields: COUNTER_FIELDS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalStatus {
    Draft,
    Active,
    Succeeded,
    Defeated,
    Executed,
    Cancelled,
    Expired,
}

tag_conversions!(ProposalStatus {
    Draft = 0,
    Active = 1,
    Succeeded = 2,
    Defeated = 3,
    Executed = 4,
    Cancelled = 5,
    Expired = 6,
});

impl ProposalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProposalStatus::Defeated | ProposalStatus::Executed | ProposalStatus::Cancelled | ProposalStatus::Expired
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceProposal {
    pub proposal_id: u64,
    pub proposer: Pubkey,
    pub action: ProposalAction,
    pub status: ProposalStatus,
    pub title: String,
    pub description: String,
    pub property_address: String,
    pub property_value: u64,
    pub property_id: [u8; 32],
    pub transfer_amount: u64,
    pub transfer_token_type: TreasuryToken,
    pub transfer_recipient: Pubkey,
    pub voting_start: i64,
    pub voting_end: i64,
    /// Basis points of the voting supply
    pub quorum_required: u64,
    /// Basis points of cast votes
    pub approval_threshold: u16,
    pub created_at: i64,
    pub votes_yes: u64,
    pub votes_no: u64,
    pub votes_abstain: u64,
    pub total_voters: u64,
    pub executed_at: i64,
    pub quorum_reached: bool,
    pub can_execute: bool,
    pub is_executed: bool,
}

/// Vote shares of a proposal measured against a voting supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalTally {
    pub total_votes: u64,
    pub yes_bps: u64,
    pub no_bps: u64,
    pub abstain_bps: u64,
    pub quorum_reached: bool,
    pub passed: bool,
}

impl GovernanceProposal {
    pub fn total_votes(&self) -> u64 {
        self.votes_yes
            .saturating_add(self.votes_no)
            .saturating_add(self.votes_abstain)
    }

    pub fn is_voting_open(&self, now: i64) -> bool {
        self.status == ProposalStatus::Active && self.voting_start <= now && now < self.voting_end
    }

    pub fn tally(&self, supply: u64) -> ProposalTally {
        let total = self.total_votes();
        let share = |votes: u64| {
            if total == 0 {
                0
            } else {
                (votes as u128 * BPS_DENOMINATOR as u128 / total as u128) as u64
            }
        };
        let yes_bps = share(self.votes_yes);
        let quorum_reached =
            total as u128 * BPS_DENOMINATOR as u128 >= self.quorum_required as u128 * supply as u128;
        ProposalTally {
            total_votes: total,
            yes_bps,
            no_bps: share(self.votes_no),
            abstain_bps: share(self.votes_abstain),
            quorum_reached,
            passed: quorum_reached && yes_bps > self.approval_threshold as u64,
        }
    }

    pub fn ensure_votable(&self, now: i64) -> Result<(), EconomicError> {
        if self.is_voting_open(now) {
            Ok(())
        } else {
            Err(EconomicError::VotingClosed {
                proposal_id: self.proposal_id,
            })
        }
    }

    pub fn ensure_executable(&self) -> Result<(), EconomicError> {
        if self.status == ProposalStatus::Succeeded && !self.is_executed {
            Ok(())
        } else {
            Err(EconomicError::ProposalNotExecutable {
                proposal_id: self.proposal_id,
            })
        }
    }

    /// An outcome is only final once voting has closed, unless the proposal was
    /// executed or cancelled.
    pub fn validate(&self, now: i64) -> Vec<Anomaly> {
        let outcome = matches!(
            self.status,
            ProposalStatus::Succeeded | ProposalStatus::Defeated | ProposalStatus::Expired
        );
        if outcome && !self.is_executed && now < self.voting_end {
            vec![Anomaly::OutcomeBeforeVotingEnd {
                proposal_id: self.proposal_id,
                status: format!("{:?}", self.status),
            }]
        } else {
            Vec::new()
        }
    }

    /// Compares with an earlier snapshot of the same proposal.
    pub fn check_progression(&self, previous: &GovernanceProposal, now: i64) -> Vec<Anomaly> {
        let mut anomalies = self.validate(now);
        let decreased = self.votes_yes < previous.votes_yes
            || self.votes_no < previous.votes_no
            || self.votes_abstain < previous.votes_abstain;
        if decreased {
            anomalies.push(Anomaly::TallyDecreased {
                proposal_id: self.proposal_id,
            });
        }
        let changed = self.votes_yes != previous.votes_yes
            || self.votes_no != previous.votes_no
            || self.votes_abstain != previous.votes_abstain;
        if changed && previous.status != ProposalStatus::Active {
            anomalies.push(Anomaly::VotesOutsideActive {
                proposal_id: self.proposal_id,
            });
        }
        let reopened = self.status == ProposalStatus::Draft && previous.status != ProposalStatus::Draft;
        if (previous.status.is_terminal() && self.status != previous.status) || reopened {
            anomalies.push(Anomaly::StatusRegressed {
                from: format!("{:?}", previous.status),
                to: format!("{:?}", self.status),
            });
        }
        anomalies
    }
}

impl AccountRecord for GovernanceProposal {
    fn layout() -> &'static Layout {
        &GOVERNANCE_PROPOSAL
    }

    fn read(r: &RecordReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            proposal_id: r.u64("proposal_id")?,
            proposer: r.pubkey("proposer")?,
            action: r.tag("action")?,
            status: r.tag("status")?,
            title: r.string("title")?,
            description: r.string("description")?,
            property_address: r.string("property_address")?,
            property_value: r.u64("property_value")?,
            property_id: r.bytes32("property_id")?,
            transfer_amount: r.u64("transfer_amount")?,
            transfer_token_type: r.tag("transfer_token_type")?,
            transfer_recipient: r.pubkey("transfer_recipient")?,
            voting_start: r.i64("voting_start")?,
            voting_end: r.i64("voting_end")?,
            quorum_required: r.u64("quorum_required")?,
            approval_threshold: r.u16("approval_threshold")?,
            created_at: r.i64("created_at")?,
            votes_yes: r.u64("votes_yes")?,
            votes_no: r.u64("votes_no")?,
            votes_abstain: r.u64("votes_abstain")?,
            total_voters: r.u64("total_voters")?,
            executed_at: r.i64("executed_at")?,
            quorum_reached: r.bool("quorum_reached")?,
            can_execute: r.bool("can_execute")?,
            is_executed: r.bool("is_executed")?,
        })
    }

    fn write(&self, w: &mut RecordWriter) -> Result<(), EncodeError> {
        w.put_u64("proposal_id", self.proposal_id)?;
        w.put_pubkey("proposer", &self.proposer)?;
        w.put_tag("action", self.action)?;
        w.put_tag("status", self.status)?;
        w.put_string("title", &self.title)?;
        w.put_string("description", &self.description)?;
        w.put_string("property_address", &self.property_address)?;
        w.put_u64("property_value", self.property_value)?;
        w.put_bytes32("property_id", &self.property_id)?;
        w.put_u64("transfer_amount", self.transfer_amount)?;
        w.put_tag("transfer_token_type", self.transfer_token_type)?;
        w.put_pubkey("transfer_recipient", &self.transfer_recipient)?;
        w.put_i64("voting_start", self.voting_start)?;
        w.put_i64("voting_end", self.voting_end)?;
        w.put_u64("quorum_required", self.quorum_required)?;
        w.put_u16("approval_threshold", self.approval_threshold)?;
        w.put_i64("created_at", self.created_at)?;
        w.put_u64("votes_yes", self.votes_yes)?;
        w.put_u64("votes_no", self.votes_no)?;
        w.put_u64("votes_abstain", self.votes_abstain)?;
        w.put_u64("total_voters", self.total_voters)?;
        w.put_i64("executed_at", self.executed_at)?;
        w.put_bool("quorum_reached", self.quorum_reached)?;
        w.put_bool("can_execute", self.can_execute)?;
        w.put_bool("is_executed", self.is_executed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProposalCounter {
    pub next_id: u64,
}

impl AccountRecord for ProposalCounter {
    fn layout() -> &'static Layout {
        &PROPOSAL_COUNTER
    }

    fn read(r: &RecordReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            next_id: r.u64("next_id")?,
        })
    }

    fn write(&self, w: &mut RecordWriter) -> Result<(), EncodeError> {
        w.put_u64("next_id", self.next_id)
    }
}

/// Governance weight of one wallet, in token minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VotingPower {
    pub wallet: u64,
    pub staked: u64,
    pub total: u64,
}

impl VotingPower {
    /// Wallet balance plus the active stake, which counts double for classes of a year or more.
    pub fn compute(wallet_balance: u64, stake: Option<&StakingRecord>) -> Result<Self, EconomicError> {
        let (staked, weight) = match stake {
            Some(record) if record.is_active && record.amount_staked > 0 => {
                let weight = if record.duration.is_long_term() { 2 } else { 1 };
                (record.amount_staked, weight)
            }
            _ => (0, 1),
        };
        let total = staked
            .checked_mul(weight)
            .and_then(|weighted| weighted.checked_add(wallet_balance))
            .ok_or(EconomicError::Overflow)?;
        Ok(Self {
            wallet: wallet_balance,
            staked,
            total,
        })
    }

    pub fn ensure_can_propose(&self, token_decimals: u8) -> Result<(), EconomicError> {
        let need = 10u64
            .checked_pow(token_decimals as u32)
            .and_then(|unit| unit.checked_mul(MIN_PROPOSAL_POWER))
            .ok_or(EconomicError::Overflow)?;
        if self.total >= need {
            Ok(())
        } else {
            Err(EconomicError::InsufficientVotingPower { have: self.total, need })
        }
    }

    pub fn ensure_can_vote(&self) -> Result<(), EconomicError> {
        if self.total > 0 {
            Ok(())
        } else {
            Err(EconomicError::InsufficientVotingPower { have: 0, need: 1 })
        }
    }
}
