use anchor_lang::prelude::Pubkey;
use thiserror::Error;

use crate::codec::{PaymentToken, RecordKind};
use crate::phase::Phase;
use crate::state::Anomaly;

pub use program::PresaleError;

mod program {
    use anchor_lang::error::ERROR_CODE_OFFSET;
    use anchor_lang::prelude::*;

    /// Error table of the on-chain presale program, in declaration order.
    #[error_code]
    pub enum PresaleError {
        #[msg("Presale has ended")]
        PresaleEnded,
        #[msg("Presale has not started")]
        PresaleNotStarted,
        #[msg("Presale has not ended yet")]
        PresaleNotEnded,
        #[msg("Presale is paused")]
        Paused,
        #[msg("Presale is cancelled")]
        Cancelled,
        #[msg("Phase capacity exceeded")]
        PhaseCapacityExceeded,
        #[msg("Arithmetic overflow")]
        Overflow,
        #[msg("Wallet is not whitelisted")]
        NotWhitelisted,
        #[msg("Wallet is not a VIP member")]
        NotVipMember,
        #[msg("VIP period has not started")]
        VipNotStarted,
        #[msg("VIP period has ended")]
        VipPeriodEnded,
        #[msg("All VIP slots are taken")]
        VipSlotsFull,
        #[msg("Purchase is below the VIP minimum")]
        BelowVipMinimum,
        #[msg("Nothing to claim")]
        NothingToClaim,
        #[msg("Nothing to refund")]
        NothingToRefund,
        #[msg("Already refunded")]
        AlreadyRefunded,
        #[msg("Refund is not allowed")]
        RefundNotAllowed,
        #[msg("Withdrawal limit exceeded")]
        WithdrawalLimitExceeded,
        #[msg("Team vesting is not initialized")]
        TeamVestingNotInitialized,
        #[msg("Team vesting is already initialized")]
        TeamVestingAlreadyInitialized,
    }

    impl PresaleError {
        /// Maps a custom program error code from a failed transaction back to its variant.
        pub fn from_code(code: u32) -> Option<Self> {
            let variant = match code.checked_sub(ERROR_CODE_OFFSET)? {
                0 => Self::PresaleEnded,
                1 => Self::PresaleNotStarted,
                2 => Self::PresaleNotEnded,
                3 => Self::Paused,
                4 => Self::Cancelled,
                5 => Self::PhaseCapacityExceeded,
                6 => Self::Overflow,
                7 => Self::NotWhitelisted,
                8 => Self::NotVipMember,
                9 => Self::VipNotStarted,
                10 => Self::VipPeriodEnded,
                11 => Self::VipSlotsFull,
                12 => Self::BelowVipMinimum,
                13 => Self::NothingToClaim,
                14 => Self::NothingToRefund,
                15 => Self::AlreadyRefunded,
                16 => Self::RefundNotAllowed,
                17 => Self::WithdrawalLimitExceeded,
                18 => Self::TeamVestingNotInitialized,
                19 => Self::TeamVestingAlreadyInitialized,
                _ => return None,
            };
            Some(variant)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeriveError {
    #[error("{count} seeds given, at most {max} allowed")]
    TooManySeeds { count: usize, max: usize },
    #[error("seed {index} is {len} bytes, at most {max} allowed")]
    SeedTooLong { index: usize, len: usize, max: usize },
    #[error("no viable bump seed for this seed list")]
    NoViableBump,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{kind} buffer is {actual} bytes, expected at least {expected}")]
    TooShort {
        kind: RecordKind,
        expected: usize,
        actual: usize,
    },
    #[error("discriminator {found:?} is not a {expected}")]
    WrongRecordKind { expected: RecordKind, found: [u8; 8] },
    #[error("discriminator {0:?} names no known record layout")]
    UnknownRecordKind([u8; 8]),
    #[error("buffer of {actual} bytes has no discriminator")]
    MissingDiscriminator { actual: usize },
    #[error("field `{field}` holds {value}, expected 0 or 1")]
    InvalidBool { field: &'static str, value: u8 },
    #[error("field `{field}` holds unknown tag {value}")]
    InvalidEnumTag { field: &'static str, value: u8 },
    #[error("field `{field}` declares {len} bytes, capacity is {cap}")]
    InvalidStringLength {
        field: &'static str,
        len: usize,
        cap: usize,
    },
    #[error("field `{field}` is not valid utf-8")]
    InvalidUtf8 { field: &'static str },
    #[error("layout has no field `{field}` of the requested type")]
    LayoutMismatch { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("layout has no field `{field}` of the requested type")]
    LayoutMismatch { field: &'static str },
    #[error("field `{field}` is {len} bytes, capacity is {cap}")]
    StringTooLong {
        field: &'static str,
        len: usize,
        cap: usize,
    },
    #[error("failed to serialize instruction args: {0}")]
    Serialize(String),
}

/// Rejections a user can act on. Amounts are in minor units of the named currency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EconomicError {
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("VIP purchases start at {minimum}, requested {requested}")]
    BelowVipMinimum { minimum: u64, requested: u64 },
    #[error("insufficient {token:?} balance: have {have}, need {need}")]
    InsufficientBalance {
        token: PaymentToken,
        have: u64,
        need: u64,
    },
    #[error("{phase:?} has {remaining} tokens left, requested {requested}")]
    PhaseCapacityExceeded {
        phase: Phase,
        remaining: u64,
        requested: u64,
    },
    #[error("all {max_buyers} VIP slots are taken")]
    VipSlotsFull { max_buyers: u64 },
    #[error("VIP period is closed")]
    VipPeriodClosed,
    #[error("purchases of this kind are closed during {phase:?}")]
    PhaseClosed { phase: Phase },
    #[error("sale starts in {starts_in_secs}s")]
    SaleNotStarted { starts_in_secs: u64 },
    #[error("sale has ended")]
    SaleEnded,
    #[error("sale is paused")]
    SalePaused,
    #[error("sale is cancelled")]
    SaleCancelled,
    #[error("presale has not ended, tokens are not claimable yet")]
    PresaleNotEnded,
    #[error("unit price is zero")]
    InvalidPrice,
    #[error("reference rate is not positive")]
    InvalidReferenceRate,
    #[error("reference rate is {age_secs}s old")]
    StaleReferenceRate { age_secs: i64 },
    #[error("too many attempts, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("nothing to claim")]
    NothingToClaim,
    #[error("no active stake")]
    NothingStaked,
    #[error("stake is locked for another {unlocks_in_secs}s")]
    StakeLocked { unlocks_in_secs: u64 },
    #[error("voting power {have} is below the required {need}")]
    InsufficientVotingPower { have: u64, need: u64 },
    #[error("voting is closed for proposal {proposal_id}")]
    VotingClosed { proposal_id: u64 },
    #[error("wallet already voted on proposal {proposal_id}")]
    AlreadyVoted { proposal_id: u64 },
    #[error("proposal {proposal_id} cannot be executed")]
    ProposalNotExecutable { proposal_id: u64 },
    #[error("claim window for cycle {cycle_id} is closed")]
    ClaimWindowClosed { cycle_id: u64 },
    #[error("cycle {cycle_id} was already claimed")]
    AlreadyClaimed { cycle_id: u64 },
    #[error("cycle has {remaining} left to distribute, requested {requested}")]
    DistributionExhausted { remaining: u64, requested: u64 },
    #[error("arithmetic overflow")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("cannot derive {what}: {source}")]
    MissingDerivedAddress {
        what: &'static str,
        #[source]
        source: DeriveError,
    },
    #[error("no {0} address is configured")]
    MissingAddress(&'static str),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("account {0} not found")]
    NotFound(Pubkey),
    #[error("ledger transport failed: {0}")]
    Transport(String),
    #[error("submission rejected: {message}")]
    Submit {
        program_error: Option<u32>,
        message: String,
    },
    #[error("confirmation timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("signing was rejected by the wallet")]
    Rejected,
    #[error("signer failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rate limiter unavailable: {0}")]
pub struct RateLimitError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing configuration key {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("invalid bonus tier table: {0}")]
    BonusTable(String),
    #[error("malformed configuration document: {0}")]
    Json(String),
}

/// Failure recorded by a poll tick. The previous snapshot stays installed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error(transparent)]
    Fetch(#[from] LedgerError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no presale snapshot has been fetched yet")]
    NoSnapshot,
    #[error("snapshot failed its invariant checks: {0:?}")]
    UntrustedSnapshot(Vec<Anomaly>),
    #[error("another operation is still pending")]
    OperationPending,
    #[error("transaction failed on-chain: {}", describe_program_error(.code, .reason))]
    ProgramRejected {
        code: Option<u32>,
        reason: Option<PresaleError>,
    },
    #[error(transparent)]
    Economic(#[from] EconomicError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Signer(#[from] SignerError),
}

fn describe_program_error(code: &Option<u32>, reason: &Option<PresaleError>) -> String {
    match (code, reason) {
        (_, Some(reason)) => reason.to_string(),
        (Some(code), None) => format!("custom program error {code}"),
        (None, None) => "unknown failure".to_string(),
    }
}
