/// Seed for the global presale state PDA
pub const SEED_PRESALE: &[u8] = b"presale";
/// Seed for per-user whitelist entry PDAs
pub const SEED_WHITELIST: &[u8] = b"whitelist";
/// Seed for per-user buyer record PDAs
pub const SEED_BUYER: &[u8] = b"buyer";
/// Seed for the authority PDA that signs vault transfers
pub const SEED_PRESALE_AUTHORITY: &[u8] = b"presale_authority";
pub const SEED_TOKEN_VAULT: &[u8] = b"token_vault";
pub const SEED_USDC_VAULT: &[u8] = b"usdc_vault";
pub const SEED_USDT_VAULT: &[u8] = b"usdt_vault";
/// Seed for per-user staking record PDAs
pub const SEED_STAKING: &[u8] = b"staking";
pub const SEED_STAKING_POOL: &[u8] = b"staking_pool";
pub const SEED_PROPOSAL: &[u8] = b"proposal";
pub const SEED_VOTE: &[u8] = b"vote";
pub const SEED_DISTRIBUTION_REGISTRY: &[u8] = b"distribution_registry";
pub const SEED_DISTRIBUTION_CYCLE: &[u8] = b"distribution_cycle";
pub const SEED_CLAIM_RECORD: &[u8] = b"claim_record";
pub const SEED_DISTRIBUTION_AUTHORITY: &[u8] = b"distribution_authority";

/// Anchor account and instruction discriminator width
pub const DISCRIMINATOR_LEN: usize = 8;

/// Fiat amounts and prices are carried in micro-dollars
pub const USD_DECIMALS: u8 = 6;
pub const DEFAULT_TOKEN_DECIMALS: u8 = 9;
pub const DEFAULT_USDC_DECIMALS: u8 = 6;
pub const DEFAULT_USDT_DECIMALS: u8 = 6;
pub const DEFAULT_SOL_DECIMALS: u8 = 9;

/// Number of numbered sale phases after the VIP window
pub const NUM_PHASES: usize = 3;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// 0.005 SOL kept aside for transaction fees
pub const DEFAULT_NATIVE_FEE_RESERVE_LAMPORTS: u64 = 5_000_000;
/// Extra 2% of a SOL payment asked for when checking the balance
pub const DEFAULT_SOL_MARGIN_BPS: u16 = 200;
/// Oldest reference rate accepted for a SOL conversion estimate
pub const REFERENCE_RATE_MAX_AGE_SECS: i64 = 60;

pub const BPS_DENOMINATOR: u64 = 10_000;
pub const SECONDS_PER_DAY: i64 = 86_400;
pub const SECONDS_PER_YEAR: i64 = 365 * SECONDS_PER_DAY;

pub const PROPOSAL_TITLE_CAP: usize = 64;
pub const PROPOSAL_DESCRIPTION_CAP: usize = 256;
pub const PROPERTY_ADDRESS_CAP: usize = 64;
/// Whole tokens of voting power needed to open a proposal
pub const MIN_PROPOSAL_POWER: u64 = 100;

/// Quarter index 0 of a distribution cycle is Q1 of this year
pub const DISTRIBUTION_EPOCH_YEAR: u64 = 2024;
