//! Instruction payloads: an 8-byte selector followed by Borsh-encoded arguments.

use anchor_lang::prelude::{borsh, Pubkey};
use anchor_lang::solana_program::hash::hash;
use anchor_lang::{AnchorDeserialize, AnchorSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{PROPOSAL_DESCRIPTION_CAP, PROPOSAL_TITLE_CAP};
use crate::errors::EncodeError;

/// Currency a purchase is paid in.
#[derive(AnchorSerialize, AnchorDeserialize, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentToken {
    Sol,
    Usdc,
    Usdt,
}

/// Staking lock class, in on-chain tag order.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StakeDuration {
    SixMonths,
    OneYear,
    TwoYears,
    ThreeYears,
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalAction {
    TreasuryTransfer,
    UpdateStakingParams,
    PauseProtocol,
    CustomAction,
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
}

macro_rules! tag_conversions {
    ($ty:ident { $($variant:ident = $tag:literal),+ $(,)? }) => {
        impl From<$ty> for u8 {
            fn from(value: $ty) -> u8 {
                match value {
                    $($ty::$variant => $tag,)+
                }
            }
        }

        impl TryFrom<u8> for $ty {
            type Error = u8;

            fn try_from(tag: u8) -> Result<Self, u8> {
                match tag {
                    $($tag => Ok($ty::$variant),)+
                    other => Err(other),
                }
            }
        }
    };
}

pub(crate) use tag_conversions;

tag_conversions!(PaymentToken { Sol = 0, Usdc = 1, Usdt = 2 });
tag_conversions!(StakeDuration { SixMonths = 0, OneYear = 1, TwoYears = 2, ThreeYears = 3 });
tag_conversions!(ProposalAction {
    TreasuryTransfer = 0,
    UpdateStakingParams = 1,
    PauseProtocol = 2,
    CustomAction = 3,
});
tag_conversions!(VoteChoice { Yes = 0, No = 1, Abstain = 2 });

/// Computes the Anchor selector `sha256("global:<name>")[..8]`.
pub fn selector_for(name: &str) -> [u8; 8] {
    let digest = hash(format!("global:{name}").as_bytes()).to_bytes();
    let mut selector = [0u8; 8];
    selector.copy_from_slice(&digest[..8]);
    selector
}

/// Computes the Anchor account discriminator `sha256("account:<Name>")[..8]`.
pub fn discriminator_for(account_name: &str) -> [u8; 8] {
    let digest = hash(format!("account:{account_name}").as_bytes()).to_bytes();
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&digest[..8]);
    discriminator
}

/// Arguments of one program instruction.
pub trait InstructionArgs: AnchorSerialize {
    const NAME: &'static str;
    const SELECTOR: [u8; 8];
}

/// Selector followed by the arguments in declaration order.
pub fn encode_instruction<A: InstructionArgs>(args: &A) -> Result<Vec<u8>, EncodeError> {
    let mut data = A::SELECTOR.to_vec();
    args.serialize(&mut data)
        .map_err(|err| EncodeError::Serialize(err.to_string()))?;
    Ok(data)
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct BuyTokens {
    /// Fiat amount in micro-dollars
    pub amount: u64,
    pub payment_token: PaymentToken,
    pub referrer: Option<Pubkey>,
}

impl InstructionArgs for BuyTokens {
    const NAME: &'static str = "buy_tokens";
    const SELECTOR: [u8; 8] = [189, 21, 230, 133, 247, 2, 110, 42];
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct BuyTokensVip {
    pub amount: u64,
    pub payment_token: PaymentToken,
}

impl InstructionArgs for BuyTokensVip {
    const NAME: &'static str = "buy_tokens_vip";
    const SELECTOR: [u8; 8] = [123, 86, 2, 10, 132, 17, 80, 48];
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClaimTokens;

impl InstructionArgs for ClaimTokens {
    const NAME: &'static str = "claim_tokens";
    const SELECTOR: [u8; 8] = [108, 216, 210, 231, 0, 212, 42, 64];
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct StakeTokens {
    pub amount: u64,
    pub duration: StakeDuration,
}

impl InstructionArgs for StakeTokens {
    const NAME: &'static str = "stake_tokens";
    const SELECTOR: [u8; 8] = [136, 126, 91, 162, 40, 131, 13, 127];
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClaimRewards;

impl InstructionArgs for ClaimRewards {
    const NAME: &'static str = "claim_rewards";
    const SELECTOR: [u8; 8] = [4, 144, 132, 71, 116, 23, 151, 80];
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct UnstakeTokens;

impl InstructionArgs for UnstakeTokens {
    const NAME: &'static str = "unstake_tokens";
    const SELECTOR: [u8; 8] = [58, 119, 215, 143, 203, 223, 32, 86];
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateProposal {
    pub title: [u8; PROPOSAL_TITLE_CAP],
    pub description: [u8; PROPOSAL_DESCRIPTION_CAP],
    pub action: ProposalAction,
}

impl InstructionArgs for CreateProposal {
    const NAME: &'static str = "create_proposal";
    const SELECTOR: [u8; 8] = [132, 116, 68, 174, 216, 160, 198, 22];
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoteOnProposal {
    pub proposal_id: u64,
    pub support: VoteChoice,
}

impl InstructionArgs for VoteOnProposal {
    const NAME: &'static str = "vote_on_proposal";
    const SELECTOR: [u8; 8] = [188, 239, 13, 88, 119, 199, 251, 119];
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExecuteProposal {
    pub proposal_id: u64,
}

impl InstructionArgs for ExecuteProposal {
    const NAME: &'static str = "execute_proposal";
    const SELECTOR: [u8; 8] = [186, 60, 116, 133, 108, 128, 111, 28];
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClaimDistribution {
    pub cycle_id: u64,
    pub amount: u64,
    pub proof: Vec<[u8; 32]>,
}

impl InstructionArgs for ClaimDistribution {
    const NAME: &'static str = "claim_distribution";
    const SELECTOR: [u8; 8] = [204, 156, 94, 85, 2, 125, 232, 180];
}
