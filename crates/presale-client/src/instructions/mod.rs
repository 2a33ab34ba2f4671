//! Transaction assembly. Builders produce ordered instructions for an external signer;
//! they never sign or submit.

pub mod distribution;
pub mod governance;
pub mod purchase;
pub mod staking;
pub mod utils;

pub use purchase::BuyRequest;

use anchor_lang::prelude::{AccountMeta, Pubkey};
use anchor_lang::solana_program::instruction::Instruction;
use tracing::debug;

use crate::codec::{encode_instruction, InstructionArgs};
use crate::config::ClientConfig;
use crate::errors::BuildError;
use crate::pda::{AddressDeriver, Derivation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Buy,
    BuyVip,
    ClaimTokens,
    Stake,
    Unstake,
    ClaimRewards,
    CreateProposal,
    Vote,
    ExecuteProposal,
    ClaimDistribution,
}

/// Unsigned instructions for one user action, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTransaction {
    pub operation: OperationKind,
    pub fee_payer: Pubkey,
    pub instructions: Vec<Instruction>,
}

impl BuiltTransaction {
    /// The instruction addressed to the presale program.
    pub fn program_instruction(&self, program_id: &Pubkey) -> Option<&Instruction> {
        self.instructions.iter().find(|ix| &ix.program_id == program_id)
    }
}

#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    deriver: AddressDeriver,
    authority: Pubkey,
    token_mint: Pubkey,
    usdc_mint: Pubkey,
    usdt_mint: Pubkey,
    proposal_counter: Option<Pubkey>,
}

impl TransactionBuilder {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            deriver: AddressDeriver::new(config.program_id),
            authority: config.authority,
            token_mint: config.token_mint,
            usdc_mint: config.usdc_mint,
            usdt_mint: config.usdt_mint,
            proposal_counter: config.proposal_counter,
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        self.deriver.program_id()
    }

    fn derive(&self, derivation: Derivation) -> Result<Pubkey, BuildError> {
        self.deriver.address(&derivation).map_err(|source| {
            tracing::error!(derivation = derivation.name(), %source, "required address could not be derived");
            BuildError::MissingDerivedAddress {
                what: derivation.name(),
                source,
            }
        })
    }

    fn instruction<A: InstructionArgs>(&self, args: &A, accounts: Vec<AccountMeta>) -> Result<Instruction, BuildError> {
        Ok(Instruction {
            program_id: *self.deriver.program_id(),
            accounts,
            data: encode_instruction(args)?,
        })
    }

    fn finish(&self, operation: OperationKind, fee_payer: Pubkey, instructions: Vec<Instruction>) -> BuiltTransaction {
        debug!(?operation, %fee_payer, instructions = instructions.len(), "built transaction");
        BuiltTransaction {
            operation,
            fee_payer,
            instructions,
        }
    }
}
