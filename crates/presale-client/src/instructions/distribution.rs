use anchor_lang::prelude::Pubkey;
use anchor_spl::token::spl_token::native_mint;

use super::utils::{create_associated_token_account_idempotent, readonly, signer, system, token_program, writable};
use super::{BuiltTransaction, OperationKind, TransactionBuilder};
use crate::codec::instruction::ClaimDistribution;
use crate::errors::BuildError;
use crate::pda::{associated_token_address, Derivation};
use crate::state::{DistributionCycle, TreasuryToken};

impl TransactionBuilder {
    /// Mint a cycle pays out in. SOL cycles pay wrapped SOL.
    pub fn payout_mint(&self, token: TreasuryToken) -> Pubkey {
        match token {
            TreasuryToken::Usdc => self.usdc_mint,
            TreasuryToken::Usdt => self.usdt_mint,
            TreasuryToken::Sol => native_mint::ID,
        }
    }

    /// `amount` and `proof` come from the off-chain distribution tree.
    pub fn claim_distribution(
        &self,
        user: Pubkey,
        cycle: &DistributionCycle,
        amount: u64,
        proof: Vec<[u8; 32]>,
        create_token_account: bool,
    ) -> Result<BuiltTransaction, BuildError> {
        if cycle.cycle_id == 0 {
            return Err(BuildError::InvalidArgument("cycle id is zero"));
        }
        if amount == 0 {
            return Err(BuildError::InvalidArgument("claim amount is zero"));
        }
        let mint = self.payout_mint(cycle.token_type);
        let distribution_authority = self.derive(Derivation::DistributionAuthority)?;
        let accounts = vec![
            readonly(self.derive(Derivation::DistributionRegistry)?),
            writable(self.derive(Derivation::DistributionCycle(cycle.cycle_id))?),
            writable(self.derive(Derivation::ClaimRecord {
                cycle_id: cycle.cycle_id,
                user,
            })?),
            readonly(distribution_authority),
            writable(associated_token_address(&distribution_authority, &mint)),
            writable(associated_token_address(&user, &mint)),
            signer(user),
            token_program(),
            system(),
        ];
        let args = ClaimDistribution {
            cycle_id: cycle.cycle_id,
            amount,
            proof,
        };

        let mut instructions = Vec::with_capacity(2);
        if create_token_account {
            instructions.push(create_associated_token_account_idempotent(&user, &user, &mint));
        }
        instructions.push(self.instruction(&args, accounts)?);
        Ok(self.finish(OperationKind::ClaimDistribution, user, instructions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::InstructionArgs;
    use crate::config::ClientConfig;
    use crate::pricing::BonusTable;
    use crate::state::DistributionStatus;

    fn builder() -> (TransactionBuilder, ClientConfig) {
        let config = ClientConfig::new(
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            BonusTable::default(),
        );
        (TransactionBuilder::new(&config), config)
    }

    fn cycle(cycle_id: u64, token_type: TreasuryToken) -> DistributionCycle {
        DistributionCycle {
            cycle_id,
            quarter_index: 2,
            total_profit_gross: 2_000,
            total_distributable_amount: 1_000,
            total_claimed: 0,
            total_claimants: 0,
            token_type,
            status: DistributionStatus::Active,
            snapshot_timestamp: 0,
            claim_start_time: 0,
            claim_end_time: 100,
            merkle_root: [0; 32],
            property: None,
        }
    }

    #[test]
    fn test_claim_encodes_proof() {
        let (builder, config) = builder();
        let user = Pubkey::new_unique();
        let tx = builder
            .claim_distribution(user, &cycle(4, TreasuryToken::Usdt), 250, vec![[7; 32], [9; 32]], false)
            .unwrap();
        let ix = &tx.instructions[0];
        assert_eq!(&ix.data[..8], &ClaimDistribution::SELECTOR);
        assert_eq!(&ix.data[8..16], &4u64.to_le_bytes());
        assert_eq!(&ix.data[16..24], &250u64.to_le_bytes());
        assert_eq!(&ix.data[24..28], &2u32.to_le_bytes());
        assert_eq!(ix.data.len(), 28 + 64);
        assert_eq!(ix.accounts[5].pubkey, associated_token_address(&user, &config.usdt_mint));
        assert_eq!(ix.accounts.len(), 9);
    }

    #[test]
    fn test_sol_cycle_pays_wrapped_sol() {
        let (builder, _) = builder();
        let user = Pubkey::new_unique();
        let tx = builder
            .claim_distribution(user, &cycle(1, TreasuryToken::Sol), 1, Vec::new(), true)
            .unwrap();
        assert_eq!(tx.instructions.len(), 2);
        let ix = &tx.instructions[1];
        assert_eq!(ix.accounts[5].pubkey, associated_token_address(&user, &native_mint::ID));
    }

    #[test]
    fn test_claim_preconditions() {
        let (builder, _) = builder();
        let user = Pubkey::new_unique();
        assert_eq!(
            builder.claim_distribution(user, &cycle(0, TreasuryToken::Usdc), 1, Vec::new(), false),
            Err(BuildError::InvalidArgument("cycle id is zero"))
        );
        assert_eq!(
            builder.claim_distribution(user, &cycle(1, TreasuryToken::Usdc), 0, Vec::new(), false),
            Err(BuildError::InvalidArgument("claim amount is zero"))
        );
    }
}
