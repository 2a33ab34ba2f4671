use anchor_lang::prelude::Pubkey;

use super::utils::{associated_token_program, readonly, rent, signer, system, token_program, writable};
use super::{BuiltTransaction, OperationKind, TransactionBuilder};
use crate::codec::instruction::{ClaimRewards, StakeTokens, UnstakeTokens};
use crate::codec::StakeDuration;
use crate::errors::BuildError;
use crate::pda::{associated_token_address, Derivation};
use crate::state::StakingPool;

impl TransactionBuilder {
    /// `pool` is the decoded staking pool; its vault is not a derived address.
    pub fn stake(
        &self,
        user: Pubkey,
        amount: u64,
        duration: StakeDuration,
        pool: &StakingPool,
    ) -> Result<BuiltTransaction, BuildError> {
        if amount == 0 {
            return Err(BuildError::InvalidArgument("stake amount is zero"));
        }
        let accounts = vec![
            writable(self.derive(Derivation::StakingPool)?),
            writable(self.derive(Derivation::Staking(user))?),
            writable(pool.staking_vault),
            writable(associated_token_address(&user, &self.token_mint)),
            readonly(self.authority),
            readonly(self.derive(Derivation::PresaleAuthority(self.authority))?),
            readonly(self.token_mint),
            signer(user),
            system(),
            token_program(),
            associated_token_program(),
            rent(),
        ];
        let ix = self.instruction(&StakeTokens { amount, duration }, accounts)?;
        Ok(self.finish(OperationKind::Stake, user, vec![ix]))
    }

    pub fn claim_rewards(&self, user: Pubkey) -> Result<BuiltTransaction, BuildError> {
        let accounts = vec![
            readonly(self.derive(Derivation::Presale)?),
            writable(self.derive(Derivation::StakingPool)?),
            writable(self.derive(Derivation::Staking(user))?),
            writable(self.token_mint),
            writable(associated_token_address(&user, &self.token_mint)),
            readonly(self.derive(Derivation::PresaleAuthority(self.authority))?),
            signer(user),
            token_program(),
            associated_token_program(),
            system(),
            rent(),
        ];
        let ix = self.instruction(&ClaimRewards, accounts)?;
        Ok(self.finish(OperationKind::ClaimRewards, user, vec![ix]))
    }

    /// The pool account appears twice: once as state, once as the vault authority.
    pub fn unstake(&self, user: Pubkey, pool: &StakingPool) -> Result<BuiltTransaction, BuildError> {
        let staking_pool = self.derive(Derivation::StakingPool)?;
        let accounts = vec![
            writable(staking_pool),
            readonly(self.derive(Derivation::Presale)?),
            writable(self.derive(Derivation::Staking(user))?),
            writable(pool.staking_vault),
            readonly(self.derive(Derivation::PresaleAuthority(self.authority))?),
            readonly(staking_pool),
            writable(associated_token_address(&user, &self.token_mint)),
            signer(user),
            token_program(),
            system(),
        ];
        let ix = self.instruction(&UnstakeTokens, accounts)?;
        Ok(self.finish(OperationKind::Unstake, user, vec![ix]))
    }
}
