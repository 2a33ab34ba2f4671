use anchor_lang::prelude::{AccountMeta, Pubkey};

use super::utils::{create_associated_token_account_idempotent, readonly, signer, system, token_program, writable};
use super::{BuiltTransaction, OperationKind, TransactionBuilder};
use crate::codec::instruction::{BuyTokens, BuyTokensVip, ClaimTokens};
use crate::codec::PaymentToken;
use crate::errors::BuildError;
use crate::pda::{associated_token_address, Derivation};

/// Inputs of a buy after quoting and balance checks have passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyRequest {
    pub buyer: Pubkey,
    /// Micro-dollars
    pub fiat_amount: u64,
    pub payment_token: PaymentToken,
    pub referrer: Option<Pubkey>,
    /// The buyer has no token account for the sale token yet
    pub create_token_account: bool,
}

/// Account order of `buy_tokens` and `buy_tokens_vip`.
struct BuyAccounts {
    presale_state: Pubkey,
    buyer: Pubkey,
    whitelist_entry: Pubkey,
    buyer_data: Pubkey,
    buyer_payment_account: Pubkey,
    payment_vault: Pubkey,
}

impl BuyAccounts {
    fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            writable(self.presale_state),
            signer(self.buyer),
            readonly(self.whitelist_entry),
            writable(self.buyer_data),
            writable(self.buyer_payment_account),
            writable(self.payment_vault),
            token_program(),
            system(),
        ]
    }
}

impl TransactionBuilder {
    fn buy_accounts(&self, request: &BuyRequest) -> Result<BuyAccounts, BuildError> {
        let (buyer_payment_account, payment_vault) = match request.payment_token {
            PaymentToken::Sol => (request.buyer, self.derive(Derivation::UsdcVault(self.authority))?),
            PaymentToken::Usdc => (
                associated_token_address(&request.buyer, &self.usdc_mint),
                self.derive(Derivation::UsdcVault(self.authority))?,
            ),
            PaymentToken::Usdt => (
                associated_token_address(&request.buyer, &self.usdt_mint),
                self.derive(Derivation::UsdtVault(self.authority))?,
            ),
        };
        Ok(BuyAccounts {
            presale_state: self.derive(Derivation::Presale)?,
            buyer: request.buyer,
            whitelist_entry: self.derive(Derivation::Whitelist(request.buyer))?,
            buyer_data: self.derive(Derivation::Buyer(request.buyer))?,
            buyer_payment_account,
            payment_vault,
        })
    }

    fn with_token_account(&self, owner: &Pubkey, create: bool) -> Vec<anchor_lang::solana_program::instruction::Instruction> {
        if create {
            vec![create_associated_token_account_idempotent(owner, owner, &self.token_mint)]
        } else {
            Vec::new()
        }
    }

    pub fn buy(&self, request: &BuyRequest) -> Result<BuiltTransaction, BuildError> {
        if request.fiat_amount == 0 {
            return Err(BuildError::InvalidArgument("purchase amount is zero"));
        }
        let accounts = self.buy_accounts(request)?;
        let args = BuyTokens {
            amount: request.fiat_amount,
            payment_token: request.payment_token,
            referrer: request.referrer,
        };
        let mut instructions = self.with_token_account(&request.buyer, request.create_token_account);
        instructions.push(self.instruction(&args, accounts.to_account_metas())?);
        Ok(self.finish(OperationKind::Buy, request.buyer, instructions))
    }

    /// VIP purchases carry no referrer.
    pub fn buy_vip(&self, request: &BuyRequest) -> Result<BuiltTransaction, BuildError> {
        if request.fiat_amount == 0 {
            return Err(BuildError::InvalidArgument("purchase amount is zero"));
        }
        let accounts = self.buy_accounts(request)?;
        let args = BuyTokensVip {
            amount: request.fiat_amount,
            payment_token: request.payment_token,
        };
        let mut instructions = self.with_token_account(&request.buyer, request.create_token_account);
        instructions.push(self.instruction(&args, accounts.to_account_metas())?);
        Ok(self.finish(OperationKind::BuyVip, request.buyer, instructions))
    }

    pub fn claim_tokens(&self, buyer: Pubkey, create_token_account: bool) -> Result<BuiltTransaction, BuildError> {
        let accounts = vec![
            writable(self.derive(Derivation::Presale)?),
            signer(buyer),
            writable(self.derive(Derivation::Buyer(buyer))?),
            writable(self.derive(Derivation::TokenVault(self.authority))?),
            writable(associated_token_address(&buyer, &self.token_mint)),
            token_program(),
        ];
        let mut instructions = self.with_token_account(&buyer, create_token_account);
        instructions.push(self.instruction(&ClaimTokens, accounts)?);
        Ok(self.finish(OperationKind::ClaimTokens, buyer, instructions))
    }
}

#[cfg(test)]
mod tests {
    use anchor_spl::associated_token;

    use super::*;
    use crate::codec::InstructionArgs;
    use crate::config::ClientConfig;
    use crate::pda::AddressDeriver;
    use crate::pricing::BonusTable;

    fn config() -> ClientConfig {
        ClientConfig::new(
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            BonusTable::default(),
        )
    }

    fn request(payment_token: PaymentToken) -> BuyRequest {
        BuyRequest {
            buyer: Pubkey::new_unique(),
            fiat_amount: 1_000_000_000,
            payment_token,
            referrer: None,
            create_token_account: false,
        }
    }

    #[test]
    fn test_buy_account_order() {
        let config = config();
        let builder = TransactionBuilder::new(&config);
        let deriver = AddressDeriver::new(crate::ID);
        let req = request(PaymentToken::Usdt);
        let tx = builder.buy(&req).unwrap();

        assert_eq!(tx.operation, OperationKind::Buy);
        assert_eq!(tx.fee_payer, req.buyer);
        assert_eq!(tx.instructions.len(), 1);
        let ix = &tx.instructions[0];
        assert_eq!(ix.program_id, crate::ID);
        assert_eq!(&ix.data[..8], &BuyTokens::SELECTOR);

        let keys: Vec<Pubkey> = ix.accounts.iter().map(|meta| meta.pubkey).collect();
        assert_eq!(
            keys[..6],
            [
                deriver.address(&Derivation::Presale).unwrap(),
                req.buyer,
                deriver.address(&Derivation::Whitelist(req.buyer)).unwrap(),
                deriver.address(&Derivation::Buyer(req.buyer)).unwrap(),
                associated_token_address(&req.buyer, &config.usdt_mint),
                deriver.address(&Derivation::UsdtVault(config.authority)).unwrap(),
            ]
        );
        assert_eq!(ix.accounts.len(), 8);
        assert!(ix.accounts[1].is_signer);
        assert!(ix.accounts.iter().filter(|meta| meta.is_signer).count() == 1);
    }

    #[test]
    fn test_whitelist_entry_is_read_only() {
        let builder = TransactionBuilder::new(&config());
        let req = request(PaymentToken::Usdc);
        for tx in [builder.buy(&req).unwrap(), builder.buy_vip(&req).unwrap()] {
            let writable: Vec<bool> = tx.instructions[0].accounts.iter().map(|meta| meta.is_writable).collect();
            assert_eq!(writable, [true, true, false, true, true, true, false, false]);
        }
    }

    #[test]
    fn test_sol_buy_pays_from_wallet() {
        let builder = TransactionBuilder::new(&config());
        let req = request(PaymentToken::Sol);
        let tx = builder.buy(&req).unwrap();
        assert_eq!(tx.instructions[0].accounts[4].pubkey, req.buyer);
    }

    #[test]
    fn test_missing_token_account_is_created_first() {
        let builder = TransactionBuilder::new(&config());
        let mut req = request(PaymentToken::Usdc);
        req.create_token_account = true;
        let tx = builder.buy_vip(&req).unwrap();
        assert_eq!(tx.operation, OperationKind::BuyVip);
        assert_eq!(tx.instructions.len(), 2);
        assert_eq!(tx.instructions[0].program_id, associated_token::ID);
        assert_eq!(&tx.instructions[1].data[..8], &BuyTokensVip::SELECTOR);
        assert_eq!(tx.program_instruction(&crate::ID), Some(&tx.instructions[1]));
    }

    #[test]
    fn test_zero_amount_is_rejected_before_encoding() {
        let builder = TransactionBuilder::new(&config());
        let mut req = request(PaymentToken::Usdc);
        req.fiat_amount = 0;
        assert_eq!(
            builder.buy(&req),
            Err(BuildError::InvalidArgument("purchase amount is zero"))
        );
    }

    #[test]
    fn test_claim_tokens_targets_buyer_token_account() {
        let config = config();
        let builder = TransactionBuilder::new(&config);
        let buyer = Pubkey::new_unique();
        let tx = builder.claim_tokens(buyer, false).unwrap();
        let ix = &tx.instructions[0];
        assert_eq!(ix.data, ClaimTokens::SELECTOR.to_vec());
        assert_eq!(ix.accounts[4].pubkey, associated_token_address(&buyer, &config.token_mint));
        assert_eq!(ix.accounts.len(), 6);
    }
}
