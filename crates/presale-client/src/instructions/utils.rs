use anchor_lang::prelude::{AccountMeta, Pubkey};
use anchor_lang::solana_program::instruction::Instruction;
use anchor_spl::{associated_token, token};
use solana_program::{system_program, sysvar};

use crate::pda::associated_token_address;

/// Tag of the associated-token program's `CreateIdempotent` instruction.
const CREATE_IDEMPOTENT: u8 = 1;

pub fn writable(key: Pubkey) -> AccountMeta {
    AccountMeta::new(key, false)
}

pub fn readonly(key: Pubkey) -> AccountMeta {
    AccountMeta::new_readonly(key, false)
}

/// Signing fee payer or owner
pub fn signer(key: Pubkey) -> AccountMeta {
    AccountMeta::new(key, true)
}

pub fn token_program() -> AccountMeta {
    readonly(token::ID)
}

pub fn associated_token_program() -> AccountMeta {
    readonly(associated_token::ID)
}

pub fn system() -> AccountMeta {
    readonly(system_program::ID)
}

pub fn rent() -> AccountMeta {
    readonly(sysvar::rent::ID)
}

/// Creates `owner`'s associated token account for `mint`, or does nothing if it exists.
pub fn create_associated_token_account_idempotent(payer: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Instruction {
    Instruction {
        program_id: associated_token::ID,
        accounts: vec![
            signer(*payer),
            writable(associated_token_address(owner, mint)),
            readonly(*owner),
            readonly(*mint),
            system(),
            token_program(),
        ],
        data: vec![CREATE_IDEMPOTENT],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotent_create_layout() {
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ix = create_associated_token_account_idempotent(&payer, &payer, &mint);
        assert_eq!(ix.program_id, associated_token::ID);
        assert_eq!(ix.data, vec![1]);
        assert_eq!(ix.accounts.len(), 6);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[1].pubkey, associated_token_address(&payer, &mint));
        assert!(ix.accounts[1].is_writable && !ix.accounts[1].is_signer);
        assert_eq!(ix.accounts[5].pubkey, token::ID);
    }
}
