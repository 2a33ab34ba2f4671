//! Balance checks that run after quoting and before any transaction is built.

use crate::codec::PaymentToken;
use crate::errors::EconomicError;
use crate::pricing::RequiredPayment;

/// Wallet balances in minor units as last reported by the wallet.
/// `None` means the balance was never read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalletBalances {
    pub sol: Option<i128>,
    pub usdc: Option<i128>,
    pub usdt: Option<i128>,
}

impl WalletBalances {
    pub fn for_token(&self, token: PaymentToken) -> Option<i128> {
        match token {
            PaymentToken::Sol => self.sol,
            PaymentToken::Usdc => self.usdc,
            PaymentToken::Usdt => self.usdt,
        }
    }
}

/// Missing or negative readings count as zero.
pub fn normalize(reading: Option<i128>) -> u64 {
    match reading {
        Some(value) if value > 0 => u64::try_from(value).unwrap_or(u64::MAX),
        _ => 0,
    }
}

pub fn validate(token: PaymentToken, required: u64, available: Option<i128>) -> Result<(), EconomicError> {
    let have = normalize(available);
    if have >= required {
        Ok(())
    } else {
        Err(EconomicError::InsufficientBalance {
            token,
            have,
            need: required,
        })
    }
}

/// Checks the payment currency and the SOL needed for fees.
pub fn validate_payment(required: &RequiredPayment, balances: &WalletBalances) -> Result<(), EconomicError> {
    match required.token {
        PaymentToken::Sol => {
            let need = required
                .amount
                .checked_add(required.margin)
                .and_then(|need| need.checked_add(required.fee_reserve))
                .ok_or(EconomicError::Overflow)?;
            validate(PaymentToken::Sol, need, balances.sol)
        }
        token => {
            validate(token, required.amount, balances.for_token(token))?;
            validate(PaymentToken::Sol, required.fee_reserve, balances.sol)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_and_missing_balances_are_zero() {
        assert_eq!(normalize(None), 0);
        assert_eq!(normalize(Some(-5)), 0);
        assert_eq!(normalize(Some(7)), 7);
        assert_eq!(
            validate(PaymentToken::Usdc, 1, Some(-5)),
            Err(EconomicError::InsufficientBalance {
                token: PaymentToken::Usdc,
                have: 0,
                need: 1
            })
        );
        assert!(validate(PaymentToken::Usdc, 0, None).is_ok());
    }

    #[test]
    fn test_validation_is_repeatable() {
        let balances = WalletBalances {
            usdc: Some(10),
            ..Default::default()
        };
        let first = validate(PaymentToken::Usdc, 11, balances.usdc);
        let second = validate(PaymentToken::Usdc, 11, balances.usdc);
        assert_eq!(first, second);
        assert_eq!(balances.usdc, Some(10));
    }

    #[test]
    fn test_sol_payment_includes_fee_reserve() {
        let required = RequiredPayment {
            token: PaymentToken::Sol,
            amount: 100,
            fee_reserve: 5,
            margin: 0,
        };
        let mut balances = WalletBalances {
            sol: Some(104),
            ..Default::default()
        };
        assert_eq!(
            validate_payment(&required, &balances),
            Err(EconomicError::InsufficientBalance {
                token: PaymentToken::Sol,
                have: 104,
                need: 105
            })
        );
        balances.sol = Some(105);
        assert!(validate_payment(&required, &balances).is_ok());
    }

    #[test]
    fn test_sol_payment_includes_margin() {
        let required = RequiredPayment {
            token: PaymentToken::Sol,
            amount: 100,
            fee_reserve: 5,
            margin: 2,
        };
        let balances = WalletBalances {
            sol: Some(106),
            ..Default::default()
        };
        assert_eq!(
            validate_payment(&required, &balances),
            Err(EconomicError::InsufficientBalance {
                token: PaymentToken::Sol,
                have: 106,
                need: 107
            })
        );
    }

    #[test]
    fn test_stable_payment_still_needs_fee_sol() {
        let required = RequiredPayment {
            token: PaymentToken::Usdt,
            amount: 1_000,
            fee_reserve: 5,
            margin: 0,
        };
        let balances = WalletBalances {
            sol: Some(0),
            usdt: Some(1_000),
            ..Default::default()
        };
        assert_eq!(
            validate_payment(&required, &balances),
            Err(EconomicError::InsufficientBalance {
                token: PaymentToken::Sol,
                have: 0,
                need: 5
            })
        );
    }
}
