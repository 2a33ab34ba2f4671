//! Purchase economics: bonus tiers, token quotes and payment-currency conversion.
//!
//! Fiat amounts and prices are micro-dollars (6 decimals). Token amounts are minor units.

use pyth_sdk_solana::Price;
use serde::{Deserialize, Serialize};

use crate::codec::PaymentToken;
use crate::config::Decimals;
use crate::constants::{BPS_DENOMINATOR, REFERENCE_RATE_MAX_AGE_SECS, USD_DECIMALS};
use crate::errors::{ConfigError, EconomicError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusTier {
    /// Smallest fiat amount, in micro-dollars, that earns this tier
    pub min_fiat: u64,
    pub percent: u8,
}

/// Bonus tiers sorted by descending minimum.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "Vec<BonusTier>")]
pub struct BonusTable {
    tiers: Vec<BonusTier>,
}

impl BonusTable {
    pub fn new(mut tiers: Vec<BonusTier>) -> Result<Self, ConfigError> {
        if let Some(tier) = tiers.iter().find(|tier| tier.percent > 100) {
            return Err(ConfigError::BonusTable(format!(
                "tier at {} grants {}%",
                tier.min_fiat, tier.percent
            )));
        }
        tiers.sort_by(|a, b| b.min_fiat.cmp(&a.min_fiat));
        if let Some(pair) = tiers.windows(2).find(|pair| pair[0].min_fiat == pair[1].min_fiat) {
            return Err(ConfigError::BonusTable(format!(
                "duplicate minimum {}",
                pair[0].min_fiat
            )));
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[BonusTier] {
        &self.tiers
    }

    /// First tier from the top whose minimum is met; 0 when none is.
    pub fn percent_for(&self, fiat_amount: u64) -> u8 {
        self.tiers
            .iter()
            .find(|tier| tier.min_fiat <= fiat_amount)
            .map_or(0, |tier| tier.percent)
    }
}

impl TryFrom<Vec<BonusTier>> for BonusTable {
    type Error = ConfigError;

    fn try_from(tiers: Vec<BonusTier>) -> Result<Self, Self::Error> {
        BonusTable::new(tiers)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub fiat_amount: u64,
    pub unit_price: u64,
    pub base_tokens: u64,
    pub bonus_tokens: u64,
    pub bonus_percent: u8,
    pub token_amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseCalculator {
    token_decimals: u8,
}

impl PurchaseCalculator {
    pub fn new(token_decimals: u8) -> Self {
        Self { token_decimals }
    }

    /// `base = fiat * 10^decimals / price`, bonus on top of base.
    pub fn quote(&self, fiat_amount: u64, unit_price: u64, bonuses: &BonusTable) -> Result<Quote, EconomicError> {
        if fiat_amount == 0 {
            return Err(EconomicError::InvalidAmount);
        }
        if unit_price == 0 {
            return Err(EconomicError::InvalidPrice);
        }
        let scale = pow10(self.token_decimals)?;
        let base = (fiat_amount as u128)
            .checked_mul(scale)
            .ok_or(EconomicError::Overflow)?
            / unit_price as u128;
        let bonus_percent = bonuses.percent_for(fiat_amount);
        let bonus = base
            .checked_mul(bonus_percent as u128)
            .ok_or(EconomicError::Overflow)?
            / 100;
        let total = base.checked_add(bonus).ok_or(EconomicError::Overflow)?;
        Ok(Quote {
            fiat_amount,
            unit_price,
            base_tokens: to_u64(base)?,
            bonus_tokens: to_u64(bonus)?,
            bonus_percent,
            token_amount: to_u64(total)?,
        })
    }

    /// VIP quote; amounts under `minimum` are rejected before anything is computed.
    pub fn quote_vip(
        &self,
        fiat_amount: u64,
        vip_price: u64,
        minimum: u64,
        bonuses: &BonusTable,
    ) -> Result<Quote, EconomicError> {
        if fiat_amount < minimum {
            return Err(EconomicError::BelowVipMinimum {
                minimum,
                requested: fiat_amount,
            });
        }
        self.quote(fiat_amount, vip_price, bonuses)
    }
}

/// Amount of the payment currency a purchase needs, in that currency's minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredPayment {
    pub token: PaymentToken,
    pub amount: u64,
    /// Lamports kept aside for fees, on top of `amount` when paying in SOL
    pub fee_reserve: u64,
    /// Lamports asked for on top of a SOL `amount` to absorb rate drift
    pub margin: u64,
}

impl RequiredPayment {
    /// Adds `bps` of the amount as a margin. Stablecoin payments are exact and get none.
    pub fn with_sol_margin(mut self, bps: u16) -> Result<Self, EconomicError> {
        if self.token == PaymentToken::Sol {
            let scaled = (self.amount as u128)
                .checked_mul(bps as u128)
                .ok_or(EconomicError::Overflow)?;
            self.margin = to_u64(scaled.div_ceil(BPS_DENOMINATOR as u128))?;
        }
        Ok(self)
    }
}

/// Estimates what a purchase of `fiat_amount` costs in `token`.
///
/// Stablecoins are rescaled from micro-dollars. SOL uses `sol_usd`, which is a
/// courtesy estimate only: the program converts authoritatively from its own feed.
/// Estimates round up so the balance check never under-asks.
pub fn required_payment(
    fiat_amount: u64,
    token: PaymentToken,
    decimals: &Decimals,
    sol_usd: Option<&Price>,
    fee_reserve: u64,
    now: i64,
) -> Result<RequiredPayment, EconomicError> {
    let amount = match token {
        PaymentToken::Usdc => rescale_up(fiat_amount, USD_DECIMALS, decimals.usdc)?,
        PaymentToken::Usdt => rescale_up(fiat_amount, USD_DECIMALS, decimals.usdt)?,
        PaymentToken::Sol => {
            let price = sol_usd.ok_or(EconomicError::InvalidReferenceRate)?;
            let age = now.saturating_sub(price.publish_time);
            if age > REFERENCE_RATE_MAX_AGE_SECS {
                return Err(EconomicError::StaleReferenceRate { age_secs: age });
            }
            let rate = micro_usd_per_unit(price)?;
            let numerator = (fiat_amount as u128)
                .checked_mul(pow10(decimals.sol)?)
                .ok_or(EconomicError::Overflow)?;
            to_u64(numerator.div_ceil(rate))?
        }
    };
    Ok(RequiredPayment {
        token,
        amount,
        fee_reserve,
        margin: 0,
    })
}

/// Normalizes a Pyth price to micro-dollars per whole unit.
fn micro_usd_per_unit(price: &Price) -> Result<u128, EconomicError> {
    if price.price <= 0 {
        return Err(EconomicError::InvalidReferenceRate);
    }
    let raw = price.price as u128;
    let shift = price.expo + USD_DECIMALS as i32;
    let rate = if shift >= 0 {
        10u128
            .checked_pow(shift as u32)
            .and_then(|factor| raw.checked_mul(factor))
            .ok_or(EconomicError::Overflow)?
    } else {
        match 10u128.checked_pow(shift.unsigned_abs()) {
            Some(divisor) => raw / divisor,
            None => 0,
        }
    };
    if rate == 0 {
        return Err(EconomicError::InvalidReferenceRate);
    }
    Ok(rate)
}

fn rescale_up(amount: u64, from: u8, to: u8) -> Result<u64, EconomicError> {
    let amount = amount as u128;
    let scaled = if to >= from {
        amount
            .checked_mul(pow10(to - from)?)
            .ok_or(EconomicError::Overflow)?
    } else {
        amount.div_ceil(pow10(from - to)?)
    };
    to_u64(scaled)
}

fn pow10(exp: u8) -> Result<u128, EconomicError> {
    10u128.checked_pow(exp as u32).ok_or(EconomicError::Overflow)
}

fn to_u64(value: u128) -> Result<u64, EconomicError> {
    u64::try_from(value).map_err(|_| EconomicError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    const USD: u64 = 1_000_000;

    fn tiers() -> BonusTable {
        BonusTable::new(vec![
            BonusTier {
                min_fiat: 1_000 * USD,
                percent: 5,
            },
            BonusTier {
                min_fiat: 10_000 * USD,
                percent: 15,
            },
            BonusTier {
                min_fiat: 5_000 * USD,
                percent: 10,
            },
        ])
        .unwrap()
    }

    fn sol_price(usd: i64, publish_time: i64) -> Price {
        Price {
            price: usd * 100_000_000,
            conf: 0,
            expo: -8,
            publish_time,
        }
    }

    #[test]
    fn test_tier_boundaries_are_inclusive() {
        let table = tiers();
        let cases = [
            (999, 0),
            (1_000, 5),
            (4_999, 5),
            (5_000, 10),
            (9_999, 10),
            (10_000, 15),
        ];
        for (dollars, percent) in cases {
            assert_eq!(table.percent_for(dollars * USD), percent, "${dollars}");
        }
        assert_eq!(table.tiers()[0].min_fiat, 10_000 * USD);
    }

    #[test]
    fn test_table_rejects_bad_tiers() {
        assert!(BonusTable::new(vec![BonusTier { min_fiat: 1, percent: 101 }]).is_err());
        assert!(BonusTable::new(vec![
            BonusTier { min_fiat: 1, percent: 1 },
            BonusTier { min_fiat: 1, percent: 2 },
        ])
        .is_err());
        let parsed: BonusTable = serde_json::from_str(r#"[{"min_fiat":5,"percent":3},{"min_fiat":9,"percent":4}]"#).unwrap();
        assert_eq!(parsed.percent_for(7), 3);
    }

    #[test]
    fn test_quote_adds_bonus_on_base() {
        let calc = PurchaseCalculator::new(9);
        let quote = calc.quote(5_000 * USD, 4_000, &tiers()).unwrap();
        assert_eq!(quote.base_tokens, 1_250_000 * 1_000_000_000);
        assert_eq!(quote.bonus_percent, 10);
        assert_eq!(quote.bonus_tokens, 125_000 * 1_000_000_000);
        assert_eq!(quote.token_amount, 1_375_000 * 1_000_000_000);
    }

    #[test]
    fn test_quote_rejects_zero_inputs() {
        let calc = PurchaseCalculator::new(9);
        assert_eq!(calc.quote(0, 4_000, &tiers()), Err(EconomicError::InvalidAmount));
        assert_eq!(calc.quote(USD, 0, &tiers()), Err(EconomicError::InvalidPrice));
    }

    #[test]
    fn test_vip_minimum_is_checked_first() {
        let calc = PurchaseCalculator::new(9);
        assert_eq!(
            calc.quote_vip(500 * USD, 0, 1_000 * USD, &tiers()),
            Err(EconomicError::BelowVipMinimum {
                minimum: 1_000 * USD,
                requested: 500 * USD
            })
        );
    }

    #[test]
    fn test_stablecoin_payment_is_rescaled() {
        let decimals = Decimals::default();
        let usdc = required_payment(1_500_000, PaymentToken::Usdc, &decimals, None, 0, 0).unwrap();
        assert_eq!(usdc.amount, 1_500_000);

        let odd = Decimals {
            usdt: 2,
            ..Decimals::default()
        };
        let usdt = required_payment(1_500_001, PaymentToken::Usdt, &odd, None, 0, 0).unwrap();
        assert_eq!(usdt.amount, 151);
    }

    #[test]
    fn test_sol_payment_uses_reference_rate() {
        let decimals = Decimals::default();
        let price = sol_price(150, 100);
        let required = required_payment(300 * USD, PaymentToken::Sol, &decimals, Some(&price), 7, 120).unwrap();
        assert_eq!(required.amount, 2_000_000_000);
        assert_eq!(required.fee_reserve, 7);

        let uneven = required_payment(USD, PaymentToken::Sol, &decimals, Some(&price), 0, 100).unwrap();
        assert_eq!(uneven.amount, 6_666_667);
    }

    #[test]
    fn test_margin_applies_to_sol_only() {
        let decimals = Decimals::default();
        let price = sol_price(150, 100);
        let sol = required_payment(300 * USD, PaymentToken::Sol, &decimals, Some(&price), 0, 100)
            .and_then(|required| required.with_sol_margin(200))
            .unwrap();
        assert_eq!(sol.margin, 40_000_000);

        let odd = RequiredPayment {
            token: PaymentToken::Sol,
            amount: 101,
            fee_reserve: 0,
            margin: 0,
        };
        assert_eq!(odd.with_sol_margin(200).unwrap().margin, 3);

        let usdc = required_payment(300 * USD, PaymentToken::Usdc, &decimals, None, 0, 100)
            .and_then(|required| required.with_sol_margin(200))
            .unwrap();
        assert_eq!(usdc.margin, 0);
    }

    #[test]
    fn test_bad_reference_rates_are_rejected() {
        let decimals = Decimals::default();
        let negative = Price {
            price: -1,
            conf: 0,
            expo: -8,
            publish_time: 0,
        };
        assert_eq!(
            required_payment(USD, PaymentToken::Sol, &decimals, Some(&negative), 0, 0),
            Err(EconomicError::InvalidReferenceRate)
        );
        assert_eq!(
            required_payment(USD, PaymentToken::Sol, &decimals, None, 0, 0),
            Err(EconomicError::InvalidReferenceRate)
        );
        let stale = sol_price(150, 0);
        assert_eq!(
            required_payment(USD, PaymentToken::Sol, &decimals, Some(&stale), 0, 61),
            Err(EconomicError::StaleReferenceRate { age_secs: 61 })
        );
    }
}
