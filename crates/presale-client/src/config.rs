//! Wiring-time configuration: endpoint, program identity, mints, decimals and bonus tiers.

use std::str::FromStr;
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::constants::{
    DEFAULT_NATIVE_FEE_RESERVE_LAMPORTS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_SOL_DECIMALS, DEFAULT_SOL_MARGIN_BPS,
    DEFAULT_TOKEN_DECIMALS, DEFAULT_USDC_DECIMALS, DEFAULT_USDT_DECIMALS,
};
use crate::errors::ConfigError;
use crate::pricing::{BonusTable, BonusTier};

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// Decimal places of each currency the client handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Decimals {
    pub token: u8,
    pub usdc: u8,
    pub usdt: u8,
    pub sol: u8,
}

impl Default for Decimals {
    fn default() -> Self {
        Self {
            token: DEFAULT_TOKEN_DECIMALS,
            usdc: DEFAULT_USDC_DECIMALS,
            usdt: DEFAULT_USDT_DECIMALS,
            sol: DEFAULT_SOL_DECIMALS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_program_id", deserialize_with = "pubkey_from_str")]
    pub program_id: Pubkey,
    /// Presale authority, the owner of the authority-scoped PDAs
    #[serde(deserialize_with = "pubkey_from_str")]
    pub authority: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub token_mint: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub usdc_mint: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub usdt_mint: Pubkey,
    #[serde(default)]
    pub decimals: Decimals,
    pub bonus_tiers: BonusTable,
    #[serde(default)]
    pub vip_bonus_tiers: Option<BonusTable>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_fee_reserve")]
    pub native_fee_reserve_lamports: u64,
    /// Share of a SOL payment, in basis points, required on top of the estimate
    #[serde(default = "default_sol_margin_bps")]
    pub sol_margin_bps: u16,
    #[serde(default, deserialize_with = "optional_pubkey_from_str")]
    pub proposal_counter: Option<Pubkey>,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_program_id() -> Pubkey {
    crate::ID
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_fee_reserve() -> u64 {
    DEFAULT_NATIVE_FEE_RESERVE_LAMPORTS
}

fn default_sol_margin_bps() -> u16 {
    DEFAULT_SOL_MARGIN_BPS
}

fn pubkey_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Pubkey::from_str(&raw).map_err(D::Error::custom)
}

fn optional_pubkey_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Pubkey>, D::Error> {
    Option::<String>::deserialize(deserializer)?
        .map(|raw| Pubkey::from_str(&raw).map_err(D::Error::custom))
        .transpose()
}

impl ClientConfig {
    /// Config for the default program with default decimals, polling and fee reserve.
    pub fn new(authority: Pubkey, token_mint: Pubkey, usdc_mint: Pubkey, usdt_mint: Pubkey, bonus_tiers: BonusTable) -> Self {
        Self {
            rpc_url: default_rpc_url(),
            program_id: crate::ID,
            authority,
            token_mint,
            usdc_mint,
            usdt_mint,
            decimals: Decimals::default(),
            bonus_tiers,
            vip_bonus_tiers: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            native_fee_reserve_lamports: DEFAULT_NATIVE_FEE_RESERVE_LAMPORTS,
            sol_margin_bps: DEFAULT_SOL_MARGIN_BPS,
            proposal_counter: None,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|err| ConfigError::Json(err.to_string()))
    }

    /// Reads `PRESALE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, using the `PRESALE_*` key names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let pubkey = |key: &'static str, raw: String| {
            Pubkey::from_str(raw.trim()).map_err(|err| ConfigError::Invalid {
                key,
                reason: err.to_string(),
            })
        };
        let number = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            lookup(key)
                .map(|raw| {
                    raw.trim().parse::<u64>().map_err(|err| ConfigError::Invalid {
                        key,
                        reason: err.to_string(),
                    })
                })
                .transpose()
        };
        let decimal = |key: &'static str, fallback: u8| -> Result<u8, ConfigError> {
            match number(key)? {
                Some(value) => u8::try_from(value).map_err(|err| ConfigError::Invalid {
                    key,
                    reason: err.to_string(),
                }),
                None => Ok(fallback),
            }
        };
        let tiers = |key: &'static str, raw: String| -> Result<BonusTable, ConfigError> {
            let tiers: Vec<BonusTier> = serde_json::from_str(&raw).map_err(|err| ConfigError::Invalid {
                key,
                reason: err.to_string(),
            })?;
            BonusTable::new(tiers)
        };

        let program_id = match lookup("PRESALE_PROGRAM_ID") {
            Some(raw) => pubkey("PRESALE_PROGRAM_ID", raw)?,
            None => crate::ID,
        };
        let proposal_counter = match lookup("PRESALE_PROPOSAL_COUNTER") {
            Some(raw) => Some(pubkey("PRESALE_PROPOSAL_COUNTER", raw)?),
            None => None,
        };
        let vip_bonus_tiers = match lookup("PRESALE_VIP_BONUS_TIERS") {
            Some(raw) => Some(tiers("PRESALE_VIP_BONUS_TIERS", raw)?),
            None => None,
        };

        Ok(Self {
            rpc_url: lookup("PRESALE_RPC_URL").unwrap_or_else(default_rpc_url),
            program_id,
            authority: pubkey("PRESALE_AUTHORITY", required("PRESALE_AUTHORITY")?)?,
            token_mint: pubkey("PRESALE_TOKEN_MINT", required("PRESALE_TOKEN_MINT")?)?,
            usdc_mint: pubkey("PRESALE_USDC_MINT", required("PRESALE_USDC_MINT")?)?,
            usdt_mint: pubkey("PRESALE_USDT_MINT", required("PRESALE_USDT_MINT")?)?,
            decimals: Decimals {
                token: decimal("PRESALE_TOKEN_DECIMALS", DEFAULT_TOKEN_DECIMALS)?,
                usdc: decimal("PRESALE_USDC_DECIMALS", DEFAULT_USDC_DECIMALS)?,
                usdt: decimal("PRESALE_USDT_DECIMALS", DEFAULT_USDT_DECIMALS)?,
                sol: DEFAULT_SOL_DECIMALS,
            },
            bonus_tiers: tiers("PRESALE_BONUS_TIERS", required("PRESALE_BONUS_TIERS")?)?,
            vip_bonus_tiers,
            poll_interval_secs: number("PRESALE_POLL_INTERVAL_SECS")?.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            native_fee_reserve_lamports: DEFAULT_NATIVE_FEE_RESERVE_LAMPORTS,
            sol_margin_bps: match number("PRESALE_SOL_MARGIN_BPS")? {
                Some(value) => u16::try_from(value).map_err(|err| ConfigError::Invalid {
                    key: "PRESALE_SOL_MARGIN_BPS",
                    reason: err.to_string(),
                })?,
                None => DEFAULT_SOL_MARGIN_BPS,
            },
            proposal_counter,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// VIP tiers, falling back to the regular table.
    pub fn vip_bonus_table(&self) -> &BonusTable {
        self.vip_bonus_tiers.as_ref().unwrap_or(&self.bonus_tiers)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const AUTHORITY: &str = "GS8uMnEqbBckN5K3YidKtmjMFfg1pDgBFTrWrQGY6rZj";
    const TOKEN_MINT: &str = "6UYrC72Xseu8bSrjZz5VUZ3aGo68MEqpNNyMgqqcfajf";
    const USDC_MINT: &str = "Gh9ZwEmdLJ8DscKNTkTqPbNwLNNBjuSzaG9Vp2KGtKJr";

    fn env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("PRESALE_AUTHORITY", AUTHORITY.to_string()),
            ("PRESALE_TOKEN_MINT", TOKEN_MINT.to_string()),
            ("PRESALE_USDC_MINT", USDC_MINT.to_string()),
            ("PRESALE_USDT_MINT", USDC_MINT.to_string()),
            (
                "PRESALE_BONUS_TIERS",
                r#"[{"min_fiat":1000000000,"percent":5},{"min_fiat":5000000000,"percent":10}]"#.to_string(),
            ),
        ])
    }

    #[test]
    fn test_lookup_applies_defaults() {
        let vars = env();
        let config = ClientConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.program_id, crate::ID);
        assert_eq!(config.authority.to_string(), AUTHORITY);
        assert_eq!(config.decimals, Decimals::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.bonus_tiers.tiers()[0].percent, 10);
        assert_eq!(config.vip_bonus_table(), &config.bonus_tiers);
        assert_eq!(config.proposal_counter, None);
    }

    #[test]
    fn test_lookup_names_the_bad_key() {
        let mut vars = env();
        vars.remove("PRESALE_TOKEN_MINT");
        let err = ClientConfig::from_lookup(|key| vars.get(key).cloned()).unwrap_err();
        assert_eq!(err, ConfigError::Missing("PRESALE_TOKEN_MINT"));

        let mut vars = env();
        vars.insert("PRESALE_USDC_DECIMALS", "300".to_string());
        match ClientConfig::from_lookup(|key| vars.get(key).cloned()) {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "PRESALE_USDC_DECIMALS"),
            other => panic!("unexpected {other:?}"),
        }

        let mut vars = env();
        vars.insert("PRESALE_AUTHORITY", "not-a-key".to_string());
        assert!(matches!(
            ClientConfig::from_lookup(|key| vars.get(key).cloned()),
            Err(ConfigError::Invalid { key: "PRESALE_AUTHORITY", .. })
        ));
    }

    #[test]
    fn test_json_document() {
        let raw = format!(
            r#"{{
                "authority": "{AUTHORITY}",
                "token_mint": "{TOKEN_MINT}",
                "usdc_mint": "{USDC_MINT}",
                "usdt_mint": "{USDC_MINT}",
                "decimals": {{ "token": 6 }},
                "bonus_tiers": [{{ "min_fiat": 1, "percent": 4 }}],
                "vip_bonus_tiers": [{{ "min_fiat": 1, "percent": 20 }}],
                "proposal_counter": "{AUTHORITY}"
            }}"#
        );
        let config = ClientConfig::from_json_str(&raw).unwrap();
        assert_eq!(config.decimals.token, 6);
        assert_eq!(config.decimals.usdc, 6);
        assert_eq!(config.vip_bonus_table().percent_for(1), 20);
        assert_eq!(config.native_fee_reserve_lamports, 5_000_000);
        assert_eq!(config.sol_margin_bps, 200);
        assert_eq!(config.proposal_counter.map(|k| k.to_string()), Some(AUTHORITY.to_string()));
    }

    #[test]
    fn test_json_rejects_invalid_tiers() {
        let raw = format!(
            r#"{{
                "authority": "{AUTHORITY}",
                "token_mint": "{TOKEN_MINT}",
                "usdc_mint": "{USDC_MINT}",
                "usdt_mint": "{USDC_MINT}",
                "bonus_tiers": [{{ "min_fiat": 1, "percent": 140 }}]
            }}"#
        );
        assert!(matches!(ClientConfig::from_json_str(&raw), Err(ConfigError::Json(_))));
    }
}
