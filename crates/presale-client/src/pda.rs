//! Program-derived addresses. Pure and offline: the same inputs always give the same address.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::pubkey::{MAX_SEEDS, MAX_SEED_LEN};
use anchor_spl::associated_token::get_associated_token_address;

use crate::constants::*;
use crate::errors::DeriveError;

/// Every address the client derives from the presale program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Derivation {
    Presale,
    Whitelist(Pubkey),
    Buyer(Pubkey),
    PresaleAuthority(Pubkey),
    TokenVault(Pubkey),
    UsdcVault(Pubkey),
    UsdtVault(Pubkey),
    Staking(Pubkey),
    StakingPool,
    Proposal(u64),
    Vote { proposal_id: u64, voter: Pubkey },
    DistributionRegistry,
    DistributionCycle(u64),
    ClaimRecord { cycle_id: u64, user: Pubkey },
    DistributionAuthority,
}

impl Derivation {
    pub fn name(&self) -> &'static str {
        match self {
            Derivation::Presale => "presale",
            Derivation::Whitelist(_) => "whitelist",
            Derivation::Buyer(_) => "buyer",
            Derivation::PresaleAuthority(_) => "presale_authority",
            Derivation::TokenVault(_) => "token_vault",
            Derivation::UsdcVault(_) => "usdc_vault",
            Derivation::UsdtVault(_) => "usdt_vault",
            Derivation::Staking(_) => "staking",
            Derivation::StakingPool => "staking_pool",
            Derivation::Proposal(_) => "proposal",
            Derivation::Vote { .. } => "vote",
            Derivation::DistributionRegistry => "distribution_registry",
            Derivation::DistributionCycle(_) => "distribution_cycle",
            Derivation::ClaimRecord { .. } => "claim_record",
            Derivation::DistributionAuthority => "distribution_authority",
        }
    }

    /// Seed list in program order. Ids are little-endian u64.
    pub fn seeds(&self) -> Vec<Vec<u8>> {
        let tagged = |tag: &[u8], key: &Pubkey| vec![tag.to_vec(), key.to_bytes().to_vec()];
        match self {
            Derivation::Presale => vec![SEED_PRESALE.to_vec()],
            Derivation::Whitelist(user) => tagged(SEED_WHITELIST, user),
            Derivation::Buyer(user) => tagged(SEED_BUYER, user),
            Derivation::PresaleAuthority(authority) => tagged(SEED_PRESALE_AUTHORITY, authority),
            Derivation::TokenVault(authority) => tagged(SEED_TOKEN_VAULT, authority),
            Derivation::UsdcVault(authority) => tagged(SEED_USDC_VAULT, authority),
            Derivation::UsdtVault(authority) => tagged(SEED_USDT_VAULT, authority),
            Derivation::Staking(user) => tagged(SEED_STAKING, user),
            Derivation::StakingPool => vec![SEED_STAKING_POOL.to_vec()],
            Derivation::Proposal(id) => vec![SEED_PROPOSAL.to_vec(), id.to_le_bytes().to_vec()],
            Derivation::Vote { proposal_id, voter } => vec![
                SEED_VOTE.to_vec(),
                proposal_id.to_le_bytes().to_vec(),
                voter.to_bytes().to_vec(),
            ],
            Derivation::DistributionRegistry => vec![SEED_DISTRIBUTION_REGISTRY.to_vec()],
            Derivation::DistributionCycle(id) => {
                vec![SEED_DISTRIBUTION_CYCLE.to_vec(), id.to_le_bytes().to_vec()]
            }
            Derivation::ClaimRecord { cycle_id, user } => vec![
                SEED_CLAIM_RECORD.to_vec(),
                cycle_id.to_le_bytes().to_vec(),
                user.to_bytes().to_vec(),
            ],
            Derivation::DistributionAuthority => vec![SEED_DISTRIBUTION_AUTHORITY.to_vec()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressDeriver {
    program_id: Pubkey,
}

impl AddressDeriver {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn derive(&self, derivation: &Derivation) -> Result<DerivedAddress, DeriveError> {
        let seeds = derivation.seeds();
        let refs: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
        self.derive_seeds(&refs)
    }

    pub fn address(&self, derivation: &Derivation) -> Result<Pubkey, DeriveError> {
        self.derive(derivation).map(|derived| derived.address)
    }

    /// Derives from a raw seed list. The bump takes one of the protocol's seed slots,
    /// so at most `MAX_SEEDS - 1` seeds are accepted.
    pub fn derive_seeds(&self, seeds: &[&[u8]]) -> Result<DerivedAddress, DeriveError> {
        let max = MAX_SEEDS - 1;
        if seeds.len() > max {
            return Err(DeriveError::TooManySeeds {
                count: seeds.len(),
                max,
            });
        }
        if let Some((index, seed)) = seeds.iter().enumerate().find(|(_, seed)| seed.len() > MAX_SEED_LEN) {
            return Err(DeriveError::SeedTooLong {
                index,
                len: seed.len(),
                max: MAX_SEED_LEN,
            });
        }
        Pubkey::try_find_program_address(seeds, &self.program_id)
            .map(|(address, bump)| DerivedAddress { address, bump })
            .ok_or(DeriveError::NoViableBump)
    }
}

/// Associated token account of `owner` for `mint` under the classic token program.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deriver() -> AddressDeriver {
        AddressDeriver::new(crate::ID)
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let user = Pubkey::new_unique();
        let a = deriver().derive(&Derivation::Buyer(user)).unwrap();
        let b = deriver().derive(&Derivation::Buyer(user)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_matches_program_address_search() {
        let user = Pubkey::new_unique();
        let (expected, bump) =
            Pubkey::find_program_address(&[SEED_WHITELIST, user.as_ref()], &crate::ID);
        let derived = deriver().derive(&Derivation::Whitelist(user)).unwrap();
        assert_eq!(derived, DerivedAddress { address: expected, bump });

        let (presale, _) = Pubkey::find_program_address(&[b"presale".as_ref()], &crate::ID);
        assert_eq!(deriver().address(&Derivation::Presale).unwrap(), presale);
    }

    #[test]
    fn test_ids_are_little_endian_seeds() {
        let voter = Pubkey::new_unique();
        let seeds = Derivation::Vote {
            proposal_id: 258,
            voter,
        }
        .seeds();
        assert_eq!(seeds[0], b"vote".to_vec());
        assert_eq!(seeds[1], vec![2, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(seeds[2], voter.to_bytes().to_vec());
    }

    #[test]
    fn test_distinct_owners_get_distinct_addresses() {
        let d = deriver();
        let a = d.address(&Derivation::Staking(Pubkey::new_unique())).unwrap();
        let b = d.address(&Derivation::Staking(Pubkey::new_unique())).unwrap();
        assert_ne!(a, b);
        let auth = Pubkey::new_unique();
        assert_ne!(
            d.address(&Derivation::UsdcVault(auth)).unwrap(),
            d.address(&Derivation::UsdtVault(auth)).unwrap()
        );
    }

    #[test]
    fn test_oversized_seed_lists_are_rejected() {
        let seed: &[u8] = b"s";
        let seeds = vec![seed; MAX_SEEDS];
        assert_eq!(
            deriver().derive_seeds(&seeds),
            Err(DeriveError::TooManySeeds {
                count: MAX_SEEDS,
                max: MAX_SEEDS - 1
            })
        );
        let short: &[u8] = b"ok";
        let long = [0u8; MAX_SEED_LEN + 1];
        assert_eq!(
            deriver().derive_seeds(&[short, &long[..]]),
            Err(DeriveError::SeedTooLong {
                index: 1,
                len: MAX_SEED_LEN + 1,
                max: MAX_SEED_LEN
            })
        );
        assert!(deriver().derive_seeds(&vec![seed; MAX_SEEDS - 1]).is_ok());
    }
}
