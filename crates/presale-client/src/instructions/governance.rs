use anchor_lang::prelude::Pubkey;

use super::utils::{readonly, rent, signer, system, writable};
use super::{BuiltTransaction, OperationKind, TransactionBuilder};
use crate::codec::instruction::{CreateProposal, ExecuteProposal, VoteOnProposal};
use crate::codec::{ProposalAction, VoteChoice};
use crate::constants::{PROPOSAL_DESCRIPTION_CAP, PROPOSAL_TITLE_CAP};
use crate::errors::BuildError;
use crate::pda::{associated_token_address, Derivation};

/// Zero-padded copy of `text` into a fixed buffer.
fn fixed_bytes<const N: usize>(text: &str) -> Option<[u8; N]> {
    let bytes = text.as_bytes();
    if bytes.len() > N {
        return None;
    }
    let mut buf = [0u8; N];
    buf[..bytes.len()].copy_from_slice(bytes);
    Some(buf)
}

impl TransactionBuilder {
    /// `next_id` is the counter's current `next_id`, which the new proposal takes.
    pub fn create_proposal(
        &self,
        proposer: Pubkey,
        title: &str,
        description: &str,
        action: ProposalAction,
        next_id: u64,
    ) -> Result<BuiltTransaction, BuildError> {
        if title.is_empty() {
            return Err(BuildError::InvalidArgument("proposal title is empty"));
        }
        if next_id == 0 {
            return Err(BuildError::InvalidArgument("proposal id is zero"));
        }
        let title = fixed_bytes::<PROPOSAL_TITLE_CAP>(title)
            .ok_or(BuildError::InvalidArgument("proposal title exceeds 64 bytes"))?;
        let description = fixed_bytes::<PROPOSAL_DESCRIPTION_CAP>(description)
            .ok_or(BuildError::InvalidArgument("proposal description exceeds 256 bytes"))?;
        let counter = self
            .proposal_counter
            .ok_or(BuildError::MissingAddress("proposal_counter"))?;

        let accounts = vec![
            writable(self.derive(Derivation::Proposal(next_id))?),
            writable(counter),
            signer(proposer),
            readonly(associated_token_address(&proposer, &self.token_mint)),
            readonly(self.derive(Derivation::Staking(proposer))?),
            readonly(self.token_mint),
            system(),
            rent(),
        ];
        let args = CreateProposal {
            title,
            description,
            action,
        };
        let ix = self.instruction(&args, accounts)?;
        Ok(self.finish(OperationKind::CreateProposal, proposer, vec![ix]))
    }

    pub fn vote(&self, voter: Pubkey, proposal_id: u64, support: VoteChoice) -> Result<BuiltTransaction, BuildError> {
        if proposal_id == 0 {
            return Err(BuildError::InvalidArgument("proposal id is zero"));
        }
        let accounts = vec![
            writable(self.derive(Derivation::Proposal(proposal_id))?),
            writable(self.derive(Derivation::Vote { proposal_id, voter })?),
            signer(voter),
            readonly(associated_token_address(&voter, &self.token_mint)),
            readonly(self.derive(Derivation::Staking(voter))?),
            readonly(self.token_mint),
            system(),
        ];
        let ix = self.instruction(&VoteOnProposal { proposal_id, support }, accounts)?;
        Ok(self.finish(OperationKind::Vote, voter, vec![ix]))
    }

    pub fn execute_proposal(&self, executor: Pubkey, proposal_id: u64) -> Result<BuiltTransaction, BuildError> {
        if proposal_id == 0 {
            return Err(BuildError::InvalidArgument("proposal id is zero"));
        }
        let accounts = vec![
            writable(self.derive(Derivation::Proposal(proposal_id))?),
            signer(executor),
            system(),
        ];
        let ix = self.instruction(&ExecuteProposal { proposal_id }, accounts)?;
        Ok(self.finish(OperationKind::ExecuteProposal, executor, vec![ix]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::InstructionArgs;
    use crate::config::ClientConfig;
    use crate::pda::AddressDeriver;
    use crate::pricing::BonusTable;

    fn config(counter: Option<Pubkey>) -> ClientConfig {
        let mut config = ClientConfig::new(
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            BonusTable::default(),
        );
        config.proposal_counter = counter;
        config
    }

    #[test]
    fn test_create_proposal_pads_text() {
        let counter = Pubkey::new_unique();
        let builder = TransactionBuilder::new(&config(Some(counter)));
        let proposer = Pubkey::new_unique();
        let tx = builder
            .create_proposal(proposer, "Buy villa", "Lisbon", ProposalAction::TreasuryTransfer, 7)
            .unwrap();
        let ix = &tx.instructions[0];

        assert_eq!(ix.data.len(), 8 + PROPOSAL_TITLE_CAP + PROPOSAL_DESCRIPTION_CAP + 1);
        assert_eq!(&ix.data[..8], &CreateProposal::SELECTOR);
        assert_eq!(&ix.data[8..17], b"Buy villa");
        assert!(ix.data[17..72].iter().all(|b| *b == 0));
        assert_eq!(&ix.data[72..78], b"Lisbon");
        assert_eq!(*ix.data.last().unwrap(), 0);

        let proposal = AddressDeriver::new(crate::ID)
            .address(&Derivation::Proposal(7))
            .unwrap();
        assert_eq!(ix.accounts[0].pubkey, proposal);
        assert_eq!(ix.accounts[1].pubkey, counter);
        assert!(ix.accounts[2].is_signer);
    }

    #[test]
    fn test_create_proposal_preconditions() {
        let builder = TransactionBuilder::new(&config(Some(Pubkey::new_unique())));
        let proposer = Pubkey::new_unique();
        let action = ProposalAction::CustomAction;
        assert_eq!(
            builder.create_proposal(proposer, "", "", action, 1),
            Err(BuildError::InvalidArgument("proposal title is empty"))
        );
        assert_eq!(
            builder.create_proposal(proposer, &"t".repeat(65), "", action, 1),
            Err(BuildError::InvalidArgument("proposal title exceeds 64 bytes"))
        );
        assert_eq!(
            builder.create_proposal(proposer, "t", &"d".repeat(257), action, 1),
            Err(BuildError::InvalidArgument("proposal description exceeds 256 bytes"))
        );
        assert_eq!(
            builder.create_proposal(proposer, "t", "d", action, 0),
            Err(BuildError::InvalidArgument("proposal id is zero"))
        );
        assert!(builder
            .create_proposal(proposer, &"t".repeat(64), &"d".repeat(256), action, 1)
            .is_ok());

        let unconfigured = TransactionBuilder::new(&config(None));
        assert_eq!(
            unconfigured.create_proposal(proposer, "t", "d", action, 1),
            Err(BuildError::MissingAddress("proposal_counter"))
        );
    }

    #[test]
    fn test_vote_record_is_per_voter() {
        let builder = TransactionBuilder::new(&config(None));
        let a = builder.vote(Pubkey::new_unique(), 3, VoteChoice::Yes).unwrap();
        let b = builder.vote(Pubkey::new_unique(), 3, VoteChoice::No).unwrap();
        assert_eq!(a.instructions[0].accounts[0], b.instructions[0].accounts[0]);
        assert_ne!(a.instructions[0].accounts[1], b.instructions[0].accounts[1]);
        assert_eq!(&a.instructions[0].data[8..], &[3, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(b.instructions[0].data[16], 1);
    }

    #[test]
    fn test_execute_proposal() {
        let builder = TransactionBuilder::new(&config(None));
        let executor = Pubkey::new_unique();
        let tx = builder.execute_proposal(executor, 9).unwrap();
        assert_eq!(tx.operation, OperationKind::ExecuteProposal);
        assert_eq!(tx.instructions[0].accounts.len(), 3);
        assert_eq!(&tx.instructions[0].data[8..], &9u64.to_le_bytes());
        assert_eq!(
            builder.execute_proposal(executor, 0),
            Err(BuildError::InvalidArgument("proposal id is zero"))
        );
    }
}
