//! User-facing flows. Every action is preflighted against the last confirmed snapshot,
//! built, and only then handed to the signer and the ledger.

use std::sync::Arc;
use std::time::SystemTime;

use anchor_lang::prelude::Pubkey;
use pyth_sdk_solana::Price;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::balance::{validate_payment, WalletBalances};
use crate::codec::{ProposalAction, StakeDuration, VoteChoice};
use crate::config::ClientConfig;
use crate::errors::{BuildError, ClientError, EconomicError, LedgerError, PresaleError};
use crate::instructions::{BuiltTransaction, BuyRequest, OperationKind, TransactionBuilder};
use crate::ledger::{
    AccountSource, Confirmation, RateDecision, RateLimiter, TransactionSigner, TransactionSubmitter, TxSignature,
};
use crate::pda::{AddressDeriver, Derivation};
use crate::phase::{evaluate, Phase, PhaseStatus};
use crate::poller::{PollState, Snapshot};
use crate::pricing::{required_payment, PurchaseCalculator, Quote, RequiredPayment};
use crate::state::{
    BuyerRecord, DistributionCycle, GovernanceProposal, PresaleState, ProposalCounter, StakingPool, StakingRecord,
    VotingPower,
};

// ============================================================================
// TYPES
// ============================================================================

/// An operation handed to the signer that has not completed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub operation: OperationKind,
    /// Set once the ledger accepted the transaction
    pub signature: Option<TxSignature>,
    pub started_at: SystemTime,
}

/// Result of a successful purchase preflight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPurchase {
    pub quote: Quote,
    pub required: RequiredPayment,
    pub transaction: BuiltTransaction,
}

/// Inputs gathered from the wallet at the time of a purchase.
#[derive(Debug, Clone, Copy)]
pub struct PurchaseContext<'a> {
    pub balances: &'a WalletBalances,
    /// SOL/USD reference rate, needed only for SOL payments
    pub sol_usd: Option<&'a Price>,
    /// Unix seconds
    pub now: i64,
}

// ============================================================================
// PURE CHECKS
// ============================================================================

/// Refuses purchases the program would refuse, returning the unit price to quote at.
pub fn sale_gate(state: &PresaleState, status: &PhaseStatus, vip: bool, now: i64) -> Result<u64, EconomicError> {
    if state.is_cancelled {
        return Err(EconomicError::SaleCancelled);
    }
    if state.presale_ended {
        return Err(EconomicError::SaleEnded);
    }
    if state.is_paused {
        return Err(EconomicError::SalePaused);
    }
    match status.phase {
        Phase::NotStarted => {
            return Err(EconomicError::SaleNotStarted {
                starts_in_secs: status.remaining_secs,
            })
        }
        Phase::Ended => return Err(EconomicError::SaleEnded),
        _ => {}
    }

    if vip {
        if status.phase != Phase::Vip {
            let schedule = state.schedule();
            return Err(if schedule.vip_window_open(now) && schedule.vip_slots_full() {
                EconomicError::VipSlotsFull {
                    max_buyers: state.vip_max_buyers,
                }
            } else {
                EconomicError::VipPeriodClosed
            });
        }
    } else if status.phase == Phase::Vip {
        return Err(EconomicError::PhaseClosed { phase: Phase::Vip });
    }
    status.price.ok_or(EconomicError::SaleEnded)
}

/// Tokens left in the current numbered phase must cover the quote.
pub fn check_capacity(state: &PresaleState, phase: Phase, token_amount: u64) -> Result<(), EconomicError> {
    let Some(index) = phase.index() else {
        return Ok(());
    };
    let remaining = state.remaining_in_phase(index);
    if token_amount > remaining {
        return Err(EconomicError::PhaseCapacityExceeded {
            phase,
            remaining,
            requested: token_amount,
        });
    }
    Ok(())
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct PresaleClient<L, S, R> {
    config: ClientConfig,
    deriver: AddressDeriver,
    builder: TransactionBuilder,
    calculator: PurchaseCalculator,
    ledger: Arc<L>,
    signer: S,
    limiter: R,
    presale: watch::Receiver<PollState<PresaleState>>,
    pending: Option<PendingOperation>,
}

impl<L, S, R> PresaleClient<L, S, R>
where
    L: AccountSource + TransactionSubmitter,
    S: TransactionSigner,
    R: RateLimiter,
{
    /// `presale` is usually a `SyncPoller` subscription on the presale state account.
    pub fn new(
        config: ClientConfig,
        ledger: Arc<L>,
        signer: S,
        limiter: R,
        presale: watch::Receiver<PollState<PresaleState>>,
    ) -> Self {
        Self {
            deriver: AddressDeriver::new(config.program_id),
            builder: TransactionBuilder::new(&config),
            calculator: PurchaseCalculator::new(config.decimals.token),
            config,
            ledger,
            signer,
            limiter,
            presale,
            pending: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn pending(&self) -> Option<&PendingOperation> {
        self.pending.as_ref()
    }

    /// Address of the presale state account.
    pub fn presale_address(&self) -> Result<Pubkey, BuildError> {
        self.deriver
            .address(&Derivation::Presale)
            .map_err(|source| BuildError::MissingDerivedAddress {
                what: Derivation::Presale.name(),
                source,
            })
    }

    /// The most recently completed snapshot.
    pub fn presale_snapshot(&self) -> Result<Arc<Snapshot<PresaleState>>, ClientError> {
        self.presale.borrow().latest.clone().ok_or(ClientError::NoSnapshot)
    }

    pub fn phase_status(&self, now: i64) -> Result<PhaseStatus, ClientError> {
        let snapshot = self.presale_snapshot()?;
        Ok(evaluate(now, &snapshot.record.schedule()))
    }

    /// Fetches and decodes one account outside the polling loop.
    pub async fn fetch<T: crate::codec::AccountRecord>(&self, address: &Pubkey) -> Result<T, ClientError> {
        let data = self.ledger.get_account_bytes(address).await?;
        Ok(T::decode(&data)?)
    }

    // ------------------------------------------------------------------------
    // Purchase
    // ------------------------------------------------------------------------

    /// Pure preflight: gate, quote, capacity, conversion, balance, build.
    pub fn prepare_purchase(
        &self,
        request: &BuyRequest,
        vip: bool,
        context: PurchaseContext<'_>,
    ) -> Result<PreparedPurchase, ClientError> {
        let snapshot = self.presale_snapshot()?;
        let state = &snapshot.record;
        let anomalies = state.validate();
        if !anomalies.is_empty() {
            warn!(sequence = snapshot.sequence, ?anomalies, "presale snapshot is untrusted");
            return Err(ClientError::UntrustedSnapshot(anomalies));
        }

        let status = evaluate(context.now, &state.schedule());
        self.preflight(state, &status, request, vip, context)
            .inspect_err(|err| info!(buyer = %request.buyer, vip, %err, "purchase rejected"))
    }

    fn preflight(
        &self,
        state: &PresaleState,
        status: &PhaseStatus,
        request: &BuyRequest,
        vip: bool,
        context: PurchaseContext<'_>,
    ) -> Result<PreparedPurchase, ClientError> {
        let price = sale_gate(state, status, vip, context.now)?;
        let quote = if vip {
            self.calculator.quote_vip(
                request.fiat_amount,
                price,
                state.vip_min_purchase_usd,
                self.config.vip_bonus_table(),
            )?
        } else {
            self.calculator
                .quote(request.fiat_amount, price, &self.config.bonus_tiers)?
        };
        check_capacity(state, status.phase, quote.token_amount)?;

        let required = required_payment(
            request.fiat_amount,
            request.payment_token,
            &self.config.decimals,
            context.sol_usd,
            self.config.native_fee_reserve_lamports,
            context.now,
        )?
        .with_sol_margin(self.config.sol_margin_bps)?;
        validate_payment(&required, context.balances)?;

        let transaction = if vip {
            self.builder.buy_vip(request)?
        } else {
            self.builder.buy(request)?
        };
        Ok(PreparedPurchase {
            quote,
            required,
            transaction,
        })
    }

    /// Rate-limits, preflights and submits a purchase. `rate_key` identifies the caller
    /// to the limiter, typically the wallet address or the client IP.
    pub async fn buy(
        &mut self,
        request: &BuyRequest,
        vip: bool,
        context: PurchaseContext<'_>,
        rate_key: &str,
    ) -> Result<(PreparedPurchase, TxSignature), ClientError> {
        if self.pending.is_some() {
            return Err(ClientError::OperationPending);
        }
        match self.limiter.check_and_consume(rate_key).await {
            Ok(RateDecision::Allowed) => {}
            Ok(RateDecision::Denied { retry_after_secs }) => {
                info!(rate_key, retry_after_secs, "purchase throttled");
                return Err(EconomicError::RateLimited { retry_after_secs }.into());
            }
            Err(err) => warn!(%err, "rate limiter unavailable, admitting purchase"),
        }
        let prepared = self.prepare_purchase(request, vip, context)?;
        let signature = self.submit(prepared.transaction.clone()).await?;
        Ok((prepared, signature))
    }

    /// Tokens become claimable once the sale has ended.
    pub fn prepare_claim_tokens(
        &self,
        record: &BuyerRecord,
        create_token_account: bool,
    ) -> Result<BuiltTransaction, ClientError> {
        let snapshot = self.presale_snapshot()?;
        if !snapshot.record.presale_ended {
            return Err(EconomicError::PresaleNotEnded.into());
        }
        if record.claimable() == 0 {
            return Err(EconomicError::NothingToClaim.into());
        }
        Ok(self.builder.claim_tokens(record.buyer, create_token_account)?)
    }

    // ------------------------------------------------------------------------
    // Staking
    // ------------------------------------------------------------------------

    pub fn prepare_stake(
        &self,
        user: Pubkey,
        amount: u64,
        duration: StakeDuration,
        pool: &StakingPool,
    ) -> Result<BuiltTransaction, ClientError> {
        if amount == 0 {
            return Err(EconomicError::InvalidAmount.into());
        }
        Ok(self.builder.stake(user, amount, duration, pool)?)
    }

    pub fn prepare_unstake(
        &self,
        record: &StakingRecord,
        pool: &StakingPool,
        now: i64,
    ) -> Result<BuiltTransaction, ClientError> {
        record.ensure_unstakable(now)?;
        Ok(self.builder.unstake(record.user, pool)?)
    }

    pub fn prepare_claim_rewards(&self, record: &StakingRecord, now: i64) -> Result<BuiltTransaction, ClientError> {
        if record.accrued_rewards(now)? == 0 {
            return Err(EconomicError::NothingToClaim.into());
        }
        Ok(self.builder.claim_rewards(record.user)?)
    }

    // ------------------------------------------------------------------------
    // Governance
    // ------------------------------------------------------------------------

    pub fn prepare_proposal(
        &self,
        proposer: Pubkey,
        title: &str,
        description: &str,
        action: ProposalAction,
        counter: &ProposalCounter,
        power: &VotingPower,
    ) -> Result<BuiltTransaction, ClientError> {
        power.ensure_can_propose(self.config.decimals.token)?;
        Ok(self
            .builder
            .create_proposal(proposer, title, description, action, counter.next_id)?)
    }

    pub fn prepare_vote(
        &self,
        voter: Pubkey,
        proposal: &GovernanceProposal,
        choice: VoteChoice,
        power: &VotingPower,
        already_voted: bool,
        now: i64,
    ) -> Result<BuiltTransaction, ClientError> {
        if already_voted {
            return Err(EconomicError::AlreadyVoted {
                proposal_id: proposal.proposal_id,
            }
            .into());
        }
        proposal.ensure_votable(now)?;
        power.ensure_can_vote()?;
        Ok(self.builder.vote(voter, proposal.proposal_id, choice)?)
    }

    pub fn prepare_execute(
        &self,
        executor: Pubkey,
        proposal: &GovernanceProposal,
        now: i64,
    ) -> Result<BuiltTransaction, ClientError> {
        let anomalies = proposal.validate(now);
        if !anomalies.is_empty() {
            warn!(proposal_id = proposal.proposal_id, ?anomalies, "proposal snapshot is untrusted");
            return Err(ClientError::UntrustedSnapshot(anomalies));
        }
        proposal.ensure_executable()?;
        Ok(self.builder.execute_proposal(executor, proposal.proposal_id)?)
    }

    // ------------------------------------------------------------------------
    // Distribution
    // ------------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn prepare_claim_distribution(
        &self,
        user: Pubkey,
        cycle: &DistributionCycle,
        amount: u64,
        proof: Vec<[u8; 32]>,
        already_claimed: bool,
        now: i64,
        create_token_account: bool,
    ) -> Result<BuiltTransaction, ClientError> {
        cycle.ensure_claimable(now, amount, already_claimed)?;
        Ok(self
            .builder
            .claim_distribution(user, cycle, amount, proof, create_token_account)?)
    }

    // ------------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------------

    /// Signs, submits and confirms. Only one operation may be in flight at a time.
    /// Dropping the returned future before it resolves releases the slot.
    pub async fn submit(&mut self, transaction: BuiltTransaction) -> Result<TxSignature, ClientError> {
        if self.pending.is_some() {
            return Err(ClientError::OperationPending);
        }
        let mut pending = PendingGuard::claim(
            &mut self.pending,
            PendingOperation {
                operation: transaction.operation,
                signature: None,
                started_at: SystemTime::now(),
            },
        );
        let result = sign_and_confirm(&self.signer, self.ledger.as_ref(), &mut pending, &transaction).await;
        drop(pending);
        result
    }
}

/// Holds the client's in-flight slot and empties it when dropped, including when
/// the submitting future is cancelled mid-await.
struct PendingGuard<'a> {
    slot: &'a mut Option<PendingOperation>,
}

impl<'a> PendingGuard<'a> {
    fn claim(slot: &'a mut Option<PendingOperation>, operation: PendingOperation) -> Self {
        *slot = Some(operation);
        Self { slot }
    }

    fn record_signature(&mut self, signature: &TxSignature) {
        if let Some(pending) = self.slot.as_mut() {
            pending.signature = Some(signature.clone());
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        *self.slot = None;
    }
}

async fn sign_and_confirm<L, S>(
    signer: &S,
    ledger: &L,
    pending: &mut PendingGuard<'_>,
    transaction: &BuiltTransaction,
) -> Result<TxSignature, ClientError>
where
    L: TransactionSubmitter,
    S: TransactionSigner,
{
    let operation = transaction.operation;
    let bytes = signer.sign(transaction).await?;

    let signature = match ledger.submit_signed_transaction(&bytes).await {
        Ok(signature) => signature,
        Err(LedgerError::Submit {
            program_error: Some(code),
            message,
        }) => {
            warn!(?operation, code, %message, "submission rejected by program");
            return Err(program_rejection(Some(code)));
        }
        Err(err) => {
            warn!(?operation, %err, "submission failed");
            return Err(err.into());
        }
    };
    debug!(?operation, %signature, "transaction submitted");
    pending.record_signature(&signature);

    match ledger.confirm(&signature).await? {
        Confirmation::Confirmed => {
            info!(?operation, %signature, "transaction confirmed");
            Ok(signature)
        }
        Confirmation::Failed {
            program_error,
            message,
        } => {
            warn!(?operation, %signature, ?program_error, %message, "transaction failed");
            Err(program_rejection(program_error))
        }
        Confirmation::Timeout => {
            warn!(?operation, %signature, "confirmation timed out");
            Err(LedgerError::Timeout.into())
        }
    }
}

fn program_rejection(code: Option<u32>) -> ClientError {
    ClientError::ProgramRejected {
        code,
        reason: code.and_then(PresaleError::from_code),
    }
}
