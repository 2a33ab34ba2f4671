//! Capabilities the client is handed at construction. The crate calls these; it never
//! implements transport, key custody or rate-limit storage itself.

use std::fmt;
use std::future::Future;

use anchor_lang::prelude::Pubkey;

use crate::errors::{LedgerError, RateLimitError, SignerError};
use crate::instructions::BuiltTransaction;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxSignature(pub String);

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Failed {
        /// Custom program error code, when the failure carried one
        program_error: Option<u32>,
        message: String,
    },
    Timeout,
}

/// Read side of the ledger.
pub trait AccountSource: Send + Sync {
    /// Raw account data, or `LedgerError::NotFound`.
    fn get_account_bytes(&self, address: &Pubkey) -> impl Future<Output = Result<Vec<u8>, LedgerError>> + Send;
}

/// Write side of the ledger.
pub trait TransactionSubmitter: Send + Sync {
    fn submit_signed_transaction(
        &self,
        transaction: &[u8],
    ) -> impl Future<Output = Result<TxSignature, LedgerError>> + Send;

    fn confirm(&self, signature: &TxSignature) -> impl Future<Output = Result<Confirmation, LedgerError>> + Send;
}

/// Wallet or key custody. Turns a built transaction into wire bytes.
pub trait TransactionSigner: Send + Sync {
    fn sign(&self, transaction: &BuiltTransaction) -> impl Future<Output = Result<Vec<u8>, SignerError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied { retry_after_secs: u64 },
}

/// Keyed throttle with its own TTL semantics, keyed by user identity or IP.
pub trait RateLimiter: Send + Sync {
    fn check_and_consume(&self, key: &str) -> impl Future<Output = Result<RateDecision, RateLimitError>> + Send;
}

/// Limiter that admits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl RateLimiter for Unlimited {
    async fn check_and_consume(&self, _key: &str) -> Result<RateDecision, RateLimitError> {
        Ok(RateDecision::Allowed)
    }
}
