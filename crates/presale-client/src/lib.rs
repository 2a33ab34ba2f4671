//! Client core for the token presale program: account decoding, phase and price
//! evaluation, balance preflight, transaction assembly and snapshot polling.
//!
//! The crate never signs, never holds keys and never talks to the network directly.
//! Those capabilities are injected through the traits in [`ledger`].

pub mod balance;
pub mod client;
pub mod codec;
pub mod config;
pub mod constants;
pub mod errors;
pub mod instructions;
pub mod ledger;
pub mod pda;
pub mod phase;
pub mod poller;
pub mod pricing;
pub mod state;


pub use client::{PendingOperation, PreparedPurchase, PresaleClient, PurchaseContext};
pub use codec::{AccountRecord, PaymentToken, RecordKind, TypedRecord};
pub use config::ClientConfig;
pub use errors::{ClientError, PresaleError};
pub use instructions::{BuiltTransaction, BuyRequest, OperationKind, TransactionBuilder};
pub use pda::{AddressDeriver, Derivation};
pub use phase::{evaluate, Phase, PhaseSchedule, PhaseStatus};
pub use poller::{PollState, Snapshot, SyncPoller};

anchor_lang::declare_id!("2oArywYY7xHyoV1xoF9g9QKkyKDHe3rA9kRyu1H8ZQxo");
