//! Ledger client for passport anchoring.
//!
//! This crate talks to the external append-only ledger contract. It provides:
//! - Contract call and result types matching the ledger's wire contract
//! - `LedgerTransport` trait boundary with a JSON-RPC implementation
//! - `InMemoryLedger` implementation for tests and embedding
//! - `LedgerClient`: signed submission, bounded confirmation wait, typed reads

pub mod client;
pub mod contract;
pub mod error;
pub mod memory;
pub mod rpc;
pub mod transport;

pub use client::{ConfirmationPolicy, LedgerClient};
pub use contract::{
    CallRequest, ContractCall, HashClass, HashRecord, SignedCall, TxHash, TxReceipt, TxStatus,
    VersionHashRecord, VersionHashes,
};
pub use error::{LedgerError, LedgerResult, TransportError};
pub use memory::InMemoryLedger;
pub use rpc::RpcTransport;
pub use transport::LedgerTransport;
