use serde::{Deserialize, Serialize};

/// A log entry emitted by the monitored contract, as returned by the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    /// Payload bytes, already decoded from the RPC hex string
    pub data: Vec<u8>,
    pub block_number: u64,
    pub transaction_hash: String,
    pub log_index: u32,
}

/// Deposit derived from a [`RawLog`]. Never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecodedDeposit {
    pub block_number: u64,
    pub transaction_hash: String,
    pub log_index: u32,
    pub amount: String, // Decimal string, the payload can be wider than any primitive
}
