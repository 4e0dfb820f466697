use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RpcError;
use crate::models::{RawLog, ScanRange};

/// `eth_getLogs` filter. Topics are left out so every log of the address matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    #[serde(rename = "fromBlock")]
    pub from_block: String,
    #[serde(rename = "toBlock")]
    pub to_block: String,
    pub address: String,
}

impl LogFilter {
    pub fn for_range(address: &str, range: &ScanRange) -> Self {
        Self {
            from_block: format!("0x{:x}", range.from),
            to_block: format!("0x{:x}", range.to),
            address: address.to_string(),
        }
    }
}

/// Read access to the ledger.
///
/// Any transport or RPC failure comes back as [`RpcError`].
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Cheap liveness probe used once at startup
    async fn is_connected(&self) -> bool;

    async fn latest_block_number(&self) -> Result<u64, RpcError>;

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, RpcError>;
}
