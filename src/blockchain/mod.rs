pub mod deposit_decoder;
pub mod deposit_monitor;
pub mod ledger;
pub mod range_scanner;
pub mod rpc_client;

pub use deposit_decoder::{decode, decode_amount};
pub use deposit_monitor::{DepositMonitor, TickOutcome};
pub use ledger::{LedgerClient, LogFilter};
pub use range_scanner::{RangeScanner, ScanBatch};
pub use rpc_client::RpcClient;
