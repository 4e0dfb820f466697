use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::blockchain::ledger::{LedgerClient, LogFilter};
use crate::error::RpcError;
use crate::logging::{LogContext, MetricsLogger, PerformanceMonitor};
use crate::models::RawLog;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Vec<Value>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<Value>,
    error: Option<JsonRpcError>,
    #[allow(dead_code)]
    id: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct EthLog {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
    data: String,
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
    #[serde(rename = "transactionHash")]
    transaction_hash: Option<String>,
    #[serde(rename = "logIndex")]
    log_index: Option<String>,
}

/// HTTP JSON-RPC client for an Ethereum node
pub struct RpcClient {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(endpoint: String) -> Result<Self, RpcError> {
        Self::new_with_config(endpoint, 30)
    }

    /// RPC client with timeout and connection pooling
    pub fn new_with_config(endpoint: String, timeout_seconds: u64) -> Result<Self, RpcError> {
        let context = LogContext::new("rpc_client", "initialization")
            .with_metadata("timeout_seconds", serde_json::json!(timeout_seconds));
        context.info("Initializing RPC client");

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn make_request(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let monitor = PerformanceMonitor::new(&format!("rpc_{}", method));
        let result = self.send_request(method, params).await;
        let duration = monitor.finish_with_result(&result);
        MetricsLogger::log_rpc_call(method, duration, result.is_ok());
        result
    }

    async fn send_request(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        LogContext::new("rpc_client", "make_request")
            .with_metadata("method", serde_json::json!(method))
            .trace(&format!("Sending RPC request: {}", method));

        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let rpc_response: JsonRpcResponse = serde_json::from_slice(&body)?;

        if let Some(error) = rpc_response.error {
            return Err(RpcError::Method {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| RpcError::InvalidResponse("No result in response".to_string()))
    }

    pub async fn client_version(&self) -> Result<String, RpcError> {
        let result = self.make_request("web3_clientVersion", vec![]).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RpcError::InvalidResponse("Client version is not a string".to_string()))
    }
}

#[async_trait]
impl LedgerClient for RpcClient {
    async fn is_connected(&self) -> bool {
        match self.client_version().await {
            Ok(version) => {
                LogContext::new("rpc_client", "is_connected")
                    .with_metadata("client_version", serde_json::json!(version))
                    .debug("Node reachable");
                true
            }
            Err(e) => {
                LogContext::new("rpc_client", "is_connected")
                    .warn(&format!("Node unreachable: {}", e));
                false
            }
        }
    }

    async fn latest_block_number(&self) -> Result<u64, RpcError> {
        let result = self.make_request("eth_blockNumber", vec![]).await?;

        let hex_string = result
            .as_str()
            .ok_or_else(|| RpcError::InvalidResponse("Block number is not a string".to_string()))?;

        let block_number = parse_hex_to_u64(hex_string)?;
        LogContext::new("rpc_client", "latest_block_number")
            .with_block_number(block_number)
            .debug(&format!("Retrieved latest block number: {}", block_number));

        Ok(block_number)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, RpcError> {
        let params = vec![serde_json::to_value(filter)?];
        let result = self.make_request("eth_getLogs", params).await?;

        let eth_logs: Vec<EthLog> = serde_json::from_value(result)?;
        let raw_logs = eth_logs
            .into_iter()
            .map(convert_log)
            .collect::<Result<Vec<_>, _>>()?;

        LogContext::new("rpc_client", "get_logs")
            .with_metadata("log_count", serde_json::json!(raw_logs.len()))
            .with_metadata("from_block", serde_json::json!(filter.from_block))
            .with_metadata("to_block", serde_json::json!(filter.to_block))
            .debug(&format!("Retrieved {} logs", raw_logs.len()));

        Ok(raw_logs)
    }
}

fn convert_log(eth_log: EthLog) -> Result<RawLog, RpcError> {
    let block_number = eth_log
        .block_number
        .as_deref()
        .ok_or_else(|| RpcError::InvalidResponse("Log without block number".to_string()))
        .and_then(parse_hex_to_u64)?;
    let transaction_hash = eth_log
        .transaction_hash
        .ok_or_else(|| RpcError::InvalidResponse("Log without transaction hash".to_string()))?;
    let log_index = match eth_log.log_index.as_deref() {
        Some(index) => parse_hex_to_u32(index)?,
        None => 0,
    };

    Ok(RawLog {
        address: eth_log.address,
        topics: eth_log.topics,
        data: decode_hex_bytes(&eth_log.data)?,
        block_number,
        transaction_hash,
        log_index,
    })
}

fn strip_hex_prefix(hex_str: &str) -> &str {
    hex_str
        .strip_prefix("0x")
        .or_else(|| hex_str.strip_prefix("0X"))
        .unwrap_or(hex_str)
}

fn parse_hex_to_u64(hex_str: &str) -> Result<u64, RpcError> {
    u64::from_str_radix(strip_hex_prefix(hex_str), 16)
        .map_err(|e| RpcError::InvalidResponse(format!("Failed to parse hex '{}' to u64: {}", hex_str, e)))
}

fn parse_hex_to_u32(hex_str: &str) -> Result<u32, RpcError> {
    u32::from_str_radix(strip_hex_prefix(hex_str), 16)
        .map_err(|e| RpcError::InvalidResponse(format!("Failed to parse hex '{}' to u32: {}", hex_str, e)))
}

fn decode_hex_bytes(hex_str: &str) -> Result<Vec<u8>, RpcError> {
    hex::decode(strip_hex_prefix(hex_str))
        .map_err(|e| RpcError::InvalidResponse(format!("Invalid log data: {}", e)))
}
