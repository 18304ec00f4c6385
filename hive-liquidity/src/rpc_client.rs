//! Lightweight Solana RPC client
//!
//! Implements only the JSON-RPC methods the liquidity service reads, on top of
//! a blocking `ureq` agent driven from `spawn_blocking`.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::{account::Account, hash::Hash, pubkey::Pubkey, transaction::Transaction};
use std::time::Duration;
use tracing::debug;

use crate::config::LedgerConfig;
use crate::core::{AccountFilter, LedgerError, LedgerPort, LedgerResult, SimulationOutcome};

/// Lightweight RPC client for Solana
pub struct LightRpcClient {
    url: String,
    commitment: String,
    agent: ureq::Agent,
}

/// RPC response wrapper
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// RPC error structure
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Account data response from RPC
#[derive(Debug, Deserialize)]
struct AccountInfo {
    lamports: u64,
    data: (String, String), // (data, encoding)
    owner: String,
    executable: bool,
    #[serde(rename = "rentEpoch")]
    rent_epoch: u64,
}

#[derive(Debug, Deserialize)]
struct KeyedAccountInfo {
    pubkey: String,
    account: AccountInfo,
}

#[derive(Debug, Deserialize)]
struct SimulationValue {
    err: Option<Value>,
    logs: Option<Vec<String>>,
    #[serde(rename = "unitsConsumed")]
    units_consumed: Option<u64>,
}

impl LightRpcClient {
    /// Create a new lightweight RPC client
    pub fn new(config: &LedgerConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(config.connect_timeout_secs))
            .timeout_read(Duration::from_secs(config.read_timeout_secs))
            .build();

        Self {
            url: config.rpc_url.clone(),
            commitment: config.commitment.clone(),
            agent,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Make a JSON-RPC call
    async fn call<T>(&self, method: &str, params: Value) -> LedgerResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        debug!(method, "RPC call");

        // Use blocking call since ureq is sync
        let response_body = tokio::task::spawn_blocking({
            let agent = self.agent.clone();
            let url = self.url.clone();
            let body = request_body.to_string();

            move || {
                let response = agent
                    .post(&url)
                    .set("Content-Type", "application/json")
                    .send_string(&body)
                    .map_err(|e| LedgerError::Transport(e.to_string()))?;

                response
                    .into_string()
                    .map_err(|e| LedgerError::Transport(e.to_string()))
            }
        })
        .await
        .map_err(|e| LedgerError::Transport(format!("RPC task failed: {}", e)))??;

        let rpc_response: RpcResponse<T> = serde_json::from_str(&response_body)?;

        if let Some(error) = rpc_response.error {
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| LedgerError::Decode(format!("no result in {} response", method)))
    }

    fn encoding_config(&self) -> Value {
        json!({
            "encoding": "base64",
            "commitment": self.commitment,
        })
    }
}

fn decode_account(info: AccountInfo) -> LedgerResult<Account> {
    if info.data.1 != "base64" {
        return Err(LedgerError::Decode(format!("unsupported data encoding: {}", info.data.1)));
    }
    let data = base64::engine::general_purpose::STANDARD
        .decode(&info.data.0)
        .map_err(|e| LedgerError::Decode(format!("failed to decode account data: {}", e)))?;
    let owner = info
        .owner
        .parse()
        .map_err(|e| LedgerError::Decode(format!("failed to parse owner: {}", e)))?;

    Ok(Account {
        lamports: info.lamports,
        data,
        owner,
        executable: info.executable,
        rent_epoch: info.rent_epoch,
    })
}

fn filter_to_json(filter: &AccountFilter) -> Value {
    match filter {
        AccountFilter::Memcmp { offset, bytes } => json!({
            "memcmp": {
                "offset": offset,
                "bytes": bs58::encode(bytes).into_string(),
            }
        }),
        AccountFilter::DataSize(size) => json!({ "dataSize": size }),
    }
}

#[async_trait]
impl LedgerPort for LightRpcClient {
    async fn get_account(&self, address: &Pubkey) -> LedgerResult<Option<Account>> {
        let params = json!([address.to_string(), self.encoding_config()]);
        let response: Value = self.call("getAccountInfo", params).await?;

        if response["value"].is_null() {
            return Ok(None);
        }

        let info: AccountInfo = serde_json::from_value(response["value"].clone())?;
        decode_account(info).map(Some)
    }

    async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> LedgerResult<Vec<Option<Account>>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = addresses.iter().map(|key| key.to_string()).collect();
        let params = json!([keys, self.encoding_config()]);
        let response: Value = self.call("getMultipleAccounts", params).await?;

        let values: Vec<Option<AccountInfo>> = serde_json::from_value(response["value"].clone())?;
        if values.len() != addresses.len() {
            return Err(LedgerError::Decode(format!(
                "requested {} accounts, received {}",
                addresses.len(),
                values.len()
            )));
        }
        values
            .into_iter()
            .map(|info| info.map(decode_account).transpose())
            .collect()
    }

    async fn get_balance(&self, address: &Pubkey) -> LedgerResult<u64> {
        let params = json!([address.to_string(), { "commitment": self.commitment }]);
        let response: Value = self.call("getBalance", params).await?;
        response["value"]
            .as_u64()
            .ok_or_else(|| LedgerError::Decode("invalid balance in response".to_string()))
    }

    async fn get_latest_blockhash(&self) -> LedgerResult<Hash> {
        let params = json!([{ "commitment": self.commitment }]);
        let response: Value = self.call("getLatestBlockhash", params).await?;

        let blockhash_str = response["value"]["blockhash"]
            .as_str()
            .ok_or_else(|| LedgerError::Decode("invalid blockhash in response".to_string()))?;

        blockhash_str
            .parse()
            .map_err(|e| LedgerError::Decode(format!("failed to parse blockhash: {}", e)))
    }

    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        filters: &[AccountFilter],
    ) -> LedgerResult<Vec<(Pubkey, Account)>> {
        let filters: Vec<Value> = filters.iter().map(filter_to_json).collect();
        let params = json!([
            program.to_string(),
            {
                "encoding": "base64",
                "commitment": self.commitment,
                "filters": filters,
            }
        ]);

        let response: Vec<KeyedAccountInfo> = self.call("getProgramAccounts", params).await?;

        response
            .into_iter()
            .map(|keyed| {
                let pubkey = keyed
                    .pubkey
                    .parse()
                    .map_err(|e| LedgerError::Decode(format!("failed to parse pubkey: {}", e)))?;
                Ok((pubkey, decode_account(keyed.account)?))
            })
            .collect()
    }

    async fn simulate_transaction(&self, transaction: &Transaction) -> LedgerResult<SimulationOutcome> {
        let tx_data = bincode::serialize(transaction)
            .map_err(|e| LedgerError::Decode(format!("failed to serialize transaction: {}", e)))?;
        let tx_base64 = base64::engine::general_purpose::STANDARD.encode(tx_data);

        let params = json!([
            tx_base64,
            {
                "encoding": "base64",
                "commitment": self.commitment,
                "sigVerify": false,
                "replaceRecentBlockhash": false,
            }
        ]);

        let response: Value = self.call("simulateTransaction", params).await?;
        let value: SimulationValue = serde_json::from_value(response["value"].clone())?;

        Ok(SimulationOutcome {
            err: value.err.map(|err| err.to_string()),
            logs: value.logs.unwrap_or_default(),
            units_consumed: value.units_consumed,
        })
    }
}
