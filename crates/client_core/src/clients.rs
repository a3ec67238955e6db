use alloy::primitives::{Address, Bytes, B256, U64};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::{chain::ChainProfile, domain::ChainId};
use url::Url;

use crate::rpc::{JsonRpcTransport, RetryPolicy, RpcError};

/// Parameters shared by `eth_call`, `eth_estimateGas` and `eth_sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U64>,
    /// Set on sends so the wallet refuses to sign for another network.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub status: Option<U64>,
}

impl TxReceipt {
    /// Pre-Byzantium receipts carry no status; treat them as successful.
    pub fn succeeded(&self) -> bool {
        self.status.map_or(true, |status| !status.is_zero())
    }
}

/// Read side of the chain: the public RPC endpoint.
#[async_trait]
pub trait ReadClient: Send + Sync {
    async fn chain_id(&self) -> Result<ChainId, RpcError>;
    async fn call(&self, request: &CallRequest) -> Result<Bytes, RpcError>;
    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, RpcError>;
    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, RpcError>;
}

/// Write side: an EIP-1193 provider that owns the signing keys.
#[async_trait]
pub trait WalletClient: Send + Sync {
    async fn request_accounts(&self) -> Result<Vec<Address>, RpcError>;
    async fn accounts(&self) -> Result<Vec<Address>, RpcError>;
    async fn chain_id(&self) -> Result<ChainId, RpcError>;
    async fn send_transaction(&self, request: &CallRequest) -> Result<B256, RpcError>;
}

fn chain_id_from(raw: U64) -> ChainId {
    ChainId(raw.to::<u64>())
}

pub struct HttpReadClient {
    transport: JsonRpcTransport,
}

impl HttpReadClient {
    pub fn new(transport: JsonRpcTransport) -> Self {
        Self { transport }
    }

    pub fn for_profile(profile: &ChainProfile, endpoint: Url) -> Result<Self, RpcError> {
        let retry = RetryPolicy {
            retry_count: profile.retry_count,
            retry_delay: profile.retry_delay,
        };
        Ok(Self::new(JsonRpcTransport::new(
            endpoint,
            profile.request_timeout,
            retry,
        )?))
    }
}

#[async_trait]
impl ReadClient for HttpReadClient {
    async fn chain_id(&self) -> Result<ChainId, RpcError> {
        let raw: U64 = self.transport.request("eth_chainId", json!([])).await?;
        Ok(chain_id_from(raw))
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, RpcError> {
        self.transport
            .request("eth_call", json!([request, "latest"]))
            .await
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, RpcError> {
        let raw: U64 = self
            .transport
            .request("eth_estimateGas", json!([request]))
            .await?;
        Ok(raw.to::<u64>())
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, RpcError> {
        self.transport
            .request("eth_getTransactionReceipt", json!([tx_hash]))
            .await
    }
}

/// Wallet reached over JSON-RPC, e.g. Frame on `http://127.0.0.1:1248`.
pub struct InjectedWallet {
    transport: JsonRpcTransport,
}

impl InjectedWallet {
    pub fn new(transport: JsonRpcTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl WalletClient for InjectedWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, RpcError> {
        self.transport
            .request("eth_requestAccounts", json!([]))
            .await
    }

    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        self.transport.request("eth_accounts", json!([])).await
    }

    async fn chain_id(&self) -> Result<ChainId, RpcError> {
        let raw: U64 = self.transport.request("eth_chainId", json!([])).await?;
        Ok(chain_id_from(raw))
    }

    async fn send_transaction(&self, request: &CallRequest) -> Result<B256, RpcError> {
        self.transport
            .request("eth_sendTransaction", json!([request]))
            .await
    }
}

/// Stand-in used when no wallet endpoint is configured; every request fails.
pub struct MissingWallet;

impl MissingWallet {
    fn unavailable(method: &str) -> RpcError {
        RpcError::Transport {
            method: method.to_string(),
            message: "no wallet provider configured".to_string(),
        }
    }
}

#[async_trait]
impl WalletClient for MissingWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, RpcError> {
        Err(Self::unavailable("eth_requestAccounts"))
    }

    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        Ok(Vec::new())
    }

    async fn chain_id(&self) -> Result<ChainId, RpcError> {
        Err(Self::unavailable("eth_chainId"))
    }

    async fn send_transaction(&self, _request: &CallRequest) -> Result<B256, RpcError> {
        Err(Self::unavailable("eth_sendTransaction"))
    }
}
