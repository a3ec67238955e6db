use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    #[error("{method}: transport failure: {message}")]
    Transport { method: String, message: String },
    #[error("{method}: rpc error {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
        data: Option<Value>,
    },
    #[error("{method}: could not decode response: {message}")]
    Decode { method: String, message: String },
}

impl RpcError {
    pub fn method(&self) -> &str {
        match self {
            RpcError::Transport { method, .. }
            | RpcError::Rpc { method, .. }
            | RpcError::Decode { method, .. } => method,
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, RpcError::Rpc { code, .. } if *code == USER_REJECTED_CODE)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retry_count: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// JSON-RPC 2.0 over HTTP POST. Transport failures are retried; RPC errors are not.
pub struct JsonRpcTransport {
    http: Client,
    endpoint: Url,
    next_id: AtomicU64,
    retry: RetryPolicy,
}

impl JsonRpcTransport {
    pub fn new(endpoint: Url, request_timeout: Duration, retry: RetryPolicy) -> Result<Self, RpcError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| RpcError::Transport {
                method: "client_init".to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            http,
            endpoint,
            next_id: AtomicU64::new(1),
            retry,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn request<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, RpcError> {
        let mut attempt = 0;
        loop {
            match self.request_once(method, &params).await {
                Err(err @ RpcError::Transport { .. }) if attempt < self.retry.retry_count => {
                    attempt += 1;
                    warn!(
                        method,
                        attempt,
                        endpoint = %self.endpoint,
                        error = %err,
                        "rpc transport failure; retrying"
                    );
                    tokio::time::sleep(self.retry.retry_delay).await;
                }
                other => return other,
            }
        }
    }

    async fn request_once<R: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<R, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "rpc request");
        let transport_err = |err: reqwest::Error| RpcError::Transport {
            method: method.to_string(),
            message: err.to_string(),
        };

        let response: JsonRpcResponse = self
            .http
            .post(self.endpoint.clone())
            .json(&JsonRpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await
            .map_err(transport_err)?
            .error_for_status()
            .map_err(transport_err)?
            .json()
            .await
            .map_err(|err| RpcError::Decode {
                method: method.to_string(),
                message: err.to_string(),
            })?;

        if let Some(error) = response.error {
            return Err(RpcError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }

        serde_json::from_value(response.result.unwrap_or(Value::Null)).map_err(|err| {
            RpcError::Decode {
                method: method.to_string(),
                message: err.to_string(),
            }
        })
    }
}
