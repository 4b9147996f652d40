//! Minimal JSON-RPC 2.0 over HTTP, shared by the wallet, bundler and chain clients.

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{
    error::ErrorCode,
    protocol::{JsonRpcRequest, JsonRpcResponse},
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport failure calling {method}: {source}")]
    Transport {
        method: String,
        source: reqwest::Error,
    },
    #[error("{method} answered with HTTP status {status}")]
    Http { method: String, status: u16 },
    #[error("{method} failed with code {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    #[error("malformed response to {method}: {source}")]
    Decode {
        method: String,
        source: serde_json::Error,
    },
    #[error("no endpoint configured for {method}")]
    Unconfigured { method: String },
}

impl RpcError {
    /// Provider error classification, when the remote side produced one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            RpcError::Rpc { code, .. } => Some(ErrorCode::from_code(*code)),
            _ => None,
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code() == Some(ErrorCode::UserRejected)
    }
}

pub struct JsonRpcClient {
    http: Client,
    endpoint: Url,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(endpoint: Url) -> Self {
        Self::with_http(Client::new(), endpoint)
    }

    pub fn with_http(http: Client, endpoint: Url) -> Self {
        Self {
            http,
            endpoint,
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R, RpcError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, endpoint = %self.endpoint, "sending json-rpc request");

        let res = self
            .http
            .post(self.endpoint.clone())
            .json(&JsonRpcRequest::new(id, method, params))
            .send()
            .await
            .map_err(|source| RpcError::Transport {
                method: method.to_string(),
                source,
            })?;
        let status = res.status();
        let body = res.bytes().await.map_err(|source| RpcError::Transport {
            method: method.to_string(),
            source,
        })?;

        // Some endpoints report JSON-RPC errors with a 4xx/5xx status, so the
        // body is inspected before the status.
        let response: JsonRpcResponse<Value> = match serde_json::from_slice(&body) {
            Ok(response) => response,
            Err(_) if !status.is_success() => {
                return Err(RpcError::Http {
                    method: method.to_string(),
                    status: status.as_u16(),
                })
            }
            Err(source) => {
                return Err(RpcError::Decode {
                    method: method.to_string(),
                    source,
                })
            }
        };

        // Error replies may carry a null id; only a differing echo is suspicious.
        if response.id.is_some() && !response.answers(id) {
            warn!(method, expected = id, got = ?response.id, "json-rpc response id mismatch");
        }

        if let Some(error) = response.error {
            debug!(method, code = error.code, "json-rpc request failed");
            return Err(RpcError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        serde_json::from_value(response.result.unwrap_or(Value::Null)).map_err(|source| {
            RpcError::Decode {
                method: method.to_string(),
                source,
            }
        })
    }
}

#[cfg(test)]
#[path = "tests/rpc_tests.rs"]
mod tests;
