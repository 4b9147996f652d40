use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid hex quantity: {0}")]
    InvalidQuantity(String),
    #[error("invalid hex data: {0}")]
    InvalidHex(String),
}

/// Well-known provider error codes (EIP-1193, EIP-3085/3326) plus the
/// JSON-RPC reserved range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UserRejected,
    Unauthorized,
    UnsupportedMethod,
    Disconnected,
    ChainDisconnected,
    UnrecognizedChain,
    InvalidParams,
    Internal,
    Other,
}

impl ErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            4001 => ErrorCode::UserRejected,
            4100 => ErrorCode::Unauthorized,
            4200 | -32601 => ErrorCode::UnsupportedMethod,
            4900 => ErrorCode::Disconnected,
            4901 => ErrorCode::ChainDisconnected,
            4902 => ErrorCode::UnrecognizedChain,
            -32602 => ErrorCode::InvalidParams,
            -32603 => ErrorCode::Internal,
            _ => ErrorCode::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcErrorObject {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn kind(&self) -> ErrorCode {
        ErrorCode::from_code(self.code)
    }
}
