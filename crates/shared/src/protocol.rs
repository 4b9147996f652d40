use serde::{Deserialize, Serialize};

use crate::{
    domain::{Address, ChainId, HexBytes, Wei},
    error::RpcErrorObject,
};

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest<P> {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: P,
}

impl<P> JsonRpcRequest<P> {
    pub fn new(id: u64, method: impl Into<String>, params: P) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// Response envelope. `id` stays raw JSON: peers echo numbers or strings, and
/// answer with `null` when the request itself could not be read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse<R> {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<R>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl<R> JsonRpcResponse<R> {
    pub fn success(id: Option<serde_json::Value>, result: R) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<serde_json::Value>, error: RpcErrorObject) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Whether the echoed id refers to request `id`, accepting a string echo.
    pub fn answers(&self, id: u64) -> bool {
        match &self.id {
            Some(serde_json::Value::Number(n)) => n.as_u64() == Some(id),
            Some(serde_json::Value::String(s)) => s.parse::<u64>().ok() == Some(id),
            _ => false,
        }
    }
}

/// Account that will hold the granted permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum PermissionSigner {
    Account { address: Address },
}

impl PermissionSigner {
    pub fn address(&self) -> Address {
        match self {
            PermissionSigner::Account { address } => *address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTokenStream {
    pub initial_amount: Wei,
    pub amount_per_second: Wei,
    pub start_time: u64,
    pub max_amount: Wei,
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Permission {
    NativeTokenStream(NativeTokenStream),
}

/// One entry of the `wallet_grantPermissions` parameter array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    pub chain_id: ChainId,
    pub expiry: u64,
    pub signer: PermissionSigner,
    pub permission: Permission,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMeta {
    pub factory: Address,
    pub factory_data: HexBytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerMeta {
    pub delegation_manager: Address,
}

/// Wallet answer for one granted request: the request echoed back plus the
/// opaque context needed to redeem it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantedPermission {
    #[serde(flatten)]
    pub request: PermissionRequest,
    pub context: HexBytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_meta: Option<Vec<AccountMeta>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_meta: Option<SignerMeta>,
}

impl GrantedPermission {
    pub fn delegation_manager(&self) -> Option<Address> {
        self.signer_meta.as_ref().map(|meta| meta.delegation_manager)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub to: Address,
    pub value: Wei,
    pub data: HexBytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsCapability {
    pub context: HexBytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegation_manager: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendCallsCapabilities {
    pub permissions: PermissionsCapability,
}

/// `wallet_sendCalls` payload used to redeem a granted permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCallsRequest {
    pub version: String,
    pub chain_id: ChainId,
    pub from: Address,
    pub calls: Vec<Call>,
    pub capabilities: SendCallsCapabilities,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchChainParams {
    pub chain_id: ChainId,
}
