//! Step 3: the session account exercises the stored permission by submitting
//! a call bundle that carries the permission context.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{
    domain::{Address, ChainId, HexBytes, Wei},
    protocol::{
        Call, GrantedPermission, PermissionsCapability, SendCallsCapabilities, SendCallsRequest,
    },
};
use tracing::info;
use url::Url;

use crate::{
    error::FlowError,
    providers::{PermissionProvider, SessionAccountProvider},
    rpc::{JsonRpcClient, RpcError},
    session_account::SessionAccount,
};

pub const SEND_CALLS_VERSION: &str = "1.0";

#[async_trait]
pub trait Redeemer: Send + Sync {
    /// Submits the bundle and returns the identifier assigned by the bundler.
    async fn send_calls(&self, request: &SendCallsRequest) -> Result<String, RpcError>;
}

/// Stand-in used when no bundler endpoint is configured.
pub struct MissingRedeemer;

#[async_trait]
impl Redeemer for MissingRedeemer {
    async fn send_calls(&self, _request: &SendCallsRequest) -> Result<String, RpcError> {
        Err(RpcError::Unconfigured {
            method: "wallet_sendCalls".to_string(),
        })
    }
}

pub struct BundlerRedeemer {
    rpc: JsonRpcClient,
}

impl BundlerRedeemer {
    pub fn new(endpoint: Url) -> Self {
        Self {
            rpc: JsonRpcClient::new(endpoint),
        }
    }
}

/// Older bundlers answer with a bare id, newer ones with `{ "id": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SendCallsResult {
    Id(String),
    Object { id: String },
}

#[async_trait]
impl Redeemer for BundlerRedeemer {
    async fn send_calls(&self, request: &SendCallsRequest) -> Result<String, RpcError> {
        let result: SendCallsResult = self.rpc.request("wallet_sendCalls", [request]).await?;
        Ok(match result {
            SendCallsResult::Id(id) | SendCallsResult::Object { id } => id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionReceipt {
    pub bundle_id: String,
    pub from: Address,
    pub chain_id: ChainId,
    pub submitted_at: DateTime<Utc>,
}

/// Sends 1 wei back to the session account itself.
pub fn default_redemption_call(account: &SessionAccount) -> Call {
    Call {
        to: account.address(),
        value: Wei(1),
        data: HexBytes::default(),
    }
}

pub fn build_send_calls(
    account: &SessionAccount,
    permission: &GrantedPermission,
    calls: Vec<Call>,
) -> SendCallsRequest {
    SendCallsRequest {
        version: SEND_CALLS_VERSION.to_string(),
        chain_id: permission.request.chain_id,
        from: account.address(),
        calls,
        capabilities: SendCallsCapabilities {
            permissions: PermissionsCapability {
                context: permission.context.clone(),
                delegation_manager: permission.delegation_manager(),
            },
        },
    }
}

/// Redeems the stored permission. An empty `calls` list falls back to
/// [`default_redemption_call`].
pub async fn redeem_permission(
    redeemer: &dyn Redeemer,
    sessions: &SessionAccountProvider,
    permissions: &PermissionProvider,
    calls: Vec<Call>,
    now: DateTime<Utc>,
) -> Result<RedemptionReceipt, FlowError> {
    let account = sessions
        .session_account()
        .ok_or(FlowError::SessionAccountMissing)?;
    let permission = permissions
        .permission()
        .ok_or(FlowError::PermissionMissing)?;

    let expiry = permission.request.expiry;
    if u64::try_from(now.timestamp()).unwrap_or_default() >= expiry {
        return Err(FlowError::PermissionExpired { expiry });
    }

    let calls = if calls.is_empty() {
        vec![default_redemption_call(&account)]
    } else {
        calls
    };
    let request = build_send_calls(&account, &permission, calls);
    let bundle_id = redeemer.send_calls(&request).await?;
    info!(
        bundle_id = %bundle_id,
        from = %account.address(),
        calls = request.calls.len(),
        "submitted permission redemption"
    );

    Ok(RedemptionReceipt {
        bundle_id,
        from: account.address(),
        chain_id: request.chain_id,
        submitted_at: now,
    })
}

#[cfg(test)]
#[path = "tests/redeem_tests.rs"]
mod tests;
