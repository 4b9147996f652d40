//! Wallet side of the flow: connection, chain selection and ERC-7715 grants.

use async_trait::async_trait;
use serde_json::json;
use shared::{
    domain::{Address, ChainId},
    protocol::{GrantedPermission, PermissionRequest, SwitchChainParams},
};
use tracing::info;
use url::Url;

use crate::{
    error::FlowError,
    rpc::{JsonRpcClient, RpcError},
};

#[async_trait]
pub trait Erc7715Wallet: Send + Sync {
    async fn request_accounts(&self) -> Result<Vec<Address>, RpcError>;
    async fn accounts(&self) -> Result<Vec<Address>, RpcError>;
    async fn chain_id(&self) -> Result<ChainId, RpcError>;
    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), RpcError>;
    async fn grant_permissions(
        &self,
        requests: &[PermissionRequest],
    ) -> Result<Vec<GrantedPermission>, RpcError>;
}

/// Talks to a wallet bridge that accepts EIP-1193 requests as JSON-RPC.
pub struct WalletClient {
    rpc: JsonRpcClient,
}

impl WalletClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            rpc: JsonRpcClient::new(endpoint),
        }
    }
}

#[async_trait]
impl Erc7715Wallet for WalletClient {
    async fn request_accounts(&self) -> Result<Vec<Address>, RpcError> {
        self.rpc.request("eth_requestAccounts", json!([])).await
    }

    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        self.rpc.request("eth_accounts", json!([])).await
    }

    async fn chain_id(&self) -> Result<ChainId, RpcError> {
        self.rpc.request("eth_chainId", json!([])).await
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), RpcError> {
        self.rpc
            .request("wallet_switchEthereumChain", [SwitchChainParams { chain_id }])
            .await
    }

    async fn grant_permissions(
        &self,
        requests: &[PermissionRequest],
    ) -> Result<Vec<GrantedPermission>, RpcError> {
        self.rpc.request("wallet_grantPermissions", requests).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalletConnection {
    pub account: Option<Address>,
    pub chain_id: Option<ChainId>,
}

impl WalletConnection {
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectAction {
    Connect,
    SwitchChain(ChainId),
}

/// Offers a chain switch only to a connected wallet sitting on another chain;
/// everything else, including an already correct connection, offers Connect.
pub fn connect_action(connection: &WalletConnection, configured: ChainId) -> ConnectAction {
    if connection.is_connected() && connection.chain_id != Some(configured) {
        ConnectAction::SwitchChain(configured)
    } else {
        ConnectAction::Connect
    }
}

pub async fn current_connection(wallet: &dyn Erc7715Wallet) -> Result<WalletConnection, RpcError> {
    let account = wallet.accounts().await?.into_iter().next();
    let chain_id = match account {
        Some(_) => Some(wallet.chain_id().await?),
        None => None,
    };
    Ok(WalletConnection { account, chain_id })
}

/// Connects when needed, then moves the wallet to `configured`.
pub async fn ensure_connected(
    wallet: &dyn Erc7715Wallet,
    configured: ChainId,
) -> Result<WalletConnection, FlowError> {
    let mut connection = current_connection(wallet).await?;

    if !connection.is_connected() {
        connection.account = wallet.request_accounts().await?.into_iter().next();
        let Some(account) = connection.account else {
            return Err(FlowError::WalletNotConnected);
        };
        connection.chain_id = Some(wallet.chain_id().await?);
        info!(account = %account, "wallet connected");
    }

    if let ConnectAction::SwitchChain(chain_id) = connect_action(&connection, configured) {
        wallet.switch_chain(chain_id).await?;
        info!(chain_id = %chain_id, "wallet switched chain");
        connection.chain_id = Some(chain_id);
    }

    Ok(connection)
}

#[cfg(test)]
#[path = "tests/wallet_tests.rs"]
mod tests;
