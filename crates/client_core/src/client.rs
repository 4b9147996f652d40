use std::sync::Arc;

use chrono::Utc;
use shared::{
    domain::{ChainId, Step},
    protocol::{Call, GrantedPermission},
};
use storage::SessionStore;
use tracing::{error, info};

use crate::{
    error::FlowError,
    grant::{PermissionGranter, StreamPolicy},
    providers::{PermissionProvider, PermissionRecord, SessionAccountProvider},
    redeem::{redeem_permission, MissingRedeemer, RedemptionReceipt, Redeemer},
    session_account::SessionAccount,
    step_controller::{StepController, StepWatcher},
    wallet::{ensure_connected, Erc7715Wallet, WalletConnection},
};

/// Owns one session's providers and the collaborators each step needs.
pub struct GatorClient {
    sessions: SessionAccountProvider,
    permissions: PermissionProvider,
    wallet: Arc<dyn Erc7715Wallet>,
    granter: PermissionGranter,
    redeemer: Arc<dyn Redeemer>,
}

impl GatorClient {
    pub fn new(
        session: &str,
        store: Arc<dyn SessionStore>,
        wallet: Arc<dyn Erc7715Wallet>,
        policy: StreamPolicy,
    ) -> Self {
        Self::new_with_redeemer(session, store, wallet, policy, Arc::new(MissingRedeemer))
    }

    pub fn new_with_redeemer(
        session: &str,
        store: Arc<dyn SessionStore>,
        wallet: Arc<dyn Erc7715Wallet>,
        policy: StreamPolicy,
        redeemer: Arc<dyn Redeemer>,
    ) -> Self {
        Self {
            sessions: SessionAccountProvider::new(session, store.clone()),
            permissions: PermissionProvider::new(session, store),
            granter: PermissionGranter::new(wallet.clone(), policy),
            wallet,
            redeemer,
        }
    }

    /// Restores persisted state into both providers.
    pub async fn load(&self) -> Result<Step, FlowError> {
        self.sessions.load().await?;
        self.permissions.load().await?;
        let step = self.step();
        info!(session = %self.sessions.session(), step = ?step, "session state loaded");
        Ok(step)
    }

    pub fn session(&self) -> &str {
        self.sessions.session()
    }

    pub fn chain_id(&self) -> ChainId {
        self.granter.policy().chain_id
    }

    pub fn step_controller(&self) -> StepController<SessionAccount, PermissionRecord> {
        StepController::new(self.sessions.subscribe(), self.permissions.subscribe())
    }

    pub fn watch_steps(&self) -> StepWatcher {
        self.step_controller().spawn()
    }

    pub fn step(&self) -> Step {
        self.step_controller().step()
    }

    pub fn session_account(&self) -> Option<SessionAccount> {
        self.sessions.session_account()
    }

    pub fn permission(&self) -> Option<PermissionRecord> {
        self.permissions.record()
    }

    pub async fn connect(&self) -> Result<WalletConnection, FlowError> {
        ensure_connected(self.wallet.as_ref(), self.chain_id()).await
    }

    pub async fn create_session_account(&self) -> Result<SessionAccount, FlowError> {
        self.sessions.create_session_account().await
    }

    pub async fn grant_permissions(&self) -> Result<GrantedPermission, FlowError> {
        self.granter
            .grant(&self.sessions, &self.permissions)
            .await
            .inspect_err(|err| error!(error = %err, "error granting permissions"))
    }

    pub async fn redeem(&self, calls: Vec<Call>) -> Result<RedemptionReceipt, FlowError> {
        redeem_permission(
            self.redeemer.as_ref(),
            &self.sessions,
            &self.permissions,
            calls,
            Utc::now(),
        )
        .await
        .inspect_err(|err| error!(error = %err, "error redeeming permission"))
    }

    /// Forgets the permission and the session account, returning to step 1.
    pub async fn reset(&self) -> Result<(), FlowError> {
        self.permissions.remove_permission().await?;
        self.sessions.clear().await?;
        info!(session = %self.sessions.session(), "session state cleared");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
