//! Step 2: ask the wallet for a native-token stream permission on behalf of
//! the session account and store the wallet's answer.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use shared::{
    domain::{Address, ChainId, Wei},
    protocol::{GrantedPermission, NativeTokenStream, Permission, PermissionRequest, PermissionSigner},
};
use tracing::{info, warn};

use crate::{
    error::FlowError,
    providers::{PermissionProvider, SessionAccountProvider},
    wallet::Erc7715Wallet,
};

pub const DEFAULT_JUSTIFICATION: &str = "Payment for a subscription service";
pub const DEFAULT_VALIDITY_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPolicy {
    pub chain_id: ChainId,
    pub initial_amount: Wei,
    pub amount_per_second: Wei,
    pub max_amount: Wei,
    pub validity_secs: u64,
    pub justification: String,
}

impl Default for StreamPolicy {
    fn default() -> Self {
        Self {
            chain_id: ChainId::SEPOLIA,
            initial_amount: Wei(1),
            amount_per_second: Wei(1),
            max_amount: Wei(10),
            validity_secs: DEFAULT_VALIDITY_SECS,
            justification: DEFAULT_JUSTIFICATION.to_string(),
        }
    }
}

/// Builds the single request item: the stream starts at `now` and the grant
/// expires `validity_secs` later.
pub fn native_token_stream_request(
    signer: Address,
    policy: &StreamPolicy,
    now: DateTime<Utc>,
) -> PermissionRequest {
    let start_time = u64::try_from(now.timestamp()).unwrap_or_default();
    PermissionRequest {
        chain_id: policy.chain_id,
        expiry: start_time.saturating_add(policy.validity_secs),
        signer: PermissionSigner::Account { address: signer },
        permission: Permission::NativeTokenStream(NativeTokenStream {
            initial_amount: policy.initial_amount,
            amount_per_second: policy.amount_per_second,
            start_time,
            max_amount: policy.max_amount,
            justification: policy.justification.clone(),
        }),
    }
}

/// Issues grants one at a time; a second call while one is pending is refused.
pub struct PermissionGranter {
    wallet: Arc<dyn Erc7715Wallet>,
    policy: StreamPolicy,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PermissionGranter {
    pub fn new(wallet: Arc<dyn Erc7715Wallet>, policy: StreamPolicy) -> Self {
        Self {
            wallet,
            policy,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn policy(&self) -> &StreamPolicy {
        &self.policy
    }

    pub fn is_granting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn grant(
        &self,
        sessions: &SessionAccountProvider,
        permissions: &PermissionProvider,
    ) -> Result<GrantedPermission, FlowError> {
        self.grant_at(sessions, permissions, Utc::now()).await
    }

    pub async fn grant_at(
        &self,
        sessions: &SessionAccountProvider,
        permissions: &PermissionProvider,
        now: DateTime<Utc>,
    ) -> Result<GrantedPermission, FlowError> {
        let account = sessions
            .session_account()
            .ok_or(FlowError::SessionAccountMissing)?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(FlowError::Busy);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let request = native_token_stream_request(account.address(), &self.policy, now);
        info!(
            signer = %account.address(),
            chain_id = %request.chain_id,
            expiry = request.expiry,
            "requesting native-token-stream permission"
        );

        let granted = self
            .wallet
            .grant_permissions(std::slice::from_ref(&request))
            .await?;
        if granted.len() > 1 {
            warn!(count = granted.len(), "wallet granted more than requested; keeping the first");
        }
        let permission = granted.into_iter().next().ok_or(FlowError::NothingGranted)?;

        permissions.save_permission(permission.clone()).await?;
        Ok(permission)
    }
}

#[cfg(test)]
#[path = "tests/grant_tests.rs"]
mod tests;
