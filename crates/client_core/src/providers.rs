//! Session-scoped owners of the two facts the step controller observes.
//!
//! Each provider keeps the current value in a `watch` channel, so any number
//! of observers can read it synchronously and be woken when it changes. The
//! backing [`SessionStore`] makes the values survive process restarts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::protocol::GrantedPermission;
use storage::SessionStore;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{error::FlowError, session_account::SessionAccount};

pub struct SessionAccountProvider {
    session: String,
    store: Arc<dyn SessionStore>,
    state: watch::Sender<Option<SessionAccount>>,
}

impl SessionAccountProvider {
    pub fn new(session: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            session: session.into(),
            store,
            state,
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Restores the persisted account, if any, and publishes it.
    pub async fn load(&self) -> Result<Option<SessionAccount>, FlowError> {
        let stored = self
            .store
            .load_session_account(&self.session)
            .await
            .map_err(FlowError::store)?;
        let account = stored
            .as_ref()
            .map(SessionAccount::from_stored)
            .transpose()?;
        debug!(
            session = %self.session,
            present = account.is_some(),
            "loaded session account"
        );
        self.state.send_replace(account.clone());
        Ok(account)
    }

    pub async fn create_session_account(&self) -> Result<SessionAccount, FlowError> {
        let account = SessionAccount::generate();
        self.store
            .save_session_account(&self.session, &account.to_stored())
            .await
            .map_err(FlowError::store)?;
        info!(
            session = %self.session,
            address = %account.address(),
            "created session account"
        );
        self.state.send_replace(Some(account.clone()));
        Ok(account)
    }

    pub fn session_account(&self) -> Option<SessionAccount> {
        self.state.borrow().clone()
    }

    pub fn has_session_account(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionAccount>> {
        self.state.subscribe()
    }

    pub async fn clear(&self) -> Result<(), FlowError> {
        self.store
            .delete_session_account(&self.session)
            .await
            .map_err(FlowError::store)?;
        self.state.send_replace(None);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRecord {
    pub permission: GrantedPermission,
    pub stored_at: DateTime<Utc>,
}

pub struct PermissionProvider {
    session: String,
    store: Arc<dyn SessionStore>,
    state: watch::Sender<Option<PermissionRecord>>,
}

impl PermissionProvider {
    pub fn new(session: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            session: session.into(),
            store,
            state,
        }
    }

    pub async fn load(&self) -> Result<Option<PermissionRecord>, FlowError> {
        let record = self
            .store
            .load_permission(&self.session)
            .await
            .map_err(FlowError::store)?
            .map(|stored| PermissionRecord {
                permission: stored.permission,
                stored_at: stored.stored_at,
            });
        debug!(
            session = %self.session,
            present = record.is_some(),
            "loaded stored permission"
        );
        self.state.send_replace(record.clone());
        Ok(record)
    }

    pub async fn save_permission(&self, permission: GrantedPermission) -> Result<(), FlowError> {
        let stored_at = Utc::now();
        self.store
            .save_permission(&self.session, &permission, stored_at)
            .await
            .map_err(FlowError::store)?;
        info!(
            session = %self.session,
            chain_id = %permission.request.chain_id,
            expiry = permission.request.expiry,
            "stored granted permission"
        );
        self.state.send_replace(Some(PermissionRecord {
            permission,
            stored_at,
        }));
        Ok(())
    }

    pub fn permission(&self) -> Option<GrantedPermission> {
        self.state
            .borrow()
            .as_ref()
            .map(|record| record.permission.clone())
    }

    pub fn record(&self) -> Option<PermissionRecord> {
        self.state.borrow().clone()
    }

    pub fn has_permission(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PermissionRecord>> {
        self.state.subscribe()
    }

    pub async fn remove_permission(&self) -> Result<(), FlowError> {
        self.store
            .delete_permission(&self.session)
            .await
            .map_err(FlowError::store)?;
        self.state.send_replace(None);
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/providers_tests.rs"]
mod tests;
