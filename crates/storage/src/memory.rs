//! Process-local session store for ephemeral runs and tests.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::protocol::GrantedPermission;
use tokio::sync::RwLock;

use crate::{SessionStore, StoredPermission, StoredSessionAccount};

#[derive(Default)]
pub struct MemorySessionStore {
    accounts: RwLock<HashMap<String, StoredSessionAccount>>,
    permissions: RwLock<HashMap<String, StoredPermission>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save_session_account(
        &self,
        session: &str,
        account: &StoredSessionAccount,
    ) -> Result<()> {
        self.accounts
            .write()
            .await
            .insert(session.to_string(), account.clone());
        Ok(())
    }

    async fn load_session_account(&self, session: &str) -> Result<Option<StoredSessionAccount>> {
        Ok(self.accounts.read().await.get(session).cloned())
    }

    async fn delete_session_account(&self, session: &str) -> Result<bool> {
        Ok(self.accounts.write().await.remove(session).is_some())
    }

    async fn save_permission(
        &self,
        session: &str,
        permission: &GrantedPermission,
        stored_at: DateTime<Utc>,
    ) -> Result<()> {
        self.permissions.write().await.insert(
            session.to_string(),
            StoredPermission {
                permission: permission.clone(),
                stored_at,
            },
        );
        Ok(())
    }

    async fn load_permission(&self, session: &str) -> Result<Option<StoredPermission>> {
        Ok(self.permissions.read().await.get(session).cloned())
    }

    async fn delete_permission(&self, session: &str) -> Result<bool> {
        Ok(self.permissions.write().await.remove(session).is_some())
    }
}
