use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{domain::Address, protocol::GrantedPermission};

mod memory;

pub use memory::MemorySessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSessionAccount {
    pub address: Address,
    pub secret_key_hex: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPermission {
    pub permission: GrantedPermission,
    pub stored_at: DateTime<Utc>,
}

/// Session-scoped persistence for the two pieces of flow state. Every call is
/// keyed by a session label so several flows can share one database.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session_account(
        &self,
        session: &str,
        account: &StoredSessionAccount,
    ) -> Result<()>;
    async fn load_session_account(&self, session: &str) -> Result<Option<StoredSessionAccount>>;
    async fn delete_session_account(&self, session: &str) -> Result<bool>;
    async fn save_permission(
        &self,
        session: &str,
        permission: &GrantedPermission,
        stored_at: DateTime<Utc>,
    ) -> Result<()>;
    async fn load_permission(&self, session: &str) -> Result<Option<StoredPermission>>;
    async fn delete_permission(&self, session: &str) -> Result<bool>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open session database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run session database migrations")?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Labels of every session that holds a session account or a permission.
    pub async fn list_sessions(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT session FROM session_accounts
             UNION
             SELECT session FROM permissions
             ORDER BY session",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list sessions")?;
        rows.into_iter()
            .map(|row| row.try_get::<String, _>(0).map_err(Into::into))
            .collect()
    }
}

#[async_trait]
impl SessionStore for Storage {
    async fn save_session_account(
        &self,
        session: &str,
        account: &StoredSessionAccount,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO session_accounts (session, address, secret_key_hex, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(session) DO UPDATE SET
                address = excluded.address,
                secret_key_hex = excluded.secret_key_hex,
                created_at = excluded.created_at",
        )
        .bind(session)
        .bind(account.address.to_string())
        .bind(&account.secret_key_hex)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save session account for '{session}'"))?;
        Ok(())
    }

    async fn load_session_account(&self, session: &str) -> Result<Option<StoredSessionAccount>> {
        let row = sqlx::query(
            "SELECT address, secret_key_hex, created_at FROM session_accounts WHERE session = ?",
        )
        .bind(session)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load session account for '{session}'"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let address: String = row.try_get("address")?;
        Ok(Some(StoredSessionAccount {
            address: address
                .parse()
                .with_context(|| format!("corrupt session account address '{address}'"))?,
            secret_key_hex: row.try_get("secret_key_hex")?,
            created_at: row.try_get("created_at")?,
        }))
    }

    async fn delete_session_account(&self, session: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM session_accounts WHERE session = ?")
            .bind(session)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete session account for '{session}'"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_permission(
        &self,
        session: &str,
        permission: &GrantedPermission,
        stored_at: DateTime<Utc>,
    ) -> Result<()> {
        let permission_json =
            serde_json::to_string(permission).context("failed to encode granted permission")?;
        sqlx::query(
            "INSERT INTO permissions (session, permission_json, stored_at)
             VALUES (?, ?, ?)
             ON CONFLICT(session) DO UPDATE SET
                permission_json = excluded.permission_json,
                stored_at = excluded.stored_at",
        )
        .bind(session)
        .bind(permission_json)
        .bind(stored_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save permission for '{session}'"))?;
        Ok(())
    }

    async fn load_permission(&self, session: &str) -> Result<Option<StoredPermission>> {
        let row = sqlx::query("SELECT permission_json, stored_at FROM permissions WHERE session = ?")
            .bind(session)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load permission for '{session}'"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let permission_json: String = row.try_get("permission_json")?;
        let permission = serde_json::from_str(&permission_json)
            .with_context(|| format!("corrupt stored permission for '{session}'"))?;
        Ok(Some(StoredPermission {
            permission,
            stored_at: row.try_get("stored_at")?,
        }))
    }

    async fn delete_permission(&self, session: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM permissions WHERE session = ?")
            .bind(session)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete permission for '{session}'"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
