use super::*;
use crate::test_support::sample_permission_for;
use storage::{MemorySessionStore, Storage};

#[tokio::test]
async fn created_account_is_published_and_persisted() {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let provider = SessionAccountProvider::new("alpha", store.clone());
    let mut rx = provider.subscribe();
    assert!(rx.borrow_and_update().is_none());

    let account = provider.create_session_account().await.expect("create");
    assert!(rx.has_changed().expect("sender alive"));
    assert_eq!(
        rx.borrow_and_update().as_ref().map(SessionAccount::address),
        Some(account.address())
    );

    let stored = store
        .load_session_account("alpha")
        .await
        .expect("load")
        .expect("persisted");
    assert_eq!(stored.address, account.address());
}

#[tokio::test]
async fn load_restores_state_from_sqlite_in_a_fresh_provider() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let store: Arc<dyn SessionStore> = Arc::new(storage);

    let first = SessionAccountProvider::new("alpha", store.clone());
    let account = first.create_session_account().await.expect("create");
    let first_permissions = PermissionProvider::new("alpha", store.clone());
    first_permissions
        .save_permission(sample_permission_for(account.address()))
        .await
        .expect("save permission");

    let sessions = SessionAccountProvider::new("alpha", store.clone());
    let permissions = PermissionProvider::new("alpha", store);
    assert!(!sessions.has_session_account());
    assert!(!permissions.has_permission());

    let restored = sessions.load().await.expect("load").expect("account");
    assert_eq!(restored.address(), account.address());
    let record = permissions.load().await.expect("load").expect("permission");
    assert_eq!(record.permission, sample_permission_for(account.address()));
    assert!(sessions.has_session_account());
    assert!(permissions.has_permission());
}

#[tokio::test]
async fn sessions_do_not_see_each_others_state() {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let alpha = SessionAccountProvider::new("alpha", store.clone());
    alpha.create_session_account().await.expect("create");

    let beta = SessionAccountProvider::new("beta", store);
    assert!(beta.load().await.expect("load").is_none());
    assert_eq!(beta.session(), "beta");
}

#[tokio::test]
async fn clearing_publishes_absence() {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let sessions = SessionAccountProvider::new("alpha", store.clone());
    let permissions = PermissionProvider::new("alpha", store.clone());
    let account = sessions.create_session_account().await.expect("create");
    permissions
        .save_permission(sample_permission_for(account.address()))
        .await
        .expect("save");

    let mut permission_rx = permissions.subscribe();
    let _ = permission_rx.borrow_and_update();
    permissions.remove_permission().await.expect("remove");
    assert!(permission_rx.has_changed().expect("sender alive"));
    assert!(permission_rx.borrow_and_update().is_none());

    sessions.clear().await.expect("clear");
    assert!(sessions.session_account().is_none());
    assert!(store
        .load_session_account("alpha")
        .await
        .expect("load")
        .is_none());
}

#[tokio::test]
async fn corrupt_stored_account_surfaces_as_error() {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let mut stored = SessionAccount::generate().to_stored();
    stored.address = shared::domain::Address([9; 20]);
    store
        .save_session_account("alpha", &stored)
        .await
        .expect("seed");

    let provider = SessionAccountProvider::new("alpha", store);
    let err = provider.load().await.expect_err("mismatch");
    assert!(matches!(err, FlowError::SessionAccount(_)));
    assert!(!provider.has_session_account());
}
