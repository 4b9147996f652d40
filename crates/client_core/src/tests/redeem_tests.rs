use super::*;
use crate::test_support::{sample_permission_for, FakeRpcServer};
use serde_json::json;
use shared::error::RpcErrorObject;
use std::sync::Arc;
use storage::{MemorySessionStore, SessionStore};

async fn providers_with_state(
    with_permission: bool,
) -> (SessionAccountProvider, PermissionProvider, SessionAccount) {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let sessions = SessionAccountProvider::new("test", store.clone());
    let permissions = PermissionProvider::new("test", store);
    let account = sessions.create_session_account().await.expect("account");
    if with_permission {
        permissions
            .save_permission(sample_permission_for(account.address()))
            .await
            .expect("permission");
    }
    (sessions, permissions, account)
}

fn before_expiry() -> DateTime<Utc> {
    "2023-11-14T22:13:20Z".parse().expect("timestamp")
}

#[tokio::test]
async fn submits_bundle_with_permission_context() {
    let server = FakeRpcServer::spawn(|method, _| match method {
        "wallet_sendCalls" => Ok(json!({ "id": "0xbundle" })),
        other => Err(RpcErrorObject::new(4200, format!("unsupported {other}"))),
    })
    .await;
    let redeemer = BundlerRedeemer::new(server.url.clone());
    let (sessions, permissions, account) = providers_with_state(true).await;

    let receipt = redeem_permission(&redeemer, &sessions, &permissions, Vec::new(), before_expiry())
        .await
        .expect("redeem");
    assert_eq!(receipt.bundle_id, "0xbundle");
    assert_eq!(receipt.from, account.address());
    assert_eq!(receipt.chain_id, ChainId::SEPOLIA);

    let sent = server.requests().await;
    let params = &sent[0]["params"][0];
    assert_eq!(params["version"], "1.0");
    assert_eq!(params["chainId"], "0xaa36a7");
    assert_eq!(params["from"], account.address().to_string());
    assert_eq!(params["calls"][0]["to"], account.address().to_string());
    assert_eq!(params["calls"][0]["value"], "0x1");
    assert_eq!(params["calls"][0]["data"], "0x");
    assert_eq!(params["capabilities"]["permissions"]["context"], "0x0102");
}

#[tokio::test]
async fn accepts_bare_string_bundle_ids() {
    let server = FakeRpcServer::spawn(|_, _| Ok(json!("0xabc"))).await;
    let redeemer = BundlerRedeemer::new(server.url.clone());
    let (sessions, permissions, account) = providers_with_state(true).await;
    let call = Call {
        to: Address([0x77; 20]),
        value: Wei(5),
        data: HexBytes(vec![0xab]),
    };

    let receipt = redeem_permission(
        &redeemer,
        &sessions,
        &permissions,
        vec![call],
        before_expiry(),
    )
    .await
    .expect("redeem");
    assert_eq!(receipt.bundle_id, "0xabc");
    assert_eq!(receipt.from, account.address());

    let sent = server.requests().await;
    assert_eq!(sent[0]["params"][0]["calls"][0]["value"], "0x5");
}

#[tokio::test]
async fn refuses_without_stored_permission() {
    let (sessions, permissions, _) = providers_with_state(false).await;
    let err = redeem_permission(
        &MissingRedeemer,
        &sessions,
        &permissions,
        Vec::new(),
        before_expiry(),
    )
    .await
    .expect_err("missing permission");
    assert!(matches!(err, FlowError::PermissionMissing));
}

#[tokio::test]
async fn refuses_expired_permission() {
    let (sessions, permissions, _) = providers_with_state(true).await;
    let after_expiry: DateTime<Utc> = "2030-01-01T00:00:00Z".parse().expect("timestamp");
    let err = redeem_permission(
        &MissingRedeemer,
        &sessions,
        &permissions,
        Vec::new(),
        after_expiry,
    )
    .await
    .expect_err("expired");
    assert!(matches!(err, FlowError::PermissionExpired { .. }));
}

#[tokio::test]
async fn missing_redeemer_reports_unconfigured_endpoint() {
    let (sessions, permissions, _) = providers_with_state(true).await;
    let err = redeem_permission(
        &MissingRedeemer,
        &sessions,
        &permissions,
        Vec::new(),
        before_expiry(),
    )
    .await
    .expect_err("no bundler");
    assert!(matches!(
        err,
        FlowError::Rpc(RpcError::Unconfigured { .. })
    ));
}
