//! Local JSON-RPC fake used by the client tests.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde_json::Value;
use shared::{
    domain::{Address, ChainId, HexBytes, Wei},
    error::RpcErrorObject,
    protocol::{
        GrantedPermission, JsonRpcResponse, NativeTokenStream, Permission, PermissionRequest,
        PermissionSigner,
    },
};
use tokio::{net::TcpListener, sync::Mutex};
use url::Url;

type Responder = Arc<dyn Fn(&str, &Value) -> Result<Value, RpcErrorObject> + Send + Sync>;

#[derive(Clone)]
struct FakeRpcState {
    responder: Responder,
    requests: Arc<Mutex<Vec<Value>>>,
}

pub(crate) struct FakeRpcServer {
    pub url: Url,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl FakeRpcServer {
    pub(crate) async fn spawn<F>(responder: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Value, RpcErrorObject> + Send + Sync + 'static,
    {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = FakeRpcState {
            responder: Arc::new(responder),
            requests: requests.clone(),
        };
        let app = Router::new()
            .route("/", post(handle_rpc))
            .with_state(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: format!("http://{addr}/").parse().expect("url"),
            requests,
        }
    }

    pub(crate) async fn requests(&self) -> Vec<Value> {
        self.requests.lock().await.clone()
    }

    pub(crate) async fn methods(&self) -> Vec<String> {
        self.requests()
            .await
            .iter()
            .map(|request| request["method"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

async fn handle_rpc(
    State(state): State<FakeRpcState>,
    Json(request): Json<Value>,
) -> Json<JsonRpcResponse<Value>> {
    let id = Some(request["id"].clone());
    let method = request["method"].as_str().unwrap_or_default().to_string();
    state.requests.lock().await.push(request.clone());

    Json(match (state.responder)(&method, &request["params"]) {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => JsonRpcResponse::failure(id, error),
    })
}

/// Granted stream valid from 2023-11-14T22:13:20Z for one day.
pub(crate) fn sample_permission_for(signer: Address) -> GrantedPermission {
    GrantedPermission {
        request: PermissionRequest {
            chain_id: ChainId::SEPOLIA,
            expiry: 1_700_086_400,
            signer: PermissionSigner::Account { address: signer },
            permission: Permission::NativeTokenStream(NativeTokenStream {
                initial_amount: Wei(1),
                amount_per_second: Wei(1),
                start_time: 1_700_000_000,
                max_amount: Wei(10),
                justification: "Payment for a subscription service".to_string(),
            }),
        },
        context: HexBytes(vec![0x01, 0x02]),
        account_meta: None,
        signer_meta: None,
    }
}
