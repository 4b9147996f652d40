//! Read-only access to the chain RPC.

use serde_json::json;
use shared::domain::{Address, Wei};
use url::Url;

use crate::rpc::{JsonRpcClient, RpcError};

pub struct PublicClient {
    rpc: JsonRpcClient,
}

impl PublicClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            rpc: JsonRpcClient::new(endpoint),
        }
    }

    pub async fn balance(&self, address: Address) -> Result<Wei, RpcError> {
        self.rpc
            .request("eth_getBalance", json!([address, "latest"]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeRpcServer;
    use shared::error::RpcErrorObject;

    #[tokio::test]
    async fn balance_queries_latest_block() {
        let server = FakeRpcServer::spawn(|method, _| match method {
            "eth_getBalance" => Ok(json!("0x2386f26fc10000")),
            other => Err(RpcErrorObject::new(-32601, format!("unknown {other}"))),
        })
        .await;
        let client = PublicClient::new(server.url.clone());

        let balance = client.balance(Address([0x11; 20])).await.expect("balance");
        assert_eq!(balance, Wei(10_000_000_000_000_000));

        let sent = server.requests().await;
        assert_eq!(
            sent[0]["params"],
            json!(["0x1111111111111111111111111111111111111111", "latest"])
        );
    }
}
