//! Client side of the ERC-7715 session-account flow: providers for the two
//! pieces of session state, the step controller that sequences the flow, and
//! JSON-RPC adapters for the wallet, the bundler and the chain.

pub mod chain;
mod client;
pub mod error;
pub mod grant;
pub mod providers;
pub mod redeem;
pub mod rpc;
pub mod session_account;
pub mod step_controller;
pub mod wallet;

pub use chain::PublicClient;
pub use client::GatorClient;
pub use error::FlowError;
pub use grant::{native_token_stream_request, PermissionGranter, StreamPolicy};
pub use providers::{PermissionProvider, PermissionRecord, SessionAccountProvider};
pub use redeem::{
    default_redemption_call, BundlerRedeemer, MissingRedeemer, RedemptionReceipt, Redeemer,
};
pub use rpc::{JsonRpcClient, RpcError};
pub use session_account::{SessionAccount, SessionAccountError};
pub use step_controller::{evaluate_step, InputsClosed, StepController, StepWatcher};
pub use wallet::{
    connect_action, current_connection, ensure_connected, ConnectAction, Erc7715Wallet,
    WalletClient, WalletConnection,
};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
