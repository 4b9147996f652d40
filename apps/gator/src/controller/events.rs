//! Flow events and error modeling for the CLI controller.

use client_core::{FlowError, RedemptionReceipt, RpcError, WalletConnection};
use shared::{domain::Address, error::ErrorCode};

#[derive(Debug)]
pub enum FlowEvent {
    Connected(WalletConnection),
    AccountCreated(Address),
    PermissionGranted { expiry: u64 },
    Redeemed(RedemptionReceipt),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Rejected,
    Transport,
    Chain,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    Startup,
    Load,
    Connect,
    CreateAccount,
    Grant,
    Redeem,
    Reset,
}

impl UiErrorContext {
    pub fn label(self) -> &'static str {
        match self {
            UiErrorContext::Startup => "startup",
            UiErrorContext::Load => "loading session",
            UiErrorContext::Connect => "connecting wallet",
            UiErrorContext::CreateAccount => "creating session account",
            UiErrorContext::Grant => "granting permissions",
            UiErrorContext::Redeem => "redeeming permission",
            UiErrorContext::Reset => "resetting session",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_flow_error(context: UiErrorContext, err: &FlowError) -> Self {
        let category = match err {
            FlowError::Rpc(rpc) => classify_rpc(rpc),
            FlowError::WalletNotConnected => UiErrorCategory::Rejected,
            FlowError::SessionAccountMissing
            | FlowError::PermissionMissing
            | FlowError::PermissionExpired { .. }
            | FlowError::Busy
            | FlowError::NothingGranted
            | FlowError::SessionAccount(_) => UiErrorCategory::Validation,
            FlowError::Store { .. } => UiErrorCategory::Unknown,
        };
        Self {
            category,
            context,
            message: err.to_string(),
        }
    }

    /// Best-effort classification for errors that only survive as text.
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let category = if lower.contains("rejected") || lower.contains("denied") {
            UiErrorCategory::Rejected
        } else if lower.contains("chain") {
            UiErrorCategory::Chain
        } else if lower.contains("invalid")
            || lower.contains("missing")
            || lower.contains("malformed")
            || lower.contains("not a valid url")
        {
            UiErrorCategory::Validation
        } else if lower.contains("connection")
            || lower.contains("timed out")
            || lower.contains("transport")
            || lower.contains("unreachable")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Worth offering the same action again without changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category,
            UiErrorCategory::Rejected | UiErrorCategory::Transport | UiErrorCategory::Chain
        )
    }

    pub fn hint(&self) -> &'static str {
        match self.category {
            UiErrorCategory::Rejected => "The request was declined in the wallet; approve it to continue.",
            UiErrorCategory::Transport => "Endpoint unreachable; check the configured URLs and retry.",
            UiErrorCategory::Chain => "Wallet is on an unsupported or disconnected chain; switch networks and retry.",
            UiErrorCategory::Validation => "Flow state does not allow this action yet; check `hello-gator status`.",
            UiErrorCategory::Unknown => "Unexpected failure; rerun with RUST_LOG=debug for details.",
        }
    }
}

impl std::fmt::Display for UiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error {}: {}", self.context.label(), self.message)
    }
}

fn classify_rpc(err: &RpcError) -> UiErrorCategory {
    match err {
        RpcError::Transport { .. } | RpcError::Http { .. } => UiErrorCategory::Transport,
        RpcError::Unconfigured { .. } => UiErrorCategory::Validation,
        RpcError::Decode { .. } => UiErrorCategory::Unknown,
        RpcError::Rpc { code, .. } => match ErrorCode::from_code(*code) {
            ErrorCode::UserRejected | ErrorCode::Unauthorized => UiErrorCategory::Rejected,
            ErrorCode::Disconnected
            | ErrorCode::ChainDisconnected
            | ErrorCode::UnrecognizedChain => UiErrorCategory::Chain,
            ErrorCode::UnsupportedMethod | ErrorCode::InvalidParams => UiErrorCategory::Validation,
            ErrorCode::Internal | ErrorCode::Other => UiErrorCategory::Unknown,
        },
    }
}

#[cfg(test)]
#[path = "../tests/events_tests.rs"]
mod tests;
