use thiserror::Error;

use crate::{rpc::RpcError, session_account::SessionAccountError};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("session account not found")]
    SessionAccountMissing,
    #[error("no permission has been granted for this session")]
    PermissionMissing,
    #[error("permission expired at unix time {expiry}")]
    PermissionExpired { expiry: u64 },
    #[error("a permission grant is already in progress")]
    Busy,
    #[error("wallet returned no granted permissions")]
    NothingGranted,
    #[error("wallet did not expose any account")]
    WalletNotConnected,
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    SessionAccount(#[from] SessionAccountError),
    #[error("session store failure: {source}")]
    Store { source: anyhow::Error },
}

impl FlowError {
    pub(crate) fn store(source: anyhow::Error) -> Self {
        FlowError::Store { source }
    }
}
