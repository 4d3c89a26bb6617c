use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_rpc_client_api::request::RpcError;
use solana_sdk::{signature::Signature, transaction::TransactionError};
use thiserror::Error;

/// Network-level failures, classified structurally wherever the RPC layer
/// gives us structure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    /// The anchor's last valid block height has passed
    #[error("Signature {signature} has expired: block height exceeded {last_valid_block_height}")]
    BlockheightExceeded {
        signature: Signature,
        last_valid_block_height: u64,
    },

    /// The node no longer (or not yet) knows the anchor's blockhash
    #[error("Blockhash not found (anchor expired)")]
    BlockhashNotFound,

    /// Confirmation ended without the signature reaching the commitment
    #[error("Transaction {signature} was not confirmed")]
    NotConfirmed { signature: Signature },

    #[error("Timeout after {timeout_ms}ms during {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Transport-level errors (network, connection)
    #[error("Transport error: {0}")]
    Transport(String),

    /// RPC response errors (from the RPC server)
    #[error("RPC response error: {message} (code: {code:?})")]
    RpcResponse { message: String, code: Option<i64> },

    #[error("Rate limit exceeded")]
    RateLimited,

    /// The node refused the transaction before it could land (preflight)
    #[error("Transaction rejected: {0}")]
    Rejected(TransactionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// The anchor is no longer valid; a re-anchored retry may succeed
    pub fn is_expiry(&self) -> bool {
        matches!(self, Self::BlockheightExceeded { .. } | Self::BlockhashNotFound)
    }

    /// Transient failures where retrying the same operation might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(_) => true,
            Self::RateLimited => true,
            Self::BlockhashNotFound => true,
            Self::BlockheightExceeded { .. } => true,
            Self::NotConfirmed { .. } => false,
            Self::Rejected(_) => false,
            Self::Internal(_) => false,
            Self::RpcResponse { code, .. } => matches!(code, Some(c) if (500..600).contains(c)),
        }
    }

    /// Classify a `solana_client` error.
    ///
    /// Structured fields (transaction error, error kind, RPC code) are used
    /// first; message matching only covers errors that carry no structure.
    pub fn from_client_error(err: ClientError) -> Self {
        if let Some(tx_err) = err.get_transaction_error() {
            return match tx_err {
                TransactionError::BlockhashNotFound => Self::BlockhashNotFound,
                other => Self::Rejected(other),
            };
        }

        match err.kind() {
            ClientErrorKind::Reqwest(e) if e.is_timeout() => Self::Timeout {
                operation: "rpc request".to_string(),
                timeout_ms: 0,
            },
            ClientErrorKind::Reqwest(e) if e.status().map(|s| s.as_u16()) == Some(429) => {
                Self::RateLimited
            }
            ClientErrorKind::Reqwest(e) => Self::Transport(e.to_string()),
            ClientErrorKind::Io(e) => Self::Transport(e.to_string()),
            ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
                Self::RpcResponse {
                    message: message.clone(),
                    code: Some(*code),
                }
            }
            _ => Self::from_message(&err.to_string()),
        }
    }

    /// Fallback classification for unstructured error text
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("blockhash not found") || lower.contains("expired") {
            Self::BlockhashNotFound
        } else if lower.contains("rate limit") || lower.contains("too many requests") {
            Self::RateLimited
        } else if lower.contains("timeout") || lower.contains("timed out") {
            Self::Timeout {
                operation: "rpc request".to_string(),
                timeout_ms: 0,
            }
        } else if lower.contains("connection") {
            Self::Transport(message.to_string())
        } else {
            Self::RpcResponse {
                message: message.to_string(),
                code: None,
            }
        }
    }
}

impl From<ClientError> for LedgerError {
    fn from(err: ClientError) -> Self {
        Self::from_client_error(err)
    }
}
