use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ChainId;
use crate::units::UnitsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    NotConnected,
    WrongChain,
    UnsupportedChain,
    ContractNotDeployed,
    SimulationReverted,
    UserRejected,
    Submission,
    Reverted,
    ConfirmationTimeout,
    Cancelled,
    Transport,
    Busy,
    Unsupported,
}

/// Serializable form of a [`TxError`] for machine-readable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorReport {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Every way a user action can fail. None of these are fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("wallet is not connected")]
    NotConnected,
    #[error("wallet is on chain {actual}, expected chain {expected}")]
    WrongChain { expected: ChainId, actual: ChainId },
    #[error("chain {0} is not supported")]
    UnsupportedChain(u64),
    #[error("{contract} is not deployed on chain {chain_id}")]
    ContractNotDeployed { contract: String, chain_id: u64 },
    #[error("simulation reverted: {}", reason.as_deref().unwrap_or("no reason given"))]
    SimulationReverted { reason: Option<String> },
    #[error("signature request was rejected")]
    UserRejected,
    #[error("transaction submission failed: {0}")]
    Submission(String),
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },
    #[error("transaction {tx_hash} is still pending")]
    ConfirmationTimeout { tx_hash: String, explorer_url: String },
    #[error("stopped waiting for confirmation")]
    Cancelled {
        tx_hash: Option<String>,
        explorer_url: Option<String>,
    },
    #[error("network error: {0}")]
    Transport(String),
    #[error("another action is already in progress")]
    Busy,
    #[error("{0}")]
    Unsupported(String),
}

impl TxError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            TxError::Validation(_) => ErrorCode::Validation,
            TxError::NotConnected => ErrorCode::NotConnected,
            TxError::WrongChain { .. } => ErrorCode::WrongChain,
            TxError::UnsupportedChain(_) => ErrorCode::UnsupportedChain,
            TxError::ContractNotDeployed { .. } => ErrorCode::ContractNotDeployed,
            TxError::SimulationReverted { .. } => ErrorCode::SimulationReverted,
            TxError::UserRejected => ErrorCode::UserRejected,
            TxError::Submission(_) => ErrorCode::Submission,
            TxError::Reverted { .. } => ErrorCode::Reverted,
            TxError::ConfirmationTimeout { .. } => ErrorCode::ConfirmationTimeout,
            TxError::Cancelled { .. } => ErrorCode::Cancelled,
            TxError::Transport(_) => ErrorCode::Transport,
            TxError::Busy => ErrorCode::Busy,
            TxError::Unsupported(_) => ErrorCode::Unsupported,
        }
    }

    /// Text shown in the notification area. Prefers the most specific detail available.
    pub fn user_message(&self) -> String {
        match self {
            TxError::Validation(message) => message.clone(),
            TxError::NotConnected => "Connect your wallet to continue.".to_string(),
            TxError::WrongChain { expected, .. } => {
                format!("Switch your wallet to chain {expected} to continue.")
            }
            TxError::SimulationReverted {
                reason: Some(reason),
            } if !reason.trim().is_empty() => format!("Transaction would fail: {reason}"),
            TxError::SimulationReverted { .. } => {
                "Transaction would fail. Check your balance and try again.".to_string()
            }
            TxError::UserRejected => "You rejected the transaction in your wallet.".to_string(),
            TxError::Submission(_) | TxError::Transport(_) => {
                "Transaction failed. Please try again.".to_string()
            }
            TxError::Reverted { tx_hash } => format!("Transaction {tx_hash} reverted on-chain."),
            TxError::ConfirmationTimeout { explorer_url, .. } => {
                format!("Transaction pending; check the explorer: {explorer_url}")
            }
            TxError::Cancelled {
                explorer_url: Some(url),
                ..
            } => format!("Stopped waiting. The transaction may still be pending: {url}"),
            TxError::Cancelled { .. } => "Stopped waiting for the transaction.".to_string(),
            TxError::Busy => "Please wait for the current transaction to finish.".to_string(),
            other => other.to_string(),
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.code(), self.user_message())
    }
}

impl From<UnitsError> for TxError {
    fn from(value: UnitsError) -> Self {
        let message = match value {
            UnitsError::Empty => "Please enter an amount.".to_string(),
            other => format!("Please enter a valid amount ({other})."),
        };
        TxError::Validation(message)
    }
}
