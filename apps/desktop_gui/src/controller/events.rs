//! UI/backend events and error modeling for the desktop GUI controller.

use client_core::{
    controller::{
        admin::AdminSnapshot, loans::LoanSnapshot, restaking::RestakingSnapshot,
        stable::StableBalances, vault::PreviewRequest,
    },
    orchestrator::{ActionOutcome, TxProgress},
    session::SessionStatus,
};
use shared::{
    domain::{DataSource, VaultPosition},
    error::{ErrorCode, TxError},
    units::TokenAmount,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKey {
    UsdcFaucet,
    LstFaucet,
    Mint,
    Vault,
    Restaking,
    Loans,
    Admin,
    Rwa,
}

impl PageKey {
    pub const ALL: [PageKey; 8] = [
        PageKey::UsdcFaucet,
        PageKey::LstFaucet,
        PageKey::Mint,
        PageKey::Vault,
        PageKey::Restaking,
        PageKey::Loans,
        PageKey::Admin,
        PageKey::Rwa,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PageKey::UsdcFaucet => "USDC Faucet",
            PageKey::LstFaucet => "LST Faucet",
            PageKey::Mint => "Mint PUSD",
            PageKey::Vault => "sPUSD Vault",
            PageKey::Restaking => "Restaking",
            PageKey::Loans => "Operator Dashboard",
            PageKey::Admin => "Cap Admin",
            PageKey::Rwa => "RWA Portfolio",
        }
    }

    /// Pages that read or write through the connected wallet. Mock admin and RWA data stay local.
    pub fn needs_wallet(self, data_source: DataSource) -> bool {
        match self {
            PageKey::Admin | PageKey::Rwa => data_source == DataSource::Live,
            _ => true,
        }
    }
}

pub enum PageSnapshot {
    Balance(TokenAmount),
    Stable(StableBalances),
    Vault(VaultPosition),
    Restaking(RestakingSnapshot),
    Loans(Box<LoanSnapshot>),
    Admin(AdminSnapshot),
}

pub enum UiEvent {
    Info(String),
    Error(UiError),
    SessionChanged(SessionStatus),
    Progress {
        page: PageKey,
        progress: TxProgress,
    },
    ActionFinished {
        page: PageKey,
        result: Result<ActionOutcome, TxError>,
    },
    Loaded {
        page: PageKey,
        result: Result<PageSnapshot, TxError>,
    },
    PreviewLoaded {
        request: PreviewRequest,
        result: Result<TokenAmount, TxError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Wallet,
    Chain,
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Connect,
    Load,
    Preview,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_tx(context: UiErrorContext, err: &TxError) -> Self {
        let category = match err.code() {
            ErrorCode::NotConnected | ErrorCode::UserRejected => UiErrorCategory::Wallet,
            ErrorCode::WrongChain
            | ErrorCode::UnsupportedChain
            | ErrorCode::ContractNotDeployed => UiErrorCategory::Chain,
            ErrorCode::Transport | ErrorCode::Submission => UiErrorCategory::Transport,
            ErrorCode::Validation | ErrorCode::SimulationReverted => UiErrorCategory::Validation,
            _ => UiErrorCategory::Unknown,
        };
        Self {
            category,
            context,
            message: err.user_message(),
        }
    }

    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let category = if lower.contains("wallet") || lower.contains("rejected") {
            UiErrorCategory::Wallet
        } else if lower.contains("chain") {
            UiErrorCategory::Chain
        } else if lower.contains("timeout")
            || lower.contains("connection")
            || lower.contains("network")
            || lower.contains("disconnect")
            || lower.contains("runtime")
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

    /// Whether reconnecting the wallet is the likely fix.
    pub fn needs_wallet(&self) -> bool {
        self.category == UiErrorCategory::Wallet
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
}
