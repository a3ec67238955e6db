use std::sync::{Arc, PoisonError, RwLock};

use alloy::primitives::Address;
use serde::Serialize;
use shared::{chain::ChainProfile, domain::ChainId, error::TxError};
use tracing::{info, warn};

use crate::clients::{ReadClient, WalletClient};
use crate::rpc::RpcError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub account: Option<Address>,
    pub wallet_chain: Option<ChainId>,
    pub expected_chain: Option<ChainId>,
}

impl SessionStatus {
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    pub fn chain_matches(&self) -> bool {
        self.wallet_chain.is_some() && self.wallet_chain == self.expected_chain
    }
}

#[derive(Debug, Default)]
struct SessionState {
    account: Option<Address>,
    wallet_chain: Option<ChainId>,
}

/// Everything a write needs, handed out only when the wallet is ready.
#[derive(Clone)]
pub struct ReadyWallet {
    pub account: Address,
    pub chain: ChainProfile,
    pub reader: Arc<dyn ReadClient>,
    pub writer: Arc<dyn WalletClient>,
}

/// Wallet and chain binding shared by every page. Clones observe the same connection.
#[derive(Clone)]
pub struct WalletSession {
    chain: ChainProfile,
    reader: Arc<dyn ReadClient>,
    wallet: Arc<dyn WalletClient>,
    state: Arc<RwLock<SessionState>>,
}

pub(crate) fn wallet_error(err: RpcError) -> TxError {
    if err.is_user_rejection() {
        return TxError::UserRejected;
    }
    TxError::Transport(err.to_string())
}

impl WalletSession {
    pub fn new(chain: ChainProfile, reader: Arc<dyn ReadClient>, wallet: Arc<dyn WalletClient>) -> Self {
        Self {
            chain,
            reader,
            wallet,
            state: Arc::new(RwLock::new(SessionState::default())),
        }
    }

    pub fn chain(&self) -> &ChainProfile {
        &self.chain
    }

    /// Requests accounts and records the wallet's chain. A chain mismatch is recorded, not rejected.
    pub async fn connect(&self) -> Result<SessionStatus, TxError> {
        let accounts = self
            .wallet
            .request_accounts()
            .await
            .map_err(wallet_error)?;
        let account = accounts.first().copied().ok_or(TxError::NotConnected)?;
        let wallet_chain = self.wallet.chain_id().await.map_err(wallet_error)?;

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.account = Some(account);
            state.wallet_chain = Some(wallet_chain);
        }

        if wallet_chain != self.chain.id {
            warn!(
                account = %account,
                wallet_chain = %wallet_chain,
                expected_chain = %self.chain.id,
                "wallet connected on a different chain"
            );
        } else {
            info!(account = %account, chain_id = %wallet_chain, "wallet connected");
        }
        Ok(self.status())
    }

    /// Picks up account or chain changes made in the wallet since `connect`.
    pub async fn sync(&self) -> Result<SessionStatus, TxError> {
        if self.account().is_none() {
            return Ok(self.status());
        }
        let accounts = self.wallet.accounts().await.map_err(wallet_error)?;
        let wallet_chain = self.wallet.chain_id().await.map_err(wallet_error)?;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.account = accounts.first().copied();
        state.wallet_chain = state.account.map(|_| wallet_chain);
        drop(state);
        Ok(self.status())
    }

    pub fn disconnect(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = SessionState::default();
        info!("wallet disconnected");
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        SessionStatus {
            account: state.account,
            wallet_chain: state.wallet_chain,
            expected_chain: Some(self.chain.id),
        }
    }

    pub fn account(&self) -> Option<Address> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .account
    }

    pub fn reader(&self) -> Arc<dyn ReadClient> {
        Arc::clone(&self.reader)
    }

    /// The write client, only once an account is connected.
    pub fn writer(&self) -> Option<Arc<dyn WalletClient>> {
        self.account().map(|_| Arc::clone(&self.wallet))
    }

    pub fn ready(&self) -> Result<ReadyWallet, TxError> {
        let status = self.status();
        let account = status.account.ok_or(TxError::NotConnected)?;
        match status.wallet_chain {
            Some(actual) if actual == self.chain.id => {}
            Some(actual) => {
                return Err(TxError::WrongChain {
                    expected: self.chain.id,
                    actual,
                })
            }
            None => return Err(TxError::NotConnected),
        }
        Ok(ReadyWallet {
            account,
            chain: self.chain.clone(),
            reader: self.reader(),
            writer: Arc::clone(&self.wallet),
        })
    }
}
