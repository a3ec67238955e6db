//! Backend commands queued from UI to backend worker.

use client_core::controller::{vault::PreviewRequest, PendingAction};
use futures::future::BoxFuture;
use shared::{error::TxError, units::TokenAmount};

use crate::controller::events::{PageKey, PageSnapshot};

pub type LoadTask = BoxFuture<'static, Result<PageSnapshot, TxError>>;
pub type PreviewTask = BoxFuture<'static, Result<TokenAmount, TxError>>;

pub enum BackendCommand {
    Connect,
    Disconnect,
    /// Re-reads the wallet's account and chain.
    SyncWallet,
    Load {
        page: PageKey,
        task: LoadTask,
    },
    Execute {
        page: PageKey,
        pending: PendingAction,
    },
    Preview {
        request: PreviewRequest,
        task: PreviewTask,
    },
    /// Stops waiting on the page's running action. Already-submitted transactions stay submitted.
    Cancel {
        page: PageKey,
    },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Connect => "connect",
            BackendCommand::Disconnect => "disconnect",
            BackendCommand::SyncWallet => "sync_wallet",
            BackendCommand::Load { .. } => "load",
            BackendCommand::Execute { .. } => "execute",
            BackendCommand::Preview { .. } => "preview",
            BackendCommand::Cancel { .. } => "cancel",
        }
    }
}
