//! Runtime bridge between the UI command queue and the async client.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    thread,
};

use client_core::{
    controller::PendingAction,
    orchestrator::{ActionOutcome, TxProgress},
    AppContext,
};
use crossbeam_channel::{Receiver, Sender};
use shared::error::TxError;
use tokio::task::JoinHandle;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{PageKey, UiError, UiErrorContext, UiEvent};

/// Hash and explorer link of the last transaction an action submitted.
type SubmittedTx = Arc<Mutex<Option<(String, String)>>>;

struct RunningAction {
    handle: JoinHandle<()>,
    submitted: SubmittedTx,
}

/// One running action per page, so a cancel can find and abort it.
#[derive(Default)]
pub(crate) struct RunningActions {
    actions: HashMap<PageKey, RunningAction>,
}

impl RunningActions {
    fn insert(&mut self, page: PageKey, handle: JoinHandle<()>, submitted: SubmittedTx) {
        self.actions.retain(|_, action| !action.handle.is_finished());
        if let Some(previous) = self.actions.insert(page, RunningAction { handle, submitted }) {
            tracing::warn!(?page, "replacing a running action");
            previous.handle.abort();
        }
    }

    /// Aborts the page's action. `None` when nothing was running or it already finished.
    pub(crate) fn cancel(&mut self, page: PageKey) -> Option<TxError> {
        let action = self.actions.remove(&page)?;
        if action.handle.is_finished() {
            return None;
        }
        action.handle.abort();
        let submitted = action
            .submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let (tx_hash, explorer_url) = submitted.unzip();
        Some(TxError::Cancelled {
            tx_hash,
            explorer_url,
        })
    }

    fn start(
        &mut self,
        page: PageKey,
        pending: PendingAction,
        ctx: AppContext,
        ui_tx: Sender<UiEvent>,
    ) {
        let submitted = SubmittedTx::default();
        let seen = Arc::clone(&submitted);
        let progress_tx = ui_tx.clone();
        let progress = Arc::new(move |progress: TxProgress| {
            if let TxProgress::Submitted {
                tx_hash,
                explorer_url,
                ..
            } = &progress
            {
                *seen.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some((tx_hash.to_string(), explorer_url.clone()));
            }
            let _ = progress_tx.try_send(UiEvent::Progress { page, progress });
        });

        let label = pending.plan.label.clone();
        let handle = tokio::spawn(async move {
            let result = pending.run(ctx, progress).await;
            match &result {
                Ok(outcome) => tracing::info!(?page, action = %label, steps = outcome.steps.len(), "action confirmed"),
                Err(err) => tracing::warn!(?page, action = %label, error = %err, "action failed"),
            }
            report_finished(&ui_tx, page, result);
        });
        self.insert(page, handle, submitted);
    }
}

/// Waits for queue space: the page stays locked until its result arrives, unlike progress ticks.
fn report_finished(ui_tx: &Sender<UiEvent>, page: PageKey, result: Result<ActionOutcome, TxError>) {
    if ui_tx.send(UiEvent::ActionFinished { page, result }).is_err() {
        tracing::error!(?page, "ui event queue closed; action result dropped");
    }
}

pub fn launch(ctx: AppContext, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));
            let mut running = RunningActions::default();

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Connect => {
                        if let Err(err) = ctx.session.connect().await {
                            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_tx(
                                UiErrorContext::Connect,
                                &err,
                            )));
                        }
                        let _ = ui_tx.try_send(UiEvent::SessionChanged(ctx.session.status()));
                    }
                    BackendCommand::Disconnect => {
                        ctx.session.disconnect();
                        let _ = ui_tx.try_send(UiEvent::SessionChanged(ctx.session.status()));
                    }
                    BackendCommand::SyncWallet => match ctx.session.sync().await {
                        Ok(status) => {
                            let _ = ui_tx.try_send(UiEvent::SessionChanged(status));
                        }
                        Err(err) => tracing::debug!(error = %err, "wallet sync failed"),
                    },
                    BackendCommand::Load { page, task } => {
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            let result = task.await;
                            let _ = ui_tx.try_send(UiEvent::Loaded { page, result });
                        });
                    }
                    BackendCommand::Preview { request, task } => {
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            let result = task.await;
                            let _ = ui_tx.try_send(UiEvent::PreviewLoaded { request, result });
                        });
                    }
                    BackendCommand::Execute { page, pending } => {
                        running.start(page, pending, ctx.clone(), ui_tx.clone());
                    }
                    BackendCommand::Cancel { page } => {
                        if let Some(err) = running.cancel(page) {
                            tracing::info!(?page, "stopped waiting on action");
                            report_finished(&ui_tx, page, Err(err));
                        }
                    }
                }
            }
            tracing::info!("ui command queue closed; backend worker exiting");
        });
    });
}
