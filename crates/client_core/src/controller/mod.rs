//! Page controllers: form state plus the reads and writes behind one workflow each.
//!
//! Every page goes through the same drivers: [`begin`] validates and takes the page's
//! in-flight ticket, the returned [`PendingAction`] runs on the async side, and
//! [`finish`] turns the result into a notification. [`submit`] chains all three with a
//! refresh for callers that can await in place.

use std::{fmt, sync::Arc};

use futures::future::BoxFuture;
use shared::{
    domain::ChainId,
    error::TxError,
    notify::{NotificationKind, Notifier},
    units::is_amount_input,
};
use tracing::{info, warn};

use crate::orchestrator::{ActionOutcome, ActionPlan, InFlight, InFlightTicket, TxProgress};
use crate::AppContext;

pub mod admin;
pub mod faucet;
pub mod loans;
pub mod restaking;
pub mod rwa;
pub mod stable;
pub mod vault;

/// What an action needs to do once validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Planned {
    OnChain(ActionPlan),
    /// Handled entirely in page state (mock data sources).
    Local,
}

pub trait PageController {
    type Action: Clone + fmt::Debug + Send + 'static;
    type Snapshot: Send + 'static;

    fn title(&self) -> &'static str;

    fn in_flight(&self) -> &InFlight;

    /// Validates the form for `action` and builds its writes. Must not touch the network.
    fn plan(&self, ctx: &AppContext, action: &Self::Action) -> Result<Planned, TxError>;

    fn apply_local(&mut self, action: &Self::Action) -> Result<String, TxError> {
        Err(TxError::Unsupported(format!(
            "{action:?} has no local handler on {}",
            self.title()
        )))
    }

    /// The page's reads, detached from `self` so they can run on another task.
    fn loader(&self, ctx: &AppContext) -> BoxFuture<'static, Result<Self::Snapshot, TxError>>;

    fn apply(&mut self, snapshot: Self::Snapshot);

    fn clear_form(&mut self, action: &Self::Action);
}

/// A validated on-chain action holding its page's in-flight ticket.
#[derive(Debug)]
pub struct PendingAction {
    pub plan: ActionPlan,
    ticket: InFlightTicket,
}

impl PendingAction {
    pub async fn run(
        self,
        ctx: AppContext,
        progress: Arc<dyn Fn(TxProgress) + Send + Sync>,
    ) -> Result<ActionOutcome, TxError> {
        let result = ctx.execute(&self.ticket, &self.plan, progress.as_ref()).await;
        drop(self.ticket);
        result
    }

    pub fn into_future(
        self,
        ctx: AppContext,
        progress: Arc<dyn Fn(TxProgress) + Send + Sync>,
    ) -> BoxFuture<'static, Result<ActionOutcome, TxError>> {
        Box::pin(self.run(ctx, progress))
    }
}

#[derive(Debug)]
pub enum Begun {
    OnChain(PendingAction),
    Local(ActionOutcome),
}

/// Validates `action` and claims the page's in-flight flag. Local actions complete here.
pub fn begin<P: PageController>(
    page: &mut P,
    ctx: &AppContext,
    action: &P::Action,
) -> Result<Begun, TxError> {
    if page.in_flight().is_active() {
        return Err(TxError::Busy);
    }
    match page.plan(ctx, action)? {
        Planned::OnChain(plan) => {
            let ticket = page.in_flight().try_begin().ok_or(TxError::Busy)?;
            Ok(Begun::OnChain(PendingAction { plan, ticket }))
        }
        Planned::Local => {
            let message = page.apply_local(action)?;
            page.clear_form(action);
            info!(page = page.title(), action = ?action, "applied local action");
            Ok(Begun::Local(ActionOutcome {
                label: format!("{action:?}"),
                message,
                steps: Vec::new(),
            }))
        }
    }
}

pub fn notify_error(notifier: &mut Notifier, err: &TxError) {
    let kind = match err {
        TxError::ConfirmationTimeout { .. } | TxError::Cancelled { .. } => {
            NotificationKind::Pending
        }
        _ => NotificationKind::Error,
    };
    notifier.show(err.user_message(), kind);
}

/// Clears the form and notifies on success; keeps the form and notifies on failure.
pub fn finish<P: PageController>(
    page: &mut P,
    notifier: &mut Notifier,
    action: &P::Action,
    result: &Result<ActionOutcome, TxError>,
) {
    match result {
        Ok(outcome) => {
            page.clear_form(action);
            notifier.show(outcome.message.clone(), NotificationKind::Success);
        }
        Err(err) => {
            warn!(page = page.title(), action = ?action, error = %err, "action failed");
            notify_error(notifier, err);
        }
    }
}

pub async fn refresh<P: PageController>(page: &mut P, ctx: &AppContext) -> Result<(), TxError> {
    let snapshot = page.loader(ctx).await?;
    page.apply(snapshot);
    Ok(())
}

/// Runs `action` to completion: validate, execute, re-read the page, then notify.
pub async fn submit<P: PageController>(
    page: &mut P,
    ctx: &AppContext,
    notifier: &mut Notifier,
    action: P::Action,
    progress: Arc<dyn Fn(TxProgress) + Send + Sync>,
) -> Result<ActionOutcome, TxError> {
    let pending = match begin(page, ctx, &action) {
        Ok(Begun::OnChain(pending)) => pending,
        Ok(Begun::Local(outcome)) => {
            notifier.show(outcome.message.clone(), NotificationKind::Success);
            return Ok(outcome);
        }
        Err(err) => {
            notify_error(notifier, &err);
            return Err(err);
        }
    };

    let result = pending.run(ctx.clone(), progress).await;
    if result.is_ok() {
        if let Err(err) = refresh(page, ctx).await {
            warn!(page = page.title(), error = %err, "refresh after action failed");
        }
    }
    finish(page, notifier, &action, &result);
    result
}

/// Whether a page can show its forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    ConnectWallet,
    WrongChain { expected: ChainId, actual: ChainId },
    Ready,
}

pub fn availability(ctx: &AppContext) -> Availability {
    let status = ctx.session.status();
    match (status.account, status.wallet_chain) {
        (None, _) | (_, None) => Availability::ConnectWallet,
        (Some(_), Some(actual)) if actual != ctx.chain().id => Availability::WrongChain {
            expected: ctx.chain().id,
            actual,
        },
        _ => Availability::Ready,
    }
}

/// Text input restricted to partial decimal numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmountField {
    value: String,
}

impl AmountField {
    /// Replaces the value if `input` passes the keystroke filter.
    pub fn set(&mut self, input: &str) -> bool {
        if !is_amount_input(input) {
            return false;
        }
        self.value = input.to_string();
        true
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }
}
