use futures::future::BoxFuture;
use shared::{
    domain::{ContractName, Delegation, TokenId},
    error::TxError,
    units::TokenAmount,
};

use super::{AmountField, PageController, Planned};
use crate::contracts::IDelegationManager;
use crate::orchestrator::{ActionPlan, InFlight};
use crate::{reads, AppContext};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestakingTab {
    #[default]
    Delegate,
    Undelegate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestakingAction {
    Delegate,
    Undelegate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestakingSnapshot {
    pub balance: TokenAmount,
    pub delegation: Delegation,
}

/// Delegate collateral tokens to the protocol's operators, or take them back.
#[derive(Debug, Clone, Default)]
pub struct RestakingPage {
    pub tab: RestakingTab,
    pub amount: AmountField,
    pub snapshot: Option<RestakingSnapshot>,
    in_flight: InFlight,
}

impl RestakingPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the amount with the wallet balance or the delegated amount, depending on the tab.
    pub fn fill_max(&mut self) -> bool {
        let Some(snapshot) = &self.snapshot else {
            return false;
        };
        let max = match self.tab {
            RestakingTab::Delegate => snapshot.balance.display(),
            RestakingTab::Undelegate => snapshot.delegation.amount.display(),
        };
        self.amount.set(&max)
    }

    pub fn action_for_tab(&self) -> RestakingAction {
        match self.tab {
            RestakingTab::Delegate => RestakingAction::Delegate,
            RestakingTab::Undelegate => RestakingAction::Undelegate,
        }
    }
}

impl PageController for RestakingPage {
    type Action = RestakingAction;
    type Snapshot = RestakingSnapshot;

    fn title(&self) -> &'static str {
        "Restaking"
    }

    fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    fn plan(&self, ctx: &AppContext, action: &RestakingAction) -> Result<Planned, TxError> {
        let amount = ctx.parse_amount(TokenId::Collateral, self.amount.value())?;
        let symbol = &ctx.registry.token(TokenId::Collateral).symbol;
        let plan = match action {
            RestakingAction::Delegate => ActionPlan::new(
                format!("delegate {symbol}"),
                format!("Successfully delegated {} {symbol}", amount.display()),
            )
            .step(
                ContractName::DelegationManager,
                &IDelegationManager::addDelegationCall { amount: amount.raw },
            ),
            RestakingAction::Undelegate => ActionPlan::new(
                format!("undelegate {symbol}"),
                format!("Successfully undelegated {} {symbol}", amount.display()),
            )
            .step(
                ContractName::DelegationManager,
                &IDelegationManager::removeDelegationCall { amount: amount.raw },
            ),
        };
        Ok(Planned::OnChain(plan))
    }

    fn loader(&self, ctx: &AppContext) -> BoxFuture<'static, Result<RestakingSnapshot, TxError>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let owner = ctx.session.account().ok_or(TxError::NotConnected)?;
            Ok(RestakingSnapshot {
                balance: reads::token_balance(&ctx, TokenId::Collateral, owner).await?,
                delegation: reads::delegated_amount(&ctx, owner).await?,
            })
        })
    }

    fn apply(&mut self, snapshot: RestakingSnapshot) {
        self.snapshot = Some(snapshot);
    }

    fn clear_form(&mut self, _action: &RestakingAction) {
        self.amount.clear();
    }
}
