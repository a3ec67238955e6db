use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use shared::{
    domain::{ContractName, Delegation, Loan, TokenId},
    error::TxError,
    units::{format_compact, parse_units, TokenAmount},
};

use super::{AmountField, PageController, Planned};
use crate::contracts::{ILoanManager, IStableToken};
use crate::orchestrator::{ActionPlan, InFlight};
use crate::{reads, AppContext};

/// Stable tokens minted to the operator account per click.
pub const OPERATOR_MINT_AMOUNT: &str = "10";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanAction {
    Take,
    Repay,
    MintToOperator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanSnapshot {
    pub stable_balance: TokenAmount,
    pub delegation: Delegation,
    pub loan: Option<Loan>,
    /// Only read while a loan is active.
    pub repayment: Option<TokenAmount>,
    /// `None` when the chain has no operator account configured.
    pub operator_balance: Option<TokenAmount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoansView<'a> {
    Loading,
    NoActiveLoans,
    Active(&'a Loan),
}

/// Operator dashboard: take a loan against delegated collateral and repay it.
#[derive(Debug, Clone, Default)]
pub struct LoansPage {
    pub amount: AmountField,
    pub snapshot: Option<LoanSnapshot>,
    in_flight: InFlight,
}

impl LoansPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loans_view(&self) -> LoansView<'_> {
        match &self.snapshot {
            None => LoansView::Loading,
            Some(LoanSnapshot {
                loan: Some(loan), ..
            }) if loan.is_active() => LoansView::Active(loan),
            Some(_) => LoansView::NoActiveLoans,
        }
    }

    pub fn repay_form_visible(&self) -> bool {
        matches!(self.loans_view(), LoansView::Active(_))
    }

    /// Collateral shown next to the loan form: 1.5x the entered amount. Display only.
    pub fn collateral_estimate(&self, ctx: &AppContext) -> Option<String> {
        let decimals = ctx.decimals(TokenId::Stable);
        let raw = parse_units(self.amount.value(), decimals).ok()?;
        let estimate = raw.checked_mul(U256::from(3u64))? / U256::from(2u64);
        Some(format_compact(estimate, decimals))
    }

    pub fn due_in(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        match self.loans_view() {
            LoansView::Active(loan) => loan.due_at().map(|due| due - now),
            _ => None,
        }
    }
}

impl PageController for LoansPage {
    type Action = LoanAction;
    type Snapshot = LoanSnapshot;

    fn title(&self) -> &'static str {
        "Operator Dashboard"
    }

    fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    fn plan(&self, ctx: &AppContext, action: &LoanAction) -> Result<Planned, TxError> {
        let stable_symbol = &ctx.registry.token(TokenId::Stable).symbol;
        let plan = match action {
            LoanAction::Take => {
                let amount = ctx.parse_amount(TokenId::Stable, self.amount.value())?;
                ActionPlan::new(
                    "create loan",
                    format!(
                        "Successfully created loan for {} {stable_symbol}",
                        amount.display()
                    ),
                )
                .step(
                    ContractName::LoanManager,
                    &ILoanManager::createLoanCall { amount: amount.raw },
                )
            }
            LoanAction::Repay => {
                if !self.repay_form_visible() {
                    return Err(TxError::validation("There is no active loan to repay."));
                }
                ActionPlan::new("repay loan", "Successfully repaid loan")
                    .step(ContractName::LoanManager, &ILoanManager::repayLoanCall {})
            }
            LoanAction::MintToOperator => {
                let amount = ctx.parse_amount(TokenId::Stable, OPERATOR_MINT_AMOUNT)?;
                ActionPlan::new(
                    "mint to operator",
                    format!(
                        "Successfully minted {} {stable_symbol} to operator",
                        amount.display()
                    ),
                )
                .step(
                    ContractName::StableToken,
                    &IStableToken::mintToOperatorCall { amount: amount.raw },
                )
            }
        };
        Ok(Planned::OnChain(plan))
    }

    fn loader(&self, ctx: &AppContext) -> BoxFuture<'static, Result<LoanSnapshot, TxError>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let owner = ctx.session.account().ok_or(TxError::NotConnected)?;
            let stable_balance = reads::token_balance(&ctx, TokenId::Stable, owner).await?;
            let delegation = reads::delegated_amount(&ctx, owner).await?;
            let loan = reads::loan_details(&ctx, owner).await?;
            let repayment = match &loan {
                Some(loan) if loan.is_active() => Some(reads::repayment_amount(&ctx, owner).await?),
                _ => None,
            };
            let operator_balance = match ctx.registry.operator_account(ctx.chain().id) {
                Ok(operator) => Some(reads::token_balance(&ctx, TokenId::Stable, operator).await?),
                Err(_) => None,
            };
            Ok(LoanSnapshot {
                stable_balance,
                delegation,
                loan,
                repayment,
                operator_balance,
            })
        })
    }

    fn apply(&mut self, snapshot: LoanSnapshot) {
        self.snapshot = Some(snapshot);
    }

    fn clear_form(&mut self, action: &LoanAction) {
        if *action == LoanAction::Take {
            self.amount.clear();
        }
    }
}
