use futures::future::BoxFuture;
use shared::{
    domain::{ContractName, TokenId},
    error::TxError,
    units::{parse_units, TokenAmount},
};

use super::{AmountField, PageController, Planned};
use crate::contracts::{IStableToken, IERC20};
use crate::orchestrator::{ActionPlan, InFlight};
use crate::{reads, AppContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableAction {
    Mint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableBalances {
    pub reserve: TokenAmount,
    pub stable: TokenAmount,
}

/// Deposit reserve USDC and mint the stable token 1:1.
#[derive(Debug, Clone, Default)]
pub struct StableMintPage {
    pub amount: AmountField,
    pub balances: Option<StableBalances>,
    in_flight: InFlight,
}

impl StableMintPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stable tokens received for the entered deposit, if it parses.
    pub fn receive_preview(&self, ctx: &AppContext) -> Option<String> {
        let decimals = ctx.decimals(TokenId::Stable);
        parse_units(self.amount.value(), decimals)
            .ok()
            .map(|raw| ctx.amount(TokenId::Stable, raw).display())
    }
}

impl PageController for StableMintPage {
    type Action = StableAction;
    type Snapshot = StableBalances;

    fn title(&self) -> &'static str {
        "Mint PUSD"
    }

    fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    fn plan(&self, ctx: &AppContext, action: &StableAction) -> Result<Planned, TxError> {
        match action {
            StableAction::Mint => {
                let amount = ctx.parse_amount(TokenId::Reserve, self.amount.value())?;
                let reserve_symbol = &ctx.registry.token(TokenId::Reserve).symbol;
                if let Some(balances) = &self.balances {
                    if amount.raw > balances.reserve.raw {
                        return Err(TxError::validation(format!(
                            "Insufficient {reserve_symbol} balance."
                        )));
                    }
                }
                let stable = ctx.resolve(ContractName::StableToken)?;
                let stable_symbol = &ctx.registry.token(TokenId::Stable).symbol;
                let plan = ActionPlan::new(
                    format!("mint {stable_symbol}"),
                    format!(
                        "Successfully minted {} {stable_symbol}",
                        self.receive_preview(ctx).unwrap_or_else(|| amount.display())
                    ),
                )
                .step(
                    ContractName::ReserveToken,
                    &IERC20::approveCall {
                        spender: stable.address,
                        amount: amount.raw,
                    },
                )
                .step(
                    ContractName::StableToken,
                    &IStableToken::depositAndMintCall { amount: amount.raw },
                );
                Ok(Planned::OnChain(plan))
            }
        }
    }

    fn loader(&self, ctx: &AppContext) -> BoxFuture<'static, Result<StableBalances, TxError>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let owner = ctx.session.account().ok_or(TxError::NotConnected)?;
            Ok(StableBalances {
                reserve: reads::token_balance(&ctx, TokenId::Reserve, owner).await?,
                stable: reads::token_balance(&ctx, TokenId::Stable, owner).await?,
            })
        })
    }

    fn apply(&mut self, snapshot: StableBalances) {
        self.balances = Some(snapshot);
    }

    fn clear_form(&mut self, _action: &StableAction) {
        self.amount.clear();
    }
}
