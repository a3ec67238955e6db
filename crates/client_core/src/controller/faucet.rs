use futures::future::BoxFuture;
use shared::{domain::TokenId, error::TxError, units::TokenAmount};

use super::{AmountField, PageController, Planned};
use crate::contracts::IMintable;
use crate::orchestrator::{ActionPlan, InFlight};
use crate::{reads, AppContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaucetAction {
    Mint,
}

/// Open-mint page for a test token (reserve USDC or collateral LST).
#[derive(Debug, Clone)]
pub struct FaucetPage {
    token: TokenId,
    pub amount: AmountField,
    pub balance: Option<TokenAmount>,
    in_flight: InFlight,
}

impl FaucetPage {
    pub fn new(token: TokenId) -> Self {
        Self {
            token,
            amount: AmountField::default(),
            balance: None,
            in_flight: InFlight::new(),
        }
    }

    pub fn reserve() -> Self {
        Self::new(TokenId::Reserve)
    }

    pub fn collateral() -> Self {
        Self::new(TokenId::Collateral)
    }

    pub fn token(&self) -> TokenId {
        self.token
    }
}

impl PageController for FaucetPage {
    type Action = FaucetAction;
    type Snapshot = TokenAmount;

    fn title(&self) -> &'static str {
        match self.token {
            TokenId::Collateral => "LST Faucet",
            _ => "USDC Faucet",
        }
    }

    fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    fn plan(&self, ctx: &AppContext, action: &FaucetAction) -> Result<Planned, TxError> {
        match action {
            FaucetAction::Mint => {
                let amount = ctx.parse_amount(self.token, self.amount.value())?;
                let symbol = &ctx.registry.token(self.token).symbol;
                Ok(Planned::OnChain(
                    ActionPlan::new(
                        format!("mint {symbol}"),
                        format!("Successfully minted {} {symbol}", amount.display()),
                    )
                    .step(self.token.contract(), &IMintable::mintCall { amount: amount.raw }),
                ))
            }
        }
    }

    fn loader(&self, ctx: &AppContext) -> BoxFuture<'static, Result<TokenAmount, TxError>> {
        let ctx = ctx.clone();
        let token = self.token;
        Box::pin(async move {
            let owner = ctx.session.account().ok_or(TxError::NotConnected)?;
            reads::token_balance(&ctx, token, owner).await
        })
    }

    fn apply(&mut self, snapshot: TokenAmount) {
        self.balance = Some(snapshot);
    }

    fn clear_form(&mut self, _action: &FaucetAction) {
        self.amount.clear();
    }
}
