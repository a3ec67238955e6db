use futures::future::BoxFuture;
use shared::{
    domain::{ContractName, TokenId, VaultPosition, SHARE_PRICE_DECIMALS},
    error::TxError,
    units::{format_compact, TokenAmount},
};
use tracing::debug;

use super::{AmountField, PageController, Planned};
use crate::contracts::{IVault, IERC20};
use crate::orchestrator::{ActionPlan, InFlight};
use crate::{reads, AppContext};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VaultTab {
    #[default]
    Deposit,
    Withdraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultAction {
    Deposit,
    Redeem,
}

/// Input a preview was requested for; results for anything else are stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    pub tab: VaultTab,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPreview {
    pub request: PreviewRequest,
    pub amount: TokenAmount,
}

/// ERC-4626 savings vault over the stable token.
#[derive(Debug, Clone, Default)]
pub struct VaultPage {
    tab: VaultTab,
    pub deposit_amount: AmountField,
    pub redeem_amount: AmountField,
    pub position: Option<VaultPosition>,
    preview: Option<VaultPreview>,
    in_flight: InFlight,
}

impl VaultPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tab(&self) -> VaultTab {
        self.tab
    }

    pub fn select_tab(&mut self, tab: VaultTab) {
        if self.tab != tab {
            self.tab = tab;
            self.preview = None;
        }
    }

    pub fn active_amount(&self) -> &AmountField {
        match self.tab {
            VaultTab::Deposit => &self.deposit_amount,
            VaultTab::Withdraw => &self.redeem_amount,
        }
    }

    /// Edits the active tab's amount. Returns whether the text changed.
    pub fn set_amount(&mut self, input: &str) -> bool {
        let field = match self.tab {
            VaultTab::Deposit => &mut self.deposit_amount,
            VaultTab::Withdraw => &mut self.redeem_amount,
        };
        if field.value() == input || !field.set(input) {
            return false;
        }
        self.preview = None;
        true
    }

    pub fn preview_request(&self) -> Option<PreviewRequest> {
        let input = self.active_amount().value();
        (!input.is_empty()).then(|| PreviewRequest {
            tab: self.tab,
            input: input.to_string(),
        })
    }

    /// Reads `previewDeposit` or `previewRedeem` for the request's amount.
    pub fn preview_loader(
        ctx: &AppContext,
        request: &PreviewRequest,
    ) -> BoxFuture<'static, Result<TokenAmount, TxError>> {
        let ctx = ctx.clone();
        let request = request.clone();
        Box::pin(async move {
            match request.tab {
                VaultTab::Deposit => {
                    let assets = ctx.parse_amount(TokenId::Stable, &request.input)?;
                    reads::preview_deposit(&ctx, assets.raw).await
                }
                VaultTab::Withdraw => {
                    let shares = ctx.parse_amount(TokenId::VaultShare, &request.input)?;
                    reads::preview_redeem(&ctx, shares.raw).await
                }
            }
        })
    }

    /// Stores a preview result unless the input has moved on. Returns whether it was kept.
    pub fn apply_preview(&mut self, request: PreviewRequest, amount: TokenAmount) -> bool {
        if self.preview_request().as_ref() != Some(&request) {
            debug!(input = %request.input, "discarding stale vault preview");
            return false;
        }
        self.preview = Some(VaultPreview { request, amount });
        true
    }

    /// The preview for the current input, if one has arrived.
    pub fn preview(&self) -> Option<&VaultPreview> {
        let current = self.preview_request()?;
        self.preview
            .as_ref()
            .filter(|preview| preview.request == current)
    }

    /// `1 sPUSD = x PUSD`, from the vault's reported totals.
    pub fn exchange_rate(&self) -> Option<String> {
        let position = self.position.as_ref()?;
        let price = position.share_price()?;
        Some(format!(
            "1 {} = {} {}",
            position.total_shares.token,
            format_compact(price, SHARE_PRICE_DECIMALS),
            position.total_assets.token
        ))
    }
}

impl PageController for VaultPage {
    type Action = VaultAction;
    type Snapshot = VaultPosition;

    fn title(&self) -> &'static str {
        "sPUSD Vault"
    }

    fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    fn plan(&self, ctx: &AppContext, action: &VaultAction) -> Result<Planned, TxError> {
        match action {
            VaultAction::Deposit => {
                let assets = ctx.parse_amount(TokenId::Stable, self.deposit_amount.value())?;
                let receiver = ctx.session.account().ok_or(TxError::NotConnected)?;
                let vault = ctx.resolve(ContractName::VaultToken)?;
                let symbol = &ctx.registry.token(TokenId::Stable).symbol;
                let plan = ActionPlan::new(
                    format!("deposit {symbol}"),
                    format!("Successfully deposited {} {symbol}", assets.display()),
                )
                .step(
                    ContractName::StableToken,
                    &IERC20::approveCall {
                        spender: vault.address,
                        amount: assets.raw,
                    },
                )
                .step(
                    ContractName::VaultToken,
                    &IVault::depositCall {
                        assets: assets.raw,
                        receiver,
                    },
                );
                Ok(Planned::OnChain(plan))
            }
            VaultAction::Redeem => {
                let shares = ctx.parse_amount(TokenId::VaultShare, self.redeem_amount.value())?;
                let account = ctx.session.account().ok_or(TxError::NotConnected)?;
                let symbol = &ctx.registry.token(TokenId::VaultShare).symbol;
                let plan = ActionPlan::new(
                    format!("redeem {symbol}"),
                    format!("Successfully redeemed {} {symbol}", shares.display()),
                )
                .step(
                    ContractName::VaultToken,
                    &IVault::redeemCall {
                        shares: shares.raw,
                        receiver: account,
                        owner: account,
                    },
                );
                Ok(Planned::OnChain(plan))
            }
        }
    }

    fn loader(&self, ctx: &AppContext) -> BoxFuture<'static, Result<VaultPosition, TxError>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let owner = ctx.session.account().ok_or(TxError::NotConnected)?;
            reads::vault_position(&ctx, owner).await
        })
    }

    fn apply(&mut self, snapshot: VaultPosition) {
        self.position = Some(snapshot);
    }

    fn clear_form(&mut self, action: &VaultAction) {
        match action {
            VaultAction::Deposit => self.deposit_amount.clear(),
            VaultAction::Redeem => self.redeem_amount.clear(),
        }
        self.preview = None;
    }
}
