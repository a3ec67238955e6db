//! View-function reads. Every read resolves its contract through the registry first,
//! so an unsupported chain fails before any request leaves the process.

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use shared::{
    domain::{ContractName, Delegation, Loan, TokenId, VaultPosition},
    error::TxError,
    units::TokenAmount,
};
use tracing::debug;

use crate::clients::CallRequest;
use crate::contracts::{IDelegationManager, ILoanManager, IVault, IERC20};
use crate::AppContext;

async fn call_view<C>(
    ctx: &AppContext,
    contract: ContractName,
    call: C,
    from: Option<Address>,
) -> Result<C::Return, TxError>
where
    C: SolCall + Send,
    C::Return: Send,
{
    let target = ctx.resolve(contract)?;
    target
        .ensure_function(C::SELECTOR)
        .map_err(TxError::from)?;
    let request = CallRequest {
        from,
        to: target.address,
        data: call.abi_encode().into(),
        gas: None,
        chain_id: None,
    };
    debug!(contract = %contract, function = C::SIGNATURE, "view call");
    let output = ctx
        .session
        .reader()
        .call(&request)
        .await
        .map_err(|err| TxError::Transport(err.to_string()))?;
    C::abi_decode_returns(&output, true).map_err(|err| {
        TxError::Transport(format!(
            "{contract}.{} returned undecodable data: {err}",
            C::SIGNATURE
        ))
    })
}

pub async fn token_balance(
    ctx: &AppContext,
    token: TokenId,
    owner: Address,
) -> Result<TokenAmount, TxError> {
    let balance = call_view(ctx, token.contract(), IERC20::balanceOfCall { owner }, None)
        .await?
        .balance;
    Ok(ctx.amount(token, balance))
}

pub async fn total_supply(ctx: &AppContext, token: TokenId) -> Result<TokenAmount, TxError> {
    let supply = call_view(ctx, token.contract(), IERC20::totalSupplyCall {}, None)
        .await?
        .supply;
    Ok(ctx.amount(token, supply))
}

/// Collateral tokens the delegator has restaked.
pub async fn delegated_amount(ctx: &AppContext, delegator: Address) -> Result<Delegation, TxError> {
    let amount = call_view(
        ctx,
        ContractName::DelegationManager,
        IDelegationManager::getDelegatedAmountCall { delegator },
        None,
    )
    .await?
    .amount;
    Ok(Delegation {
        delegator,
        amount: ctx.amount(TokenId::Collateral, amount),
    })
}

/// The borrower's loan, or `None` when the loan manager reports an empty record.
pub async fn loan_details(ctx: &AppContext, borrower: Address) -> Result<Option<Loan>, TxError> {
    let details = call_view(
        ctx,
        ContractName::LoanManager,
        ILoanManager::getLoanDetailsCall {},
        Some(borrower),
    )
    .await?;
    let loan = Loan {
        borrower,
        principal: ctx.amount(TokenId::Stable, details.amount),
        interest_rate_bps: details.interestRate,
        start_time: saturating_u64(details.startTime),
        due_time: saturating_u64(details.dueTime),
        is_repaid: details.isRepaid,
        collateral: ctx.amount(TokenId::Collateral, details.collateralAmount),
        loaned_amount: ctx.amount(TokenId::Reserve, details.loanedUSDCAmount),
    };
    Ok((!loan.is_empty()).then_some(loan))
}

pub async fn repayment_amount(ctx: &AppContext, borrower: Address) -> Result<TokenAmount, TxError> {
    let repayment = call_view(
        ctx,
        ContractName::LoanManager,
        ILoanManager::calculateRepaymentAmountCall {},
        Some(borrower),
    )
    .await?
    .repayment;
    Ok(ctx.amount(TokenId::Stable, repayment))
}

pub async fn vault_position(ctx: &AppContext, depositor: Address) -> Result<VaultPosition, TxError> {
    let shares = token_balance(ctx, TokenId::VaultShare, depositor).await?;
    let asset_balance = token_balance(ctx, TokenId::Stable, depositor).await?;
    let total_assets = call_view(ctx, ContractName::VaultToken, IVault::totalAssetsCall {}, None)
        .await?
        .assets;
    let total_shares = total_supply(ctx, TokenId::VaultShare).await?;
    Ok(VaultPosition {
        depositor,
        shares,
        asset_balance,
        total_assets: ctx.amount(TokenId::Stable, total_assets),
        total_shares,
    })
}

/// Shares the vault would mint for `assets`.
pub async fn preview_deposit(ctx: &AppContext, assets: U256) -> Result<TokenAmount, TxError> {
    let shares = call_view(
        ctx,
        ContractName::VaultToken,
        IVault::previewDepositCall { assets },
        None,
    )
    .await?
    .shares;
    Ok(ctx.amount(TokenId::VaultShare, shares))
}

/// Assets the vault would return for `shares`.
pub async fn preview_redeem(ctx: &AppContext, shares: U256) -> Result<TokenAmount, TxError> {
    let assets = call_view(
        ctx,
        ContractName::VaultToken,
        IVault::previewRedeemCall { shares },
        None,
    )
    .await?
    .assets;
    Ok(ctx.amount(TokenId::Stable, assets))
}

fn saturating_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
