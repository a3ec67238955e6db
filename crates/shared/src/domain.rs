use std::fmt;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::units::{format_units, TokenAmount};

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ChainId, u64);
id_newtype!(OperatorId, u32);

/// Tokens the client knows how to display and convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TokenId {
    /// Test USDC, the reserve asset behind the stable token.
    #[serde(rename = "USDC")]
    Reserve,
    /// Liquid staking token used as restaking collateral.
    #[serde(rename = "LST")]
    Collateral,
    #[serde(rename = "PUSD")]
    Stable,
    /// Vault shares (ERC-4626 over the stable token).
    #[serde(rename = "sPUSD")]
    VaultShare,
}

impl TokenId {
    pub const ALL: [TokenId; 4] = [
        TokenId::Reserve,
        TokenId::Collateral,
        TokenId::Stable,
        TokenId::VaultShare,
    ];

    pub fn default_symbol(self) -> &'static str {
        match self {
            TokenId::Reserve => "USDC",
            TokenId::Collateral => "LST",
            TokenId::Stable => "PUSD",
            TokenId::VaultShare => "sPUSD",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|token| token.default_symbol().eq_ignore_ascii_case(symbol))
    }

    pub fn contract(self) -> ContractName {
        match self {
            TokenId::Reserve => ContractName::ReserveToken,
            TokenId::Collateral => ContractName::CollateralToken,
            TokenId::Stable => ContractName::StableToken,
            TokenId::VaultShare => ContractName::VaultToken,
        }
    }

    pub fn index(self) -> usize {
        match self {
            TokenId::Reserve => 0,
            TokenId::Collateral => 1,
            TokenId::Stable => 2,
            TokenId::VaultShare => 3,
        }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_symbol())
    }
}

/// Logical names of the deployed protocol contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContractName {
    ReserveToken,
    StableToken,
    CollateralToken,
    VaultToken,
    DelegationManager,
    LoanManager,
}

impl ContractName {
    pub const ALL: [ContractName; 6] = [
        ContractName::ReserveToken,
        ContractName::StableToken,
        ContractName::CollateralToken,
        ContractName::VaultToken,
        ContractName::DelegationManager,
        ContractName::LoanManager,
    ];

    /// Key used for this contract in a `deployed-addresses.json` address book.
    pub fn address_book_key(self) -> &'static str {
        match self {
            ContractName::ReserveToken => "USDC",
            ContractName::StableToken => "PUSD",
            ContractName::CollateralToken => "LST",
            ContractName::VaultToken => "sPUSD",
            ContractName::DelegationManager => "Eigen",
            ContractName::LoanManager => "LoanManager",
        }
    }

    pub fn from_address_book_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.address_book_key() == key)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContractName::ReserveToken => "reserve-token",
            ContractName::StableToken => "stable-token",
            ContractName::CollateralToken => "collateral-token",
            ContractName::VaultToken => "vault-token",
            ContractName::DelegationManager => "delegation-manager",
            ContractName::LoanManager => "loan-manager",
        }
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where screens without a deployed contract get their data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    #[default]
    Live,
    Mock,
}

/// Loan record as reported by the loan manager for the calling borrower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub borrower: Address,
    pub principal: TokenAmount,
    /// Rate in basis points as stored by the loan manager.
    pub interest_rate_bps: U256,
    pub start_time: u64,
    pub due_time: u64,
    pub is_repaid: bool,
    pub collateral: TokenAmount,
    pub loaned_amount: TokenAmount,
}

impl Loan {
    /// The loan manager reports an all-zero record when the borrower has never borrowed.
    pub fn is_empty(&self) -> bool {
        self.principal.raw.is_zero() && self.start_time == 0
    }

    pub fn is_active(&self) -> bool {
        !self.is_empty() && !self.is_repaid
    }

    pub fn interest_rate_percent(&self) -> String {
        format_units(self.interest_rate_bps, 2)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.start_time)
    }

    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.due_time)
    }
}

fn timestamp(secs: u64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp(i64::try_from(secs).ok()?, 0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: Address,
    pub amount: TokenAmount,
}

/// Scale used for the displayed asset-per-share price.
pub const SHARE_PRICE_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultPosition {
    pub depositor: Address,
    pub shares: TokenAmount,
    pub asset_balance: TokenAmount,
    pub total_assets: TokenAmount,
    pub total_shares: TokenAmount,
}

impl VaultPosition {
    /// Assets per share scaled by `SHARE_PRICE_DECIMALS`, `None` for an empty vault.
    pub fn share_price(&self) -> Option<U256> {
        if self.total_shares.raw.is_zero() {
            return None;
        }
        let scale = U256::from(10u64).pow(U256::from(SHARE_PRICE_DECIMALS));
        let share_unit = U256::from(10u64).pow(U256::from(self.total_shares.decimals));
        let asset_unit = U256::from(10u64).pow(U256::from(self.total_assets.decimals));
        let numerator = self
            .total_assets
            .raw
            .checked_mul(scale)?
            .checked_mul(share_unit)?;
        let denominator = self.total_shares.raw.checked_mul(asset_unit)?;
        Some(numerator / denominator)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorStatus {
    Active,
    Probation,
}

impl fmt::Display for OperatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorStatus::Active => f.write_str("Active"),
            OperatorStatus::Probation => f.write_str("Probation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: OperatorId,
    pub name: String,
    pub address: Address,
    /// Whole stable-token units backing the operator.
    pub collateral: u64,
    pub status: OperatorStatus,
    /// `None` when the source cannot report loan counts.
    pub active_loans: Option<u32>,
}

impl Operator {
    /// Shortened `0x1234...abcd` form used in tables.
    pub fn short_address(&self) -> String {
        let full = self.address.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}
