use alloy::primitives::{address, Address, U256};
use futures::future::BoxFuture;
use shared::{
    domain::{ContractName, DataSource, Operator, OperatorId, OperatorStatus, TokenId},
    error::TxError,
    units::parse_units,
};

use super::{AmountField, PageController, Planned};
use crate::contracts::ILoanManager;
use crate::orchestrator::{ActionPlan, InFlight};
use crate::{reads, AppContext};

pub const MIN_ONBOARD_COLLATERAL: u64 = 100_000;
pub const MAX_BASE_RATE_TENTHS: u64 = 1_000;
pub const DEFAULT_BASE_RATE_TENTHS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Slash,
    SetBaseRate,
    Onboard,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlashForm {
    pub operator: Option<OperatorId>,
    pub amount: AmountField,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnboardForm {
    pub name: String,
    pub address: String,
    pub collateral: AmountField,
}

/// `None` keeps the page's local operator list (mock data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSnapshot {
    pub operators: Option<Vec<Operator>>,
}

pub fn mock_operators() -> Vec<Operator> {
    vec![
        Operator {
            id: OperatorId(1),
            name: "Operator Alpha".into(),
            address: address!("1a2b000000000000000000000000000000003c4d"),
            collateral: 500_000,
            status: OperatorStatus::Active,
            active_loans: Some(3),
        },
        Operator {
            id: OperatorId(2),
            name: "Operator Beta".into(),
            address: address!("5e6f000000000000000000000000000000007a8b"),
            collateral: 750_000,
            status: OperatorStatus::Active,
            active_loans: Some(5),
        },
        Operator {
            id: OperatorId(3),
            name: "Operator Gamma".into(),
            address: address!("9c0d000000000000000000000000000000001e2f"),
            collateral: 250_000,
            status: OperatorStatus::Probation,
            active_loans: Some(1),
        },
    ]
}

/// Protocol administration: operator table, slashing, base rate and onboarding.
#[derive(Debug, Clone)]
pub struct AdminPage {
    data_source: DataSource,
    pub operators: Vec<Operator>,
    pub slash: SlashForm,
    pub base_rate: AmountField,
    base_rate_tenths: u64,
    pub onboard: OnboardForm,
    in_flight: InFlight,
}

impl AdminPage {
    pub fn new(data_source: DataSource) -> Self {
        let mut base_rate = AmountField::default();
        base_rate.set("5.0");
        Self {
            data_source,
            operators: match data_source {
                DataSource::Mock => mock_operators(),
                DataSource::Live => Vec::new(),
            },
            slash: SlashForm::default(),
            base_rate,
            base_rate_tenths: DEFAULT_BASE_RATE_TENTHS,
            onboard: OnboardForm::default(),
            in_flight: InFlight::new(),
        }
    }

    pub fn data_source(&self) -> DataSource {
        self.data_source
    }

    /// Current base rate in percent, one decimal place.
    pub fn base_rate_percent(&self) -> String {
        format!("{}.{}", self.base_rate_tenths / 10, self.base_rate_tenths % 10)
    }

    pub fn total_collateral(&self) -> u64 {
        self.operators.iter().map(|op| op.collateral).sum()
    }

    pub fn total_active_loans(&self) -> Option<u32> {
        self.operators.iter().map(|op| op.active_loans).sum()
    }

    pub fn operator(&self, id: OperatorId) -> Option<&Operator> {
        self.operators.iter().find(|op| op.id == id)
    }

    /// Jumps from the table's "Slash" link into the slash form.
    pub fn select_for_slash(&mut self, id: OperatorId) {
        self.slash.operator = Some(id);
    }

    /// "Slash All": the operator's whole collateral.
    pub fn fill_slash_all(&mut self) -> bool {
        let Some(operator) = self.slash.operator.and_then(|id| self.operator(id)) else {
            return false;
        };
        let all = operator.collateral.to_string();
        self.slash.amount.set(&all)
    }

    fn validated_slash(&self) -> Result<(&Operator, u64), TxError> {
        let operator = self
            .slash
            .operator
            .and_then(|id| self.operator(id))
            .ok_or_else(|| TxError::validation("Select an operator to slash."))?;
        let amount = whole_units(self.slash.amount.value(), "slash amount")?;
        if amount < 1 {
            return Err(TxError::validation("Slash amount must be at least 1."));
        }
        if amount > operator.collateral {
            return Err(TxError::validation(format!(
                "Slash amount exceeds {}'s collateral of {}.",
                operator.name, operator.collateral
            )));
        }
        if self.slash.reason.trim().is_empty() {
            return Err(TxError::validation("A reason for slashing is required."));
        }
        Ok((operator, amount))
    }

    fn validated_base_rate(&self) -> Result<u64, TxError> {
        let tenths = parse_units(self.base_rate.value(), 1)
            .map_err(|_| TxError::validation("Base rate must be a number with at most one decimal."))?;
        if tenths > U256::from(MAX_BASE_RATE_TENTHS) {
            return Err(TxError::validation("Base rate must be between 0 and 100."));
        }
        Ok(tenths.to::<u64>())
    }

    fn validated_onboard(&self) -> Result<(String, Address, u64), TxError> {
        let name = self.onboard.name.trim();
        if name.is_empty() {
            return Err(TxError::validation("Operator name is required."));
        }
        let raw_address = self.onboard.address.trim();
        let address = raw_address
            .starts_with("0x")
            .then(|| raw_address.parse::<Address>().ok())
            .flatten()
            .ok_or_else(|| TxError::validation("A valid 0x address is required."))?;
        let collateral = whole_units(self.onboard.collateral.value(), "collateral")?;
        if collateral < MIN_ONBOARD_COLLATERAL {
            return Err(TxError::validation(format!(
                "Collateral must be at least {MIN_ONBOARD_COLLATERAL}."
            )));
        }
        Ok((name.to_string(), address, collateral))
    }

    fn mock_only(&self, what: &str) -> Result<Planned, TxError> {
        match self.data_source {
            DataSource::Mock => Ok(Planned::Local),
            DataSource::Live => Err(TxError::Unsupported(format!(
                "{what} has no deployed contract; set data_source = \"mock\" to use it."
            ))),
        }
    }
}

fn whole_units(input: &str, field: &str) -> Result<u64, TxError> {
    let value = parse_units(input, 0)
        .map_err(|_| TxError::validation(format!("Enter a whole number for the {field}.")))?;
    u64::try_from(value).map_err(|_| TxError::validation(format!("The {field} is too large.")))
}

impl PageController for AdminPage {
    type Action = AdminAction;
    type Snapshot = AdminSnapshot;

    fn title(&self) -> &'static str {
        "Cap Admin"
    }

    fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    fn plan(&self, _ctx: &AppContext, action: &AdminAction) -> Result<Planned, TxError> {
        match action {
            AdminAction::Slash => {
                let (operator, amount) = self.validated_slash()?;
                match self.data_source {
                    DataSource::Mock => Ok(Planned::Local),
                    DataSource::Live => Ok(Planned::OnChain(
                        ActionPlan::new(
                            format!("slash {}", operator.name),
                            format!(
                                "Slashed {} for {amount}. Reason: {}",
                                operator.name,
                                self.slash.reason.trim()
                            ),
                        )
                        .step(
                            ContractName::LoanManager,
                            &ILoanManager::slashLoanCall {
                                borrower: operator.address,
                            },
                        ),
                    )),
                }
            }
            AdminAction::SetBaseRate => {
                self.validated_base_rate()?;
                self.mock_only("Base rate")
            }
            AdminAction::Onboard => {
                self.validated_onboard()?;
                self.mock_only("Operator onboarding")
            }
        }
    }

    fn apply_local(&mut self, action: &AdminAction) -> Result<String, TxError> {
        match action {
            AdminAction::Slash => {
                let (operator, amount) = self.validated_slash()?;
                let id = operator.id;
                let reason = self.slash.reason.trim().to_string();
                let operator = self
                    .operators
                    .iter_mut()
                    .find(|op| op.id == id)
                    .ok_or_else(|| TxError::validation("Select an operator to slash."))?;
                operator.collateral -= amount;
                operator.status = OperatorStatus::Probation;
                Ok(format!(
                    "Operator #{id} slashed for {amount}. Reason: {reason}"
                ))
            }
            AdminAction::SetBaseRate => {
                self.base_rate_tenths = self.validated_base_rate()?;
                Ok(format!("Base rate updated to {}%", self.base_rate_percent()))
            }
            AdminAction::Onboard => {
                let (name, address, collateral) = self.validated_onboard()?;
                let next_id = self.operators.iter().map(|op| op.id.0).max().unwrap_or(0) + 1;
                self.operators.push(Operator {
                    id: OperatorId(next_id),
                    name: name.clone(),
                    address,
                    collateral,
                    status: OperatorStatus::Active,
                    active_loans: Some(0),
                });
                Ok(format!(
                    "New operator onboarded: {name} ({address}) with {collateral} collateral"
                ))
            }
        }
    }

    fn loader(&self, ctx: &AppContext) -> BoxFuture<'static, Result<AdminSnapshot, TxError>> {
        let ctx = ctx.clone();
        let data_source = self.data_source;
        Box::pin(async move {
            if data_source == DataSource::Mock {
                return Ok(AdminSnapshot { operators: None });
            }
            let address = ctx.registry.operator_account(ctx.chain().id)?;
            let delegation = reads::delegated_amount(&ctx, address).await?;
            let unit = U256::from(10u64).pow(U256::from(ctx.decimals(TokenId::Collateral)));
            let collateral = u64::try_from(delegation.amount.raw / unit).unwrap_or(u64::MAX);
            Ok(AdminSnapshot {
                operators: Some(vec![Operator {
                    id: OperatorId(1),
                    name: "Protocol Operator".into(),
                    address,
                    collateral,
                    status: OperatorStatus::Active,
                    active_loans: None,
                }]),
            })
        })
    }

    fn apply(&mut self, snapshot: AdminSnapshot) {
        if let Some(operators) = snapshot.operators {
            self.operators = operators;
        }
    }

    fn clear_form(&mut self, action: &AdminAction) {
        match action {
            AdminAction::Slash => self.slash = SlashForm::default(),
            AdminAction::SetBaseRate => {}
            AdminAction::Onboard => self.onboard = OnboardForm::default(),
        }
    }
}
