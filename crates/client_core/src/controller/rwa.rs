//! Real-world-asset portfolio. There is no RWA contract; the page only runs on mock data.

use futures::future::BoxFuture;
use shared::{domain::DataSource, error::TxError};

use super::{AmountField, PageController, Planned};
use crate::orchestrator::InFlight;
use crate::AppContext;

/// Percent yield the portfolio is compared against.
pub const BASE_YIELD_PERCENT: f64 = 3.50;

#[derive(Debug, Clone, PartialEq)]
pub struct RwaAsset {
    pub id: u32,
    pub name: String,
    pub amount: f64,
    pub yield_percent: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    pub name: &'static str,
    pub description: &'static str,
    pub yield_percent: f64,
}

pub const OPPORTUNITIES: [Opportunity; 3] = [
    Opportunity {
        name: "US Treasury Bonds",
        description: "Low risk government securities",
        yield_percent: 4.2,
    },
    Opportunity {
        name: "Corporate Bond ETF",
        description: "Diversified corporate debt",
        yield_percent: 5.8,
    },
    Opportunity {
        name: "Real Estate Fund",
        description: "Commercial property portfolio",
        yield_percent: 7.1,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RwaAction {
    AddAsset,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAssetForm {
    pub name: String,
    pub amount: AmountField,
    pub yield_percent: AmountField,
}

fn seed_assets() -> Vec<RwaAsset> {
    vec![
        RwaAsset {
            id: 1,
            name: "US Treasury Bond".into(),
            amount: 10_000.0,
            yield_percent: 4.2,
            value: 10_250.0,
        },
        RwaAsset {
            id: 2,
            name: "Corporate Bond ETF".into(),
            amount: 5_000.0,
            yield_percent: 5.8,
            value: 5_120.0,
        },
        RwaAsset {
            id: 3,
            name: "Real Estate Fund".into(),
            amount: 15_000.0,
            yield_percent: 7.1,
            value: 15_600.0,
        },
    ]
}

#[derive(Debug, Clone)]
pub struct RwaPage {
    data_source: DataSource,
    pub assets: Vec<RwaAsset>,
    pub form: NewAssetForm,
    in_flight: InFlight,
}

impl RwaPage {
    pub fn new(data_source: DataSource) -> Self {
        Self {
            data_source,
            assets: match data_source {
                DataSource::Mock => seed_assets(),
                DataSource::Live => Vec::new(),
            },
            form: NewAssetForm::default(),
            in_flight: InFlight::new(),
        }
    }

    pub fn total_value(&self) -> f64 {
        self.assets.iter().map(|asset| asset.value).sum()
    }

    /// Value-weighted yield in percent; zero for an empty portfolio.
    pub fn weighted_yield(&self) -> f64 {
        let total = self.total_value();
        if total <= 0.0 {
            return 0.0;
        }
        self.assets
            .iter()
            .map(|asset| asset.value * asset.yield_percent)
            .sum::<f64>()
            / total
    }

    pub fn yield_premium(&self) -> f64 {
        self.weighted_yield() - BASE_YIELD_PERCENT
    }

    /// Prefills the form from one of the listed opportunities.
    pub fn choose_opportunity(&mut self, opportunity: &Opportunity) {
        self.form.name = opportunity.name.to_string();
        self.form.yield_percent.set(&opportunity.yield_percent.to_string());
    }

    fn validated_form(&self) -> Result<(String, f64, f64), TxError> {
        let name = self.form.name.trim();
        let amount = self.form.amount.value().parse::<f64>().ok();
        let yield_percent = self.form.yield_percent.value().parse::<f64>().ok();
        match (name.is_empty(), amount, yield_percent) {
            (false, Some(amount), Some(yield_percent)) if amount > 0.0 && yield_percent >= 0.0 => {
                Ok((name.to_string(), amount, yield_percent))
            }
            _ => Err(TxError::validation("Please fill in all fields.")),
        }
    }
}

impl PageController for RwaPage {
    type Action = RwaAction;
    type Snapshot = ();

    fn title(&self) -> &'static str {
        "RWA Portfolio"
    }

    fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    fn plan(&self, _ctx: &AppContext, _action: &RwaAction) -> Result<Planned, TxError> {
        if self.data_source == DataSource::Live {
            return Err(TxError::Unsupported(
                "The RWA portfolio only runs with data_source = \"mock\".".into(),
            ));
        }
        self.validated_form()?;
        Ok(Planned::Local)
    }

    fn apply_local(&mut self, _action: &RwaAction) -> Result<String, TxError> {
        let (name, amount, yield_percent) = self.validated_form()?;
        let id = self.assets.iter().map(|asset| asset.id).max().unwrap_or(0) + 1;
        // Simple demo valuation: a tenth of one year's yield.
        let value = amount * (1.0 + yield_percent / 100.0 * 0.1);
        self.assets.push(RwaAsset {
            id,
            name: name.clone(),
            amount,
            yield_percent,
            value,
        });
        Ok(format!("Added {name} to the portfolio"))
    }

    fn loader(&self, _ctx: &AppContext) -> BoxFuture<'static, Result<(), TxError>> {
        Box::pin(async { Ok(()) })
    }

    fn apply(&mut self, _snapshot: ()) {}

    fn clear_form(&mut self, _action: &RwaAction) {
        self.form = NewAssetForm::default();
    }
}
