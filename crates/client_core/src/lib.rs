use std::sync::Arc;

use alloy::primitives::U256;
use shared::{
    chain::ChainProfile,
    domain::{ContractName, DataSource, TokenId},
    error::TxError,
    units::{parse_units, TokenAmount},
};
use tracing::info;

pub mod clients;
pub mod contracts;
pub mod controller;
pub mod debounce;
pub mod orchestrator;
pub mod reads;
pub mod registry;
pub mod rpc;
pub mod session;
pub mod settings;

use clients::{HttpReadClient, InjectedWallet, MissingWallet, WalletClient};
use orchestrator::{ActionOutcome, ActionPlan, InFlightTicket, TxOrchestrator, TxProgress};
use registry::{ContractRef, Registry};
use rpc::{JsonRpcTransport, RetryPolicy};
use session::WalletSession;
use settings::{Settings, SettingsError};

/// Explicit dependencies handed to every page controller.
#[derive(Clone)]
pub struct AppContext {
    pub registry: Arc<Registry>,
    pub session: WalletSession,
    pub data_source: DataSource,
    pub orchestrator: TxOrchestrator,
}

impl AppContext {
    pub fn new(registry: Arc<Registry>, session: WalletSession, data_source: DataSource) -> Self {
        Self {
            registry,
            session,
            data_source,
            orchestrator: TxOrchestrator::default(),
        }
    }

    pub fn with_orchestrator(mut self, orchestrator: TxOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    pub fn chain(&self) -> &ChainProfile {
        self.session.chain()
    }

    pub fn is_mock(&self) -> bool {
        self.data_source == DataSource::Mock
    }

    pub fn resolve(&self, name: ContractName) -> Result<ContractRef, TxError> {
        Ok(self.registry.resolve(name, self.chain().id)?)
    }

    pub fn decimals(&self, token: TokenId) -> u8 {
        self.registry.token(token).decimals
    }

    pub fn amount(&self, token: TokenId, raw: U256) -> TokenAmount {
        TokenAmount::new(token, raw, self.decimals(token))
    }

    /// Converts a user-entered amount with the token's registry decimals. Zero is rejected.
    pub fn parse_amount(&self, token: TokenId, input: &str) -> Result<TokenAmount, TxError> {
        let raw = parse_units(input, self.decimals(token))?;
        if raw.is_zero() {
            return Err(TxError::validation("Amount must be greater than zero."));
        }
        Ok(self.amount(token, raw))
    }

    pub async fn execute(
        &self,
        ticket: &InFlightTicket,
        plan: &ActionPlan,
        progress: &(dyn Fn(TxProgress) + Send + Sync),
    ) -> Result<ActionOutcome, TxError> {
        self.orchestrator
            .execute(&self.session, &self.registry, ticket, plan, progress)
            .await
    }
}

/// Builds the live context from settings: HTTP read client, JSON-RPC wallet, registry.
pub fn bootstrap(settings: &Settings) -> Result<AppContext, SettingsError> {
    let registry = settings.build_registry()?;
    let profile = settings.chain_profile(&registry)?;
    let rpc_url = settings.rpc_endpoint(&profile)?;
    let reader = HttpReadClient::for_profile(&profile, rpc_url.clone()).map_err(|err| {
        SettingsError::InvalidUrl {
            field: "rpc_url",
            message: err.to_string(),
        }
    })?;

    let wallet: Arc<dyn WalletClient> = match settings.wallet_endpoint()? {
        Some(url) => {
            let transport = JsonRpcTransport::new(
                url,
                profile.request_timeout,
                RetryPolicy {
                    retry_count: 0,
                    retry_delay: profile.retry_delay,
                },
            )
            .map_err(|err| SettingsError::InvalidUrl {
                field: "wallet_url",
                message: err.to_string(),
            })?;
            Arc::new(InjectedWallet::new(transport))
        }
        None => Arc::new(MissingWallet),
    };

    info!(
        chain = %profile.key,
        chain_id = %profile.id,
        rpc_url = %rpc_url,
        data_source = ?settings.data_source,
        "client context ready"
    );
    let session = WalletSession::new(profile, Arc::new(reader), wallet);
    Ok(AppContext::new(Arc::new(registry), session, settings.data_source)
        .with_orchestrator(TxOrchestrator::new(settings.confirmation_timeout())))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
