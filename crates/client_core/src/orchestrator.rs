//! The simulate, submit, confirm sequence shared by every page.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use alloy::primitives::{Bytes, B256, U64};
use alloy::sol_types::{decode_revert_reason, SolCall};
use serde_json::Value;
use shared::{
    chain::ChainProfile,
    domain::ContractName,
    error::TxError,
};
use tracing::{debug, error, info, warn};

use crate::clients::{CallRequest, ReadClient, TxReceipt};
use crate::registry::{ContractRef, Registry, RegistryError};
use crate::rpc::RpcError;
use crate::session::{wallet_error, ReadyWallet, WalletSession};

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// One contract write, encoded but not yet bound to an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCall {
    pub contract: ContractName,
    pub function: &'static str,
    pub selector: [u8; 4],
    pub data: Bytes,
}

impl PlannedCall {
    pub fn new<C: SolCall>(contract: ContractName, call: &C) -> Self {
        Self {
            contract,
            function: C::SIGNATURE,
            selector: C::SELECTOR,
            data: Bytes::from(call.abi_encode()),
        }
    }
}

/// A user action as an ordered list of writes. Steps run strictly one after another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPlan {
    pub label: String,
    pub steps: Vec<PlannedCall>,
    pub success_message: String,
}

impl ActionPlan {
    pub fn new(label: impl Into<String>, success_message: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            steps: Vec::new(),
            success_message: success_message.into(),
        }
    }

    pub fn step<C: SolCall>(mut self, contract: ContractName, call: &C) -> Self {
        self.steps.push(PlannedCall::new(contract, call));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedStep {
    pub contract: ContractName,
    pub function: &'static str,
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub explorer_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub label: String,
    pub message: String,
    pub steps: Vec<ConfirmedStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxProgress {
    Simulating { function: &'static str },
    AwaitingSignature { function: &'static str },
    Submitted {
        function: &'static str,
        tx_hash: B256,
        explorer_url: String,
    },
    Confirmed {
        function: &'static str,
        tx_hash: B256,
    },
}

impl fmt::Display for TxProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxProgress::Simulating { function } => write!(f, "Simulating {function}"),
            TxProgress::AwaitingSignature { function } => {
                write!(f, "Confirm {function} in your wallet")
            }
            TxProgress::Submitted { function, .. } => {
                write!(f, "Waiting for {function} to confirm")
            }
            TxProgress::Confirmed { function, .. } => write!(f, "{function} confirmed"),
        }
    }
}

/// Per-page in-flight flag. At most one ticket exists at a time.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicBool>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Option<InFlightTicket> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightTicket(Arc::clone(&self.0)))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the page's in-flight flag when dropped, including when the owning task is aborted.
#[derive(Debug)]
pub struct InFlightTicket(Arc<AtomicBool>);

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn revert_reason(err: &RpcError) -> Option<String> {
    let RpcError::Rpc { message, data, .. } = err else {
        return None;
    };
    let encoded = match data {
        Some(Value::String(hex)) => Some(hex.clone()),
        Some(Value::Object(inner)) => inner
            .get("data")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    if let Some(reason) = encoded
        .and_then(|hex| hex.parse::<Bytes>().ok())
        .and_then(|bytes| decode_revert_reason(&bytes))
        .filter(|reason| !reason.trim().is_empty())
    {
        return Some(reason);
    }
    let reason = message
        .strip_prefix("execution reverted")
        .unwrap_or(message)
        .trim_start_matches(':')
        .trim();
    (!reason.is_empty()).then(|| reason.to_string())
}

fn simulation_error(err: RpcError) -> TxError {
    match err {
        RpcError::Rpc { .. } => TxError::SimulationReverted {
            reason: revert_reason(&err),
        },
        other => TxError::Transport(other.to_string()),
    }
}

fn send_error(err: RpcError) -> TxError {
    match err {
        RpcError::Rpc { .. } if !err.is_user_rejection() => TxError::Submission(err.to_string()),
        other => wallet_error(other),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TxOrchestrator {
    confirmation_timeout: Duration,
    poll_interval: Option<Duration>,
}

impl Default for TxOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATION_TIMEOUT)
    }
}

impl TxOrchestrator {
    pub fn new(confirmation_timeout: Duration) -> Self {
        Self {
            confirmation_timeout,
            poll_interval: None,
        }
    }

    /// Overrides the chain profile's receipt polling interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = Some(poll_interval);
        self
    }

    pub fn confirmation_timeout(&self) -> Duration {
        self.confirmation_timeout
    }

    /// Runs every step of `plan`: simulate, send through the wallet, wait for one confirmation.
    /// The ticket proves the caller holds the page's in-flight flag.
    pub async fn execute(
        &self,
        session: &WalletSession,
        registry: &Registry,
        _ticket: &InFlightTicket,
        plan: &ActionPlan,
        progress: &(dyn Fn(TxProgress) + Send + Sync),
    ) -> Result<ActionOutcome, TxError> {
        let wallet = session.ready()?;

        let targets = plan
            .steps
            .iter()
            .map(|step| -> Result<_, RegistryError> {
                let contract = registry.resolve(step.contract, wallet.chain.id)?;
                contract.ensure_function(step.selector)?;
                Ok((step, contract))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                warn!(action = %plan.label, chain_id = %wallet.chain.id, error = %err, "could not resolve action");
                TxError::from(err)
            })?;

        info!(action = %plan.label, steps = targets.len(), account = %wallet.account, "executing action");
        let mut confirmed = Vec::with_capacity(targets.len());
        for (step, contract) in targets {
            let receipt = self.run_step(&wallet, step, &contract, progress).await?;
            confirmed.push(ConfirmedStep {
                contract: step.contract,
                function: step.function,
                tx_hash: receipt.transaction_hash,
                block_number: receipt.block_number.map(|n| n.to::<u64>()),
                explorer_url: wallet.chain.tx_url(&receipt.transaction_hash.to_string()),
            });
        }

        Ok(ActionOutcome {
            label: plan.label.clone(),
            message: plan.success_message.clone(),
            steps: confirmed,
        })
    }

    async fn run_step(
        &self,
        wallet: &ReadyWallet,
        step: &PlannedCall,
        contract: &ContractRef,
        progress: &(dyn Fn(TxProgress) + Send + Sync),
    ) -> Result<TxReceipt, TxError> {
        let mut request = CallRequest {
            from: Some(wallet.account),
            to: contract.address,
            data: step.data.clone(),
            gas: None,
            chain_id: None,
        };

        progress(TxProgress::Simulating {
            function: step.function,
        });
        wallet.reader.call(&request).await.map_err(|err| {
            warn!(contract = %step.contract, function = step.function, error = %err, "simulation failed");
            simulation_error(err)
        })?;
        let gas = wallet
            .reader
            .estimate_gas(&request)
            .await
            .map_err(|err| {
                warn!(contract = %step.contract, function = step.function, error = %err, "gas estimation failed");
                simulation_error(err)
            })?;
        request.gas = Some(U64::from(gas));
        debug!(contract = %step.contract, function = step.function, gas, "simulation passed");

        // The wallet may have switched networks since the last sync.
        let wallet_chain = wallet.writer.chain_id().await.map_err(wallet_error)?;
        if wallet_chain != wallet.chain.id {
            warn!(contract = %step.contract, function = step.function, expected = %wallet.chain.id, actual = %wallet_chain, "wallet switched chains before signing");
            return Err(TxError::WrongChain {
                expected: wallet.chain.id,
                actual: wallet_chain,
            });
        }
        request.chain_id = Some(U64::from(wallet.chain.id.0));

        progress(TxProgress::AwaitingSignature {
            function: step.function,
        });
        let tx_hash = wallet
            .writer
            .send_transaction(&request)
            .await
            .map_err(|err| {
                warn!(contract = %step.contract, function = step.function, error = %err, "transaction not sent");
                send_error(err)
            })?;
        let explorer_url = wallet.chain.tx_url(&tx_hash.to_string());
        info!(contract = %step.contract, function = step.function, tx_hash = %tx_hash, "transaction submitted");
        progress(TxProgress::Submitted {
            function: step.function,
            tx_hash,
            explorer_url: explorer_url.clone(),
        });

        let receipt = self
            .wait_for_receipt(wallet.reader.as_ref(), &wallet.chain, tx_hash)
            .await?;
        if !receipt.succeeded() {
            error!(contract = %step.contract, function = step.function, tx_hash = %tx_hash, "transaction reverted");
            return Err(TxError::Reverted {
                tx_hash: tx_hash.to_string(),
            });
        }
        info!(contract = %step.contract, function = step.function, tx_hash = %tx_hash, "transaction confirmed");
        progress(TxProgress::Confirmed {
            function: step.function,
            tx_hash,
        });
        Ok(receipt)
    }

    async fn wait_for_receipt(
        &self,
        reader: &dyn ReadClient,
        chain: &ChainProfile,
        tx_hash: B256,
    ) -> Result<TxReceipt, TxError> {
        let poll_interval = self.poll_interval.unwrap_or(chain.polling_interval);
        let poll = async {
            loop {
                match reader.transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(err) => warn!(tx_hash = %tx_hash, error = %err, "receipt poll failed"),
                }
                tokio::time::sleep(poll_interval).await;
            }
        };

        tokio::time::timeout(self.confirmation_timeout, poll)
            .await
            .map_err(|_| {
                warn!(tx_hash = %tx_hash, timeout_secs = self.confirmation_timeout.as_secs(), "confirmation timed out");
                TxError::ConfirmationTimeout {
                    tx_hash: tx_hash.to_string(),
                    explorer_url: chain.tx_url(&tx_hash.to_string()),
                }
            })
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
