use std::sync::atomic::AtomicUsize;

use super::*;
use crate::clients::WalletClient;
use crate::contracts::{IMintable, IVault};
use alloy::primitives::{Address, U256};
use alloy::sol_types::{Revert, SolError};
use async_trait::async_trait;
use shared::domain::ChainId;

fn rpc_error(message: &str, data: Option<Value>) -> RpcError {
    RpcError::Rpc {
        method: "eth_call".into(),
        code: 3,
        message: message.into(),
        data,
    }
}

fn revert_data(reason: &str) -> String {
    Bytes::from(
        Revert {
            reason: reason.to_string(),
        }
        .abi_encode(),
    )
    .to_string()
}

#[test]
fn revert_reason_prefers_encoded_error_data() {
    let err = rpc_error(
        "execution reverted",
        Some(Value::String(revert_data("Insufficient collateral"))),
    );
    let reason = revert_reason(&err).unwrap();
    assert!(reason.contains("Insufficient collateral"), "{reason}");

    let nested = rpc_error(
        "execution reverted",
        Some(json_object("data", &revert_data("Loan already active"))),
    );
    assert!(revert_reason(&nested).unwrap().contains("Loan already active"));
}

fn json_object(key: &str, value: &str) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), Value::String(value.to_string()));
    Value::Object(map)
}

#[test]
fn revert_reason_falls_back_to_message() {
    let err = rpc_error("execution reverted: ERC20: insufficient allowance", None);
    assert_eq!(
        revert_reason(&err).as_deref(),
        Some("ERC20: insufficient allowance")
    );

    let bare = rpc_error("execution reverted", Some(Value::String("0x".into())));
    assert_eq!(revert_reason(&bare), None);
    assert_eq!(
        simulation_error(bare),
        TxError::SimulationReverted { reason: None }
    );
}

#[test]
fn rpc_failures_map_to_user_facing_errors() {
    let transport = RpcError::Transport {
        method: "eth_call".into(),
        message: "connection refused".into(),
    };
    assert!(matches!(
        simulation_error(transport.clone()),
        TxError::Transport(_)
    ));
    assert!(matches!(send_error(transport), TxError::Transport(_)));

    let rejected = RpcError::Rpc {
        method: "eth_sendTransaction".into(),
        code: 4001,
        message: "User rejected the request.".into(),
        data: None,
    };
    assert_eq!(send_error(rejected), TxError::UserRejected);

    let nonce = RpcError::Rpc {
        method: "eth_sendTransaction".into(),
        code: -32000,
        message: "nonce too low".into(),
        data: None,
    };
    assert!(matches!(send_error(nonce), TxError::Submission(msg) if msg.contains("nonce too low")));
}

#[test]
fn in_flight_ticket_is_exclusive_and_released_on_drop() {
    let flag = InFlight::new();
    let shared = flag.clone();
    let ticket = flag.try_begin().unwrap();
    assert!(shared.is_active());
    assert!(shared.try_begin().is_none());
    drop(ticket);
    assert!(!flag.is_active());
    assert!(shared.try_begin().is_some());
}

#[tokio::test]
async fn aborting_a_task_releases_the_ticket() {
    let flag = InFlight::new();
    let ticket = flag.try_begin().unwrap();
    let task = tokio::spawn(async move {
        let _ticket = ticket;
        std::future::pending::<()>().await;
    });
    tokio::task::yield_now().await;
    assert!(flag.is_active());

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert!(!flag.is_active());
}

#[test]
fn plan_steps_carry_encoded_calls() {
    let receiver = Address::repeat_byte(0x22);
    let plan = ActionPlan::new("deposit PUSD", "Successfully deposited 1 PUSD").step(
        ContractName::VaultToken,
        &IVault::depositCall {
            assets: U256::from(7u64),
            receiver,
        },
    );
    let step = &plan.steps[0];
    assert_eq!(step.function, "deposit(uint256,address)");
    assert_eq!(step.selector, IVault::depositCall::SELECTOR);
    assert_eq!(&step.data[..4], IVault::depositCall::SELECTOR.as_slice());
    let decoded = IVault::depositCall::abi_decode(&step.data, true).unwrap();
    assert_eq!(decoded.assets, U256::from(7u64));
    assert_eq!(decoded.receiver, receiver);
}

#[test]
fn progress_reads_as_status_text() {
    let tx_hash = B256::ZERO;
    assert_eq!(
        TxProgress::AwaitingSignature {
            function: "mint(uint256)"
        }
        .to_string(),
        "Confirm mint(uint256) in your wallet"
    );
    assert_eq!(
        TxProgress::Confirmed {
            function: "mint(uint256)",
            tx_hash
        }
        .to_string(),
        "mint(uint256) confirmed"
    );
}

/// Counts every request and fails it; execution tests below must never reach it.
#[derive(Default)]
struct UnreachableChain {
    requests: AtomicUsize,
}

impl UnreachableChain {
    fn hit(&self, method: &str) -> RpcError {
        self.requests.fetch_add(1, Ordering::SeqCst);
        RpcError::Transport {
            method: method.into(),
            message: "unreachable".into(),
        }
    }
}

#[async_trait]
impl ReadClient for UnreachableChain {
    async fn chain_id(&self) -> Result<ChainId, RpcError> {
        Err(self.hit("eth_chainId"))
    }
    async fn call(&self, _request: &CallRequest) -> Result<Bytes, RpcError> {
        Err(self.hit("eth_call"))
    }
    async fn estimate_gas(&self, _request: &CallRequest) -> Result<u64, RpcError> {
        Err(self.hit("eth_estimateGas"))
    }
    async fn transaction_receipt(&self, _tx_hash: B256) -> Result<Option<TxReceipt>, RpcError> {
        Err(self.hit("eth_getTransactionReceipt"))
    }
}

/// Connects on the devnet; sends are never expected.
struct DevnetWallet;

#[async_trait]
impl WalletClient for DevnetWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, RpcError> {
        Ok(vec![Address::repeat_byte(0xaa)])
    }
    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        Ok(vec![Address::repeat_byte(0xaa)])
    }
    async fn chain_id(&self) -> Result<ChainId, RpcError> {
        Ok(ChainId(50002))
    }
    async fn send_transaction(&self, _request: &CallRequest) -> Result<B256, RpcError> {
        Err(RpcError::Transport {
            method: "eth_sendTransaction".into(),
            message: "unexpected send".into(),
        })
    }
}

#[tokio::test]
async fn steps_outside_the_contract_abi_are_rejected_before_simulation() {
    let reader = Arc::new(UnreachableChain::default());
    let session = WalletSession::new(
        ChainProfile::pharos_devnet(),
        Arc::clone(&reader) as Arc<dyn ReadClient>,
        Arc::new(DevnetWallet),
    );
    session.connect().await.unwrap();
    let registry = Registry::builtin();
    let flag = InFlight::new();
    let ticket = flag.try_begin().unwrap();

    // The stable token has no open mint.
    let plan = ActionPlan::new("mint PUSD", "minted").step(
        ContractName::StableToken,
        &IMintable::mintCall {
            amount: U256::from(1u64),
        },
    );
    let err = TxOrchestrator::default()
        .execute(&session, &registry, &ticket, &plan, &|_| {})
        .await
        .unwrap_err();
    assert!(
        matches!(&err, TxError::Unsupported(msg) if msg.contains("stable-token")),
        "{err:?}"
    );
    assert_eq!(reader.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn undeployed_contract_is_reported_before_simulation() {
    let reader = Arc::new(UnreachableChain::default());
    let session = WalletSession::new(
        ChainProfile::pharos_devnet(),
        Arc::clone(&reader) as Arc<dyn ReadClient>,
        Arc::new(DevnetWallet),
    );
    session.connect().await.unwrap();
    let mut registry = Registry::builtin();
    registry.set_deployment(ChainId(50002), crate::registry::Deployment::default());
    let flag = InFlight::new();
    let ticket = flag.try_begin().unwrap();

    let plan = ActionPlan::new("mint USDC", "minted").step(
        ContractName::ReserveToken,
        &IMintable::mintCall {
            amount: U256::from(1u64),
        },
    );
    let err = TxOrchestrator::default()
        .execute(&session, &registry, &ticket, &plan, &|_| {})
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TxError::ContractNotDeployed {
            contract: "reserve-token".into(),
            chain_id: 50002
        }
    );
    assert_eq!(reader.requests.load(Ordering::SeqCst), 0);
}
