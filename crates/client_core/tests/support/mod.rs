#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy::primitives::{Address, Bytes, B256, U256, U64};
use alloy::sol_types::{Revert, SolCall, SolError};
use async_trait::async_trait;
use client_core::{
    clients::{CallRequest, ReadClient, TxReceipt, WalletClient},
    contracts::{IDelegationManager, ILoanManager, IMintable, IStableToken, IVault, IERC20},
    orchestrator::{TxOrchestrator, TxProgress},
    registry::Registry,
    rpc::RpcError,
    session::WalletSession,
    AppContext,
};
use shared::{
    chain::ChainProfile,
    domain::{ChainId, ContractName, DataSource, TokenId},
    units::parse_units,
};

pub const ACCOUNT: Address = Address::repeat_byte(0xaa);

pub fn units(amount: &str) -> U256 {
    parse_units(amount, 18).expect("valid test amount")
}

pub fn no_progress() -> Arc<dyn Fn(TxProgress) + Send + Sync> {
    Arc::new(|_| {})
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub contract: Option<ContractName>,
    pub function: Option<&'static str>,
    pub args: Bytes,
    pub chain_id: Option<ChainId>,
}

#[derive(Debug, Clone, Default)]
pub struct MockLoan {
    pub amount: U256,
    pub interest_bps: U256,
    pub start_time: u64,
    pub due_time: u64,
    pub is_repaid: bool,
    pub collateral: U256,
    pub loaned: U256,
    pub repayment: U256,
}

#[derive(Debug, Clone, Default)]
struct Ledger {
    balances: HashMap<(TokenId, Address), U256>,
    allowances: HashMap<(TokenId, Address, Address), U256>,
    delegated: HashMap<Address, U256>,
    loans: HashMap<Address, MockLoan>,
    vault_assets: U256,
    /// Shares minted per asset, as numerator / denominator.
    share_rate: (u64, u64),
}

#[derive(Debug)]
struct ChainState {
    wallet_chain: ChainId,
    read_chain: ChainId,
    accounts: Vec<Address>,
    ledger: Ledger,
    calls: Vec<RecordedCall>,
    sent: Vec<B256>,
    reject_signatures: bool,
    revert_on_chain: bool,
    withhold_receipts: bool,
}

/// In-memory chain and wallet that simulate the protocol contracts closely enough
/// for controller scenarios. Every request is recorded.
pub struct MockChain {
    contracts: HashMap<Address, ContractName>,
    addresses: HashMap<ContractName, Address>,
    operator: Option<Address>,
    state: Mutex<ChainState>,
}

fn revert(message: &str) -> RpcError {
    let data = Bytes::from(
        Revert {
            reason: message.to_string(),
        }
        .abi_encode(),
    );
    RpcError::Rpc {
        method: "eth_call".into(),
        code: 3,
        message: "execution reverted".into(),
        data: Some(serde_json::Value::String(data.to_string())),
    }
}

fn word(value: U256) -> Vec<u8> {
    value.to_be_bytes::<32>().to_vec()
}

fn words(values: &[U256]) -> Bytes {
    Bytes::from(values.iter().flat_map(|v| word(*v)).collect::<Vec<u8>>())
}

fn token_of(contract: ContractName) -> Option<TokenId> {
    match contract {
        ContractName::ReserveToken => Some(TokenId::Reserve),
        ContractName::CollateralToken => Some(TokenId::Collateral),
        ContractName::StableToken => Some(TokenId::Stable),
        ContractName::VaultToken => Some(TokenId::VaultShare),
        _ => None,
    }
}

impl Ledger {
    fn balance(&self, token: TokenId, owner: Address) -> U256 {
        self.balances
            .get(&(token, owner))
            .copied()
            .unwrap_or_default()
    }

    fn credit(&mut self, token: TokenId, owner: Address, amount: U256) {
        *self.balances.entry((token, owner)).or_default() += amount;
    }

    fn debit(&mut self, token: TokenId, owner: Address, amount: U256) -> Result<(), RpcError> {
        let balance = self.balance(token, owner);
        if balance < amount {
            return Err(revert("ERC20: transfer amount exceeds balance"));
        }
        self.balances.insert((token, owner), balance - amount);
        Ok(())
    }

    fn spend_allowance(
        &mut self,
        token: TokenId,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), RpcError> {
        let allowance = self
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default();
        if allowance < amount {
            return Err(revert("ERC20: insufficient allowance"));
        }
        self.allowances
            .insert((token, owner, spender), allowance - amount);
        Ok(())
    }

    fn total_supply(&self, token: TokenId) -> U256 {
        self.balances
            .iter()
            .filter(|((t, _), _)| *t == token)
            .map(|(_, v)| *v)
            .fold(U256::ZERO, |acc, v| acc + v)
    }

    fn preview_deposit(&self, assets: U256) -> U256 {
        assets * U256::from(self.share_rate.0) / U256::from(self.share_rate.1)
    }

    fn preview_redeem(&self, shares: U256) -> U256 {
        shares * U256::from(self.share_rate.1) / U256::from(self.share_rate.0)
    }
}

impl MockChain {
    pub fn new(registry: &Registry, chain_id: ChainId) -> Arc<Self> {
        let mut contracts = HashMap::new();
        let mut addresses = HashMap::new();
        for name in ContractName::ALL {
            if let Ok(contract) = registry.resolve(name, chain_id) {
                contracts.insert(contract.address, name);
                addresses.insert(name, contract.address);
            }
        }
        Arc::new(Self {
            contracts,
            addresses,
            operator: registry.operator_account(chain_id).ok(),
            state: Mutex::new(ChainState {
                wallet_chain: chain_id,
                read_chain: chain_id,
                accounts: vec![ACCOUNT],
                ledger: Ledger {
                    share_rate: (1, 1),
                    ..Ledger::default()
                },
                calls: Vec::new(),
                sent: Vec::new(),
                reject_signatures: false,
                revert_on_chain: false,
                withhold_receipts: false,
            }),
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        let mut state = self.state.lock().expect("mock chain lock");
        f(&mut state)
    }

    pub fn address(&self, name: ContractName) -> Address {
        self.addresses[&name]
    }

    pub fn set_balance(&self, token: TokenId, owner: Address, amount: U256) {
        self.with_state(|s| {
            s.ledger.balances.insert((token, owner), amount);
        });
    }

    pub fn balance(&self, token: TokenId, owner: Address) -> U256 {
        self.with_state(|s| s.ledger.balance(token, owner))
    }

    pub fn set_delegated(&self, owner: Address, amount: U256) {
        self.with_state(|s| {
            s.ledger.delegated.insert(owner, amount);
        });
    }

    pub fn set_loan(&self, borrower: Address, loan: MockLoan) {
        self.with_state(|s| {
            s.ledger.loans.insert(borrower, loan);
        });
    }

    pub fn loan(&self, borrower: Address) -> Option<MockLoan> {
        self.with_state(|s| s.ledger.loans.get(&borrower).cloned())
    }

    pub fn set_share_rate(&self, numerator: u64, denominator: u64) {
        self.with_state(|s| s.ledger.share_rate = (numerator, denominator));
    }

    pub fn set_vault_assets(&self, assets: U256) {
        self.with_state(|s| s.ledger.vault_assets = assets);
    }

    pub fn set_wallet_chain(&self, chain_id: ChainId) {
        self.with_state(|s| s.wallet_chain = chain_id);
    }

    pub fn reject_signatures(&self) {
        self.with_state(|s| s.reject_signatures = true);
    }

    pub fn revert_on_chain(&self) {
        self.with_state(|s| s.revert_on_chain = true);
    }

    pub fn withhold_receipts(&self) {
        self.with_state(|s| s.withhold_receipts = true);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn clear_calls(&self) {
        self.with_state(|s| s.calls.clear());
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| c.method == method).count()
    }

    /// `eth_call` requests for `function` against `contract`.
    pub fn view_count(&self, contract: ContractName, function: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| {
                c.method == "eth_call"
                    && c.contract == Some(contract)
                    && c.function == Some(function)
            })
            .count()
    }

    /// Functions of every `eth_sendTransaction`, in order.
    pub fn sent_functions(&self) -> Vec<&'static str> {
        self.calls()
            .iter()
            .filter(|c| c.method == "eth_sendTransaction")
            .filter_map(|c| c.function)
            .collect()
    }

    pub fn sent_chain_ids(&self) -> Vec<Option<ChainId>> {
        self.calls()
            .iter()
            .filter(|c| c.method == "eth_sendTransaction")
            .map(|c| c.chain_id)
            .collect()
    }

    fn record(&self, method: &'static str, request: Option<&CallRequest>) {
        let (contract, function, args, chain_id) = match request {
            Some(request) => (
                self.contracts.get(&request.to).copied(),
                function_name(&request.data),
                request.data.clone(),
                request.chain_id.map(|id| ChainId(id.to::<u64>())),
            ),
            None => (None, None, Bytes::new(), None),
        };
        self.with_state(|s| {
            s.calls.push(RecordedCall {
                method,
                contract,
                function,
                args,
                chain_id,
            })
        });
    }

    fn evaluate(&self, ledger: &mut Ledger, request: &CallRequest) -> Result<Bytes, RpcError> {
        let contract = self
            .contracts
            .get(&request.to)
            .copied()
            .ok_or_else(|| revert("call to non-contract"))?;
        let from = request.from.unwrap_or(Address::ZERO);
        let data = request.data.as_ref();
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| revert("missing selector"))?;
        let decode_err = |_| revert("bad calldata");

        if let Some(token) = token_of(contract) {
            if selector == IERC20::balanceOfCall::SELECTOR {
                let call = IERC20::balanceOfCall::abi_decode(data, true).map_err(decode_err)?;
                return Ok(words(&[ledger.balance(token, call.owner)]));
            }
            if selector == IERC20::totalSupplyCall::SELECTOR {
                return Ok(words(&[ledger.total_supply(token)]));
            }
            if selector == IERC20::approveCall::SELECTOR {
                let call = IERC20::approveCall::abi_decode(data, true).map_err(decode_err)?;
                ledger
                    .allowances
                    .insert((token, from, call.spender), call.amount);
                return Ok(words(&[U256::from(1u64)]));
            }
            if selector == IMintable::mintCall::SELECTOR {
                let call = IMintable::mintCall::abi_decode(data, true).map_err(decode_err)?;
                ledger.credit(token, from, call.amount);
                return Ok(Bytes::new());
            }
        }

        match contract {
            ContractName::StableToken if selector == IStableToken::depositAndMintCall::SELECTOR => {
                let call =
                    IStableToken::depositAndMintCall::abi_decode(data, true).map_err(decode_err)?;
                ledger.spend_allowance(TokenId::Reserve, from, request.to, call.amount)?;
                ledger.debit(TokenId::Reserve, from, call.amount)?;
                ledger.credit(TokenId::Stable, from, call.amount);
                Ok(Bytes::new())
            }
            ContractName::StableToken if selector == IStableToken::mintToOperatorCall::SELECTOR => {
                let call =
                    IStableToken::mintToOperatorCall::abi_decode(data, true).map_err(decode_err)?;
                let operator = self.operator.ok_or_else(|| revert("operator not set"))?;
                ledger.credit(TokenId::Stable, operator, call.amount);
                Ok(Bytes::new())
            }
            ContractName::VaultToken if selector == IVault::totalAssetsCall::SELECTOR => {
                Ok(words(&[ledger.vault_assets]))
            }
            ContractName::VaultToken if selector == IVault::previewDepositCall::SELECTOR => {
                let call = IVault::previewDepositCall::abi_decode(data, true).map_err(decode_err)?;
                Ok(words(&[ledger.preview_deposit(call.assets)]))
            }
            ContractName::VaultToken if selector == IVault::previewRedeemCall::SELECTOR => {
                let call = IVault::previewRedeemCall::abi_decode(data, true).map_err(decode_err)?;
                Ok(words(&[ledger.preview_redeem(call.shares)]))
            }
            ContractName::VaultToken if selector == IVault::depositCall::SELECTOR => {
                let call = IVault::depositCall::abi_decode(data, true).map_err(decode_err)?;
                ledger.spend_allowance(TokenId::Stable, from, request.to, call.assets)?;
                ledger.debit(TokenId::Stable, from, call.assets)?;
                let shares = ledger.preview_deposit(call.assets);
                ledger.vault_assets += call.assets;
                ledger.credit(TokenId::VaultShare, call.receiver, shares);
                Ok(words(&[shares]))
            }
            ContractName::VaultToken if selector == IVault::redeemCall::SELECTOR => {
                let call = IVault::redeemCall::abi_decode(data, true).map_err(decode_err)?;
                ledger.debit(TokenId::VaultShare, call.owner, call.shares)?;
                let assets = ledger.preview_redeem(call.shares);
                ledger.vault_assets -= assets;
                ledger.credit(TokenId::Stable, call.receiver, assets);
                Ok(words(&[assets]))
            }
            ContractName::DelegationManager
                if selector == IDelegationManager::getDelegatedAmountCall::SELECTOR =>
            {
                let call = IDelegationManager::getDelegatedAmountCall::abi_decode(data, true)
                    .map_err(decode_err)?;
                Ok(words(&[ledger
                    .delegated
                    .get(&call.delegator)
                    .copied()
                    .unwrap_or_default()]))
            }
            ContractName::DelegationManager
                if selector == IDelegationManager::addDelegationCall::SELECTOR =>
            {
                let call = IDelegationManager::addDelegationCall::abi_decode(data, true)
                    .map_err(decode_err)?;
                ledger.debit(TokenId::Collateral, from, call.amount)?;
                *ledger.delegated.entry(from).or_default() += call.amount;
                Ok(Bytes::new())
            }
            ContractName::DelegationManager
                if selector == IDelegationManager::removeDelegationCall::SELECTOR =>
            {
                let call = IDelegationManager::removeDelegationCall::abi_decode(data, true)
                    .map_err(decode_err)?;
                let delegated = ledger.delegated.get(&from).copied().unwrap_or_default();
                if delegated < call.amount {
                    return Err(revert("Insufficient delegated amount"));
                }
                ledger.delegated.insert(from, delegated - call.amount);
                ledger.credit(TokenId::Collateral, from, call.amount);
                Ok(Bytes::new())
            }
            ContractName::LoanManager if selector == ILoanManager::getLoanDetailsCall::SELECTOR => {
                let loan = ledger.loans.get(&from).cloned().unwrap_or_default();
                Ok(words(&[
                    loan.amount,
                    loan.interest_bps,
                    U256::from(loan.start_time),
                    U256::from(loan.due_time),
                    U256::from(u64::from(loan.is_repaid)),
                    loan.collateral,
                    loan.loaned,
                ]))
            }
            ContractName::LoanManager
                if selector == ILoanManager::calculateRepaymentAmountCall::SELECTOR =>
            {
                match ledger.loans.get(&from) {
                    Some(loan) if !loan.is_repaid => Ok(words(&[loan.repayment])),
                    _ => Err(revert("No active loan")),
                }
            }
            ContractName::LoanManager if selector == ILoanManager::createLoanCall::SELECTOR => {
                let call = ILoanManager::createLoanCall::abi_decode(data, true).map_err(decode_err)?;
                if ledger.loans.get(&from).is_some_and(|loan| !loan.is_repaid) {
                    return Err(revert("Active loan exists"));
                }
                ledger.loans.insert(
                    from,
                    MockLoan {
                        amount: call.amount,
                        interest_bps: U256::from(500u64),
                        start_time: 1_700_000_000,
                        due_time: 1_702_592_000,
                        is_repaid: false,
                        collateral: call.amount * U256::from(3u64) / U256::from(2u64),
                        loaned: call.amount,
                        repayment: call.amount + call.amount / U256::from(20u64),
                    },
                );
                ledger.credit(TokenId::Stable, from, call.amount);
                Ok(Bytes::new())
            }
            ContractName::LoanManager if selector == ILoanManager::repayLoanCall::SELECTOR => {
                let repayment = match ledger.loans.get(&from) {
                    Some(loan) if !loan.is_repaid => loan.repayment,
                    _ => return Err(revert("No active loan")),
                };
                ledger.debit(TokenId::Stable, from, repayment)?;
                if let Some(loan) = ledger.loans.get_mut(&from) {
                    loan.is_repaid = true;
                }
                Ok(Bytes::new())
            }
            ContractName::LoanManager if selector == ILoanManager::slashLoanCall::SELECTOR => {
                let call = ILoanManager::slashLoanCall::abi_decode(data, true).map_err(decode_err)?;
                ledger.delegated.insert(call.borrower, U256::ZERO);
                Ok(Bytes::new())
            }
            _ => Err(revert("unknown function")),
        }
    }
}

fn function_name(data: &Bytes) -> Option<&'static str> {
    let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
    ContractName::ALL
        .into_iter()
        .map(client_core::contracts::abi_for)
        .find_map(|abi| abi.function(selector).map(|f| f.signature))
}

#[async_trait]
impl ReadClient for MockChain {
    async fn chain_id(&self) -> Result<ChainId, RpcError> {
        self.record("eth_chainId", None);
        Ok(self.with_state(|s| s.read_chain))
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, RpcError> {
        self.record("eth_call", Some(request));
        let mut scratch = self.with_state(|s| s.ledger.clone());
        self.evaluate(&mut scratch, request)
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, RpcError> {
        self.record("eth_estimateGas", Some(request));
        let mut scratch = self.with_state(|s| s.ledger.clone());
        self.evaluate(&mut scratch, request).map(|_| 21_000)
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, RpcError> {
        self.record("eth_getTransactionReceipt", None);
        Ok(self.with_state(|s| {
            if s.withhold_receipts || !s.sent.contains(&tx_hash) {
                return None;
            }
            Some(TxReceipt {
                transaction_hash: tx_hash,
                block_number: Some(U64::from(100u64 + s.sent.len() as u64)),
                status: Some(U64::from(u64::from(!s.revert_on_chain))),
            })
        }))
    }
}

#[async_trait]
impl WalletClient for MockChain {
    async fn request_accounts(&self) -> Result<Vec<Address>, RpcError> {
        self.record("eth_requestAccounts", None);
        Ok(self.with_state(|s| s.accounts.clone()))
    }

    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        self.record("eth_accounts", None);
        Ok(self.with_state(|s| s.accounts.clone()))
    }

    async fn chain_id(&self) -> Result<ChainId, RpcError> {
        self.record("wallet_chainId", None);
        Ok(self.with_state(|s| s.wallet_chain))
    }

    async fn send_transaction(&self, request: &CallRequest) -> Result<B256, RpcError> {
        self.record("eth_sendTransaction", Some(request));
        if self.with_state(|s| s.reject_signatures) {
            return Err(RpcError::Rpc {
                method: "eth_sendTransaction".into(),
                code: 4001,
                message: "User rejected the request.".into(),
                data: None,
            });
        }
        let mut ledger = self.with_state(|s| s.ledger.clone());
        self.evaluate(&mut ledger, request)?;
        Ok(self.with_state(|s| {
            if !s.revert_on_chain {
                s.ledger = ledger;
            }
            let hash = B256::with_last_byte(s.sent.len() as u8 + 1);
            s.sent.push(hash);
            hash
        }))
    }
}

/// A fast-polling context over `chain` for the profile `profile`.
pub fn context_for(
    chain: &Arc<MockChain>,
    registry: Registry,
    profile: ChainProfile,
    data_source: DataSource,
) -> AppContext {
    let session = WalletSession::new(
        profile,
        Arc::clone(chain) as Arc<dyn ReadClient>,
        Arc::clone(chain) as Arc<dyn WalletClient>,
    );
    AppContext::new(Arc::new(registry), session, data_source).with_orchestrator(
        TxOrchestrator::new(Duration::from_millis(200)).with_poll_interval(Duration::from_millis(5)),
    )
}

/// Devnet context with a connected wallet.
pub async fn connected_devnet() -> (Arc<MockChain>, AppContext) {
    let registry = Registry::builtin();
    let chain = MockChain::new(&registry, ChainId(50002));
    let ctx = context_for(&chain, registry, ChainProfile::pharos_devnet(), DataSource::Live);
    ctx.session.connect().await.expect("connect mock wallet");
    chain.clear_calls();
    (chain, ctx)
}
