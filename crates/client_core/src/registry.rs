use std::collections::BTreeMap;

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use shared::{
    chain::ChainProfile,
    domain::{ChainId, ContractName, TokenId},
    error::TxError,
};
use thiserror::Error;

use crate::contracts::{abi_for, AbiDescriptor};

pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("chain {0} is not supported")]
    UnsupportedChain(ChainId),
    #[error("{contract} is not deployed on chain {chain_id}")]
    ContractNotDeployed {
        contract: ContractName,
        chain_id: ChainId,
    },
    #[error("{contract} has no function with selector 0x{selector}")]
    UnknownFunction {
        contract: ContractName,
        selector: String,
    },
    #[error("address book entry '{key}' is invalid: {message}")]
    InvalidAddressBook { key: String, message: String },
}

impl From<RegistryError> for TxError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::UnsupportedChain(chain_id) => TxError::UnsupportedChain(chain_id.0),
            RegistryError::ContractNotDeployed { contract, chain_id } => {
                TxError::ContractNotDeployed {
                    contract: contract.to_string(),
                    chain_id: chain_id.0,
                }
            }
            other => TxError::Unsupported(other.to_string()),
        }
    }
}

/// A contract resolved for a specific chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractRef {
    pub name: ContractName,
    pub address: Address,
    pub abi: AbiDescriptor,
}

impl ContractRef {
    pub fn ensure_function(&self, selector: [u8; 4]) -> Result<(), RegistryError> {
        if self.abi.contains(selector) {
            return Ok(());
        }
        Err(RegistryError::UnknownFunction {
            contract: self.name,
            selector: selector.iter().map(|b| format!("{b:02x}")).collect(),
        })
    }
}

/// Contract addresses for one chain. Missing or zero entries are "not deployed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub addresses: BTreeMap<ContractName, Address>,
    /// Account that receives `mintToOperator` and is listed as the live operator.
    pub operator: Option<Address>,
}

impl Deployment {
    /// Parses the `deployed-addresses.json` shape: `{"USDC": "0x..", "Operator": "0x..", ...}`.
    /// Unknown keys are ignored.
    pub fn from_address_book(book: &BTreeMap<String, String>) -> Result<Self, RegistryError> {
        let mut deployment = Deployment::default();
        for (key, raw) in book {
            let parse = || {
                raw.parse::<Address>()
                    .map_err(|err| RegistryError::InvalidAddressBook {
                        key: key.clone(),
                        message: err.to_string(),
                    })
            };
            if key == "Operator" {
                deployment.operator = Some(parse()?).filter(|a| !a.is_zero());
            } else if let Some(name) = ContractName::from_address_book_key(key) {
                deployment.addresses.insert(name, parse()?);
            }
        }
        Ok(deployment)
    }

    pub fn address(&self, contract: ContractName) -> Option<Address> {
        self.addresses
            .get(&contract)
            .copied()
            .filter(|address| !address.is_zero())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpec {
    pub id: TokenId,
    pub symbol: String,
    pub decimals: u8,
    pub contract: ContractName,
}

impl TokenSpec {
    fn default_for(id: TokenId) -> Self {
        Self {
            id,
            symbol: id.default_symbol().to_string(),
            decimals: DEFAULT_TOKEN_DECIMALS,
            contract: id.contract(),
        }
    }
}

/// Chain profiles, per-chain deployments and token configuration.
#[derive(Debug, Clone)]
pub struct Registry {
    chains: Vec<ChainProfile>,
    deployments: BTreeMap<ChainId, Deployment>,
    tokens: [TokenSpec; 4],
}

impl Registry {
    pub fn new(chains: Vec<ChainProfile>) -> Self {
        Self {
            chains,
            deployments: BTreeMap::new(),
            tokens: TokenId::ALL.map(TokenSpec::default_for),
        }
    }

    /// Built-in chain profiles with the known devnet and testnet deployments.
    pub fn builtin() -> Self {
        let mut registry = Self::new(ChainProfile::builtin_profiles());
        registry.set_deployment(ChainId(50002), pharos_devnet_deployment());
        registry.set_deployment(ChainId(84532), base_sepolia_deployment());
        registry
    }

    pub fn set_deployment(&mut self, chain_id: ChainId, deployment: Deployment) {
        self.deployments.insert(chain_id, deployment);
    }

    pub fn add_chain(&mut self, profile: ChainProfile) {
        self.chains.retain(|existing| existing.id != profile.id);
        self.chains.push(profile);
    }

    pub fn chains(&self) -> &[ChainProfile] {
        &self.chains
    }

    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainProfile> {
        self.chains.iter().find(|profile| profile.id == chain_id)
    }

    pub fn chain_by_key(&self, key: &str) -> Option<&ChainProfile> {
        self.chains.iter().find(|profile| profile.key == key)
    }

    pub fn deployment(&self, chain_id: ChainId) -> Result<&Deployment, RegistryError> {
        self.deployments
            .get(&chain_id)
            .ok_or(RegistryError::UnsupportedChain(chain_id))
    }

    pub fn resolve(&self, name: ContractName, chain_id: ChainId) -> Result<ContractRef, RegistryError> {
        let address = self
            .deployment(chain_id)?
            .address(name)
            .ok_or(RegistryError::ContractNotDeployed {
                contract: name,
                chain_id,
            })?;
        Ok(ContractRef {
            name,
            address,
            abi: abi_for(name),
        })
    }

    pub fn operator_account(&self, chain_id: ChainId) -> Result<Address, RegistryError> {
        self.deployment(chain_id)?
            .operator
            .ok_or_else(|| RegistryError::InvalidAddressBook {
                key: "Operator".to_string(),
                message: format!("no operator account configured for chain {chain_id}"),
            })
    }

    pub fn token(&self, id: TokenId) -> &TokenSpec {
        &self.tokens[id.index()]
    }

    pub fn tokens(&self) -> &[TokenSpec] {
        &self.tokens
    }

    pub fn set_decimals(&mut self, id: TokenId, decimals: u8) {
        self.tokens[id.index()].decimals = decimals;
    }
}

fn pharos_devnet_deployment() -> Deployment {
    let addresses = BTreeMap::from([
        (
            ContractName::ReserveToken,
            address!("0230Af50C53eC0f30c7a4C85E4eE6e6165Afb45C"),
        ),
        (
            ContractName::CollateralToken,
            address!("806fB8DbAF32176bE869FCa871dAdfa8d85cA4C5"),
        ),
        (
            ContractName::StableToken,
            address!("fb14DF2d11888016ccDB4577f5e4b719523299b7"),
        ),
        (
            ContractName::VaultToken,
            address!("e456cB1B47256331CcBa625C000ff639dC5a8349"),
        ),
        (
            ContractName::DelegationManager,
            address!("54d447731BC149381ab6DD94A35DCe70Ba0ea1Bc"),
        ),
        (
            ContractName::LoanManager,
            address!("889F3dD9e729168b9162CCDFa6Aa7A9F6cE0a087"),
        ),
    ]);
    Deployment {
        addresses,
        operator: Some(address!("2Ab98Ca74DC10853F5702345a709e2ad0D1727C9")),
    }
}

/// Only the reserve and stable tokens are live on Base Sepolia.
fn base_sepolia_deployment() -> Deployment {
    let addresses = BTreeMap::from([
        (
            ContractName::ReserveToken,
            address!("f12F7584143D17169905D7954D3DEab8942a310d"),
        ),
        (
            ContractName::StableToken,
            address!("52d336d5fB92A28a95fE22A089eb4c99209263D6"),
        ),
        (ContractName::CollateralToken, Address::ZERO),
        (ContractName::VaultToken, Address::ZERO),
        (ContractName::DelegationManager, Address::ZERO),
        (ContractName::LoanManager, Address::ZERO),
    ]);
    Deployment {
        addresses,
        operator: None,
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
