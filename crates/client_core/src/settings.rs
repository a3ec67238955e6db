use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use shared::{
    chain::ChainProfile,
    domain::{DataSource, TokenId},
    units::MAX_DECIMALS,
};
use thiserror::Error;
use url::Url;

use crate::registry::{Deployment, Registry, RegistryError};

pub const DEFAULT_SETTINGS_FILE: &str = "vmoney.toml";
pub const DEFAULT_WALLET_URL: &str = "http://127.0.0.1:1248";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("unknown chain '{0}'")]
    UnknownChain(String),
    #[error("{field} is not a valid URL: {message}")]
    InvalidUrl { field: &'static str, message: String },
    #[error("failed to read deployments file '{path}': {message}")]
    DeploymentsFile { path: PathBuf, message: String },
    #[error("unknown token '{0}' in [tokens]")]
    UnknownToken(String),
    #[error("token '{symbol}' has {decimals} decimals; at most {max} are supported", max = MAX_DECIMALS)]
    DecimalsOutOfRange { symbol: String, decimals: u8 },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOverride {
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Key of a built-in chain profile.
    pub chain: String,
    pub rpc_url: Option<String>,
    /// EIP-1193 JSON-RPC wallet endpoint. Empty disables writes.
    pub wallet_url: Option<String>,
    pub data_source: DataSource,
    pub confirmation_timeout_secs: u64,
    pub notification_ttl_secs: u64,
    pub preview_debounce_ms: u64,
    pub deployments_file: Option<PathBuf>,
    pub tokens: BTreeMap<String, TokenOverride>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chain: "pharos-devnet".into(),
            rpc_url: None,
            wallet_url: Some(DEFAULT_WALLET_URL.into()),
            data_source: DataSource::Live,
            confirmation_timeout_secs: 120,
            notification_ttl_secs: 5,
            preview_debounce_ms: 300,
            deployments_file: None,
            tokens: BTreeMap::new(),
        }
    }
}

/// Defaults, then `vmoney.toml` (or `path`, which must exist), then `APP__*` environment variables.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
    };
    let settings = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<Settings>()?;
    Ok(settings)
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, SettingsError> {
    let url = Url::parse(raw).map_err(|err| SettingsError::InvalidUrl {
        field,
        message: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SettingsError::InvalidUrl {
            field,
            message: format!("unsupported scheme '{other}'"),
        }),
    }
}

impl Settings {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.notification_ttl_secs)
    }

    pub fn preview_debounce(&self) -> Duration {
        Duration::from_millis(self.preview_debounce_ms)
    }

    /// Built-in registry with the deployments file and token overrides applied.
    pub fn build_registry(&self) -> Result<Registry, SettingsError> {
        let mut registry = Registry::builtin();
        let chain_id = registry
            .chain_by_key(&self.chain)
            .map(|profile| profile.id)
            .ok_or_else(|| SettingsError::UnknownChain(self.chain.clone()))?;

        if let Some(path) = &self.deployments_file {
            let read_err = |message: String| SettingsError::DeploymentsFile {
                path: path.clone(),
                message,
            };
            let raw = fs::read_to_string(path).map_err(|err| read_err(err.to_string()))?;
            let book: BTreeMap<String, String> =
                serde_json::from_str(&raw).map_err(|err| read_err(err.to_string()))?;
            registry.set_deployment(chain_id, Deployment::from_address_book(&book)?);
        }

        for (symbol, token) in &self.tokens {
            let id = TokenId::from_symbol(symbol)
                .ok_or_else(|| SettingsError::UnknownToken(symbol.clone()))?;
            if token.decimals > MAX_DECIMALS {
                return Err(SettingsError::DecimalsOutOfRange {
                    symbol: symbol.clone(),
                    decimals: token.decimals,
                });
            }
            registry.set_decimals(id, token.decimals);
        }
        Ok(registry)
    }

    /// The selected profile, with `rpc_url` taking precedence over its built-in endpoints.
    pub fn chain_profile(&self, registry: &Registry) -> Result<ChainProfile, SettingsError> {
        let mut profile = registry
            .chain_by_key(&self.chain)
            .cloned()
            .ok_or_else(|| SettingsError::UnknownChain(self.chain.clone()))?;
        if let Some(rpc_url) = self.rpc_url.as_deref().filter(|url| !url.trim().is_empty()) {
            parse_url("rpc_url", rpc_url)?;
            profile.rpc_urls.insert(0, rpc_url.to_string());
        }
        Ok(profile)
    }

    pub fn rpc_endpoint(&self, profile: &ChainProfile) -> Result<Url, SettingsError> {
        let raw = profile.primary_rpc_url().ok_or(SettingsError::InvalidUrl {
            field: "rpc_url",
            message: format!("chain '{}' has no RPC endpoint", profile.key),
        })?;
        parse_url("rpc_url", raw)
    }

    pub fn wallet_endpoint(&self) -> Result<Option<Url>, SettingsError> {
        self.wallet_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| parse_url("wallet_url", url))
            .transpose()
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
