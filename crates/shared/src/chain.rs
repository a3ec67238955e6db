use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ChainId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Static description of a chain the client can talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainProfile {
    pub id: ChainId,
    /// Configuration key, e.g. `pharos-devnet`.
    pub key: String,
    pub name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub explorer_name: String,
    pub explorer_url: String,
    pub testnet: bool,
    pub polling_interval: Duration,
    pub request_timeout: Duration,
    pub retry_count: u32,
    pub retry_delay: Duration,
}

impl ChainProfile {
    fn with_defaults(
        id: u64,
        key: &str,
        name: &str,
        native_currency: NativeCurrency,
        rpc_url: &str,
        explorer_name: &str,
        explorer_url: &str,
    ) -> Self {
        Self {
            id: ChainId(id),
            key: key.to_string(),
            name: name.to_string(),
            native_currency,
            rpc_urls: vec![rpc_url.to_string()],
            explorer_name: explorer_name.to_string(),
            explorer_url: explorer_url.to_string(),
            testnet: true,
            polling_interval: Duration::from_secs(4),
            request_timeout: Duration::from_secs(30),
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn pharos_devnet() -> Self {
        Self::with_defaults(
            50002,
            "pharos-devnet",
            "Pharos Devnet",
            NativeCurrency {
                name: "Pharos".to_string(),
                symbol: "PHA".to_string(),
                decimals: 18,
            },
            "https://devnet.dplabs-internal.com",
            "PharosScan",
            "https://pharosscan.xyz",
        )
    }

    pub fn base_sepolia() -> Self {
        Self::with_defaults(
            84532,
            "base-sepolia",
            "Base Sepolia",
            NativeCurrency {
                name: "Sepolia Ether".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            "https://sepolia.base.org",
            "BaseScan",
            "https://sepolia.basescan.org",
        )
    }

    pub fn builtin_profiles() -> Vec<ChainProfile> {
        vec![Self::pharos_devnet(), Self::base_sepolia()]
    }

    pub fn primary_rpc_url(&self) -> Option<&str> {
        self.rpc_urls.first().map(String::as_str)
    }

    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url.trim_end_matches('/'))
    }

    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{address}", self.explorer_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_carry_rpc_defaults() {
        let profiles = ChainProfile::builtin_profiles();
        assert_eq!(profiles.len(), 2);
        let devnet = &profiles[0];
        assert_eq!(devnet.id, ChainId(50002));
        assert_eq!(devnet.polling_interval, Duration::from_secs(4));
        assert_eq!(devnet.request_timeout, Duration::from_secs(30));
        assert_eq!(devnet.retry_count, 3);
        assert_eq!(
            devnet.primary_rpc_url(),
            Some("https://devnet.dplabs-internal.com")
        );
    }

    #[test]
    fn explorer_links_join_cleanly() {
        let mut profile = ChainProfile::base_sepolia();
        assert_eq!(
            profile.tx_url("0xabc"),
            "https://sepolia.basescan.org/tx/0xabc"
        );
        profile.explorer_url.push('/');
        assert_eq!(
            profile.address_url("0xdef"),
            "https://sepolia.basescan.org/address/0xdef"
        );
    }
}
