use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

use super::*;
use shared::domain::{ChainId, ContractName};

fn temp_dir(tag: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("vmoney_settings_{tag}_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    dir
}

#[test]
fn defaults_select_pharos_devnet_and_frame() {
    let settings = Settings::default();
    let registry = settings.build_registry().expect("registry");
    let profile = settings.chain_profile(&registry).expect("profile");
    assert_eq!(profile.id, ChainId(50002));
    assert_eq!(
        settings.wallet_endpoint().expect("wallet url").map(|u| u.to_string()),
        Some("http://127.0.0.1:1248/".to_string())
    );
    assert_eq!(settings.notification_ttl(), Duration::from_secs(5));
    assert_eq!(settings.preview_debounce(), Duration::from_millis(300));
}

#[test]
fn file_then_environment_layering() {
    let dir = temp_dir("layering");
    let path = dir.join("vmoney.toml");
    fs::write(
        &path,
        r#"
chain = "base-sepolia"
rpc_url = "http://127.0.0.1:8545"
data_source = "mock"
confirmation_timeout_secs = 30

[tokens.USDC]
decimals = 6
"#,
    )
    .expect("write settings");

    let settings = load_settings(Some(&path)).expect("load from file");
    assert_eq!(settings.chain, "base-sepolia");
    assert_eq!(settings.data_source, DataSource::Mock);
    assert_eq!(settings.confirmation_timeout(), Duration::from_secs(30));

    let registry = settings.build_registry().expect("registry");
    assert_eq!(registry.token(TokenId::Reserve).decimals, 6);
    let profile = settings.chain_profile(&registry).expect("profile");
    assert_eq!(profile.primary_rpc_url(), Some("http://127.0.0.1:8545"));

    env::set_var("APP__NOTIFICATION_TTL_SECS", "9");
    let overridden = load_settings(Some(&path));
    env::remove_var("APP__NOTIFICATION_TTL_SECS");
    assert_eq!(
        overridden.expect("load with env").notification_ttl(),
        Duration::from_secs(9)
    );

    fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn deployments_file_replaces_builtin_addresses() {
    let dir = temp_dir("deployments");
    let path = dir.join("deployed-addresses.json");
    fs::write(
        &path,
        r#"{"USDC":"0x1111111111111111111111111111111111111111","Operator":"0x2222222222222222222222222222222222222222"}"#,
    )
    .expect("write address book");

    let settings = Settings {
        deployments_file: Some(path),
        ..Settings::default()
    };
    let registry = settings.build_registry().expect("registry");
    let usdc = registry
        .resolve(ContractName::ReserveToken, ChainId(50002))
        .expect("usdc");
    assert_eq!(
        usdc.address.to_string().to_lowercase(),
        "0x1111111111111111111111111111111111111111"
    );
    assert!(matches!(
        registry.resolve(ContractName::LoanManager, ChainId(50002)),
        Err(RegistryError::ContractNotDeployed { .. })
    ));

    fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn rejects_unknown_chain_token_and_bad_urls() {
    let unknown_chain = Settings {
        chain: "mainnet".into(),
        ..Settings::default()
    };
    assert!(matches!(
        unknown_chain.build_registry(),
        Err(SettingsError::UnknownChain(_))
    ));

    let unknown_token = Settings {
        tokens: BTreeMap::from([("DOGE".to_string(), TokenOverride { decimals: 8 })]),
        ..Settings::default()
    };
    assert!(matches!(
        unknown_token.build_registry(),
        Err(SettingsError::UnknownToken(_))
    ));

    let huge_decimals = Settings {
        tokens: BTreeMap::from([("USDC".to_string(), TokenOverride { decimals: 78 })]),
        ..Settings::default()
    };
    assert!(matches!(
        huge_decimals.build_registry(),
        Err(SettingsError::DecimalsOutOfRange { decimals: 78, .. })
    ));
    let widest = Settings {
        tokens: BTreeMap::from([("USDC".to_string(), TokenOverride { decimals: 77 })]),
        ..Settings::default()
    };
    assert_eq!(
        widest.build_registry().expect("77 decimals").token(TokenId::Reserve).decimals,
        77
    );

    let bad_wallet = Settings {
        wallet_url: Some("ws://127.0.0.1:1248".into()),
        ..Settings::default()
    };
    assert!(matches!(
        bad_wallet.wallet_endpoint(),
        Err(SettingsError::InvalidUrl { field: "wallet_url", .. })
    ));

    let no_wallet = Settings {
        wallet_url: Some("  ".into()),
        ..Settings::default()
    };
    assert_eq!(no_wallet.wallet_endpoint().expect("empty is allowed"), None);
}
