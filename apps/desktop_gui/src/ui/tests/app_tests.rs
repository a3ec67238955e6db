use super::*;
use client_core::{
    bootstrap,
    controller::vault::{PreviewRequest, VaultTab},
    orchestrator::ConfirmedStep,
    settings::Settings,
};
use crossbeam_channel::bounded;
use shared::{
    domain::{ContractName, DataSource, TokenId},
    units::TokenAmount,
    B256, U256,
};

fn gui(data_source: DataSource) -> (VmoneyApp, Receiver<BackendCommand>) {
    let settings = Settings {
        data_source,
        ..Settings::default()
    };
    let ctx = bootstrap(&settings).expect("bootstrap");
    let (cmd_tx, cmd_rx) = bounded(16);
    let (_ui_tx, ui_rx) = bounded(16);
    let app = VmoneyApp::new(
        ctx,
        Notifier::default(),
        PreviewDebouncer::default(),
        cmd_tx,
        ui_rx,
    );
    (app, cmd_rx)
}

fn minted(tx_hash: B256) -> ActionOutcome {
    ActionOutcome {
        label: "mint USDC".into(),
        message: "Successfully minted 5 USDC".into(),
        steps: vec![ConfirmedStep {
            contract: ContractName::ReserveToken,
            function: "mint(uint256)",
            tx_hash,
            block_number: Some(7),
            explorer_url: format!("https://devnet.pharosscan.xyz/tx/{tx_hash}"),
        }],
    }
}

#[test]
fn invalid_amount_never_reaches_the_backend() {
    let (mut app, cmd_rx) = gui(DataSource::Live);
    app.pages.usdc_faucet.amount.set("0");
    app.handle_intent(PageKey::UsdcFaucet, PageIntent::Faucet(FaucetAction::Mint));

    assert!(cmd_rx.try_recv().is_err());
    let notification = app.shell.notifier.current().expect("notification");
    assert_eq!(notification.kind, NotificationKind::Error);
    assert_eq!(notification.message, "Amount must be greater than zero.");
    assert!(!app.pages.in_flight(PageKey::UsdcFaucet));
}

#[test]
fn second_submit_is_rejected_while_in_flight() {
    let (mut app, cmd_rx) = gui(DataSource::Live);
    app.pages.usdc_faucet.amount.set("5");
    app.handle_intent(PageKey::UsdcFaucet, PageIntent::Faucet(FaucetAction::Mint));
    app.handle_intent(PageKey::UsdcFaucet, PageIntent::Faucet(FaucetAction::Mint));

    let Ok(BackendCommand::Execute { page, pending }) = cmd_rx.try_recv() else {
        panic!("expected an execute command");
    };
    assert_eq!(page, PageKey::UsdcFaucet);
    assert_eq!(pending.plan.steps[0].function, "mint(uint256)");
    assert!(cmd_rx.try_recv().is_err());
    assert!(app.pages.in_flight(PageKey::UsdcFaucet));
    assert_eq!(
        app.shell.notifier.current().expect("notification").message,
        TxError::Busy.user_message()
    );

    drop(pending);
    assert!(!app.pages.in_flight(PageKey::UsdcFaucet));
}

#[test]
fn confirmed_action_clears_the_form_and_keeps_the_explorer_link() {
    let (mut app, cmd_rx) = gui(DataSource::Live);
    app.pages.usdc_faucet.amount.set("5");
    app.handle_intent(PageKey::UsdcFaucet, PageIntent::Faucet(FaucetAction::Mint));
    drop(cmd_rx.try_recv());

    let tx_hash = B256::repeat_byte(0xab);
    app.handle_event(UiEvent::Progress {
        page: PageKey::UsdcFaucet,
        progress: TxProgress::Submitted {
            function: "mint(uint256)",
            tx_hash,
            explorer_url: "https://devnet.pharosscan.xyz/tx/pending".into(),
        },
    });
    assert!(app.shell.activity[&PageKey::UsdcFaucet].progress.is_some());

    app.handle_event(UiEvent::ActionFinished {
        page: PageKey::UsdcFaucet,
        result: Ok(minted(tx_hash)),
    });

    let activity = &app.shell.activity[&PageKey::UsdcFaucet];
    assert_eq!(activity.pending, None);
    assert_eq!(activity.progress, None);
    let (hash, url) = activity.last_tx.clone().expect("explorer link");
    assert_eq!(hash, tx_hash.to_string());
    assert!(url.ends_with(&hash));
    assert!(app.pages.usdc_faucet.amount.is_empty());
    let notification = app.shell.notifier.current().expect("notification");
    assert_eq!(notification.kind, NotificationKind::Success);
    assert_eq!(notification.message, "Successfully minted 5 USDC");
}

#[test]
fn cancelled_action_keeps_the_form_and_reports_pending() {
    let (mut app, cmd_rx) = gui(DataSource::Live);
    app.pages.mint.amount.set("100");
    app.handle_intent(PageKey::Mint, PageIntent::Stable(StableAction::Mint));
    drop(cmd_rx.try_recv());

    app.handle_intent(PageKey::Mint, PageIntent::Cancel);
    assert!(matches!(
        cmd_rx.try_recv(),
        Ok(BackendCommand::Cancel {
            page: PageKey::Mint
        })
    ));

    app.handle_event(UiEvent::ActionFinished {
        page: PageKey::Mint,
        result: Err(TxError::Cancelled {
            tx_hash: Some("0xabc".into()),
            explorer_url: Some("https://devnet.pharosscan.xyz/tx/0xabc".into()),
        }),
    });
    assert_eq!(app.pages.mint.amount.value(), "100");
    let notification = app.shell.notifier.current().expect("notification");
    assert_eq!(notification.kind, NotificationKind::Pending);
    assert!(notification.message.contains("/tx/0xabc"));
    assert_eq!(
        app.shell.activity[&PageKey::Mint].last_tx,
        Some(("0xabc".into(), "https://devnet.pharosscan.xyz/tx/0xabc".into()))
    );
}

#[test]
fn results_without_a_pending_action_are_ignored() {
    let (mut app, _cmd_rx) = gui(DataSource::Live);
    app.pages.vault.deposit_amount.set("3");
    app.handle_event(UiEvent::ActionFinished {
        page: PageKey::Vault,
        result: Ok(minted(B256::ZERO)),
    });
    assert_eq!(app.pages.vault.deposit_amount.value(), "3");
    assert!(app.shell.notifier.current().is_none());
}

#[test]
fn mock_admin_actions_apply_without_the_backend() {
    let (mut app, cmd_rx) = gui(DataSource::Mock);
    app.pages.admin.base_rate.set("6.5");
    app.handle_intent(PageKey::Admin, PageIntent::Admin(AdminAction::SetBaseRate));

    assert!(cmd_rx.try_recv().is_err());
    assert_eq!(app.pages.admin.base_rate_percent(), "6.5");
    assert_eq!(
        app.shell.notifier.current().expect("notification").message,
        "Base rate updated to 6.5%"
    );
}

#[test]
fn stale_vault_previews_are_dropped() {
    let (mut app, _cmd_rx) = gui(DataSource::Live);
    assert!(app.pages.vault.set_amount("10"));
    app.handle_intent(PageKey::Vault, PageIntent::VaultEdited);
    assert!(app.debouncer.next_deadline().is_some());

    let shares = TokenAmount::new(TokenId::VaultShare, U256::from(9u64), 0);
    app.handle_event(UiEvent::PreviewLoaded {
        request: PreviewRequest {
            tab: VaultTab::Deposit,
            input: "1".into(),
        },
        result: Ok(shares),
    });
    assert!(app.pages.vault.preview().is_none());

    app.handle_event(UiEvent::PreviewLoaded {
        request: PreviewRequest {
            tab: VaultTab::Deposit,
            input: "10".into(),
        },
        result: Ok(shares),
    });
    assert_eq!(app.pages.vault.preview().expect("preview").amount, shares);
}

#[test]
fn loads_wait_for_a_connected_wallet() {
    let (mut app, cmd_rx) = gui(DataSource::Live);
    app.select_page(PageKey::Vault);
    assert!(cmd_rx.try_recv().is_err());
    assert_eq!(app.availability(PageKey::Vault), Availability::ConnectWallet);

    let (mut mock, _cmd_rx) = gui(DataSource::Mock);
    assert_eq!(mock.availability(PageKey::Rwa), Availability::Ready);
    mock.select_page(PageKey::Rwa);
    assert_eq!(mock.active, PageKey::Rwa);
}

#[test]
fn page_stays_busy_until_its_result_arrives() {
    let (mut app, cmd_rx) = gui(DataSource::Live);
    app.pages.usdc_faucet.amount.set("5");
    app.handle_intent(PageKey::UsdcFaucet, PageIntent::Faucet(FaucetAction::Mint));
    let Ok(BackendCommand::Execute { pending, .. }) = cmd_rx.try_recv() else {
        panic!("expected an execute command");
    };
    // The backend task finished and released the ticket; its result is still queued.
    drop(pending);
    assert!(!app.pages.in_flight(PageKey::UsdcFaucet));
    assert!(app.shell.awaiting_result(PageKey::UsdcFaucet));

    app.handle_intent(PageKey::UsdcFaucet, PageIntent::Faucet(FaucetAction::Mint));
    assert!(cmd_rx.try_recv().is_err());
    assert_eq!(
        app.shell.notifier.current().expect("notification").message,
        TxError::Busy.user_message()
    );

    app.handle_event(UiEvent::ActionFinished {
        page: PageKey::UsdcFaucet,
        result: Ok(minted(B256::repeat_byte(0x01))),
    });
    assert!(!app.shell.awaiting_result(PageKey::UsdcFaucet));
    assert_eq!(
        app.shell.notifier.current().expect("notification").message,
        "Successfully minted 5 USDC"
    );
}
