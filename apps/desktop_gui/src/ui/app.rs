use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use client_core::{
    controller::{
        self,
        admin::{AdminAction, AdminPage},
        faucet::{FaucetAction, FaucetPage},
        loans::{LoanAction, LoansPage},
        restaking::{RestakingAction, RestakingPage},
        rwa::{RwaAction, RwaPage},
        stable::{StableAction, StableMintPage},
        vault::{VaultAction, VaultPage},
        Availability, Begun, PageController,
    },
    debounce::PreviewDebouncer,
    orchestrator::{ActionOutcome, TxProgress},
    session::SessionStatus,
    AppContext,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::{
    error::TxError,
    notify::{NotificationKind, Notifier},
};

use crate::backend_bridge::commands::{BackendCommand, LoadTask};
use crate::controller::{
    events::{PageKey, PageSnapshot, UiError, UiErrorContext, UiEvent},
    orchestration::dispatch_backend_command,
};
use crate::ui::{
    pages::{self, PageIntent},
    widgets::{error_banner, notification_banner, PageChrome},
};

/// The action a page is waiting on, kept so its result can be reported against the right form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageAction {
    Faucet(FaucetAction),
    Stable(StableAction),
    Vault(VaultAction),
    Restaking(RestakingAction),
    Loans(LoanAction),
    Admin(AdminAction),
    Rwa(RwaAction),
}

#[derive(Debug, Default)]
struct PageActivity {
    pending: Option<PageAction>,
    progress: Option<TxProgress>,
    last_tx: Option<(String, String)>,
    loading: bool,
}

struct Pages {
    usdc_faucet: FaucetPage,
    lst_faucet: FaucetPage,
    mint: StableMintPage,
    vault: VaultPage,
    restaking: RestakingPage,
    loans: LoansPage,
    admin: AdminPage,
    rwa: RwaPage,
}

impl Pages {
    fn new(ctx: &AppContext) -> Self {
        Self {
            usdc_faucet: FaucetPage::reserve(),
            lst_faucet: FaucetPage::collateral(),
            mint: StableMintPage::new(),
            vault: VaultPage::new(),
            restaking: RestakingPage::new(),
            loans: LoansPage::new(),
            admin: AdminPage::new(ctx.data_source),
            rwa: RwaPage::new(ctx.data_source),
        }
    }

    fn in_flight(&self, key: PageKey) -> bool {
        match key {
            PageKey::UsdcFaucet => self.usdc_faucet.in_flight().is_active(),
            PageKey::LstFaucet => self.lst_faucet.in_flight().is_active(),
            PageKey::Mint => self.mint.in_flight().is_active(),
            PageKey::Vault => self.vault.in_flight().is_active(),
            PageKey::Restaking => self.restaking.in_flight().is_active(),
            PageKey::Loans => self.loans.in_flight().is_active(),
            PageKey::Admin => self.admin.in_flight().is_active(),
            PageKey::Rwa => self.rwa.in_flight().is_active(),
        }
    }
}

/// Everything page handlers need besides the page itself.
struct Shell {
    ctx: AppContext,
    cmd_tx: Sender<BackendCommand>,
    notifier: Notifier,
    activity: HashMap<PageKey, PageActivity>,
    status: String,
}

impl Shell {
    fn dispatch(&mut self, cmd: BackendCommand) -> bool {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status)
    }

    fn start<P: PageController>(
        &mut self,
        page: &mut P,
        key: PageKey,
        action: P::Action,
        wrap: fn(P::Action) -> PageAction,
    ) {
        // The ticket is released before the result reaches the UI; the page stays busy until then.
        if self.awaiting_result(key) {
            controller::notify_error(&mut self.notifier, &TxError::Busy);
            return;
        }
        match controller::begin(page, &self.ctx, &action) {
            Ok(Begun::OnChain(pending)) => {
                tracing::info!(page = ?key, action = ?action, steps = pending.plan.steps.len(), "submitting action");
                if self.dispatch(BackendCommand::Execute { page: key, pending }) {
                    let activity = self.activity.entry(key).or_default();
                    activity.pending = Some(wrap(action));
                    activity.progress = None;
                    activity.last_tx = None;
                }
            }
            Ok(Begun::Local(outcome)) => {
                self.notifier.show(outcome.message, NotificationKind::Success);
            }
            Err(err) => controller::notify_error(&mut self.notifier, &err),
        }
    }

    fn awaiting_result(&self, key: PageKey) -> bool {
        self.activity
            .get(&key)
            .is_some_and(|activity| activity.pending.is_some())
    }

    fn load<P: PageController>(
        &mut self,
        page: &P,
        key: PageKey,
        wrap: fn(P::Snapshot) -> PageSnapshot,
    ) {
        let task = page.loader(&self.ctx);
        let task: LoadTask = Box::pin(async move { task.await.map(wrap) });
        if self.dispatch(BackendCommand::Load { page: key, task }) {
            self.activity.entry(key).or_default().loading = true;
        }
    }
}

pub struct VmoneyApp {
    shell: Shell,
    pages: Pages,
    ui_rx: Receiver<UiEvent>,
    active: PageKey,
    session: SessionStatus,
    banner: Option<UiError>,
    debouncer: PreviewDebouncer,
    preview_in_flight: bool,
    last_sync: Instant,
}

impl VmoneyApp {
    pub fn new(
        ctx: AppContext,
        notifier: Notifier,
        debouncer: PreviewDebouncer,
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
    ) -> Self {
        let pages = Pages::new(&ctx);
        let session = ctx.session.status();
        Self {
            shell: Shell {
                ctx,
                cmd_tx,
                notifier,
                activity: HashMap::new(),
                status: String::new(),
            },
            pages,
            ui_rx,
            active: PageKey::UsdcFaucet,
            session,
            banner: None,
            debouncer,
            preview_in_flight: false,
            last_sync: Instant::now(),
        }
    }

    fn availability(&self, key: PageKey) -> Availability {
        if !key.needs_wallet(self.shell.ctx.data_source) {
            return Availability::Ready;
        }
        controller::availability(&self.shell.ctx)
    }

    fn request_load(&mut self, key: PageKey) {
        if self.availability(key) != Availability::Ready {
            return;
        }
        let shell = &mut self.shell;
        let pages = &self.pages;
        match key {
            PageKey::UsdcFaucet => shell.load(&pages.usdc_faucet, key, PageSnapshot::Balance),
            PageKey::LstFaucet => shell.load(&pages.lst_faucet, key, PageSnapshot::Balance),
            PageKey::Mint => shell.load(&pages.mint, key, PageSnapshot::Stable),
            PageKey::Vault => shell.load(&pages.vault, key, PageSnapshot::Vault),
            PageKey::Restaking => shell.load(&pages.restaking, key, PageSnapshot::Restaking),
            PageKey::Loans => shell.load(&pages.loans, key, |s| PageSnapshot::Loans(Box::new(s))),
            PageKey::Admin if !shell.ctx.is_mock() => {
                shell.load(&pages.admin, key, PageSnapshot::Admin)
            }
            PageKey::Admin | PageKey::Rwa => {}
        }
    }

    fn select_page(&mut self, key: PageKey) {
        if self.active != key {
            self.active = key;
            self.request_load(key);
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Info(message) => {
                tracing::debug!(%message, "backend info");
                self.shell.status = message;
            }
            UiEvent::Error(error) => {
                tracing::warn!(context = ?error.context(), message = error.message(), "backend error");
                self.banner = Some(error);
            }
            UiEvent::SessionChanged(status) => {
                if status != self.session {
                    tracing::info!(account = ?status.account, chain = ?status.wallet_chain, "session changed");
                    self.session = status;
                    if status.chain_matches() {
                        self.banner = None;
                    }
                    self.request_load(self.active);
                }
            }
            UiEvent::Progress { page, progress } => {
                let activity = self.shell.activity.entry(page).or_default();
                if let TxProgress::Submitted {
                    tx_hash,
                    explorer_url,
                    ..
                } = &progress
                {
                    activity.last_tx = Some((tx_hash.to_string(), explorer_url.clone()));
                }
                activity.progress = Some(progress);
            }
            UiEvent::ActionFinished { page, result } => self.finish_action(page, result),
            UiEvent::Loaded { page, result } => {
                self.shell.activity.entry(page).or_default().loading = false;
                match result {
                    Ok(snapshot) => self.apply_snapshot(page, snapshot),
                    Err(TxError::NotConnected) => {}
                    Err(err) => {
                        tracing::warn!(?page, error = %err, "page load failed");
                        self.banner = Some(UiError::from_tx(UiErrorContext::Load, &err));
                    }
                }
            }
            UiEvent::PreviewLoaded { request, result } => {
                self.preview_in_flight = false;
                match result {
                    Ok(amount) => {
                        self.pages.vault.apply_preview(request, amount);
                    }
                    Err(TxError::Validation(_)) => {}
                    Err(err) => {
                        tracing::debug!(input = %request.input, error = %err, "vault preview failed");
                        if matches!(err, TxError::Transport(_)) {
                            self.banner = Some(UiError::from_tx(UiErrorContext::Preview, &err));
                        }
                    }
                }
            }
        }
    }

    fn apply_snapshot(&mut self, page: PageKey, snapshot: PageSnapshot) {
        let pages = &mut self.pages;
        match (page, snapshot) {
            (PageKey::LstFaucet, PageSnapshot::Balance(balance)) => pages.lst_faucet.apply(balance),
            (_, PageSnapshot::Balance(balance)) => pages.usdc_faucet.apply(balance),
            (_, PageSnapshot::Stable(balances)) => pages.mint.apply(balances),
            (_, PageSnapshot::Vault(position)) => pages.vault.apply(position),
            (_, PageSnapshot::Restaking(snapshot)) => pages.restaking.apply(snapshot),
            (_, PageSnapshot::Loans(snapshot)) => pages.loans.apply(*snapshot),
            (_, PageSnapshot::Admin(snapshot)) => pages.admin.apply(snapshot),
        }
    }

    fn finish_action(&mut self, page: PageKey, result: Result<ActionOutcome, TxError>) {
        let activity = self.shell.activity.entry(page).or_default();
        activity.progress = None;
        let Some(action) = activity.pending.take() else {
            tracing::debug!(?page, "result for a page with no pending action");
            return;
        };
        match &result {
            Ok(outcome) => {
                activity.last_tx = outcome
                    .steps
                    .last()
                    .map(|step| (step.tx_hash.to_string(), step.explorer_url.clone()));
            }
            Err(TxError::ConfirmationTimeout {
                tx_hash,
                explorer_url,
            }) => activity.last_tx = Some((tx_hash.clone(), explorer_url.clone())),
            Err(TxError::Cancelled {
                tx_hash: Some(tx_hash),
                explorer_url: Some(explorer_url),
            }) => activity.last_tx = Some((tx_hash.clone(), explorer_url.clone())),
            Err(_) => {}
        }

        let notifier = &mut self.shell.notifier;
        let pages = &mut self.pages;
        match action {
            PageAction::Faucet(action) if page == PageKey::LstFaucet => {
                controller::finish(&mut pages.lst_faucet, notifier, &action, &result)
            }
            PageAction::Faucet(action) => {
                controller::finish(&mut pages.usdc_faucet, notifier, &action, &result)
            }
            PageAction::Stable(action) => controller::finish(&mut pages.mint, notifier, &action, &result),
            PageAction::Vault(action) => controller::finish(&mut pages.vault, notifier, &action, &result),
            PageAction::Restaking(action) => {
                controller::finish(&mut pages.restaking, notifier, &action, &result)
            }
            PageAction::Loans(action) => controller::finish(&mut pages.loans, notifier, &action, &result),
            PageAction::Admin(action) => controller::finish(&mut pages.admin, notifier, &action, &result),
            PageAction::Rwa(action) => controller::finish(&mut pages.rwa, notifier, &action, &result),
        }
        if result.is_ok() {
            self.request_load(page);
        }
    }

    fn handle_intent(&mut self, key: PageKey, intent: PageIntent) {
        let shell = &mut self.shell;
        let pages = &mut self.pages;
        match intent {
            PageIntent::Faucet(action) => {
                let page = match key {
                    PageKey::LstFaucet => &mut pages.lst_faucet,
                    _ => &mut pages.usdc_faucet,
                };
                shell.start(page, key, action, PageAction::Faucet);
            }
            PageIntent::Stable(action) => shell.start(&mut pages.mint, key, action, PageAction::Stable),
            PageIntent::Vault(action) => {
                self.debouncer.cancel();
                shell.start(&mut pages.vault, key, action, PageAction::Vault);
            }
            PageIntent::VaultEdited => match pages.vault.preview_request() {
                Some(request) => self.debouncer.schedule(request.input, Instant::now()),
                None => self.debouncer.cancel(),
            },
            PageIntent::Restaking(action) => {
                shell.start(&mut pages.restaking, key, action, PageAction::Restaking)
            }
            PageIntent::Loans(action) => shell.start(&mut pages.loans, key, action, PageAction::Loans),
            PageIntent::Admin(action) => shell.start(&mut pages.admin, key, action, PageAction::Admin),
            PageIntent::Rwa(action) => shell.start(&mut pages.rwa, key, action, PageAction::Rwa),
            PageIntent::Cancel => {
                shell.dispatch(BackendCommand::Cancel { page: key });
            }
        }
    }

    /// Sends the vault preview once the input has been quiet for the debounce window.
    fn tick_preview(&mut self, now: Instant) {
        let Some(input) = self.debouncer.take_due(now) else {
            return;
        };
        let Some(request) = self
            .pages
            .vault
            .preview_request()
            .filter(|request| request.input == input)
        else {
            return;
        };
        if self.availability(PageKey::Vault) != Availability::Ready {
            return;
        }
        let task = VaultPage::preview_loader(&self.shell.ctx, &request);
        self.preview_in_flight = self.shell.dispatch(BackendCommand::Preview { request, task });
    }

    /// Polls the wallet for account or chain switches made outside the app.
    fn tick_wallet_sync(&mut self, now: Instant) {
        if !self.session.is_connected() {
            return;
        }
        if now.duration_since(self.last_sync) >= self.shell.ctx.chain().polling_interval {
            self.last_sync = now;
            self.shell.dispatch(BackendCommand::SyncWallet);
        }
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Verifiable Money");
                ui.separator();
                let chain = self.shell.ctx.chain();
                ui.label(format!("{} ({})", chain.name, chain.id));
                if self.shell.ctx.is_mock() {
                    ui.colored_label(egui::Color32::from_rgb(214, 170, 82), "demo data");
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    match self.session.account {
                        Some(account) => {
                            if ui.button("Disconnect").clicked() {
                                self.shell.dispatch(BackendCommand::Disconnect);
                            }
                            let text = account.to_string();
                            ui.monospace(format!("{}...{}", &text[..6], &text[text.len() - 4..]));
                        }
                        None => {
                            if ui.button("Connect Wallet").clicked() {
                                self.shell.dispatch(BackendCommand::Connect);
                            }
                        }
                    }
                });
            });
        });
    }

    fn show_nav(&mut self, ctx: &egui::Context) {
        let mut selected = None;
        egui::SidePanel::left("nav")
            .resizable(false)
            .default_width(200.0)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                for key in PageKey::ALL {
                    ui.horizontal(|ui| {
                        if ui.selectable_label(self.active == key, key.label()).clicked() {
                            selected = Some(key);
                        }
                        if self.pages.in_flight(key) || self.shell.awaiting_result(key) {
                            ui.spinner();
                        }
                    });
                }
                ui.with_layout(egui::Layout::bottom_up(egui::Align::Min), |ui| {
                    if !self.shell.status.is_empty() {
                        ui.weak(self.shell.status.as_str());
                    }
                });
            });
        if let Some(key) = selected {
            self.select_page(key);
        }
    }

    /// Connect and chain-switch prompts. Returns whether the page itself can be shown.
    fn show_gate(&mut self, ui: &mut egui::Ui, key: PageKey) -> bool {
        match self.availability(key) {
            Availability::Ready => true,
            Availability::ConnectWallet => {
                ui.heading(key.label());
                ui.label("Connect your wallet to use this page.");
                if ui.button("Connect Wallet").clicked() {
                    self.shell.dispatch(BackendCommand::Connect);
                }
                false
            }
            Availability::WrongChain { expected, actual } => {
                ui.heading(key.label());
                ui.colored_label(
                    egui::Color32::from_rgb(214, 170, 82),
                    format!(
                        "Your wallet is on chain {actual}. Switch it to {} (chain {expected}).",
                        self.shell.ctx.chain().name
                    ),
                );
                if ui.button("Check again").clicked() {
                    self.shell.dispatch(BackendCommand::SyncWallet);
                }
                false
            }
        }
    }

    fn show_page(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(notification) = self.shell.notifier.current() {
                if notification_banner(ui, notification) {
                    self.shell.notifier.dismiss();
                }
                ui.add_space(6.0);
            }
            if let Some(error) = &self.banner {
                let dismissed = error_banner(ui, error);
                let reconnect = error.needs_wallet()
                    && !self.session.is_connected()
                    && ui.button("Connect Wallet").clicked();
                if dismissed {
                    self.banner = None;
                }
                if reconnect {
                    self.shell.dispatch(BackendCommand::Connect);
                }
                ui.add_space(6.0);
            }

            let key = self.active;
            if !self.show_gate(ui, key) {
                return;
            }

            let busy = self.pages.in_flight(key) || self.shell.awaiting_result(key);
            let preview_waiting = self.preview_in_flight || self.debouncer.next_deadline().is_some();
            let activity = self.shell.activity.get(&key);
            let chrome = PageChrome {
                busy,
                loading: activity.is_some_and(|a| a.loading),
                progress: activity.and_then(|a| a.progress.as_ref()),
                last_tx: activity.and_then(|a| a.last_tx.as_ref()),
                explorer_name: &self.shell.ctx.chain().explorer_name,
            };
            let app_ctx = &self.shell.ctx;
            let forms = &mut self.pages;
            let intent = egui::ScrollArea::vertical()
                .show(ui, |ui| match key {
                    PageKey::UsdcFaucet => pages::faucet(ui, app_ctx, &mut forms.usdc_faucet, &chrome),
                    PageKey::LstFaucet => pages::faucet(ui, app_ctx, &mut forms.lst_faucet, &chrome),
                    PageKey::Mint => pages::stable_mint(ui, app_ctx, &mut forms.mint, &chrome),
                    PageKey::Vault => {
                        pages::vault(ui, app_ctx, &mut forms.vault, &chrome, preview_waiting)
                    }
                    PageKey::Restaking => pages::restaking(ui, app_ctx, &mut forms.restaking, &chrome),
                    PageKey::Loans => pages::loans(ui, app_ctx, &mut forms.loans, &chrome),
                    PageKey::Admin => pages::admin(ui, &mut forms.admin, &chrome),
                    PageKey::Rwa => pages::rwa(ui, &mut forms.rwa, &chrome),
                })
                .inner;
            if let Some(intent) = intent {
                self.handle_intent(key, intent);
            }
        });
    }

    fn next_repaint(&self, now: Instant) -> Duration {
        let mut wait = Duration::from_millis(100);
        if let Some(deadline) = self.debouncer.next_deadline() {
            wait = wait.min(deadline.saturating_duration_since(now));
        }
        wait
    }
}

impl eframe::App for VmoneyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.process_ui_events();
        self.tick_preview(now);
        self.tick_wallet_sync(now);

        self.show_top_bar(ctx);
        self.show_nav(ctx);
        self.show_page(ctx);

        ctx.request_repaint_after(self.next_repaint(now));
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
