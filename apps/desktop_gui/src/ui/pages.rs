//! One view function per page. Views edit form state in place and report clicks as intents.

use chrono::Utc;
use client_core::{
    controller::{
        admin::{AdminAction, AdminPage, MIN_ONBOARD_COLLATERAL},
        faucet::{FaucetAction, FaucetPage},
        loans::{LoanAction, LoansPage, LoansView, OPERATOR_MINT_AMOUNT},
        restaking::{RestakingAction, RestakingPage, RestakingTab},
        rwa::{RwaAction, RwaPage, BASE_YIELD_PERCENT, OPPORTUNITIES},
        stable::{StableAction, StableMintPage},
        vault::{VaultAction, VaultPage, VaultTab},
        PageController,
    },
    AppContext,
};
use eframe::egui;
use shared::{
    domain::{DataSource, TokenId},
    units::TokenAmount,
};

use super::widgets::{
    action_button, activity_row, amount_input, stat, text_input, PageChrome,
};

pub enum PageIntent {
    Faucet(FaucetAction),
    Stable(StableAction),
    Vault(VaultAction),
    /// The vault input or tab changed; a new preview is due.
    VaultEdited,
    Restaking(RestakingAction),
    Loans(LoanAction),
    Admin(AdminAction),
    Rwa(RwaAction),
    Cancel,
}

fn symbol(ctx: &AppContext, token: TokenId) -> String {
    ctx.registry.token(token).symbol.clone()
}

fn amount_text(amount: Option<&TokenAmount>) -> String {
    amount
        .map(|amount| amount.compact())
        .unwrap_or_else(|| "...".to_string())
}

pub(crate) fn due_text(left: chrono::Duration) -> String {
    if left <= chrono::Duration::zero() {
        return "Overdue".to_string();
    }
    match left.num_days() {
        0 if left.num_hours() > 1 => format!("{} hours", left.num_hours()),
        0 => "1 hour".to_string(),
        1 => "1 day".to_string(),
        days => format!("{days} days"),
    }
}

pub fn faucet(
    ui: &mut egui::Ui,
    ctx: &AppContext,
    page: &mut FaucetPage,
    chrome: &PageChrome<'_>,
) -> Option<PageIntent> {
    let mut intent = None;
    let symbol = symbol(ctx, page.token());
    ui.heading(page.title());
    ui.label(format!("Mint test {symbol} to the connected account."));
    ui.add_space(8.0);
    stat(ui, "Your balance", format!("{} {symbol}", amount_text(page.balance.as_ref())));
    ui.add_space(8.0);
    ui.horizontal(|ui| {
        amount_input(ui, &mut page.amount, "0.0");
        ui.label(symbol.as_str());
        if action_button(ui, &format!("Mint {symbol}"), chrome) {
            intent = Some(PageIntent::Faucet(FaucetAction::Mint));
        }
    });
    if activity_row(ui, chrome) {
        intent = Some(PageIntent::Cancel);
    }
    intent
}

pub fn stable_mint(
    ui: &mut egui::Ui,
    ctx: &AppContext,
    page: &mut StableMintPage,
    chrome: &PageChrome<'_>,
) -> Option<PageIntent> {
    let mut intent = None;
    let reserve = symbol(ctx, TokenId::Reserve);
    let stable = symbol(ctx, TokenId::Stable);
    ui.heading(page.title());
    ui.label(format!("Deposit {reserve} to mint {stable} 1:1. Two wallet confirmations: approve, then mint."));
    ui.add_space(8.0);
    ui.horizontal(|ui| {
        let balances = page.balances.as_ref();
        stat(ui, &format!("{reserve} balance"), amount_text(balances.map(|b| &b.reserve)));
        ui.add_space(24.0);
        stat(ui, &format!("{stable} balance"), amount_text(balances.map(|b| &b.stable)));
    });
    ui.add_space(8.0);
    ui.horizontal(|ui| {
        amount_input(ui, &mut page.amount, "0.0");
        ui.label(reserve.as_str());
    });
    if let Some(receive) = page.receive_preview(ctx) {
        ui.label(format!("You will receive: {receive} {stable}"));
    }
    if action_button(ui, &format!("Mint {stable}"), chrome) {
        intent = Some(PageIntent::Stable(StableAction::Mint));
    }
    if activity_row(ui, chrome) {
        intent = Some(PageIntent::Cancel);
    }
    intent
}

pub fn vault(
    ui: &mut egui::Ui,
    ctx: &AppContext,
    page: &mut VaultPage,
    chrome: &PageChrome<'_>,
    preview_waiting: bool,
) -> Option<PageIntent> {
    let mut intent = None;
    let asset = symbol(ctx, TokenId::Stable);
    let share = symbol(ctx, TokenId::VaultShare);
    ui.heading(page.title());
    ui.add_space(4.0);
    ui.horizontal(|ui| {
        let position = page.position.as_ref();
        stat(ui, &format!("Your {share}"), amount_text(position.map(|p| &p.shares)));
        ui.add_space(24.0);
        stat(ui, &format!("Your {asset}"), amount_text(position.map(|p| &p.asset_balance)));
        ui.add_space(24.0);
        stat(ui, "Vault assets", amount_text(position.map(|p| &p.total_assets)));
    });
    if let Some(rate) = page.exchange_rate() {
        ui.weak(rate);
    }
    ui.add_space(8.0);

    let mut tab = page.tab();
    ui.horizontal(|ui| {
        ui.selectable_value(&mut tab, VaultTab::Deposit, "Deposit");
        ui.selectable_value(&mut tab, VaultTab::Withdraw, "Withdraw");
    });
    if tab != page.tab() {
        page.select_tab(tab);
        intent = Some(PageIntent::VaultEdited);
    }

    let (input_symbol, output_symbol, button, action) = match page.tab() {
        VaultTab::Deposit => (&asset, &share, format!("Deposit {asset}"), VaultAction::Deposit),
        VaultTab::Withdraw => (&share, &asset, format!("Redeem {share}"), VaultAction::Redeem),
    };
    ui.horizontal(|ui| {
        let mut text = page.active_amount().value().to_string();
        let response = ui.add(
            egui::TextEdit::singleline(&mut text)
                .hint_text("0.0")
                .desired_width(220.0),
        );
        if response.changed() && page.set_amount(&text) {
            intent = Some(PageIntent::VaultEdited);
        }
        ui.label(input_symbol.as_str());
    });
    ui.horizontal(|ui| match page.preview() {
        Some(preview) => {
            ui.label(format!("You will receive: {} {output_symbol}", preview.amount.compact()));
        }
        None if preview_waiting => {
            ui.spinner();
            ui.weak("Calculating...");
        }
        None => {}
    });
    if action_button(ui, &button, chrome) {
        intent = Some(PageIntent::Vault(action));
    }
    if activity_row(ui, chrome) {
        intent = Some(PageIntent::Cancel);
    }
    intent
}

pub fn restaking(
    ui: &mut egui::Ui,
    ctx: &AppContext,
    page: &mut RestakingPage,
    chrome: &PageChrome<'_>,
) -> Option<PageIntent> {
    let mut intent = None;
    let lst = symbol(ctx, TokenId::Collateral);
    ui.heading(page.title());
    ui.label(format!("Delegate {lst} to back protocol operators."));
    ui.add_space(8.0);
    ui.horizontal(|ui| {
        let snapshot = page.snapshot.as_ref();
        stat(ui, &format!("{lst} balance"), amount_text(snapshot.map(|s| &s.balance)));
        ui.add_space(24.0);
        stat(ui, "Delegated", amount_text(snapshot.map(|s| &s.delegation.amount)));
    });
    ui.add_space(8.0);
    ui.horizontal(|ui| {
        let before = page.tab;
        ui.selectable_value(&mut page.tab, RestakingTab::Delegate, "Delegate");
        ui.selectable_value(&mut page.tab, RestakingTab::Undelegate, "Undelegate");
        if page.tab != before {
            page.amount.clear();
        }
    });
    ui.horizontal(|ui| {
        amount_input(ui, &mut page.amount, "0.0");
        ui.label(lst.as_str());
        if ui
            .add_enabled(page.snapshot.is_some(), egui::Button::new("Max"))
            .clicked()
        {
            page.fill_max();
        }
    });
    let label = match page.tab {
        RestakingTab::Delegate => "Delegate",
        RestakingTab::Undelegate => "Undelegate",
    };
    if action_button(ui, label, chrome) {
        intent = Some(PageIntent::Restaking(page.action_for_tab()));
    }
    if activity_row(ui, chrome) {
        intent = Some(PageIntent::Cancel);
    }
    intent
}

pub fn loans(
    ui: &mut egui::Ui,
    ctx: &AppContext,
    page: &mut LoansPage,
    chrome: &PageChrome<'_>,
) -> Option<PageIntent> {
    let mut intent = None;
    let stable = symbol(ctx, TokenId::Stable);
    let lst = symbol(ctx, TokenId::Collateral);
    ui.heading(page.title());
    ui.add_space(4.0);
    ui.horizontal(|ui| {
        let snapshot = page.snapshot.as_ref();
        stat(ui, &format!("{stable} balance"), amount_text(snapshot.map(|s| &s.stable_balance)));
        ui.add_space(24.0);
        stat(ui, "Delegated collateral", amount_text(snapshot.map(|s| &s.delegation.amount)));
        if let Some(operator) = snapshot.and_then(|s| s.operator_balance.as_ref()) {
            ui.add_space(24.0);
            stat(ui, "Operator balance", operator.compact());
        }
    });
    ui.add_space(8.0);

    ui.strong("Active loan");
    match page.loans_view() {
        LoansView::Loading => {
            ui.spinner();
        }
        LoansView::NoActiveLoans => {
            ui.weak("No active loans");
        }
        LoansView::Active(loan) => {
            let repayment = page
                .snapshot
                .as_ref()
                .and_then(|s| s.repayment.as_ref())
                .map(|r| r.compact())
                .unwrap_or_else(|| "...".to_string());
            egui::Grid::new("active_loan").num_columns(2).show(ui, |ui| {
                ui.label("Principal");
                ui.label(format!("{} {stable}", loan.principal.compact()));
                ui.end_row();
                ui.label("Collateral");
                ui.label(format!("{} {lst}", loan.collateral.compact()));
                ui.end_row();
                ui.label("Interest");
                ui.label(format!("{}%", loan.interest_rate_percent()));
                ui.end_row();
                if let Some(started) = loan.started_at() {
                    ui.label("Started");
                    ui.label(started.format("%Y-%m-%d %H:%M UTC").to_string());
                    ui.end_row();
                }
                if let Some(left) = page.due_in(Utc::now()) {
                    ui.label("Due in");
                    ui.label(due_text(left));
                    ui.end_row();
                }
                ui.label("Repayment");
                ui.label(format!("{repayment} {stable}"));
                ui.end_row();
            });
            if action_button(ui, "Repay Loan", chrome) {
                intent = Some(PageIntent::Loans(LoanAction::Repay));
            }
        }
    }
    ui.separator();

    ui.strong("Take a loan");
    ui.horizontal(|ui| {
        amount_input(ui, &mut page.amount, "0.0");
        ui.label(stable.as_str());
    });
    if let Some(estimate) = page.collateral_estimate(ctx) {
        ui.weak(format!("Required collateral (est.): {estimate} {lst}"));
    }
    if action_button(ui, "Take Loan", chrome) {
        intent = Some(PageIntent::Loans(LoanAction::Take));
    }
    ui.separator();
    if action_button(
        ui,
        &format!("Mint {OPERATOR_MINT_AMOUNT} {stable} to Operator"),
        chrome,
    ) {
        intent = Some(PageIntent::Loans(LoanAction::MintToOperator));
    }
    if activity_row(ui, chrome) {
        intent = Some(PageIntent::Cancel);
    }
    intent
}

pub fn admin(
    ui: &mut egui::Ui,
    page: &mut AdminPage,
    chrome: &PageChrome<'_>,
) -> Option<PageIntent> {
    let mut intent = None;
    let mock = page.data_source() == DataSource::Mock;
    ui.heading(page.title());
    if mock {
        ui.weak("Demo data; nothing here is sent on-chain.");
    }
    ui.add_space(4.0);
    ui.horizontal(|ui| {
        stat(ui, "Total collateral", page.total_collateral().to_string());
        ui.add_space(24.0);
        stat(ui, "Operators", page.operators.len().to_string());
        ui.add_space(24.0);
        stat(
            ui,
            "Active loans",
            page.total_active_loans()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
        );
        ui.add_space(24.0);
        stat(ui, "Base rate", format!("{}%", page.base_rate_percent()));
    });
    ui.add_space(8.0);

    let mut slash_target = None;
    egui::Grid::new("operators")
        .striped(true)
        .num_columns(6)
        .show(ui, |ui| {
            for header in ["#", "Name", "Address", "Collateral", "Status", ""] {
                ui.strong(header);
            }
            ui.end_row();
            for op in &page.operators {
                ui.label(op.id.to_string());
                ui.label(op.name.as_str());
                ui.monospace(op.short_address());
                ui.label(op.collateral.to_string());
                ui.label(op.status.to_string());
                if ui.small_button("Slash").clicked() {
                    slash_target = Some(op.id);
                }
                ui.end_row();
            }
        });
    if let Some(id) = slash_target {
        page.select_for_slash(id);
    }
    ui.separator();

    ui.strong("Slash operator");
    let selected = page
        .slash
        .operator
        .and_then(|id| page.operator(id))
        .map(|op| format!("#{} {}", op.id, op.name))
        .unwrap_or_else(|| "Select operator".to_string());
    let choices: Vec<_> = page
        .operators
        .iter()
        .map(|op| (op.id, format!("#{} {}", op.id, op.name)))
        .collect();
    egui::ComboBox::from_id_salt("slash_operator")
        .selected_text(selected)
        .show_ui(ui, |ui| {
            for (id, label) in choices {
                ui.selectable_value(&mut page.slash.operator, Some(id), label);
            }
        });
    ui.horizontal(|ui| {
        amount_input(ui, &mut page.slash.amount, "Amount");
        if ui
            .add_enabled(page.slash.operator.is_some(), egui::Button::new("Slash All"))
            .clicked()
        {
            page.fill_slash_all();
        }
    });
    text_input(ui, &mut page.slash.reason, "Reason");
    if action_button(ui, "Slash", chrome) {
        intent = Some(PageIntent::Admin(AdminAction::Slash));
    }
    ui.separator();

    ui.add_enabled_ui(mock, |ui| {
        ui.strong("Base rate");
        ui.horizontal(|ui| {
            amount_input(ui, &mut page.base_rate, "5.0");
            ui.label("%");
            if action_button(ui, "Update", chrome) {
                intent = Some(PageIntent::Admin(AdminAction::SetBaseRate));
            }
        });
        ui.separator();
        ui.strong("Onboard operator");
        text_input(ui, &mut page.onboard.name, "Operator name");
        text_input(ui, &mut page.onboard.address, "0x...");
        ui.horizontal(|ui| {
            amount_input(
                ui,
                &mut page.onboard.collateral,
                &format!("min {MIN_ONBOARD_COLLATERAL}"),
            );
            if action_button(ui, "Onboard", chrome) {
                intent = Some(PageIntent::Admin(AdminAction::Onboard));
            }
        });
    })
    .response
    .on_disabled_hover_text("Only available with demo data");

    if activity_row(ui, chrome) {
        intent = Some(PageIntent::Cancel);
    }
    intent
}

pub fn rwa(ui: &mut egui::Ui, page: &mut RwaPage, chrome: &PageChrome<'_>) -> Option<PageIntent> {
    let mut intent = None;
    ui.heading(page.title());
    ui.add_space(4.0);
    ui.horizontal(|ui| {
        stat(ui, "Portfolio value", format!("${:.2}", page.total_value()));
        ui.add_space(24.0);
        stat(ui, "Weighted yield", format!("{:.2}%", page.weighted_yield()));
        ui.add_space(24.0);
        stat(
            ui,
            &format!("vs {BASE_YIELD_PERCENT:.2}% base"),
            format!("{:+.2}%", page.yield_premium()),
        );
    });
    ui.add_space(8.0);

    egui::Grid::new("rwa_assets")
        .striped(true)
        .num_columns(4)
        .show(ui, |ui| {
            for header in ["Asset", "Amount", "Yield", "Value"] {
                ui.strong(header);
            }
            ui.end_row();
            for asset in &page.assets {
                ui.label(asset.name.as_str());
                ui.label(format!("{:.2}", asset.amount));
                ui.label(format!("{:.2}%", asset.yield_percent));
                ui.label(format!("${:.2}", asset.value));
                ui.end_row();
            }
        });
    ui.separator();

    ui.strong("Opportunities");
    for opportunity in &OPPORTUNITIES {
        ui.horizontal(|ui| {
            ui.label(format!("{} ({:.1}%)", opportunity.name, opportunity.yield_percent));
            ui.weak(opportunity.description);
            if ui.small_button("Select").clicked() {
                page.choose_opportunity(opportunity);
            }
        });
    }
    ui.separator();

    ui.strong("Add asset");
    text_input(ui, &mut page.form.name, "Asset name");
    ui.horizontal(|ui| {
        amount_input(ui, &mut page.form.amount, "Amount");
        amount_input(ui, &mut page.form.yield_percent, "Yield %");
    });
    if action_button(ui, "Add Asset", chrome) {
        intent = Some(PageIntent::Rwa(RwaAction::AddAsset));
    }
    intent
}
