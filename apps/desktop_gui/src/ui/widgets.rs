//! Small reusable pieces shared by the page views.

use client_core::{controller::AmountField, orchestrator::TxProgress};
use eframe::egui;
use shared::notify::{Notification, NotificationKind};

use crate::controller::events::{UiError, UiErrorCategory};

/// Per-page transaction state handed to a page view.
pub struct PageChrome<'a> {
    pub busy: bool,
    /// A read for this page is outstanding.
    pub loading: bool,
    pub progress: Option<&'a TxProgress>,
    /// Hash and explorer link of the page's latest transaction.
    pub last_tx: Option<&'a (String, String)>,
    pub explorer_name: &'a str,
}

/// Single-line amount input. Keystrokes that are not a partial decimal number are dropped.
pub fn amount_input(ui: &mut egui::Ui, field: &mut AmountField, hint: &str) -> bool {
    let mut text = field.value().to_string();
    let response = ui.add(
        egui::TextEdit::singleline(&mut text)
            .hint_text(hint)
            .desired_width(220.0),
    );
    response.changed() && field.set(&text)
}

pub fn text_input(ui: &mut egui::Ui, value: &mut String, hint: &str) -> bool {
    ui.add(
        egui::TextEdit::singleline(value)
            .hint_text(hint)
            .desired_width(320.0),
    )
    .changed()
}

pub fn action_button(ui: &mut egui::Ui, label: &str, chrome: &PageChrome<'_>) -> bool {
    ui.add_enabled(!chrome.busy, egui::Button::new(label))
        .on_disabled_hover_text("Waiting for the current transaction")
        .clicked()
}

pub fn stat(ui: &mut egui::Ui, label: &str, value: impl Into<String>) {
    ui.vertical(|ui| {
        ui.weak(label);
        ui.strong(value.into());
    });
}

/// Spinner with the current step, a cancel button, and the explorer link. Returns whether cancel was clicked.
pub fn activity_row(ui: &mut egui::Ui, chrome: &PageChrome<'_>) -> bool {
    let mut cancel = false;
    if chrome.loading && !chrome.busy {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.weak("Refreshing");
        });
    }
    if chrome.busy {
        ui.horizontal(|ui| {
            ui.spinner();
            let text = chrome
                .progress
                .map(ToString::to_string)
                .unwrap_or_else(|| "Preparing transaction".to_string());
            ui.label(text);
            if ui.button("Stop waiting").clicked() {
                cancel = true;
            }
        });
    }
    if let Some((tx_hash, url)) = chrome.last_tx {
        ui.horizontal(|ui| {
            ui.weak(short_hash(tx_hash));
            ui.hyperlink_to(format!("View on {}", chrome.explorer_name), url);
        });
    }
    cancel
}

pub fn short_hash(hash: &str) -> String {
    if hash.len() <= 14 {
        return hash.to_string();
    }
    format!("{}...{}", &hash[..8], &hash[hash.len() - 6..])
}

fn banner_frame(ui: &mut egui::Ui, fill: egui::Color32, stroke: egui::Color32, message: &str) -> bool {
    let mut dismissed = false;
    egui::Frame::NONE
        .fill(fill)
        .stroke(egui::Stroke::new(1.0, stroke))
        .corner_radius(8.0)
        .inner_margin(egui::Margin::symmetric(10, 8))
        .show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.label(egui::RichText::new(message).color(egui::Color32::WHITE));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Dismiss").clicked() {
                        dismissed = true;
                    }
                });
            });
        });
    dismissed
}

/// Returns whether the notification was dismissed.
pub fn notification_banner(ui: &mut egui::Ui, notification: &Notification) -> bool {
    let (fill, stroke) = match notification.kind {
        NotificationKind::Success => (
            egui::Color32::from_rgb(38, 92, 62),
            egui::Color32::from_rgb(84, 160, 112),
        ),
        NotificationKind::Error => (
            egui::Color32::from_rgb(111, 53, 53),
            egui::Color32::from_rgb(175, 96, 96),
        ),
        NotificationKind::Pending => (
            egui::Color32::from_rgb(104, 84, 36),
            egui::Color32::from_rgb(178, 148, 74),
        ),
    };
    banner_frame(ui, fill, stroke, &notification.message)
}

pub fn error_banner(ui: &mut egui::Ui, error: &UiError) -> bool {
    let prefix = match error.category() {
        UiErrorCategory::Wallet => "Wallet",
        UiErrorCategory::Chain => "Network",
        UiErrorCategory::Transport => "Connection",
        UiErrorCategory::Validation => "Input",
        UiErrorCategory::Unknown => "Unexpected",
    };
    banner_frame(
        ui,
        egui::Color32::from_rgb(70, 56, 80),
        egui::Color32::from_rgb(140, 112, 160),
        &format!("{prefix}: {}", error.message()),
    )
}
