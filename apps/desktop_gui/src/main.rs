use std::path::PathBuf;

mod backend_bridge;
mod controller;
mod ui;

use anyhow::{anyhow, Context as _};
use clap::Parser;
use client_core::{bootstrap, debounce::PreviewDebouncer, settings::load_settings};
use crossbeam_channel::bounded;
use eframe::egui;
use shared::notify::Notifier;
use tracing_subscriber::EnvFilter;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;
use ui::VmoneyApp;

#[derive(Parser, Debug)]
#[command(name = "vmoney-gui", about = "Verifiable Money desktop client")]
struct Args {
    /// Settings file; defaults to ./vmoney.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let settings = load_settings(args.config.as_deref()).context("failed to load settings")?;
    let ctx = bootstrap(&settings).context("failed to build client context")?;

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(ctx.clone(), cmd_rx, ui_tx);

    let notifier = Notifier::new(settings.notification_ttl());
    let debouncer = PreviewDebouncer::new(settings.preview_debounce());
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Verifiable Money")
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([980.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Verifiable Money",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(VmoneyApp::new(
                ctx, notifier, debouncer, cmd_tx, ui_rx,
            )))
        }),
    )
    .map_err(|err| anyhow!("desktop window failed: {err}"))
}
