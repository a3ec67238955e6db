use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    bootstrap,
    controller::{
        self,
        admin::{AdminAction, AdminPage},
        faucet::{FaucetAction, FaucetPage},
        loans::{LoanAction, LoansPage, LoansView},
        restaking::{RestakingAction, RestakingPage},
        rwa::{RwaAction, RwaPage},
        stable::{StableAction, StableMintPage},
        vault::{PreviewRequest, VaultAction, VaultPage, VaultTab},
        PageController,
    },
    orchestrator::{ActionOutcome, TxProgress},
    reads,
    settings::load_settings,
    AppContext,
};
use serde::Serialize;
use serde_json::json;
use shared::{
    domain::{OperatorId, TokenId},
    error::TxError,
    notify::Notifier,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "vmoney", about = "Verifiable Money protocol client")]
struct Args {
    /// Settings file; defaults to ./vmoney.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print results and errors as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect the wallet and show balances.
    Status,
    /// Chains and contract addresses known to the client.
    Registry,
    /// Mint test tokens from a faucet.
    Faucet { token: FaucetToken, amount: String },
    /// Deposit USDC and mint PUSD.
    Mint { amount: String },
    #[command(subcommand)]
    Vault(VaultCommand),
    /// Delegate LST collateral.
    Delegate { amount: String },
    /// Withdraw delegated LST.
    Undelegate { amount: String },
    #[command(subcommand)]
    Loan(LoanCommand),
    #[command(subcommand)]
    Admin(AdminCommand),
    #[command(subcommand)]
    Rwa(RwaCommand),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FaucetToken {
    Usdc,
    Lst,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PreviewKind {
    Deposit,
    Redeem,
}

#[derive(Subcommand, Debug)]
enum VaultCommand {
    Show,
    Deposit { amount: String },
    Redeem { shares: String },
    Preview { kind: PreviewKind, amount: String },
}

#[derive(Subcommand, Debug)]
enum LoanCommand {
    Show,
    Take { amount: String },
    Repay,
    /// Mint 10 PUSD to the protocol operator account.
    MintOperator,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    Operators,
    Slash {
        #[arg(long)]
        operator: u32,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        reason: String,
    },
    BaseRate { percent: String },
    Onboard {
        #[arg(long)]
        name: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        collateral: String,
    },
}

#[derive(Subcommand, Debug)]
enum RwaCommand {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        amount: String,
        #[arg(long = "yield")]
        yield_percent: String,
    },
}

#[derive(Serialize)]
struct StepView<'a> {
    function: &'a str,
    tx_hash: String,
    block_number: Option<u64>,
    explorer_url: &'a str,
}

#[derive(Serialize)]
struct OutcomeView<'a> {
    label: &'a str,
    message: &'a str,
    steps: Vec<StepView<'a>>,
}

impl<'a> From<&'a ActionOutcome> for OutcomeView<'a> {
    fn from(outcome: &'a ActionOutcome) -> Self {
        Self {
            label: &outcome.label,
            message: &outcome.message,
            steps: outcome
                .steps
                .iter()
                .map(|step| StepView {
                    function: step.function,
                    tx_hash: step.tx_hash.to_string(),
                    block_number: step.block_number,
                    explorer_url: &step.explorer_url,
                })
                .collect(),
        }
    }
}

struct Cli {
    ctx: AppContext,
    json: bool,
    notifier: Notifier,
}

impl Cli {
    fn print(&self, value: serde_json::Value, text: impl FnOnce() -> String) {
        if self.json {
            println!("{value}");
        } else {
            println!("{}", text());
        }
    }

    fn report(&self, outcome: &ActionOutcome) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(&OutcomeView::from(outcome))?);
            return Ok(());
        }
        println!("{}", outcome.message);
        for step in &outcome.steps {
            println!("  {} {}", step.function, step.explorer_url);
        }
        Ok(())
    }

    async fn connect(&self) -> Result<(), TxError> {
        self.ctx.session.connect().await?;
        self.ctx.session.ready().map(|_| ())
    }

    async fn run<P: PageController>(
        &mut self,
        page: &mut P,
        action: P::Action,
    ) -> Result<ActionOutcome, TxError> {
        let progress: Arc<dyn Fn(TxProgress) + Send + Sync> = Arc::new(|event| {
            tracing::info!(progress = %event, "action progress");
        });
        controller::submit(page, &self.ctx, &mut self.notifier, action, progress).await
    }

    async fn execute(&mut self, command: Command) -> Result<(), TxError> {
        match command {
            Command::Status => self.status().await,
            Command::Registry => {
                self.registry();
                Ok(())
            }
            Command::Faucet { token, amount } => {
                self.connect().await?;
                let mut page = match token {
                    FaucetToken::Usdc => FaucetPage::reserve(),
                    FaucetToken::Lst => FaucetPage::collateral(),
                };
                set_amount(&mut page.amount, &amount)?;
                let outcome = self.run(&mut page, FaucetAction::Mint).await?;
                self.finish(&outcome);
                if let Some(balance) = page.balance {
                    self.print(json!({ "balance": balance.display() }), || {
                        format!("Balance: {balance}")
                    });
                }
                Ok(())
            }
            Command::Mint { amount } => {
                self.connect().await?;
                let mut page = StableMintPage::new();
                controller::refresh(&mut page, &self.ctx).await?;
                set_amount(&mut page.amount, &amount)?;
                let outcome = self.run(&mut page, StableAction::Mint).await?;
                self.finish(&outcome);
                Ok(())
            }
            Command::Vault(command) => self.vault(command).await,
            Command::Delegate { amount } => self.restake(RestakingAction::Delegate, amount).await,
            Command::Undelegate { amount } => {
                self.restake(RestakingAction::Undelegate, amount).await
            }
            Command::Loan(command) => self.loan(command).await,
            Command::Admin(command) => self.admin(command).await,
            Command::Rwa(command) => self.rwa(command).await,
        }
    }

    fn finish(&self, outcome: &ActionOutcome) {
        if let Err(err) = self.report(outcome) {
            tracing::warn!(error = %err, "could not print outcome");
        }
    }

    async fn status(&self) -> Result<(), TxError> {
        self.connect().await?;
        let status = self.ctx.session.status();
        let account = status.account.ok_or(TxError::NotConnected)?;
        let mut balances = Vec::new();
        for token in TokenId::ALL {
            match reads::token_balance(&self.ctx, token, account).await {
                Ok(amount) => balances.push(amount),
                Err(TxError::ContractNotDeployed { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        let chain = self.ctx.chain();
        self.print(
            json!({
                "chain": chain.key,
                "chain_id": chain.id,
                "account": account,
                "balances": balances
                    .iter()
                    .map(|b| json!({ "token": b.token, "amount": b.display() }))
                    .collect::<Vec<_>>(),
            }),
            || {
                let mut text = format!("{} ({})\naccount {account}", chain.name, chain.id);
                for balance in &balances {
                    text.push_str(&format!("\n  {:>6}  {}", balance.token, balance.compact()));
                }
                text
            },
        );
        Ok(())
    }

    fn registry(&self) {
        let registry = &self.ctx.registry;
        let mut rows = Vec::new();
        for chain in registry.chains() {
            let contracts: Vec<_> = shared::domain::ContractName::ALL
                .into_iter()
                .map(|name| {
                    let address = registry.resolve(name, chain.id).ok().map(|c| c.address);
                    (name, address)
                })
                .collect();
            rows.push((chain, contracts));
        }
        self.print(
            json!(rows
                .iter()
                .map(|(chain, contracts)| json!({
                    "chain": chain.key,
                    "chain_id": chain.id,
                    "contracts": contracts
                        .iter()
                        .map(|(name, address)| (name.as_str().to_string(), json!(address)))
                        .collect::<serde_json::Map<_, _>>(),
                }))
                .collect::<Vec<_>>()),
            || {
                let mut text = String::new();
                for (chain, contracts) in &rows {
                    text.push_str(&format!("{} [{}] chain id {}\n", chain.name, chain.key, chain.id));
                    for (name, address) in contracts {
                        let address = address
                            .map(|a| a.to_string())
                            .unwrap_or_else(|| "not deployed".into());
                        text.push_str(&format!("  {:<20} {address}\n", name.as_str()));
                    }
                }
                text.trim_end().to_string()
            },
        );
    }

    async fn vault(&mut self, command: VaultCommand) -> Result<(), TxError> {
        self.connect().await?;
        let mut page = VaultPage::new();
        match command {
            VaultCommand::Show => {
                controller::refresh(&mut page, &self.ctx).await?;
                let rate = page.exchange_rate();
                if let Some(position) = &page.position {
                    self.print(json!(position), || {
                        format!(
                            "shares {}\nPUSD {}\nvault assets {}\n{}",
                            position.shares,
                            position.asset_balance,
                            position.total_assets,
                            rate.as_deref().unwrap_or("vault is empty")
                        )
                    });
                }
                Ok(())
            }
            VaultCommand::Deposit { amount } => {
                set_amount(&mut page.deposit_amount, &amount)?;
                let outcome = self.run(&mut page, VaultAction::Deposit).await?;
                self.finish(&outcome);
                Ok(())
            }
            VaultCommand::Redeem { shares } => {
                page.select_tab(VaultTab::Withdraw);
                set_amount(&mut page.redeem_amount, &shares)?;
                let outcome = self.run(&mut page, VaultAction::Redeem).await?;
                self.finish(&outcome);
                Ok(())
            }
            VaultCommand::Preview { kind, amount } => {
                let request = PreviewRequest {
                    tab: match kind {
                        PreviewKind::Deposit => VaultTab::Deposit,
                        PreviewKind::Redeem => VaultTab::Withdraw,
                    },
                    input: amount,
                };
                let preview = VaultPage::preview_loader(&self.ctx, &request).await?;
                self.print(json!({ "receive": preview.display(), "token": preview.token }), || {
                    format!("You will receive {preview}")
                });
                Ok(())
            }
        }
    }

    async fn restake(&mut self, action: RestakingAction, amount: String) -> Result<(), TxError> {
        self.connect().await?;
        let mut page = RestakingPage::new();
        set_amount(&mut page.amount, &amount)?;
        let outcome = self.run(&mut page, action).await?;
        self.finish(&outcome);
        if let Some(snapshot) = &page.snapshot {
            self.print(
                json!({ "balance": snapshot.balance.display(), "delegated": snapshot.delegation.amount.display() }),
                || format!("Balance {} / delegated {}", snapshot.balance, snapshot.delegation.amount),
            );
        }
        Ok(())
    }

    async fn loan(&mut self, command: LoanCommand) -> Result<(), TxError> {
        self.connect().await?;
        let mut page = LoansPage::new();
        let action = match command {
            LoanCommand::Show => {
                controller::refresh(&mut page, &self.ctx).await?;
                self.show_loan(&page);
                return Ok(());
            }
            LoanCommand::Take { amount } => {
                set_amount(&mut page.amount, &amount)?;
                LoanAction::Take
            }
            LoanCommand::Repay => {
                controller::refresh(&mut page, &self.ctx).await?;
                LoanAction::Repay
            }
            LoanCommand::MintOperator => LoanAction::MintToOperator,
        };
        let outcome = self.run(&mut page, action).await?;
        self.finish(&outcome);
        Ok(())
    }

    fn show_loan(&self, page: &LoansPage) {
        let Some(snapshot) = &page.snapshot else {
            return;
        };
        let now = chrono::Utc::now();
        match page.loans_view() {
            LoansView::Active(loan) => self.print(
                json!({ "loan": loan, "repayment": snapshot.repayment.map(|r| r.display()) }),
                || {
                    let due = page
                        .due_in(now)
                        .map(|left| format!("{} days", left.num_days()))
                        .unwrap_or_else(|| "unknown".into());
                    format!(
                        "principal {}\ncollateral {}\ninterest {}%\nrepayment {}\ndue in {due}",
                        loan.principal,
                        loan.collateral,
                        loan.interest_rate_percent(),
                        snapshot
                            .repayment
                            .map(|r| r.to_string())
                            .unwrap_or_else(|| "-".into()),
                    )
                },
            ),
            _ => self.print(json!({ "loan": null }), || "No active loans".to_string()),
        }
        self.print(
            json!({
                "stable_balance": snapshot.stable_balance.display(),
                "delegated": snapshot.delegation.amount.display(),
                "operator_balance": snapshot.operator_balance.map(|b| b.display()),
            }),
            || {
                format!(
                    "PUSD {} / delegated {}",
                    snapshot.stable_balance, snapshot.delegation.amount
                )
            },
        );
    }

    async fn admin(&mut self, command: AdminCommand) -> Result<(), TxError> {
        let mut page = AdminPage::new(self.ctx.data_source);
        if !self.ctx.is_mock() {
            self.connect().await?;
            controller::refresh(&mut page, &self.ctx).await?;
        }
        let action = match command {
            AdminCommand::Operators => {
                self.print(json!(page.operators), || {
                    let mut text = format!(
                        "base rate {}%  total collateral {}",
                        page.base_rate_percent(),
                        page.total_collateral()
                    );
                    for op in &page.operators {
                        text.push_str(&format!(
                            "\n  #{} {:<16} {} {:>10} {}",
                            op.id,
                            op.name,
                            op.short_address(),
                            op.collateral,
                            op.status
                        ));
                    }
                    text
                });
                return Ok(());
            }
            AdminCommand::Slash {
                operator,
                amount,
                reason,
            } => {
                page.select_for_slash(OperatorId(operator));
                set_amount(&mut page.slash.amount, &amount)?;
                page.slash.reason = reason;
                AdminAction::Slash
            }
            AdminCommand::BaseRate { percent } => {
                set_amount(&mut page.base_rate, &percent)?;
                AdminAction::SetBaseRate
            }
            AdminCommand::Onboard {
                name,
                address,
                collateral,
            } => {
                page.onboard.name = name;
                page.onboard.address = address;
                set_amount(&mut page.onboard.collateral, &collateral)?;
                AdminAction::Onboard
            }
        };
        let outcome = self.run(&mut page, action).await?;
        self.finish(&outcome);
        Ok(())
    }

    async fn rwa(&mut self, command: RwaCommand) -> Result<(), TxError> {
        let mut page = RwaPage::new(self.ctx.data_source);
        if let RwaCommand::Add {
            name,
            amount,
            yield_percent,
        } = command
        {
            page.form.name = name;
            set_amount(&mut page.form.amount, &amount)?;
            set_amount(&mut page.form.yield_percent, &yield_percent)?;
            let outcome = self.run(&mut page, RwaAction::AddAsset).await?;
            self.finish(&outcome);
        }
        self.print(
            json!({
                "total_value": page.total_value(),
                "weighted_yield": page.weighted_yield(),
                "assets": page.assets.iter().map(|a| json!({
                    "name": a.name, "amount": a.amount, "yield": a.yield_percent, "value": a.value,
                })).collect::<Vec<_>>(),
            }),
            || {
                let mut text = format!(
                    "portfolio ${:.2}  yield {:.2}% ({:+.2}% over base)",
                    page.total_value(),
                    page.weighted_yield(),
                    page.yield_premium()
                );
                for asset in &page.assets {
                    text.push_str(&format!(
                        "\n  {:<20} {:>10.2} {:>5.2}% ${:.2}",
                        asset.name, asset.amount, asset.yield_percent, asset.value
                    ));
                }
                text
            },
        );
        Ok(())
    }
}

fn set_amount(field: &mut controller::AmountField, input: &str) -> Result<(), TxError> {
    if field.set(input.trim()) {
        return Ok(());
    }
    Err(TxError::validation(format!("'{input}' is not a valid amount.")))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = load_settings(args.config.as_deref()).context("failed to load settings")?;
    let ctx = bootstrap(&settings).context("failed to build client context")?;
    let mut cli = Cli {
        ctx,
        json: args.json,
        notifier: Notifier::new(settings.notification_ttl()),
    };

    match cli.execute(args.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            if cli.json {
                println!("{}", serde_json::to_string(&err.report())?);
            } else {
                eprintln!("error: {}", err.user_message());
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
