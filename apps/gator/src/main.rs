mod config;
mod controller;
mod view;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    BundlerRedeemer, ConnectAction, Erc7715Wallet, GatorClient, MissingRedeemer, PublicClient,
    Redeemer, WalletClient,
};
use shared::{
    domain::{Address, HexBytes, Wei},
    protocol::Call,
};
use storage::{SessionStore, Storage};
use tracing_subscriber::EnvFilter;

use config::Settings;
use controller::{
    events::{FlowEvent, UiError, UiErrorContext},
    orchestration::{
        connect_preview, dispatch_flow_action, run_walkthrough, step_view, FlowAction,
        WalkthroughOptions, WalkthroughOutcome,
    },
};

#[derive(Parser, Debug)]
#[command(name = "hello-gator", about = "ERC-7715 session account permission flow")]
struct Cli {
    /// TOML settings file; `gator.toml` is read when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    session: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    wallet_url: Option<String>,
    #[arg(long)]
    bundler_url: Option<String>,
    #[arg(long)]
    chain_rpc_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current step for the session.
    Status,
    /// Connect the wallet and move it to the configured chain.
    Connect,
    CreateAccount,
    Grant,
    Redeem {
        #[command(flatten)]
        call: CallArgs,
    },
    /// Forget the session account and permission.
    Reset,
    /// List sessions with stored state.
    Sessions,
    /// Step through the whole flow.
    Walkthrough {
        /// Run every step without prompting.
        #[arg(long)]
        yes: bool,
        #[command(flatten)]
        call: CallArgs,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct CallArgs {
    /// Call target; without it 1 wei is sent to the session account.
    #[arg(long)]
    to: Option<Address>,
    /// Value in wei, decimal or 0x-hex.
    #[arg(long, requires = "to")]
    value: Option<Wei>,
    #[arg(long, requires = "to")]
    data: Option<HexBytes>,
}

impl CallArgs {
    fn into_calls(self) -> Vec<Call> {
        match self.to {
            Some(to) => vec![Call {
                to,
                value: self.value.unwrap_or_default(),
                data: self.data.unwrap_or_default(),
            }],
            None => Vec::new(),
        }
    }
}

impl Cli {
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(v) = &self.session {
            settings.session = v.clone();
        }
        if let Some(v) = &self.database_url {
            settings.database_url = v.clone();
        }
        if let Some(v) = &self.wallet_url {
            settings.wallet_url = v.clone();
        }
        if let Some(v) = &self.bundler_url {
            settings.bundler_url = Some(v.clone());
        }
        if let Some(v) = &self.chain_rpc_url {
            settings.chain_rpc_url = Some(v.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = config::load_settings(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings);
    if let Err(err) = settings.validate() {
        let ui = UiError::from_message(UiErrorContext::Startup, format!("{err:#}"));
        view::render_error(&mut std::io::stdout(), &ui)?;
        return Ok(ExitCode::FAILURE);
    }

    let storage = Arc::new(
        Storage::new(&settings.database_url)
            .await
            .context("failed to open session database")?,
    );

    let wallet: Arc<dyn Erc7715Wallet> = Arc::new(WalletClient::new(settings.wallet_endpoint()?));
    let redeemer: Arc<dyn Redeemer> = match settings.bundler_endpoint()? {
        Some(url) => Arc::new(BundlerRedeemer::new(url)),
        None => Arc::new(MissingRedeemer),
    };
    let chain = settings.chain_rpc_endpoint()?.map(PublicClient::new);
    let store: Arc<dyn SessionStore> = storage.clone();
    let client = GatorClient::new_with_redeemer(
        &settings.session,
        store,
        wallet.clone(),
        settings.stream_policy(),
        redeemer,
    );

    let mut out = std::io::stdout();
    if let Err(err) = client.load().await {
        let ui = UiError::from_flow_error(UiErrorContext::Load, &err);
        tracing::error!(category = ?ui.category(), error = %err, "failed to load session");
        view::render_error(&mut out, &ui)?;
        return Ok(ExitCode::FAILURE);
    }

    let (action, calls) = match cli.command {
        Command::Sessions => {
            for session in storage.list_sessions().await? {
                println!("{session}");
            }
            return Ok(ExitCode::SUCCESS);
        }
        Command::Status => {
            let view = step_view(&client, chain.as_ref(), client.step()).await;
            view::render_step(&mut out, &view)?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Reset => {
            if let Err(err) = client.reset().await {
                let ui = UiError::from_flow_error(UiErrorContext::Reset, &err);
                view::render_error(&mut out, &ui)?;
                return Ok(ExitCode::FAILURE);
            }
            println!("session '{}' reset", client.session());
            return Ok(ExitCode::SUCCESS);
        }
        Command::Walkthrough { yes, call } => {
            let options = WalkthroughOptions {
                auto_confirm: yes,
                calls: call.into_calls(),
            };
            let mut input = tokio::io::BufReader::new(tokio::io::stdin());
            let outcome =
                run_walkthrough(&client, chain.as_ref(), &options, &mut input, &mut out).await?;
            return Ok(match outcome {
                WalkthroughOutcome::Redeemed(receipt) => {
                    tracing::info!(bundle_id = %receipt.bundle_id, "walkthrough finished");
                    ExitCode::SUCCESS
                }
                WalkthroughOutcome::Quit => ExitCode::SUCCESS,
                WalkthroughOutcome::Failed(ui) => {
                    tracing::error!(
                        context = ui.context().label(),
                        category = ?ui.category(),
                        "walkthrough stopped"
                    );
                    ExitCode::FAILURE
                }
            });
        }
        Command::Connect => {
            match connect_preview(wallet.as_ref(), client.chain_id()).await {
                Some(ConnectAction::Connect) => println!("requesting wallet connection"),
                Some(ConnectAction::SwitchChain(chain_id)) => {
                    println!("switching wallet to chain {chain_id}")
                }
                None => {}
            }
            (FlowAction::Connect, Vec::new())
        }
        Command::CreateAccount => (FlowAction::CreateAccount, Vec::new()),
        Command::Grant => (FlowAction::Grant, Vec::new()),
        Command::Redeem { call } => (FlowAction::Redeem, call.into_calls()),
    };

    let code = match dispatch_flow_action(&client, action, &calls).await {
        FlowEvent::Connected(connection) => {
            view::render_connection(&mut out, &connection)?;
            ExitCode::SUCCESS
        }
        FlowEvent::AccountCreated(address) => {
            println!("session account created: {address}");
            ExitCode::SUCCESS
        }
        FlowEvent::PermissionGranted { expiry } => {
            println!("permission stored, expires at unix time {expiry}");
            ExitCode::SUCCESS
        }
        FlowEvent::Redeemed(receipt) => {
            view::render_receipt(&mut out, &receipt)?;
            ExitCode::SUCCESS
        }
        FlowEvent::Error(ui) => {
            tracing::error!(
                action = action.name(),
                category = ?ui.category(),
                message = ui.message(),
                "flow action failed"
            );
            view::render_error(&mut out, &ui)?;
            ExitCode::FAILURE
        }
    };
    Ok(code)
}
