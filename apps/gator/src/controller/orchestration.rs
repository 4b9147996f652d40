//! Runs flow actions against the client and drives the interactive walkthrough.

use std::io::Write;

use client_core::{
    connect_action, current_connection, ConnectAction, Erc7715Wallet, GatorClient, InputsClosed,
    PublicClient, StepWatcher,
};
use shared::{
    domain::{ChainId, Step},
    protocol::Call,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use super::events::{FlowEvent, UiError, UiErrorContext};
use crate::view::{self, StepView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowAction {
    Connect,
    CreateAccount,
    Grant,
    Redeem,
}

impl FlowAction {
    pub fn for_step(step: Step) -> Self {
        match step {
            Step::AccountCreation => FlowAction::CreateAccount,
            Step::PermissionGranting => FlowAction::Grant,
            Step::PermissionRedemption => FlowAction::Redeem,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FlowAction::Connect => "connect",
            FlowAction::CreateAccount => "create_session_account",
            FlowAction::Grant => "grant_permissions",
            FlowAction::Redeem => "redeem_permission",
        }
    }

    fn context(self) -> UiErrorContext {
        match self {
            FlowAction::Connect => UiErrorContext::Connect,
            FlowAction::CreateAccount => UiErrorContext::CreateAccount,
            FlowAction::Grant => UiErrorContext::Grant,
            FlowAction::Redeem => UiErrorContext::Redeem,
        }
    }

    fn prompt(self) -> &'static str {
        match self {
            FlowAction::Connect => "connect the wallet",
            FlowAction::CreateAccount => "create a session account",
            FlowAction::Grant => "request permissions from the wallet",
            FlowAction::Redeem => "redeem the permission",
        }
    }
}

/// Performs one action and reports its effect as an event. Step changes are
/// not reported here; they reach observers through the providers.
pub async fn dispatch_flow_action(
    client: &GatorClient,
    action: FlowAction,
    calls: &[Call],
) -> FlowEvent {
    debug!(action = action.name(), session = client.session(), "running flow action");
    let result = match action {
        FlowAction::Connect => client.connect().await.map(FlowEvent::Connected),
        FlowAction::CreateAccount => client
            .create_session_account()
            .await
            .map(|account| FlowEvent::AccountCreated(account.address())),
        FlowAction::Grant => client
            .grant_permissions()
            .await
            .map(|granted| FlowEvent::PermissionGranted {
                expiry: granted.request.expiry,
            }),
        FlowAction::Redeem => client.redeem(calls.to_vec()).await.map(FlowEvent::Redeemed),
    };
    result.unwrap_or_else(|err| FlowEvent::Error(UiError::from_flow_error(action.context(), &err)))
}

/// What `connect` is about to do, or `None` when the wallet cannot be read.
pub async fn connect_preview(
    wallet: &dyn Erc7715Wallet,
    configured: ChainId,
) -> Option<ConnectAction> {
    match current_connection(wallet).await {
        Ok(connection) => Some(connect_action(&connection, configured)),
        Err(err) => {
            warn!(error = %err, "failed to read wallet connection");
            None
        }
    }
}

pub async fn step_view(client: &GatorClient, chain: Option<&PublicClient>, step: Step) -> StepView {
    let account = client.session_account();
    let balance = match (step, chain, &account) {
        (Step::PermissionRedemption, Some(chain), Some(account)) => {
            match chain.balance(account.address()).await {
                Ok(balance) => Some(balance),
                Err(err) => {
                    warn!(error = %err, "failed to read session account balance");
                    None
                }
            }
        }
        _ => None,
    };
    StepView {
        session: client.session().to_owned(),
        step,
        account,
        permission: client.permission(),
        balance,
    }
}

#[derive(Debug, Clone, Default)]
pub struct WalkthroughOptions {
    pub auto_confirm: bool,
    pub calls: Vec<Call>,
}

#[derive(Debug)]
pub enum WalkthroughOutcome {
    Redeemed(client_core::RedemptionReceipt),
    Quit,
    Failed(UiError),
}

/// Shows the current step, runs its action on confirmation and follows the
/// step controller until a permission has been redeemed.
pub async fn run_walkthrough<R, W>(
    client: &GatorClient,
    chain: Option<&PublicClient>,
    options: &WalkthroughOptions,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<WalkthroughOutcome>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    view::render_hero(out)?;

    match dispatch_flow_action(client, FlowAction::Connect, &[]).await {
        FlowEvent::Connected(connection) => view::render_connection(out, &connection)?,
        FlowEvent::Error(err) => {
            view::render_error(out, &err)?;
            return Ok(WalkthroughOutcome::Failed(err));
        }
        other => debug!(event = ?other, "unexpected connect event"),
    }

    let watcher = client.watch_steps();
    loop {
        let step = watcher.current();
        let view = step_view(client, chain, step).await;
        view::render_step(out, &view)?;

        let action = FlowAction::for_step(step);
        if !options.auto_confirm && !confirm(action, input, out).await? {
            return Ok(WalkthroughOutcome::Quit);
        }

        match dispatch_flow_action(client, action, &options.calls).await {
            FlowEvent::AccountCreated(address) => {
                writeln!(out, "session account created: {address}")?;
                wait_to_leave(&watcher, step).await?;
            }
            FlowEvent::PermissionGranted { .. } => {
                writeln!(out, "permission stored")?;
                wait_to_leave(&watcher, step).await?;
            }
            FlowEvent::Redeemed(receipt) => {
                view::render_receipt(out, &receipt)?;
                return Ok(WalkthroughOutcome::Redeemed(receipt));
            }
            FlowEvent::Error(err) => {
                view::render_error(out, &err)?;
                if options.auto_confirm || !err.is_retryable() {
                    return Ok(WalkthroughOutcome::Failed(err));
                }
            }
            other => debug!(event = ?other, "ignoring flow event"),
        }
        writeln!(out)?;
    }
}

/// A stored permission without an account can skip step 2, so this waits for
/// any change rather than a specific next step.
async fn wait_to_leave(watcher: &StepWatcher, step: Step) -> Result<Step, InputsClosed> {
    let mut steps = watcher.subscribe();
    steps
        .wait_for(|current| *current != step)
        .await
        .map(|current| *current)
        .map_err(|_| InputsClosed)
}

async fn confirm<R, W>(action: FlowAction, input: &mut R, out: &mut W) -> anyhow::Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(out, "press Enter to {}, or q to quit: ", action.prompt())?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(false);
    }
    Ok(!line.trim().eq_ignore_ascii_case("q"))
}

#[cfg(test)]
#[path = "../tests/orchestration_tests.rs"]
mod tests;
