//! Plain-text rendering of the flow for the terminal.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use client_core::{PermissionRecord, RedemptionReceipt, SessionAccount, WalletConnection};
use shared::domain::{Step, Wei};

use crate::controller::events::UiError;

/// Everything a step screen needs, gathered once per render.
#[derive(Debug, Clone)]
pub struct StepView {
    pub session: String,
    pub step: Step,
    pub account: Option<SessionAccount>,
    pub permission: Option<PermissionRecord>,
    pub balance: Option<Wei>,
}

pub fn render_hero(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Hello Gator")?;
    writeln!(out, "ERC-7715 permission flow starter")?;
    writeln!(out)
}

pub fn render_step(out: &mut impl Write, view: &StepView) -> io::Result<()> {
    writeln!(
        out,
        "[session {}] step {}/3: {}",
        view.session,
        view.step.number(),
        view.step
    )?;

    match view.step {
        Step::AccountCreation => {
            writeln!(
                out,
                "  A session account is the delegate that later redeems what the user grants."
            )?;
            writeln!(
                out,
                "  Think of a subscription service: the dApp owns this account and collects"
            )?;
            writeln!(out, "  the subscription through it.")?;
            writeln!(
                out,
                "  Here it is a burner key stored with the session; production setups should"
            )?;
            writeln!(out, "  use a proper signer.")?;
        }
        Step::PermissionGranting => {
            if let Some(account) = &view.account {
                writeln!(out, "  session account: {}", account.address())?;
            }
            writeln!(
                out,
                "  The wallet will ask the user to grant the session account a native token"
            )?;
            writeln!(
                out,
                "  stream. The granted response is stored for redemption in the next step."
            )?;
        }
        Step::PermissionRedemption => {
            if let Some(account) = &view.account {
                writeln!(out, "  session account: {}", account.address())?;
            }
            if let Some(record) = &view.permission {
                writeln!(
                    out,
                    "  permission granted at {} expires {}",
                    record.stored_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    format_expiry(record.permission.request.expiry)
                )?;
            }
            writeln!(
                out,
                "  The session account submits a call bundle that spends the granted permission."
            )?;
            match view.balance {
                Some(Wei(0)) => writeln!(
                    out,
                    "  warning: session account balance is 0 wei; make sure it holds enough tokens"
                )?,
                Some(balance) => writeln!(out, "  session account balance: {balance} wei")?,
                None => writeln!(
                    out,
                    "  note: make sure the session account holds enough tokens"
                )?,
            }
        }
    }
    Ok(())
}

pub fn render_connection(out: &mut impl Write, connection: &WalletConnection) -> io::Result<()> {
    match (connection.account, connection.chain_id) {
        (Some(account), Some(chain_id)) => {
            writeln!(out, "wallet connected: {account} on chain {chain_id}")
        }
        (Some(account), None) => writeln!(out, "wallet connected: {account}"),
        (None, _) => writeln!(out, "wallet not connected"),
    }
}

pub fn render_receipt(out: &mut impl Write, receipt: &RedemptionReceipt) -> io::Result<()> {
    writeln!(
        out,
        "redemption submitted: bundle {} from {} on chain {}",
        receipt.bundle_id, receipt.from, receipt.chain_id
    )
}

pub fn render_error(out: &mut impl Write, err: &UiError) -> io::Result<()> {
    writeln!(out, "{err}")?;
    writeln!(out, "  hint: {}", err.hint())
}

fn format_expiry(expiry: u64) -> String {
    i64::try_from(expiry)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("at unix time {expiry}"))
}
