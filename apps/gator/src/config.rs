use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use client_core::StreamPolicy;
use serde::Deserialize;
use shared::domain::{ChainId, Wei};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "gator.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub session: String,
    pub wallet_url: String,
    pub bundler_url: Option<String>,
    pub chain_rpc_url: Option<String>,
    pub chain_id: u64,
    pub initial_amount_wei: u128,
    pub amount_per_second_wei: u128,
    pub max_amount_wei: u128,
    pub validity_secs: u64,
    pub justification: String,
}

impl Default for Settings {
    fn default() -> Self {
        let policy = StreamPolicy::default();
        Self {
            database_url: "sqlite://./data/gator.db".into(),
            session: "default".into(),
            wallet_url: "http://127.0.0.1:8546/".into(),
            bundler_url: None,
            chain_rpc_url: None,
            chain_id: policy.chain_id.0,
            initial_amount_wei: policy.initial_amount.0,
            amount_per_second_wei: policy.amount_per_second.0,
            max_amount_wei: policy.max_amount.0,
            validity_secs: policy.validity_secs,
            justification: policy.justification,
        }
    }
}

/// Every key is optional; absent keys keep the default. Amounts accept a TOML
/// integer or a decimal/`0x` string.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    database_url: Option<String>,
    session: Option<String>,
    wallet_url: Option<String>,
    bundler_url: Option<String>,
    chain_rpc_url: Option<String>,
    chain_id: Option<u64>,
    initial_amount_wei: Option<Wei>,
    amount_per_second_wei: Option<Wei>,
    max_amount_wei: Option<Wei>,
    validity_secs: Option<u64>,
    justification: Option<String>,
}

impl Settings {
    pub fn stream_policy(&self) -> StreamPolicy {
        StreamPolicy {
            chain_id: ChainId(self.chain_id),
            initial_amount: Wei(self.initial_amount_wei),
            amount_per_second: Wei(self.amount_per_second_wei),
            max_amount: Wei(self.max_amount_wei),
            validity_secs: self.validity_secs,
            justification: self.justification.clone(),
        }
    }

    pub fn wallet_endpoint(&self) -> anyhow::Result<Url> {
        parse_endpoint("wallet_url", &self.wallet_url)
    }

    pub fn bundler_endpoint(&self) -> anyhow::Result<Option<Url>> {
        self.bundler_url
            .as_deref()
            .map(|raw| parse_endpoint("bundler_url", raw))
            .transpose()
    }

    pub fn chain_rpc_endpoint(&self) -> anyhow::Result<Option<Url>> {
        self.chain_rpc_url
            .as_deref()
            .map(|raw| parse_endpoint("chain_rpc_url", raw))
            .transpose()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.session.trim().is_empty() {
            bail!("session label must not be empty");
        }
        if self.max_amount_wei < self.initial_amount_wei {
            bail!(
                "max_amount_wei ({}) is below initial_amount_wei ({})",
                self.max_amount_wei,
                self.initial_amount_wei
            );
        }
        if self.validity_secs == 0 {
            bail!("validity_secs must be positive");
        }
        self.wallet_endpoint()?;
        self.bundler_endpoint()?;
        self.chain_rpc_endpoint()?;
        Ok(())
    }
}

fn parse_endpoint(key: &str, raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("{key} is not a valid url: '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{key} must use http or https, got '{}'", url.scheme());
    }
    Ok(url)
}

pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_from(config_path, |key| std::env::var(key).ok())
}

/// Defaults, then the TOML file, then environment overrides (`GATOR_*`, with
/// `APP__*` taking precedence).
pub fn load_settings_from(
    config_path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
            apply_file(&mut settings, file_cfg);
        }
        Err(err) if required || err.kind() != std::io::ErrorKind::NotFound => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()));
        }
        Err(_) => {}
    }

    let lookup = |name: &str| env(&format!("APP__{name}")).or_else(|| env(&format!("GATOR_{name}")));

    if let Some(v) = lookup("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = lookup("SESSION") {
        settings.session = v;
    }
    if let Some(v) = lookup("WALLET_URL") {
        settings.wallet_url = v;
    }
    if let Some(v) = lookup("BUNDLER_URL") {
        settings.bundler_url = Some(v);
    }
    if let Some(v) = lookup("CHAIN_RPC_URL") {
        settings.chain_rpc_url = Some(v);
    }
    if let Some(v) = lookup("CHAIN_ID") {
        settings.chain_id = v
            .parse::<ChainId>()
            .with_context(|| format!("invalid chain id override '{v}'"))?
            .0;
    }
    if let Some(v) = lookup("INITIAL_AMOUNT_WEI") {
        settings.initial_amount_wei = parse_wei("initial amount", &v)?;
    }
    if let Some(v) = lookup("AMOUNT_PER_SECOND_WEI") {
        settings.amount_per_second_wei = parse_wei("amount per second", &v)?;
    }
    if let Some(v) = lookup("MAX_AMOUNT_WEI") {
        settings.max_amount_wei = parse_wei("max amount", &v)?;
    }
    if let Some(v) = lookup("JUSTIFICATION") {
        settings.justification = v;
    }
    if let Some(v) = lookup("VALIDITY_SECS") {
        settings.validity_secs = v
            .parse()
            .with_context(|| format!("invalid validity override '{v}'"))?;
    }

    Ok(settings)
}

fn parse_wei(what: &str, raw: &str) -> anyhow::Result<u128> {
    Ok(raw
        .parse::<Wei>()
        .with_context(|| format!("invalid {what} override '{raw}'"))?
        .0)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.session {
        settings.session = v;
    }
    if let Some(v) = file_cfg.wallet_url {
        settings.wallet_url = v;
    }
    if file_cfg.bundler_url.is_some() {
        settings.bundler_url = file_cfg.bundler_url;
    }
    if file_cfg.chain_rpc_url.is_some() {
        settings.chain_rpc_url = file_cfg.chain_rpc_url;
    }
    if let Some(v) = file_cfg.chain_id {
        settings.chain_id = v;
    }
    if let Some(v) = file_cfg.initial_amount_wei {
        settings.initial_amount_wei = v.0;
    }
    if let Some(v) = file_cfg.amount_per_second_wei {
        settings.amount_per_second_wei = v.0;
    }
    if let Some(v) = file_cfg.max_amount_wei {
        settings.max_amount_wei = v.0;
    }
    if let Some(v) = file_cfg.validity_secs {
        settings.validity_secs = v;
    }
    if let Some(v) = file_cfg.justification {
        settings.justification = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
