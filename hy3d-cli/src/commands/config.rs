//! `hy3d config ...`: inspect and edit the settings file.

use anyhow::Context;
use clap::{Subcommand, ValueEnum};
use hy3d_runtime::{ConfigStore, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show effective settings (API key redacted)
    Show,

    /// Store the API key
    SetKey { key: String },

    /// Set the API base URL
    SetBaseUrl { url: String },

    /// Route requests through the CORS relay
    SetProxy {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Set the relay prefix; the target URL is appended percent-encoded
    SetProxyUrl { url: String },

    /// Set the status poll interval in milliseconds
    SetInterval {
        #[arg(value_parser = clap::value_parser!(u64).range(100..))]
        ms: u64,
    },

    /// Show the settings file path
    Path,
}

pub fn run(store: &ConfigStore, command: ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let settings = super::effective_settings(store)?;
            print!("{}", render(&settings));
        }
        ConfigCommands::SetKey { key } => {
            let key = key.trim().to_string();
            anyhow::ensure!(!key.is_empty(), "API key must not be empty");
            save(store, |s| s.client.api_key = key)?;
        }
        ConfigCommands::SetBaseUrl { url } => {
            let url = require_http_url("base URL", &url)?;
            save(store, |s| s.client.base_url = url)?;
        }
        ConfigCommands::SetProxy { state } => {
            save(store, |s| s.client.use_proxy = state == Toggle::On)?;
        }
        ConfigCommands::SetProxyUrl { url } => {
            let url = require_http_url("proxy URL", &url)?;
            save(store, |s| s.client.proxy_url = url)?;
        }
        ConfigCommands::SetInterval { ms } => {
            save(store, |s| s.poll_interval_ms = ms)?;
        }
        ConfigCommands::Path => println!("{}", store.path().display()),
    }
    Ok(())
}

fn save(store: &ConfigStore, change: impl FnOnce(&mut Settings)) -> anyhow::Result<()> {
    store
        .update(change)
        .with_context(|| format!("update {}", store.path().display()))?;
    println!("Saved {}", store.path().display());
    Ok(())
}

/// Trimmed `raw`, if it parses as an absolute http(s) URL.
fn require_http_url(label: &str, raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    let parsed = url::Url::parse(raw).with_context(|| format!("{label} {raw:?} is not a URL"))?;
    anyhow::ensure!(
        matches!(parsed.scheme(), "http" | "https"),
        "{label} must start with http:// or https://"
    );
    Ok(raw.to_string())
}

fn redact_key(key: &str) -> String {
    let key = key.trim();
    if key.is_empty() {
        return "(not set)".into();
    }
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "********".into();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("********{tail}")
}

fn render(settings: &Settings) -> String {
    let c = &settings.client;
    format!(
        "api_key:          {}\nbase_url:         {}\nuse_proxy:        {}\nproxy_url:        {}\npoll_interval_ms: {}\n",
        redact_key(&c.api_key),
        c.base_url,
        if c.use_proxy { "on" } else { "off" },
        c.proxy_url,
        settings.poll_interval_ms,
    )
}
