use crate::config_store::Settings;
use anyhow::Context;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

pub const ENV_API_KEY: &str = "HY3D_API_KEY";
pub const ENV_BASE_URL: &str = "HY3D_BASE_URL";
pub const ENV_USE_PROXY: &str = "HY3D_USE_PROXY";
pub const ENV_PROXY_URL: &str = "HY3D_PROXY_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "HY3D_POLL_INTERVAL_MS";

/// Applies `HY3D_*` overrides read through `var`. Empty values are ignored.
pub fn apply_env_overrides(
    settings: &mut Settings,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    let get = |name: &str| var(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(v) = get(ENV_API_KEY) {
        settings.client.api_key = v;
    }
    if let Some(v) = get(ENV_BASE_URL) {
        settings.client.base_url = v;
    }
    if let Some(v) = get(ENV_USE_PROXY) {
        settings.client.use_proxy = parse_flag(&v).with_context(|| format!("{ENV_USE_PROXY}={v}"))?;
    }
    if let Some(v) = get(ENV_PROXY_URL) {
        settings.client.proxy_url = v;
    }
    if let Some(v) = get(ENV_POLL_INTERVAL_MS) {
        settings.poll_interval_ms = v
            .parse()
            .with_context(|| format!("{ENV_POLL_INTERVAL_MS}={v} is not a number of milliseconds"))?;
    }
    Ok(())
}

pub fn apply_process_env(settings: &mut Settings) -> anyhow::Result<()> {
    apply_env_overrides(settings, |name| std::env::var(name).ok())
}

pub fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected on/off, got {other:?}"),
    }
}
