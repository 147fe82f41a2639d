use std::sync::Arc;

use anyhow::Context;
use hy3d_engine::{JobApi, JobController};

use crate::api::HunyuanJobApi;
use crate::config_store::Settings;

/// Build a controller talking to the configured backend.
pub fn build_controller(settings: &Settings) -> anyhow::Result<JobController> {
    let api: Arc<dyn JobApi> = Arc::new(HunyuanJobApi::new().context("create HTTP client")?);
    Ok(build_controller_with(settings, api))
}

pub fn build_controller_with(settings: &Settings, api: Arc<dyn JobApi>) -> JobController {
    if !settings.client.has_api_key() {
        log::warn!("no API key configured; requests will likely be rejected");
    }
    log::info!(
        "controller: {} mode, base {}, polling every {} ms",
        settings.client.mode_label(),
        settings.client.base_url,
        settings.poll_interval_ms
    );
    JobController::new(api, settings.controller_config(), settings.client.clone())
}
