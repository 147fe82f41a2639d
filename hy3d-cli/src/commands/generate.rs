//! `hy3d text` / `hy3d image`: run one job to completion, printing progress.

use anyhow::Context;
use hy3d_core::GenerationRequest;
use hy3d_engine::{ControllerEvent, JobSnapshot, SessionStatus};
use hy3d_runtime::{ConfigStore, build_controller, image_input};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

const EXIT_FAILED: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

pub async fn run_text(store: &ConfigStore, prompt: String) -> anyhow::Result<ExitCode> {
    let request = GenerationRequest::text(prompt)?;
    run(store, request).await
}

pub async fn run_image(store: &ConfigStore, path: &Path) -> anyhow::Result<ExitCode> {
    let request = image_input::image_request(path)
        .with_context(|| format!("load image {}", path.display()))?;
    run(store, request).await
}

async fn run(store: &ConfigStore, request: GenerationRequest) -> anyhow::Result<ExitCode> {
    let settings = super::effective_settings(store)?;
    if !settings.client.has_api_key() {
        eprintln!("warning: no API key set (hy3d config set-key <KEY> or HY3D_API_KEY)");
    }

    let controller = Arc::new(build_controller(&settings)?);
    let mut events = controller.events();

    let starter = Arc::clone(&controller);
    tokio::spawn(async move {
        starter.start(request).await;
    });

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let last = loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ControllerEvent::StateChanged(snap)) => {
                    println!("{}", progress_line(&snap));
                    if snap.status.is_terminal() {
                        break snap;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("skipped {skipped} progress events");
                    let snap = controller.snapshot();
                    if snap.status.is_terminal() {
                        break snap;
                    }
                }
                Err(RecvError::Closed) => break controller.snapshot(),
            },
            _ = &mut ctrl_c => {
                controller.reset();
                eprintln!("Cancelled.");
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
        }
    };

    Ok(report(&last))
}

fn progress_line(snap: &JobSnapshot) -> String {
    match &snap.job_id {
        Some(id) => format!("[{}] {:>3}% job={}", snap.status, snap.progress, id),
        None => format!("[{}] {:>3}%", snap.status, snap.progress),
    }
}

fn report(snap: &JobSnapshot) -> ExitCode {
    match (snap.status, &snap.result_url) {
        (SessionStatus::Success, Some(url)) => {
            println!("Model: {url}");
            ExitCode::SUCCESS
        }
        _ => {
            let message = snap.error_message.as_deref().unwrap_or("generation did not finish");
            eprintln!("Error: {message}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}
