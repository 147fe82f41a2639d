pub mod config;
pub mod generate;

use hy3d_runtime::{ConfigStore, Settings};

/// Stored settings with `HY3D_*` environment overrides applied.
pub fn effective_settings(store: &ConfigStore) -> anyhow::Result<Settings> {
    let mut settings = store.load_or_default()?;
    hy3d_runtime::defaults::apply_process_env(&mut settings)?;
    Ok(settings)
}
