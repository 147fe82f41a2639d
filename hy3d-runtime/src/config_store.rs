use anyhow::Context;
use hy3d_core::ClientConfig;
use hy3d_engine::ControllerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "hy3d";

/// Everything a user can set, as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub client: ClientConfig,
    pub poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            poll_interval_ms: crate::defaults::DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Settings {
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig::default().with_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<platform config dir>/hy3d/config.json`.
    pub fn default_location() -> anyhow::Result<Self> {
        let dir = dirs::config_dir().context("no configuration directory for this platform")?;
        Ok(Self::at_path(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<Settings> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("read config: {}", self.path.display()))?;
        let settings: Settings = serde_json::from_slice(&bytes).context("decode config JSON")?;
        Ok(settings)
    }

    /// Defaults when the file does not exist yet. Any other read or decode
    /// error is returned.
    pub fn load_or_default(&self) -> anyhow::Result<Settings> {
        if !self.path.exists() {
            log::debug!("no config at {}; using defaults", self.path.display());
            return Ok(Settings::default());
        }
        self.load()
    }

    pub fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(settings).context("encode config JSON")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config directory: {}", parent.display()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write temp: {}", tmp.display()))?;
        swap_into_place(&tmp, &self.path)
            .with_context(|| format!("save config: {}", self.path.display()))?;
        log::info!("saved config to {}", self.path.display());
        Ok(())
    }

    /// Load, apply `change`, save. Returns the saved settings.
    pub fn update(&self, change: impl FnOnce(&mut Settings)) -> anyhow::Result<Settings> {
        let mut settings = self.load_or_default()?;
        change(&mut settings);
        self.save(&settings)?;
        Ok(settings)
    }
}

/// Moves `staged` to `target`. Windows refuses to rename over an existing
/// file, so the current settings sit at `<target>.bak` until the new ones are
/// in place, and go back if that fails.
fn swap_into_place(staged: &Path, target: &Path) -> anyhow::Result<()> {
    let previous = target.with_extension("bak");
    let had_previous = target.exists();

    if had_previous {
        fs::remove_file(&previous).ok();
        fs::rename(target, &previous)
            .with_context(|| format!("move aside {}", target.display()))?;
    }

    match fs::rename(staged, target) {
        Ok(()) => {
            if had_previous {
                fs::remove_file(&previous).ok();
            }
            Ok(())
        }
        Err(err) => {
            if had_previous {
                fs::rename(&previous, target).ok();
            }
            fs::remove_file(staged).ok();
            Err(err).with_context(|| format!("install {}", staged.display()))
        }
    }
}
